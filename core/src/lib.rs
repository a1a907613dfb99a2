//! A tic-toc discrete-event node and the small host that drives it.
//!
//! A [`Txc`] holds one message at a time: it waits a delay drawn from its
//! `delayTime` parameter, forwards the message on its `out` gate and records
//! inter-arrival times. Each event costs one unit of a counter (200 by
//! default); at zero the node drops what it holds and goes quiet.
//!
//! Nodes only see the host through the [`Scheduler`] trait, so the same node
//! runs inside [`Simulation`] or against a hand-written fake.

pub mod analytics;
pub mod components;
pub mod engine;
pub mod error;
pub mod message;
pub mod network;
pub mod params;
pub mod traits;

pub use analytics::{MetricId, Signal, SignalSummary, StatsCollector};
pub use components::create_component;
pub use components::txc::{Role, Txc, TxcConfig, INITIAL_COUNTER, SOURCE_NAME};
pub use engine::{Event, EventType, NodeContext, Simulation, TraceEntry, TraceKind};
pub use error::{NodeError, SimError};
pub use message::{LiveCounter, Message, MessageId, Timer, TimerId};
pub use network::{ChannelConfig, Connection};
pub use params::DelaySpec;
pub use traits::{Component, NodeId, Scheduler, SimTime};
