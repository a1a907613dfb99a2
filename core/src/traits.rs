use std::any::Any;

use crate::analytics::MetricId;
use crate::engine::Event;
use crate::error::NodeError;
use crate::message::{Message, Timer};

pub type NodeId = u32;

/// Simulation time in microseconds.
pub type SimTime = u64;

/// A simulated entity driven by the host.
///
/// The host calls `initialize` once before the first event, `on_event` once per
/// delivered event, and `teardown` once at the end. All side effects go through
/// the `Scheduler` handed in on each call.
pub trait Component: Any {
    fn initialize(&mut self, ctx: &mut dyn Scheduler) -> Result<(), NodeError>;
    fn on_event(&mut self, event: Event, ctx: &mut dyn Scheduler) -> Result<(), NodeError>;
    fn teardown(&mut self, ctx: &mut dyn Scheduler);

    fn name(&self) -> &str;
    fn kind(&self) -> &str;

    // Serialization
    fn encode_config(&self) -> serde_json::Value;

    fn as_any(&self) -> &dyn Any;
}

/// What a component sees of the host while it handles one call.
pub trait Scheduler {
    fn now(&self) -> SimTime;
    fn name(&self) -> &str;

    fn new_timer(&mut self, name: &str) -> Timer;
    fn new_message(&mut self, name: &str) -> Message;

    /// Deliver `timer` back to its owner at `at`. A timer has at most one
    /// outstanding occurrence.
    fn schedule_at(&mut self, at: SimTime, timer: &Timer) -> Result<(), NodeError>;
    fn cancel_and_release(&mut self, timer: Timer);

    /// Hand `message` to whatever is wired to `gate`. Ownership leaves the caller.
    fn send(&mut self, message: Message, gate: &str) -> Result<(), NodeError>;

    fn register_metric(&mut self, name: &str) -> Result<MetricId, NodeError>;
    fn emit(&mut self, metric: MetricId, value: u64);

    /// Draw one value from the named per-instance delay parameter.
    fn draw(&mut self, param: &str) -> Result<SimTime, NodeError>;
}
