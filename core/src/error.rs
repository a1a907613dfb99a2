use thiserror::Error;

use crate::message::{MessageId, TimerId};
use crate::traits::{NodeId, SimTime};

/// Errors raised by a node or by the host on a node's behalf.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NodeError {
    /// The wait period ended but nothing is held to forward.
    #[error("{node}: timer fired with no pending payload")]
    MissingPayload { node: String },

    /// A second payload arrived while one is still waiting.
    #[error("{node}: {arrived} arrived while {held} is still pending")]
    PayloadAlreadyPending {
        node: String,
        held: MessageId,
        arrived: MessageId,
    },

    #[error("{node}: received timer {timer} it does not own")]
    ForeignTimer { node: String, timer: TimerId },

    #[error("timer {0} already has a pending occurrence")]
    TimerAlreadyScheduled(TimerId),

    #[error("cannot schedule at t={requested}us, current time is t={current}us")]
    NonCausal { requested: SimTime, current: SimTime },

    #[error("gate '{gate}' of {node} is not connected")]
    UnconnectedGate { node: String, gate: String },

    #[error("{node}: unknown parameter '{param}'")]
    UnknownParameter { node: String, param: String },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{0}: event delivered before initialize")]
    NotInitialized(String),

    #[error("statistics error: {0}")]
    Metric(String),
}

/// Errors surfaced by the simulation host.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SimError {
    /// A node failed while handling an event. Processing stops here.
    #[error("node {node} ({name}) failed at t={time}us: {source}")]
    Node {
        node: NodeId,
        name: String,
        time: SimTime,
        #[source]
        source: NodeError,
    },

    #[error("node {0} is already registered")]
    DuplicateNode(NodeId),

    #[error("node {0} is not registered")]
    UnknownNode(NodeId),

    #[error("unknown component kind '{0}'")]
    UnknownComponentKind(String),

    #[error("invalid {kind} config: {reason}")]
    InvalidConfig { kind: String, reason: String },

    #[error("simulation already finished")]
    Finished,
}
