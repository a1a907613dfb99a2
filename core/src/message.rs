use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::traits::SimTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "M#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T#{}", self.0)
    }
}

/// Number of messages currently alive in one simulation.
#[derive(Debug, Clone, Default)]
pub struct LiveCounter(Arc<AtomicUsize>);

impl LiveCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    fn acquire(&self) -> LiveToken {
        self.0.fetch_add(1, Ordering::Relaxed);
        LiveToken(Arc::clone(&self.0))
    }
}

#[derive(Debug)]
struct LiveToken(Arc<AtomicUsize>);

impl Drop for LiveToken {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// A payload travelling between nodes.
///
/// Not `Clone`: whoever holds the value owns the message, and
/// dropping it releases it.
#[derive(Debug)]
pub struct Message {
    id: MessageId,
    name: String,
    created_at: SimTime,
    hop_count: u32,
    _live: LiveToken,
}

impl Message {
    pub fn new(id: MessageId, name: &str, created_at: SimTime, live: &LiveCounter) -> Self {
        Self {
            id,
            name: name.to_string(),
            created_at,
            hop_count: 0,
            _live: live.acquire(),
        }
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> SimTime {
        self.created_at
    }

    pub fn hop_count(&self) -> u32 {
        self.hop_count
    }

    pub(crate) fn record_hop(&mut self) {
        self.hop_count += 1;
    }
}

/// Handle for a node's self-addressed event. Owned by exactly one node.
#[derive(Debug, PartialEq, Eq)]
pub struct Timer {
    id: TimerId,
    name: String,
}

impl Timer {
    pub fn new(id: TimerId, name: &str) -> Self {
        Self { id, name: name.to_string() }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
