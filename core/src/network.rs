use serde::{Deserialize, Serialize};

use crate::traits::{NodeId, SimTime};

#[derive(Serialize, Deserialize, Clone, Debug, Copy, PartialEq)]
pub struct ChannelConfig {
    pub latency_us: u64, // Fixed propagation delay
    pub jitter_us: u64,  // Upper bound of uniform extra delay
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            latency_us: 100_000,
            jitter_us: 0,
        }
    }
}

impl ChannelConfig {
    pub fn ideal() -> Self {
        Self {
            latency_us: 0,
            jitter_us: 0,
        }
    }

    pub fn with_latency(latency_us: u64) -> Self {
        Self {
            latency_us,
            jitter_us: 0,
        }
    }
}

/// Where a node's output gate leads.
/// Stored by `(from, gate)`; gates are one-directional.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Connection {
    pub to: NodeId,
    pub channel: ChannelConfig,
}

impl Connection {
    /// Arrival time for a message leaving at `now`, given a jitter draw in
    /// `[0, jitter_us]`.
    pub fn arrival_time(&self, now: SimTime, jitter: u64) -> SimTime {
        now.saturating_add(self.channel.latency_us)
            .saturating_add(jitter.min(self.channel.jitter_us))
    }
}
