use crate::analytics::{MetricId, StatsCollector};
use crate::error::{NodeError, SimError};
use crate::message::{LiveCounter, Message, MessageId, Timer, TimerId};
use crate::network::{ChannelConfig, Connection};
use crate::params::DelaySpec;
use crate::traits::{Component, NodeId, Scheduler, SimTime};
use rand::prelude::*;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

#[derive(Debug)]
pub enum EventType {
    /// A node's own timer came due.
    Timer { timer: TimerId },
    /// A message reached the node. `from` is `None` for injected messages.
    Arrival {
        message: Message,
        from: Option<NodeId>,
    },
}

#[derive(Debug)]
pub struct Event {
    pub time: SimTime,
    pub seq: u64,
    pub node_id: NodeId,
    pub event_type: EventType,
}

// Ordered by (time, seq): same-time events keep insertion order.
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.seq == other.seq
    }
}
impl Eq for Event {}
impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Event {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TraceKind {
    TimerFired(TimerId),
    Arrived {
        message: MessageId,
        from: Option<NodeId>,
    },
    Scheduled {
        timer: TimerId,
        at: SimTime,
    },
    Released(TimerId),
    Sent {
        message: MessageId,
        gate: String,
        to: NodeId,
        arrival: SimTime,
    },
}

/// One thing that happened at one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEntry {
    pub time: SimTime,
    pub node: NodeId,
    pub kind: TraceKind,
}

#[derive(Debug, Clone, Copy)]
struct PendingTimer {
    owner: NodeId,
    at: SimTime,
    seq: u64,
}

struct NodeSlot {
    name: String,
    component: Box<dyn Component>,
}

/// Host-side state shared by every node context.
struct Kernel {
    time: SimTime,
    events: BinaryHeap<Reverse<Event>>,
    next_seq: u64,
    next_message_id: u64,
    next_timer_id: u64,
    timers: HashMap<TimerId, PendingTimer>,
    gates: HashMap<(NodeId, String), Connection>,
    params: HashMap<(NodeId, String), DelaySpec>,
    stats: StatsCollector,
    rng: StdRng,
    live: LiveCounter,
    trace: Vec<TraceEntry>,
    events_processed: u64,
    sent_count: u64,
}

impl Kernel {
    fn new(rng: StdRng) -> Self {
        Self {
            time: 0,
            events: BinaryHeap::new(),
            next_seq: 0,
            next_message_id: 0,
            next_timer_id: 0,
            timers: HashMap::new(),
            gates: HashMap::new(),
            params: HashMap::new(),
            stats: StatsCollector::new(),
            rng,
            live: LiveCounter::new(),
            trace: Vec::new(),
            events_processed: 0,
            sent_count: 0,
        }
    }

    fn push(&mut self, time: SimTime, node_id: NodeId, event_type: EventType) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.events.push(Reverse(Event {
            time,
            seq,
            node_id,
            event_type,
        }));
        seq
    }

    fn mint_message(&mut self, name: &str, created_at: SimTime) -> Message {
        let id = MessageId(self.next_message_id);
        self.next_message_id += 1;
        Message::new(id, name, created_at, &self.live)
    }

    fn record(&mut self, node: NodeId, kind: TraceKind) {
        self.trace.push(TraceEntry {
            time: self.time,
            node,
            kind,
        });
    }
}

/// The `Scheduler` a node sees while it handles one call.
pub struct NodeContext<'a> {
    kernel: &'a mut Kernel,
    node: NodeId,
    name: &'a str,
}

impl Scheduler for NodeContext<'_> {
    fn now(&self) -> SimTime {
        self.kernel.time
    }

    fn name(&self) -> &str {
        self.name
    }

    fn new_timer(&mut self, name: &str) -> Timer {
        let id = TimerId(self.kernel.next_timer_id);
        self.kernel.next_timer_id += 1;
        Timer::new(id, name)
    }

    fn new_message(&mut self, name: &str) -> Message {
        let now = self.kernel.time;
        self.kernel.mint_message(name, now)
    }

    fn schedule_at(&mut self, at: SimTime, timer: &Timer) -> Result<(), NodeError> {
        if at < self.kernel.time {
            return Err(NodeError::NonCausal {
                requested: at,
                current: self.kernel.time,
            });
        }
        if self.kernel.timers.contains_key(&timer.id()) {
            return Err(NodeError::TimerAlreadyScheduled(timer.id()));
        }
        let seq = self.kernel.push(at, self.node, EventType::Timer { timer: timer.id() });
        self.kernel.timers.insert(
            timer.id(),
            PendingTimer {
                owner: self.node,
                at,
                seq,
            },
        );
        self.kernel.record(self.node, TraceKind::Scheduled { timer: timer.id(), at });
        Ok(())
    }

    fn cancel_and_release(&mut self, timer: Timer) {
        // A stale heap entry may remain; `step` skips it because the
        // occurrence is no longer registered.
        if self.kernel.timers.remove(&timer.id()).is_some() {
            log::trace!("{}: cancelled pending occurrence of {}", self.name, timer.id());
        }
        self.kernel.record(self.node, TraceKind::Released(timer.id()));
    }

    fn send(&mut self, mut message: Message, gate: &str) -> Result<(), NodeError> {
        let conn = self
            .kernel
            .gates
            .get(&(self.node, gate.to_string()))
            .cloned()
            .ok_or_else(|| NodeError::UnconnectedGate {
                node: self.name.to_string(),
                gate: gate.to_string(),
            })?;
        let jitter = if conn.channel.jitter_us > 0 {
            self.kernel.rng.gen_range(0..=conn.channel.jitter_us)
        } else {
            0
        };
        let arrival = conn.arrival_time(self.kernel.time, jitter);
        message.record_hop();
        self.kernel.record(
            self.node,
            TraceKind::Sent {
                message: message.id(),
                gate: gate.to_string(),
                to: conn.to,
                arrival,
            },
        );
        self.kernel.push(
            arrival,
            conn.to,
            EventType::Arrival {
                message,
                from: Some(self.node),
            },
        );
        self.kernel.sent_count += 1;
        Ok(())
    }

    fn register_metric(&mut self, name: &str) -> Result<MetricId, NodeError> {
        self.kernel.stats.register(self.node, self.name, name)
    }

    fn emit(&mut self, metric: MetricId, value: u64) {
        let now = self.kernel.time;
        self.kernel.stats.emit(metric, now, value);
    }

    fn draw(&mut self, param: &str) -> Result<SimTime, NodeError> {
        let spec = self
            .kernel
            .params
            .get(&(self.node, param.to_string()))
            .copied()
            .ok_or_else(|| NodeError::UnknownParameter {
                node: self.name.to_string(),
                param: param.to_string(),
            })?;
        spec.sample(&mut self.kernel.rng)
    }
}

/// The discrete-event host: owns the components, the event queue, the
/// wiring, the parameters and the statistics.
pub struct Simulation {
    components: BTreeMap<NodeId, NodeSlot>,
    kernel: Kernel,
    initialized: bool,
    finished: bool,
}

impl Simulation {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn new_with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            components: BTreeMap::new(),
            kernel: Kernel::new(rng),
            initialized: false,
            finished: false,
        }
    }

    /// Register a component. Added after `initialize`, it is initialized at once.
    /// Refused once the simulation has finished.
    pub fn add_component(&mut self, id: NodeId, component: Box<dyn Component>) -> Result<(), SimError> {
        if self.finished {
            return Err(SimError::Finished);
        }
        if self.components.contains_key(&id) {
            return Err(SimError::DuplicateNode(id));
        }
        let name = component.name().to_string();
        self.components.insert(id, NodeSlot { name, component });
        if self.initialized {
            self.initialize_node(id)?;
        }
        Ok(())
    }

    /// Wire `(from, gate)` to `to`.
    pub fn connect(&mut self, from: NodeId, gate: &str, to: NodeId, channel: ChannelConfig) {
        self.kernel
            .gates
            .insert((from, gate.to_string()), Connection { to, channel });
    }

    pub fn set_parameter(&mut self, id: NodeId, name: &str, spec: DelaySpec) {
        self.kernel.params.insert((id, name.to_string()), spec);
    }

    pub fn initialize(&mut self) -> Result<(), SimError> {
        if self.finished {
            return Err(SimError::Finished);
        }
        if self.initialized {
            return Ok(());
        }
        self.initialized = true;
        let ids: Vec<NodeId> = self.components.keys().copied().collect();
        for id in ids {
            self.initialize_node(id)?;
        }
        Ok(())
    }

    fn initialize_node(&mut self, id: NodeId) -> Result<(), SimError> {
        let time = self.kernel.time;
        let slot = self.components.get_mut(&id).ok_or(SimError::UnknownNode(id))?;
        let mut ctx = NodeContext {
            kernel: &mut self.kernel,
            node: id,
            name: &slot.name,
        };
        let result = slot.component.initialize(&mut ctx);
        result.map_err(|source| SimError::Node {
            node: id,
            name: slot.name.clone(),
            time,
            source,
        })
    }

    /// Seed an external message arriving at `to` at time `at`.
    pub fn inject_message(&mut self, at: SimTime, to: NodeId, name: &str) -> Result<MessageId, SimError> {
        if self.finished {
            return Err(SimError::Finished);
        }
        if !self.components.contains_key(&to) {
            return Err(SimError::UnknownNode(to));
        }
        let at = if at < self.kernel.time {
            log::warn!(
                "injection at t={}us is in the past, delivering at t={}us",
                at,
                self.kernel.time
            );
            self.kernel.time
        } else {
            at
        };
        let message = self.kernel.mint_message(name, at);
        let id = message.id();
        self.kernel.push(at, to, EventType::Arrival { message, from: None });
        Ok(id)
    }

    /// Dispatch one event. `Ok(false)` once the queue is empty.
    pub fn step(&mut self) -> Result<bool, SimError> {
        if self.finished {
            return Err(SimError::Finished);
        }
        if !self.initialized {
            self.initialize()?;
        }
        let Some(Reverse(event)) = self.kernel.events.pop() else {
            return Ok(false);
        };

        // Released occurrences do not move the clock.
        if let EventType::Timer { timer } = &event.event_type {
            let current = self
                .kernel
                .timers
                .get(timer)
                .map_or(false, |pending| pending.seq == event.seq);
            if !current {
                log::trace!("skipping released occurrence of {}", timer);
                return Ok(true);
            }
        }
        debug_assert!(event.time >= self.kernel.time, "time went backwards");
        self.kernel.time = event.time;

        let node_id = event.node_id;
        match &event.event_type {
            EventType::Timer { timer } => {
                let timer = *timer;
                self.kernel.timers.remove(&timer);
                self.kernel.record(node_id, TraceKind::TimerFired(timer));
            }
            EventType::Arrival { message, from } => {
                let kind = TraceKind::Arrived {
                    message: message.id(),
                    from: *from,
                };
                self.kernel.record(node_id, kind);
            }
        }
        self.kernel.events_processed += 1;

        let Some(slot) = self.components.get_mut(&node_id) else {
            log::warn!("event for unregistered node {} dropped", node_id);
            return Ok(true);
        };
        log::trace!("t={}us dispatching to {} ({})", event.time, node_id, slot.name);
        let time = event.time;
        let mut ctx = NodeContext {
            kernel: &mut self.kernel,
            node: node_id,
            name: &slot.name,
        };
        let result = slot.component.on_event(event, &mut ctx);
        result.map_err(|source| SimError::Node {
            node: node_id,
            name: slot.name.clone(),
            time,
            source,
        })?;
        Ok(true)
    }

    /// Run until the queue drains. Returns the number of events dispatched.
    pub fn run(&mut self) -> Result<u64, SimError> {
        let start = self.kernel.events_processed;
        while self.step()? {}
        Ok(self.kernel.events_processed - start)
    }

    /// Run every event due at or before `limit`.
    pub fn run_until(&mut self, limit: SimTime) -> Result<u64, SimError> {
        if self.finished {
            return Err(SimError::Finished);
        }
        if !self.initialized {
            self.initialize()?;
        }
        let start = self.kernel.events_processed;
        while let Some(next) = self.next_event_time() {
            if next > limit {
                break;
            }
            self.step()?;
        }
        Ok(self.kernel.events_processed - start)
    }

    /// Tear every component down, then release whatever is still in flight.
    /// Afterwards the host refuses to run or accept injections.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        for (id, slot) in self.components.iter_mut() {
            let mut ctx = NodeContext {
                kernel: &mut self.kernel,
                node: *id,
                name: &slot.name,
            };
            slot.component.teardown(&mut ctx);
        }
        for (timer, pending) in &self.kernel.timers {
            log::warn!(
                "timer {} of node {} still pending for t={}us after teardown",
                timer,
                pending.owner,
                pending.at
            );
        }
        self.kernel.timers.clear();
        if !self.kernel.events.is_empty() {
            log::debug!("dropping {} undelivered events", self.kernel.events.len());
            self.kernel.events.clear();
        }
    }

    pub fn time(&self) -> SimTime {
        self.kernel.time
    }

    pub fn next_event_time(&self) -> Option<SimTime> {
        self.kernel.events.peek().map(|Reverse(e)| e.time)
    }

    pub fn component<T: Component>(&self, id: NodeId) -> Option<&T> {
        self.components.get(&id)?.component.as_any().downcast_ref::<T>()
    }

    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        self.components.get(&id).map(|slot| slot.name.as_str())
    }

    pub fn stats(&self) -> &StatsCollector {
        &self.kernel.stats
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.kernel.trace
    }

    pub fn events_processed(&self) -> u64 {
        self.kernel.events_processed
    }

    pub fn events_pending(&self) -> usize {
        self.kernel.events.len()
    }

    pub fn sent_count(&self) -> u64 {
        self.kernel.sent_count
    }

    pub fn live_message_count(&self) -> usize {
        self.kernel.live.get()
    }

    pub fn pending_timer_count(&self) -> usize {
        self.kernel.timers.len()
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        self.finish();
    }
}
