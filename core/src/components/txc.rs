use crate::analytics::MetricId;
use crate::engine::{Event, EventType};
use crate::error::NodeError;
use crate::message::{Message, MessageId, Timer, TimerId};
use crate::traits::{Component, Scheduler, SimTime};
use serde::{Deserialize, Serialize};

/// Name of the node that originates the traffic when no role is configured.
pub const SOURCE_NAME: &str = "S";
pub const INITIAL_COUNTER: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Creates the first message and starts the exchange.
    Source,
    Relay,
}

impl Role {
    pub fn for_name(name: &str) -> Self {
        if name == SOURCE_NAME {
            Role::Source
        } else {
            Role::Relay
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxcConfig {
    /// `None` derives the role from the node name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    pub initial_counter: u32,
    pub out_gate: String,
    pub delay_param: String,
    pub arrival_signal: String,
}

impl Default for TxcConfig {
    fn default() -> Self {
        Self {
            role: None,
            initial_counter: INITIAL_COUNTER,
            out_gate: "out".to_string(),
            delay_param: "delayTime".to_string(),
            arrival_signal: "arrival".to_string(),
        }
    }
}

/// The tic-toc node.
///
/// Holds at most one message at a time. An arriving message is kept for a
/// delay drawn from `delay_param`, then forwarded on `out_gate`. Every event
/// costs one unit of `counter`; at zero the node drops what it holds and
/// ignores everything that follows.
pub struct Txc {
    pub name: String,
    pub role: Role,
    pub config: TxcConfig,
    pub counter: u32,
    pub previous_arrival: SimTime,
    timer: Option<Timer>,
    pending: Option<Message>,
    arrival_metric: Option<MetricId>,
}

impl Txc {
    pub fn new(name: &str) -> Self {
        Self::with_config(name, TxcConfig::default())
    }

    pub fn with_config(name: &str, config: TxcConfig) -> Self {
        let role = config.role.unwrap_or_else(|| Role::for_name(name));
        Self {
            name: name.to_string(),
            role,
            counter: config.initial_counter,
            config,
            previous_arrival: 0,
            timer: None,
            pending: None,
            arrival_metric: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self.config.role = Some(role);
        self
    }

    pub fn is_exhausted(&self) -> bool {
        self.counter == 0
    }

    pub fn pending(&self) -> Option<&Message> {
        self.pending.as_ref()
    }

    pub fn pending_id(&self) -> Option<MessageId> {
        self.pending.as_ref().map(Message::id)
    }

    pub fn timer_id(&self) -> Option<TimerId> {
        self.timer.as_ref().map(Timer::id)
    }

    pub fn arrival_metric(&self) -> Option<MetricId> {
        self.arrival_metric
    }

    /// Wait period over: hand the held message to the output gate.
    fn forward(&mut self, ctx: &mut dyn Scheduler) -> Result<(), NodeError> {
        let message = self.pending.take().ok_or_else(|| NodeError::MissingPayload {
            node: self.name.clone(),
        })?;
        log::debug!(
            "{}: wait period is over, sending {} on '{}'",
            self.name,
            message.id(),
            self.config.out_gate
        );
        ctx.send(message, &self.config.out_gate)
    }

    /// Take the message, start the wait and record the inter-arrival time.
    fn hold(&mut self, message: Message, metric: MetricId, ctx: &mut dyn Scheduler) -> Result<(), NodeError> {
        if let Some(held) = &self.pending {
            return Err(NodeError::PayloadAlreadyPending {
                node: self.name.clone(),
                held: held.id(),
                arrived: message.id(),
            });
        }
        let timer = self
            .timer
            .as_ref()
            .ok_or_else(|| NodeError::NotInitialized(self.name.clone()))?;
        let delay = ctx.draw(&self.config.delay_param)?;
        let now = ctx.now();
        let due = now.checked_add(delay).ok_or_else(|| {
            NodeError::InvalidParameter(format!("delay of {}us overflows simulation time", delay))
        })?;
        log::debug!(
            "{}: {} arrived, starting to wait {}us",
            self.name,
            message.id(),
            delay
        );
        ctx.schedule_at(due, timer)?;
        self.pending = Some(message);

        ctx.emit(metric, now.saturating_sub(self.previous_arrival));
        self.previous_arrival = now;
        Ok(())
    }

    /// Drop the held message and give the timer back. Safe to call twice.
    fn release(&mut self, ctx: &mut dyn Scheduler) {
        if let Some(message) = self.pending.take() {
            log::debug!("{}: deleting held {}", self.name, message.id());
        }
        if let Some(timer) = self.timer.take() {
            ctx.cancel_and_release(timer);
        }
    }
}

impl Component for Txc {
    fn initialize(&mut self, ctx: &mut dyn Scheduler) -> Result<(), NodeError> {
        self.release(ctx);
        self.counter = self.config.initial_counter;
        self.previous_arrival = 0;
        self.arrival_metric = Some(ctx.register_metric(&self.config.arrival_signal)?);

        let timer = ctx.new_timer("event");
        if self.role == Role::Source && self.counter > 0 {
            // The placeholder is pending from the start, so the first firing
            // forwards it like any other held message.
            let placeholder = ctx.new_message("tictocMsg");
            let now = ctx.now();
            ctx.schedule_at(now, &timer)?;
            log::debug!("{}: source primed with {}", self.name, placeholder.id());
            self.pending = Some(placeholder);
        }
        self.timer = Some(timer);
        Ok(())
    }

    fn on_event(&mut self, event: Event, ctx: &mut dyn Scheduler) -> Result<(), NodeError> {
        let metric = self
            .arrival_metric
            .ok_or_else(|| NodeError::NotInitialized(self.name.clone()))?;

        if self.counter == 0 {
            log::warn!(
                "{}: event at t={}us delivered after counter reached zero, discarding",
                self.name,
                event.time
            );
            return Ok(());
        }

        self.counter -= 1;
        if self.counter == 0 {
            log::info!("{}: counter reached zero, deleting message", self.name);
            self.release(ctx);
            return Ok(());
        }

        match event.event_type {
            EventType::Timer { timer } => {
                if self.timer_id() != Some(timer) {
                    return Err(NodeError::ForeignTimer {
                        node: self.name.clone(),
                        timer,
                    });
                }
                self.forward(ctx)
            }
            EventType::Arrival { message, .. } => self.hold(message, metric, ctx),
        }
    }

    fn teardown(&mut self, ctx: &mut dyn Scheduler) {
        self.release(ctx);
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        "Txc"
    }

    fn encode_config(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or(serde_json::Value::Null)
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
