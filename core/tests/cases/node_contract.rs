use crate::common::FakeScheduler;
use tictoc_core::*;

fn initialized(name: &str) -> (Txc, FakeScheduler) {
    let mut ctx = FakeScheduler::new(name);
    let mut node = Txc::new(name);
    node.initialize(&mut ctx).unwrap();
    (node, ctx)
}

#[test]
fn test_source_initialize_schedules_once_at_zero() {
    let (node, ctx) = initialized("S");

    assert_eq!(node.role, Role::Source);
    assert_eq!(node.counter, 200);
    assert_eq!(node.previous_arrival, 0);
    let timer = node.timer_id().unwrap();
    assert_eq!(ctx.scheduled, vec![(0, timer)]);
    assert!(node.pending().is_some());
    assert_eq!(node.pending().unwrap().name(), "tictocMsg");
    assert_eq!(ctx.metrics, vec!["arrival".to_string()]);
}

#[test]
fn test_relay_initialize_schedules_nothing() {
    let (node, ctx) = initialized("A");

    assert_eq!(node.role, Role::Relay);
    assert!(ctx.scheduled.is_empty());
    assert!(node.pending().is_none());
    assert!(node.timer_id().is_some());
    assert_eq!(ctx.live.get(), 0);
}

#[test]
fn test_configured_role_wins_over_name() {
    let config = TxcConfig {
        role: Some(Role::Source),
        ..TxcConfig::default()
    };
    let mut ctx = FakeScheduler::new("tic");
    let mut node = Txc::with_config("tic", config);
    node.initialize(&mut ctx).unwrap();
    assert_eq!(ctx.scheduled.len(), 1);

    let mut ctx = FakeScheduler::new("S");
    let mut node = Txc::new("S").with_role(Role::Relay);
    node.initialize(&mut ctx).unwrap();
    assert!(ctx.scheduled.is_empty());
}

#[test]
fn test_source_first_firing_forwards_placeholder() {
    let (mut node, mut ctx) = initialized("S");
    let placeholder = node.pending_id().unwrap();
    let timer = node.timer_id().unwrap();

    let event = ctx.fire(timer);
    node.on_event(event, &mut ctx).unwrap();

    assert_eq!(ctx.sent_ids(), vec![placeholder]);
    assert_eq!(ctx.sent[0].1, "out");
    assert!(node.pending().is_none());
    assert_eq!(node.counter, 199);
}

#[test]
fn test_arrival_is_forwarded_after_drawn_delay() {
    let (mut node, mut ctx) = initialized("A");
    let timer = node.timer_id().unwrap();
    ctx.delays.push_back(300);

    ctx.now = 1_000;
    let (event, msg) = ctx.arrival("hello");
    node.on_event(event, &mut ctx).unwrap();

    assert_eq!(ctx.scheduled, vec![(1_300, timer)]);
    assert_eq!(node.pending_id(), Some(msg));
    assert!(ctx.sent.is_empty());

    ctx.now = 1_300;
    let event = ctx.fire(timer);
    node.on_event(event, &mut ctx).unwrap();

    // Same instance, no copy: one live message, now owned by the receiver.
    assert_eq!(ctx.sent_ids(), vec![msg]);
    assert_eq!(ctx.live.get(), 1);
    assert!(node.pending().is_none());
    assert_eq!(node.counter, 198);
}

#[test]
fn test_interarrival_metric_starts_from_zero() {
    let (mut node, mut ctx) = initialized("A");
    let timer = node.timer_id().unwrap();
    ctx.delays.extend([200, 200]);

    ctx.now = 1_000;
    let (event, _) = ctx.arrival("m1");
    node.on_event(event, &mut ctx).unwrap();
    ctx.now = 1_200;
    let event = ctx.fire(timer);
    node.on_event(event, &mut ctx).unwrap();

    ctx.now = 2_500;
    let (event, _) = ctx.arrival("m2");
    node.on_event(event, &mut ctx).unwrap();

    assert_eq!(ctx.emitted_values(), vec![1_000, 1_500]);
    assert!(ctx.emitted.iter().all(|(m, _, _)| Some(*m) == node.arrival_metric()));
    assert_eq!(ctx.emitted[1].1, 2_500);
    assert_eq!(node.previous_arrival, 2_500);
}

#[test]
fn test_timer_without_payload_is_an_ownership_violation() {
    let (mut node, mut ctx) = initialized("A");
    let timer = node.timer_id().unwrap();

    let event = ctx.fire(timer);
    let err = node.on_event(event, &mut ctx).unwrap_err();

    assert_eq!(
        err,
        NodeError::MissingPayload {
            node: "A".to_string()
        }
    );
    assert!(ctx.sent.is_empty());
}

#[test]
fn test_second_arrival_while_waiting_is_rejected() {
    let (mut node, mut ctx) = initialized("A");

    let (first, held) = ctx.arrival("first");
    node.on_event(first, &mut ctx).unwrap();
    let (second, arrived) = ctx.arrival("second");
    let err = node.on_event(second, &mut ctx).unwrap_err();

    assert_eq!(
        err,
        NodeError::PayloadAlreadyPending {
            node: "A".to_string(),
            held,
            arrived,
        }
    );
    // The held message is untouched and the rejected one was dropped.
    assert_eq!(node.pending_id(), Some(held));
    assert_eq!(ctx.live.get(), 1);
    assert_eq!(ctx.scheduled.len(), 1);
}

#[test]
fn test_foreign_timer_is_rejected() {
    let (mut node, mut ctx) = initialized("A");
    let event = ctx.fire(TimerId(999));
    let err = node.on_event(event, &mut ctx).unwrap_err();
    assert!(matches!(err, NodeError::ForeignTimer { timer: TimerId(999), .. }));
}

#[test]
fn test_event_before_initialize_fails() {
    let mut ctx = FakeScheduler::new("A");
    let mut node = Txc::new("A");
    let (event, _) = ctx.arrival("early");
    let err = node.on_event(event, &mut ctx).unwrap_err();
    assert_eq!(err, NodeError::NotInitialized("A".to_string()));
    assert_eq!(node.counter, 200);
}

#[test]
fn test_unknown_delay_parameter_propagates() {
    let config = TxcConfig {
        delay_param: "holdTime".to_string(),
        ..TxcConfig::default()
    };
    let mut ctx = FakeScheduler::new("A");
    let mut node = Txc::with_config("A", config);
    node.initialize(&mut ctx).unwrap();

    let (event, _) = ctx.arrival("m");
    let err = node.on_event(event, &mut ctx).unwrap_err();
    assert!(matches!(err, NodeError::UnknownParameter { ref param, .. } if param == "holdTime"));
}

#[test]
fn test_custom_gate_and_signal_names() {
    let config = TxcConfig {
        out_gate: "port$o".to_string(),
        arrival_signal: "interarrival".to_string(),
        ..TxcConfig::default()
    };
    let mut ctx = FakeScheduler::new("S");
    let mut node = Txc::with_config("S", config);
    node.initialize(&mut ctx).unwrap();
    let timer = node.timer_id().unwrap();
    let event = ctx.fire(timer);
    node.on_event(event, &mut ctx).unwrap();

    assert_eq!(ctx.metrics, vec!["interarrival".to_string()]);
    assert_eq!(ctx.sent[0].1, "port$o");
}

#[test]
fn test_delay_overflowing_the_clock_is_rejected() {
    let (mut node, mut ctx) = initialized("A");
    ctx.delays.push_back(u64::MAX);

    ctx.now = 10;
    let (event, _) = ctx.arrival("m");
    let err = node.on_event(event, &mut ctx).unwrap_err();

    assert!(matches!(err, NodeError::InvalidParameter(ref reason) if reason.contains("overflows")));
    assert_eq!(ctx.live.get(), 0);
    assert!(ctx.scheduled.is_empty());
    assert!(ctx.emitted.is_empty());
    assert!(node.pending().is_none());
    assert_eq!(node.counter, 199);
}
