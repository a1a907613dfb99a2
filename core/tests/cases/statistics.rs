use crate::common::{TestHarness, DELAY_US, LATENCY_US};
use tictoc_core::*;

#[test]
fn test_interarrival_signal_per_node() {
    let mut h = TestHarness::pair();
    h.start();
    h.run();

    let round_trip = 2 * (DELAY_US + LATENCY_US);

    // A first hears the message one hop after t=0.
    let a = h.arrivals(2);
    assert_eq!(a.len(), 100);
    assert_eq!(a[0], LATENCY_US);
    assert!(a[1..].iter().all(|v| *v == round_trip));

    // Samples are stamped with the arrival time that produced them.
    let samples = h.sim.stats().signal(2, "arrival").unwrap().samples();
    assert_eq!(samples[0], (LATENCY_US, LATENCY_US));
    assert_eq!(samples[1].0, LATENCY_US + round_trip);

    // S waits for the full first lap before its first arrival.
    let s = h.arrivals(1);
    assert_eq!(s.len(), 99);
    assert_eq!(s[0], DELAY_US + 2 * LATENCY_US);
    assert!(s[1..].iter().all(|v| *v == round_trip));
}

#[test]
fn test_summary_moments() {
    let mut h = TestHarness::pair();
    h.start();
    h.run();

    let signal = h.sim.stats().signal(2, "arrival").unwrap();
    let summary = signal.summary();
    assert_eq!(summary.module, "A");
    assert_eq!(summary.count, 100);
    assert_eq!(summary.min, Some(LATENCY_US));
    assert_eq!(summary.max, Some(2 * (DELAY_US + LATENCY_US)));
    let mean = summary.mean.unwrap();
    let expected = (LATENCY_US + 99 * 2 * (DELAY_US + LATENCY_US)) as f64 / 100.0;
    assert!((mean - expected).abs() < 1e-6);
    assert!(summary.std_dev.unwrap() > 0.0);
}

#[test]
fn test_exponential_delays_show_up_in_the_histogram() {
    let mut h = TestHarness::new_with_seed(99);
    h.add_txc(1, "S");
    h.add_txc(2, "A");
    let hold = DelaySpec::Exponential { mean_us: 500_000.0 };
    h.set_delay(1, hold);
    h.set_delay(2, hold);
    h.sim.connect(1, "out", 2, ChannelConfig::ideal());
    h.sim.connect(2, "out", 1, ChannelConfig::ideal());
    h.start();
    h.run();

    let signal = h.sim.stats().signal(1, "arrival").unwrap();
    let p50 = signal.quantile(0.5).unwrap();
    let p99 = signal.quantile(0.99).unwrap();
    assert!(p50 <= p99);
    // Each lap is the sum of two exponential holds.
    let lap = 2.0 * hold.mean_us();
    let mean = signal.mean().unwrap();
    assert!(mean > 0.7 * lap && mean < 1.3 * lap, "mean = {}", mean);
}

#[test]
fn test_json_export_contains_both_nodes() {
    let mut h = TestHarness::pair();
    h.start();
    h.run();

    let json = h.sim.stats().to_json();
    let vectors = json["vectors"].as_array().unwrap();
    assert_eq!(vectors.len(), 2);
    let modules: Vec<&str> = vectors
        .iter()
        .map(|v| v["module"].as_str().unwrap())
        .collect();
    assert!(modules.contains(&"S"));
    assert!(modules.contains(&"A"));
    for v in vectors {
        assert_eq!(
            v["time"].as_array().unwrap().len(),
            v["value"].as_array().unwrap().len()
        );
    }
    assert_eq!(json["summaries"].as_array().unwrap().len(), 2);
}
