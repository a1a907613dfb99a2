use hdrhistogram::Histogram;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::NodeError;
use crate::traits::{NodeId, SimTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricId(pub usize);

/// One statistic channel owned by one node.
///
/// Keeps the full `(time, value)` vector for export and an HDR histogram for
/// quantiles.
pub struct Signal {
    pub node: NodeId,
    pub module: String,
    pub name: String,
    samples: Vec<(SimTime, u64)>,
    histogram: Histogram<u64>,
}

impl Signal {
    fn new(node: NodeId, module: &str, name: &str) -> Result<Self, NodeError> {
        let histogram =
            Histogram::<u64>::new(3).map_err(|e| NodeError::Metric(e.to_string()))?;
        Ok(Self {
            node,
            module: module.to_string(),
            name: name.to_string(),
            samples: Vec::new(),
            histogram,
        })
    }

    pub fn record(&mut self, time: SimTime, value: u64) {
        self.samples.push((time, value));
        if let Err(e) = self.histogram.record(value) {
            log::warn!("{}.{}: histogram rejected {}: {}", self.module, self.name, value, e);
        }
    }

    pub fn samples(&self) -> &[(SimTime, u64)] {
        &self.samples
    }

    pub fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.samples.iter().map(|(_, v)| *v)
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: f64 = self.values().map(|v| v as f64).sum();
        Some(sum / self.samples.len() as f64)
    }

    /// Population variance.
    pub fn variance(&self) -> Option<f64> {
        let mean = self.mean()?;
        let sq: f64 = self
            .values()
            .map(|v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum();
        Some(sq / self.samples.len() as f64)
    }

    pub fn std_dev(&self) -> Option<f64> {
        self.variance().map(f64::sqrt)
    }

    pub fn min(&self) -> Option<u64> {
        self.values().min()
    }

    pub fn max(&self) -> Option<u64> {
        self.values().max()
    }

    /// Histogram quantile, `q` in `[0, 1]`.
    pub fn quantile(&self, q: f64) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        Some(self.histogram.value_at_quantile(q.clamp(0.0, 1.0)))
    }

    pub fn summary(&self) -> SignalSummary {
        SignalSummary {
            node: self.node,
            module: self.module.clone(),
            name: self.name.clone(),
            count: self.count(),
            mean: self.mean(),
            variance: self.variance(),
            std_dev: self.std_dev(),
            min: self.min(),
            max: self.max(),
            p50: self.quantile(0.5),
            p99: self.quantile(0.99),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SignalSummary {
    pub node: NodeId,
    pub module: String,
    pub name: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub variance: Option<f64>,
    pub std_dev: Option<f64>,
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub p50: Option<u64>,
    pub p99: Option<u64>,
}

/// All statistic channels of a simulation.
#[derive(Default)]
pub struct StatsCollector {
    signals: Vec<Signal>,
    index: HashMap<(NodeId, String), MetricId>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registering the same `(node, name)` twice yields the same channel.
    pub fn register(&mut self, node: NodeId, module: &str, name: &str) -> Result<MetricId, NodeError> {
        if let Some(id) = self.index.get(&(node, name.to_string())) {
            return Ok(*id);
        }
        let id = MetricId(self.signals.len());
        self.signals.push(Signal::new(node, module, name)?);
        self.index.insert((node, name.to_string()), id);
        Ok(id)
    }

    pub fn emit(&mut self, metric: MetricId, time: SimTime, value: u64) {
        match self.signals.get_mut(metric.0) {
            Some(signal) => signal.record(time, value),
            None => log::warn!("emit on unregistered metric {:?} dropped", metric),
        }
    }

    pub fn signal(&self, node: NodeId, name: &str) -> Option<&Signal> {
        let id = self.index.get(&(node, name.to_string()))?;
        self.signals.get(id.0)
    }

    pub fn get(&self, metric: MetricId) -> Option<&Signal> {
        self.signals.get(metric.0)
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn summaries(&self) -> Vec<SignalSummary> {
        self.signals.iter().map(Signal::summary).collect()
    }

    /// Recorded vectors plus summaries, in the layout of a simulator result export.
    pub fn to_json(&self) -> serde_json::Value {
        let vectors: Vec<serde_json::Value> = self
            .signals
            .iter()
            .map(|s| {
                let (time, value): (Vec<SimTime>, Vec<u64>) = s.samples.iter().copied().unzip();
                serde_json::json!({
                    "module": s.module,
                    "name": s.name,
                    "time": time,
                    "value": value,
                })
            })
            .collect();
        serde_json::json!({
            "vectors": vectors,
            "summaries": self.summaries(),
        })
    }
}
