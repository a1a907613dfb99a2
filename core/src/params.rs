use rand::Rng;
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};

use crate::error::NodeError;
use crate::traits::SimTime;

/// A per-instance delay parameter. Every read draws a fresh value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DelaySpec {
    Fixed { delay_us: u64 },
    Exponential { mean_us: f64 },
    /// Negative draws are truncated to zero.
    Normal { mean_us: f64, std_dev_us: f64 },
    Uniform { min_us: u64, max_us: u64 },
}

impl Default for DelaySpec {
    fn default() -> Self {
        DelaySpec::Fixed { delay_us: 1_000_000 }
    }
}

impl DelaySpec {
    pub fn validate(&self) -> Result<(), NodeError> {
        match *self {
            DelaySpec::Fixed { .. } => Ok(()),
            DelaySpec::Exponential { mean_us } => {
                if mean_us.is_finite() && mean_us > 0.0 {
                    Ok(())
                } else {
                    Err(NodeError::InvalidParameter(format!(
                        "exponential mean must be positive and finite, got {}",
                        mean_us
                    )))
                }
            }
            DelaySpec::Normal { mean_us, std_dev_us } => {
                if mean_us.is_finite() && std_dev_us.is_finite() && std_dev_us >= 0.0 {
                    Ok(())
                } else {
                    Err(NodeError::InvalidParameter(format!(
                        "normal({}, {}) is not a valid distribution",
                        mean_us, std_dev_us
                    )))
                }
            }
            DelaySpec::Uniform { min_us, max_us } => {
                if min_us <= max_us {
                    Ok(())
                } else {
                    Err(NodeError::InvalidParameter(format!(
                        "uniform range is empty: {}..={}",
                        min_us, max_us
                    )))
                }
            }
        }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R) -> Result<SimTime, NodeError> {
        self.validate()?;
        let value = match *self {
            DelaySpec::Fixed { delay_us } => return Ok(delay_us),
            DelaySpec::Uniform { min_us, max_us } => return Ok(rng.gen_range(min_us..=max_us)),
            DelaySpec::Exponential { mean_us } => Exp::new(1.0 / mean_us)
                .map_err(|e| NodeError::InvalidParameter(e.to_string()))?
                .sample(rng),
            DelaySpec::Normal { mean_us, std_dev_us } => Normal::new(mean_us, std_dev_us)
                .map_err(|e| NodeError::InvalidParameter(e.to_string()))?
                .sample(rng),
        };
        Ok(to_sim_time(value))
    }

    /// Expected value of a draw, ignoring truncation.
    pub fn mean_us(&self) -> f64 {
        match *self {
            DelaySpec::Fixed { delay_us } => delay_us as f64,
            DelaySpec::Exponential { mean_us } => mean_us,
            DelaySpec::Normal { mean_us, .. } => mean_us,
            DelaySpec::Uniform { min_us, max_us } => (min_us as f64 + max_us as f64) / 2.0,
        }
    }
}

fn to_sim_time(us: f64) -> SimTime {
    if us.is_nan() || us <= 0.0 {
        0
    } else {
        us.round() as SimTime
    }
}
