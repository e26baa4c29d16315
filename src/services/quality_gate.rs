//! Accept/reject decision and ranking score over [`QualityMetrics`].

use serde::{Deserialize, Serialize};

use crate::domain::models::{ModuleStatus, QualityGateConfig, QualityMetrics};

/// Phred score treated as a perfect per-base quality when normalizing.
const QUALITY_CEILING: f64 = 40.0;

/// Result of evaluating one set of metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateVerdict {
    pub acceptable: bool,
    /// Ranking score in [0, 1]. Acceptable metrics score above 0.5,
    /// unacceptable ones at or below it.
    pub score: f64,
    /// Why the metrics were rejected; empty when acceptable
    pub reasons: Vec<String>,
}

/// Pure threshold check plus weighted score.
#[derive(Debug, Clone)]
pub struct QualityGate {
    config: QualityGateConfig,
}

impl QualityGate {
    pub fn new(config: QualityGateConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self, metrics: &QualityMetrics) -> GateVerdict {
        let reasons = self.rejection_reasons(metrics);
        let acceptable = reasons.is_empty();
        let signal = self.signal(metrics);
        let score = if acceptable {
            0.5 + 0.5 * signal
        } else {
            0.5 * signal
        };

        GateVerdict {
            acceptable,
            score,
            reasons,
        }
    }

    fn rejection_reasons(&self, metrics: &QualityMetrics) -> Vec<String> {
        let mut reasons = Vec::new();
        let summary = &metrics.quality_summary;

        let failing = metrics.modules_with(ModuleStatus::Fail);
        if !failing.is_empty() {
            reasons.push(format!("failing modules: {}", failing.join(", ")));
        }
        if summary.average_quality < self.config.min_average_quality {
            reasons.push(format!(
                "average quality {:.1} below {:.1}",
                summary.average_quality, self.config.min_average_quality
            ));
        }
        if summary.min_quality < self.config.min_min_quality {
            reasons.push(format!(
                "minimum quality {:.1} below {:.1}",
                summary.min_quality, self.config.min_min_quality
            ));
        }
        if metrics.adapter_contamination >= self.config.max_adapter_contamination {
            reasons.push(format!(
                "adapter contamination {:.2}% not below {:.2}%",
                metrics.adapter_contamination, self.config.max_adapter_contamination
            ));
        }

        reasons
    }

    /// Weighted mean of the normalized signals, in [0, 1].
    fn signal(&self, metrics: &QualityMetrics) -> f64 {
        let w = &self.config.weights;
        let summary = &metrics.quality_summary;

        let average = (summary.average_quality / QUALITY_CEILING).clamp(0.0, 1.0);
        let minimum = (summary.min_quality / QUALITY_CEILING).clamp(0.0, 1.0);
        let adapter = (1.0 - metrics.adapter_contamination / 100.0).clamp(0.0, 1.0);
        let modules = if metrics.module_status.is_empty() {
            1.0
        } else {
            metrics
                .module_status
                .values()
                .map(|s| s.health())
                .sum::<f64>()
                / metrics.module_status.len() as f64
        };

        let total = w.total();
        if total <= 0.0 || !total.is_finite() {
            return (average + minimum + adapter + modules) / 4.0;
        }

        (w.average_quality * average
            + w.min_quality * minimum
            + w.adapter * adapter
            + w.module_health * modules)
            / total
    }
}
