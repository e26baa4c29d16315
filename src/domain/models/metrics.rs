//! Structured quality metrics extracted from a quality-analysis report.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Status reported by a single quality-analysis module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ModuleStatus {
    Pass,
    Warn,
    Fail,
}

impl ModuleStatus {
    /// Contribution of this status to the module-health signal.
    pub fn health(self) -> f64 {
        match self {
            Self::Pass => 1.0,
            Self::Warn => 0.5,
            Self::Fail => 0.0,
        }
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Warn => write!(f, "WARN"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

impl FromStr for ModuleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pass" => Ok(Self::Pass),
            "warn" => Ok(Self::Warn),
            "fail" => Ok(Self::Fail),
            other => Err(format!("unknown module status: {other}")),
        }
    }
}

/// Read length reported by the analysis, a single value or a `min-max`
/// range once reads have been trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadLength {
    pub min: u32,
    pub max: u32,
}

impl fmt::Display for ReadLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.max)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

impl FromStr for ReadLength {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |v: &str| {
            v.trim()
                .parse::<u32>()
                .map_err(|_| format!("invalid read length: {s}"))
        };
        match s.split_once('-') {
            Some((min, max)) => {
                let (min, max) = (parse(min)?, parse(max)?);
                if min > max {
                    return Err(format!("invalid read length range: {s}"));
                }
                Ok(Self { min, max })
            }
            None => {
                let len = parse(s)?;
                Ok(Self { min: len, max: len })
            }
        }
    }
}

/// Per-base quality summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub average_quality: f64,
    pub min_quality: f64,
    pub max_quality: f64,
    /// Mean quality of the first positions, kept for prompt context.
    #[serde(default)]
    pub mean_scores: Vec<f64>,
}

/// Normalized metrics of one analysis run. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Module name to status, ordered for stable serialization
    pub module_status: BTreeMap<String, ModuleStatus>,
    pub quality_summary: QualitySummary,
    /// Highest adapter percentage at any position (0-100)
    pub adapter_contamination: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_sequences: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_length: Option<ReadLength>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gc_percent: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_n_content: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deduplicated_percentage: Option<f64>,
    #[serde(default)]
    pub overrepresented_count: usize,
}

impl QualityMetrics {
    /// Modules currently reporting the given status.
    pub fn modules_with(&self, status: ModuleStatus) -> Vec<&str> {
        self.module_status
            .iter()
            .filter(|(_, s)| **s == status)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn count(&self, status: ModuleStatus) -> usize {
        self.module_status.values().filter(|s| **s == status).count()
    }

    pub fn has_failures(&self) -> bool {
        self.module_status.values().any(|s| *s == ModuleStatus::Fail)
    }
}
