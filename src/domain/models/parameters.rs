//! Trimming parameter set and its declared ranges.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

pub const QUALITY_RANGE: RangeInclusive<i64> = 0..=40;
pub const LENGTH_RANGE: RangeInclusive<i64> = 1..=300;
pub const TRIM_FRONT_RANGE: RangeInclusive<i64> = 0..=50;
pub const TRIM_TAIL_RANGE: RangeInclusive<i64> = 0..=50;

/// A validated trimming parameter set.
///
/// Every field lies within its declared range. Values only reach this type
/// through [`ParameterSchema::validate`] or [`TrimParameters::default`].
///
/// [`ParameterSchema::validate`]: crate::services::ParameterSchema::validate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrimParameters {
    /// Phred quality floor for a base to count as qualified
    pub quality: u8,
    /// Minimum read length kept after trimming
    pub length: u16,
    /// Bases removed from the 5' end
    pub trim_front: u8,
    /// Bases removed from the 3' end
    pub trim_tail: u8,
    pub adapter_trim: bool,
    pub poly_g_trim: bool,
}

impl Default for TrimParameters {
    /// Conservative parameters used whenever a proposed value is unusable.
    fn default() -> Self {
        Self {
            quality: 20,
            length: 35,
            trim_front: 0,
            trim_tail: 0,
            adapter_trim: true,
            poly_g_trim: false,
        }
    }
}

impl fmt::Display for TrimParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "quality={} length={} trim_front={} trim_tail={} adapter_trim={} poly_g_trim={}",
            self.quality,
            self.length,
            self.trim_front,
            self.trim_tail,
            self.adapter_trim,
            self.poly_g_trim
        )
    }
}

/// How a proposed field was repaired before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CorrectionKind {
    /// Field absent; default substituted
    Missing,
    /// Field had an unusable type; default substituted
    WrongType { found: String },
    /// Field converted from a compatible representation
    Coerced { found: String },
    /// Field outside its range; nearest bound substituted
    Clamped { original: String },
}

/// A single field correction applied to a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCorrection {
    pub field: String,
    #[serde(flatten)]
    pub kind: CorrectionKind,
    /// Value actually used, rendered as JSON
    pub applied: String,
}

impl fmt::Display for FieldCorrection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            CorrectionKind::Missing => write!(f, "{}: missing, using {}", self.field, self.applied),
            CorrectionKind::WrongType { found } => {
                write!(f, "{}: wrong type ({found}), using {}", self.field, self.applied)
            }
            CorrectionKind::Coerced { found } => {
                write!(f, "{}: coerced {found} to {}", self.field, self.applied)
            }
            CorrectionKind::Clamped { original } => {
                write!(f, "{}: {original} clamped to {}", self.field, self.applied)
            }
        }
    }
}

/// A validated parameter set plus the corrections that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub parameters: TrimParameters,
    #[serde(default)]
    pub corrections: Vec<FieldCorrection>,
}
