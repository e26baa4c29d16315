//! Validation and repair of proposed trimming parameters.
//!
//! Every field of a proposal is checked for presence, type and range. Unusable
//! values never abort a round: they are coerced, clamped or replaced with the
//! conservative default, and each repair is recorded as a [`FieldCorrection`].

use serde_json::{Map, Value};
use std::ops::RangeInclusive;
use tracing::{debug, warn};

use crate::domain::models::{
    CorrectionKind, FieldCorrection, Proposal, TrimParameters, LENGTH_RANGE, QUALITY_RANGE,
    TRIM_FRONT_RANGE, TRIM_TAIL_RANGE,
};

/// Keys the recommendation service is asked to return.
pub const PARAMETER_KEYS: [&str; 6] = [
    "quality",
    "length",
    "trim_front",
    "trim_tail",
    "adapter_trim",
    "poly_g_trim",
];

/// Schema of [`TrimParameters`] as exchanged with the recommendation service.
pub struct ParameterSchema;

impl ParameterSchema {
    /// Validate a proposed object, repairing every unusable field.
    pub fn validate(object: &Map<String, Value>) -> Proposal {
        let object = unwrap_nested(object);
        let defaults = TrimParameters::default();
        let mut corrections = Vec::new();

        let quality = integer_field(
            object,
            "quality",
            &QUALITY_RANGE,
            i64::from(defaults.quality),
            &mut corrections,
        );
        let length = integer_field(
            object,
            "length",
            &LENGTH_RANGE,
            i64::from(defaults.length),
            &mut corrections,
        );
        let trim_front = integer_field(
            object,
            "trim_front",
            &TRIM_FRONT_RANGE,
            i64::from(defaults.trim_front),
            &mut corrections,
        );
        let trim_tail = integer_field(
            object,
            "trim_tail",
            &TRIM_TAIL_RANGE,
            i64::from(defaults.trim_tail),
            &mut corrections,
        );
        let adapter_trim = bool_field(object, "adapter_trim", defaults.adapter_trim, &mut corrections);
        let poly_g_trim = bool_field(object, "poly_g_trim", defaults.poly_g_trim, &mut corrections);

        for key in object.keys().filter(|k| !PARAMETER_KEYS.contains(&k.as_str())) {
            debug!(key = %key, "ignoring unknown proposal key");
        }
        for correction in &corrections {
            warn!(%correction, "corrected proposed parameter");
        }

        // Ranges above fit the target integer types, so these conversions
        // cannot fail; fall back to defaults to stay total.
        let parameters = TrimParameters {
            quality: u8::try_from(quality).unwrap_or(defaults.quality),
            length: u16::try_from(length).unwrap_or(defaults.length),
            trim_front: u8::try_from(trim_front).unwrap_or(defaults.trim_front),
            trim_tail: u8::try_from(trim_tail).unwrap_or(defaults.trim_tail),
            adapter_trim,
            poly_g_trim,
        };

        Proposal {
            parameters,
            corrections,
        }
    }
}

/// Accept `{"parameters": {...}}` style wrappers when the top level holds
/// none of the expected keys.
fn unwrap_nested(object: &Map<String, Value>) -> &Map<String, Value> {
    if PARAMETER_KEYS.iter().any(|k| object.contains_key(*k)) {
        return object;
    }
    object
        .values()
        .filter_map(Value::as_object)
        .find(|inner| PARAMETER_KEYS.iter().any(|k| inner.contains_key(*k)))
        .unwrap_or(object)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn integer_field(
    object: &Map<String, Value>,
    field: &str,
    range: &RangeInclusive<i64>,
    default: i64,
    corrections: &mut Vec<FieldCorrection>,
) -> i64 {
    let mut record = |kind: CorrectionKind, applied: i64| {
        corrections.push(FieldCorrection {
            field: field.to_string(),
            kind,
            applied: applied.to_string(),
        });
        applied
    };

    let (number, coerced_from) = match object.get(field) {
        None | Some(Value::Null) => return record(CorrectionKind::Missing, default),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => (i as f64, None),
            None => match n.as_f64() {
                Some(f) => (f, (f.fract() != 0.0).then(|| n.to_string())),
                None => {
                    return record(
                        CorrectionKind::WrongType {
                            found: "number".to_string(),
                        },
                        default,
                    )
                }
            },
        },
        Some(Value::String(s)) => match s.trim().parse::<f64>() {
            Ok(f) if f.is_finite() => (f, Some(format!("{s:?}"))),
            _ => {
                return record(
                    CorrectionKind::WrongType {
                        found: "string".to_string(),
                    },
                    default,
                )
            }
        },
        Some(other) => {
            return record(
                CorrectionKind::WrongType {
                    found: type_name(other).to_string(),
                },
                default,
            )
        }
    };

    let rounded = number.round();
    let (lo, hi) = (*range.start() as f64, *range.end() as f64);
    if rounded < lo || rounded > hi {
        let applied = rounded.clamp(lo, hi) as i64;
        let original = coerced_from.unwrap_or_else(|| format_number(number));
        return record(CorrectionKind::Clamped { original }, applied);
    }

    let value = rounded as i64;
    match coerced_from {
        Some(found) => record(CorrectionKind::Coerced { found }, value),
        None => value,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

fn bool_field(
    object: &Map<String, Value>,
    field: &str,
    default: bool,
    corrections: &mut Vec<FieldCorrection>,
) -> bool {
    let mut record = |kind: CorrectionKind, applied: bool| {
        corrections.push(FieldCorrection {
            field: field.to_string(),
            kind,
            applied: applied.to_string(),
        });
        applied
    };

    match object.get(field) {
        Some(Value::Bool(b)) => *b,
        None | Some(Value::Null) => record(CorrectionKind::Missing, default),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f == 0.0 || f == 1.0 => record(
                CorrectionKind::Coerced {
                    found: n.to_string(),
                },
                f == 1.0,
            ),
            _ => record(
                CorrectionKind::WrongType {
                    found: "number".to_string(),
                },
                default,
            ),
        },
        Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => record(CorrectionKind::Coerced { found: format!("{s:?}") }, true),
            "false" | "no" | "0" => record(CorrectionKind::Coerced { found: format!("{s:?}") }, false),
            _ => record(
                CorrectionKind::WrongType {
                    found: "string".to_string(),
                },
                default,
            ),
        },
        Some(other) => record(
            CorrectionKind::WrongType {
                found: type_name(other).to_string(),
            },
            default,
        ),
    }
}
