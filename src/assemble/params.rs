//! Runtime parameter map and slot-type coercion
//!
//! Parameters arrive as a flat map of heterogeneous JSON values, already
//! validated and staged by the caller (uploaded media is a filename the
//! engine can resolve). Substitution coerces each value to the declared
//! type of the slot it lands in; what cannot be coerced is a build-time
//! error, never a bad literal in the engine.

use crate::template::SlotType;
use serde_json::Value;
use std::collections::BTreeMap;

/// The flat parameter map supplied per assembly call
pub type ParamMap = BTreeMap<String, Value>;

/// Coerce a parameter value to a slot's declared type.
///
/// Returns None when the value cannot represent the type. Accepted
/// conversions beyond identity:
/// - int: float with zero fraction, decimal string
/// - float: any number, decimal string
/// - bool: the flag strings true/false, yes/no, on/off, enable/disable
///   (case-insensitive) and the numbers 0/1
/// - string: any scalar, stringified
pub fn coerce(value: &Value, ty: SlotType) -> Option<Value> {
    match ty {
        SlotType::Any => Some(value.clone()),
        SlotType::Int => coerce_int(value).map(Value::from),
        SlotType::Float => coerce_float(value).map(Value::from),
        SlotType::Bool => coerce_bool(value).map(Value::from),
        SlotType::String => coerce_string(value).map(Value::from),
    }
}

fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "enable" | "1" => Some(true),
            "false" | "no" | "off" | "disable" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
