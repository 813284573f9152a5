//! Range clamping and type casting between item values and wire values.
//!
//! The same casts run on the write confirmation path and on the poll path,
//! so an item observes one representation no matter which path wrote it.

use serde_json::Value;

use crate::errors::Error;
use crate::types::{Attribute, Classification, ItemValue};

type Result<T> = std::result::Result<T, Error>;

/// Saturates `value` into `min..=max`, truncating toward zero first.
///
/// ```
/// use hue_items_rs::clamp_int;
///
/// assert_eq!(clamp_int(300.0, 0, 255), 255);
/// assert_eq!(clamp_int(-4.0, 0, 255), 0);
/// assert_eq!(clamp_int(37.9, 0, 255), 37);
/// ```
pub fn clamp_int(value: f64, min: i64, max: i64) -> i64 {
    if value.is_nan() {
        return min;
    }
    let truncated = value.trunc();
    if truncated <= min as f64 {
        min
    } else if truncated >= max as f64 {
        max
    } else {
        truncated as i64
    }
}

/// Casts a raw bridge value into the item representation of `attribute`.
pub fn cast_by_classification(raw: &Value, attribute: Attribute) -> Result<ItemValue> {
    match attribute.classification() {
        Classification::Bool => Ok(ItemValue::Bool(json_truthy(raw))),
        Classification::Str | Classification::Group => Ok(ItemValue::Str(match raw {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })),
        Classification::Structured => {
            ItemValue::from_json(raw).ok_or_else(|| Error::coercion(attribute, raw))
        }
        Classification::Int8
        | Classification::Int16
        | Classification::ColorTemperature
        | Classification::Rgb => {
            let number = match raw {
                Value::Number(n) => n.as_f64(),
                Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            };
            number
                .filter(|n| n.is_finite())
                .map(|n| ItemValue::Int(n.trunc() as i64))
                .ok_or_else(|| Error::coercion(attribute, raw))
        }
    }
}

/// Converts an item value into the wire value sent for `attribute`,
/// clamping integer classes into their range.
pub fn to_wire(value: &ItemValue, attribute: Attribute) -> Result<Value> {
    let class = attribute.classification();
    if let Some((min, max)) = class.range() {
        let number = value
            .as_f64()
            .ok_or_else(|| Error::coercion(attribute, value.to_json()))?;
        return Ok(Value::from(clamp_int(number, min, max)));
    }
    match class {
        Classification::Bool => Ok(Value::Bool(value.truthy())),
        Classification::Str | Classification::Group => Ok(Value::String(match value {
            ItemValue::Str(s) => s.clone(),
            other => other.to_json().to_string(),
        })),
        _ => Ok(value.to_json()),
    }
}

fn json_truthy(raw: &Value) -> bool {
    match raw {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(values) => !values.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
