//! Values held by host items.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// The value of a host item.
///
/// Hosts hold loosely typed values; this is the set the plugin reads and
/// writes. Lists carry DPT3 dimmer telegrams and `xy` points, dicts carry
/// structured bridge configuration such as the user whitelist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemValue {
    Bool(bool),
    Int(i64),
    Num(f64),
    Str(String),
    List(Vec<ItemValue>),
    Dict(Map<String, Value>),
}

impl Default for ItemValue {
    fn default() -> Self {
        ItemValue::Bool(false)
    }
}

impl ItemValue {
    /// Builds a value from JSON. `null` has no item representation.
    ///
    /// ```
    /// use serde_json::json;
    /// use hue_items_rs::ItemValue;
    ///
    /// assert_eq!(ItemValue::from_json(&json!(37)), Some(ItemValue::Int(37)));
    /// assert_eq!(ItemValue::from_json(&json!(null)), None);
    /// ```
    pub fn from_json(value: &Value) -> Option<Self> {
        Some(match value {
            Value::Null => return None,
            Value::Bool(b) => ItemValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ItemValue::Int(i),
                None => ItemValue::Num(n.as_f64()?),
            },
            Value::String(s) => ItemValue::Str(s.clone()),
            Value::Array(values) => {
                ItemValue::List(values.iter().filter_map(ItemValue::from_json).collect())
            }
            Value::Object(map) => ItemValue::Dict(map.clone()),
        })
    }

    pub fn to_json(&self) -> Value {
        match self {
            ItemValue::Bool(b) => Value::Bool(*b),
            ItemValue::Int(i) => Value::from(*i),
            ItemValue::Num(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
            ItemValue::Str(s) => Value::String(s.clone()),
            ItemValue::List(values) => Value::Array(values.iter().map(Self::to_json).collect()),
            ItemValue::Dict(map) => Value::Object(map.clone()),
        }
    }

    /// Numeric view of the value; strings are parsed, bools are 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ItemValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            ItemValue::Int(i) => Some(*i as f64),
            ItemValue::Num(f) => Some(*f),
            ItemValue::Str(s) => s.trim().parse().ok(),
            ItemValue::List(_) | ItemValue::Dict(_) => None,
        }
    }

    /// Truthiness: zero, empty and false are false.
    pub fn truthy(&self) -> bool {
        match self {
            ItemValue::Bool(b) => *b,
            ItemValue::Int(i) => *i != 0,
            ItemValue::Num(f) => *f != 0.0,
            ItemValue::Str(s) => !s.is_empty(),
            ItemValue::List(values) => !values.is_empty(),
            ItemValue::Dict(map) => !map.is_empty(),
        }
    }
}

impl From<bool> for ItemValue {
    fn from(value: bool) -> Self {
        ItemValue::Bool(value)
    }
}

impl From<i64> for ItemValue {
    fn from(value: i64) -> Self {
        ItemValue::Int(value)
    }
}

impl From<f64> for ItemValue {
    fn from(value: f64) -> Self {
        ItemValue::Num(value)
    }
}

impl From<&str> for ItemValue {
    fn from(value: &str) -> Self {
        ItemValue::Str(value.to_string())
    }
}
