use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::DecodeError;

/// Payload observed under an Entry. Opaque to regmap: only compared, never read.
///
/// Equality is structural (see [`structurally_equal`]), which is what Record
/// deduplication relies on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Map<String, Value>);

impl Item {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        objects_equal(&self.0, &other.0)
    }
}

impl From<Map<String, Value>> for Item {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl TryFrom<Value> for Item {
    type Error = DecodeError;

    fn try_from(v: Value) -> Result<Self, Self::Error> {
        match v {
            Value::Object(m) => Ok(Self(m)),
            _ => Err(DecodeError::WrongType {
                field: crate::FIELD_ITEM,
                expected: "an object",
            }),
        }
    }
}

/// Deep equality over JSON values.
///
/// Objects compare by key set and per-key value, arrays element-wise in order.
/// Numbers compare by numeric value, so `1` and `1.0` are equal: producers
/// re-encode numbers freely and the same fact must not be stored twice.
pub fn structurally_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(x), Value::Object(y)) => objects_equal(x, y),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| structurally_equal(l, r))
        }
        (Value::Number(x), Value::Number(y)) => {
            if let (Some(l), Some(r)) = (x.as_i64(), y.as_i64()) {
                return l == r;
            }
            if let (Some(l), Some(r)) = (x.as_u64(), y.as_u64()) {
                return l == r;
            }
            match (x.as_f64(), y.as_f64()) {
                (Some(l), Some(r)) => l == r,
                _ => false,
            }
        }
        _ => a == b,
    }
}

fn objects_equal(x: &Map<String, Value>, y: &Map<String, Value>) -> bool {
    x.len() == y.len()
        && x
            .iter()
            .all(|(k, v)| y.get(k).map_or(false, |w| structurally_equal(v, w)))
}
