use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::timestamp::Timestamp;

/// Free-form structured payload attached to an entry's `details` field.
///
/// Maps keep the order in which the caller built them; the canonical encoder
/// sorts keys at every level before hashing, so two maps with the same
/// contents hash identically regardless of construction order.
#[derive(Clone, Debug, PartialEq)]
pub enum DetailValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
    Timestamp(Timestamp),
    List(Vec<DetailValue>),
    Map(Vec<(String, DetailValue)>),
}

impl DetailValue {
    /// Build a map value from key/value pairs, keeping their order.
    pub fn map<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<DetailValue>,
    {
        Self::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Build a list value.
    pub fn list<I, V>(items: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<DetailValue>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Look up the first value stored under `key` in a map.
    pub fn get(&self, key: &str) -> Option<&DetailValue> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::UInt(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for DetailValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for DetailValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<i64> for DetailValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for DetailValue {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u64> for DetailValue {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(n) => Self::Int(n),
            Err(_) => Self::UInt(v),
        }
    }
}

impl From<usize> for DetailValue {
    fn from(v: usize) -> Self {
        Self::from(v as u64)
    }
}

impl From<f64> for DetailValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for DetailValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for DetailValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Timestamp> for DetailValue {
    fn from(v: Timestamp) -> Self {
        Self::Timestamp(v)
    }
}

impl<T: Into<DetailValue>> From<Vec<T>> for DetailValue {
    fn from(v: Vec<T>) -> Self {
        Self::list(v)
    }
}

impl<T: Into<DetailValue>> From<Option<T>> for DetailValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl From<serde_json::Value> for DetailValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::List(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect()),
        }
    }
}

impl Serialize for DetailValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::UInt(n) => serializer.serialize_u64(*n),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Text(s) => serializer.serialize_str(s),
            Self::Timestamp(ts) => ts.serialize(serializer),
            Self::List(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

// Timestamps come back as text. Both encode to the same canonical string, so
// the distinction does not affect the chain.
impl<'de> Deserialize<'de> for DetailValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Self::from)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use serde_json::json;

    #[test]
    fn map_builder_keeps_insertion_order() {
        let value = DetailValue::map([("b", 2), ("a", 1)]);
        let DetailValue::Map(entries) = &value else {
            panic!("expected map");
        };
        assert_eq!(entries[0].0, "b");
        assert_eq!(entries[1].0, "a");
        assert_eq!(value.get("a"), Some(&DetailValue::Int(1)));
        assert_eq!(value.get("missing"), None);
    }

    #[test]
    fn json_numbers_pick_the_narrowest_variant() {
        assert_eq!(DetailValue::from(json!(-3)), DetailValue::Int(-3));
        assert_eq!(DetailValue::from(json!(u64::MAX)), DetailValue::UInt(u64::MAX));
        assert_eq!(DetailValue::from(json!(1.5)), DetailValue::Float(1.5));
    }

    #[test]
    fn u64_conversion_prefers_int() {
        assert_eq!(DetailValue::from(7u64), DetailValue::Int(7));
        assert_eq!(DetailValue::from(u64::MAX), DetailValue::UInt(u64::MAX));
    }

    #[test]
    fn nested_json_converts_recursively() {
        let value = DetailValue::from(json!({
            "reason": "expired",
            "fields": ["email", "phone"],
            "meta": { "attempts": 3, "locked": true, "note": null }
        }));
        assert_eq!(value.get("reason").and_then(DetailValue::as_str), Some("expired"));
        assert_eq!(
            value.get("fields"),
            Some(&DetailValue::list(["email", "phone"]))
        );
        let meta = value.get("meta").unwrap();
        assert_eq!(meta.get("attempts").and_then(DetailValue::as_i64), Some(3));
        assert!(meta.get("note").unwrap().is_null());
    }

    #[test]
    fn serializes_as_natural_json() {
        let ts = Timestamp::from_millis(0).unwrap();
        let value = DetailValue::map([
            ("z", DetailValue::from(true)),
            ("at", DetailValue::from(ts)),
            ("tags", DetailValue::list(["x"])),
        ]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(
            json,
            r#"{"z":true,"at":"1970-01-01T00:00:00.000Z","tags":["x"]}"#
        );
    }

    #[test]
    fn deserializes_from_json() {
        let value: DetailValue = serde_json::from_str(r#"{"n":1,"f":2.5,"s":"x"}"#).unwrap();
        assert_eq!(value.get("n"), Some(&DetailValue::Int(1)));
        assert_eq!(value.get("f"), Some(&DetailValue::Float(2.5)));
        assert_eq!(value.get("s"), Some(&DetailValue::from("x")));
    }

    #[test]
    fn option_maps_none_to_null() {
        assert_eq!(DetailValue::from(None::<String>), DetailValue::Null);
        assert_eq!(DetailValue::from(Some("a")), DetailValue::from("a"));
    }

    proptest! {
        #[test]
        fn finite_floats_survive_a_json_round_trip(
            x in any::<f64>().prop_filter("finite", |x| x.is_finite())
        ) {
            let value = DetailValue::list([DetailValue::Float(x)]);
            let json = serde_json::to_string(&value).unwrap();
            let back: DetailValue = serde_json::from_str(&json).unwrap();
            prop_assert_eq!(back, value);
        }
    }
}
