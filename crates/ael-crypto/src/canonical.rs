use std::fmt;

use ael_types::DetailValue;

/// Deterministic byte form of a structured value.
///
/// Canonical JSON: no whitespace, map keys sorted by their UTF-8 bytes at
/// every nesting level, sequences in their original order, timestamps in
/// their fixed millisecond form. The same value always yields the same bytes.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CanonicalForm(String);

impl CanonicalForm {
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for CanonicalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalForm({})", self.0)
    }
}

impl fmt::Display for CanonicalForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A value that has no canonical representation.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("non-finite number at {path}")]
    NonFiniteNumber { path: String },

    #[error("duplicate map key {key:?} at {path}")]
    DuplicateKey { path: String, key: String },

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Canonical JSON encoder.
///
/// Values that cannot be represented (NaN or infinite floats, maps with
/// repeated keys) are rejected rather than silently dropped or coerced.
pub struct CanonicalEncoder;

impl CanonicalEncoder {
    /// Produce the canonical form of `value`.
    pub fn canonicalize(value: &DetailValue) -> Result<CanonicalForm, EncodingError> {
        let mut out = String::new();
        write_value(&mut out, value, "$")?;
        Ok(CanonicalForm(out))
    }
}

fn write_value(out: &mut String, value: &DetailValue, path: &str) -> Result<(), EncodingError> {
    match value {
        DetailValue::Null => out.push_str("null"),
        DetailValue::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        DetailValue::Int(n) => out.push_str(&n.to_string()),
        DetailValue::UInt(n) => out.push_str(&n.to_string()),
        DetailValue::Float(f) => {
            let number = serde_json::Number::from_f64(*f).ok_or_else(|| {
                EncodingError::NonFiniteNumber {
                    path: path.to_string(),
                }
            })?;
            out.push_str(&number.to_string());
        }
        DetailValue::Text(s) => write_string(out, s)?,
        DetailValue::Timestamp(ts) => write_string(out, &ts.to_canonical_string())?,
        DetailValue::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item, &format!("{path}[{i}]"))?;
            }
            out.push(']');
        }
        DetailValue::Map(entries) => {
            let mut sorted: Vec<&(String, DetailValue)> = entries.iter().collect();
            sorted.sort_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

            if let Some(pair) = sorted.windows(2).find(|pair| pair[0].0 == pair[1].0) {
                return Err(EncodingError::DuplicateKey {
                    path: path.to_string(),
                    key: pair[0].0.clone(),
                });
            }

            out.push('{');
            for (i, (key, item)) in sorted.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key)?;
                out.push(':');
                write_value(out, item, &format!("{path}.{key}"))?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_string(out: &mut String, s: &str) -> Result<(), EncodingError> {
    let quoted = serde_json::to_string(s).map_err(|e| EncodingError::Serialization(e.to_string()))?;
    out.push_str(&quoted);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ael_types::Timestamp;
    use proptest::prelude::*;
    use serde_json::json;

    fn canon(value: &DetailValue) -> String {
        CanonicalEncoder::canonicalize(value).unwrap().into_string()
    }

    #[test]
    fn scalars_encode_as_themselves() {
        assert_eq!(canon(&DetailValue::Null), "null");
        assert_eq!(canon(&DetailValue::Bool(true)), "true");
        assert_eq!(canon(&DetailValue::Int(-42)), "-42");
        assert_eq!(canon(&DetailValue::UInt(u64::MAX)), "18446744073709551615");
        assert_eq!(canon(&DetailValue::Float(1.5)), "1.5");
        assert_eq!(canon(&DetailValue::from("hi")), "\"hi\"");
    }

    #[test]
    fn strings_are_json_escaped() {
        assert_eq!(
            canon(&DetailValue::from("a\"b\\c\n")),
            r#""a\"b\\c\n""#
        );
    }

    #[test]
    fn timestamps_use_fixed_millisecond_form() {
        let ts = Timestamp::from_millis(1_700_000_000_007).unwrap();
        assert_eq!(
            canon(&DetailValue::Timestamp(ts)),
            "\"2023-11-14T22:13:20.007Z\""
        );
    }

    #[test]
    fn map_keys_are_sorted_at_every_level() {
        let value = DetailValue::map([
            ("b", DetailValue::map([("y", 1), ("x", 2)])),
            ("a", DetailValue::list([DetailValue::map([("d", 1), ("c", 2)])])),
        ]);
        assert_eq!(canon(&value), r#"{"a":[{"c":2,"d":1}],"b":{"x":2,"y":1}}"#);
    }

    #[test]
    fn key_order_does_not_change_output() {
        let ab = DetailValue::map([("a", 1), ("b", 2)]);
        let ba = DetailValue::map([("b", 2), ("a", 1)]);
        assert_eq!(
            CanonicalEncoder::canonicalize(&ab).unwrap(),
            CanonicalEncoder::canonicalize(&ba).unwrap()
        );
    }

    #[test]
    fn sequences_keep_their_order() {
        assert_eq!(canon(&DetailValue::list([3, 1, 2])), "[3,1,2]");
    }

    #[test]
    fn keys_sort_by_bytes() {
        let value = DetailValue::map([("a", 1), ("B", 2), ("_", 3)]);
        assert_eq!(canon(&value), r#"{"B":2,"_":3,"a":1}"#);
    }

    #[test]
    fn non_finite_floats_fail_loudly() {
        let value = DetailValue::map([("score", DetailValue::list([1.0, f64::NAN]))]);
        assert_eq!(
            CanonicalEncoder::canonicalize(&value),
            Err(EncodingError::NonFiniteNumber {
                path: "$.score[1]".into()
            })
        );
        assert!(CanonicalEncoder::canonicalize(&DetailValue::Float(f64::INFINITY)).is_err());
    }

    #[test]
    fn duplicate_keys_fail_loudly() {
        let value = DetailValue::map([("k", 1), ("k", 2)]);
        assert_eq!(
            CanonicalEncoder::canonicalize(&value),
            Err(EncodingError::DuplicateKey {
                path: "$".into(),
                key: "k".into()
            })
        );
    }

    #[test]
    fn matches_json_built_value() {
        let value = DetailValue::from(json!({"z": [true, null], "m": {"n": 1}}));
        assert_eq!(canon(&value), r#"{"m":{"n":1},"z":[true,null]}"#);
    }

    proptest! {
        #[test]
        fn reversed_insertion_order_is_invisible(
            pairs in proptest::collection::btree_map("[a-z]{1,6}", any::<i64>(), 0..12)
        ) {
            let forward = DetailValue::map(pairs.iter().map(|(k, v)| (k.clone(), *v)));
            let reversed = DetailValue::map(pairs.iter().rev().map(|(k, v)| (k.clone(), *v)));
            prop_assert_eq!(
                CanonicalEncoder::canonicalize(&forward).unwrap(),
                CanonicalEncoder::canonicalize(&reversed).unwrap()
            );
        }

        #[test]
        fn canonical_output_is_valid_json(s in ".*", n in any::<i64>()) {
            let value = DetailValue::map([("s", DetailValue::from(s.clone())), ("n", DetailValue::Int(n))]);
            let form = CanonicalEncoder::canonicalize(&value).unwrap();
            let parsed: serde_json::Value = serde_json::from_str(form.as_str()).unwrap();
            prop_assert_eq!(parsed["s"].as_str(), Some(s.as_str()));
            prop_assert_eq!(parsed["n"].as_i64(), Some(n));
        }
    }
}
