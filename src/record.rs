use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::{
    codec::{EncodedToken, LITERAL_MARKER},
    error::{MarshalError, MarshalResult},
    value::Value,
};

/// Opaque board-style identifier of a remote object.
pub type CapabilityId = String;

/// Wire shape shared by published records and outbound offers: an encoded body
/// plus the identifiers its reference tokens point into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapData {
    pub body: String,
    pub slots: Vec<CapabilityId>,
}

impl CapData {
    pub fn new<S: Into<String>>(body: S, slots: Vec<CapabilityId>) -> Self {
        Self {
            body: body.into(),
            slots,
        }
    }
}

/// One published `(entries, identifiers)` unit.
///
/// Entry values are kept exactly as published; reference tokens are resolved
/// later by the correlator, never here.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub entries: Vec<(String, Value)>,
    pub identifiers: Vec<CapabilityId>,
}

impl Record {
    pub fn new(entries: Vec<(String, Value)>, identifiers: Vec<CapabilityId>) -> Self {
        Self {
            entries,
            identifiers,
        }
    }

    /// Decodes the body of a published record into its name/value pairs.
    ///
    /// The body must be a literal holding a sequence of `[name, value]` pairs.
    /// Source order is kept and duplicate names are allowed.
    #[instrument(level = "debug", skip(raw), fields(slots = raw.slots.len()))]
    pub fn decode(raw: &CapData) -> MarshalResult<Self> {
        let literal = match EncodedToken::classify(&raw.body) {
            EncodedToken::Literal(literal) => literal,
            _ => {
                return Err(MarshalError::encoding(
                    raw.body.as_str(),
                    format!("record body must start with {:?}", LITERAL_MARKER),
                ))
            }
        };

        let body: serde_json::Value = serde_json::from_str(literal)
            .map_err(|e| MarshalError::encoding(raw.body.as_str(), e))?;

        let pairs = match Value::from(body) {
            Value::Sequence(pairs) => pairs,
            other => {
                return Err(MarshalError::encoding(
                    raw.body.as_str(),
                    format!("expected a sequence of entries, got {}", other),
                ))
            }
        };

        let mut entries = Vec::with_capacity(pairs.len());
        for pair in pairs {
            entries.push(decode_entry(&raw.body, pair)?);
        }

        debug!("decoded {} entries", entries.len());

        Ok(Self {
            entries,
            identifiers: raw.slots.clone(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}

fn decode_entry(body: &str, pair: Value) -> MarshalResult<(String, Value)> {
    let malformed = |pair: &Value| {
        MarshalError::encoding(body, format!("expected a [name, value] pair, got {}", pair))
    };

    match pair {
        Value::Sequence(mut items) if items.len() == 2 => {
            let value = items.pop().unwrap_or_default();
            match items.pop() {
                Some(Value::String(name)) => Ok((name, value)),
                Some(name) => Err(malformed(&Value::Sequence(vec![name, value]))),
                None => Err(malformed(&Value::Sequence(vec![value]))),
            }
        }
        other => Err(malformed(&other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw(body: &str) -> CapData {
        CapData::new(body, vec!["board01".to_string(), "board02".to_string()])
    }

    #[test]
    fn test_decode_record() {
        let record =
            Record::decode(&raw(r##"#[["amm","#3"],["treasury","$1.Alleged: instance"]]"##))
                .unwrap();

        assert_eq!(
            record.entries,
            vec![
                ("amm".to_string(), Value::from("#3")),
                ("treasury".to_string(), Value::from("$1.Alleged: instance")),
            ]
        );
        assert_eq!(record.identifiers, vec!["board01", "board02"]);
    }

    #[test]
    fn test_decode_keeps_duplicates_in_order() {
        let record = Record::decode(&raw(r#"#[["x","$0"],["y","$1"],["x","$1"]]"#)).unwrap();
        assert_eq!(record.names().collect::<Vec<_>>(), vec!["x", "y", "x"]);
    }

    #[test]
    fn test_decode_keeps_nested_values() {
        let record = Record::decode(&raw(r#"#[["nested",{"a":["$0"]}]]"#)).unwrap();
        assert_eq!(
            record.entries[0].1,
            Value::Mapping(vec![(
                "a".to_string(),
                Value::Sequence(vec![Value::from("$0")])
            )])
        );
    }

    #[test]
    fn test_decode_empty_record() {
        let record = Record::decode(&CapData::new("#[]", vec![])).unwrap();
        assert!(record.entries.is_empty());
        assert!(record.identifiers.is_empty());
    }

    #[test]
    fn test_decode_rejects_malformed_bodies() {
        for body in [
            "[]",
            "#{",
            r#"#{"a":1}"#,
            r#"#[["only-name"]]"#,
            r#"#[[1,"$0"]]"#,
            r#"#["flat"]"#,
        ] {
            assert!(
                matches!(Record::decode(&raw(body)), Err(MarshalError::Encoding { .. })),
                "body {:?}",
                body
            );
        }
    }
}
