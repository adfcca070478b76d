use tracing::{debug, instrument};

use crate::{
    codec::{parse_reference, ReferenceToken},
    error::{MarshalError, MarshalResult},
    record::{CapabilityId, Record},
};

/// A named entry resolved against its record's identifier array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub id: CapabilityId,
    /// The entry's reference token renumbered to slot 0.
    pub token: ReferenceToken,
}

impl Resolution {
    pub fn rewritten_token(&self) -> String {
        self.token.to_string()
    }
}

/// Resolves `target` to the identifier its reference token points at.
///
/// The first entry named `target` wins; later entries with the same name are
/// ignored even if they reference a different slot.
#[instrument(level = "debug", skip(record))]
pub fn resolve(record: &Record, target: &str) -> MarshalResult<Resolution> {
    let (_, value) = record
        .entries
        .iter()
        .find(|(name, _)| name == target)
        .ok_or_else(|| MarshalError::NotFound {
            name: target.to_string(),
        })?;

    let token = value
        .as_str()
        .ok_or_else(|| MarshalError::MalformedReference {
            value: value.to_json_string(),
        })
        .and_then(parse_reference)?;

    let id = record
        .identifiers
        .get(token.index)
        .ok_or(MarshalError::IndexOutOfRange {
            index: token.index,
            len: record.identifiers.len(),
        })?;

    debug!("{} -> slot {} ({})", target, token.index, id);

    Ok(Resolution {
        id: id.clone(),
        token: token.with_index(0),
    })
}

/// Resolves `target` across several records, e.g. the cells of a published
/// stream. The first record containing the name decides the outcome.
pub fn resolve_in<'a, I>(records: I, target: &str) -> MarshalResult<Resolution>
where
    I: IntoIterator<Item = &'a Record>,
{
    for record in records {
        match resolve(record, target) {
            Err(MarshalError::NotFound { .. }) => continue,
            result => return result,
        }
    }
    Err(MarshalError::NotFound {
        name: target.to_string(),
    })
}
