//! Normalizes query responses into [`CapData`] records.
//!
//! Two encodings reach us: the `agd query vstorage data --output json` text,
//! whose `value` field is itself JSON text, and the node's `abci_query`
//! envelope carrying the same text base64-encoded.
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer};
use tracing::{debug, instrument, warn};

use crate::{
    error::{Error, InternalResult, MarshalResult},
    record::{CapData, Record},
};

#[derive(Debug, Deserialize)]
struct QueryOutput {
    value: String,
}

/// One cell of a published stream.
#[derive(Debug, Deserialize)]
pub struct StreamCell {
    #[serde(rename = "blockHeight", default, deserialize_with = "block_height")]
    pub block_height: Option<u64>,
    pub values: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Published {
    Stream(StreamCell),
    Single(CapData),
}

#[derive(Debug, Deserialize)]
struct AbciEnvelope {
    result: AbciResult,
}

#[derive(Debug, Deserialize)]
struct AbciResult {
    response: AbciResponse,
}

#[derive(Debug, Deserialize)]
struct AbciResponse {
    #[serde(default)]
    code: u32,
    #[serde(default)]
    log: String,
    #[serde(default)]
    value: Option<String>,
}

// vstorage reports heights as strings, older tooling as numbers
fn block_height<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Height {
        Number(u64),
        Text(String),
    }

    match Option::<Height>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Height::Number(n)) => Ok(Some(n)),
        Some(Height::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Parses the CLI's double-encoded output.
#[instrument(level = "debug", skip(text))]
pub fn records_from_cli(text: &str) -> InternalResult<Vec<CapData>> {
    let output: QueryOutput = serde_json::from_str(text.trim())
        .map_err(|e| Error::transport(format!("Invalid query output: {}", e)))?;
    published_records(&output.value)
}

/// Parses an `abci_query` envelope.
#[instrument(level = "debug", skip(text))]
pub fn records_from_abci(text: &str) -> InternalResult<Vec<CapData>> {
    let envelope: AbciEnvelope = serde_json::from_str(text.trim())
        .map_err(|e| Error::transport(format!("Invalid abci_query envelope: {}", e)))?;
    let response = envelope.result.response;

    if response.code != 0 {
        return Err(Error::transport(format!(
            "abci_query failed with code {}: {}",
            response.code, response.log
        )));
    }

    let encoded = match response.value {
        Some(encoded) if !encoded.is_empty() => encoded,
        _ => {
            warn!("abci_query returned no value");
            return Ok(vec![]);
        }
    };

    let bytes = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| Error::transport(format!("Invalid base64 value: {}", e)))?;
    let text = String::from_utf8(bytes)
        .map_err(|e| Error::transport(format!("Value is not UTF-8: {}", e)))?;

    records_from_cli(&text)
}

fn published_records(value: &str) -> InternalResult<Vec<CapData>> {
    let published: Published = serde_json::from_str(value)
        .map_err(|e| Error::transport(format!("Invalid published value: {}", e)))?;

    match published {
        Published::Single(cap_data) => Ok(vec![cap_data]),
        Published::Stream(cell) => {
            debug!(
                "stream cell at height {:?} with {} values",
                cell.block_height,
                cell.values.len()
            );
            cell.values
                .iter()
                .map(|value| {
                    serde_json::from_str::<CapData>(value)
                        .map_err(|e| Error::transport(format!("Invalid stream value: {}", e)))
                })
                .collect()
        }
    }
}

pub fn decode_records(raw: &[CapData]) -> MarshalResult<Vec<Record>> {
    raw.iter().map(Record::decode).collect()
}
