//! Scans a swingset slog (one JSON object per line) for the event types it
//! contains.
use std::{collections::HashSet, path::Path};

use tokio::{
    fs::File,
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
};
use tracing::{debug, warn};

use crate::{Error, InternalResult};

/// Distinct `type` values in first-seen order.
pub async fn unique_event_types<R>(reader: R) -> InternalResult<Vec<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut seen = HashSet::new();
    let mut types = Vec::new();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let entry: serde_json::Value = serde_json::from_str(&line)
            .map_err(|e| Error::Slog(format!("line {}: {}", line_no, e)))?;

        match entry.get("type").and_then(|t| t.as_str()) {
            Some(event_type) if !event_type.is_empty() => {
                if seen.insert(event_type.to_string()) {
                    types.push(event_type.to_string());
                }
            }
            _ => warn!("\"type\" key not present in slog {}", line),
        }
    }

    debug!("{} lines, {} event types", line_no, types.len());
    Ok(types)
}

pub async fn unique_event_types_in_file<P: AsRef<Path>>(path: P) -> InternalResult<Vec<String>> {
    let file = File::open(path.as_ref()).await.map_err(|e| {
        Error::Slog(format!(
            "Failed to open {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;
    unique_event_types(BufReader::new(file)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[tokio::test]
    async fn test_unique_event_types_in_order() {
        let slog = concat!(
            r#"{"type":"create-vat","time":1}"#,
            "\n",
            r#"{"type":"deliver","time":2}"#,
            "\n",
            "\n",
            r#"{"type":"create-vat","time":3}"#,
            "\n",
            r#"{"time":4}"#,
            "\n",
            r#"{"type":"syscall","time":5}"#,
            "\n",
        );

        let types = unique_event_types(slog.as_bytes()).await.unwrap();
        assert_eq!(types, vec!["create-vat", "deliver", "syscall"]);
    }

    #[tokio::test]
    async fn test_invalid_line() {
        let slog = "{\"type\":\"ok\"}\nnot json\n";
        match unique_event_types(slog.as_bytes()).await {
            Err(Error::Slog(message)) => assert!(message.starts_with("line 2")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"type":"cosmic-swingset-begin-block"}}"#).unwrap();
        writeln!(file, r#"{{"type":"cosmic-swingset-end-block"}}"#).unwrap();

        let types = unique_event_types_in_file(file.path()).await.unwrap();
        assert_eq!(
            types,
            vec!["cosmic-swingset-begin-block", "cosmic-swingset-end-block"]
        );

        assert!(matches!(
            unique_event_types_in_file("/nonexistent/slog").await,
            Err(Error::Slog(_))
        ));
    }
}
