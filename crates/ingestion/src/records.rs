//! Structured query/response records
//!
//! Reads a line-delimited JSON file where every line is an object with
//! optional `query`, `response` and `id` fields.

use lexrag_common::document::{ID_KEY, RECORD_SOURCE, SOURCE_KEY};
use lexrag_common::errors::{AppError, Result};
use lexrag_common::{Metadata, SourceDocument};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize)]
struct QueryRecord {
    #[serde(default)]
    query: String,
    #[serde(default)]
    response: String,
    #[serde(default)]
    id: Option<Value>,
}

impl QueryRecord {
    /// Text composed from the trimmed fields; None when both are empty
    fn text(&self) -> Option<String> {
        let query = self.query.trim();
        let response = self.response.trim();

        match (query.is_empty(), response.is_empty()) {
            (false, false) => Some(format!("Query: {}\nResponse: {}", query, response)),
            (false, true) => Some(query.to_string()),
            (true, false) => Some(response.to_string()),
            (true, true) => None,
        }
    }

    fn id(&self) -> String {
        match &self.id {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

/// Load one document per non-empty record in `path`.
pub fn load_records(path: &Path) -> Result<Vec<SourceDocument>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| AppError::load(path.display(), format!("Cannot read records: {}", e)))?;

    let documents = parse_records(&content).map_err(|message| AppError::load(path.display(), message))?;

    info!(path = %path.display(), records = documents.len(), "Loaded query/response records");
    Ok(documents)
}

fn parse_records(content: &str) -> std::result::Result<Vec<SourceDocument>, String> {
    let mut documents = Vec::new();
    let mut skipped = 0usize;

    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let record: QueryRecord = serde_json::from_str(line)
            .map_err(|e| format!("Invalid record on line {}: {}", index + 1, e))?;

        let Some(text) = record.text() else {
            skipped += 1;
            continue;
        };

        let mut metadata = Metadata::new();
        metadata.insert(ID_KEY.to_string(), json!(record.id()));
        metadata.insert(SOURCE_KEY.to_string(), json!(RECORD_SOURCE));
        documents.push(SourceDocument::new(text, metadata));
    }

    if skipped > 0 {
        debug!(skipped, "Skipped records with neither query nor response");
    }

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_record() {
        let docs = parse_records(
            r#"{"id": 7, "query": " What is consideration? ", "response": "A bargained-for exchange."}"#,
        )
        .unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(
            docs[0].text,
            "Query: What is consideration?\nResponse: A bargained-for exchange."
        );
        assert_eq!(docs[0].metadata["id"], json!("7"));
        assert_eq!(docs[0].source(), Some("JSONL"));
    }

    #[test]
    fn test_partial_records() {
        let content = concat!(
            r#"{"id": "a", "query": "Only a question"}"#,
            "\n",
            r#"{"id": "b", "response": "Only an answer"}"#,
        );
        let docs = parse_records(content).unwrap();

        assert_eq!(docs[0].text, "Only a question");
        assert_eq!(docs[1].text, "Only an answer");
        assert_eq!(docs[1].metadata["id"], json!("b"));
    }

    #[test]
    fn test_empty_records_and_blank_lines_are_skipped() {
        let content = "\n{\"id\": 1, \"query\": \"  \", \"response\": \"\"}\n   \n{\"query\": \"Estoppel?\"}\n";
        let docs = parse_records(content).unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].text, "Estoppel?");
        assert_eq!(docs[0].metadata["id"], json!(""));
    }

    #[test]
    fn test_invalid_line_names_line_number() {
        let content = "{\"query\": \"ok\"}\nnot json\n";
        let message = parse_records(content).unwrap_err();
        assert!(message.contains("line 2"), "{}", message);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = load_records(Path::new("/nonexistent/lexrag/data.jsonl")).unwrap_err();
        assert!(matches!(err, AppError::Load { .. }));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.jsonl");
        std::fs::write(&path, "{\"query\": \"q1\", \"response\": \"r1\"}\n{\"query\": \"q2\"}\n").unwrap();

        let docs = load_records(&path).unwrap();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.source() == Some(RECORD_SOURCE)));
    }
}
