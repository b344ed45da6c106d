// ============================================================
// Layer 4 — Record Loader
// ============================================================
// Reads a JSON-lines file: one `TranslitRecord` per line.
//
// Blank lines are ignored. Any malformed line aborts the whole
// load with the line number in the message; records are never
// skipped.

use std::{fs, path::Path};

use crate::domain::error::{Result, TranslitError};
use crate::domain::record::TranslitRecord;

/// Load all records from `path`.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<TranslitRecord>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| TranslitError::io(path, e))?;

    let mut records = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record: TranslitRecord = serde_json::from_str(line).map_err(|e| {
            TranslitError::Data(format!("{}:{}: {e}", path.display(), line_no + 1))
        })?;
        records.push(record);
    }

    tracing::debug!("Read {} records from '{}'", records.len(), path.display());
    Ok(records)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_jsonl() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"word": "kana", "kata": ["カナ"]}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, r#"{{"word": "piano", "kata": ["ピアノ", "ピヤノ"]}}"#).unwrap();

        let records = load_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].references.len(), 2);
    }

    #[test]
    fn test_malformed_line_aborts() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"word": "kana", "kata": ["カナ"]}}"#).unwrap();
        writeln!(file, r#"{{"word": "broken""#).unwrap();

        let err = load_records(file.path()).unwrap_err();
        assert!(matches!(err, TranslitError::Data(msg) if msg.contains(":2:")));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_records("/nonexistent/records.jsonl").unwrap_err();
        assert!(matches!(err, TranslitError::Io { .. }));
    }
}
