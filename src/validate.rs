use std::fs;
use std::path::Path;

use crate::error::ClientError;

/// Maximum accepted template upload size (server enforces the same limit)
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Outcome of validating the raw JSON text buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JsonStatus {
    /// Buffer is empty or whitespace only; neither valid nor an error
    Empty,
    Valid,
    /// Carries the parser's syntax message for display
    Invalid(String),
}

/// Client-side check of a template file before any network call.
///
/// The extension must be `.docx` (case-insensitive) and the size at most
/// 10 MB. This is a fast-fail UX check only; the server re-validates.
pub fn validate_template_file(filename: &str, size: u64) -> Result<(), ClientError> {
    if !filename.to_lowercase().ends_with(".docx") {
        return Err(ClientError::Validation(
            "Please choose a file with the .docx extension".to_string(),
        ));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(ClientError::Validation(
            "File is too large. Maximum size: 10 MB".to_string(),
        ));
    }
    Ok(())
}

/// Validates a template file on disk by name and size.
pub fn validate_template_path(path: &Path) -> Result<(), ClientError> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ClientError::Validation("Invalid file path".to_string()))?;
    let meta = fs::metadata(path)
        .map_err(|e| ClientError::Validation(format!("Cannot read file: {}", e)))?;
    validate_template_file(filename, meta.len())
}

/// Validates the raw JSON text buffer.
pub fn validate_json_text(text: &str) -> JsonStatus {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return JsonStatus::Empty;
    }
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(_) => JsonStatus::Valid,
        Err(e) => JsonStatus::Invalid(format!("JSON error: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn accepts_docx_under_limit() {
        assert!(validate_template_file("invoice.docx", 1024).is_ok());
        assert!(validate_template_file("INVOICE.DOCX", MAX_UPLOAD_BYTES).is_ok());
    }

    #[test]
    fn rejects_wrong_extension() {
        assert!(validate_template_file("invoice.doc", 1024).is_err());
        assert!(validate_template_file("invoice", 1024).is_err());
    }

    #[test]
    fn rejects_oversized_file() {
        assert!(validate_template_file("invoice.docx", MAX_UPLOAD_BYTES + 1).is_err());
    }

    #[test]
    fn validates_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.docx");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"PK fake docx").unwrap();

        assert!(validate_template_path(&path).is_ok());

        let bad = dir.path().join("template.txt");
        std::fs::File::create(&bad).unwrap();
        assert!(validate_template_path(&bad).is_err());
    }

    #[test]
    fn json_validation_reports_syntax_errors() {
        assert_eq!(validate_json_text(""), JsonStatus::Empty);
        assert_eq!(validate_json_text("   \n"), JsonStatus::Empty);
        assert_eq!(validate_json_text("{\"a\": 1}"), JsonStatus::Valid);
        match validate_json_text("{\"a\":}") {
            JsonStatus::Invalid(msg) => assert!(msg.starts_with("JSON error:")),
            other => panic!("expected invalid, got {:?}", other),
        }
    }
}
