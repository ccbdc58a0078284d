//! Multipart form parsing helpers
//!
//! Provides reusable abstractions for parsing multipart/form-data uploads,
//! reducing code duplication across handlers. The file field is read
//! exactly once into memory; the multipart stream is single-use and is
//! never re-read.

use std::collections::HashMap;

use axum::extract::Multipart;
use uuid::Uuid;

use crate::error::ApiError;
use crate::validation::{validate_content_type, validate_file_size};

/// Represents a file uploaded via multipart form
#[derive(Debug, Clone)]
pub struct FileField {
    /// File data bytes
    pub data: Vec<u8>,
    /// Content-Type from the multipart field (if provided)
    pub content_type: Option<String>,
    /// Original filename from the multipart field (if provided)
    pub file_name: Option<String>,
}

/// Parsed multipart form fields
///
/// Provides structured access to file and text fields from a
/// multipart/form-data request.
#[derive(Debug)]
pub struct MultipartFields {
    /// File field (typically named "file")
    file: Option<FileField>,
    /// Text fields indexed by name
    text_fields: HashMap<String, String>,
}

impl MultipartFields {
    /// Parse all fields from a multipart request
    ///
    /// Validates the file's Content-Type and size as it is read.
    pub async fn parse(multipart: &mut Multipart, max_file_size: usize) -> Result<Self, ApiError> {
        let mut file: Option<FileField> = None;
        let mut text_fields = HashMap::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to parse multipart: {e}")))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == "file" {
                let content_type = field.content_type().map(|s| s.to_string());
                let file_name = field.file_name().map(|s| s.to_string());

                validate_content_type(content_type.as_deref())?;

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?
                    .to_vec();

                validate_file_size(data.len(), max_file_size)?;

                file = Some(FileField {
                    data,
                    content_type,
                    file_name,
                });
            } else {
                let value = field.text().await.map_err(|e| {
                    ApiError::bad_request(format!("Failed to read field '{name}': {e}"))
                })?;
                text_fields.insert(name, value);
            }
        }

        Ok(Self { file, text_fields })
    }

    /// Take ownership of the file field (required)
    ///
    /// Moves the buffered bytes out so the caller hands them on without
    /// copying. Returns an error if no file was uploaded.
    pub fn take_file(&mut self) -> Result<FileField, ApiError> {
        self.file.take().ok_or_else(|| {
            ApiError::bad_request("No file provided. Use 'file' field in multipart form.")
        })
    }

    /// Get a text field value
    pub fn get_text(&self, name: &str) -> Option<&str> {
        self.text_fields.get(name).map(|s| s.as_str())
    }

    /// Get a required text field parsed as a UUID
    pub fn require_uuid(&self, name: &str) -> Result<Uuid, ApiError> {
        let raw = self
            .get_text(name)
            .ok_or_else(|| ApiError::bad_request(format!("Missing required field '{name}'")))?;
        raw.parse()
            .map_err(|_| ApiError::bad_request(format!("Field '{name}' is not a valid UUID")))
    }

    /// Get a text field parsed as an integer, defaulting to zero
    pub fn get_i64(&self, name: &str) -> Result<i64, ApiError> {
        match self.get_text(name) {
            Some(raw) if !raw.is_empty() => raw
                .parse()
                .map_err(|_| ApiError::bad_request(format!("Field '{name}' is not a number"))),
            _ => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields_with(text_fields: HashMap<String, String>) -> MultipartFields {
        MultipartFields {
            file: None,
            text_fields,
        }
    }

    #[test]
    fn test_get_text() {
        let mut text_fields = HashMap::new();
        text_fields.insert("title".to_string(), "Beach".to_string());

        let fields = fields_with(text_fields);
        assert_eq!(fields.get_text("title"), Some("Beach"));
        assert_eq!(fields.get_text("missing"), None);
    }

    #[test]
    fn test_require_uuid() {
        let mut text_fields = HashMap::new();
        text_fields.insert(
            "creator_id".to_string(),
            "550e8400-e29b-41d4-a716-446655440000".to_string(),
        );
        text_fields.insert("bad".to_string(), "not-a-uuid".to_string());

        let fields = fields_with(text_fields);
        assert!(fields.require_uuid("creator_id").is_ok());
        assert!(fields.require_uuid("bad").is_err());
        assert!(fields.require_uuid("missing").is_err());
    }

    #[test]
    fn test_get_i64_defaults_to_zero() {
        let mut text_fields = HashMap::new();
        text_fields.insert("price".to_string(), "1500".to_string());

        let fields = fields_with(text_fields);
        assert_eq!(fields.get_i64("price").unwrap(), 1500);
        assert_eq!(fields.get_i64("missing").unwrap(), 0);
    }

    #[test]
    fn test_take_file_moves_buffer_out() {
        let mut fields = MultipartFields {
            file: Some(FileField {
                data: vec![1, 2, 3],
                content_type: Some("image/jpeg".into()),
                file_name: Some("a.jpg".into()),
            }),
            text_fields: HashMap::new(),
        };

        let file = fields.take_file().unwrap();
        assert_eq!(file.data, vec![1, 2, 3]);
        // Single-use: the buffer is gone after the take.
        assert!(fields.take_file().is_err());
    }

    #[test]
    fn test_take_file_missing() {
        let mut fields = fields_with(HashMap::new());
        assert!(fields.take_file().is_err());
    }
}
