//! HTTP handlers for certificates and reference data.

pub mod certificate;
pub mod directory;

use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

/// Path ids that are not UUIDs cannot name a record, so they report the record's not-found message.
fn parse_id(raw: &str, not_found: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::NotFound(not_found.into()))
}

/// Decode a JSON body into a typed request; shape errors are validation failures.
fn typed_body<T: DeserializeOwned>(body: Value) -> Result<T, AppError> {
    serde_json::from_value(body).map_err(|e| AppError::Validation(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "x").unwrap(), id);
        assert!(matches!(parse_id("123", "Student not found"), Err(AppError::NotFound(m)) if m == "Student not found"));
    }
}
