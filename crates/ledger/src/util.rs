//! Internal helpers for input normalization and stored-value decoding.

use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID read back from storage.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| EngineError::InvalidData(format!("invalid {label} id: {value}")))
}

/// Trimmed, non-empty text or `InvalidInput`.
pub(crate) fn normalize_required(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_is_trimmed() {
        assert_eq!(normalize_required("  Crew  ", "pool name").unwrap(), "Crew");
        assert_eq!(
            normalize_required("   ", "pool name"),
            Err(EngineError::InvalidInput(
                "pool name must not be empty".to_string()
            ))
        );
    }

    #[test]
    fn blank_optional_text_is_dropped() {
        assert_eq!(normalize_optional(Some("  ")), None);
        assert_eq!(normalize_optional(Some(" 42 ")), Some("42".to_string()));
        assert_eq!(normalize_optional(None), None);
    }

    #[test]
    fn stored_ids_must_be_uuids() {
        assert!(parse_uuid("nope", "pool").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_uuid(&id.to_string(), "pool").unwrap(), id);
    }
}
