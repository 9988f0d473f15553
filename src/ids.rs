//! Identifier translation between the API and storage.
//!
//! Rows use `BIGSERIAL` keys; everything above the repositories sees opaque
//! strings, so callers never depend on the storage representation.

use crate::error::{AppError, AppResult};

/// Parse a domain identifier into a storage key.
///
/// Fails with `InvalidIdentifier` for anything that is not a positive
/// 64-bit integer.
pub fn parse_id(raw: &str) -> AppResult<i64> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::InvalidIdentifier(raw.to_string())),
    }
}

/// Parse an optional identifier, treating an empty string as absent.
pub fn parse_optional_id(raw: Option<&str>) -> AppResult<Option<i64>> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_id(value).map(Some),
    }
}

/// Parse a list of identifiers, failing on the first malformed one.
pub fn parse_ids(raw: &[String]) -> AppResult<Vec<i64>> {
    raw.iter().map(|id| parse_id(id)).collect()
}

/// Storage key to domain identifier
pub fn format_id(id: i64) -> String {
    id.to_string()
}

/// The one spelling of an identifier, e.g. `"07"` and `" 7"` become `"7"`.
///
/// Anything keyed by id outside the database (cache entries) must use it.
pub fn canonical_id(raw: &str) -> AppResult<String> {
    parse_id(raw).map(format_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_ids() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert_eq!(parse_id(" 7 ").unwrap(), 7);
        assert_eq!(parse_id(&i64::MAX.to_string()).unwrap(), i64::MAX);
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        for raw in ["", "abc", "-1", "0", "1.5", "99999999999999999999"] {
            assert!(
                matches!(parse_id(raw), Err(AppError::InvalidIdentifier(_))),
                "expected {raw:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_canonical_id_collapses_spellings() {
        for raw in ["7", "07", " 7", "+7", "007 "] {
            assert_eq!(canonical_id(raw).unwrap(), "7", "spelling {raw:?}");
        }
        assert!(matches!(canonical_id("seven"), Err(AppError::InvalidIdentifier(_))));
    }

    #[test]
    fn test_optional_ids() {
        assert_eq!(parse_optional_id(None).unwrap(), None);
        assert_eq!(parse_optional_id(Some("")).unwrap(), None);
        assert_eq!(parse_optional_id(Some("3")).unwrap(), Some(3));
        assert!(parse_optional_id(Some("x")).is_err());
    }

    #[test]
    fn test_parse_ids_fails_on_any_bad_entry() {
        let ids = vec!["1".to_string(), "oops".to_string()];
        assert!(parse_ids(&ids).is_err());
        assert_eq!(format_id(12), "12");
    }
}
