//! Cursor-based listing contract.
//!
//! Callers hand us raw query parameters; we hand back a bounded limit and a
//! decoded [`Cursor`]. The encoded form is base64 over the cursor's JSON so
//! callers cannot (and need not) construct or inspect one. A token we cannot
//! decode is a validation error, never a server failure.

use base64ct::{Base64UrlUnpadded, Encoding};

use crate::error::ApiError;
use crate::store::{Cursor, StoreError};

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

/// Parsed pagination parameters for one List call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: u32,
    pub cursor: Option<Cursor>,
}

impl PageRequest {
    /// Parses raw `limit` and `cursor` query parameters.
    ///
    /// Absent limit defaults to [`DEFAULT_LIMIT`]; anything non-numeric or
    /// non-positive is rejected. Limits above [`MAX_LIMIT`] are capped.
    pub fn parse(limit: Option<&str>, cursor: Option<&str>) -> Result<Self, ApiError> {
        let limit = match limit {
            None => DEFAULT_LIMIT,
            Some(raw) => {
                let parsed: u32 = raw
                    .parse()
                    .map_err(|_| ApiError::single_field("limit", "must be a positive integer"))?;
                if parsed == 0 {
                    return Err(ApiError::single_field("limit", "must be a positive integer"));
                }
                parsed.min(MAX_LIMIT)
            }
        };

        let cursor = cursor.map(decode_cursor).transpose()?;
        Ok(Self { limit, cursor })
    }
}

pub fn encode_cursor(cursor: &Cursor) -> Result<String, StoreError> {
    let json =
        serde_json::to_vec(cursor).map_err(|err| StoreError::Malformed(err.to_string()))?;
    Ok(Base64UrlUnpadded::encode_string(&json))
}

pub fn decode_cursor(token: &str) -> Result<Cursor, ApiError> {
    let invalid = || ApiError::single_field("cursor", "invalid cursor");
    let bytes = Base64UrlUnpadded::decode_vec(token).map_err(|_| invalid())?;
    serde_json::from_slice(&bytes).map_err(|_| invalid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_limit_defaults() {
        let request = PageRequest::parse(None, None).unwrap();
        assert_eq!(request.limit, DEFAULT_LIMIT);
        assert_eq!(request.cursor, None);
    }

    #[test]
    fn non_numeric_and_non_positive_limits_are_rejected() {
        for bad in ["abc", "0", "-3", "1.5", ""] {
            let err = PageRequest::parse(Some(bad), None).unwrap_err();
            assert_eq!(err.status_code(), 400, "limit {bad:?} should be rejected");
            assert_eq!(err.field_errors().unwrap()[0].field, "limit");
        }
    }

    #[test]
    fn oversized_limit_is_capped() {
        let request = PageRequest::parse(Some("5000"), None).unwrap();
        assert_eq!(request.limit, MAX_LIMIT);
    }

    #[test]
    fn cursors_round_trip_for_both_backends() {
        for cursor in [
            Cursor::LastKey {
                client_id: "abc-123".to_string(),
            },
            Cursor::Offset { offset: 40 },
        ] {
            let token = encode_cursor(&cursor).unwrap();
            assert_eq!(decode_cursor(&token).unwrap(), cursor);
        }
    }

    #[test]
    fn garbage_cursor_is_a_validation_error() {
        for bad in ["not base64!!", "AAAA", ""] {
            let err = PageRequest::parse(None, Some(bad)).unwrap_err();
            assert_eq!(err.status_code(), 400, "cursor {bad:?} should be rejected");
            assert_eq!(err.field_errors().unwrap()[0].field, "cursor");
        }
    }

    #[test]
    fn valid_base64_of_wrong_shape_is_still_rejected() {
        let token = Base64UrlUnpadded::encode_string(b"{\"foo\": 1}");
        let err = decode_cursor(&token).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
