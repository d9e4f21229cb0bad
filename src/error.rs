use serde::Serialize;
use thiserror::Error;

use crate::store::{StoreError, UniqueField};

/// One invalid field in an inbound payload.
///
/// Every validation failure carries the field name alongside the message so a
/// caller can render inline form feedback without parsing prose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Error taxonomy for the client directory operations.
///
/// The transport layer maps these onto HTTP responses via [`ApiError::status_code`];
/// nothing below this type is ever shown to a caller.
#[derive(Debug, Error)]
pub enum ApiError {
    /// One or more fields failed validation. Always carries every failing
    /// field, not just the first.
    #[error("validation failed: {}", describe_fields(.0))]
    Validation(Vec<FieldError>),

    /// A unique field collided with an existing record of the same user.
    #[error("{message}")]
    Conflict {
        field: &'static str,
        message: String,
    },

    /// The record does not exist, or belongs to another user. The two cases
    /// are deliberately indistinguishable to the caller.
    #[error("{0}")]
    NotFound(String),

    /// No resolvable caller identity.
    #[error("unauthorized")]
    Unauthorized,

    /// Backend unavailable or returned a malformed response. Surfaced as a
    /// generic server failure with no internal detail.
    #[error("internal server error")]
    Storage(#[source] StoreError),
}

impl ApiError {
    pub fn single_field(field: &str, message: &str) -> Self {
        ApiError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn conflict(field: UniqueField) -> Self {
        ApiError::Conflict {
            field: field.as_str(),
            message: format!("{} already exists", field.human_name()),
        }
    }

    /// Status code the transport collaborator should respond with.
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::Validation(_) => 400,
            ApiError::Conflict { .. } => 409,
            ApiError::NotFound(_) => 404,
            ApiError::Unauthorized => 401,
            ApiError::Storage(_) => 500,
        }
    }

    /// Field errors, if this is a validation failure.
    pub fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            ApiError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { field } => ApiError::conflict(field),
            StoreError::NotFound => ApiError::NotFound("client not found".to_string()),
            StoreError::BadCursor => ApiError::single_field("cursor", "invalid cursor"),
            other => ApiError::Storage(other),
        }
    }
}

fn describe_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(ApiError::single_field("phone", "too short").status_code(), 400);
        assert_eq!(ApiError::conflict(UniqueField::Email).status_code(), 409);
        assert_eq!(ApiError::NotFound("client not found".into()).status_code(), 404);
        assert_eq!(ApiError::Unauthorized.status_code(), 401);
    }

    #[test]
    fn conflict_names_the_colliding_field() {
        let err = ApiError::conflict(UniqueField::ClientName);
        match err {
            ApiError::Conflict { field, message } => {
                assert_eq!(field, "clientName");
                assert_eq!(message, "client name already exists");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn store_not_found_maps_to_not_found() {
        let err: ApiError = StoreError::NotFound.into();
        assert_eq!(err.status_code(), 404);
    }
}
