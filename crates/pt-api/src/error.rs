//! API error types and handling.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use pt_core::db::DbError;
use pt_core::TrackingError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

/// API error type.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (malformed input).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Conflict (duplicate tag, referenced row, concurrent update).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Unprocessable entity (well-formed but semantically invalid).
    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    /// Validation error with field-level details.
    #[error("Validation failed")]
    ValidationError(ValidationErrorDetails),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Service unavailable (e.g., database pool exhausted).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Details for field-level validation errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationErrorDetails {
    /// Overall validation error message.
    pub message: String,
    /// Field-specific errors.
    pub fields: HashMap<String, Vec<FieldError>>,
}

/// A single field validation error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldError {
    /// Error code (e.g., "length", "distinct_locations").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional error parameters (e.g., min length).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

impl ValidationErrorDetails {
    /// Creates a new validation error with a single field error.
    pub fn field(field: &str, code: &str, message: &str) -> Self {
        let mut fields = HashMap::new();
        fields.insert(
            field.to_string(),
            vec![FieldError {
                code: code.to_string(),
                message: message.to_string(),
                params: None,
            }],
        );
        Self {
            message: format!("Validation failed for field '{}'", field),
            fields,
        }
    }

    /// Creates a validation error from multiple field errors.
    pub fn from_fields(errors: HashMap<String, Vec<FieldError>>) -> Self {
        let message = match (errors.len(), errors.keys().next()) {
            (1, Some(field)) => format!("Validation failed for field '{}'", field),
            (count, _) => format!("Validation failed for {} fields", count),
        };
        Self {
            message,
            fields: errors,
        }
    }
}

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional error details (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Request ID for tracing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::UnprocessableEntity(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Returns the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::UnprocessableEntity(_) => "UNPROCESSABLE_ENTITY",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Database(_) => "DATABASE_ERROR",
            ApiError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
        }
    }

    /// Creates a validation error for a single field.
    pub fn validation_field(field: &str, code: &str, message: &str) -> Self {
        ApiError::ValidationError(ValidationErrorDetails::field(field, code, message))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let (message, details) = match &self {
            ApiError::ValidationError(details) => (
                details.message.clone(),
                Some(serde_json::to_value(&details.fields).unwrap_or_default()),
            ),
            _ => (self.to_string(), None),
        };

        let body = ErrorResponse {
            code: self.error_code().to_string(),
            message,
            details,
            request_id: None,
        };

        (status, Json(body)).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} with id {} not found", entity, id))
            }
            DbError::Constraint(msg) => ApiError::Conflict(msg),
            DbError::Conflict(msg) => ApiError::Conflict(msg),
            DbError::PoolExhausted => {
                ApiError::ServiceUnavailable("database connection pool exhausted".to_string())
            }
            err => ApiError::Database(err.to_string()),
        }
    }
}

impl From<TrackingError> for ApiError {
    fn from(err: TrackingError) -> Self {
        match err {
            TrackingError::NotFound { .. } => ApiError::NotFound(err.to_string()),
            TrackingError::Validation(msg) => ApiError::UnprocessableEntity(msg),
            TrackingError::LocationMismatch { .. } => {
                ApiError::UnprocessableEntity(err.to_string())
            }
            TrackingError::Conflict { .. } => ApiError::Conflict(err.to_string()),
            TrackingError::Store(db_err) => db_err.into(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields: HashMap<String, Vec<FieldError>> = HashMap::new();

        for (field_name, field_errors) in err.field_errors() {
            let errors: Vec<FieldError> = field_errors
                .iter()
                .map(|e| {
                    let code = e.code.to_string();
                    let message = e.message.clone().map(|m| m.to_string()).unwrap_or_else(|| {
                        format!("Field '{}' failed validation: {}", field_name, code)
                    });
                    let params = if e.params.is_empty() {
                        None
                    } else {
                        Some(serde_json::to_value(&e.params).unwrap_or_default())
                    };
                    FieldError {
                        code,
                        message,
                        params,
                    }
                })
                .collect();
            fields.insert(field_name.to_string(), errors);
        }

        ApiError::ValidationError(ValidationErrorDetails::from_fields(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_db_error_mapping() {
        let not_found: ApiError = DbError::not_found("Asset", "1").into();
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let duplicate: ApiError = DbError::Constraint("UNIQUE constraint failed".into()).into();
        assert_eq!(duplicate.status_code(), StatusCode::CONFLICT);

        let query: ApiError = DbError::Query("syntax error".into()).into();
        assert_eq!(query.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_tracking_error_mapping() {
        let mismatch: ApiError = TrackingError::LocationMismatch {
            asset_id: Uuid::new_v4(),
            current_location_id: Uuid::new_v4(),
            sensor_id: Uuid::new_v4(),
        }
        .into();
        assert_eq!(mismatch.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let stale: ApiError = TrackingError::Validation("older".into()).into();
        assert_eq!(stale.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let conflict: ApiError = TrackingError::Conflict {
            asset_id: Uuid::new_v4(),
        }
        .into();
        assert_eq!(conflict.status_code(), StatusCode::CONFLICT);

        let missing: ApiError = TrackingError::NotFound {
            entity: "Sensor",
            id: "x".into(),
        }
        .into();
        assert_eq!(missing.error_code(), "NOT_FOUND");
    }

    #[test]
    fn test_validation_field_message() {
        let err = ApiError::validation_field("entry_location_id", "distinct_locations", "must differ");
        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(
                    details.message,
                    "Validation failed for field 'entry_location_id'"
                );
                assert_eq!(details.fields["entry_location_id"][0].code, "distinct_locations");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
