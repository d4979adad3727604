//! Response envelope and error body shapes.

use ecoleta_core::{ErrorKind, PointServiceError};
use log::error;
use serde::Serialize;
use serde_json::{json, Value};

const INTERNAL_FAILURE_MESSAGE: &str = "internal failure; nothing was saved";

/// Status code plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    pub(crate) fn ok(body: impl Serialize) -> Self {
        match serde_json::to_value(body) {
            Ok(body) => Self { status: 200, body },
            Err(err) => {
                error!("event=api_encode module=api status=error error={err}");
                Self::internal("RESPONSE_ENCODING_FAILED")
            }
        }
    }

    /// `{message}` body used for missing points.
    pub(crate) fn not_found(message: &str) -> Self {
        Self {
            status: 400,
            body: json!({ "message": message }),
        }
    }

    /// `{error: true, information: {in, code, message}}` body.
    pub(crate) fn failure(
        status: u16,
        field: &str,
        code: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            body: json!({
                "error": true,
                "information": {
                    "in": field,
                    "code": code,
                    "message": message.into(),
                },
            }),
        }
    }

    pub(crate) fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::failure(400, field, "INVALID_FIELD", message)
    }

    fn internal(code: &str) -> Self {
        Self::failure(500, "server", code, INTERNAL_FAILURE_MESSAGE)
    }

    /// Maps a service error. `not_found_message` is the route-specific body
    /// for a missing point.
    pub(crate) fn from_service_error(err: &PointServiceError, not_found_message: &str) -> Self {
        match err.kind() {
            ErrorKind::NotFound => Self::not_found(not_found_message),
            ErrorKind::Validation | ErrorKind::Conflict => {
                Self::failure(400, err.field().unwrap_or("body"), err.code(), err.to_string())
            }
            ErrorKind::Unauthorized => {
                Self::failure(401, "credentials", err.code(), err.to_string())
            }
            ErrorKind::Infrastructure => {
                error!(
                    "event=api_failure module=api status=error error_code={} error={err}",
                    err.code()
                );
                Self::internal(err.code())
            }
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
