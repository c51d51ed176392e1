//! API error type and its HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, warn};

use crate::envelope::Envelope;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] innkeep_core::Error),

    /// Malformed request rejected before reaching a handler
    #[error("{0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use innkeep_core::Error as E;
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Core(err) => match err {
                E::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                E::Authentication(_) => StatusCode::UNAUTHORIZED,
                E::PermissionDenied(_) => StatusCode::FORBIDDEN,
                E::NotFound(_) => StatusCode::NOT_FOUND,
                E::Duplicate(_) | E::RoomUnavailable { .. } | E::InvalidTransition { .. } => {
                    StatusCode::CONFLICT
                }
                E::AccountLocked(_) => StatusCode::LOCKED,
                E::Database(_)
                | E::PasswordHash(_)
                | E::Config(_)
                | E::Io(_)
                | E::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    /// Machine-readable detail for conflicts clients can act on
    fn data(&self) -> Option<Value> {
        use innkeep_core::Error as E;
        match self {
            ApiError::Core(E::RoomUnavailable {
                room_id,
                check_in,
                check_out,
            }) => Some(json!({
                "reason": "room_unavailable",
                "room_id": room_id,
                "check_in_date": check_in,
                "check_out_date": check_out,
            })),
            ApiError::Core(E::InvalidTransition { from, to }) => Some(json!({
                "reason": "invalid_transition",
                "from": from,
                "to": to,
            })),
            _ => None,
        }
    }

    fn public_message(&self) -> String {
        use innkeep_core::Error as E;
        match self {
            ApiError::Core(E::RoomUnavailable { .. }) => {
                "Room is no longer available for the selected dates".to_string()
            }
            ApiError::Core(
                E::Validation(msg)
                | E::Authentication(msg)
                | E::AccountLocked(msg)
                | E::PermissionDenied(msg)
                | E::NotFound(msg)
                | E::Duplicate(msg),
            ) => msg.clone(),
            ApiError::BadRequest(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "Request failed");
            "Internal server error".to_string()
        } else {
            if status == StatusCode::CONFLICT || status == StatusCode::LOCKED {
                warn!(error = %self, "Request rejected");
            }
            self.public_message()
        };
        (status, Json(Envelope::failure(message, self.data()))).into_response()
    }
}
