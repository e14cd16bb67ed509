//! Mapping of core errors to HTTP responses.

use api_shared::pb;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use clinica_core::{ClinicaError, ErrorKind};

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// An error response: a status code and a JSON `{ "error": message }` body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn forbidden(message: &str) -> Self {
        Self {
            status: StatusCode::FORBIDDEN,
            message: message.to_string(),
        }
    }

    fn internal(message: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }
    }
}

impl From<ClinicaError> for ApiError {
    fn from(err: ClinicaError) -> Self {
        if let ClinicaError::Document(detail) = &err {
            tracing::error!("Record document error: {detail}");
            return Self::internal("Could not generate the clinical record document");
        }

        let status = match err.kind() {
            ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Internal => {
                tracing::error!("Internal error: {:?}", err);
                return Self::internal("Internal error");
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(pb::ErrorRes {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}
