use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::error::StockError;

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

/// A [`StockError`] on its way out as an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
    field: Option<&'static str>,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn bad_request(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "validation",
            message: message.into(),
            field: Some(field),
        }
    }

    /// Import failures always carry the underlying error text.
    pub fn import(err: StockError) -> Self {
        let status = match &err {
            StockError::Import(_) | StockError::Validation { .. } => StatusCode::BAD_REQUEST,
            _ => {
                error!(error = %err, "import failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            kind: "import",
            message: format!("Error al importar: {err}"),
            field: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<StockError> for ApiError {
    fn from(err: StockError) -> Self {
        let (status, kind, field) = match &err {
            StockError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", None),
            StockError::Validation { field, .. } => {
                (StatusCode::BAD_REQUEST, "validation", Some(*field))
            }
            StockError::Conflict(_) | StockError::CategoryCodeExhausted { .. } => {
                (StatusCode::CONFLICT, "conflict", None)
            }
            StockError::Import(_) => (StatusCode::BAD_REQUEST, "import", None),
            StockError::Feed(_) => (StatusCode::BAD_REQUEST, "feed", None),
            StockError::Database(_) | StockError::CodeSpaceExhausted { .. } | StockError::Qr(_) => {
                error!(error = %err, "request failed");
                return Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    kind: "internal",
                    message: "internal server error".to_string(),
                    field: None,
                };
            }
        };
        Self {
            status,
            kind,
            message: err.to_string(),
            field,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind,
            message: self.message,
            field: self.field,
        };
        (self.status, Json(body)).into_response()
    }
}
