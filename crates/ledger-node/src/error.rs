use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ledger_core::LedgerError;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("malformed request body: {}", .0.body_text())]
    BadRequest(#[from] JsonRejection),

    #[error("request has no Host header to identify the caller")]
    MissingHost,

    #[error("mining was cancelled before a nonce was found")]
    MiningCancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Ledger(LedgerError::InvalidTransaction(_))
            | ApiError::BadRequest(_)
            | ApiError::MissingHost => StatusCode::BAD_REQUEST,
            ApiError::Ledger(LedgerError::StaleTip { .. }) => StatusCode::CONFLICT,
            ApiError::MiningCancelled => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Ledger(LedgerError::BrokenLink { .. } | LedgerError::InvalidConfig(_))
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!(%status, error = %self, "request failed");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
