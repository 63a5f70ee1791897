use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json
};
use anyhow;
use serde_json::json;

use teller::{ErrorCode, LedgerError};

pub(crate) enum ServerError {
    Unauthenticated(String),
    InternalError(anyhow::Error)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::FailedPrecondition => StatusCode::CONFLICT,
        ErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
        ErrorCode::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorCode::Cancelled => StatusCode::REQUEST_TIMEOUT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn json_error(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthenticated(msg) =>
                json_error(StatusCode::UNAUTHORIZED, format!("Unauthenticated: {}", msg)),
            Self::InternalError(err) => match err.downcast_ref::<LedgerError>() {
                Some(ledger_err) if ledger_err.code() == ErrorCode::Internal => {
                    log::error!("request failed: {:#}", err);
                    json_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_owned())
                },
                Some(ledger_err) => json_error(status_for(ledger_err.code()), ledger_err.to_string()),
                None => {
                    log::error!("request failed: {:#}", err);
                    json_error(StatusCode::INTERNAL_SERVER_ERROR, format!("Internal error: {}", err))
                }
            }
        }
    }
}

impl<E> From<E> for ServerError
where
    E: Into<anyhow::Error>
{
    fn from(err: E) -> Self {
        Self::InternalError(err.into())
    }
}
