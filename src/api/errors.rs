use crate::error::LedgerError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub enum ApiError {
    BadRequest(String),
    Ledger(LedgerError),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorJson {
    message: String,
    detail: Option<String>,
}

impl From<LedgerError> for ApiError {
    fn from(value: LedgerError) -> Self {
        ApiError::Ledger(value)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(value: tokio::task::JoinError) -> Self {
        ApiError::Internal(value.to_string())
    }
}

fn ledger_status(error: &LedgerError) -> (StatusCode, &'static str) {
    match error {
        LedgerError::InvalidBlockStructure(_)
        | LedgerError::ProofOfWorkUnmet { .. }
        | LedgerError::ChainTooShort { .. }
        | LedgerError::ChainInvalid(_) => (StatusCode::BAD_REQUEST, "block rejected"),
        LedgerError::UnknownReference { .. }
        | LedgerError::InvalidSignature { .. }
        | LedgerError::AmountMismatch { .. }
        | LedgerError::InvalidTransaction(_) => (StatusCode::BAD_REQUEST, "transaction rejected"),
        LedgerError::InsufficientFunds { .. } | LedgerError::KeyMismatch { .. } => {
            (StatusCode::BAD_REQUEST, "wallet error")
        }
        LedgerError::InvalidAddress(_) => (StatusCode::BAD_REQUEST, "invalid address"),
        LedgerError::InvalidEndpoint(_) => (StatusCode::BAD_REQUEST, "invalid endpoint"),
        LedgerError::MalformedMessage(_) => (StatusCode::BAD_REQUEST, "malformed message"),
        LedgerError::Network(_) => (StatusCode::BAD_GATEWAY, "peer connection failed"),
        LedgerError::Mining(_)
        | LedgerError::Crypto(_)
        | LedgerError::Serialization(_)
        | LedgerError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error"),
    }
}

impl From<ApiError> for Response {
    fn from(value: ApiError) -> Self {
        let (status, body) = match value {
            ApiError::BadRequest(reason) => (
                StatusCode::BAD_REQUEST,
                ErrorJson {
                    message: "bad request".to_string(),
                    detail: Some(reason),
                },
            ),
            ApiError::Ledger(error) => {
                let (status, message) = ledger_status(&error);
                (
                    status,
                    ErrorJson {
                        message: message.to_string(),
                        detail: Some(error.to_string()),
                    },
                )
            }
            ApiError::Internal(reason) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorJson {
                    message: "generic server error".to_string(),
                    detail: Some(reason),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into()
    }
}
