use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ethers::types::{Address, U256};
use serde::Serialize;
use thiserror::Error;

/// Failures reported by a [`TokenLedger`](crate::state::ledger::TokenLedger).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient funds in {account:?}: available {available}, requested {requested}")]
    InsufficientFunds {
        account: Address,
        available: U256,
        requested: U256,
    },
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Reasons a channel operation is rejected.
///
/// A rejected operation never leaves a partial state change behind.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Signature was produced by the caller, not the counterparty")]
    UnauthorizedSigner,
    #[error("Caller is not allowed to perform this operation")]
    UnauthorizedCaller,
    #[error("Insufficient payment channel balance")]
    InsufficientBalance,
    #[error("Claim nonce is not greater than the stored nonce")]
    StaleNonce,
    #[error("Payment channel is already closed")]
    AlreadyClosed,
    #[error("Payment channel is not closed")]
    NotClosed,
    #[error("Dispute window has not elapsed yet")]
    NotYetExpired,
    #[error("Dispute window has elapsed")]
    Expired,
    #[error("Invalid payment channel: {0}")]
    InvalidChannel(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl ChannelError {
    /// Stable machine-readable code used in API responses.
    pub fn code(&self) -> &'static str {
        match self {
            ChannelError::InvalidSignature => "INVALID_SIGNATURE",
            ChannelError::UnauthorizedSigner => "UNAUTHORIZED_SIGNER",
            ChannelError::UnauthorizedCaller => "UNAUTHORIZED_CALLER",
            ChannelError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            ChannelError::StaleNonce => "STALE_NONCE",
            ChannelError::AlreadyClosed => "ALREADY_CLOSED",
            ChannelError::NotClosed => "NOT_CLOSED",
            ChannelError::NotYetExpired => "NOT_YET_EXPIRED",
            ChannelError::Expired => "EXPIRED",
            ChannelError::InvalidChannel(_) => "INVALID_CHANNEL",
            ChannelError::Ledger(_) => "LEDGER_ERROR",
        }
    }
}

impl From<ChannelError> for StatusCode {
    fn from(error: ChannelError) -> Self {
        match error {
            ChannelError::InvalidSignature => StatusCode::UNAUTHORIZED,
            ChannelError::UnauthorizedSigner | ChannelError::UnauthorizedCaller => {
                StatusCode::FORBIDDEN
            }
            ChannelError::InsufficientBalance => StatusCode::PAYMENT_REQUIRED,
            ChannelError::StaleNonce | ChannelError::AlreadyClosed | ChannelError::NotClosed => {
                StatusCode::CONFLICT
            }
            ChannelError::NotYetExpired => StatusCode::PRECONDITION_FAILED,
            ChannelError::Expired => StatusCode::REQUEST_TIMEOUT,
            ChannelError::InvalidChannel(_) => StatusCode::BAD_REQUEST,
            ChannelError::Ledger(LedgerError::InsufficientFunds { .. }) => {
                StatusCode::PAYMENT_REQUIRED
            }
            ChannelError::Ledger(LedgerError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for ChannelError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (StatusCode::from(self), Json(body)).into_response()
    }
}

/// Rejections raised while authenticating a signed HTTP request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing header {0}")]
    MissingHeader(&'static str),
    #[error("Malformed header {0}")]
    MalformedHeader(&'static str),
    #[error("Request body could not be read")]
    UnreadableBody,
    #[error("Request timestamp outside the accepted window")]
    StaleRequest,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Request was already processed")]
    ReplayedRequest,
}

impl From<AuthError> for StatusCode {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::MissingHeader(_) | AuthError::InvalidSignature => StatusCode::UNAUTHORIZED,
            AuthError::MalformedHeader(_) | AuthError::UnreadableBody => StatusCode::BAD_REQUEST,
            AuthError::StaleRequest => StatusCode::REQUEST_TIMEOUT,
            AuthError::ReplayedRequest => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let code = match self {
            AuthError::MissingHeader(_) => "MISSING_HEADER",
            AuthError::MalformedHeader(_) => "MALFORMED_HEADER",
            AuthError::UnreadableBody => "UNREADABLE_BODY",
            AuthError::StaleRequest => "STALE_REQUEST",
            AuthError::InvalidSignature => "INVALID_SIGNATURE",
            AuthError::ReplayedRequest => "REPLAYED_REQUEST",
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message: self.to_string(),
            },
        };
        (StatusCode::from(self), Json(body)).into_response()
    }
}

/// Configuration loading failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_error_status_codes() {
        assert_eq!(
            StatusCode::from(ChannelError::InsufficientBalance),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            StatusCode::from(ChannelError::StaleNonce),
            StatusCode::CONFLICT
        );
        assert_eq!(
            StatusCode::from(ChannelError::NotYetExpired),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            StatusCode::from(ChannelError::Ledger(LedgerError::Unavailable("down".into()))),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_ledger_error_converts_into_channel_error() {
        let err: ChannelError = LedgerError::Unavailable("down".into()).into();
        assert_eq!(err.code(), "LEDGER_ERROR");
        assert_eq!(err.to_string(), "Ledger unavailable: down");
    }
}
