//! Rich error handling for the order management subsystem.
//!
//! This module provides structured error types compatible with gRPC rich
//! errors using `tonic-types`. Domain- and port-level errors are lifted into
//! [`OmsError`] at the use-case boundary; [`OmsError`] in turn knows how to
//! render itself as a gRPC `Status` or an HTTP error body.
//!
//! # gRPC Status Codes
//!
//! | Code | Name | Usage |
//! |------|------|-------|
//! | `OK` (0) | Success | Request completed successfully |
//! | `INVALID_ARGUMENT` (3) | Invalid Argument | Malformed order parameters |
//! | `NOT_FOUND` (5) | Not Found | Order or symbol not found |
//! | `ALREADY_EXISTS` (6) | Already Exists | Duplicate order id |
//! | `PERMISSION_DENIED` (7) | Permission Denied | Order owned by another user |
//! | `FAILED_PRECONDITION` (9) | Failed Precondition | Market closed, qty out of bounds, price band |
//! | `ABORTED` (10) | Aborted | Lost a status-transition race |
//! | `UNAVAILABLE` (14) | Unavailable | Market-data or transport outage |
//! | `INTERNAL` (13) | Internal Error | Unexpected server error |

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tonic::Code;
use tonic_types::{ErrorDetails, StatusExt};

use crate::application::ports::{MarketDataError, TransportError};
use crate::domain::order_management::OrderError;

/// Domain for order-management errors, used as the gRPC `ErrorInfo` domain.
pub const ERROR_DOMAIN: &str = "oms.order_management";

/// Error codes for the order management subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (INVALID_ARGUMENT)
    /// Invalid request format or missing fields.
    InvalidRequest,
    /// Invalid order parameters (price, quantity, type-specific fields).
    InvalidOrderParams,

    // Not found errors (NOT_FOUND)
    /// Order not found.
    OrderNotFound,
    /// Symbol unknown to the market-data service.
    SymbolNotFound,

    // Conflict errors (ALREADY_EXISTS / ABORTED)
    /// `save` was called with an id already present in the repository.
    DuplicateOrder,
    /// A concurrent writer changed the order's status first.
    StatusConflict,

    // Authorization errors (PERMISSION_DENIED)
    /// The requesting user does not own this order.
    NotOwner,

    // Business/precondition errors (FAILED_PRECONDITION)
    /// Market is closed for this symbol.
    MarketClosed,
    /// Asset is not currently accepting new orders.
    AssetNotTradeable,
    /// Quantity falls outside the asset's accepted order-size range.
    QuantityOutOfBounds,
    /// Submitted price deviates from the market price beyond the allowed
    /// band.
    PriceBandViolation,
    /// The order's current status does not permit the requested action
    /// (e.g. cancelling a terminal order).
    InvalidStateTransition,

    // Transient infrastructure errors (UNAVAILABLE)
    /// The market-data service is transiently unreachable or timed out.
    MarketDataUnavailable,
    /// The message transport is transiently unreachable.
    TransportUnavailable,

    // Internal errors (INTERNAL)
    /// Internal server error.
    InternalError,
}

impl ErrorCode {
    /// Get the gRPC status code for this error.
    #[must_use]
    pub const fn grpc_code(&self) -> Code {
        match self {
            Self::InvalidRequest | Self::InvalidOrderParams => Code::InvalidArgument,

            Self::OrderNotFound | Self::SymbolNotFound => Code::NotFound,

            Self::DuplicateOrder => Code::AlreadyExists,
            Self::StatusConflict => Code::Aborted,

            Self::NotOwner => Code::PermissionDenied,

            Self::MarketClosed
            | Self::AssetNotTradeable
            | Self::QuantityOutOfBounds
            | Self::PriceBandViolation
            | Self::InvalidStateTransition => Code::FailedPrecondition,

            Self::MarketDataUnavailable | Self::TransportUnavailable => Code::Unavailable,

            Self::InternalError => Code::Internal,
        }
    }

    /// True if a use case may retry the operation that produced this error
    /// (transient infrastructure failures and lost status-transition races),
    /// as opposed to a business or validation rejection that will recur
    /// identically on retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::MarketDataUnavailable | Self::TransportUnavailable | Self::StatusConflict
        )
    }

    /// Get the error reason string (for gRPC `ErrorInfo`).
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::InvalidOrderParams => "INVALID_ORDER_PARAMS",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::SymbolNotFound => "SYMBOL_NOT_FOUND",
            Self::DuplicateOrder => "DUPLICATE_ORDER",
            Self::StatusConflict => "STATUS_CONFLICT",
            Self::NotOwner => "NOT_OWNER",
            Self::MarketClosed => "MARKET_CLOSED",
            Self::AssetNotTradeable => "ASSET_NOT_TRADEABLE",
            Self::QuantityOutOfBounds => "QUANTITY_OUT_OF_BOUNDS",
            Self::PriceBandViolation => "PRICE_BAND_VIOLATION",
            Self::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            Self::MarketDataUnavailable => "MARKET_DATA_UNAVAILABLE",
            Self::TransportUnavailable => "TRANSPORT_UNAVAILABLE",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// A rich error with context for the order management subsystem.
#[derive(Debug, Error)]
pub struct OmsError {
    /// Error code.
    code: ErrorCode,
    /// Human-readable message.
    message: String,
    /// Additional context (key-value pairs).
    context: Vec<(String, String)>,
}

impl OmsError {
    /// Create a new OMS error.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: Vec::new(),
        }
    }

    /// Add context to the error.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((key.into(), value.into()));
        self
    }

    /// Get the error code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Get the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the context.
    #[must_use]
    pub fn context(&self) -> &[(String, String)] {
        &self.context
    }

    /// True if the error that produced this is safe to retry (see
    /// [`ErrorCode::is_retryable`]).
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Convert to a tonic Status with rich error details.
    #[must_use]
    pub fn to_status(&self) -> tonic::Status {
        let mut details = ErrorDetails::new();

        let metadata: HashMap<String, String> = self.context.iter().cloned().collect();
        details.set_error_info(self.code.reason(), ERROR_DOMAIN, metadata);

        if matches!(self.code, ErrorCode::InvalidRequest | ErrorCode::InvalidOrderParams) {
            details.add_bad_request_violation("request", &self.message);
        }

        if matches!(
            self.code,
            ErrorCode::MarketClosed
                | ErrorCode::AssetNotTradeable
                | ErrorCode::QuantityOutOfBounds
                | ErrorCode::PriceBandViolation
                | ErrorCode::InvalidStateTransition
        ) {
            details.add_precondition_failure_violation("constraint", self.code.reason(), &self.message);
        }

        tonic::Status::with_error_details(self.code.grpc_code(), &self.message, details)
    }

    /// Convert to an HTTP-compatible error response.
    #[must_use]
    pub fn to_http_response(&self) -> HttpErrorResponse {
        HttpErrorResponse {
            code: self.code.reason().to_string(),
            message: self.message.clone(),
            grpc_code: self.code.grpc_code() as i32,
            details: self.context.iter().cloned().collect(),
        }
    }
}

impl std::fmt::Display for OmsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code.reason(), self.message)
    }
}

/// HTTP-compatible error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpErrorResponse {
    /// Error code string.
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// gRPC status code (for compatibility).
    pub grpc_code: i32,
    /// Additional details.
    pub details: std::collections::HashMap<String, String>,
}

/// Extract error details from a tonic Status.
#[must_use]
pub fn extract_error_details(status: &tonic::Status) -> ErrorDetails {
    status.get_error_details()
}

impl From<OrderError> for OmsError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::InvalidParameters { field, message } => {
                Self::new(ErrorCode::InvalidOrderParams, message).with_context("field", field)
            }
            OrderError::InvalidStateTransition { from, to, reason } => {
                Self::new(ErrorCode::InvalidStateTransition, reason)
                    .with_context("from", from.to_string())
                    .with_context("to", to.to_string())
            }
            OrderError::CannotCancel { order_id, status } => {
                Self::new(ErrorCode::InvalidStateTransition, format!("order cannot be cancelled (status={status})"))
                    .with_context("order_id", order_id.as_str())
            }
            OrderError::CannotExecute { order_id, status } => {
                Self::new(ErrorCode::InvalidStateTransition, format!("order cannot be processed (status={status})"))
                    .with_context("order_id", order_id.as_str())
            }
            OrderError::NotFound { order_id } => {
                Self::new(ErrorCode::OrderNotFound, format!("order {order_id} not found"))
                    .with_context("order_id", order_id.as_str())
            }
            OrderError::DuplicateOrderId { order_id } => {
                Self::new(ErrorCode::DuplicateOrder, format!("order {order_id} already exists"))
                    .with_context("order_id", order_id.as_str())
            }
            OrderError::StatusConflict { order_id, expected, actual } => {
                Self::new(ErrorCode::StatusConflict, format!("expected status {expected}, found {actual}"))
                    .with_context("order_id", order_id.as_str())
            }
        }
    }
}

impl From<MarketDataError> for OmsError {
    fn from(err: MarketDataError) -> Self {
        match err {
            MarketDataError::UnknownSymbol { symbol } => {
                Self::new(ErrorCode::SymbolNotFound, format!("unknown symbol: {symbol}"))
                    .with_context("symbol", symbol)
            }
            MarketDataError::Timeout { timeout_ms } => Self::new(
                ErrorCode::MarketDataUnavailable,
                format!("market data timed out after {timeout_ms}ms"),
            ),
            MarketDataError::Unavailable { message } => {
                Self::new(ErrorCode::MarketDataUnavailable, message)
            }
        }
    }
}

impl From<TransportError> for OmsError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::QueueNotDeclared { queue } => {
                Self::new(ErrorCode::InternalError, format!("queue not declared: {queue}"))
            }
            TransportError::Unavailable { message } => Self::new(ErrorCode::TransportUnavailable, message),
            TransportError::Codec { message } => {
                Self::new(ErrorCode::InternalError, format!("message codec error: {message}"))
            }
        }
    }
}

/// Convenience constructors for common errors.
impl OmsError {
    /// Invalid request format.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// The requesting user does not own the order.
    #[must_use]
    pub fn not_owner(order_id: &str) -> Self {
        Self::new(ErrorCode::NotOwner, "order is owned by a different user")
            .with_context("order_id", order_id)
    }

    /// Market closed for the given symbol.
    #[must_use]
    pub fn market_closed(symbol: &str) -> Self {
        Self::new(ErrorCode::MarketClosed, format!("market is closed for {symbol}"))
            .with_context("symbol", symbol)
    }

    /// Asset not currently tradeable.
    #[must_use]
    pub fn asset_not_tradeable(symbol: &str) -> Self {
        Self::new(ErrorCode::AssetNotTradeable, format!("{symbol} is not currently tradeable"))
            .with_context("symbol", symbol)
    }

    /// Quantity out of the asset's accepted bounds.
    #[must_use]
    pub fn quantity_out_of_bounds(symbol: &str) -> Self {
        Self::new(
            ErrorCode::QuantityOutOfBounds,
            format!("quantity is outside the accepted order-size range for {symbol}"),
        )
        .with_context("symbol", symbol)
    }

    /// Submitted price deviates from the market price beyond the allowed
    /// band.
    #[must_use]
    pub fn price_band_violation(symbol: &str, relative_difference: rust_decimal::Decimal) -> Self {
        Self::new(
            ErrorCode::PriceBandViolation,
            format!("price deviates {relative_difference} from the market price for {symbol}"),
        )
        .with_context("symbol", symbol)
    }

    /// Internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_grpc_mapping() {
        assert_eq!(ErrorCode::InvalidRequest.grpc_code(), Code::InvalidArgument);
        assert_eq!(ErrorCode::MarketClosed.grpc_code(), Code::FailedPrecondition);
        assert_eq!(ErrorCode::StatusConflict.grpc_code(), Code::Aborted);
        assert_eq!(ErrorCode::OrderNotFound.grpc_code(), Code::NotFound);
        assert_eq!(ErrorCode::InternalError.grpc_code(), Code::Internal);
        assert_eq!(ErrorCode::MarketDataUnavailable.grpc_code(), Code::Unavailable);
    }

    #[test]
    fn retryable_classification() {
        assert!(ErrorCode::MarketDataUnavailable.is_retryable());
        assert!(ErrorCode::TransportUnavailable.is_retryable());
        assert!(ErrorCode::StatusConflict.is_retryable());
        assert!(!ErrorCode::MarketClosed.is_retryable());
        assert!(!ErrorCode::QuantityOutOfBounds.is_retryable());
    }

    #[test]
    fn oms_error_creation_and_context() {
        let error = OmsError::new(ErrorCode::InvalidRequest, "bad request")
            .with_context("field", "quantity")
            .with_context("value", "-1");

        assert_eq!(error.code(), ErrorCode::InvalidRequest);
        assert_eq!(error.message(), "bad request");
        assert_eq!(error.context().len(), 2);
    }

    #[test]
    fn to_status_sets_grpc_code() {
        let error = OmsError::market_closed("AAPL");
        let status = error.to_status();
        assert_eq!(status.code(), Code::FailedPrecondition);
        assert!(status.message().contains("AAPL"));
    }

    #[test]
    fn to_http_response_round_trips_details() {
        let error = OmsError::quantity_out_of_bounds("AAPL");
        let response = error.to_http_response();
        assert_eq!(response.code, "QUANTITY_OUT_OF_BOUNDS");
        assert_eq!(response.grpc_code, Code::FailedPrecondition as i32);
        assert!(response.details.contains_key("symbol"));
    }

    #[test]
    fn from_order_error_not_found() {
        let domain_err = OrderError::NotFound {
            order_id: crate::domain::shared::OrderId::new("ord-1"),
        };
        let oms_err: OmsError = domain_err.into();
        assert_eq!(oms_err.code(), ErrorCode::OrderNotFound);
    }

    #[test]
    fn from_market_data_error_unknown_symbol() {
        let err = MarketDataError::UnknownSymbol { symbol: "ZZZZ".to_string() };
        let oms_err: OmsError = err.into();
        assert_eq!(oms_err.code(), ErrorCode::SymbolNotFound);
    }

    #[test]
    fn from_transport_error_unavailable_is_retryable() {
        let err = TransportError::Unavailable { message: "connection reset".to_string() };
        let oms_err: OmsError = err.into();
        assert!(oms_err.is_retryable());
    }

    #[test]
    fn error_display() {
        let error = OmsError::invalid_request("missing field");
        assert_eq!(error.to_string(), "[INVALID_REQUEST] missing field");
    }
}
