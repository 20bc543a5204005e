//! Order-management HTTP endpoints (Driver Adapter).
//!
//! Thin axum handlers: parse the request, build a use-case command, delegate,
//! map the result (or [`OmsError`]) to JSON. No business logic lives here.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::application::dto::{
    CancelOrderCommand, GetOrderStatusQuery, OrderHistoryQuery, OrderSortField, SortDirection,
    SubmitOrderCommand, SubmitOrderResult,
};
use crate::application::ports::MarketDataPort;
use crate::application::use_cases::{CancelOrderUseCase, OrderStatusUseCase, SubmitOrderUseCase};
use crate::domain::order_management::repository::OrderRepository;
use crate::domain::order_management::{OrderSide, OrderStatus, OrderType};
use crate::domain::shared::{OrderId, Price, Quantity, Symbol, UserId};
use crate::error::OmsError;

/// Shared state for the order-management router.
pub struct OmsAppState<O, M>
where
    O: OrderRepository,
    M: MarketDataPort,
{
    /// Submit-order use case.
    pub submit_order: Arc<SubmitOrderUseCase<O, M>>,
    /// Cancel-order use case.
    pub cancel_order: Arc<CancelOrderUseCase<O>>,
    /// Status/history query use case.
    pub order_status: Arc<OrderStatusUseCase<O, M>>,
}

impl<O, M> Clone for OmsAppState<O, M>
where
    O: OrderRepository,
    M: MarketDataPort,
{
    fn clone(&self) -> Self {
        Self {
            submit_order: Arc::clone(&self.submit_order),
            cancel_order: Arc::clone(&self.cancel_order),
            order_status: Arc::clone(&self.order_status),
        }
    }
}

/// Build the order-management router: `/orders` (submit, history),
/// `/orders/:id` (status), `/orders/:id/cancel`.
pub fn create_oms_router<O, M>(state: OmsAppState<O, M>) -> Router
where
    O: OrderRepository + 'static,
    M: MarketDataPort + 'static,
{
    Router::new()
        .route("/orders", post(submit_order).get(order_history))
        .route("/orders/{id}", get(get_order_status))
        .route("/orders/{id}/cancel", post(cancel_order))
        .with_state(state)
}

/// Read the caller's identity off a bearer token. Token validation and
/// session lookup are out of scope; the token's value is the user id
/// directly.
///
/// # Errors
///
/// Returns 401 if the header is missing or not a `Bearer` token.
fn authenticate(headers: &HeaderMap) -> Result<UserId, Response> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
        .map(UserId::new)
        .ok_or_else(|| StatusCode::UNAUTHORIZED.into_response())
}

fn oms_error_response(error: &OmsError) -> Response {
    let body = error.to_http_response();
    let status = match error.code() {
        crate::error::ErrorCode::InvalidRequest | crate::error::ErrorCode::InvalidOrderParams => {
            StatusCode::BAD_REQUEST
        }
        crate::error::ErrorCode::OrderNotFound | crate::error::ErrorCode::SymbolNotFound => StatusCode::NOT_FOUND,
        crate::error::ErrorCode::DuplicateOrder => StatusCode::CONFLICT,
        crate::error::ErrorCode::StatusConflict => StatusCode::CONFLICT,
        crate::error::ErrorCode::NotOwner => StatusCode::NOT_FOUND,
        crate::error::ErrorCode::MarketClosed
        | crate::error::ErrorCode::AssetNotTradeable
        | crate::error::ErrorCode::QuantityOutOfBounds
        | crate::error::ErrorCode::PriceBandViolation
        | crate::error::ErrorCode::InvalidStateTransition => StatusCode::UNPROCESSABLE_ENTITY,
        crate::error::ErrorCode::MarketDataUnavailable | crate::error::ErrorCode::TransportUnavailable => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        crate::error::ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(body)).into_response()
}

/// Request body for `POST /orders`.
#[derive(Debug, Deserialize)]
struct SubmitOrderRequest {
    symbol: String,
    side: OrderSide,
    order_type: OrderType,
    quantity: rust_decimal::Decimal,
    price: Option<rust_decimal::Decimal>,
    stop_price: Option<rust_decimal::Decimal>,
}

async fn submit_order<O, M>(
    State(state): State<OmsAppState<O, M>>,
    headers: HeaderMap,
    Json(request): Json<SubmitOrderRequest>,
) -> Response
where
    O: OrderRepository,
    M: MarketDataPort,
{
    let user_id = match authenticate(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    let command = SubmitOrderCommand {
        user_id,
        symbol: Symbol::new(request.symbol),
        side: request.side,
        order_type: request.order_type,
        quantity: Quantity::new(request.quantity),
        price: request.price.map(Price::new),
        stop_price: request.stop_price.map(Price::new),
    };

    match state.submit_order.execute(command).await {
        Ok(result) => (StatusCode::CREATED, Json(result)).into_response(),
        Err(error) => oms_error_response(&error),
    }
}

async fn cancel_order<O, M>(
    State(state): State<OmsAppState<O, M>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    O: OrderRepository,
    M: MarketDataPort,
{
    let user_id = match authenticate(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    let command = CancelOrderCommand { order_id: OrderId::new(id), user_id };
    match state.cancel_order.execute(command).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(error) => oms_error_response(&error),
    }
}

async fn get_order_status<O, M>(
    State(state): State<OmsAppState<O, M>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response
where
    O: OrderRepository,
    M: MarketDataPort,
{
    let user_id = match authenticate(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    let query = GetOrderStatusQuery { order_id: OrderId::new(id), user_id };
    match state.order_status.get_status(query).await {
        Ok(view) => Json(view).into_response(),
        Err(error) => oms_error_response(&error),
    }
}

/// Query params for `GET /orders`.
#[derive(Debug, Deserialize, Default)]
struct OrderHistoryParams {
    status: Option<OrderStatus>,
    symbol: Option<String>,
    side: Option<OrderSide>,
    order_type: Option<OrderType>,
    page: Option<u32>,
    page_size: Option<u32>,
    sort_by: Option<OrderSortField>,
    sort_dir: Option<SortDirection>,
}

async fn order_history<O, M>(
    State(state): State<OmsAppState<O, M>>,
    headers: HeaderMap,
    Query(params): Query<OrderHistoryParams>,
) -> Response
where
    O: OrderRepository,
    M: MarketDataPort,
{
    let user_id = match authenticate(&headers) {
        Ok(user_id) => user_id,
        Err(response) => return response,
    };

    let query = OrderHistoryQuery {
        user_id,
        statuses: params.status.map(|status| vec![status]),
        symbol: params.symbol.map(Symbol::new),
        side: params.side,
        order_type: params.order_type,
        date_range: None,
        page: params.page.unwrap_or(1),
        page_size: params.page_size.unwrap_or(OrderHistoryQuery::DEFAULT_PAGE_SIZE),
        sort_by: params.sort_by.unwrap_or(OrderSortField::CreatedAt),
        sort_dir: params.sort_dir.unwrap_or(SortDirection::Desc),
    };

    match state.order_status.get_history(query).await {
        Ok(page) => Json(page).into_response(),
        Err(error) => oms_error_response(&error),
    }
}

#[allow(dead_code)]
fn assert_result_shape(_: &SubmitOrderResult) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{AssetDetails, MarketDataError, MarketSnapshot, TradingHours};
    use crate::domain::shared::Timestamp;
    use crate::MessageTransportPort;
    use crate::infrastructure::messaging::{InMemoryTransport, Producer};
    use crate::infrastructure::persistence::order_management_in_memory::InMemoryOrderRepository;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    struct StubMarketData;

    #[async_trait]
    impl MarketDataPort for StubMarketData {
        async fn get_snapshot(&self, _symbol: &Symbol) -> Result<MarketSnapshot, MarketDataError> {
            Ok(MarketSnapshot {
                price: Price::from_f64(150.0),
                timestamp: Timestamp::now(),
                asset: AssetDetails {
                    tradeable: true,
                    min_order_size: Quantity::from_i64(1),
                    max_order_size: Quantity::from_i64(10_000),
                    price_step: Price::from_f64(0.01),
                },
                trading_hours: TradingHours { is_open: true },
            })
        }

        async fn validate_symbol(&self, _symbol: &Symbol) -> Result<bool, MarketDataError> {
            Ok(true)
        }
    }

    async fn test_state() -> OmsAppState<InMemoryOrderRepository, StubMarketData> {
        let transport = Arc::new(InMemoryTransport::new());
        transport.declare_topology().await.unwrap();
        let producer = Arc::new(Producer::new(transport as Arc<dyn crate::application::ports::MessageTransportPort>));
        let order_repo = Arc::new(InMemoryOrderRepository::new());
        let market_data = Arc::new(StubMarketData);

        OmsAppState {
            submit_order: Arc::new(SubmitOrderUseCase::new(order_repo.clone(), market_data.clone(), producer.clone())),
            cancel_order: Arc::new(CancelOrderUseCase::new(order_repo.clone(), producer.clone())),
            order_status: Arc::new(OrderStatusUseCase::new(order_repo, market_data)),
        }
    }

    #[tokio::test]
    async fn submit_order_without_bearer_token_is_unauthorized() {
        let app = create_oms_router(test_state().await);
        let body = serde_json::json!({
            "symbol": "AAPL",
            "side": "Buy",
            "order_type": "Market",
            "quantity": "10"
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/orders")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn submit_order_with_bearer_token_creates_order() {
        let app = create_oms_router(test_state().await);
        let body = serde_json::json!({
            "symbol": "AAPL",
            "side": "Buy",
            "order_type": "Market",
            "quantity": "10"
        });

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/orders")
                    .header("content-type", "application/json")
                    .header("authorization", "Bearer u1")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn get_order_status_not_found_maps_to_404() {
        let app = create_oms_router(test_state().await);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/orders/does-not-exist")
                    .header("authorization", "Bearer u1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
