//! gRPC OrderManagementService implementation.
//!
//! Mirrors `infrastructure::http::oms_controller`: thin request/response
//! mapping around the same use cases, so the two transports stay in lock
//! step.

use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use tonic::{Request, Response, Status};

use super::proto::oms::v1::{
    order_management_service_server::{OrderManagementService, OrderManagementServiceServer},
    CancelOrderRequest, CancelOrderResponse, GetOrderHistoryRequest, GetOrderStatusRequest,
    OrderHistoryPage as ProtoOrderHistoryPage, OrderSide as ProtoOrderSide, OrderType as ProtoOrderType,
    OrderView as ProtoOrderView, SubmitOrderRequest, SubmitOrderResponse,
};

use crate::application::dto::{
    CancelOrderCommand, GetOrderStatusQuery, OrderHistoryQuery, OrderSortField, OrderView, SortDirection,
    SubmitOrderCommand,
};
use crate::application::ports::MarketDataPort;
use crate::application::use_cases::{CancelOrderUseCase, OrderStatusUseCase, SubmitOrderUseCase};
use crate::domain::order_management::repository::OrderRepository;
use crate::domain::order_management::{OrderSide, OrderType};
use crate::domain::shared::{OrderId, Price, Quantity, Symbol, UserId};
use crate::error::OmsError;

/// Adapts the order-management use cases to the gRPC transport.
pub struct OrderManagementServiceAdapter<O, M>
where
    O: OrderRepository,
    M: MarketDataPort,
{
    submit_order: Arc<SubmitOrderUseCase<O, M>>,
    cancel_order: Arc<CancelOrderUseCase<O>>,
    order_status: Arc<OrderStatusUseCase<O, M>>,
}

impl<O, M> OrderManagementServiceAdapter<O, M>
where
    O: OrderRepository,
    M: MarketDataPort,
{
    /// Build an adapter around the order-management use cases.
    pub fn new(
        submit_order: Arc<SubmitOrderUseCase<O, M>>,
        cancel_order: Arc<CancelOrderUseCase<O>>,
        order_status: Arc<OrderStatusUseCase<O, M>>,
    ) -> Self {
        Self { submit_order, cancel_order, order_status }
    }
}

/// Build a tonic server for the order-management gRPC service.
pub fn create_order_management_service<O, M>(
    submit_order: Arc<SubmitOrderUseCase<O, M>>,
    cancel_order: Arc<CancelOrderUseCase<O>>,
    order_status: Arc<OrderStatusUseCase<O, M>>,
) -> OrderManagementServiceServer<OrderManagementServiceAdapter<O, M>>
where
    O: OrderRepository + 'static,
    M: MarketDataPort + 'static,
{
    OrderManagementServiceServer::new(OrderManagementServiceAdapter::new(submit_order, cancel_order, order_status))
}

fn parse_decimal(raw: &str, field: &str) -> Result<Decimal, Status> {
    Decimal::from_str(raw).map_err(|_| Status::invalid_argument(format!("malformed decimal in field '{field}'")))
}

fn from_proto_side(side: i32) -> Result<OrderSide, Status> {
    match ProtoOrderSide::try_from(side) {
        Ok(ProtoOrderSide::Buy) => Ok(OrderSide::Buy),
        Ok(ProtoOrderSide::Sell) => Ok(OrderSide::Sell),
        _ => Err(Status::invalid_argument("side must be specified")),
    }
}

fn from_proto_type(order_type: i32) -> Result<OrderType, Status> {
    match ProtoOrderType::try_from(order_type) {
        Ok(ProtoOrderType::Market) => Ok(OrderType::Market),
        Ok(ProtoOrderType::Limit) => Ok(OrderType::Limit),
        Ok(ProtoOrderType::Stop) => Ok(OrderType::StopLoss),
        Ok(ProtoOrderType::StopLimit) => Ok(OrderType::StopLimit),
        _ => Err(Status::invalid_argument("order_type must be specified")),
    }
}

fn to_proto_side(side: OrderSide) -> i32 {
    match side {
        OrderSide::Buy => ProtoOrderSide::Buy as i32,
        OrderSide::Sell => ProtoOrderSide::Sell as i32,
    }
}

fn to_proto_type(order_type: OrderType) -> i32 {
    match order_type {
        OrderType::Market => ProtoOrderType::Market as i32,
        OrderType::Limit => ProtoOrderType::Limit as i32,
        OrderType::StopLoss => ProtoOrderType::Stop as i32,
        OrderType::StopLimit => ProtoOrderType::StopLimit as i32,
    }
}

fn to_proto_view(view: OrderView) -> ProtoOrderView {
    ProtoOrderView {
        order_id: view.order_id.into_inner(),
        symbol: view.symbol.as_str().to_string(),
        side: to_proto_side(view.side),
        order_type: to_proto_type(view.order_type),
        quantity: view.quantity.amount().to_string(),
        status: format!("{:?}", view.status),
        created_at: view.created_at.to_rfc3339(),
        updated_at: view.updated_at.to_rfc3339(),
        price: view.price.map(|price| price.amount().to_string()),
        estimated_value: view.estimated_value.map(|price| price.amount().to_string()),
        drift: view.drift.map(|drift| drift.to_string()),
    }
}

fn map_oms_error(error: OmsError) -> Status {
    error.to_status()
}

#[tonic::async_trait]
impl<O, M> OrderManagementService for OrderManagementServiceAdapter<O, M>
where
    O: OrderRepository + 'static,
    M: MarketDataPort + 'static,
{
    async fn submit_order(
        &self,
        request: Request<SubmitOrderRequest>,
    ) -> Result<Response<SubmitOrderResponse>, Status> {
        let request = request.into_inner();
        let command = SubmitOrderCommand {
            user_id: UserId::new(request.user_id),
            symbol: Symbol::new(request.symbol),
            side: from_proto_side(request.side)?,
            order_type: from_proto_type(request.order_type)?,
            quantity: Quantity::new(parse_decimal(&request.quantity, "quantity")?),
            price: request.price.as_deref().map(|raw| parse_decimal(raw, "price")).transpose()?.map(Price::new),
            stop_price: request
                .stop_price
                .as_deref()
                .map(|raw| parse_decimal(raw, "stop_price"))
                .transpose()?
                .map(Price::new),
        };

        let result = self.submit_order.execute(command).await.map_err(map_oms_error)?;
        Ok(Response::new(SubmitOrderResponse {
            order_id: result.order_id.into_inner(),
            status: format!("{:?}", result.status),
            market_price_at_submission: result.market_price_at_submission.amount().to_string(),
            estimated_execution_price: result.estimated_execution_price.amount().to_string(),
            message: result.message,
        }))
    }

    async fn cancel_order(
        &self,
        request: Request<CancelOrderRequest>,
    ) -> Result<Response<CancelOrderResponse>, Status> {
        let request = request.into_inner();
        let command = CancelOrderCommand {
            order_id: OrderId::new(request.order_id),
            user_id: UserId::new(request.user_id),
        };
        self.cancel_order.execute(command).await.map_err(map_oms_error)?;
        Ok(Response::new(CancelOrderResponse {}))
    }

    async fn get_order_status(
        &self,
        request: Request<GetOrderStatusRequest>,
    ) -> Result<Response<ProtoOrderView>, Status> {
        let request = request.into_inner();
        let query = GetOrderStatusQuery {
            order_id: OrderId::new(request.order_id),
            user_id: UserId::new(request.user_id),
        };
        let view = self.order_status.get_status(query).await.map_err(map_oms_error)?;
        Ok(Response::new(to_proto_view(view)))
    }

    async fn get_order_history(
        &self,
        request: Request<GetOrderHistoryRequest>,
    ) -> Result<Response<ProtoOrderHistoryPage>, Status> {
        let request = request.into_inner();
        let query = OrderHistoryQuery {
            user_id: UserId::new(request.user_id),
            statuses: None,
            symbol: request.symbol.map(Symbol::new),
            side: None,
            order_type: None,
            date_range: None,
            page: request.page.max(1),
            page_size: if request.page_size == 0 { OrderHistoryQuery::DEFAULT_PAGE_SIZE } else { request.page_size },
            sort_by: OrderSortField::CreatedAt,
            sort_dir: SortDirection::Desc,
        };

        let page = self.order_status.get_history(query).await.map_err(map_oms_error)?;
        let has_next_page = u64::from(page.page) * u64::from(page.page_size) < page.total as u64;
        Ok(Response::new(ProtoOrderHistoryPage {
            orders: page.orders.into_iter().map(to_proto_view).collect(),
            page: page.page,
            page_size: page.page_size,
            total: page.total as u64,
            has_next_page,
        }))
    }
}
