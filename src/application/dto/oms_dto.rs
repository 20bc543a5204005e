//! Commands, queries, and view DTOs for the order-management use cases.

use serde::{Deserialize, Serialize};

use crate::domain::order_management::{Order, OrderSide, OrderStatus, OrderType};
use crate::domain::shared::{OrderId, Price, Quantity, Symbol, Timestamp, UserId};

/// Command to submit a new order.
#[derive(Debug, Clone)]
pub struct SubmitOrderCommand {
    /// Owning user.
    pub user_id: UserId,
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Quantity.
    pub quantity: Quantity,
    /// Limit price, required for Limit/StopLimit.
    pub price: Option<Price>,
    /// Stop-trigger price, required for StopLoss/StopLimit.
    pub stop_price: Option<Price>,
}

/// Result of a successful submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitOrderResult {
    /// Newly assigned order id.
    pub order_id: OrderId,
    /// Status immediately after admission (always `Pending`).
    pub status: OrderStatus,
    /// Market price observed at submission time.
    pub market_price_at_submission: Price,
    /// Current price for `Market` orders, limit price for `Limit` orders,
    /// current price otherwise.
    pub estimated_execution_price: Price,
    /// Human-readable confirmation message.
    pub message: String,
}

/// Command to cancel an order.
#[derive(Debug, Clone)]
pub struct CancelOrderCommand {
    /// Order to cancel.
    pub order_id: OrderId,
    /// Requesting user; must own the order.
    pub user_id: UserId,
}

/// Query for a single order's enriched status.
#[derive(Debug, Clone)]
pub struct GetOrderStatusQuery {
    /// Order to look up.
    pub order_id: OrderId,
    /// Requesting user; must own the order.
    pub user_id: UserId,
}

/// Enriched view of a single order, returned by the status query and
/// embedded in history pages. Enrichment fields (`current_price`,
/// `drift`, `estimated_value`) are `None` when market-data enrichment
/// fails — that failure is non-fatal to the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
    /// Order id.
    pub order_id: OrderId,
    /// Owning user.
    pub user_id: UserId,
    /// Symbol.
    pub symbol: Symbol,
    /// Side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Quantity.
    pub quantity: Quantity,
    /// Limit price, if any.
    pub price: Option<Price>,
    /// Stop-trigger price, if any.
    pub stop_price: Option<Price>,
    /// Current status.
    pub status: OrderStatus,
    /// Execution price, if executed.
    pub execution_price: Option<Price>,
    /// Created timestamp.
    pub created_at: Timestamp,
    /// Last-updated timestamp.
    pub updated_at: Timestamp,
    /// Executed timestamp, if executed.
    pub executed_at: Option<Timestamp>,
    /// Current market price, if enrichment succeeded.
    pub current_price: Option<Price>,
    /// Relative drift between `current_price` and the submission-time
    /// snapshot, if both are available.
    pub drift: Option<rust_decimal::Decimal>,
    /// `quantity * current_price`, if `current_price` is available.
    pub estimated_value: Option<Price>,
}

impl OrderView {
    /// Build a bare view with no market-data enrichment.
    #[must_use]
    pub fn from_order(order: &Order) -> Self {
        Self {
            order_id: order.id().clone(),
            user_id: order.user_id().clone(),
            symbol: order.symbol().clone(),
            side: order.side(),
            order_type: order.order_type(),
            quantity: order.quantity(),
            price: order.price(),
            stop_price: order.stop_price(),
            status: order.status(),
            execution_price: order.execution_price(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
            executed_at: order.executed_at(),
            current_price: None,
            drift: None,
            estimated_value: None,
        }
    }

    /// Attach market-data enrichment fields.
    #[must_use]
    pub fn with_enrichment(mut self, current_price: Price) -> Self {
        self.drift = order_submission_drift(&self, current_price);
        self.estimated_value = Some(current_price * self.quantity.amount());
        self.current_price = Some(current_price);
        self
    }
}

fn order_submission_drift(view: &OrderView, current_price: Price) -> Option<rust_decimal::Decimal> {
    view.price.map(|submitted| submitted.relative_difference(current_price))
}

/// Field to sort order history by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSortField {
    /// Sort by creation time.
    CreatedAt,
    /// Sort by last-update time.
    UpdatedAt,
    /// Sort by symbol, lexicographically.
    Symbol,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

/// Filters and pagination for the order-history query.
#[derive(Debug, Clone)]
pub struct OrderHistoryQuery {
    /// Requesting user; only their orders are returned.
    pub user_id: UserId,
    /// Restrict to these statuses, if set.
    pub statuses: Option<Vec<OrderStatus>>,
    /// Restrict to this symbol, if set.
    pub symbol: Option<Symbol>,
    /// Restrict to this side, if set.
    pub side: Option<OrderSide>,
    /// Restrict to this order type, if set.
    pub order_type: Option<OrderType>,
    /// Restrict to orders created within `[from, to]`, if set.
    pub date_range: Option<(Timestamp, Timestamp)>,
    /// 1-based page number.
    pub page: u32,
    /// Page size; caller values are clamped to `[1, 100]`.
    pub page_size: u32,
    /// Sort field.
    pub sort_by: OrderSortField,
    /// Sort direction.
    pub sort_dir: SortDirection,
}

impl OrderHistoryQuery {
    /// Default page size when the caller does not specify one.
    pub const DEFAULT_PAGE_SIZE: u32 = 50;
    /// Maximum allowed page size.
    pub const MAX_PAGE_SIZE: u32 = 100;

    /// Clamp `page_size` into `[1, MAX_PAGE_SIZE]`.
    #[must_use]
    pub fn effective_page_size(&self) -> u32 {
        self.page_size.clamp(1, Self::MAX_PAGE_SIZE)
    }
}

/// One page of order history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderHistoryPage {
    /// Matching orders for this page.
    pub orders: Vec<OrderView>,
    /// Total matching orders across all pages.
    pub total: usize,
    /// Page number returned.
    pub page: u32,
    /// Page size used.
    pub page_size: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order_management::CreateOrderCommand;

    fn make_order() -> Order {
        Order::new(CreateOrderCommand {
            user_id: UserId::new("u1"),
            symbol: Symbol::new("AAPL"),
            side: OrderSide::Buy,
            order_type: OrderType::Limit,
            quantity: Quantity::from_i64(10),
            price: Some(Price::from_f64(100.0)),
            stop_price: None,
        })
        .unwrap()
    }

    #[test]
    fn order_view_from_order_has_no_enrichment() {
        let order = make_order();
        let view = OrderView::from_order(&order);
        assert!(view.current_price.is_none());
        assert!(view.drift.is_none());
    }

    #[test]
    fn order_view_with_enrichment_computes_drift_and_value() {
        let order = make_order();
        let view = OrderView::from_order(&order).with_enrichment(Price::from_f64(105.0));
        assert_eq!(view.current_price, Some(Price::from_f64(105.0)));
        assert!(view.drift.is_some());
        assert_eq!(
            view.estimated_value,
            Some(Price::from_f64(105.0) * rust_decimal::Decimal::new(10, 0))
        );
    }

    #[test]
    fn effective_page_size_clamps() {
        let mut query = OrderHistoryQuery {
            user_id: UserId::new("u1"),
            statuses: None,
            symbol: None,
            side: None,
            order_type: None,
            date_range: None,
            page: 1,
            page_size: 0,
            sort_by: OrderSortField::CreatedAt,
            sort_dir: SortDirection::Desc,
        };
        assert_eq!(query.effective_page_size(), 1);

        query.page_size = 500;
        assert_eq!(query.effective_page_size(), 100);
    }
}
