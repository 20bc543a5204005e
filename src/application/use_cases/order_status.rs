//! Order Status and History Use Cases
//!
//! Read-side queries over the order repository. Market-data enrichment
//! (current price, drift, estimated value) is best-effort: a failed
//! market-data call degrades those fields to `None` rather than failing the
//! whole query.

use std::sync::Arc;

use crate::application::dto::{
    GetOrderStatusQuery, OrderHistoryPage, OrderHistoryQuery, OrderSortField, OrderView, SortDirection,
};
use crate::application::ports::MarketDataPort;
use crate::domain::order_management::repository::OrderRepository;
use crate::domain::order_management::Order;
use crate::error::{ErrorCode, OmsError};

/// Use case for single-order status lookups and order history pages.
pub struct OrderStatusUseCase<O, M>
where
    O: OrderRepository,
    M: MarketDataPort,
{
    order_repo: Arc<O>,
    market_data: Arc<M>,
}

impl<O, M> OrderStatusUseCase<O, M>
where
    O: OrderRepository,
    M: MarketDataPort,
{
    /// Create a new `OrderStatusUseCase`.
    pub fn new(order_repo: Arc<O>, market_data: Arc<M>) -> Self {
        Self { order_repo, market_data }
    }

    /// Fetch one order's enriched status.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::OrderNotFound`] if the order does not exist or
    /// is owned by a different user.
    #[tracing::instrument(skip_all)]
    pub async fn get_status(&self, query: GetOrderStatusQuery) -> Result<OrderView, OmsError> {
        let order = self
            .order_repo
            .find_by_id(&query.order_id)
            .await?
            .filter(|order| order.user_id() == &query.user_id)
            .ok_or_else(|| OmsError::new(ErrorCode::OrderNotFound, "order not found"))?;

        Ok(self.enrich(&order).await)
    }

    /// Fetch a filtered, paginated, sorted page of a user's order history.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying repository query fails.
    #[tracing::instrument(skip_all)]
    pub async fn get_history(&self, query: OrderHistoryQuery) -> Result<OrderHistoryPage, OmsError> {
        let mut orders = self.order_repo.find_by_user_id(&query.user_id).await?;
        orders.retain(|order| matches_filters(order, &query));
        sort_orders(&mut orders, query.sort_by, query.sort_dir);

        let total = orders.len();
        let page_size = query.effective_page_size() as usize;
        let page = query.page.max(1) as usize;
        let start = (page - 1).saturating_mul(page_size).min(total);
        let end = start.saturating_add(page_size).min(total);

        let mut views = Vec::with_capacity(end - start);
        for order in &orders[start..end] {
            views.push(self.enrich(order).await);
        }

        Ok(OrderHistoryPage {
            orders: views,
            total,
            page: query.page.max(1),
            page_size: query.effective_page_size(),
        })
    }

    async fn enrich(&self, order: &Order) -> OrderView {
        let view = OrderView::from_order(order);
        match self.market_data.get_snapshot(order.symbol()).await {
            Ok(snapshot) => view.with_enrichment(snapshot.price),
            Err(_) => view,
        }
    }
}

fn matches_filters(order: &Order, query: &OrderHistoryQuery) -> bool {
    if let Some(statuses) = &query.statuses {
        if !statuses.contains(&order.status()) {
            return false;
        }
    }
    if let Some(symbol) = &query.symbol {
        if order.symbol() != symbol {
            return false;
        }
    }
    if let Some(side) = query.side {
        if order.side() != side {
            return false;
        }
    }
    if let Some(order_type) = query.order_type {
        if order.order_type() != order_type {
            return false;
        }
    }
    if let Some((from, to)) = query.date_range {
        if order.created_at() < from || order.created_at() > to {
            return false;
        }
    }
    true
}

fn sort_orders(orders: &mut [Order], field: OrderSortField, direction: SortDirection) {
    orders.sort_by(|a, b| {
        let ordering = match field {
            OrderSortField::CreatedAt => a.created_at().cmp(&b.created_at()),
            OrderSortField::UpdatedAt => a.updated_at().cmp(&b.updated_at()),
            OrderSortField::Symbol => a.symbol().as_str().cmp(b.symbol().as_str()),
        };
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{AssetDetails, MarketDataError, MarketSnapshot, MockMarketDataPort, TradingHours};
    use crate::domain::order_management::aggregate::CreateOrderCommand;
    use crate::domain::order_management::value_objects::{OrderSide, OrderType};
    use crate::domain::shared::{Price, Quantity, Symbol, Timestamp, UserId};
    use crate::infrastructure::persistence::order_management_in_memory::InMemoryOrderRepository;
    use async_trait::async_trait;

    struct StubMarketData {
        fail: bool,
        price: Price,
    }

    #[async_trait]
    impl MarketDataPort for StubMarketData {
        async fn get_snapshot(&self, _symbol: &Symbol) -> Result<MarketSnapshot, MarketDataError> {
            if self.fail {
                return Err(MarketDataError::Unavailable { message: "down".to_string() });
            }
            Ok(MarketSnapshot {
                price: self.price,
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

    fn command(symbol: &str, side: OrderSide) -> CreateOrderCommand {
        CreateOrderCommand {
            user_id: UserId::new("u1"),
            symbol: Symbol::new(symbol),
            side,
            order_type: OrderType::Limit,
            quantity: Quantity::from_i64(10),
            price: Some(Price::from_f64(100.0)),
            stop_price: None,
        }
    }

    async fn harness(
        fail: bool,
    ) -> (OrderStatusUseCase<InMemoryOrderRepository, StubMarketData>, Arc<InMemoryOrderRepository>) {
        let order_repo = Arc::new(InMemoryOrderRepository::new());
        let market_data = Arc::new(StubMarketData { fail, price: Price::from_f64(105.0) });
        (OrderStatusUseCase::new(order_repo.clone(), market_data), order_repo)
    }

    #[tokio::test]
    async fn get_status_enriches_successfully() {
        let (use_case, repo) = harness(false).await;
        let order = Order::new(command("AAPL", OrderSide::Buy)).unwrap();
        repo.save(&order).await.unwrap();

        let view = use_case
            .get_status(GetOrderStatusQuery { order_id: order.id().clone(), user_id: UserId::new("u1") })
            .await
            .unwrap();

        assert_eq!(view.current_price, Some(Price::from_f64(105.0)));
    }

    #[tokio::test]
    async fn get_status_non_owner_is_not_found() {
        let (use_case, repo) = harness(false).await;
        let order = Order::new(command("AAPL", OrderSide::Buy)).unwrap();
        repo.save(&order).await.unwrap();

        let result = use_case
            .get_status(GetOrderStatusQuery { order_id: order.id().clone(), user_id: UserId::new("other") })
            .await;

        assert!(matches!(result, Err(e) if e.code() == ErrorCode::OrderNotFound));
    }

    #[tokio::test]
    async fn get_status_degrades_gracefully_on_market_data_failure() {
        let (use_case, repo) = harness(true).await;
        let order = Order::new(command("AAPL", OrderSide::Buy)).unwrap();
        repo.save(&order).await.unwrap();

        let view = use_case
            .get_status(GetOrderStatusQuery { order_id: order.id().clone(), user_id: UserId::new("u1") })
            .await
            .unwrap();

        assert!(view.current_price.is_none());
    }

    #[tokio::test]
    async fn get_history_filters_by_symbol_and_paginates() {
        let (use_case, repo) = harness(false).await;
        for symbol in ["AAPL", "AAPL", "MSFT"] {
            let order = Order::new(command(symbol, OrderSide::Buy)).unwrap();
            repo.save(&order).await.unwrap();
        }

        let page = use_case
            .get_history(OrderHistoryQuery {
                user_id: UserId::new("u1"),
                statuses: None,
                symbol: Some(Symbol::new("AAPL")),
                side: None,
                order_type: None,
                date_range: None,
                page: 1,
                page_size: 1,
                sort_by: OrderSortField::CreatedAt,
                sort_dir: SortDirection::Asc,
            })
            .await
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.orders.len(), 1);
    }

    #[tokio::test]
    async fn get_status_calls_market_data_exactly_once_per_lookup() {
        let order_repo = Arc::new(InMemoryOrderRepository::new());
        let order = Order::new(command("AAPL", OrderSide::Buy)).unwrap();
        order_repo.save(&order).await.unwrap();

        let mut mock_market_data = MockMarketDataPort::new();
        mock_market_data.expect_get_snapshot().times(1).returning(|_symbol| {
            Ok(MarketSnapshot {
                price: Price::from_f64(111.0),
                timestamp: Timestamp::now(),
                asset: AssetDetails {
                    tradeable: true,
                    min_order_size: Quantity::from_i64(1),
                    max_order_size: Quantity::from_i64(10_000),
                    price_step: Price::from_f64(0.01),
                },
                trading_hours: TradingHours { is_open: true },
            })
        });

        let use_case = OrderStatusUseCase::new(order_repo, Arc::new(mock_market_data));
        let view = use_case
            .get_status(GetOrderStatusQuery { order_id: order.id().clone(), user_id: UserId::new("u1") })
            .await
            .unwrap();

        assert_eq!(view.current_price, Some(Price::from_f64(111.0)));
    }

    #[test]
    fn sort_orders_by_symbol_descending() {
        let mut orders = vec![
            Order::new(command("AAPL", OrderSide::Buy)).unwrap(),
            Order::new(command("MSFT", OrderSide::Buy)).unwrap(),
        ];
        sort_orders(&mut orders, OrderSortField::Symbol, SortDirection::Desc);
        assert_eq!(orders[0].symbol().as_str(), "MSFT");
    }
}
