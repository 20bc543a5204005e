//! Process Order Use Case
//!
//! Claims a `Pending` order, re-checks market conditions, computes an
//! execution price per order type, and either executes or fails it. Safe to
//! retry: re-processing an order that already left `Pending` is a no-op
//! rejected by the `CanExecute` gate rather than a double execution.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::application::ports::MarketDataPort;
use crate::domain::order_management::repository::OrderRepository;
use crate::domain::order_management::value_objects::{OrderSide, OrderStatus, OrderType};
use crate::domain::shared::OrderId;
use crate::domain::shared::Price;
use crate::error::{ErrorCode, OmsError};
use crate::infrastructure::messaging::producer::Producer;

/// Execution price deviates from the submission-time snapshot by more than
/// this fraction before the fill is rejected as too risky to honor.
const EXECUTION_DRIFT_CAP: Decimal = Decimal::from_parts(5, 0, 0, false, 2); // 0.05

/// Outcome of a single processing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOrderResult {
    /// Order processed.
    pub order_id: OrderId,
    /// Status the order ended the attempt in.
    pub final_status: OrderStatus,
    /// Fill price, if executed.
    pub execution_price: Option<Price>,
}

/// Use case for executing a claimed order.
pub struct ProcessOrderUseCase<O, M>
where
    O: OrderRepository,
    M: MarketDataPort,
{
    order_repo: Arc<O>,
    market_data: Arc<M>,
    producer: Arc<Producer>,
}

impl<O, M> ProcessOrderUseCase<O, M>
where
    O: OrderRepository,
    M: MarketDataPort,
{
    /// Create a new `ProcessOrderUseCase`.
    pub fn new(order_repo: Arc<O>, market_data: Arc<M>, producer: Arc<Producer>) -> Self {
        Self {
            order_repo,
            market_data,
            producer,
        }
    }

    /// Claim and execute `order_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::OrderNotFound`] if the order does not exist,
    /// [`ErrorCode::StatusConflict`] if it is not `Pending` (retryable — a
    /// concurrent worker may have claimed it first), or a market-condition
    /// / drift rejection that fails the order.
    #[tracing::instrument(skip(self))]
    pub async fn execute(&self, order_id: &OrderId) -> Result<ProcessOrderResult, OmsError> {
        let mut order = self
            .order_repo
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| OmsError::new(ErrorCode::OrderNotFound, format!("order not found: {order_id}")))?;

        if !order.can_execute() {
            return Err(OmsError::new(
                ErrorCode::StatusConflict,
                format!("order {order_id} is not pending"),
            ));
        }

        let previous_status = order.status();
        order.mark_as_processing()?;
        self.order_repo
            .update_status(order_id, OrderStatus::Pending, OrderStatus::Processing)
            .await?;

        let snapshot = self.market_data.get_snapshot(order.symbol()).await?;

        if !snapshot.trading_hours.is_open {
            return self.fail(order, "market closed during processing").await;
        }
        if !snapshot.asset.tradeable {
            return self.fail(order, "asset no longer tradeable").await;
        }
        if !snapshot.quantity_within_bounds(order.quantity()) {
            return self.fail(order, "quantity outside tradeable bounds at processing time").await;
        }

        let execution_price = match self.determine_execution_price(&order, snapshot.price) {
            Some(price) => price,
            None => return self.fail(order, "order conditions not met at current market price").await,
        };

        if let Some(context) = order.market_data_context() {
            let drift = execution_price.relative_difference(context.price);
            if drift > EXECUTION_DRIFT_CAP {
                return self.fail(order, "execution price drifted beyond tolerance").await;
            }
        }

        order.mark_as_executed(execution_price)?;
        self.order_repo
            .update_order_with_execution(&order, OrderStatus::Processing)
            .await?;
        self.producer.publish_status_update(&order, previous_status).await?;

        Ok(ProcessOrderResult {
            order_id: order.id().clone(),
            final_status: order.status(),
            execution_price: order.execution_price(),
        })
    }

    /// Compute the fill price for `order` against `current_price`, or
    /// `None` if the order's trigger/limit condition is not satisfied yet.
    fn determine_execution_price(
        &self,
        order: &crate::domain::order_management::Order,
        current_price: Price,
    ) -> Option<Price> {
        match order.order_type() {
            OrderType::Market => Some(current_price),

            OrderType::Limit => {
                let limit = order.price()?;
                match order.side() {
                    OrderSide::Buy if current_price <= limit => Some(current_price),
                    OrderSide::Sell if current_price >= limit => Some(current_price),
                    _ => None,
                }
            }

            OrderType::StopLoss => {
                let stop = order.stop_price()?;
                match order.side() {
                    OrderSide::Buy if current_price >= stop => Some(current_price),
                    OrderSide::Sell if current_price <= stop => Some(current_price),
                    _ => None,
                }
            }

            // Becomes a limit order at `price` only once `stop_price`
            // triggers: both conditions must hold, not just the limit.
            OrderType::StopLimit => {
                let stop = order.stop_price()?;
                let limit = order.price()?;
                let triggered = match order.side() {
                    OrderSide::Buy => current_price >= stop,
                    OrderSide::Sell => current_price <= stop,
                };
                if !triggered {
                    return None;
                }
                match order.side() {
                    OrderSide::Buy if current_price <= limit => Some(current_price),
                    OrderSide::Sell if current_price >= limit => Some(current_price),
                    _ => None,
                }
            }
        }
    }

    async fn fail(
        &self,
        mut order: crate::domain::order_management::Order,
        reason: &str,
    ) -> Result<ProcessOrderResult, OmsError> {
        let previous_status = order.status();
        order.mark_as_failed(reason)?;
        self.order_repo
            .update_status(order.id(), OrderStatus::Processing, OrderStatus::Failed)
            .await?;
        self.producer.publish_status_update(&order, previous_status).await?;

        Ok(ProcessOrderResult {
            order_id: order.id().clone(),
            final_status: order.status(),
            execution_price: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{AssetDetails, MarketDataError, MarketSnapshot, TradingHours};
    use crate::domain::order_management::aggregate::CreateOrderCommand;
    use crate::domain::order_management::Order;
    use crate::domain::shared::{Quantity, Symbol, Timestamp, UserId};
    use crate::MessageTransportPort;
    use crate::infrastructure::messaging::in_memory_transport::InMemoryTransport;
    use crate::infrastructure::persistence::order_management_in_memory::InMemoryOrderRepository;
    use async_trait::async_trait;

    struct StubMarketData {
        open: bool,
        price: Price,
    }

    #[async_trait]
    impl MarketDataPort for StubMarketData {
        async fn get_snapshot(&self, _symbol: &Symbol) -> Result<MarketSnapshot, MarketDataError> {
            Ok(MarketSnapshot {
                price: self.price,
                timestamp: Timestamp::now(),
                asset: AssetDetails {
                    tradeable: true,
                    min_order_size: Quantity::from_i64(1),
                    max_order_size: Quantity::from_i64(10_000),
                    price_step: Price::from_f64(0.01),
                },
                trading_hours: TradingHours { is_open: self.open },
            })
        }

        async fn validate_symbol(&self, _symbol: &Symbol) -> Result<bool, MarketDataError> {
            Ok(true)
        }
    }

    async fn harness(
        price: f64,
    ) -> (
        ProcessOrderUseCase<InMemoryOrderRepository, StubMarketData>,
        Arc<InMemoryOrderRepository>,
    ) {
        let transport = Arc::new(InMemoryTransport::new());
        transport.declare_topology().await.unwrap();
        let producer = Arc::new(Producer::new(transport));
        let order_repo = Arc::new(InMemoryOrderRepository::new());
        let market_data = Arc::new(StubMarketData { open: true, price: Price::from_f64(price) });
        (
            ProcessOrderUseCase::new(order_repo.clone(), market_data, producer),
            order_repo,
        )
    }

    async fn seed_order(repo: &InMemoryOrderRepository, cmd: CreateOrderCommand, submission_price: f64) -> OrderId {
        let mut order = Order::new(cmd).unwrap();
        order.set_market_data_context(Price::from_f64(submission_price), Timestamp::now());
        repo.save(&order).await.unwrap();
        order.id().clone()
    }

    fn market_buy(symbol: &str) -> CreateOrderCommand {
        CreateOrderCommand {
            user_id: UserId::new("u1"),
            symbol: Symbol::new(symbol),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: Quantity::from_i64(10),
            price: None,
            stop_price: None,
        }
    }

    #[tokio::test]
    async fn market_order_executes_at_current_price() {
        let (use_case, repo) = harness(150.0).await;
        let order_id = seed_order(&repo, market_buy("AAPL"), 150.0).await;

        let result = use_case.execute(&order_id).await.unwrap();
        assert_eq!(result.final_status, OrderStatus::Executed);
        assert_eq!(result.execution_price, Some(Price::from_f64(150.0)));
    }

    #[tokio::test]
    async fn limit_buy_waits_until_price_at_or_below_limit() {
        let (use_case, repo) = harness(105.0).await;
        let mut cmd = market_buy("AAPL");
        cmd.order_type = OrderType::Limit;
        cmd.price = Some(Price::from_f64(100.0));
        let order_id = seed_order(&repo, cmd, 105.0).await;

        let result = use_case.execute(&order_id).await.unwrap();
        assert_eq!(result.final_status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn limit_buy_executes_when_price_at_or_below_limit() {
        let (use_case, repo) = harness(98.0).await;
        let mut cmd = market_buy("AAPL");
        cmd.order_type = OrderType::Limit;
        cmd.price = Some(Price::from_f64(100.0));
        let order_id = seed_order(&repo, cmd, 99.0).await;

        let result = use_case.execute(&order_id).await.unwrap();
        assert_eq!(result.final_status, OrderStatus::Executed);
        assert_eq!(result.execution_price, Some(Price::from_f64(98.0)));
    }

    #[tokio::test]
    async fn stop_loss_sell_triggers_when_price_falls_to_stop() {
        let (use_case, repo) = harness(90.0).await;
        let mut cmd = market_buy("AAPL");
        cmd.side = OrderSide::Sell;
        cmd.order_type = OrderType::StopLoss;
        cmd.stop_price = Some(Price::from_f64(95.0));
        let order_id = seed_order(&repo, cmd, 91.0).await;

        let result = use_case.execute(&order_id).await.unwrap();
        assert_eq!(result.final_status, OrderStatus::Executed);
    }

    #[tokio::test]
    async fn stop_limit_buy_waits_for_trigger_even_if_limit_already_satisfied() {
        // Limit is satisfied (current <= limit) but the stop hasn't
        // triggered yet (current < stop): must not execute.
        let (use_case, repo) = harness(90.0).await;
        let mut cmd = market_buy("AAPL");
        cmd.order_type = OrderType::StopLimit;
        cmd.stop_price = Some(Price::from_f64(100.0));
        cmd.price = Some(Price::from_f64(105.0));
        let order_id = seed_order(&repo, cmd, 90.0).await;

        let result = use_case.execute(&order_id).await.unwrap();
        assert_eq!(result.final_status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn stop_limit_buy_executes_once_triggered_and_within_limit() {
        let (use_case, repo) = harness(102.0).await;
        let mut cmd = market_buy("AAPL");
        cmd.order_type = OrderType::StopLimit;
        cmd.stop_price = Some(Price::from_f64(100.0));
        cmd.price = Some(Price::from_f64(105.0));
        let order_id = seed_order(&repo, cmd, 102.0).await;

        let result = use_case.execute(&order_id).await.unwrap();
        assert_eq!(result.final_status, OrderStatus::Executed);
        assert_eq!(result.execution_price, Some(Price::from_f64(102.0)));
    }

    #[tokio::test]
    async fn stop_limit_buy_triggered_but_past_limit_does_not_execute() {
        // Stop has triggered (current >= stop) but price has since run past
        // the limit (current > limit): still must not execute.
        let (use_case, repo) = harness(110.0).await;
        let mut cmd = market_buy("AAPL");
        cmd.order_type = OrderType::StopLimit;
        cmd.stop_price = Some(Price::from_f64(100.0));
        cmd.price = Some(Price::from_f64(105.0));
        let order_id = seed_order(&repo, cmd, 110.0).await;

        let result = use_case.execute(&order_id).await.unwrap();
        assert_eq!(result.final_status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn quantity_outside_bounds_at_processing_time_fails_order() {
        let (use_case, repo) = harness(150.0).await;
        let mut cmd = market_buy("AAPL");
        cmd.quantity = Quantity::from_i64(50_000);
        let order_id = seed_order(&repo, cmd, 150.0).await;

        let result = use_case.execute(&order_id).await.unwrap();
        assert_eq!(result.final_status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn excessive_drift_from_submission_price_fails_order() {
        let (use_case, repo) = harness(200.0).await;
        let order_id = seed_order(&repo, market_buy("AAPL"), 100.0).await;

        let result = use_case.execute(&order_id).await.unwrap();
        assert_eq!(result.final_status, OrderStatus::Failed);
    }

    #[tokio::test]
    async fn already_processed_order_is_rejected() {
        let (use_case, repo) = harness(150.0).await;
        let order_id = seed_order(&repo, market_buy("AAPL"), 150.0).await;

        use_case.execute(&order_id).await.unwrap();
        let result = use_case.execute(&order_id).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn unknown_order_id_returns_not_found() {
        let (use_case, _repo) = harness(150.0).await;
        let result = use_case.execute(&OrderId::generate()).await;
        assert!(matches!(result, Err(e) if e.code() == ErrorCode::OrderNotFound));
    }
}
