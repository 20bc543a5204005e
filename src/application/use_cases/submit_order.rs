//! Submit Order Use Case
//!
//! Implements the admission pipeline: validate, check the symbol against
//! the market-data client, gate on market/asset conditions and price bands,
//! persist as `Pending`, and publish for processing.

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::application::dto::{SubmitOrderCommand, SubmitOrderResult};
use crate::application::ports::MarketDataPort;
use crate::domain::order_management::aggregate::CreateOrderCommand;
use crate::domain::order_management::repository::OrderRepository;
use crate::domain::order_management::value_objects::{OrderSide, OrderType};
use crate::domain::order_management::Order;
use crate::domain::shared::Price;
use crate::error::OmsError;
use crate::infrastructure::messaging::producer::Producer;

/// Limit-order price deviates from the current market price by more than
/// this fraction before it is rejected outright.
const LIMIT_PRICE_DEVIATION_CAP: Decimal = Decimal::from_parts(10, 0, 0, false, 1); // 0.10

/// Use case for submitting a new order.
pub struct SubmitOrderUseCase<O, M>
where
    O: OrderRepository,
    M: MarketDataPort,
{
    order_repo: Arc<O>,
    market_data: Arc<M>,
    producer: Arc<Producer>,
}

impl<O, M> SubmitOrderUseCase<O, M>
where
    O: OrderRepository,
    M: MarketDataPort,
{
    /// Create a new `SubmitOrderUseCase`.
    pub fn new(order_repo: Arc<O>, market_data: Arc<M>, producer: Arc<Producer>) -> Self {
        Self {
            order_repo,
            market_data,
            producer,
        }
    }

    /// Run the admission pipeline. Each failed step short-circuits without
    /// persisting anything.
    ///
    /// # Errors
    ///
    /// Returns an [`OmsError`] describing the failed validation, market
    /// condition, price-band check, or infrastructure call.
    #[tracing::instrument(skip_all)]
    pub async fn execute(&self, command: SubmitOrderCommand) -> Result<SubmitOrderResult, OmsError> {
        let create_command = CreateOrderCommand {
            user_id: command.user_id,
            symbol: command.symbol,
            side: command.side,
            order_type: command.order_type,
            quantity: command.quantity,
            price: command.price,
            stop_price: command.stop_price,
        };
        create_command.validate()?;

        let known = self.market_data.validate_symbol(&create_command.symbol).await?;
        if !known {
            return Err(OmsError::new(
                crate::error::ErrorCode::SymbolNotFound,
                format!("unknown symbol: {}", create_command.symbol),
            ));
        }

        let snapshot = self.market_data.get_snapshot(&create_command.symbol).await?;

        if !snapshot.trading_hours.is_open {
            return Err(OmsError::market_closed(create_command.symbol.as_str()));
        }
        if !snapshot.asset.tradeable {
            return Err(OmsError::asset_not_tradeable(create_command.symbol.as_str()));
        }
        if !snapshot.quantity_within_bounds(create_command.quantity) {
            return Err(OmsError::quantity_out_of_bounds(create_command.symbol.as_str()));
        }

        if create_command.order_type == OrderType::Limit {
            if let Some(price) = create_command.price {
                self.check_price_band(&create_command.symbol, create_command.side, price, snapshot.price)?;
            }
        }

        let mut order = Order::new(create_command)?;
        order.set_market_data_context(snapshot.price, snapshot.timestamp);

        self.order_repo.save(&order).await?;
        self.producer.publish_submitted(&order, 0).await?;

        let estimated_execution_price = match order.order_type() {
            OrderType::Market | OrderType::StopLoss => snapshot.price,
            OrderType::Limit | OrderType::StopLimit => order.price().unwrap_or(snapshot.price),
        };

        Ok(SubmitOrderResult {
            order_id: order.id().clone(),
            status: order.status(),
            market_price_at_submission: snapshot.price,
            estimated_execution_price,
            message: "order admitted for processing".to_string(),
        })
    }

    fn check_price_band(
        &self,
        symbol: &crate::domain::shared::Symbol,
        side: OrderSide,
        order_price: Price,
        current_price: Price,
    ) -> Result<(), OmsError> {
        let deviation = order_price.relative_difference(current_price);
        if deviation > LIMIT_PRICE_DEVIATION_CAP {
            return Err(OmsError::price_band_violation(symbol.as_str(), deviation));
        }

        let upper_bound = current_price * Decimal::new(105, 2);
        let lower_bound = current_price * Decimal::new(95, 2);
        let out_of_band = match side {
            OrderSide::Buy => order_price > upper_bound,
            OrderSide::Sell => order_price < lower_bound,
        };
        if out_of_band {
            return Err(OmsError::price_band_violation(symbol.as_str(), deviation));
        }

        Ok(())
    }
}
