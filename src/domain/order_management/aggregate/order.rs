//! Order Aggregate Root
//!
//! The Order aggregate manages the complete lifecycle of an order through
//! the submit -> enqueue -> process -> execute pipeline, enforcing the
//! state-machine transitions and cancellation/execution preconditions laid
//! out as invariants.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::order_management::errors::OrderError;
use crate::domain::order_management::value_objects::{
    MarketDataContext, OrderSide, OrderStatus, OrderType,
};
use crate::domain::shared::{OrderId, Price, Quantity, Symbol, Timestamp, UserId};

/// Grace period during which a `Processing` order may still be cancelled.
pub const CANCEL_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Command to create a new order.
#[derive(Debug, Clone)]
pub struct CreateOrderCommand {
    /// Owning user.
    pub user_id: UserId,
    /// Symbol to trade.
    pub symbol: Symbol,
    /// Order side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Quantity to trade.
    pub quantity: Quantity,
    /// Limit price (required for Limit/StopLimit).
    pub price: Option<Price>,
    /// Stop-trigger price (required for StopLoss/StopLimit).
    pub stop_price: Option<Price>,
}

impl CreateOrderCommand {
    /// Validate the command parameters against invariants 1-2.
    ///
    /// # Errors
    ///
    /// Returns an error if a required parameter is missing or invalid.
    pub fn validate(&self) -> Result<(), OrderError> {
        self.symbol
            .validate()
            .map_err(|e| OrderError::InvalidParameters {
                field: "symbol".to_string(),
                message: e.to_string(),
            })?;

        self.quantity
            .validate_for_order()
            .map_err(|e| OrderError::InvalidParameters {
                field: "quantity".to_string(),
                message: e.to_string(),
            })?;

        if self.order_type.requires_limit_price() && self.price.is_none() {
            return Err(OrderError::InvalidParameters {
                field: "price".to_string(),
                message: "price required for limit and stop-limit orders".to_string(),
            });
        }

        if self.order_type.requires_stop_price() && self.stop_price.is_none() {
            return Err(OrderError::InvalidParameters {
                field: "stop_price".to_string(),
                message: "stop_price required for stop-loss and stop-limit orders".to_string(),
            });
        }

        if let Some(price) = self.price {
            price
                .validate_for_order()
                .map_err(|e| OrderError::InvalidParameters {
                    field: "price".to_string(),
                    message: e.to_string(),
                })?;
        }

        if let Some(stop_price) = self.stop_price {
            stop_price
                .validate_for_order()
                .map_err(|e| OrderError::InvalidParameters {
                    field: "stop_price".to_string(),
                    message: e.to_string(),
                })?;
        }

        Ok(())
    }
}

/// Order Aggregate Root.
///
/// Owns the full lifecycle of a single order from admission through a
/// terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    user_id: UserId,
    symbol: Symbol,
    side: OrderSide,
    order_type: OrderType,
    quantity: Quantity,
    price: Option<Price>,
    stop_price: Option<Price>,
    status: OrderStatus,
    market_data_context: Option<MarketDataContext>,
    execution_price: Option<Price>,
    failure_reason: Option<String>,
    created_at: Timestamp,
    updated_at: Timestamp,
    executed_at: Option<Timestamp>,
}

impl Order {
    /// Create a new order from a command. The order starts in `Pending`.
    ///
    /// # Errors
    ///
    /// Returns an error if command validation fails.
    pub fn new(cmd: CreateOrderCommand) -> Result<Self, OrderError> {
        cmd.validate()?;

        let now = Timestamp::now();

        Ok(Self {
            id: OrderId::generate(),
            user_id: cmd.user_id,
            symbol: cmd.symbol,
            side: cmd.side,
            order_type: cmd.order_type,
            quantity: cmd.quantity,
            price: cmd.price,
            stop_price: cmd.stop_price,
            status: OrderStatus::Pending,
            market_data_context: None,
            execution_price: None,
            failure_reason: None,
            created_at: now,
            updated_at: now,
            executed_at: None,
        })
    }

    /// Reconstitute an order from stored state.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: OrderId,
        user_id: UserId,
        symbol: Symbol,
        side: OrderSide,
        order_type: OrderType,
        quantity: Quantity,
        price: Option<Price>,
        stop_price: Option<Price>,
        status: OrderStatus,
        market_data_context: Option<MarketDataContext>,
        execution_price: Option<Price>,
        failure_reason: Option<String>,
        created_at: Timestamp,
        updated_at: Timestamp,
        executed_at: Option<Timestamp>,
    ) -> Self {
        Self {
            id,
            user_id,
            symbol,
            side,
            order_type,
            quantity,
            price,
            stop_price,
            status,
            market_data_context,
            execution_price,
            failure_reason,
            created_at,
            updated_at,
            executed_at,
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Get the order ID.
    #[must_use]
    pub fn id(&self) -> &OrderId {
        &self.id
    }

    /// Get the owning user's ID.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Get the symbol.
    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    /// Get the order side.
    #[must_use]
    pub const fn side(&self) -> OrderSide {
        self.side
    }

    /// Get the order type.
    #[must_use]
    pub const fn order_type(&self) -> OrderType {
        self.order_type
    }

    /// Get the quantity.
    #[must_use]
    pub const fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Get the limit price, if any.
    #[must_use]
    pub const fn price(&self) -> Option<Price> {
        self.price
    }

    /// Get the stop-trigger price, if any.
    #[must_use]
    pub const fn stop_price(&self) -> Option<Price> {
        self.stop_price
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> OrderStatus {
        self.status
    }

    /// Get the market-data snapshot captured when processing began, if any.
    #[must_use]
    pub const fn market_data_context(&self) -> Option<MarketDataContext> {
        self.market_data_context
    }

    /// Get the execution price, if executed.
    #[must_use]
    pub const fn execution_price(&self) -> Option<Price> {
        self.execution_price
    }

    /// Get the failure reason, if failed.
    #[must_use]
    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> Timestamp {
        self.created_at
    }

    /// Get the last update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    /// Get the execution timestamp, if executed.
    #[must_use]
    pub const fn executed_at(&self) -> Option<Timestamp> {
        self.executed_at
    }

    /// Notional value of the order: `quantity * price`. Market orders with
    /// no price on file value at zero; callers that need a market-priced
    /// notional should use the market-data snapshot instead.
    #[must_use]
    pub fn calculate_order_value(&self) -> Price {
        match self.price {
            Some(price) => price * self.quantity.amount(),
            None => Price::ZERO,
        }
    }

    // ========================================================================
    // Preconditions
    // ========================================================================

    /// True if the order may be cancelled right now: always while `Pending`,
    /// or while `Processing` within the cancellation grace period of the
    /// transition into `Processing` (stamped onto `updated_at`).
    #[must_use]
    pub fn can_cancel(&self, now: Timestamp) -> bool {
        match self.status {
            OrderStatus::Pending => true,
            OrderStatus::Processing => self.updated_at.within_window(now, CANCEL_GRACE_PERIOD),
            _ => false,
        }
    }

    /// True if the order may move to `Processing` and be executed: only
    /// while `Pending`.
    #[must_use]
    pub const fn can_execute(&self) -> bool {
        matches!(self.status, OrderStatus::Pending)
    }

    // ========================================================================
    // State Transitions
    // ========================================================================

    /// Claim the order for processing by a worker.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is not `Pending`.
    pub fn mark_as_processing(&mut self) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Processing)
    }

    /// Attach the market-data snapshot captured at the start of processing.
    pub fn set_market_data_context(&mut self, price: Price, timestamp: Timestamp) {
        self.market_data_context = Some(MarketDataContext::new(price, timestamp));
        self.updated_at = Timestamp::now();
    }

    /// Mark the order executed at `execution_price`.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is not `Processing`.
    pub fn mark_as_executed(&mut self, execution_price: Price) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Executed)?;
        self.execution_price = Some(execution_price);
        self.executed_at = Some(self.updated_at);
        Ok(())
    }

    /// Mark the order failed with `reason`.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is already terminal.
    pub fn mark_as_failed(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        self.transition_to(OrderStatus::Failed)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    /// Cancel the order, subject to [`Self::can_cancel`].
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::CannotCancel`] if the grace window has passed
    /// or the order is already terminal.
    pub fn cancel(&mut self, now: Timestamp, reason: impl Into<String>) -> Result<(), OrderError> {
        if !self.can_cancel(now) {
            return Err(OrderError::CannotCancel {
                order_id: self.id.clone(),
                status: self.status,
            });
        }
        self.transition_to(OrderStatus::Cancelled)?;
        self.failure_reason = Some(reason.into());
        Ok(())
    }

    // ========================================================================
    // Private Helpers
    // ========================================================================

    fn transition_to(&mut self, target: OrderStatus) -> Result<(), OrderError> {
        if !self.status.can_transition_to(target) {
            return Err(OrderError::InvalidStateTransition {
                from: self.status,
                to: target,
                reason: "transition not permitted by the order state graph".to_string(),
            });
        }
        self.status = target;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}
