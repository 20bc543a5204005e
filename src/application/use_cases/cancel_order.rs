//! Cancel Order Use Case
//!
//! Cancels a single order, or a batch of them independently (no
//! cross-order atomicity: a batch cancel reports a per-order outcome and
//! keeps going past individual failures).

use std::sync::Arc;
use std::time::Duration;

use crate::application::dto::CancelOrderCommand;
use crate::domain::order_management::repository::OrderRepository;
use crate::domain::shared::Timestamp;
use crate::error::{ErrorCode, OmsError};
use crate::infrastructure::messaging::producer::Producer;

/// Default age after which a still-`Pending` order is swept and cancelled,
/// mirroring the `orders.submit` queue TTL so an order can't outlive the
/// queue message that would have admitted it.
pub const DEFAULT_ORDER_EXPIRY: Duration = Duration::from_secs(24 * 3600);

/// Use case for cancelling orders.
pub struct CancelOrderUseCase<O>
where
    O: OrderRepository,
{
    order_repo: Arc<O>,
    producer: Arc<Producer>,
}

impl<O> CancelOrderUseCase<O>
where
    O: OrderRepository,
{
    /// Create a new `CancelOrderUseCase`.
    pub fn new(order_repo: Arc<O>, producer: Arc<Producer>) -> Self {
        Self { order_repo, producer }
    }

    /// Cancel a single order.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorCode::OrderNotFound`] both when the order truly does
    /// not exist and when it belongs to a different user — ownership is
    /// never revealed to a non-owner. Returns
    /// [`ErrorCode::InvalidStateTransition`] if the order is already
    /// terminal or past the processing cancellation grace window.
    #[tracing::instrument(skip_all)]
    pub async fn execute(&self, command: CancelOrderCommand) -> Result<(), OmsError> {
        let mut order = self
            .order_repo
            .find_by_id(&command.order_id)
            .await?
            .ok_or_else(not_found)?;

        if order.user_id() != &command.user_id {
            return Err(not_found());
        }

        let previous_status = order.status();
        let now = Timestamp::now();
        order.cancel(now, "cancelled by user")?;

        self.order_repo
            .update_status(&command.order_id, previous_status, order.status())
            .await?;
        self.producer.publish_status_update(&order, previous_status).await?;

        Ok(())
    }

    /// Cancel each of `commands` independently. One order's failure does
    /// not prevent the others from being attempted.
    pub async fn execute_batch(&self, commands: Vec<CancelOrderCommand>) -> Vec<Result<(), OmsError>> {
        let mut results = Vec::with_capacity(commands.len());
        for command in commands {
            results.push(self.execute(command).await);
        }
        results
    }

    /// Find `Pending` orders older than `max_age` and cancel each of them
    /// independently. Intended to be called on a timer by the binary
    /// entrypoint; returns the per-order outcomes for logging.
    ///
    /// # Errors
    ///
    /// Returns an error only if the expired-order query itself fails; a
    /// found order's own cancel failure is reported in the returned vector
    /// rather than aborting the sweep.
    pub async fn cancel_expired(&self, max_age: Duration) -> Result<Vec<Result<(), OmsError>>, OmsError> {
        let expired = self.order_repo.find_expired_orders(Timestamp::now(), max_age).await?;
        let commands = expired
            .into_iter()
            .map(|order| CancelOrderCommand { order_id: order.id().clone(), user_id: order.user_id().clone() })
            .collect();
        Ok(self.execute_batch(commands).await)
    }
}

fn not_found() -> OmsError {
    OmsError::new(ErrorCode::OrderNotFound, "order not found")
}
