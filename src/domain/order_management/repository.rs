//! Order Repository Trait
//!
//! Defines the persistence abstraction for orders. Implemented by adapters
//! in the infrastructure layer (an in-memory adapter ships with this crate;
//! a durable store is out of scope).

use std::time::Duration;

use async_trait::async_trait;

use super::aggregate::Order;
use super::errors::OrderError;
use super::value_objects::OrderStatus;
use crate::domain::shared::{OrderId, Timestamp, UserId};

/// Repository trait for Order persistence.
///
/// This is a domain interface (port) implemented by infrastructure
/// adapters.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a new order.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::DuplicateOrderId`] if an order with the same id
    /// already exists.
    async fn save(&self, order: &Order) -> Result<(), OrderError>;

    /// Find an order by its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query itself fails (not if the order is
    /// simply absent, which yields `Ok(None)`).
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderError>;

    /// Find all orders owned by a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Vec<Order>, OrderError>;

    /// Atomically transition an order's status, failing if the stored
    /// status does not match `expected`. This is the linearizability
    /// guard that lets two workers race on the same order without one
    /// silently clobbering the other's transition.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] if the order does not exist, or
    /// [`OrderError::StatusConflict`] if the stored status is not
    /// `expected`.
    async fn update_status(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        new_status: OrderStatus,
    ) -> Result<(), OrderError>;

    /// Atomically record an execution: moves the order to `Executed` and
    /// sets its execution price/timestamp in one step, subject to the same
    /// expected-status guard as [`Self::update_status`].
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] or [`OrderError::StatusConflict`].
    async fn update_order_with_execution(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<(), OrderError>;

    /// Find `Pending` orders whose age exceeds `max_age` as of `now`, for
    /// the expired-order sweep.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn find_expired_orders(
        &self,
        now: Timestamp,
        max_age: Duration,
    ) -> Result<Vec<Order>, OrderError>;

    /// Delete an order by id.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] if no such order exists.
    async fn delete(&self, id: &OrderId) -> Result<(), OrderError>;

    /// Check whether an order exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    async fn exists(&self, id: &OrderId) -> Result<bool, OrderError>;
}
