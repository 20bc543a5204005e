//! In-memory `OrderRepository` adapter for the order-management domain.
//!
//! Holds orders behind a single `RwLock`; `update_status` and
//! `update_order_with_execution` take the write half so the
//! expected-vs-actual status comparison and the write happen under one
//! critical section — two workers racing to claim the same order never
//! both succeed.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::order_management::aggregate::Order;
use crate::domain::order_management::errors::OrderError;
use crate::domain::order_management::repository::OrderRepository;
use crate::domain::order_management::value_objects::OrderStatus;
use crate::domain::shared::{OrderId, Timestamp, UserId};

/// In-memory implementation of [`OrderRepository`].
///
/// Suitable for development and the default deployment this crate ships
/// with; a durable store is out of scope.
#[derive(Debug, Default)]
pub struct InMemoryOrderRepository {
    orders: RwLock<HashMap<String, Order>>,
}

impl InMemoryOrderRepository {
    /// Create a new empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            orders: RwLock::new(HashMap::new()),
        }
    }

    /// Number of orders currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.orders.read().unwrap().len()
    }

    /// True if no orders are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.orders.read().unwrap().is_empty()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn save(&self, order: &Order) -> Result<(), OrderError> {
        let mut orders = self.orders.write().unwrap();
        if orders.contains_key(order.id().as_str()) {
            return Err(OrderError::DuplicateOrderId {
                order_id: order.id().clone(),
            });
        }
        orders.insert(order.id().as_str().to_string(), order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, OrderError> {
        let orders = self.orders.read().unwrap();
        Ok(orders.get(id.as_str()).cloned())
    }

    async fn find_by_user_id(&self, user_id: &UserId) -> Result<Vec<Order>, OrderError> {
        let orders = self.orders.read().unwrap();
        let mut found: Vec<Order> = orders
            .values()
            .filter(|o| o.user_id() == user_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at().cmp(&a.created_at()));
        Ok(found)
    }

    async fn update_status(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        new_status: OrderStatus,
    ) -> Result<(), OrderError> {
        let mut orders = self.orders.write().unwrap();
        let order = orders.get_mut(id.as_str()).ok_or_else(|| OrderError::NotFound {
            order_id: id.clone(),
        })?;

        if order.status() != expected {
            return Err(OrderError::StatusConflict {
                order_id: id.clone(),
                expected,
                actual: order.status(),
            });
        }

        match new_status {
            OrderStatus::Processing => order.mark_as_processing()?,
            OrderStatus::Cancelled => order.cancel(Timestamp::now(), "repository-driven cancel")?,
            OrderStatus::Failed => order.mark_as_failed("repository-driven failure")?,
            other => {
                return Err(OrderError::InvalidStateTransition {
                    from: order.status(),
                    to: other,
                    reason: "update_status does not set execution fields; use \
                             update_order_with_execution for Executed"
                        .to_string(),
                });
            }
        }
        Ok(())
    }

    async fn update_order_with_execution(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<(), OrderError> {
        let mut orders = self.orders.write().unwrap();
        let stored = orders
            .get(order.id().as_str())
            .ok_or_else(|| OrderError::NotFound {
                order_id: order.id().clone(),
            })?;

        if stored.status() != expected {
            return Err(OrderError::StatusConflict {
                order_id: order.id().clone(),
                expected,
                actual: stored.status(),
            });
        }

        orders.insert(order.id().as_str().to_string(), order.clone());
        Ok(())
    }

    async fn find_expired_orders(
        &self,
        now: Timestamp,
        max_age: Duration,
    ) -> Result<Vec<Order>, OrderError> {
        let orders = self.orders.read().unwrap();
        Ok(orders
            .values()
            .filter(|o| o.status() == OrderStatus::Pending && o.created_at().is_older_than(now, max_age))
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &OrderId) -> Result<(), OrderError> {
        let mut orders = self.orders.write().unwrap();
        orders
            .remove(id.as_str())
            .ok_or_else(|| OrderError::NotFound {
                order_id: id.clone(),
            })?;
        Ok(())
    }

    async fn exists(&self, id: &OrderId) -> Result<bool, OrderError> {
        let orders = self.orders.read().unwrap();
        Ok(orders.contains_key(id.as_str()))
    }
}
