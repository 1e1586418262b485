//! Order lifecycle actions shared by the storefront and admin.

use sqlx::PgPool;
use tracing::{info, instrument, warn};

use vivero_core::{OrderId, OrderStatus, UserId};

use super::email::EmailService;
use super::payments::Payment;
use crate::db::{OrderRepository, RepositoryError, StatusChange, UserRepository};
use crate::models::Order;

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("order not found")]
    NotFound,

    #[error("an order that is {0} can no longer be cancelled")]
    NotCancellable(OrderStatus),

    #[error("cannot move an order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl OrderError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::NotCancellable(_) => "not_cancellable",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Repository(_) => "server_error",
        }
    }
}

pub struct OrderService<'a> {
    pool: &'a PgPool,
    email: &'a EmailService,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool, email: &'a EmailService) -> Self {
        Self { pool, email }
    }

    /// Cancel one of the customer's own orders while it is still pending.
    ///
    /// Orders belonging to someone else look like missing ones.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `NotCancellable` or a repository error.
    #[instrument(skip(self))]
    pub async fn cancel_for_customer(
        &self,
        user_id: UserId,
        order_id: OrderId,
    ) -> Result<Order, OrderError> {
        let order = OrderRepository::new(self.pool)
            .get(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(OrderError::NotFound)?;

        if !order.can_customer_cancel() {
            return Err(OrderError::NotCancellable(order.status));
        }

        let change = self.transition(order_id, OrderStatus::Cancelled).await?;
        info!(order_id = %order_id, "Order cancelled by customer");
        Ok(change.order)
    }

    /// Move an order along its lifecycle and email the customer.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `InvalidTransition` or a repository error.
    #[instrument(skip(self))]
    pub async fn change_status(
        &self,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, OrderError> {
        let current = OrderRepository::new(self.pool)
            .get(order_id)
            .await?
            .ok_or(OrderError::NotFound)?;

        if !current.status.can_transition_to(next) {
            return Err(OrderError::InvalidTransition {
                from: current.status,
                to: next,
            });
        }

        let change = self.transition(order_id, next).await?;
        info!(order_id = %order_id, from = %change.previous, to = %next, "Order status changed");
        self.notify_customer(&change.order).await;
        Ok(change.order)
    }

    /// Admin cancellation. Allowed from any non-terminal status.
    ///
    /// # Errors
    ///
    /// Same as [`Self::change_status`].
    pub async fn cancel_by_admin(&self, order_id: OrderId) -> Result<Order, OrderError> {
        self.change_status(order_id, OrderStatus::Cancelled).await
    }

    /// Record a gateway payment on the order it references.
    ///
    /// Returns `None` when the payment references no known order. Statuses
    /// that do not map to an order status are stored without moving the
    /// order.
    ///
    /// # Errors
    ///
    /// Returns a repository error.
    #[instrument(skip(self, payment), fields(payment_id = payment.id, status = payment.raw_status()))]
    pub async fn apply_payment_update(
        &self,
        payment: &Payment,
    ) -> Result<Option<StatusChange>, OrderError> {
        let Some(order_id) = payment.order_id() else {
            warn!("Payment has no usable external reference");
            return Ok(None);
        };

        let result = OrderRepository::new(self.pool)
            .apply_payment(
                order_id,
                &payment.id.to_string(),
                payment.raw_status(),
                payment.status().order_status(),
            )
            .await;

        let change = match result {
            Ok(change) => change,
            Err(RepositoryError::NotFound) => {
                warn!(order_id = %order_id, "Payment references an unknown order");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        if change.changed() {
            info!(
                order_id = %order_id,
                from = %change.previous,
                to = %change.order.status,
                "Order updated from payment"
            );
            self.notify_customer(&change.order).await;
        }
        Ok(Some(change))
    }

    async fn transition(
        &self,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<StatusChange, OrderError> {
        match OrderRepository::new(self.pool)
            .update_status(order_id, next)
            .await
        {
            Ok(change) => Ok(change),
            Err(RepositoryError::NotFound) => Err(OrderError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Email the order's owner about its new status. Failures are logged.
    async fn notify_customer(&self, order: &Order) {
        let user = match UserRepository::new(self.pool).get_by_id(order.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                warn!(order_id = %order.id, error = %e, "failed to load order owner");
                return;
            }
        };

        let email = self.email.clone();
        let order = order.clone();
        tokio::spawn(async move {
            if let Err(e) = email
                .send_order_status_changed(user.email.as_str(), &user.name, &order)
                .await
            {
                warn!(order_id = %order.id, error = %e, "failed to send status email");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(OrderError::NotFound.code(), "not_found");
        assert_eq!(
            OrderError::NotCancellable(OrderStatus::Shipped).code(),
            "not_cancellable"
        );
        let err = OrderError::InvalidTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Pending,
        };
        assert_eq!(err.to_string(), "cannot move an order from delivered to pending");
    }
}
