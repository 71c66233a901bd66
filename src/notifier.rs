use async_trait::async_trait;

use crate::domain::order::Order;

// ============================================================================
// Notifier - order confirmation delivery
// ============================================================================
//
// Rendering and delivery belong to an external service. The worker only needs
// to know whether the call failed, and it never acts on that beyond logging.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification rejected: {0}")]
    Rejected(String),

    #[error("Notification transport failed: {0}")]
    Transport(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, order: &Order, address: &str) -> Result<(), NotifyError>;
}

/// Writes the confirmation to the log instead of sending it.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, order: &Order, address: &str) -> Result<(), NotifyError> {
        if address.trim().is_empty() {
            return Err(NotifyError::Rejected("empty recipient address".into()));
        }

        tracing::info!(
            order_id = %order.id,
            recipient = %address,
            status = %order.status,
            total_amount = %order.total_amount,
            item_count = order.items.len(),
            subject = %format!("Order Confirmation - {}", order.id),
            "📧 Order confirmation dispatched"
        );
        Ok(())
    }
}
