use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::OrderError;
use super::value_objects::{OrderItem, OrderStatus, PaymentStatus, ShippingAddress};

// ============================================================================
// Order - the durable record, and the state machine that guards it
// ============================================================================
//
//   pending ──► processing ──► processed
//      │            │  ▲
//      │            ▼  │ (redelivery re-enters)
//      └──────────► failed
//
// processed and failed are terminal. Nothing ever returns to pending.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Build a new pending order. The total is computed here and nowhere else.
    pub fn new(
        user_id: Uuid,
        items: Vec<OrderItem>,
        shipping_address: ShippingAddress,
    ) -> Result<Self, OrderError> {
        let now = Utc::now();
        let total_amount = Self::compute_total(&items)?;

        Ok(Self {
            id: Uuid::new_v4(),
            user_id,
            items,
            shipping_address,
            total_amount,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            error_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn compute_total(items: &[OrderItem]) -> Result<Decimal, OrderError> {
        items.iter().try_fold(Decimal::ZERO, |total, item| {
            item.line_total()
                .and_then(|line| total.checked_add(line))
                .ok_or(OrderError::TotalOverflow)
        })
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.user_id == user_id
    }

    /// Claim the order for processing.
    ///
    /// An order already in `processing` is re-entered as-is: a redelivered job
    /// whose previous attempt never acknowledged is picked up where it stands.
    pub fn begin_processing(&mut self) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::Pending | OrderStatus::Processing => {
                self.status = OrderStatus::Processing;
                self.touch();
                Ok(())
            }
            status => Err(OrderError::AlreadyTerminal(status)),
        }
    }

    pub fn mark_processed(&mut self) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::Processing => {
                self.status = OrderStatus::Processed;
                self.payment_status = PaymentStatus::Completed;
                self.touch();
                Ok(())
            }
            from => Err(OrderError::InvalidStatusTransition {
                from,
                to: OrderStatus::Processed,
            }),
        }
    }

    /// Record a processing failure. Allowed from `pending` as well, for
    /// failures that happen before the `processing` write lands.
    pub fn mark_failed(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        match self.status {
            OrderStatus::Pending | OrderStatus::Processing => {
                self.status = OrderStatus::Failed;
                self.error_message = Some(reason.into());
                self.touch();
                Ok(())
            }
            from => Err(OrderError::InvalidStatusTransition {
                from,
                to: OrderStatus::Failed,
            }),
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
