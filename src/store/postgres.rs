use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::{OrderStore, StoreError};
use crate::domain::order::{Order, OrderItem, OrderStatus, PaymentStatus, ShippingAddress};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS orders (
    id               UUID PRIMARY KEY,
    user_id          UUID NOT NULL,
    items            JSONB NOT NULL,
    shipping_address JSONB NOT NULL,
    total_amount     NUMERIC NOT NULL,
    status           TEXT NOT NULL,
    payment_status   TEXT NOT NULL,
    error_message    TEXT,
    created_at       TIMESTAMPTZ NOT NULL,
    updated_at       TIMESTAMPTZ NOT NULL
)";

const OWNER_INDEX: &str = "CREATE INDEX IF NOT EXISTS orders_user_id_idx ON orders (user_id)";

const SELECT_COLUMNS: &str = "SELECT id, user_id, items, shipping_address, total_amount, status, \
     payment_status, error_message, created_at, updated_at FROM orders";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    items: Json<Vec<OrderItem>>,
    shipping_address: Json<ShippingAddress>,
    total_amount: Decimal,
    status: String,
    payment_status: String,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = OrderStatus::parse(&row.status).ok_or_else(|| StoreError::Corrupt {
            id: row.id,
            reason: format!("unknown status '{}'", row.status),
        })?;
        let payment_status = PaymentStatus::parse(&row.payment_status).ok_or_else(|| StoreError::Corrupt {
            id: row.id,
            reason: format!("unknown payment status '{}'", row.payment_status),
        })?;

        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            items: row.items.0,
            shipping_address: row.shipping_address.0,
            total_amount: row.total_amount,
            status,
            payment_status,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PgOrderStore {
    pool: PgPool,
}

impl PgOrderStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `orders` table if it is missing.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        sqlx::query(OWNER_INDEX).execute(&self.pool).await?;
        tracing::info!("Order store schema ready");
        Ok(())
    }
}

#[async_trait]
impl OrderStore for PgOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO orders (id, user_id, items, shipping_address, total_amount, status, \
             payment_status, error_message, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(order.id)
        .bind(order.user_id)
        .bind(Json(&order.items))
        .bind(Json(&order.shipping_address))
        .bind(order.total_amount)
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.error_message.as_deref())
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(order_id = %order.id, user_id = %order.user_id, "Inserted order");
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    async fn find_for_owner(&self, id: Uuid, user_id: Uuid) -> Result<Option<Order>, StoreError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1 AND user_id = $2"))
                .bind(id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Order::try_from).transpose()
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: OrderStatus,
        error_message: Option<String>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE orders SET status = $2, error_message = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(error_message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        tracing::debug!(order_id = %id, status = %status, "Updated order status");
        Ok(())
    }

    async fn update_payment_status(&self, id: Uuid, payment_status: PaymentStatus) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE orders SET payment_status = $2, updated_at = $3 WHERE id = $1")
                .bind(id)
                .bind(payment_status.as_str())
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }

        tracing::debug!(order_id = %id, payment_status = %payment_status, "Updated payment status");
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
