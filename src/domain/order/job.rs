use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::aggregate::Order;
use super::value_objects::{OrderItem, ShippingAddress};

/// Processing job carried by the work queue.
///
/// Wire format is the JSON object
/// `{orderId, userId, items, shippingAddress, userEmail}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderJob {
    pub order_id: Uuid,
    pub user_id: Uuid,
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
    pub user_email: String,
}

impl OrderJob {
    pub fn for_order(order: &Order, user_email: impl Into<String>) -> Self {
        Self {
            order_id: order.id,
            user_id: order.user_id,
            items: order.items.clone(),
            shipping_address: order.shipping_address.clone(),
            user_email: user_email.into(),
        }
    }

    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_payload(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_wire_format_field_names() {
        let order = Order::new(
            Uuid::new_v4(),
            vec![OrderItem {
                product_id: "P1".into(),
                name: "Widget".into(),
                quantity: 2,
                price: Decimal::new(1000, 2),
            }],
            ShippingAddress {
                street: "1 Main St".into(),
                city: "Springfield".into(),
                state: "IL".into(),
                zip_code: "62701".into(),
                country: "US".into(),
            },
        )
        .unwrap();
        let job = OrderJob::for_order(&order, "buyer@example.com");
        let value: serde_json::Value = serde_json::from_str(&job.to_payload().unwrap()).unwrap();

        let mut keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, ["items", "orderId", "shippingAddress", "userEmail", "userId"]);
        assert_eq!(value["orderId"], order.id.to_string());
        assert_eq!(value["items"][0]["productId"], "P1");
    }

    #[test]
    fn test_rejects_payload_without_order_id() {
        let payload = r#"{"userId":"7f0c1e9a-4a0e-4f57-9b8e-0a60a6f1e2d1","items":[]}"#;
        assert!(OrderJob::from_payload(payload).is_err());
    }
}
