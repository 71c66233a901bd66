use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::str::FromStr;

use crate::domain::order::{Order, OrderItem, ShippingAddress};

/// `POST /orders` body as received. Fields are kept loose so that every
/// problem can be reported per field instead of as one decode error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub items: Value,
    #[serde(default)]
    pub shipping_address: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: &'static str,
}

impl FieldError {
    fn new(field: impl Into<String>, message: &'static str) -> Self {
        Self {
            field: field.into(),
            message,
        }
    }
}

/// A request that passed validation, in domain types.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub items: Vec<OrderItem>,
    pub shipping_address: ShippingAddress,
}

pub fn validate(request: &CreateOrderRequest) -> Result<NewOrder, Vec<FieldError>> {
    let mut errors = Vec::new();

    let items = match &request.items {
        Value::Array(raw) if raw.is_empty() => {
            errors.push(FieldError::new("items", "At least one item is required"));
            Vec::new()
        }
        Value::Array(raw) => raw
            .iter()
            .enumerate()
            .filter_map(|(index, item)| validate_item(index, item, &mut errors))
            .collect(),
        _ => {
            errors.push(FieldError::new("items", "Items must be an array"));
            Vec::new()
        }
    };
    if Order::compute_total(&items).is_err() {
        errors.push(FieldError::new("items", "Order total is too large"));
    }

    let shipping_address = validate_address(&request.shipping_address, &mut errors);

    match shipping_address {
        Some(shipping_address) if errors.is_empty() => Ok(NewOrder {
            items,
            shipping_address,
        }),
        _ => Err(errors),
    }
}

fn validate_item(index: usize, item: &Value, errors: &mut Vec<FieldError>) -> Option<OrderItem> {
    let field = |name: &str| format!("items[{index}].{name}");
    let before = errors.len();

    let product_id = non_empty(item.get("productId"));
    if product_id.is_none() {
        errors.push(FieldError::new(field("productId"), "Product ID is required"));
    }

    let name = non_empty(item.get("name"));
    if name.is_none() {
        errors.push(FieldError::new(field("name"), "Product name is required"));
    }

    let quantity = item
        .get("quantity")
        .and_then(Value::as_u64)
        .filter(|q| *q >= 1)
        .and_then(|q| u32::try_from(q).ok());
    if quantity.is_none() {
        errors.push(FieldError::new(field("quantity"), "Quantity must be at least 1"));
    }

    let price = item
        .get("price")
        .and_then(Value::as_number)
        .and_then(exact_decimal)
        .filter(|p| *p >= Decimal::ZERO);
    if price.is_none() {
        errors.push(FieldError::new(field("price"), "Price must be a positive number"));
    }

    if errors.len() != before {
        return None;
    }

    Some(OrderItem {
        product_id: product_id?,
        name: name?,
        quantity: quantity?,
        price: price?,
    })
}

fn validate_address(address: &Value, errors: &mut Vec<FieldError>) -> Option<ShippingAddress> {
    let mut field = |name: &str, message: &'static str| {
        let value = non_empty(address.get(name));
        if value.is_none() {
            errors.push(FieldError::new(format!("shippingAddress.{name}"), message));
        }
        value
    };

    let street = field("street", "Street address is required");
    let city = field("city", "City is required");
    let state = field("state", "State is required");
    let zip_code = field("zipCode", "ZIP code is required");
    let country = field("country", "Country is required");

    Some(ShippingAddress {
        street: street?,
        city: city?,
        state: state?,
        zip_code: zip_code?,
        country: country?,
    })
}

/// Reads the number from its JSON text, so `0.1` stays `0.1`.
fn exact_decimal(number: &Number) -> Option<Decimal> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

fn non_empty(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
