use actix_web::{web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use super::error::ApiError;
use super::extract::Authenticated;
use super::validation::{validate, CreateOrderRequest, NewOrder};
use crate::service::{OrderProducer, OrderReader};

/// POST /orders
pub async fn create_order(
    Authenticated(principal): Authenticated,
    producer: web::Data<OrderProducer>,
    body: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse, ApiError> {
    let NewOrder {
        items,
        shipping_address,
    } = validate(&body).map_err(|errors| {
        tracing::debug!(error_count = errors.len(), "Rejected order request");
        ApiError::Validation(errors)
    })?;

    let order = producer.create(&principal, items, shipping_address).await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "Order created successfully",
        "order": order,
    })))
}

/// GET /orders/{id}
///
/// An id that is not a UUID cannot name any order, so it is a 404 too.
pub async fn get_order(
    Authenticated(principal): Authenticated,
    reader: web::Data<OrderReader>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let order_id = Uuid::parse_str(&path).map_err(|_| ApiError::NotFound)?;
    let order = reader.get(principal.user_id, order_id).await?;

    Ok(HttpResponse::Ok().json(order))
}
