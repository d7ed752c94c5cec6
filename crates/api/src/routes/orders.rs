//! Checkout and order history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::CheckoutOrchestrator;
use domain::{CartLine, Order, OrderId, OrderLine};
use serde::{Deserialize, Serialize};
use store::Store;

use crate::auth::RequireCustomer;
use crate::error::ApiError;

/// Most orders returned by the order history endpoint.
pub const ORDER_HISTORY_LIMIT: usize = 20;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub orchestrator: CheckoutOrchestrator<S>,
}

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub cart_items: Vec<CartItemRequest>,
    #[serde(default)]
    pub shipping_address: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreatedResponse {
    pub order_id: String,
    pub total_amount: String,
    pub message: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderSummaryResponse {
    pub id: String,
    pub status: String,
    pub payment_status: String,
    pub shipping_address: String,
    pub total_amount: String,
    pub created_at: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineResponse {
    pub id: String,
    pub product_id: String,
    pub quantity: u32,
    pub unit_price: String,
    pub subtotal: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub order: OrderSummaryResponse,
    pub lines: Vec<OrderLineResponse>,
}

impl From<&Order> for OrderSummaryResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.to_string(),
            status: order.status.to_string(),
            payment_status: order.payment_status.to_string(),
            shipping_address: order.shipping_address.clone(),
            total_amount: order.total_amount.amount().to_string(),
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

impl From<&OrderLine> for OrderLineResponse {
    fn from(line: &OrderLine) -> Self {
        Self {
            id: line.id.to_string(),
            product_id: line.product_id.to_string(),
            quantity: line.quantity,
            unit_price: line.unit_price.amount().to_string(),
            subtotal: line.subtotal().amount().to_string(),
        }
    }
}

// -- Handlers --

/// POST /api/orders — check out the submitted cart.
#[tracing::instrument(skip_all, fields(customer_id = %customer_id))]
pub async fn create<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireCustomer(customer_id): RequireCustomer,
    payload: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderCreatedResponse>), ApiError> {
    let Json(req) = payload.map_err(|e| {
        tracing::debug!(error = %e, "rejected order body");
        ApiError::BadRequest("Invalid request body".to_string())
    })?;

    let lines: Vec<CartLine> = req
        .cart_items
        .into_iter()
        .map(|item| CartLine::new(item.product_id, item.quantity))
        .collect();

    let receipt = state
        .orchestrator
        .checkout(customer_id, &req.shipping_address, &lines)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(OrderCreatedResponse {
            order_id: receipt.order_id.to_string(),
            total_amount: receipt.total_amount.amount().to_string(),
            message: "Order created successfully",
        }),
    ))
}

/// GET /api/user/orders — the caller's most recent orders, newest first.
#[tracing::instrument(skip_all, fields(customer_id = %customer_id))]
pub async fn list_for_user<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireCustomer(customer_id): RequireCustomer,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiError> {
    let orders = state
        .orchestrator
        .store()
        .list_orders_for_customer(customer_id, ORDER_HISTORY_LIMIT)
        .await?;

    Ok(Json(orders.iter().map(OrderSummaryResponse::from).collect()))
}

/// GET /api/orders/{id} — one of the caller's orders with its lines.
#[tracing::instrument(skip_all, fields(customer_id = %customer_id, order_id = %id))]
pub async fn get<S: Store + 'static>(
    State(state): State<Arc<AppState<S>>>,
    RequireCustomer(customer_id): RequireCustomer,
    Path(id): Path<String>,
) -> Result<Json<OrderDetailResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let store = state.orchestrator.store();

    // Another customer's order is reported exactly like a missing one.
    let order = store
        .get_order(order_id)
        .await?
        .filter(|order| order.customer_id == customer_id)
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;
    let lines = store.get_order_lines(order_id).await?;

    Ok(Json(OrderDetailResponse {
        order: OrderSummaryResponse::from(&order),
        lines: lines.iter().map(OrderLineResponse::from).collect(),
    }))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid ID format: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
