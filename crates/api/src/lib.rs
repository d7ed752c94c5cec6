//! HTTP API server for storefront checkout.
//!
//! Provides the checkout and order history endpoints, with structured
//! logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use checkout::{CheckoutConfig, CheckoutOrchestrator};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::observability::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::observability::health::<S>))
        .route("/api/orders", post(routes::orders::create::<S>))
        .route("/api/orders/{id}", get(routes::orders::get::<S>))
        .route("/api/user/orders", get(routes::orders::list_for_user::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around a store.
pub fn create_state<S: Store + 'static>(store: S, config: CheckoutConfig) -> Arc<AppState<S>> {
    Arc::new(AppState {
        orchestrator: CheckoutOrchestrator::with_config(store, config),
    })
}
