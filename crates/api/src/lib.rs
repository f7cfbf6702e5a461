//! HTTP API server with observability for the storefront backend.
//!
//! Provides REST endpoints for carts, checkout, order history, balances and
//! store sales, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use checkout::CheckoutCoordinator;
use domain::{CartService, Ledger};
use history::{OrderHistory, SalesHistory};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: Store> {
    pub carts: CartService<S>,
    pub checkout: CheckoutCoordinator<S>,
    pub orders: OrderHistory<S>,
    pub sales: SalesHistory<S>,
    pub ledger: Ledger<S>,
}

/// Creates the services over one store.
///
/// `max_attempts` bounds retries of cart mutations and checkouts that hit
/// concurrency conflicts.
pub fn create_state<S: Store + Clone + 'static>(store: S, max_attempts: u32) -> Arc<AppState<S>> {
    Arc::new(AppState {
        carts: CartService::new(store.clone()).with_max_attempts(max_attempts),
        checkout: CheckoutCoordinator::new(store.clone()).with_max_attempts(max_attempts),
        orders: OrderHistory::new(store.clone()),
        sales: SalesHistory::new(store.clone()),
        ledger: Ledger::new(store),
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/cart", get(routes::cart::get::<S>))
        .route("/cart", delete(routes::cart::empty::<S>))
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route("/cart/products/{id}", get(routes::cart::quantity::<S>))
        .route("/checkout", post(routes::checkout::checkout::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/account", get(routes::account::balance::<S>))
        .route("/account/deposit", post(routes::account::deposit::<S>))
        .route("/accounts/{id}/reset", post(routes::account::reset::<S>))
        .route("/sales", get(routes::sales::store_sales::<S>))
        .route(
            "/sales/products/{id}",
            get(routes::sales::product_sales::<S>),
        )
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
