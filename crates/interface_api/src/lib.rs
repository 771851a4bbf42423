//! HTTP API Layer
//!
//! This crate provides the REST API for the olive oil ledger using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for providers, barrels and invoices
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Billing errors mapped to JSON error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(PostgresLedgerStore::new(pool), config);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod dto;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use domain_billing::{BillingService, LedgerStore};

use crate::config::ApiConfig;
use crate::handlers::{barrels, health, invoices, providers};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState<S> {
    pub service: BillingService<S>,
    pub config: ApiConfig,
}

/// Creates the main API router over the given ledger store
pub fn create_router<S: LedgerStore>(store: S, config: ApiConfig) -> Router {
    let state = AppState {
        service: BillingService::new(store),
        config,
    };

    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check::<S>));

    let provider_routes = Router::new()
        .route(
            "/",
            post(providers::create_provider::<S>).get(providers::list_providers::<S>),
        )
        .route(
            "/:id",
            get(providers::get_provider::<S>)
                .put(providers::update_provider::<S>)
                .delete(providers::delete_provider::<S>),
        );

    let barrel_routes = Router::new()
        .route(
            "/",
            post(barrels::create_barrel::<S>).get(barrels::list_barrels::<S>),
        )
        .route(
            "/:id",
            get(barrels::get_barrel::<S>)
                .put(barrels::update_barrel::<S>)
                .delete(barrels::delete_barrel::<S>),
        );

    let invoice_routes = Router::new()
        .route(
            "/",
            post(invoices::create_invoice::<S>).get(invoices::list_invoices::<S>),
        )
        .route(
            "/:id",
            get(invoices::get_invoice::<S>).delete(invoices::delete_invoice::<S>),
        )
        .route("/:id/lines", get(invoices::list_lines::<S>))
        .route("/:id/add-line", post(invoices::add_line::<S>));

    let api_routes = Router::new()
        .nest("/providers", provider_routes)
        .nest("/barrels", barrel_routes)
        .nest("/invoices", invoice_routes);

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
