//! HTTP front end for the cross-dock allocation engine.
//!
//! Exposes receiving, allocation, the decision journal, the exception
//! queue and shipment loading as REST endpoints, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use engine::{CrossDock, EngineConfig, EngineError, Repositories};
use metrics_exporter_prometheus::PrometheusHandle;
use repository::InMemoryRepositories;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/skus", post(routes::catalog::upsert_sku))
        .route("/demands", post(routes::catalog::create_demand))
        .route("/inventory", post(routes::catalog::upsert_inventory))
        .route("/capacity", post(routes::catalog::register_capacity))
        .route("/receipts", post(routes::lots::receive))
        .route("/lots/{id}", get(routes::lots::get))
        .route("/lots/{id}/allocate", post(routes::lots::allocate))
        .route("/lots/{id}/cancel", post(routes::lots::cancel))
        .route("/lots/{id}/decisions", get(routes::lots::decisions))
        .route("/decisions/{id}/reverse", post(routes::lots::reverse))
        .route("/summary", get(routes::lots::summary))
        .route("/exceptions", get(routes::exceptions::list))
        .route("/exceptions/{id}", get(routes::exceptions::get))
        .route("/exceptions/{id}/resolve", post(routes::exceptions::resolve))
        .route("/shipments", post(routes::shipments::create))
        .route("/shipments/{id}", get(routes::shipments::get))
        .route("/shipments/{id}/loading", post(routes::shipments::start_loading))
        .route("/shipments/{id}/scan", post(routes::shipments::scan))
        .route("/shipments/{id}/depart", post(routes::shipments::depart))
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

/// Creates application state backed by empty in-memory repositories.
pub fn create_default_state(config: EngineConfig) -> Result<Arc<AppState>, EngineError> {
    let repos = InMemoryRepositories::new();
    let dock = CrossDock::new(Repositories::from(&repos), config)?;
    Ok(Arc::new(AppState::new(dock)))
}
