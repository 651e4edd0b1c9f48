//! HTTP API server with observability for the storefront.
//!
//! Exposes the orchestrator's workflows — checkout, returns, refunds,
//! label generation — plus the admin catalog surface, with structured
//! logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use orchestrator::{
    FulfillmentPolicy, InMemoryLabelBroker, InMemoryPaymentGateway, Orchestrator, RecordingNotifier,
};
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/products", post(routes::products::create::<S>))
        .route("/products", get(routes::products::list::<S>))
        .route("/products/{id}", get(routes::products::get::<S>))
        .route("/orders", post(routes::orders::create::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", post(routes::orders::update_status::<S>))
        .route("/orders/{id}/label", post(routes::shipments::generate::<S>))
        .route(
            "/orders/{id}/shipments",
            get(routes::shipments::list_for_order::<S>),
        )
        .route("/returns", post(routes::returns::create::<S>))
        .route("/returns/{id}", get(routes::returns::get::<S>))
        .route(
            "/returns/{id}/status",
            post(routes::returns::update_status::<S>),
        )
        .route(
            "/returns/{id}/tracking",
            post(routes::returns::set_tracking::<S>),
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

/// Creates the default application state with in-memory adapters.
///
/// The adapter handles are returned alongside the state so tests can flip
/// their failure switches and inspect calls.
pub fn create_default_state<S: Store>(
    store: S,
    policy: FulfillmentPolicy,
) -> (
    Arc<AppState<S>>,
    InMemoryPaymentGateway,
    InMemoryLabelBroker,
    RecordingNotifier,
) {
    let payments = InMemoryPaymentGateway::new();
    let broker = InMemoryLabelBroker::new();
    let notifier = RecordingNotifier::new();

    let orchestrator = Orchestrator::new(
        store.clone(),
        payments.clone(),
        broker.clone(),
        notifier.clone(),
        policy,
    );

    let state = Arc::new(AppState {
        orchestrator,
        store,
    });

    (state, payments, broker, notifier)
}
