pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;


use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use handlers::{AppState, auth, reference, report, shipment, user};

/// Every route of the service behind request tracing
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route(
            "/shipments",
            post(shipment::create_batch).get(shipment::list_shipments),
        )
        .route("/shipments/export", get(shipment::export_shipments))
        .route(
            "/shipments/{id}",
            get(shipment::get_shipment)
                .put(shipment::update_shipment)
                .delete(shipment::delete_shipment),
        )
        .route("/batches/{batch_id}/message", get(shipment::batch_message))
        .route("/reports/drivers", get(report::by_driver))
        .route("/reports/objects", get(report::by_object))
        .route("/reports/grades", get(report::by_grade))
        .route("/reports/daily", get(report::by_day))
        .route("/reports/loads", get(report::by_object_grade))
        .route(
            "/references/{kind}",
            get(reference::list_references).post(reference::add_reference),
        )
        .route("/references/{kind}/{name}", delete(reference::remove_reference))
        .route("/users", get(user::list_users).post(user::create_user))
        .route("/users/{username}", delete(user::delete_user));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
