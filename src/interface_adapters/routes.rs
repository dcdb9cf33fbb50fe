use crate::interface_adapters::adapter::{json, json_error};
use crate::interface_adapters::handlers::users::{create_user, get_user, list_users};
use crate::interface_adapters::state::AppState;
use axum::http::StatusCode;
use axum::response::Response;
use axum::{Router, routing::get};
use std::sync::Arc;

// Build the HTTP router for the user endpoints.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/users", get(json(list_users)).post(json(create_user)))
        .route("/users/{id}", get(json(get_user)))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "not found")
}
