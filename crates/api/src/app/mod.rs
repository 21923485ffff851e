//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: stores and the auth use case behind the handlers
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower::ServiceBuilder;

use lorecraft_auth::AuthenticationGate;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, build_services};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: AppServices) -> Router {
    let auth_state = middleware::AuthState {
        gate: AuthenticationGate::new(services.tokens.clone()),
    };
    let services = Arc::new(services);

    // Protected routes: a verified token is required.
    let protected = routes::router()
        .layer(Extension(services.clone()))
        .route_layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    let public = Router::new()
        .route("/health", get(routes::system::health))
        .route("/auth/register", post(routes::auth::register))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/logout", post(routes::auth::logout))
        .layer(Extension(services));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(ServiceBuilder::new())
}
