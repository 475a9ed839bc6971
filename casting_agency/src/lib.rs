//! The Casting Agency API
//!
//! A small catalog of movies and actors. Every route under `/api` requires a
//! bearer token issued by the configured identity provider that grants the
//! route's permission:
//!
//! | route | `GET` | `POST` | `PATCH` | `DELETE` |
//! |---|---|---|---|---|
//! | `/api/actors` | `get:actors` | `post:actor` | | |
//! | `/api/actors/:id` | `get:actors` | | `patch:actor` | `delete:actor` |
//! | `/api/movies` | `get:movies` | `post:movie` | | |
//! | `/api/movies/:id` | `get:movies` | | `patch:movie` | `delete:movie` |
//!
//! `GET /` is an unauthenticated health check.

#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    missing_copy_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

use std::sync::Arc;

use axum::{
    http::{header, Method},
    Extension, Router,
};
use casting_auth::Authorizer;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod model;
pub mod repository;
mod routes;

pub use routes::AppState;

use repository::Repository;

/// Builds the service router
///
/// Protected routes are checked by `authorizer` before the repository is
/// touched.
pub fn app(repository: Arc<dyn Repository>, authorizer: Authorizer) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE]);

    routes::router()
        .with_state(AppState::new(repository))
        .layer(Extension(authorizer))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
