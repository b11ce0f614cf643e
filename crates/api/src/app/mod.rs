//! HTTP API application wiring (Axum router + store wiring).
//!
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request DTOs and query-string models
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use tillpoint_auth::Hs256JwtValidator;
use tillpoint_infra::{CheckoutCoordinator, InMemoryRetailStore, PostgresRetailStore, RetailStore};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;

/// Shared per-process services handed to every handler.
pub struct AppServices {
    pub store: Arc<dyn RetailStore>,
    pub coordinator: CheckoutCoordinator,
}

impl AppServices {
    pub fn new(store: Arc<dyn RetailStore>) -> Self {
        Self {
            coordinator: CheckoutCoordinator::new(store.clone()),
            store,
        }
    }
}

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub async fn build_app(jwt_secret: String) -> Router {
    build_app_with_store(jwt_secret, build_store().await)
}

/// Router over an explicit store; tests use this to seed data directly.
pub fn build_app_with_store(jwt_secret: String, store: Arc<dyn RetailStore>) -> Router {
    let jwt = Arc::new(Hs256JwtValidator::new(jwt_secret.into_bytes()));
    let auth_state = middleware::AuthState { jwt };

    let services = Arc::new(AppServices::new(store));

    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}

async fn build_store() -> Arc<dyn RetailStore> {
    let persistent = std::env::var("USE_PERSISTENT_STORES")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if persistent {
        let url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES is enabled");
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&url)
            .await
            .expect("failed to connect to database");
        tracing::info!("using postgres retail store");
        Arc::new(PostgresRetailStore::new(pool))
    } else {
        tracing::warn!("using in-memory retail store; data will not survive a restart");
        Arc::new(InMemoryRetailStore::new())
    }
}
