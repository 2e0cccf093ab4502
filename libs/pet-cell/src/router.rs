// libs/pet-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

pub fn pet_routes(state: Arc<AppConfig>) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_pets))
        .route("/", post(handlers::create_pet))
        .route("/{pet_id}", get(handlers::get_pet))
        .route("/{pet_id}", delete(handlers::delete_pet))
        .route(
            "/{pet_id}/vaccinations",
            get(handlers::list_pet_vaccinations),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}

/// Vaccination writes live under their own prefix because a record spans a
/// pet and a clinic.
pub fn vaccination_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", post(handlers::create_vaccination))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
