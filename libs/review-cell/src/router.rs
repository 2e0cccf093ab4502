// libs/review-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Review routes, mounted under the clinics prefix. Reading is public,
/// writing and reporting need an authenticated user.
pub fn review_routes(state: Arc<AppConfig>) -> Router {
    let public_routes = Router::new().route(
        "/{clinic_id}/reviews",
        get(handlers::list_clinic_reviews),
    );

    let protected_routes = Router::new()
        .route("/{clinic_id}/reviews", post(handlers::create_review))
        .route("/{clinic_id}/reviews/{review_id}", put(handlers::update_review))
        .route(
            "/{clinic_id}/reviews/{review_id}/report",
            post(handlers::report_review),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// Report moderation routes, mounted under their own prefix. Admin only,
/// enforced in the service.
pub fn report_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/{report_id}/resolve", post(handlers::resolve_report))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
