use std::sync::Arc;

use axum::{routing::get, Router};

use clinic_cell::router::clinic_routes;
use pet_cell::router::{pet_routes, vaccination_routes};
use review_cell::router::{report_routes, review_routes};
use scheduling_cell::router::{appointment_routes, slot_routes};
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    // Slot and review routes live under the clinics prefix next to the
    // directory routes
    let clinics = clinic_routes(state.clone())
        .merge(slot_routes(state.clone()))
        .merge(review_routes(state.clone()));

    Router::new()
        .route("/", get(|| async { "VetBook API is running!" }))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/clinics", clinics)
        .nest("/pets", pet_routes(state.clone()))
        .nest("/vaccinations", vaccination_routes(state.clone()))
        .nest("/reports", report_routes(state))
}
