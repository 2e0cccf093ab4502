// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    Appointment, AvailabilitySlot, CreateAppointmentRequest, CreateSlotRequest,
    RescheduleAppointmentRequest, SchedulingError, SlotQueryParams,
};
use crate::services::scheduling::SchedulingService;
use crate::services::slots::SlotSupplyService;

fn map_scheduling_error(e: SchedulingError) -> AppError {
    match e {
        SchedulingError::ClinicNotFound
        | SchedulingError::PetNotFound
        | SchedulingError::ServiceNotFound
        | SchedulingError::NotFound => AppError::NotFound(e.to_string()),
        SchedulingError::PetNotOwned | SchedulingError::ClinicNotOwned => {
            AppError::Forbidden(e.to_string())
        }
        SchedulingError::SlotUnavailable | SchedulingError::InvalidState(_) => {
            AppError::BadRequest(e.to_string())
        }
        SchedulingError::Validation(msg) => AppError::ValidationError(msg),
        SchedulingError::Database(msg) => AppError::Database(msg),
    }
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let scheduler = SchedulingService::new(&state);

    let appointment = scheduler
        .create_appointment(request, &user, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let scheduler = SchedulingService::new(&state);

    let appointments = scheduler
        .list_appointments(&user, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let scheduler = SchedulingService::new(&state);

    let appointment = scheduler
        .get_appointment(appointment_id, &user, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let scheduler = SchedulingService::new(&state);

    let appointment = scheduler
        .cancel_appointment(appointment_id, &user, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let scheduler = SchedulingService::new(&state);

    let appointment = scheduler
        .reschedule_appointment(appointment_id, request, &user, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(appointment))
}

// ==============================================================================
// SLOT HANDLERS
// ==============================================================================

/// Public slot listing. Reads go through the anon key; authenticated
/// callers are not treated differently.
#[axum::debug_handler]
pub async fn get_clinic_slots(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
    Query(params): Query<SlotQueryParams>,
) -> Result<Json<Vec<AvailabilitySlot>>, AppError> {
    let supply = SlotSupplyService::new(&state);

    let slots = supply
        .list_slots(clinic_id, params.from_utc, params.to_utc, None)
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(slots))
}

#[axum::debug_handler]
pub async fn create_clinic_slot(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(clinic_id): Path<Uuid>,
    Json(request): Json<CreateSlotRequest>,
) -> Result<Json<AvailabilitySlot>, AppError> {
    let supply = SlotSupplyService::new(&state);

    let slot = supply
        .create_slot(clinic_id, request, &user, auth.token())
        .await
        .map_err(map_scheduling_error)?;

    Ok(Json(slot))
}
