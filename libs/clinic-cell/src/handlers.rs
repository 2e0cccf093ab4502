// libs/clinic-cell/src/handlers.rs
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
use shared_utils::jwt::validate_token;

use crate::models::{
    Clinic, ClinicError, ClinicQueryParams, ClinicService, CreateClinicRequest,
};
use crate::services::directory::ClinicDirectoryService;

fn map_clinic_error(e: ClinicError) -> AppError {
    match e {
        ClinicError::NotFound => AppError::NotFound(e.to_string()),
        ClinicError::Forbidden => AppError::Forbidden(e.to_string()),
        ClinicError::Validation(msg) => AppError::ValidationError(msg),
        ClinicError::Database(msg) => AppError::Database(msg),
    }
}

/// Directory reads are public but honor a bearer token when one is sent,
/// so admins can see unapproved clinics. Invalid tokens are treated as
/// anonymous rather than rejected.
fn optional_user(
    auth: &Option<TypedHeader<Authorization<Bearer>>>,
    config: &AppConfig,
) -> (Option<User>, Option<String>) {
    match auth {
        Some(TypedHeader(bearer)) => {
            let token = bearer.token().to_string();
            match validate_token(&token, &config.supabase_jwt_secret) {
                Ok(user) => (Some(user), Some(token)),
                Err(_) => (None, None),
            }
        }
        None => (None, None),
    }
}

#[axum::debug_handler]
pub async fn list_clinics(
    State(state): State<Arc<AppConfig>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    Query(params): Query<ClinicQueryParams>,
) -> Result<Json<Vec<Clinic>>, AppError> {
    let (user, token) = optional_user(&auth, &state);
    let directory = ClinicDirectoryService::new(&state);

    let clinics = directory
        .list_clinics(params.include_unapproved, user.as_ref(), token.as_deref())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(clinics))
}

#[axum::debug_handler]
pub async fn get_clinic(
    State(state): State<Arc<AppConfig>>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<Clinic>, AppError> {
    let (user, token) = optional_user(&auth, &state);
    let directory = ClinicDirectoryService::new(&state);

    let clinic = directory
        .get_clinic(clinic_id, user.as_ref(), token.as_deref())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(clinic))
}

#[axum::debug_handler]
pub async fn create_clinic(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateClinicRequest>,
) -> Result<(StatusCode, Json<Clinic>), AppError> {
    let directory = ClinicDirectoryService::new(&state);

    let clinic = directory
        .create_clinic(request, &user, auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok((StatusCode::CREATED, Json(clinic)))
}

#[axum::debug_handler]
pub async fn approve_clinic(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<Clinic>, AppError> {
    let directory = ClinicDirectoryService::new(&state);

    let clinic = directory
        .approve_clinic(clinic_id, &user, auth.token())
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(clinic))
}

#[axum::debug_handler]
pub async fn list_clinic_services(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<Vec<ClinicService>>, AppError> {
    let directory = ClinicDirectoryService::new(&state);

    let services = directory
        .list_services(clinic_id, None)
        .await
        .map_err(map_clinic_error)?;

    Ok(Json(services))
}
