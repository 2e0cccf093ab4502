// libs/pet-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
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
    CreatePetRequest, CreateVaccinationRecordRequest, Pet, PetError, VaccinationRecord,
};
use crate::services::registry::PetRegistryService;
use crate::services::vaccinations::VaccinationService;

fn map_pet_error(e: PetError) -> AppError {
    match e {
        PetError::NotFound | PetError::ClinicNotFound => AppError::NotFound(e.to_string()),
        PetError::Forbidden(msg) => AppError::Forbidden(msg),
        PetError::Validation(msg) => AppError::ValidationError(msg),
        PetError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_pets(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Pet>>, AppError> {
    let registry = PetRegistryService::new(&state);

    let pets = registry
        .list_pets(&user, auth.token())
        .await
        .map_err(map_pet_error)?;

    Ok(Json(pets))
}

#[axum::debug_handler]
pub async fn get_pet(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(pet_id): Path<Uuid>,
) -> Result<Json<Pet>, AppError> {
    let registry = PetRegistryService::new(&state);

    let pet = registry
        .get_pet(pet_id, &user, auth.token())
        .await
        .map_err(map_pet_error)?;

    Ok(Json(pet))
}

#[axum::debug_handler]
pub async fn create_pet(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreatePetRequest>,
) -> Result<(StatusCode, Json<Pet>), AppError> {
    let registry = PetRegistryService::new(&state);

    let pet = registry
        .create_pet(request, &user, auth.token())
        .await
        .map_err(map_pet_error)?;

    Ok((StatusCode::CREATED, Json(pet)))
}

#[axum::debug_handler]
pub async fn delete_pet(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(pet_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let registry = PetRegistryService::new(&state);

    registry
        .delete_pet(pet_id, &user, auth.token())
        .await
        .map_err(map_pet_error)?;

    Ok(StatusCode::NO_CONTENT)
}

#[axum::debug_handler]
pub async fn list_pet_vaccinations(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(pet_id): Path<Uuid>,
) -> Result<Json<Vec<VaccinationRecord>>, AppError> {
    let records = VaccinationService::new(&state)
        .list_for_pet(pet_id, &user, auth.token())
        .await
        .map_err(map_pet_error)?;

    Ok(Json(records))
}

#[axum::debug_handler]
pub async fn create_vaccination(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateVaccinationRecordRequest>,
) -> Result<Json<VaccinationRecord>, AppError> {
    let record = VaccinationService::new(&state)
        .create_record(request, &user, auth.token())
        .await
        .map_err(map_pet_error)?;

    Ok(Json(record))
}
