// libs/pet-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pet {
    pub id: Uuid,
    pub owner_user_id: Option<String>,
    pub owner_name: String,
    pub owner_email: Option<String>,
    pub name: String,
    pub species: String,
    pub age: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePetRequest {
    pub owner_name: String,
    pub name: String,
    pub species: String,
    pub age: i64,
}

/// One vaccination administered at a clinic, kept on the pet's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaccinationRecord {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub clinic_id: Uuid,
    pub vaccine_name: String,
    pub administered_utc: DateTime<Utc>,
    pub next_due_utc: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateVaccinationRecordRequest {
    pub pet_id: Uuid,
    pub clinic_id: Uuid,
    pub vaccine_name: String,
    pub administered_utc: DateTime<Utc>,
    pub next_due_utc: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum PetError {
    #[error("Pet not found")]
    NotFound,

    #[error("Clinic not found")]
    ClinicNotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}
