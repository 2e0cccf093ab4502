// libs/clinic-cell/src/models.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clinic {
    pub id: Uuid,
    pub name: String,
    pub city: String,
    pub address: String,
    pub phone: String,
    pub description: String,
    pub image_url: Option<String>,
    /// Rolling average of visible review ratings, two decimals.
    pub rating: f64,
    pub is_approved: bool,
    pub owner_user_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicService {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub name: String,
    pub price: f64,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClinicRequest {
    pub name: String,
    pub city: String,
    pub address: String,
    pub phone: String,
    pub description: String,
    pub image_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(default)]
    pub services: Vec<CreateServiceRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateServiceRequest {
    pub name: String,
    pub price: f64,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClinicQueryParams {
    #[serde(default)]
    pub include_unapproved: bool,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClinicError {
    #[error("Clinic not found")]
    NotFound,

    #[error("Not allowed to manage this clinic")]
    Forbidden,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}
