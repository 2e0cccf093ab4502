// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE SCHEDULING MODELS
// ==============================================================================

/// One bookable interval published by a clinic. Slots are never deleted;
/// the scheduler only toggles `is_booked` on reserve/release.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub is_booked: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub user_id: String,
    pub clinic_id: Uuid,
    pub pet_id: Uuid,
    pub service_id: Uuid,
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Confirmed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

// ==============================================================================
// REQUEST/QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointmentRequest {
    pub clinic_id: Uuid,
    pub pet_id: Uuid,
    pub service_id: Uuid,
    pub start_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub slot_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSlotRequest {
    pub start_utc: DateTime<Utc>,
    pub end_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlotQueryParams {
    pub from_utc: Option<DateTime<Utc>>,
    pub to_utc: Option<DateTime<Utc>>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulingError {
    #[error("Clinic not found")]
    ClinicNotFound,

    #[error("Pet not found")]
    PetNotFound,

    #[error("Service not found")]
    ServiceNotFound,

    #[error("Appointment not found")]
    NotFound,

    #[error("Pet does not belong to current user")]
    PetNotOwned,

    #[error("Clinic does not belong to current user")]
    ClinicNotOwned,

    #[error("No available slot for this time")]
    SlotUnavailable,

    #[error("Operation not valid for appointment status: {0}")]
    InvalidState(AppointmentStatus),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

// ==============================================================================
// SLOT SUPPLY DEFAULTS
// ==============================================================================

/// Default generation window: a rolling week starting tomorrow.
pub const SLOT_SUPPLY_DAYS: i64 = 7;

/// Fixed daily start hours (UTC) for generated one-hour slots.
pub const SLOT_SUPPLY_HOURS: [u32; 4] = [9, 11, 14, 16];

/// Duration of each generated slot.
pub const SLOT_SUPPLY_DURATION_HOURS: i64 = 1;
