// libs/review-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Comment shown in place of removed review text.
pub const REMOVED_PLACEHOLDER: &str = "This review was removed for abusive content.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub clinic_id: Uuid,
    pub user_id: String,
    pub rating: i32,
    pub comment: String,
    pub created_at_utc: DateTime<Utc>,
    pub is_removed: bool,
    pub removed_reason: Option<String>,
    /// Kept for audit when moderation removes the comment; never served
    /// to readers.
    #[serde(skip_serializing)]
    pub original_comment: Option<String>,
    pub moderated_at_utc: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewReport {
    pub id: Uuid,
    pub review_id: Uuid,
    pub reporter_user_id: String,
    pub reason: String,
    pub status: ReviewReportStatus,
    pub created_at_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewReportStatus {
    Pending,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewRequest {
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateReviewRequest {
    pub rating: i32,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReviewReportRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ReviewError {
    #[error("Clinic not found")]
    ClinicNotFound,

    #[error("Review not found")]
    NotFound,

    #[error("Report not found")]
    ReportNotFound,

    #[error("Not allowed to modify this review")]
    Forbidden,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}
