// libs/review-cell/src/handlers.rs
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
    CreateReviewReportRequest, CreateReviewRequest, Review, ReviewError, ReviewReport,
    UpdateReviewRequest,
};
use crate::services::reviews::ReviewService;

fn map_review_error(e: ReviewError) -> AppError {
    match e {
        ReviewError::ClinicNotFound | ReviewError::NotFound | ReviewError::ReportNotFound => {
            AppError::NotFound(e.to_string())
        }
        ReviewError::Forbidden => AppError::Forbidden(e.to_string()),
        ReviewError::Validation(msg) => AppError::ValidationError(msg),
        ReviewError::Database(msg) => AppError::Database(msg),
    }
}

#[axum::debug_handler]
pub async fn list_clinic_reviews(
    State(state): State<Arc<AppConfig>>,
    Path(clinic_id): Path<Uuid>,
) -> Result<Json<Vec<Review>>, AppError> {
    let reviews = ReviewService::new(&state)
        .list_reviews(clinic_id, None)
        .await
        .map_err(map_review_error)?;

    Ok(Json(reviews))
}

#[axum::debug_handler]
pub async fn create_review(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(clinic_id): Path<Uuid>,
    Json(request): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let review = ReviewService::new(&state)
        .create_review(clinic_id, request, &user, auth.token())
        .await
        .map_err(map_review_error)?;

    Ok((StatusCode::CREATED, Json(review)))
}

#[axum::debug_handler]
pub async fn update_review(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((clinic_id, review_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateReviewRequest>,
) -> Result<Json<Review>, AppError> {
    let review = ReviewService::new(&state)
        .update_review(clinic_id, review_id, request, &user, auth.token())
        .await
        .map_err(map_review_error)?;

    Ok(Json(review))
}

#[axum::debug_handler]
pub async fn report_review(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path((clinic_id, review_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<CreateReviewReportRequest>,
) -> Result<StatusCode, AppError> {
    ReviewService::new(&state)
        .report_review(clinic_id, review_id, request, &user, auth.token())
        .await
        .map_err(map_review_error)?;

    Ok(StatusCode::OK)
}

#[axum::debug_handler]
pub async fn resolve_report(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(report_id): Path<Uuid>,
) -> Result<Json<ReviewReport>, AppError> {
    let report = ReviewService::new(&state)
        .resolve_report(report_id, &user, auth.token())
        .await
        .map_err(map_review_error)?;

    Ok(Json(report))
}
