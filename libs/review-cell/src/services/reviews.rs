// libs/review-cell/src/services/reviews.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;
use shared_utils::authz::{self, Role};

use crate::models::{
    CreateReviewReportRequest, CreateReviewRequest, Review, ReviewError, ReviewReport,
    ReviewReportStatus, UpdateReviewRequest, REMOVED_PLACEHOLDER,
};
use crate::services::moderation::{GeminiModeration, ReviewModeration};

const DEFAULT_REMOVAL_REASON: &str = "Abusive content";

/// Clinic reviews with moderation and rating aggregation. The clinic's
/// rating is recomputed from every review of the clinic on each write,
/// removed reviews included.
pub struct ReviewService {
    supabase: Arc<SupabaseClient>,
    moderation: Arc<dyn ReviewModeration>,
}

impl ReviewService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            moderation: Arc::new(GeminiModeration::new(config)),
        }
    }

    pub fn with_moderation(config: &AppConfig, moderation: Arc<dyn ReviewModeration>) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            moderation,
        }
    }

    /// Lists a clinic's reviews newest first. Removed reviews keep their
    /// rating but show a placeholder comment.
    pub async fn list_reviews(
        &self,
        clinic_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<Review>, ReviewError> {
        let path = format!(
            "/rest/v1/reviews?clinic_id=eq.{}&order=created_at_utc.desc",
            clinic_id
        );

        let mut reviews: Vec<Review> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        for review in &mut reviews {
            if review.is_removed {
                review.comment = REMOVED_PLACEHOLDER.to_string();
            }
        }

        Ok(reviews)
    }

    pub async fn create_review(
        &self,
        clinic_id: Uuid,
        request: CreateReviewRequest,
        requester: &User,
        auth_token: &str,
    ) -> Result<Review, ReviewError> {
        validate_rating(request.rating)?;

        if Role::from_user(requester) == Role::ClinicAdmin {
            return Err(ReviewError::Forbidden);
        }

        self.assert_clinic_exists(clinic_id, auth_token).await?;

        let comment = request.comment.unwrap_or_default().trim().to_string();
        let verdict = self.moderation.moderate(&comment).await;

        let mut body = json!({
            "id": Uuid::new_v4(),
            "clinic_id": clinic_id,
            "user_id": requester.id,
            "rating": request.rating,
            "comment": comment,
            "created_at_utc": Utc::now().to_rfc3339(),
            "is_removed": false,
        });

        if verdict.blocked {
            body["is_removed"] = json!(true);
            body["removed_reason"] =
                json!(verdict.reason.unwrap_or_else(|| DEFAULT_REMOVAL_REASON.to_string()));
            body["original_comment"] = body["comment"].clone();
            body["comment"] = json!(REMOVED_PLACEHOLDER);
            body["moderated_at_utc"] = json!(Utc::now().to_rfc3339());
        }

        let mut rows = self
            .supabase
            .insert_returning("/rest/v1/reviews", Some(auth_token), body)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Err(ReviewError::Database(
                "Review insert returned no row".to_string(),
            ));
        }
        let review: Review = serde_json::from_value(rows.remove(0))
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        self.recompute_clinic_rating(clinic_id, auth_token).await?;

        info!("Created review {} for clinic {}", review.id, clinic_id);
        Ok(review)
    }

    pub async fn update_review(
        &self,
        clinic_id: Uuid,
        review_id: Uuid,
        request: UpdateReviewRequest,
        requester: &User,
        auth_token: &str,
    ) -> Result<Review, ReviewError> {
        validate_rating(request.rating)?;

        let existing = self.fetch_review(clinic_id, review_id, auth_token).await?;
        if !authz::can_access(requester, Some(existing.user_id.as_str())) {
            return Err(ReviewError::Forbidden);
        }

        let comment = request.comment.unwrap_or_default().trim().to_string();
        let verdict = self.moderation.moderate(&comment).await;

        let body = if verdict.blocked {
            json!({
                "rating": request.rating,
                "comment": REMOVED_PLACEHOLDER,
                "is_removed": true,
                "removed_reason": verdict.reason.unwrap_or_else(|| DEFAULT_REMOVAL_REASON.to_string()),
                "original_comment": comment,
                "moderated_at_utc": Utc::now().to_rfc3339(),
            })
        } else {
            // A clean edit reinstates a previously removed review
            json!({
                "rating": request.rating,
                "comment": comment,
                "is_removed": false,
                "removed_reason": null,
                "moderated_at_utc": Utc::now().to_rfc3339(),
            })
        };

        let path = format!(
            "/rest/v1/reviews?id=eq.{}&clinic_id=eq.{}",
            review_id, clinic_id
        );
        let mut rows = self
            .supabase
            .conditional_update(&path, Some(auth_token), body)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Err(ReviewError::NotFound);
        }
        let review: Review = serde_json::from_value(rows.remove(0))
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        self.recompute_clinic_rating(clinic_id, auth_token).await?;

        Ok(review)
    }

    /// Files a report against a review. A second report from the same
    /// user while one is still pending is accepted silently.
    pub async fn report_review(
        &self,
        clinic_id: Uuid,
        review_id: Uuid,
        request: CreateReviewReportRequest,
        requester: &User,
        auth_token: &str,
    ) -> Result<(), ReviewError> {
        self.fetch_review(clinic_id, review_id, auth_token).await?;

        let pending_path = format!(
            "/rest/v1/review_reports?review_id=eq.{}&reporter_user_id=eq.{}&status=eq.pending",
            review_id, requester.id
        );
        let pending: Vec<Value> = self
            .supabase
            .request(Method::GET, &pending_path, Some(auth_token), None)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        if !pending.is_empty() {
            return Ok(());
        }

        let body = json!({
            "id": Uuid::new_v4(),
            "review_id": review_id,
            "reporter_user_id": requester.id,
            "reason": request.reason.unwrap_or_default().trim(),
            "status": ReviewReportStatus::Pending,
            "created_at_utc": Utc::now().to_rfc3339(),
        });

        self.supabase
            .insert_returning("/rest/v1/review_reports", Some(auth_token), body)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        info!("Review {} reported by {}", review_id, requester.id);
        Ok(())
    }

    /// Marks a report handled. Admin only; the report keeps its reporter
    /// and reason for audit.
    pub async fn resolve_report(
        &self,
        report_id: Uuid,
        requester: &User,
        auth_token: &str,
    ) -> Result<ReviewReport, ReviewError> {
        if !authz::is_admin(requester) {
            return Err(ReviewError::Forbidden);
        }

        let path = format!("/rest/v1/review_reports?id=eq.{}", report_id);
        let mut rows = self
            .supabase
            .conditional_update(
                &path,
                Some(auth_token),
                json!({"status": ReviewReportStatus::Resolved}),
            )
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Err(ReviewError::ReportNotFound);
        }

        let report: ReviewReport = serde_json::from_value(rows.remove(0))
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        info!("Report {} resolved by {}", report.id, requester.id);
        Ok(report)
    }

    async fn fetch_review(
        &self,
        clinic_id: Uuid,
        review_id: Uuid,
        auth_token: &str,
    ) -> Result<Review, ReviewError> {
        let path = format!(
            "/rest/v1/reviews?id=eq.{}&clinic_id=eq.{}",
            review_id, clinic_id
        );

        let reviews: Vec<Review> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        reviews.into_iter().next().ok_or(ReviewError::NotFound)
    }

    async fn assert_clinic_exists(
        &self,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ReviewError> {
        let path = format!("/rest/v1/clinics?id=eq.{}&select=id", clinic_id);

        let clinics: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        if clinics.is_empty() {
            return Err(ReviewError::ClinicNotFound);
        }
        Ok(())
    }

    /// Full recomputation over every rating the clinic has, so the stored
    /// average can never drift from the review table.
    async fn recompute_clinic_rating(
        &self,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<(), ReviewError> {
        let path = format!("/rest/v1/reviews?clinic_id=eq.{}&select=rating", clinic_id);

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        let ratings: Vec<i64> = rows.iter().filter_map(|r| r["rating"].as_i64()).collect();
        let average = mean_rating(&ratings);

        let clinic_path = format!("/rest/v1/clinics?id=eq.{}", clinic_id);
        self.supabase
            .conditional_update(&clinic_path, Some(auth_token), json!({"rating": average}))
            .await
            .map_err(|e| ReviewError::Database(e.to_string()))?;

        Ok(())
    }
}

fn validate_rating(rating: i32) -> Result<(), ReviewError> {
    if !(1..=5).contains(&rating) {
        return Err(ReviewError::Validation(
            "Rating must be between 1 and 5".to_string(),
        ));
    }
    Ok(())
}

/// Mean rating rounded to two decimals; 0.0 for a clinic with no reviews.
fn mean_rating(ratings: &[i64]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().sum();
    let avg = sum as f64 / ratings.len() as f64;
    (avg * 100.0).round() / 100.0
}
