// libs/clinic-cell/src/services/directory.rs
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;
use shared_utils::authz;

use crate::models::{Clinic, ClinicError, ClinicService, CreateClinicRequest};

/// Clinic directory: listing, registration and approval. Unapproved
/// clinics are invisible to everyone except admins.
pub struct ClinicDirectoryService {
    supabase: Arc<SupabaseClient>,
}

impl ClinicDirectoryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub async fn list_clinics(
        &self,
        include_unapproved: bool,
        requester: Option<&User>,
        auth_token: Option<&str>,
    ) -> Result<Vec<Clinic>, ClinicError> {
        let show_all = include_unapproved
            && requester.map(authz::is_admin).unwrap_or(false);

        let path = if show_all {
            "/rest/v1/clinics?order=name.asc".to_string()
        } else {
            "/rest/v1/clinics?is_approved=eq.true&order=name.asc".to_string()
        };

        self.supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))
    }

    pub async fn get_clinic(
        &self,
        clinic_id: Uuid,
        requester: Option<&User>,
        auth_token: Option<&str>,
    ) -> Result<Clinic, ClinicError> {
        let path = format!("/rest/v1/clinics?id=eq.{}", clinic_id);

        let clinics: Vec<Clinic> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        let clinic = clinics.into_iter().next().ok_or(ClinicError::NotFound)?;

        let is_admin = requester.map(authz::is_admin).unwrap_or(false);
        if !clinic.is_approved && !is_admin {
            return Err(ClinicError::NotFound);
        }

        Ok(clinic)
    }

    /// Registers a clinic for the requester. New clinics start unapproved
    /// and only become visible once an admin approves them.
    pub async fn create_clinic(
        &self,
        request: CreateClinicRequest,
        requester: &User,
        auth_token: &str,
    ) -> Result<Clinic, ClinicError> {
        if !authz::is_clinic_admin(requester) && !authz::is_admin(requester) {
            return Err(ClinicError::Forbidden);
        }

        let name = request.name.trim();
        if name.is_empty() {
            return Err(ClinicError::Validation("Clinic name is required".to_string()));
        }

        let clinic_id = Uuid::new_v4();
        let body = json!({
            "id": clinic_id,
            "name": name,
            "city": request.city.trim(),
            "address": request.address.trim(),
            "phone": request.phone.trim(),
            "description": request.description.trim(),
            "image_url": request.image_url.as_deref().map(str::trim).filter(|s| !s.is_empty()),
            "rating": 0.0,
            "is_approved": false,
            "owner_user_id": requester.id,
            "latitude": request.latitude,
            "longitude": request.longitude,
        });

        let mut rows = self
            .supabase
            .insert_returning("/rest/v1/clinics", Some(auth_token), body)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Err(ClinicError::Database(
                "Clinic insert returned no row".to_string(),
            ));
        }
        let clinic: Clinic = serde_json::from_value(rows.remove(0))
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        if !request.services.is_empty() {
            let services: Vec<Value> = request
                .services
                .iter()
                .map(|s| {
                    json!({
                        "id": Uuid::new_v4(),
                        "clinic_id": clinic_id,
                        "name": s.name.trim(),
                        "price": s.price,
                        "duration_minutes": s.duration_minutes,
                    })
                })
                .collect();

            self.supabase
                .insert_returning("/rest/v1/services", Some(auth_token), Value::Array(services))
                .await
                .map_err(|e| ClinicError::Database(e.to_string()))?;
        }

        info!("Registered clinic {} for user {}", clinic.id, requester.id);
        Ok(clinic)
    }

    pub async fn approve_clinic(
        &self,
        clinic_id: Uuid,
        requester: &User,
        auth_token: &str,
    ) -> Result<Clinic, ClinicError> {
        if !authz::is_admin(requester) {
            return Err(ClinicError::Forbidden);
        }

        let path = format!("/rest/v1/clinics?id=eq.{}", clinic_id);
        let mut rows = self
            .supabase
            .conditional_update(&path, Some(auth_token), json!({"is_approved": true}))
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Err(ClinicError::NotFound);
        }

        let clinic: Clinic = serde_json::from_value(rows.remove(0))
            .map_err(|e| ClinicError::Database(e.to_string()))?;

        info!("Approved clinic {}", clinic.id);
        Ok(clinic)
    }

    pub async fn list_services(
        &self,
        clinic_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Vec<ClinicService>, ClinicError> {
        let path = format!(
            "/rest/v1/services?clinic_id=eq.{}&order=name.asc",
            clinic_id
        );

        self.supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| ClinicError::Database(e.to_string()))
    }
}
