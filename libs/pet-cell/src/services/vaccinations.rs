// libs/pet-cell/src/services/vaccinations.rs
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;
use shared_utils::authz;

use crate::models::{CreateVaccinationRecordRequest, PetError, VaccinationRecord};

/// Vaccination history: written by clinic staff, read by the pet's owner.
pub struct VaccinationService {
    supabase: Arc<SupabaseClient>,
}

impl VaccinationService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    /// Lists a pet's vaccinations, most recent first. Pets belonging to
    /// other users are reported as missing, as everywhere in this cell.
    pub async fn list_for_pet(
        &self,
        pet_id: Uuid,
        requester: &User,
        auth_token: &str,
    ) -> Result<Vec<VaccinationRecord>, PetError> {
        let pet = self.fetch_pet(pet_id, auth_token).await?;
        if !authz::can_access(requester, pet["owner_user_id"].as_str()) {
            return Err(PetError::NotFound);
        }

        let path = format!(
            "/rest/v1/vaccination_records?pet_id=eq.{}&order=administered_utc.desc",
            pet_id
        );

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PetError::Database(e.to_string()))
    }

    /// Records a vaccination. Clinic staff only; a non-admin requester
    /// must own the administering clinic.
    pub async fn create_record(
        &self,
        request: CreateVaccinationRecordRequest,
        requester: &User,
        auth_token: &str,
    ) -> Result<VaccinationRecord, PetError> {
        if !authz::is_clinic_admin(requester) && !authz::is_admin(requester) {
            return Err(PetError::Forbidden(
                "Only clinic staff can record vaccinations".to_string(),
            ));
        }

        let vaccine_name = request.vaccine_name.trim();
        if vaccine_name.is_empty() {
            return Err(PetError::Validation(
                "Vaccine name is required".to_string(),
            ));
        }

        self.fetch_pet(request.pet_id, auth_token).await?;

        let clinic = self.fetch_clinic(request.clinic_id, auth_token).await?;
        if !authz::can_access(requester, clinic["owner_user_id"].as_str()) {
            return Err(PetError::Forbidden(
                "Vaccinations can only be recorded for your own clinic".to_string(),
            ));
        }

        let notes = request
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());

        let body = json!({
            "id": Uuid::new_v4(),
            "pet_id": request.pet_id,
            "clinic_id": request.clinic_id,
            "vaccine_name": vaccine_name,
            "administered_utc": request.administered_utc.to_rfc3339(),
            "next_due_utc": request.next_due_utc.map(|d| d.to_rfc3339()),
            "notes": notes,
            "created_utc": Utc::now().to_rfc3339(),
        });

        let mut rows = self
            .supabase
            .insert_returning("/rest/v1/vaccination_records", Some(auth_token), body)
            .await
            .map_err(|e| PetError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Err(PetError::Database(
                "Vaccination insert returned no row".to_string(),
            ));
        }

        let record: VaccinationRecord = serde_json::from_value(rows.remove(0))
            .map_err(|e| PetError::Database(e.to_string()))?;

        info!(
            "Recorded vaccination {} for pet {} at clinic {}",
            record.id, record.pet_id, record.clinic_id
        );
        Ok(record)
    }

    async fn fetch_pet(&self, pet_id: Uuid, auth_token: &str) -> Result<Value, PetError> {
        let path = format!("/rest/v1/pets?id=eq.{}", pet_id);

        let mut pets: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PetError::Database(e.to_string()))?;

        if pets.is_empty() {
            return Err(PetError::NotFound);
        }
        Ok(pets.remove(0))
    }

    async fn fetch_clinic(&self, clinic_id: Uuid, auth_token: &str) -> Result<Value, PetError> {
        let path = format!("/rest/v1/clinics?id=eq.{}", clinic_id);

        let mut clinics: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PetError::Database(e.to_string()))?;

        if clinics.is_empty() {
            return Err(PetError::ClinicNotFound);
        }
        Ok(clinics.remove(0))
    }
}
