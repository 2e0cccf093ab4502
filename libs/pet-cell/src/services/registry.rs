// libs/pet-cell/src/services/registry.rs
use reqwest::Method;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;
use shared_utils::authz::{self, Role};

use crate::models::{CreatePetRequest, Pet, PetError};

/// Pet records, scoped to their owner. Pets belonging to other users are
/// reported as missing, never as forbidden.
pub struct PetRegistryService {
    supabase: Arc<SupabaseClient>,
}

impl PetRegistryService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    pub async fn list_pets(
        &self,
        requester: &User,
        auth_token: &str,
    ) -> Result<Vec<Pet>, PetError> {
        let path = if authz::is_admin(requester) {
            "/rest/v1/pets?order=name.asc".to_string()
        } else {
            format!("/rest/v1/pets?owner_user_id=eq.{}&order=name.asc", requester.id)
        };

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PetError::Database(e.to_string()))
    }

    pub async fn get_pet(
        &self,
        pet_id: Uuid,
        requester: &User,
        auth_token: &str,
    ) -> Result<Pet, PetError> {
        let path = format!("/rest/v1/pets?id=eq.{}", pet_id);

        let pets: Vec<Pet> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| PetError::Database(e.to_string()))?;

        let pet = pets.into_iter().next().ok_or(PetError::NotFound)?;

        if !authz::can_access(requester, pet.owner_user_id.as_deref()) {
            return Err(PetError::NotFound);
        }

        Ok(pet)
    }

    pub async fn create_pet(
        &self,
        request: CreatePetRequest,
        requester: &User,
        auth_token: &str,
    ) -> Result<Pet, PetError> {
        if Role::from_user(requester) != Role::User {
            return Err(PetError::Forbidden(
                "Only pet owner accounts can register pets".to_string(),
            ));
        }

        let name = request.name.trim();
        if name.is_empty() {
            return Err(PetError::Validation("Pet name is required".to_string()));
        }

        let body = json!({
            "id": Uuid::new_v4(),
            "owner_user_id": requester.id,
            "owner_name": request.owner_name.trim(),
            "owner_email": requester.email,
            "name": name,
            "species": request.species.trim(),
            "age": request.age,
        });

        let mut rows = self
            .supabase
            .insert_returning("/rest/v1/pets", Some(auth_token), body)
            .await
            .map_err(|e| PetError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Err(PetError::Database("Pet insert returned no row".to_string()));
        }

        let pet: Pet = serde_json::from_value(rows.remove(0))
            .map_err(|e| PetError::Database(e.to_string()))?;

        info!("Registered pet {} for user {}", pet.id, requester.id);
        Ok(pet)
    }

    pub async fn delete_pet(
        &self,
        pet_id: Uuid,
        requester: &User,
        auth_token: &str,
    ) -> Result<(), PetError> {
        // Visibility check first so deletes leak nothing either
        self.get_pet(pet_id, requester, auth_token).await?;

        let path = format!("/rest/v1/pets?id=eq.{}", pet_id);
        let deleted = self
            .supabase
            .delete_returning(&path, Some(auth_token))
            .await
            .map_err(|e| PetError::Database(e.to_string()))?;

        if deleted.is_empty() {
            return Err(PetError::NotFound);
        }

        info!("Deleted pet {}", pet_id);
        Ok(())
    }
}
