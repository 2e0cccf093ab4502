// libs/scheduling-cell/src/services/slots.rs
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;
use shared_utils::authz;

use crate::models::{
    AvailabilitySlot, CreateSlotRequest, SchedulingError, SLOT_SUPPLY_DAYS,
    SLOT_SUPPLY_DURATION_HOURS, SLOT_SUPPLY_HOURS,
};

/// Keeps clinics stocked with bookable slots and serves slot reads.
pub struct SlotSupplyService {
    supabase: Arc<SupabaseClient>,
}

impl SlotSupplyService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    /// Tops up a clinic's slot inventory when it has no future availability.
    /// Returns the number of slots created (zero when inventory exists).
    ///
    /// Generation never duplicates: candidate starts already present in the
    /// window are skipped, so concurrent or repeated calls converge on the
    /// same inventory.
    pub async fn ensure_upcoming_slots(
        &self,
        clinic_id: Uuid,
        now: DateTime<Utc>,
        auth_token: Option<&str>,
    ) -> Result<usize, SchedulingError> {
        let path = format!(
            "/rest/v1/availability_slots?clinic_id=eq.{}&end_utc=gt.{}&limit=1",
            clinic_id,
            urlencoding::encode(&now.to_rfc3339())
        );

        let future_slots: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        if !future_slots.is_empty() {
            return Ok(0);
        }

        let window_start = window_start(now);
        let window_end = window_start + ChronoDuration::days(SLOT_SUPPLY_DAYS);

        let existing_path = format!(
            "/rest/v1/availability_slots?clinic_id=eq.{}&start_utc=gte.{}&start_utc=lt.{}&select=start_utc",
            clinic_id,
            urlencoding::encode(&window_start.to_rfc3339()),
            urlencoding::encode(&window_end.to_rfc3339())
        );

        let existing: Vec<Value> = self
            .supabase
            .request(Method::GET, &existing_path, auth_token, None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let taken: HashSet<DateTime<Utc>> = existing
            .iter()
            .filter_map(|row| row["start_utc"].as_str())
            .filter_map(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .collect();

        let rows: Vec<Value> = default_slot_intervals(window_start)
            .into_iter()
            .filter(|(start, _)| !taken.contains(start))
            .map(|(start, end)| {
                json!({
                    "id": Uuid::new_v4(),
                    "clinic_id": clinic_id,
                    "start_utc": start.to_rfc3339(),
                    "end_utc": end.to_rfc3339(),
                    "is_booked": false,
                })
            })
            .collect();

        if rows.is_empty() {
            return Ok(0);
        }

        let created = rows.len();
        self.supabase
            .insert_returning("/rest/v1/availability_slots", auth_token, Value::Array(rows))
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        info!("Generated {} slots for clinic {}", created, clinic_id);
        Ok(created)
    }

    /// Lists a clinic's slots overlapping the requested window, generating
    /// default inventory first if the clinic has none in the future.
    pub async fn list_slots(
        &self,
        clinic_id: Uuid,
        from_utc: Option<DateTime<Utc>>,
        to_utc: Option<DateTime<Utc>>,
        auth_token: Option<&str>,
    ) -> Result<Vec<AvailabilitySlot>, SchedulingError> {
        self.assert_clinic_exists(clinic_id, auth_token).await?;

        let now = Utc::now();
        self.ensure_upcoming_slots(clinic_id, now, auth_token).await?;

        let from = from_utc.unwrap_or(now);
        let to = to_utc.unwrap_or(from + ChronoDuration::days(SLOT_SUPPLY_DAYS));

        let path = format!(
            "/rest/v1/availability_slots?clinic_id=eq.{}&end_utc=gt.{}&start_utc=lt.{}&order=start_utc.asc",
            clinic_id,
            urlencoding::encode(&from.to_rfc3339()),
            urlencoding::encode(&to.to_rfc3339())
        );

        let slots: Vec<AvailabilitySlot> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        debug!("Found {} slots for clinic {}", slots.len(), clinic_id);
        Ok(slots)
    }

    /// Publishes one slot by hand. Restricted to the clinic owner or an
    /// admin; generated and manual slots are indistinguishable afterwards.
    pub async fn create_slot(
        &self,
        clinic_id: Uuid,
        request: CreateSlotRequest,
        requester: &User,
        auth_token: &str,
    ) -> Result<AvailabilitySlot, SchedulingError> {
        if request.end_utc <= request.start_utc {
            return Err(SchedulingError::Validation(
                "Slot end must be after start".to_string(),
            ));
        }

        let clinic = self.fetch_clinic(clinic_id, Some(auth_token)).await?;
        let owner_id = clinic["owner_user_id"].as_str();
        if !authz::can_access(requester, owner_id) {
            return Err(SchedulingError::ClinicNotOwned);
        }

        let body = json!({
            "id": Uuid::new_v4(),
            "clinic_id": clinic_id,
            "start_utc": request.start_utc.to_rfc3339(),
            "end_utc": request.end_utc.to_rfc3339(),
            "is_booked": false,
        });

        let mut rows = self
            .supabase
            .insert_returning("/rest/v1/availability_slots", Some(auth_token), body)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        if rows.is_empty() {
            return Err(SchedulingError::Database(
                "Slot insert returned no row".to_string(),
            ));
        }

        serde_json::from_value(rows.remove(0))
            .map_err(|e| SchedulingError::Database(e.to_string()))
    }

    async fn assert_clinic_exists(
        &self,
        clinic_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<(), SchedulingError> {
        self.fetch_clinic(clinic_id, auth_token).await.map(|_| ())
    }

    async fn fetch_clinic(
        &self,
        clinic_id: Uuid,
        auth_token: Option<&str>,
    ) -> Result<Value, SchedulingError> {
        let path = format!("/rest/v1/clinics?id=eq.{}", clinic_id);

        let mut clinics: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, auth_token, None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        if clinics.is_empty() {
            return Err(SchedulingError::ClinicNotFound);
        }
        Ok(clinics.remove(0))
    }
}

/// First day of the generation window: midnight UTC of the day after `now`.
fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    (now + ChronoDuration::days(1))
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always valid")
        .and_utc()
}

/// The fixed one-hour intervals generated for each day of the window.
fn default_slot_intervals(window_start: DateTime<Utc>) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut intervals = Vec::with_capacity((SLOT_SUPPLY_DAYS as usize) * SLOT_SUPPLY_HOURS.len());

    for day in 0..SLOT_SUPPLY_DAYS {
        let date = window_start + ChronoDuration::days(day);
        for hour in SLOT_SUPPLY_HOURS {
            let start = date + ChronoDuration::hours(hour as i64);
            let end = start + ChronoDuration::hours(SLOT_SUPPLY_DURATION_HOURS);
            intervals.push((start, end));
        }
    }

    intervals
}
