// libs/scheduling-cell/src/services/scheduling.rs
use chrono::Duration as ChronoDuration;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use notification_cell::NotificationService;
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use shared_models::auth::User;
use shared_utils::authz;

use crate::models::{
    Appointment, AppointmentStatus, AvailabilitySlot, CreateAppointmentRequest,
    RescheduleAppointmentRequest, SchedulingError,
};

/// Books, cancels and reschedules appointments against the slot inventory.
///
/// Slot exclusivity is enforced at the store: every reservation is a
/// conditional update filtered on `is_booked=eq.false`, and an empty
/// result set means another request won the slot first.
pub struct SchedulingService {
    supabase: Arc<SupabaseClient>,
    notifier: Arc<NotificationService>,
}

impl SchedulingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
            notifier: Arc::new(NotificationService::new(config)),
        }
    }

    /// Books an appointment inside a free slot that fully contains the
    /// requested interval. The appointment keeps the requested interval
    /// even when the covering slot is longer.
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        requester: &User,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        info!(
            "Booking appointment for user {} at clinic {}",
            requester.id, request.clinic_id
        );

        self.assert_clinic_exists(request.clinic_id, auth_token)
            .await?;

        let pet = self.fetch_pet(request.pet_id, auth_token).await?;
        if !authz::can_access(requester, pet["owner_user_id"].as_str()) {
            return Err(SchedulingError::PetNotOwned);
        }

        let service = self
            .fetch_clinic_service(request.service_id, request.clinic_id, auth_token)
            .await?;
        let duration_minutes = service["duration_minutes"]
            .as_i64()
            .ok_or_else(|| SchedulingError::Database("Service has no duration".to_string()))?;

        let start_utc = request.start_utc;
        let end_utc = start_utc + ChronoDuration::minutes(duration_minutes);

        // Free slots that fully contain [start, end), earliest first.
        let candidates_path = format!(
            "/rest/v1/availability_slots?clinic_id=eq.{}&is_booked=eq.false&start_utc=lte.{}&end_utc=gte.{}&order=start_utc.asc",
            request.clinic_id,
            urlencoding::encode(&start_utc.to_rfc3339()),
            urlencoding::encode(&end_utc.to_rfc3339())
        );

        let candidates: Vec<AvailabilitySlot> = self
            .supabase
            .request(Method::GET, &candidates_path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let mut reserved: Option<AvailabilitySlot> = None;
        for slot in candidates {
            if self.reserve_slot(slot.id, auth_token).await? {
                reserved = Some(slot);
                break;
            }
            debug!("Lost reservation race for slot {}, trying next", slot.id);
        }

        let slot = reserved.ok_or(SchedulingError::SlotUnavailable)?;

        let body = json!({
            "id": Uuid::new_v4(),
            "user_id": requester.id,
            "clinic_id": request.clinic_id,
            "pet_id": request.pet_id,
            "service_id": request.service_id,
            "start_utc": start_utc.to_rfc3339(),
            "end_utc": end_utc.to_rfc3339(),
            "status": AppointmentStatus::Confirmed,
        });

        let rows = match self
            .supabase
            .insert_returning("/rest/v1/appointments", Some(auth_token), body)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                // The slot is reserved but the booking failed, so hand the
                // slot back before surfacing the error.
                self.release_slot_best_effort(slot.id, auth_token).await;
                return Err(SchedulingError::Database(e.to_string()));
            }
        };

        let appointment = parse_single_appointment(rows)?;

        if let Some(owner_email) = pet["owner_email"].as_str() {
            self.notifier.send_detached(
                owner_email.to_string(),
                "Appointment confirmed".to_string(),
                format!(
                    "Your appointment on {} has been confirmed.",
                    appointment.start_utc.format("%Y-%m-%d %H:%M UTC")
                ),
            );
        }

        info!(
            "Booked appointment {} in slot {} for user {}",
            appointment.id, slot.id, requester.id
        );
        Ok(appointment)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
        requester: &User,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        self.fetch_visible_appointment(appointment_id, requester, auth_token)
            .await
    }

    /// Lists the requester's appointments; admins see every appointment.
    pub async fn list_appointments(
        &self,
        requester: &User,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let path = if authz::is_admin(requester) {
            "/rest/v1/appointments?order=start_utc.desc".to_string()
        } else {
            format!(
                "/rest/v1/appointments?user_id=eq.{}&order=start_utc.desc",
                requester.id
            )
        };

        self.supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))
    }

    /// Cancels an appointment and releases the covering slot. Cancelling
    /// an already cancelled appointment is a no-op that returns it as is.
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
        requester: &User,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self
            .fetch_visible_appointment(appointment_id, requester, auth_token)
            .await?;

        if appointment.status == AppointmentStatus::Cancelled {
            return Ok(appointment);
        }

        if let Some(slot) = self
            .find_covering_slot(&appointment, None, auth_token)
            .await?
        {
            // A failed release aborts the cancel: the appointment stays
            // confirmed and the retry is not absorbed by the no-op branch
            // while the slot is still booked.
            self.release_slot(slot.id, auth_token).await?;
        } else {
            warn!(
                "No covering slot found while cancelling appointment {}",
                appointment.id
            );
        }

        let updated = self
            .update_appointment_status(appointment.id, AppointmentStatus::Cancelled, auth_token)
            .await?;

        info!("Cancelled appointment {}", updated.id);
        Ok(updated)
    }

    /// Moves an appointment into a different free slot at the same clinic.
    /// Unlike booking, the appointment takes over the full bounds of the
    /// new slot.
    ///
    /// The new slot is reserved before the old one is released, so a crash
    /// in between leaves both slots held rather than the booking stranded
    /// without a slot.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        requester: &User,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self
            .fetch_visible_appointment(appointment_id, requester, auth_token)
            .await?;

        if appointment.status == AppointmentStatus::Cancelled {
            return Err(SchedulingError::InvalidState(appointment.status));
        }

        let slot_path = format!(
            "/rest/v1/availability_slots?id=eq.{}&clinic_id=eq.{}",
            request.slot_id, appointment.clinic_id
        );
        let slots: Vec<AvailabilitySlot> = self
            .supabase
            .request(Method::GET, &slot_path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let new_slot = match slots.into_iter().next() {
            Some(slot) if !slot.is_booked => slot,
            _ => return Err(SchedulingError::SlotUnavailable),
        };

        if !self.reserve_slot(new_slot.id, auth_token).await? {
            return Err(SchedulingError::SlotUnavailable);
        }

        let old_slot = match self
            .find_covering_slot(&appointment, Some(new_slot.id), auth_token)
            .await
        {
            Ok(slot) => slot,
            Err(e) => {
                self.release_slot_best_effort(new_slot.id, auth_token).await;
                return Err(e);
            }
        };

        if let Some(old_slot) = &old_slot {
            if let Err(e) = self.release_slot(old_slot.id, auth_token).await {
                self.release_slot_best_effort(new_slot.id, auth_token).await;
                return Err(e);
            }
        }

        let body = json!({
            "start_utc": new_slot.start_utc.to_rfc3339(),
            "end_utc": new_slot.end_utc.to_rfc3339(),
            "status": AppointmentStatus::Confirmed,
        });

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment.id);
        let rows = match self
            .supabase
            .conditional_update(&path, Some(auth_token), body)
            .await
        {
            Ok(rows) => rows,
            Err(e) => {
                // Unwind the slot swap so the still-confirmed appointment
                // keeps its reservation.
                self.release_slot_best_effort(new_slot.id, auth_token).await;
                if let Some(old_slot) = &old_slot {
                    match self.reserve_slot(old_slot.id, auth_token).await {
                        Ok(true) => {}
                        _ => warn!(
                            "Could not re-reserve slot {} after failed reschedule of appointment {}",
                            old_slot.id, appointment.id
                        ),
                    }
                }
                return Err(SchedulingError::Database(e.to_string()));
            }
        };

        let updated = parse_single_appointment(rows)?;
        info!(
            "Rescheduled appointment {} into slot {}",
            updated.id, new_slot.id
        );
        Ok(updated)
    }

    // ==========================================================================
    // SLOT RESERVATION
    // ==========================================================================

    /// Compare-and-swap reservation. Returns false when another request
    /// booked the slot first.
    async fn reserve_slot(
        &self,
        slot_id: Uuid,
        auth_token: &str,
    ) -> Result<bool, SchedulingError> {
        let path = format!(
            "/rest/v1/availability_slots?id=eq.{}&is_booked=eq.false",
            slot_id
        );

        let updated = self
            .supabase
            .conditional_update(&path, Some(auth_token), json!({"is_booked": true}))
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        Ok(!updated.is_empty())
    }

    /// Releases a slot back to the free pool. Failure is surfaced so a
    /// caller never reports success over a half-applied write.
    async fn release_slot(&self, slot_id: Uuid, auth_token: &str) -> Result<(), SchedulingError> {
        let path = format!("/rest/v1/availability_slots?id=eq.{}", slot_id);

        self.supabase
            .conditional_update(&path, Some(auth_token), json!({"is_booked": false}))
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        Ok(())
    }

    /// Release used while unwinding from another failure. The original
    /// error stays the one surfaced; this one is only logged.
    async fn release_slot_best_effort(&self, slot_id: Uuid, auth_token: &str) {
        if let Err(e) = self.release_slot(slot_id, auth_token).await {
            error!("Failed to release slot {}: {}", slot_id, e);
        }
    }

    /// The first slot fully containing the appointment interval, optionally
    /// skipping one slot id (so a reschedule never releases the slot it
    /// just reserved).
    async fn find_covering_slot(
        &self,
        appointment: &Appointment,
        exclude: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Option<AvailabilitySlot>, SchedulingError> {
        let mut path = format!(
            "/rest/v1/availability_slots?clinic_id=eq.{}&start_utc=lte.{}&end_utc=gte.{}",
            appointment.clinic_id,
            urlencoding::encode(&appointment.start_utc.to_rfc3339()),
            urlencoding::encode(&appointment.end_utc.to_rfc3339())
        );
        if let Some(id) = exclude {
            path.push_str(&format!("&id=neq.{}", id));
        }
        path.push_str("&order=start_utc.asc&limit=1");

        let slots: Vec<AvailabilitySlot> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        Ok(slots.into_iter().next())
    }

    // ==========================================================================
    // LOOKUPS
    // ==========================================================================

    /// Fetches an appointment the requester is allowed to see. Appointments
    /// owned by other users are reported as not found, never as forbidden.
    async fn fetch_visible_appointment(
        &self,
        appointment_id: Uuid,
        requester: &User,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);

        let appointments: Vec<Appointment> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        let appointment = appointments
            .into_iter()
            .next()
            .ok_or(SchedulingError::NotFound)?;

        if !authz::can_access(requester, Some(appointment.user_id.as_str())) {
            return Err(SchedulingError::NotFound);
        }

        Ok(appointment)
    }

    async fn assert_clinic_exists(
        &self,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        let path = format!("/rest/v1/clinics?id=eq.{}&select=id", clinic_id);

        let clinics: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        if clinics.is_empty() {
            return Err(SchedulingError::ClinicNotFound);
        }
        Ok(())
    }

    async fn fetch_pet(&self, pet_id: Uuid, auth_token: &str) -> Result<Value, SchedulingError> {
        let path = format!("/rest/v1/pets?id=eq.{}", pet_id);

        let mut pets: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        if pets.is_empty() {
            return Err(SchedulingError::PetNotFound);
        }
        Ok(pets.remove(0))
    }

    /// A service only counts if it belongs to the clinic being booked.
    async fn fetch_clinic_service(
        &self,
        service_id: Uuid,
        clinic_id: Uuid,
        auth_token: &str,
    ) -> Result<Value, SchedulingError> {
        let path = format!(
            "/rest/v1/services?id=eq.{}&clinic_id=eq.{}",
            service_id, clinic_id
        );

        let mut services: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        if services.is_empty() {
            return Err(SchedulingError::ServiceNotFound);
        }
        Ok(services.remove(0))
    }

    async fn update_appointment_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);

        let rows = self
            .supabase
            .conditional_update(&path, Some(auth_token), json!({"status": status}))
            .await
            .map_err(|e| SchedulingError::Database(e.to_string()))?;

        parse_single_appointment(rows)
    }
}

fn parse_single_appointment(mut rows: Vec<Value>) -> Result<Appointment, SchedulingError> {
    if rows.is_empty() {
        return Err(SchedulingError::Database(
            "Update returned no row".to_string(),
        ));
    }
    serde_json::from_value(rows.remove(0)).map_err(|e| SchedulingError::Database(e.to_string()))
}
