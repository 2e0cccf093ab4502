use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use chrono::{DateTime, TimeZone, Utc};
use headers::{authorization::Bearer, Authorization};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::handlers::*;
use scheduling_cell::models::{
    CreateAppointmentRequest, CreateSlotRequest, RescheduleAppointmentRequest, SlotQueryParams,
};
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

fn user_extension(user: &TestUser) -> Extension<User> {
    Extension(user.to_user())
}

fn auth_header(token: &str) -> TypedHeader<Authorization<Bearer>> {
    TypedHeader(Authorization::bearer(token).unwrap())
}

fn slot_row(
    id: Uuid,
    clinic_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    is_booked: bool,
) -> serde_json::Value {
    json!({
        "id": id,
        "clinic_id": clinic_id,
        "start_utc": start.to_rfc3339(),
        "end_utc": end.to_rfc3339(),
        "is_booked": is_booked,
    })
}

struct BookingFixture {
    clinic_id: Uuid,
    pet_id: Uuid,
    service_id: Uuid,
}

impl BookingFixture {
    fn new() -> Self {
        Self {
            clinic_id: Uuid::new_v4(),
            pet_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
        }
    }

    /// Mounts the clinic, pet and service lookups every booking makes.
    async fn mount_lookups(
        &self,
        server: &MockServer,
        pet_owner_id: &str,
        duration_minutes: i64,
    ) {
        Mock::given(method("GET"))
            .and(path("/rest/v1/clinics"))
            .and(query_param("id", format!("eq.{}", self.clinic_id)))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([{"id": self.clinic_id}])),
            )
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/pets"))
            .and(query_param("id", format!("eq.{}", self.pet_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": self.pet_id,
                "owner_user_id": pet_owner_id,
                "owner_email": "owner@example.com",
                "name": "Biscuit",
            }])))
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/rest/v1/services"))
            .and(query_param("id", format!("eq.{}", self.service_id)))
            .and(query_param("clinic_id", format!("eq.{}", self.clinic_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": self.service_id,
                "clinic_id": self.clinic_id,
                "duration_minutes": duration_minutes,
            }])))
            .mount(server)
            .await;
    }
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[tokio::test]
async fn booking_keeps_requested_interval_inside_longer_slot() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.jwt_secret, Some(24));

    let fixture = BookingFixture::new();
    fixture.mount_lookups(&mock_server, &owner.id, 30).await;

    let slot_id = Uuid::new_v4();
    let slot_start = Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap();
    let slot_end = Utc.with_ymd_and_hms(2026, 9, 1, 10, 0, 0).unwrap();
    let requested_start = Utc.with_ymd_and_hms(2026, 9, 1, 9, 15, 0).unwrap();

    // The hour-long slot contains the requested half hour
    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("is_booked", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            slot_id,
            fixture.clinic_id,
            slot_start,
            slot_end,
            false
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .and(query_param("is_booked", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            slot_id,
            fixture.clinic_id,
            slot_start,
            slot_end,
            true
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let appointment_id = Uuid::new_v4();
    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": appointment_id,
            "user_id": owner.id,
            "clinic_id": fixture.clinic_id,
            "pet_id": fixture.pet_id,
            "service_id": fixture.service_id,
            "start_utc": requested_start.to_rfc3339(),
            "end_utc": (requested_start + chrono::Duration::minutes(30)).to_rfc3339(),
            "status": "confirmed",
        }])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = create_appointment(
        State(config.to_arc()),
        auth_header(&token),
        user_extension(&owner),
        Json(CreateAppointmentRequest {
            clinic_id: fixture.clinic_id,
            pet_id: fixture.pet_id,
            service_id: fixture.service_id,
            start_utc: requested_start,
        }),
    )
    .await;

    let (status, Json(appointment)) = result.expect("booking should succeed");
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(appointment.start_utc, requested_start);
    assert_eq!(
        appointment.end_utc,
        requested_start + chrono::Duration::minutes(30)
    );
}

#[tokio::test]
async fn booking_fails_when_no_slot_contains_the_interval() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.jwt_secret, Some(24));

    let fixture = BookingFixture::new();
    fixture.mount_lookups(&mock_server, &owner.id, 30).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("is_booked", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = create_appointment(
        State(config.to_arc()),
        auth_header(&token),
        user_extension(&owner),
        Json(CreateAppointmentRequest {
            clinic_id: fixture.clinic_id,
            pet_id: fixture.pet_id,
            service_id: fixture.service_id,
            start_utc: Utc.with_ymd_and_hms(2026, 9, 1, 9, 15, 0).unwrap(),
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn booking_fails_when_reservation_race_is_lost() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.jwt_secret, Some(24));

    let fixture = BookingFixture::new();
    fixture.mount_lookups(&mock_server, &owner.id, 30).await;

    let slot_id = Uuid::new_v4();
    let slot_start = Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap();
    let slot_end = Utc.with_ymd_and_hms(2026, 9, 1, 10, 0, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("is_booked", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            slot_id,
            fixture.clinic_id,
            slot_start,
            slot_end,
            false
        )])))
        .mount(&mock_server)
        .await;

    // Another request booked the slot between the read and the update:
    // the conditional update matches nothing
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .and(query_param("is_booked", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = create_appointment(
        State(config.to_arc()),
        auth_header(&token),
        user_extension(&owner),
        Json(CreateAppointmentRequest {
            clinic_id: fixture.clinic_id,
            pet_id: fixture.pet_id,
            service_id: fixture.service_id,
            start_utc: Utc.with_ymd_and_hms(2026, 9, 1, 9, 15, 0).unwrap(),
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn booking_rejects_someone_elses_pet() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.jwt_secret, Some(24));

    let fixture = BookingFixture::new();
    let stranger_id = Uuid::new_v4().to_string();
    fixture.mount_lookups(&mock_server, &stranger_id, 30).await;

    let result = create_appointment(
        State(config.to_arc()),
        auth_header(&token),
        user_extension(&owner),
        Json(CreateAppointmentRequest {
            clinic_id: fixture.clinic_id,
            pet_id: fixture.pet_id,
            service_id: fixture.service_id,
            start_utc: Utc.with_ymd_and_hms(2026, 9, 1, 9, 15, 0).unwrap(),
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn admin_can_book_for_someone_elses_pet() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let admin = TestUser::admin("admin@example.com");
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, Some(24));

    let fixture = BookingFixture::new();
    let stranger_id = Uuid::new_v4().to_string();
    fixture.mount_lookups(&mock_server, &stranger_id, 60).await;

    let slot_id = Uuid::new_v4();
    let slot_start = Utc.with_ymd_and_hms(2026, 9, 1, 14, 0, 0).unwrap();
    let slot_end = Utc.with_ymd_and_hms(2026, 9, 1, 15, 0, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("is_booked", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            slot_id,
            fixture.clinic_id,
            slot_start,
            slot_end,
            false
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            slot_id,
            fixture.clinic_id,
            slot_start,
            slot_end,
            true
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "user_id": admin.id,
            "clinic_id": fixture.clinic_id,
            "pet_id": fixture.pet_id,
            "service_id": fixture.service_id,
            "start_utc": slot_start.to_rfc3339(),
            "end_utc": slot_end.to_rfc3339(),
            "status": "confirmed",
        }])))
        .mount(&mock_server)
        .await;

    let result = create_appointment(
        State(config.to_arc()),
        auth_header(&token),
        user_extension(&admin),
        Json(CreateAppointmentRequest {
            clinic_id: fixture.clinic_id,
            pet_id: fixture.pet_id,
            service_id: fixture.service_id,
            start_utc: slot_start,
        }),
    )
    .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn booking_reports_missing_clinic() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.jwt_secret, Some(24));

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    let result = create_appointment(
        State(config.to_arc()),
        auth_header(&token),
        user_extension(&owner),
        Json(CreateAppointmentRequest {
            clinic_id: Uuid::new_v4(),
            pet_id: Uuid::new_v4(),
            service_id: Uuid::new_v4(),
            start_utc: Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap(),
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::NotFound(_))));
}

// ==============================================================================
// CANCELLATION
// ==============================================================================

fn appointment_row(
    id: Uuid,
    user_id: &str,
    clinic_id: Uuid,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    status: &str,
) -> serde_json::Value {
    json!({
        "id": id,
        "user_id": user_id,
        "clinic_id": clinic_id,
        "pet_id": Uuid::new_v4(),
        "service_id": Uuid::new_v4(),
        "start_utc": start.to_rfc3339(),
        "end_utc": end.to_rfc3339(),
        "status": status,
    })
}

#[tokio::test]
async fn cancelling_releases_the_covering_slot() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.jwt_secret, Some(24));

    let appointment_id = Uuid::new_v4();
    let clinic_id = Uuid::new_v4();
    let slot_id = Uuid::new_v4();
    let start = Utc.with_ymd_and_hms(2026, 9, 2, 11, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2026, 9, 2, 11, 30, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            appointment_id,
            &owner.id,
            clinic_id,
            start,
            end,
            "confirmed"
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("clinic_id", format!("eq.{}", clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            slot_id,
            clinic_id,
            start,
            Utc.with_ymd_and_hms(2026, 9, 2, 12, 0, 0).unwrap(),
            true
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            slot_id,
            clinic_id,
            start,
            Utc.with_ymd_and_hms(2026, 9, 2, 12, 0, 0).unwrap(),
            false
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            appointment_id,
            &owner.id,
            clinic_id,
            start,
            end,
            "cancelled"
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = cancel_appointment(
        State(config.to_arc()),
        auth_header(&token),
        user_extension(&owner),
        Path(appointment_id),
    )
    .await;

    let Json(appointment) = result.expect("cancel should succeed");
    assert_eq!(appointment.status.to_string(), "cancelled");
}

#[tokio::test]
async fn cancelling_twice_is_a_no_op() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.jwt_secret, Some(24));

    let appointment_id = Uuid::new_v4();
    let clinic_id = Uuid::new_v4();
    let start = Utc.with_ymd_and_hms(2026, 9, 2, 11, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2026, 9, 2, 11, 30, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            appointment_id,
            &owner.id,
            clinic_id,
            start,
            end,
            "cancelled"
        )])))
        .mount(&mock_server)
        .await;

    // No slot release and no status write may happen
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = cancel_appointment(
        State(config.to_arc()),
        auth_header(&token),
        user_extension(&owner),
        Path(appointment_id),
    )
    .await;

    let Json(appointment) = result.expect("repeat cancel should succeed");
    assert_eq!(appointment.status.to_string(), "cancelled");
}

#[tokio::test]
async fn cancelling_fails_when_the_slot_release_fails() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.jwt_secret, Some(24));

    let appointment_id = Uuid::new_v4();
    let clinic_id = Uuid::new_v4();
    let slot_id = Uuid::new_v4();
    let start = Utc.with_ymd_and_hms(2026, 9, 2, 11, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2026, 9, 2, 11, 30, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            appointment_id,
            &owner.id,
            clinic_id,
            start,
            end,
            "confirmed"
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("clinic_id", format!("eq.{}", clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            slot_id,
            clinic_id,
            start,
            Utc.with_ymd_and_hms(2026, 9, 2, 12, 0, 0).unwrap(),
            true
        )])))
        .mount(&mock_server)
        .await;

    // The release write fails at the store
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", slot_id)))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The appointment must not be marked cancelled over a booked slot,
    // otherwise a retry hits the idempotent branch and the slot leaks
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let result = cancel_appointment(
        State(config.to_arc()),
        auth_header(&token),
        user_extension(&owner),
        Path(appointment_id),
    )
    .await;

    assert!(matches!(result, Err(AppError::Database(_))));
}

#[tokio::test]
async fn other_users_appointments_are_invisible() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.jwt_secret, Some(24));

    let appointment_id = Uuid::new_v4();
    let stranger_id = Uuid::new_v4().to_string();
    let start = Utc.with_ymd_and_hms(2026, 9, 2, 11, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2026, 9, 2, 11, 30, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            appointment_id,
            &stranger_id,
            Uuid::new_v4(),
            start,
            end,
            "confirmed"
        )])))
        .mount(&mock_server)
        .await;

    let result = cancel_appointment(
        State(config.to_arc()),
        auth_header(&token),
        user_extension(&owner),
        Path(appointment_id),
    )
    .await;

    // Reported as missing, not forbidden, so ownership leaks nothing
    assert!(matches!(result, Err(AppError::NotFound(_))));
}

// ==============================================================================
// RESCHEDULING
// ==============================================================================

#[tokio::test]
async fn rescheduling_takes_over_the_new_slots_bounds() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.jwt_secret, Some(24));

    let appointment_id = Uuid::new_v4();
    let clinic_id = Uuid::new_v4();
    let old_slot_id = Uuid::new_v4();
    let new_slot_id = Uuid::new_v4();

    let old_start = Utc.with_ymd_and_hms(2026, 9, 3, 9, 0, 0).unwrap();
    let old_end = Utc.with_ymd_and_hms(2026, 9, 3, 9, 30, 0).unwrap();
    let new_start = Utc.with_ymd_and_hms(2026, 9, 4, 14, 0, 0).unwrap();
    let new_end = Utc.with_ymd_and_hms(2026, 9, 4, 15, 0, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            appointment_id,
            &owner.id,
            clinic_id,
            old_start,
            old_end,
            "confirmed"
        )])))
        .mount(&mock_server)
        .await;

    // New slot lookup by id
    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", new_slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            new_slot_id,
            clinic_id,
            new_start,
            new_end,
            false
        )])))
        .mount(&mock_server)
        .await;

    // Reservation of the new slot
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", new_slot_id)))
        .and(query_param("is_booked", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            new_slot_id,
            clinic_id,
            new_start,
            new_end,
            true
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Old covering slot lookup excludes the freshly reserved slot
    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("neq.{}", new_slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            old_slot_id,
            clinic_id,
            old_start,
            Utc.with_ymd_and_hms(2026, 9, 3, 10, 0, 0).unwrap(),
            true
        )])))
        .mount(&mock_server)
        .await;

    // Release of the old slot
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", old_slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            old_slot_id,
            clinic_id,
            old_start,
            Utc.with_ymd_and_hms(2026, 9, 3, 10, 0, 0).unwrap(),
            false
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            appointment_id,
            &owner.id,
            clinic_id,
            new_start,
            new_end,
            "confirmed"
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = reschedule_appointment(
        State(config.to_arc()),
        auth_header(&token),
        user_extension(&owner),
        Path(appointment_id),
        Json(RescheduleAppointmentRequest {
            slot_id: new_slot_id,
        }),
    )
    .await;

    let Json(appointment) = result.expect("reschedule should succeed");
    assert_eq!(appointment.start_utc, new_start);
    assert_eq!(appointment.end_utc, new_end);
    assert_eq!(appointment.status.to_string(), "confirmed");
}

#[tokio::test]
async fn cancelled_appointments_cannot_be_rescheduled() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.jwt_secret, Some(24));

    let appointment_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            appointment_id,
            &owner.id,
            Uuid::new_v4(),
            Utc.with_ymd_and_hms(2026, 9, 3, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 9, 3, 9, 30, 0).unwrap(),
            "cancelled"
        )])))
        .mount(&mock_server)
        .await;

    let result = reschedule_appointment(
        State(config.to_arc()),
        auth_header(&token),
        user_extension(&owner),
        Path(appointment_id),
        Json(RescheduleAppointmentRequest {
            slot_id: Uuid::new_v4(),
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn rescheduling_into_a_booked_slot_is_rejected() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.jwt_secret, Some(24));

    let appointment_id = Uuid::new_v4();
    let clinic_id = Uuid::new_v4();
    let new_slot_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            appointment_id,
            &owner.id,
            clinic_id,
            Utc.with_ymd_and_hms(2026, 9, 3, 9, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 9, 3, 9, 30, 0).unwrap(),
            "confirmed"
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", new_slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            new_slot_id,
            clinic_id,
            Utc.with_ymd_and_hms(2026, 9, 4, 14, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2026, 9, 4, 15, 0, 0).unwrap(),
            true
        )])))
        .mount(&mock_server)
        .await;

    let result = reschedule_appointment(
        State(config.to_arc()),
        auth_header(&token),
        user_extension(&owner),
        Path(appointment_id),
        Json(RescheduleAppointmentRequest {
            slot_id: new_slot_id,
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn failed_reschedule_write_restores_both_slots() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let owner = TestUser::owner("owner@example.com");
    let token = JwtTestUtils::create_test_token(&owner, &config.jwt_secret, Some(24));

    let appointment_id = Uuid::new_v4();
    let clinic_id = Uuid::new_v4();
    let old_slot_id = Uuid::new_v4();
    let new_slot_id = Uuid::new_v4();

    let old_start = Utc.with_ymd_and_hms(2026, 9, 3, 9, 0, 0).unwrap();
    let old_end = Utc.with_ymd_and_hms(2026, 9, 3, 9, 30, 0).unwrap();
    let new_start = Utc.with_ymd_and_hms(2026, 9, 4, 14, 0, 0).unwrap();
    let new_end = Utc.with_ymd_and_hms(2026, 9, 4, 15, 0, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([appointment_row(
            appointment_id,
            &owner.id,
            clinic_id,
            old_start,
            old_end,
            "confirmed"
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", new_slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            new_slot_id,
            clinic_id,
            new_start,
            new_end,
            false
        )])))
        .mount(&mock_server)
        .await;

    // Reservation of the new slot; mounted before the plain-release mock
    // below so the conditional write matches here
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", new_slot_id)))
        .and(query_param("is_booked", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            new_slot_id,
            clinic_id,
            new_start,
            new_end,
            true
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("neq.{}", new_slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            old_slot_id,
            clinic_id,
            old_start,
            Utc.with_ymd_and_hms(2026, 9, 3, 10, 0, 0).unwrap(),
            true
        )])))
        .mount(&mock_server)
        .await;

    // Re-reservation of the old slot while unwinding
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", old_slot_id)))
        .and(query_param("is_booked", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            old_slot_id,
            clinic_id,
            old_start,
            Utc.with_ymd_and_hms(2026, 9, 3, 10, 0, 0).unwrap(),
            true
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Release of the old slot
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", old_slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            old_slot_id,
            clinic_id,
            old_start,
            Utc.with_ymd_and_hms(2026, 9, 3, 10, 0, 0).unwrap(),
            false
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Hand-back of the new slot while unwinding
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("id", format!("eq.{}", new_slot_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            new_slot_id,
            clinic_id,
            new_start,
            new_end,
            false
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The appointment write itself fails
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = reschedule_appointment(
        State(config.to_arc()),
        auth_header(&token),
        user_extension(&owner),
        Path(appointment_id),
        Json(RescheduleAppointmentRequest {
            slot_id: new_slot_id,
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::Database(_))));
}

// ==============================================================================
// SLOT SUPPLY
// ==============================================================================

#[tokio::test]
async fn listing_slots_generates_inventory_for_an_empty_clinic() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let clinic_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .and(query_param("id", format!("eq.{}", clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": clinic_id}])))
        .mount(&mock_server)
        .await;

    // No future slot
    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    // Nothing already occupies the generation window
    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("select", "start_utc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{}])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let listed_start = Utc::now() + chrono::Duration::days(1);
    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("order", "start_utc.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            Uuid::new_v4(),
            clinic_id,
            listed_start,
            listed_start + chrono::Duration::hours(1),
            false
        )])))
        .mount(&mock_server)
        .await;

    let result = get_clinic_slots(
        State(config.to_arc()),
        Path(clinic_id),
        Query(SlotQueryParams {
            from_utc: None,
            to_utc: None,
        }),
    )
    .await;

    let Json(slots) = result.expect("listing should succeed");
    assert_eq!(slots.len(), 1);
    assert!(!slots[0].is_booked);
}

#[tokio::test]
async fn listing_slots_skips_generation_when_inventory_exists() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let clinic_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .and(query_param("id", format!("eq.{}", clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": clinic_id}])))
        .mount(&mock_server)
        .await;

    let existing_start = Utc::now() + chrono::Duration::days(2);

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            Uuid::new_v4(),
            clinic_id,
            existing_start,
            existing_start + chrono::Duration::hours(1),
            false
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/availability_slots"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([])))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/availability_slots"))
        .and(query_param("order", "start_utc.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([slot_row(
            Uuid::new_v4(),
            clinic_id,
            existing_start,
            existing_start + chrono::Duration::hours(1),
            false
        )])))
        .mount(&mock_server)
        .await;

    let result = get_clinic_slots(
        State(config.to_arc()),
        Path(clinic_id),
        Query(SlotQueryParams {
            from_utc: None,
            to_utc: None,
        }),
    )
    .await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn publishing_a_slot_requires_owning_the_clinic() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_supabase_url(&mock_server.uri());
    let clinic_admin = TestUser::clinic_admin("vet@example.com");
    let token = JwtTestUtils::create_test_token(&clinic_admin, &config.jwt_secret, Some(24));

    let clinic_id = Uuid::new_v4();
    let stranger_id = Uuid::new_v4().to_string();

    Mock::given(method("GET"))
        .and(path("/rest/v1/clinics"))
        .and(query_param("id", format!("eq.{}", clinic_id)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": clinic_id,
            "owner_user_id": stranger_id,
        }])))
        .mount(&mock_server)
        .await;

    let result = create_clinic_slot(
        State(config.to_arc()),
        auth_header(&token),
        user_extension(&clinic_admin),
        Path(clinic_id),
        Json(CreateSlotRequest {
            start_utc: Utc.with_ymd_and_hms(2026, 9, 5, 10, 0, 0).unwrap(),
            end_utc: Utc.with_ymd_and_hms(2026, 9, 5, 11, 0, 0).unwrap(),
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn publishing_a_slot_rejects_inverted_intervals() {
    let config = TestConfig::default();
    let clinic_admin = TestUser::clinic_admin("vet@example.com");
    let token = JwtTestUtils::create_test_token(&clinic_admin, &config.jwt_secret, Some(24));

    let result = create_clinic_slot(
        State(config.to_arc()),
        auth_header(&token),
        user_extension(&clinic_admin),
        Path(Uuid::new_v4()),
        Json(CreateSlotRequest {
            start_utc: Utc.with_ymd_and_hms(2026, 9, 5, 11, 0, 0).unwrap(),
            end_utc: Utc.with_ymd_and_hms(2026, 9, 5, 10, 0, 0).unwrap(),
        }),
    )
    .await;

    assert!(matches!(result, Err(AppError::ValidationError(_))));
}
