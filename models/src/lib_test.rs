use super::*;
use time::macros::datetime;

fn sample_event(status: EventStatus) -> Event {
    Event {
        id: Uuid::nil(),
        title: "Tech Workshop".to_owned(),
        description: "Hands-on session".to_owned(),
        organizer_id: Uuid::nil(),
        start_time: datetime!(2025-03-01 18:00 UTC),
        end_time: datetime!(2025-03-01 20:00 UTC),
        status,
        approved_by: None,
        archived_at: None,
        created_at: datetime!(2025-02-01 09:00 UTC),
        updated_at: datetime!(2025-02-01 09:00 UTC),
    }
}

// =============================================================================
// Role
// =============================================================================

#[test]
fn role_parses_all_variants() {
    assert_eq!("member".parse::<Role>(), Ok(Role::Member));
    assert_eq!("core_member".parse::<Role>(), Ok(Role::CoreMember));
    assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
}

#[test]
fn role_accepts_legacy_user_spelling() {
    assert_eq!("user".parse::<Role>(), Ok(Role::Member));
    let role: Role = serde_json::from_str("\"user\"").unwrap();
    assert_eq!(role, Role::Member);
}

#[test]
fn role_rejects_unknown() {
    let err = "superuser".parse::<Role>().unwrap_err();
    assert_eq!(err.kind, "role");
    assert_eq!(err.to_string(), "unknown role: superuser");
}

#[test]
fn role_serializes_snake_case() {
    assert_eq!(serde_json::to_string(&Role::CoreMember).unwrap(), "\"core_member\"");
}

#[test]
fn role_capabilities() {
    assert!(!Role::Member.is_core());
    assert!(Role::CoreMember.is_core());
    assert!(Role::Admin.is_core());
    assert!(Role::Admin.is_admin());
    assert!(!Role::CoreMember.is_admin());
    assert!(Role::CoreMember.has_any(&[Role::Admin, Role::CoreMember]));
    assert!(!Role::Member.has_any(&[Role::Admin]));
}

// =============================================================================
// EventStatus / Event
// =============================================================================

#[test]
fn event_status_round_trips_through_str() {
    for status in [EventStatus::Pending, EventStatus::Approved, EventStatus::Archived] {
        assert_eq!(status.as_str().parse::<EventStatus>(), Ok(status));
    }
    assert!("rejected".parse::<EventStatus>().is_err());
}

#[test]
fn pending_event_is_a_proposal() {
    assert!(sample_event(EventStatus::Pending).is_proposal());
    assert!(!sample_event(EventStatus::Approved).is_proposal());
}

#[test]
fn event_serializes_rfc3339_timestamps() {
    let json = serde_json::to_value(sample_event(EventStatus::Approved)).unwrap();
    assert_eq!(json["start_time"], "2025-03-01T18:00:00Z");
    assert_eq!(json["status"], "approved");
    assert!(json["archived_at"].is_null());
}

#[test]
fn event_deserializes_without_optional_fields() {
    let raw = r#"{
        "id": "00000000-0000-0000-0000-000000000000",
        "title": "Hackathon",
        "organizer_id": "00000000-0000-0000-0000-000000000000",
        "start_time": "2025-04-01T10:00:00Z",
        "end_time": "2025-04-02T10:00:00Z",
        "status": "pending",
        "created_at": "2025-03-01T10:00:00Z",
        "updated_at": "2025-03-01T10:00:00Z"
    }"#;
    let event: Event = serde_json::from_str(raw).unwrap();
    assert_eq!(event.description, "");
    assert!(event.approved_by.is_none());
    assert!(event.archived_at.is_none());
}

// =============================================================================
// FileCategory
// =============================================================================

#[test]
fn file_category_from_mime_detects_images() {
    assert_eq!(FileCategory::from_mime("image/png"), FileCategory::Photo);
    assert_eq!(FileCategory::from_mime(" IMAGE/JPEG "), FileCategory::Photo);
    assert_eq!(FileCategory::from_mime("application/pdf"), FileCategory::Other);
}

#[test]
fn file_category_parse_rejects_unknown() {
    assert_eq!("report".parse::<FileCategory>(), Ok(FileCategory::Report));
    assert!("video".parse::<FileCategory>().is_err());
}

// =============================================================================
// Requests / claims
// =============================================================================

#[test]
fn update_request_omits_absent_fields() {
    let req = UpdateEventRequest { title: Some("New".into()), ..UpdateEventRequest::default() };
    let json = serde_json::to_value(&req).unwrap();
    assert_eq!(json, serde_json::json!({ "title": "New" }));
    assert!(!req.is_empty());
    assert!(UpdateEventRequest::default().is_empty());
}

#[test]
fn auth_response_bearer_sets_token_type() {
    let user = User {
        id: Uuid::nil(),
        name: "Admin One".into(),
        email: "admin1@example.com".into(),
        role: Role::Admin,
        picture: None,
        created_at: datetime!(2025-01-01 00:00 UTC),
    };
    let resp = AuthResponse::bearer("tok".into(), user);
    assert_eq!(resp.token_type, "bearer");
}

#[test]
fn claims_without_picture_default_to_empty() {
    let claims: TokenClaims = serde_json::from_value(serde_json::json!({
        "sub": Uuid::nil().to_string(),
        "user_id": Uuid::nil(),
        "email": "a@b.c",
        "name": "a",
        "role": "core_member",
        "iat": 100,
        "exp": 200
    }))
    .unwrap();
    assert_eq!(claims.picture, "");
    assert_eq!(claims.role, Role::CoreMember);
    assert_eq!(claims.exp, 200);
}
