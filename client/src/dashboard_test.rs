use super::*;
use time::Duration;
use time::macros::datetime;
use uuid::Uuid;

const NOW: OffsetDateTime = datetime!(2025-03-01 12:00 UTC);

fn user(role: Role) -> User {
    User {
        id: Uuid::new_v4(),
        name: "U".into(),
        email: "u@example.com".into(),
        role,
        picture: None,
        created_at: OffsetDateTime::UNIX_EPOCH,
    }
}

fn event(title: &str, organizer: Uuid, status: EventStatus, starts_in_hours: i64) -> Event {
    let start = NOW + Duration::hours(starts_in_hours);
    Event {
        id: Uuid::new_v4(),
        title: title.into(),
        description: String::new(),
        organizer_id: organizer,
        start_time: start,
        end_time: start + Duration::hours(2),
        status,
        approved_by: None,
        archived_at: None,
        created_at: NOW - Duration::hours(starts_in_hours.abs() + 1),
        updated_at: NOW,
    }
}

fn titles(events: &[Event]) -> Vec<&str> {
    events.iter().map(|e| e.title.as_str()).collect()
}

#[test]
fn member_sees_only_upcoming_approved_events() {
    let member = user(Role::Member);
    let other = Uuid::new_v4();
    let events = vec![
        event("later", other, EventStatus::Approved, 48),
        event("past", other, EventStatus::Approved, -3),
        event("soon", other, EventStatus::Approved, 2),
        event("proposal", other, EventStatus::Pending, 5),
        event("archived", other, EventStatus::Archived, 6),
    ];

    let dash = Dashboard::build(member, &events, NOW);
    assert_eq!(titles(&dash.upcoming), ["soon", "later"]);
    assert!(dash.my_proposals.is_none());
    assert!(dash.approval_queue.is_none());
}

#[test]
fn core_member_sees_own_proposals_by_status() {
    let core = user(Role::CoreMember);
    let other = Uuid::new_v4();
    let events = vec![
        event("mine pending", core.id, EventStatus::Pending, 10),
        event("mine approved", core.id, EventStatus::Approved, 20),
        event("mine archived", core.id, EventStatus::Archived, -30),
        event("theirs pending", other, EventStatus::Pending, 10),
    ];

    let dash = Dashboard::build(core, &events, NOW);
    let mine = dash.my_proposals.as_ref().unwrap();
    assert_eq!(titles(&mine.pending), ["mine pending"]);
    assert_eq!(titles(&mine.approved), ["mine approved"]);
    assert_eq!(titles(&mine.archived), ["mine archived"]);
    assert_eq!(mine.total(), 3);
    assert!(dash.approval_queue.is_none());
}

#[test]
fn admin_sees_pending_queue_oldest_first() {
    let admin = user(Role::Admin);
    let other = Uuid::new_v4();
    let events = vec![
        event("young", other, EventStatus::Pending, 1),
        event("old", other, EventStatus::Pending, 72),
        event("approved", other, EventStatus::Approved, 4),
    ];

    let dash = Dashboard::build(admin, &events, NOW);
    assert_eq!(titles(dash.approval_queue.as_deref().unwrap()), ["old", "young"]);
    assert_eq!(titles(&dash.upcoming), ["approved"]);
    assert_eq!(dash.my_proposals.as_ref().map(|p| p.total()), Some(0));
    assert_eq!(dash.role(), Role::Admin);
}

#[test]
fn serialized_member_dashboard_omits_role_sections() {
    let dash = Dashboard::build(user(Role::Member), &[], NOW);
    let json = serde_json::to_value(&dash).unwrap();
    assert!(json.get("my_proposals").is_none());
    assert!(json.get("approval_queue").is_none());
    assert_eq!(json["upcoming"], serde_json::json!([]));
}
