use super::*;
use models::{EventStatus, FileCategory, Role};
use time::macros::datetime;
use uuid::Uuid;

fn user(role: Role) -> User {
    User {
        id: Uuid::nil(),
        name: "Ada".into(),
        email: "ada@example.com".into(),
        role,
        picture: None,
        created_at: OffsetDateTime::UNIX_EPOCH,
    }
}

fn event(title: &str, status: EventStatus) -> Event {
    Event {
        id: Uuid::nil(),
        title: title.into(),
        description: "Bring snacks".into(),
        organizer_id: Uuid::nil(),
        start_time: datetime!(2025-04-10 18:30 UTC),
        end_time: datetime!(2025-04-10 20:00 UTC),
        status,
        approved_by: None,
        archived_at: None,
        created_at: OffsetDateTime::UNIX_EPOCH,
        updated_at: OffsetDateTime::UNIX_EPOCH,
    }
}

#[test]
fn format_time_normalises_to_utc() {
    assert_eq!(format_time(datetime!(2025-04-10 20:30 +02:00)), "2025-04-10 18:30 UTC");
}

#[test]
fn format_size_picks_unit() {
    assert_eq!(format_size(512), "512 B");
    assert_eq!(format_size(2048), "2.0 KiB");
    assert_eq!(format_size(5 * 1024 * 1024), "5.0 MiB");
}

#[test]
fn event_line_shows_status_time_and_title() {
    let line = event_line(&event("Hack Night", EventStatus::Pending));
    assert!(line.contains("pending "));
    assert!(line.contains("2025-04-10 18:30 UTC"));
    assert!(line.ends_with("Hack Night"));
}

#[test]
fn empty_lists_say_so() {
    assert_eq!(event_list(&[]), "no events\n");
    assert_eq!(file_list(&[]), "no files\n");
}

#[test]
fn event_detail_lists_files() {
    let file = EventFile {
        id: Uuid::nil(),
        event_id: Uuid::nil(),
        uploader_id: Uuid::nil(),
        filename: "poster.png".into(),
        storage_key: "events/x/y-poster.png".into(),
        mime_type: "image/png".into(),
        size: 2048,
        category: FileCategory::Photo,
        sha256: String::new(),
        uploaded_at: OffsetDateTime::UNIX_EPOCH,
    };
    let text = event_detail(&event("Hack Night", EventStatus::Approved), &[file]);
    assert!(text.starts_with("Hack Night\n"));
    assert!(text.contains("Bring snacks"));
    assert!(text.contains("files (1):"));
    assert!(text.contains("poster.png"));
}

#[test]
fn user_line_shows_role_and_email() {
    let line = user_line(&user(Role::CoreMember));
    assert!(line.contains("core_member"));
    assert!(line.ends_with("Ada <ada@example.com>"));
}

#[test]
fn dashboard_sections_follow_role() {
    let events = vec![event("Pending one", EventStatus::Pending)];
    let now = datetime!(2025-01-01 00:00 UTC);

    let member = dashboard(&Dashboard::build(user(Role::Member), &events, now));
    assert!(member.contains("upcoming events (0)"));
    assert!(!member.contains("my proposals"));
    assert!(!member.contains("awaiting approval"));

    let admin = dashboard(&Dashboard::build(user(Role::Admin), &events, now));
    assert!(admin.starts_with("signed in as Ada (admin)\n"));
    assert!(admin.contains("my proposals (1)"));
    assert!(admin.contains("my proposals: pending (1)"));
    assert!(admin.contains("awaiting approval (1)"));
}
