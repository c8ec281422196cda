use super::*;
use crate::session::{MemorySessionStore, Session};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use models::{Role, User};
use time::OffsetDateTime;
use uuid::Uuid;

const NOW: i64 = 1_700_000_000;

fn session_expiring_at(exp: i64) -> Session {
    let body = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&serde_json::json!({"exp": exp})).unwrap());
    Session::new(
        format!("h.{body}.s"),
        User {
            id: Uuid::new_v4(),
            name: "U".into(),
            email: "u@example.com".into(),
            role: Role::Member,
            picture: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        },
    )
}

fn watch_over(session: Session) -> (TokenWatch, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::new(session));
    (TokenWatch::new(store.clone()), store)
}

#[test]
fn valid_when_far_from_expiry() {
    let (watch, _) = watch_over(session_expiring_at(NOW + 3_600));
    assert_eq!(watch.check_at(NOW).unwrap(), TokenStatus::Valid);
}

#[test]
fn expiring_soon_inside_warn_window() {
    let (watch, store) = watch_over(session_expiring_at(NOW + 120));
    assert_eq!(watch.check_at(NOW).unwrap(), TokenStatus::ExpiringSoon { remaining_secs: 120 });
    assert!(!store.load().unwrap().is_empty());
}

#[test]
fn warn_window_is_configurable() {
    let (watch, _) = watch_over(session_expiring_at(NOW + 120));
    let watch = watch.with_warn_window(Duration::from_secs(60));
    assert_eq!(watch.check_at(NOW).unwrap(), TokenStatus::Valid);
}

#[test]
fn expired_token_clears_session() {
    let (watch, store) = watch_over(session_expiring_at(NOW - 1));
    assert_eq!(watch.check_at(NOW).unwrap(), TokenStatus::Expired);
    assert!(store.load().unwrap().is_empty());
    assert_eq!(watch.check_at(NOW).unwrap(), TokenStatus::SignedOut);
}

#[test]
fn token_expiring_exactly_now_is_still_valid() {
    let (watch, _) = watch_over(session_expiring_at(NOW));
    assert_eq!(watch.check_at(NOW).unwrap(), TokenStatus::ExpiringSoon { remaining_secs: 0 });
}

#[test]
fn no_token_is_signed_out() {
    let (watch, _) = watch_over(Session::default());
    assert_eq!(watch.check_at(NOW).unwrap(), TokenStatus::SignedOut);
}

#[tokio::test]
async fn spawned_watch_reports_expiry_and_stops() {
    let (watch, store) = watch_over(session_expiring_at(1));
    let (mut rx, handle) = watch.with_interval(Duration::from_millis(10)).spawn();

    assert_eq!(rx.recv().await, Some(TokenStatus::Expired));
    assert_eq!(rx.recv().await, None);
    handle.await.unwrap();
    assert!(store.load().unwrap().is_empty());
}

#[tokio::test]
async fn spawned_watch_stops_when_receiver_dropped() {
    let far = token::now_unix() + 86_400;
    let (watch, _) = watch_over(session_expiring_at(far));
    let (mut rx, handle) = watch.with_interval(Duration::from_millis(5)).spawn();

    assert_eq!(rx.recv().await, Some(TokenStatus::Valid));
    drop(rx);
    handle.await.unwrap();
}
