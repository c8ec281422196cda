use super::*;
use time::OffsetDateTime;
use uuid::Uuid;

fn auth_user(role: Role) -> AuthUser {
    AuthUser {
        user: User {
            id: Uuid::new_v4(),
            name: "Test".into(),
            email: "test@example.com".into(),
            role,
            picture: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        },
    }
}

// =============================================================================
// bearer_token
// =============================================================================

#[test]
fn bearer_token_extracts_token() {
    assert_eq!(bearer_token("Bearer abc.def.ghi"), Some("abc.def.ghi"));
}

#[test]
fn bearer_token_scheme_is_case_insensitive() {
    assert_eq!(bearer_token("bearer tok"), Some("tok"));
    assert_eq!(bearer_token("BEARER tok"), Some("tok"));
}

#[test]
fn bearer_token_rejects_other_schemes_and_blanks() {
    assert_eq!(bearer_token("Basic dXNlcjpwYXNz"), None);
    assert_eq!(bearer_token("Bearer"), None);
    assert_eq!(bearer_token("Bearer    "), None);
    assert_eq!(bearer_token(""), None);
}

// =============================================================================
// role guards
// =============================================================================

#[test]
fn require_admin_allows_only_admins() {
    assert!(auth_user(Role::Admin).require_admin().is_ok());
    assert!(matches!(auth_user(Role::CoreMember).require_admin(), Err(ApiError::Forbidden(_))));
    assert!(matches!(auth_user(Role::Member).require_admin(), Err(ApiError::Forbidden(_))));
}

#[test]
fn require_any_checks_membership() {
    let core = auth_user(Role::CoreMember);
    assert!(core.require_any(&[Role::CoreMember, Role::Admin]).is_ok());
    assert!(core.require_any(&[Role::Admin]).is_err());
}
