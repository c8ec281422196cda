use super::*;
use uuid::Uuid;

async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn error_body_is_message_object() {
    let response = ApiError::NotFound("event not found".into()).into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await, serde_json::json!({"message": "event not found"}));
}

#[tokio::test]
async fn internal_errors_hide_cause() {
    let response = ApiError::Internal("connection reset by peer".into()).into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["message"], "internal server error");
}

#[test]
fn unauthorized_sets_www_authenticate() {
    let response = ApiError::Unauthorized("token expired".into()).into_response();
    assert_eq!(response.headers().get(header::WWW_AUTHENTICATE).unwrap(), "Bearer");
}

#[test]
fn forbidden_has_no_www_authenticate() {
    let response = ApiError::Forbidden("nope".into()).into_response();
    assert!(response.headers().get(header::WWW_AUTHENTICATE).is_none());
}

#[test]
fn token_errors_are_unauthorized() {
    assert_eq!(ApiError::from(TokenError::Expired).status(), StatusCode::UNAUTHORIZED);
    assert_eq!(ApiError::from(TokenError::Invalid("bad".into())).status(), StatusCode::UNAUTHORIZED);
    assert_eq!(ApiError::from(TokenError::Encode("x".into())).status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[test]
fn auth_errors_map_to_expected_statuses() {
    assert_eq!(ApiError::from(AuthError::InvalidCredentials).status(), StatusCode::UNAUTHORIZED);
    assert_eq!(ApiError::from(AuthError::UnverifiedEmail).status(), StatusCode::UNAUTHORIZED);
    assert_eq!(ApiError::from(AuthError::EmailTaken).status(), StatusCode::CONFLICT);
    assert_eq!(ApiError::from(AuthError::WeakPassword).status(), StatusCode::BAD_REQUEST);
    assert_eq!(ApiError::from(AuthError::TokenExchange("x".into())).status(), StatusCode::BAD_GATEWAY);
}

#[test]
fn user_errors_map_to_expected_statuses() {
    assert_eq!(ApiError::from(UserError::NotFound(Uuid::nil())).status(), StatusCode::NOT_FOUND);
    assert_eq!(ApiError::from(UserError::AdminLocked(Uuid::nil())).status(), StatusCode::FORBIDDEN);
    assert_eq!(ApiError::from(UserError::InvalidRole("x".into())).status(), StatusCode::BAD_REQUEST);
}

#[test]
fn event_errors_map_to_expected_statuses() {
    let transition = EventError::InvalidTransition { status: models::EventStatus::Approved, action: "approve" };
    assert_eq!(ApiError::from(transition).status(), StatusCode::CONFLICT);
    assert_eq!(ApiError::from(EventError::Forbidden("no")).status(), StatusCode::FORBIDDEN);
    assert_eq!(ApiError::from(EventError::Validation("bad".into())).status(), StatusCode::BAD_REQUEST);
}

#[test]
fn file_errors_map_to_expected_statuses() {
    assert_eq!(ApiError::from(FileError::TooLarge { size: 2, max: 1 }).status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(ApiError::from(FileError::EventArchived(Uuid::nil())).status(), StatusCode::CONFLICT);
    assert_eq!(
        ApiError::from(FileError::Storage(StorageError::NotFound("k".into()))).status(),
        StatusCode::NOT_FOUND
    );
}
