use super::*;
#[cfg(feature = "live-db-tests")]
use crate::db::test_support::integration_pool;
use models::Role;

fn upload(filename: &str, bytes: &[u8]) -> Upload {
    Upload {
        event_id: Uuid::nil(),
        filename: filename.into(),
        content_type: Some("image/png".into()),
        category: None,
        bytes: bytes.to_vec(),
    }
}

fn user(role: Role) -> User {
    User {
        id: Uuid::new_v4(),
        name: "Uploader".into(),
        email: "uploader@example.com".into(),
        role,
        picture: None,
        created_at: OffsetDateTime::UNIX_EPOCH,
    }
}

fn stored_file(uploader_id: Uuid) -> EventFile {
    EventFile {
        id: Uuid::new_v4(),
        event_id: Uuid::nil(),
        uploader_id,
        filename: "flyer.png".into(),
        storage_key: "events/x/y-flyer.png".into(),
        mime_type: "image/png".into(),
        size: 3,
        category: FileCategory::Photo,
        sha256: String::new(),
        uploaded_at: OffsetDateTime::UNIX_EPOCH,
    }
}

#[test]
fn validate_upload_accepts_normal_file() {
    assert!(validate_upload(&upload("flyer.png", b"png"), 10).is_ok());
}

#[test]
fn validate_upload_rejects_empty_name_or_body() {
    assert!(matches!(validate_upload(&upload("  ", b"png"), 10), Err(FileError::Validation(_))));
    assert!(matches!(validate_upload(&upload("flyer.png", b""), 10), Err(FileError::Validation(_))));
}

#[test]
fn validate_upload_enforces_limit() {
    assert!(validate_upload(&upload("a.bin", &[0; 10]), 10).is_ok());
    assert!(matches!(
        validate_upload(&upload("a.bin", &[0; 11]), 10),
        Err(FileError::TooLarge { size: 11, max: 10 })
    ));
}

#[test]
fn resolve_mime_falls_back_to_octet_stream() {
    assert_eq!(resolve_mime(None), DEFAULT_MIME);
    assert_eq!(resolve_mime(Some("  ")), DEFAULT_MIME);
    assert_eq!(resolve_mime(Some("application/pdf")), "application/pdf");
}

#[test]
fn uploader_and_admin_can_delete() {
    let uploader = user(Role::Member);
    let file = stored_file(uploader.id);
    assert!(ensure_can_delete(&uploader, &file).is_ok());
    assert!(ensure_can_delete(&user(Role::Admin), &file).is_ok());
    assert!(matches!(ensure_can_delete(&user(Role::CoreMember), &file), Err(FileError::Forbidden(_))));
}

#[test]
fn file_from_tuple_unknown_category_is_other() {
    let row: FileTuple = (
        Uuid::nil(),
        Uuid::nil(),
        Uuid::nil(),
        "a.txt".into(),
        "events/a".into(),
        "text/plain".into(),
        1,
        "mystery".into(),
        String::new(),
        OffsetDateTime::UNIX_EPOCH,
    );
    assert_eq!(file_from_tuple(row).category, FileCategory::Other);
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn upload_list_download_delete() {
    use crate::services::storage::LocalBlobStore;

    let pool = integration_pool().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let store = LocalBlobStore::new(dir.path());

    let uploader_id: Uuid =
        sqlx::query_scalar("INSERT INTO users (name, email, role) VALUES ('U', 'u@example.com', 'member') RETURNING id")
            .fetch_one(&pool)
            .await
            .expect("seed user");
    let event_id: Uuid = sqlx::query_scalar(
        "INSERT INTO events (title, organizer_id, start_time, end_time) VALUES ('E', $1, now(), now() + interval '1 hour') RETURNING id",
    )
    .bind(uploader_id)
    .fetch_one(&pool)
    .await
    .expect("seed event");
    let mut uploader = user(Role::Member);
    uploader.id = uploader_id;

    let mut req = upload("photo one.png", b"pngdata");
    req.event_id = event_id;
    let file = upload_file(&pool, &store, &uploader, req, 1024).await.expect("upload");
    assert_eq!(file.category, FileCategory::Photo);
    assert_eq!(file.size, 7);
    assert_eq!(file.sha256, sha256_hex(b"pngdata"));
    assert!(file.storage_key.ends_with("-photo_one.png"));

    let listed = list_files(&pool, Some(event_id), Some(FileCategory::Photo)).await.expect("list");
    assert_eq!(listed.len(), 1);
    assert!(list_files(&pool, Some(event_id), Some(FileCategory::Report)).await.expect("list").is_empty());

    let (_, bytes) = download_file(&pool, &store, file.id).await.expect("download");
    assert_eq!(bytes, b"pngdata");

    let mut missing = upload("x.png", b"x");
    missing.event_id = Uuid::new_v4();
    assert!(matches!(
        upload_file(&pool, &store, &uploader, missing, 1024).await,
        Err(FileError::EventNotFound(_))
    ));

    delete_file(&pool, &store, &uploader, file.id).await.expect("delete");
    assert!(matches!(get_file(&pool, file.id).await, Err(FileError::NotFound(_))));
    assert!(matches!(store.get(&file.storage_key).await, Err(StorageError::NotFound(_))));
}

#[cfg(feature = "live-db-tests")]
async fn seed_event(pool: &PgPool, email: &str) -> (User, Uuid) {
    let uploader_id: Uuid =
        sqlx::query_scalar("INSERT INTO users (name, email, role) VALUES ('U', $1, 'core_member') RETURNING id")
            .bind(email)
            .fetch_one(pool)
            .await
            .expect("seed user");
    let event_id: Uuid = sqlx::query_scalar(
        "INSERT INTO events (title, organizer_id, start_time, end_time, status) \
         VALUES ('E', $1, now(), now() + interval '1 hour', 'approved') RETURNING id",
    )
    .bind(uploader_id)
    .fetch_one(pool)
    .await
    .expect("seed event");
    let mut uploader = user(Role::CoreMember);
    uploader.id = uploader_id;
    (uploader, event_id)
}

#[cfg(feature = "live-db-tests")]
fn stored_blob_count(root: &std::path::Path) -> usize {
    fn walk(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir).map_or(0, |entries| {
            entries
                .flatten()
                .map(|entry| {
                    let path = entry.path();
                    if path.is_dir() { walk(&path) } else { 1 }
                })
                .sum()
        })
    }
    walk(root)
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn upload_to_archived_event_is_rejected() {
    use crate::services::storage::LocalBlobStore;

    let pool = integration_pool().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let store = LocalBlobStore::new(dir.path());
    let (uploader, event_id) = seed_event(&pool, "archived@example.com").await;

    sqlx::query("UPDATE events SET status = 'archived', archived_at = now() WHERE id = $1")
        .bind(event_id)
        .execute(&pool)
        .await
        .expect("archive");

    let mut req = upload("late.png", b"png");
    req.event_id = event_id;
    let err = upload_file(&pool, &store, &uploader, req, 1024).await.unwrap_err();
    assert!(matches!(err, FileError::EventArchived(id) if id == event_id));
    assert!(list_files(&pool, Some(event_id), None).await.expect("list").is_empty());
    assert_eq!(stored_blob_count(dir.path()), 0);
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn upload_waits_for_in_flight_archive() {
    use crate::services::storage::LocalBlobStore;
    use std::sync::Arc;

    let pool = integration_pool().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(LocalBlobStore::new(dir.path()));
    let (uploader, event_id) = seed_event(&pool, "racer@example.com").await;

    // Hold the row lock an archive takes, then start the upload behind it.
    let mut archiver = pool.begin().await.expect("begin");
    sqlx::query("SELECT id FROM events WHERE id = $1 FOR UPDATE")
        .bind(event_id)
        .execute(&mut *archiver)
        .await
        .expect("lock event");

    let upload_task = {
        let pool = pool.clone();
        let store = Arc::clone(&store);
        let mut req = upload("racing.png", b"png");
        req.event_id = event_id;
        tokio::spawn(async move { upload_file(&pool, store.as_ref(), &uploader, req, 1024).await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    assert!(!upload_task.is_finished());

    sqlx::query("UPDATE events SET status = 'archived', archived_at = now() WHERE id = $1")
        .bind(event_id)
        .execute(&mut *archiver)
        .await
        .expect("archive");
    archiver.commit().await.expect("commit");

    let result = upload_task.await.expect("join");
    assert!(matches!(result, Err(FileError::EventArchived(_))));
    assert!(list_files(&pool, Some(event_id), None).await.expect("list").is_empty());
    assert_eq!(stored_blob_count(dir.path()), 0);
}
