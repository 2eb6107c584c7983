use sqlx::PgPool;
use std::sync::Arc;
use url_vault::domain::entities::Resolution;
use url_vault::domain::repositories::LinkRepository;
use url_vault::infrastructure::persistence::PgLinkRepository;

fn repo(pool: PgPool) -> PgLinkRepository {
    PgLinkRepository::new(Arc::new(pool))
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_link(pool: PgPool) {
    let repo = repo(pool);

    let created = repo.create("u1", "https://example.com").await.unwrap();

    assert!(!created.conflict);
    assert_eq!(created.short_id.len(), 8);
    assert_eq!(
        repo.resolve(&created.short_id).await.unwrap(),
        Resolution::Live("https://example.com".to_string())
    );
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_duplicate_returns_existing(pool: PgPool) {
    let repo = repo(pool);

    let first = repo.create("u1", "https://example.com").await.unwrap();
    let second = repo.create("u2", "https://example.com").await.unwrap();

    assert!(second.conflict);
    assert_eq!(first.short_id, second.short_id);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_rejects_invalid_url(pool: PgPool) {
    let repo = repo(pool);

    assert!(repo.create("u1", "").await.is_err());
    assert!(repo.create("u1", "ftp://example.com").await.is_err());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_resolve_unknown(pool: PgPool) {
    let repo = repo(pool);

    assert_eq!(repo.resolve("notfound").await.unwrap(), Resolution::NotFound);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_batch_mixed(pool: PgPool) {
    let repo = repo(pool);
    let existing = repo.create("u1", "https://example.com/a").await.unwrap();

    let urls = vec![
        "https://example.com/a".to_string(),
        "https://example.com/b".to_string(),
    ];
    let ids = repo.create_batch("u1", &urls).await.unwrap();

    assert_eq!(ids.len(), 2);
    assert_eq!(ids["https://example.com/a"], existing.short_id);
    assert_ne!(ids["https://example.com/b"], existing.short_id);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_create_batch_invalid_url_applies_nothing(pool: PgPool) {
    let repo = repo(pool);

    let urls = vec![
        "https://example.com/ok".to_string(),
        "not a url".to_string(),
    ];
    assert!(repo.create_batch("u1", &urls).await.is_err());

    assert!(repo.list_by_owner("u1").await.unwrap().is_empty());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_list_by_owner_most_recent_first(pool: PgPool) {
    let repo = repo(pool);

    repo.create("u1", "https://example.com/1").await.unwrap();
    repo.create("u1", "https://example.com/2").await.unwrap();
    repo.create("u2", "https://example.com/3").await.unwrap();

    let links = repo.list_by_owner("u1").await.unwrap();

    assert_eq!(links.len(), 2);
    assert_eq!(links[0].original_url, "https://example.com/2");
    assert_eq!(links[1].original_url, "https://example.com/1");
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_mark_deleted_owner_scoped(pool: PgPool) {
    let repo = repo(pool);
    let mine = repo.create("u1", "https://example.com/mine").await.unwrap();
    let theirs = repo.create("u2", "https://example.com/theirs").await.unwrap();

    let changed = repo
        .mark_deleted(
            "u1",
            &[mine.short_id.clone(), theirs.short_id.clone(), "missing1".to_string()],
        )
        .await
        .unwrap();

    assert_eq!(changed, 1);
    assert_eq!(repo.resolve(&mine.short_id).await.unwrap(), Resolution::Deleted);
    assert!(matches!(
        repo.resolve(&theirs.short_id).await.unwrap(),
        Resolution::Live(_)
    ));
    assert!(repo.list_by_owner("u1").await.unwrap().is_empty());
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_mark_deleted_is_idempotent(pool: PgPool) {
    let repo = repo(pool);
    let link = repo.create("u1", "https://example.com").await.unwrap();
    let ids = vec![link.short_id.clone()];

    assert_eq!(repo.mark_deleted("u1", &ids).await.unwrap(), 1);
    assert_eq!(repo.mark_deleted("u1", &ids).await.unwrap(), 0);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_deleted_url_stays_reserved(pool: PgPool) {
    let repo = repo(pool);
    let link = repo.create("u1", "https://example.com").await.unwrap();
    repo.mark_deleted("u1", std::slice::from_ref(&link.short_id))
        .await
        .unwrap();

    let again = repo.create("u1", "https://example.com").await.unwrap();

    assert!(again.conflict);
    assert_eq!(again.short_id, link.short_id);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_find_by_short_ids(pool: PgPool) {
    let repo = repo(pool);
    let link = repo.create("u1", "https://example.com").await.unwrap();

    let found = repo
        .find_by_short_ids(&[link.short_id.clone(), "missing1".to_string()])
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].owner_id, "u1");
    assert!(!found[0].is_deleted);
}

#[sqlx::test]
#[ignore = "requires DATABASE_URL"]
async fn test_counts_and_ping(pool: PgPool) {
    let repo = repo(pool);
    let link = repo.create("u1", "https://example.com/1").await.unwrap();
    repo.create("u1", "https://example.com/2").await.unwrap();
    repo.mark_deleted("u1", &[link.short_id]).await.unwrap();

    repo.ping().await.unwrap();

    let counts = repo.counts().await.unwrap();
    assert_eq!(counts.live, 1);
    assert_eq!(counts.deleted, 1);
}
