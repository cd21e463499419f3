//! Integration tests for database operations.

use media_shelf::db::{
    add_item_tags, delete_item, get_file_group_by_item, get_file_origins, get_files, get_item,
    get_item_tags, get_link, get_link_by_item, get_media_variants, get_or_create_tag,
    insert_file, insert_file_group, insert_item, insert_link, list_items, list_tags,
    replace_media_variants, replace_prefixed_item_tags, set_item_tags, update_item, Database,
    ItemKind, ItemOrder, ItemUpdate, NewFile, NewItem, LATEST_VERSION,
};
use media_shelf::resolver::{MediaType, MediaVariant};
use tempfile::TempDir;

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

async fn new_link(db: &Database, url: &str) -> (i64, i64) {
    let item_id = insert_item(
        db.pool(),
        &NewItem {
            name: "Saved post".to_string(),
            kind: ItemKind::Link,
            date_of_origin: None,
        },
    )
    .await
    .expect("Failed to insert item");
    let link_id = insert_link(db.pool(), item_id, url)
        .await
        .expect("Failed to insert link");
    (item_id, link_id)
}

fn variant(hd: &str, sd: &str, media_type: MediaType, order: u32) -> MediaVariant {
    MediaVariant {
        hd_url: hd.to_string(),
        sd_url: sd.to_string(),
        media_type,
        order,
    }
}

fn file(name: &str, origin: &str) -> NewFile {
    NewFile {
        file_name: name.to_string(),
        file_type: String::new(),
        file_origin: origin.to_string(),
        file_url: None,
    }
}

#[tokio::test]
async fn test_open_creates_directory_and_migrates() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("nested/dir/shelf.sqlite");

    let db = Database::new(&db_path).await.expect("Failed to open database");
    assert!(db_path.exists());
    assert_eq!(db.schema_version().await.unwrap(), LATEST_VERSION);

    // Reopening an up-to-date database is a no-op.
    drop(db);
    let db = Database::new(&db_path).await.expect("Failed to reopen database");
    assert_eq!(db.schema_version().await.unwrap(), LATEST_VERSION);
}

#[tokio::test]
async fn test_insert_and_get_item() {
    let (db, _temp_dir) = setup_db().await;

    let item_id = insert_item(
        db.pool(),
        &NewItem {
            name: "A post".to_string(),
            kind: ItemKind::Link,
            date_of_origin: Some("2024-05-01".to_string()),
        },
    )
    .await
    .expect("Failed to insert item");

    let item = get_item(db.pool(), item_id)
        .await
        .expect("Failed to get item")
        .expect("Item not found");
    assert_eq!(item.name, "A post");
    assert_eq!(item.kind, ItemKind::Link);
    assert_eq!(item.date_of_origin.as_deref(), Some("2024-05-01"));
    assert!(!item.created_at.is_empty());
}

#[tokio::test]
async fn test_get_or_create_tag_is_idempotent() {
    let (db, _temp_dir) = setup_db().await;

    let first = get_or_create_tag(db.pool(), "cats").await.unwrap();
    let second = get_or_create_tag(db.pool(), "cats").await.unwrap();
    assert_eq!(first, second);

    let tags = list_tags(db.pool()).await.unwrap();
    assert_eq!(tags.len(), 1);
}

#[tokio::test]
async fn test_tag_names_with_commas_are_rejected() {
    let (db, _temp_dir) = setup_db().await;

    assert!(get_or_create_tag(db.pool(), "cats,dogs").await.is_err());
    assert!(list_tags(db.pool()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_set_item_tags_replaces_and_add_keeps() {
    let (db, _temp_dir) = setup_db().await;
    let (item_id, _) = new_link(&db, "https://twitter.com/alice/status/1").await;

    add_item_tags(db.pool(), item_id, &["favorite", "src-twitter"])
        .await
        .unwrap();
    add_item_tags(db.pool(), item_id, &["favorite", "later"])
        .await
        .unwrap();
    let names: Vec<String> = get_item_tags(db.pool(), item_id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["favorite", "later", "src-twitter"]);

    set_item_tags(db.pool(), item_id, &["src-reddit"])
        .await
        .unwrap();
    let names: Vec<String> = get_item_tags(db.pool(), item_id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["src-reddit"]);
}

#[tokio::test]
async fn test_replace_media_variants_swaps_whole_set() {
    let (db, _temp_dir) = setup_db().await;
    let (_, link_id) = new_link(&db, "https://twitter.com/alice/status/1").await;

    let first = vec![
        variant("https://v/1080.mp4", "https://v/480.mp4", MediaType::Video, 0),
        variant("https://i/a?name=orig", "https://i/a", MediaType::Image, 1),
        variant("https://i/b?name=orig", "https://i/b", MediaType::Image, 2),
    ];
    replace_media_variants(db.pool(), link_id, &first)
        .await
        .unwrap();
    assert_eq!(get_media_variants(db.pool(), link_id).await.unwrap().len(), 3);

    let second = vec![
        variant("https://i/c?name=orig", "https://i/c", MediaType::Image, 0),
        variant("https://i/d?name=orig", "https://i/d", MediaType::Image, 1),
    ];
    replace_media_variants(db.pool(), link_id, &second)
        .await
        .unwrap();

    let rows = get_media_variants(db.pool(), link_id).await.unwrap();
    let stored: Vec<MediaVariant> = rows.iter().map(|r| r.to_variant()).collect();
    assert_eq!(stored, second);

    let link = get_link(db.pool(), link_id).await.unwrap().unwrap();
    assert_eq!(link.media_url.as_deref(), Some("https://i/c?name=orig"));
}

#[tokio::test]
async fn test_replace_with_empty_set_clears_media_url() {
    let (db, _temp_dir) = setup_db().await;
    let (_, link_id) = new_link(&db, "https://twitter.com/alice/status/1").await;

    replace_media_variants(
        db.pool(),
        link_id,
        &[variant("https://v/hd.mp4", "https://v/sd.mp4", MediaType::Video, 0)],
    )
    .await
    .unwrap();
    replace_media_variants(db.pool(), link_id, &[]).await.unwrap();

    assert!(get_media_variants(db.pool(), link_id).await.unwrap().is_empty());
    let link = get_link(db.pool(), link_id).await.unwrap().unwrap();
    assert!(link.media_url.is_none());
}

#[tokio::test]
async fn test_failed_replace_keeps_previous_variants() {
    let (db, _temp_dir) = setup_db().await;
    let (_, link_id) = new_link(&db, "https://twitter.com/alice/status/1").await;

    let first = vec![
        variant("https://v/1080.mp4", "https://v/480.mp4", MediaType::Video, 0),
        variant("https://i/a?name=orig", "https://i/a", MediaType::Image, 1),
        variant("https://i/b?name=orig", "https://i/b", MediaType::Image, 2),
    ];
    replace_media_variants(db.pool(), link_id, &first)
        .await
        .unwrap();

    // Fail the second insert of the next replace.
    sqlx::query(
        r"
        CREATE TRIGGER fail_second_variant BEFORE INSERT ON media_variants
        WHEN NEW.position = 1
        BEGIN SELECT RAISE(ABORT, 'variant insert failed'); END
        ",
    )
    .execute(db.pool())
    .await
    .unwrap();

    let second = vec![
        variant("https://i/c?name=orig", "https://i/c", MediaType::Image, 0),
        variant("https://i/d?name=orig", "https://i/d", MediaType::Image, 1),
    ];
    assert!(replace_media_variants(db.pool(), link_id, &second)
        .await
        .is_err());

    let stored: Vec<MediaVariant> = get_media_variants(db.pool(), link_id)
        .await
        .unwrap()
        .iter()
        .map(|r| r.to_variant())
        .collect();
    assert_eq!(stored, first);
    let link = get_link(db.pool(), link_id).await.unwrap().unwrap();
    assert_eq!(link.media_url.as_deref(), Some("https://v/1080.mp4"));
}

#[tokio::test]
async fn test_replace_for_missing_link_keeps_nothing() {
    let (db, _temp_dir) = setup_db().await;

    let result = replace_media_variants(
        db.pool(),
        9999,
        &[variant("https://v/hd.mp4", "https://v/sd.mp4", MediaType::Video, 0)],
    )
    .await;
    assert!(result.is_err());
    assert!(get_media_variants(db.pool(), 9999).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_item_cascades() {
    let (db, _temp_dir) = setup_db().await;
    let (item_id, link_id) = new_link(&db, "https://twitter.com/alice/status/1").await;
    replace_media_variants(
        db.pool(),
        link_id,
        &[variant("https://v/hd.mp4", "https://v/sd.mp4", MediaType::Video, 0)],
    )
    .await
    .unwrap();
    add_item_tags(db.pool(), item_id, &["favorite"]).await.unwrap();

    assert!(delete_item(db.pool(), item_id).await.unwrap());
    assert!(!delete_item(db.pool(), item_id).await.unwrap());

    assert!(get_link_by_item(db.pool(), item_id).await.unwrap().is_none());
    assert!(get_media_variants(db.pool(), link_id).await.unwrap().is_empty());
    // Tags themselves outlive the items using them.
    assert_eq!(list_tags(db.pool()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_file_group_origins() {
    let (db, _temp_dir) = setup_db().await;

    let item_id = insert_item(
        db.pool(),
        &NewItem {
            name: "Scans".to_string(),
            kind: ItemKind::FileGroup,
            date_of_origin: None,
        },
    )
    .await
    .unwrap();
    let group_id = insert_file_group(db.pool(), item_id, "Holiday scans")
        .await
        .unwrap();

    for f in [
        file("a.png", "gdrive"),
        file("b.png", "upload"),
        file("c.png", "gdrive"),
        file("d.png", ""),
    ] {
        insert_file(db.pool(), group_id, &f).await.unwrap();
    }

    assert_eq!(get_files(db.pool(), group_id).await.unwrap().len(), 4);
    assert_eq!(
        get_file_origins(db.pool(), group_id).await.unwrap(),
        vec!["gdrive", "upload"]
    );

    let group = get_file_group_by_item(db.pool(), item_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(group.id, group_id);
    assert_eq!(group.description, "Holiday scans");
}

#[tokio::test]
async fn test_replace_prefixed_item_tags_keeps_other_tags() {
    let (db, _temp_dir) = setup_db().await;
    let (item_id, _) = new_link(&db, "https://twitter.com/alice/status/1").await;
    add_item_tags(
        db.pool(),
        item_id,
        &["favorite", "src-twitter", "user-alice", "SRC-caps"],
    )
    .await
    .unwrap();

    replace_prefixed_item_tags(
        db.pool(),
        item_id,
        &["src-", "user-"],
        &["src-reddit", "user-bob"],
    )
    .await
    .unwrap();

    let names: Vec<String> = get_item_tags(db.pool(), item_id)
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect();
    assert_eq!(names, vec!["SRC-caps", "favorite", "src-reddit", "user-bob"]);
}

#[tokio::test]
async fn test_writes_in_a_rolled_back_transaction_vanish() {
    let (db, _temp_dir) = setup_db().await;

    let mut tx = db.pool().begin().await.unwrap();
    let item_id = insert_item(
        &mut *tx,
        &NewItem {
            name: "Draft".to_string(),
            kind: ItemKind::Link,
            date_of_origin: None,
        },
    )
    .await
    .unwrap();
    let link_id = insert_link(&mut *tx, item_id, "https://twitter.com/alice/status/1")
        .await
        .unwrap();
    replace_media_variants(
        &mut *tx,
        link_id,
        &[variant("https://v/hd.mp4", "https://v/sd.mp4", MediaType::Video, 0)],
    )
    .await
    .unwrap();
    add_item_tags(&mut *tx, item_id, &["favorite"]).await.unwrap();
    tx.rollback().await.unwrap();

    assert!(get_item(db.pool(), item_id).await.unwrap().is_none());
    assert!(get_media_variants(db.pool(), link_id).await.unwrap().is_empty());
    assert!(list_tags(db.pool()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_items_orderings() {
    let (db, _temp_dir) = setup_db().await;
    for name in ["beta", "alpha", "gamma"] {
        insert_item(
            db.pool(),
            &NewItem {
                name: name.to_string(),
                kind: ItemKind::Link,
                date_of_origin: None,
            },
        )
        .await
        .unwrap();
    }

    let names = |items: Vec<media_shelf::db::Item>| -> Vec<String> {
        items.into_iter().map(|i| i.name).collect()
    };

    assert_eq!(
        names(list_items(db.pool(), ItemOrder::default()).await.unwrap()),
        vec!["gamma", "alpha", "beta"]
    );
    assert_eq!(
        names(list_items(db.pool(), ItemOrder::CreatedAsc).await.unwrap()),
        vec!["beta", "alpha", "gamma"]
    );
    assert_eq!(
        names(list_items(db.pool(), ItemOrder::NameAsc).await.unwrap()),
        vec!["alpha", "beta", "gamma"]
    );
    assert_eq!(
        names(list_items(db.pool(), ItemOrder::NameDesc).await.unwrap()),
        vec!["gamma", "beta", "alpha"]
    );

    assert_eq!(ItemOrder::parse("-created_at"), Some(ItemOrder::CreatedDesc));
    assert_eq!(ItemOrder::parse("kind"), None);
}

#[tokio::test]
async fn test_update_item_fields() {
    let (db, _temp_dir) = setup_db().await;
    let (item_id, _) = new_link(&db, "https://twitter.com/alice/status/1").await;

    let renamed = ItemUpdate {
        name: Some("Renamed".to_string()),
        date_of_origin: Some(Some("2020-01-02".to_string())),
    };
    assert!(update_item(db.pool(), item_id, &renamed).await.unwrap());
    let item = get_item(db.pool(), item_id).await.unwrap().unwrap();
    assert_eq!(item.name, "Renamed");
    assert_eq!(item.date_of_origin.as_deref(), Some("2020-01-02"));

    // Untouched fields keep their values.
    let clear_date = ItemUpdate {
        name: None,
        date_of_origin: Some(None),
    };
    assert!(update_item(db.pool(), item_id, &clear_date).await.unwrap());
    let item = get_item(db.pool(), item_id).await.unwrap().unwrap();
    assert_eq!(item.name, "Renamed");
    assert!(item.date_of_origin.is_none());

    assert!(!update_item(db.pool(), 9999, &ItemUpdate::default())
        .await
        .unwrap());
}
