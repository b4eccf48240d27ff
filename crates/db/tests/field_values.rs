//! Integration tests for stored values and repeater instances.

use analog_core::field_kind::FieldType;
use analog_db::models::field::{CreateField, Field};
use analog_db::models::field_group::{CreateFieldGroup, FieldGroup};
use analog_db::models::field_value::{FieldValuePatch, NewFieldValue};
use analog_db::models::media::CreateMedia;
use analog_db::repositories::{FieldGroupRepo, FieldRepo, FieldValueRepo, MediaRepo, RepeaterRepo};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_group(pool: &PgPool, name: &str, repeater: bool) -> FieldGroup {
    let input = CreateFieldGroup {
        name: name.to_string(),
        recipient: "Pages".to_string(),
        condition: None,
        active: None,
        repeater: Some(repeater),
        sortable: Some(repeater),
    };
    FieldGroupRepo::create(pool, &input.normalize().unwrap())
        .await
        .unwrap()
}

async fn seed_field(pool: &PgPool, group_id: i64, title: &str, field_type: FieldType) -> Field {
    let input = CreateField {
        title: title.to_string(),
        slug: None,
        field_type,
        description: None,
        required: false,
        default_val: None,
        parameters: None,
        select_options: None,
        select_labels: None,
    };
    FieldRepo::create(pool, group_id, &input.normalize().unwrap())
        .await
        .unwrap()
}

fn text(field: &Field, value: Option<&str>) -> NewFieldValue {
    NewFieldValue {
        field_id: field.id,
        group_id: field.group_id,
        value: value.map(str::to_string),
        media_id: None,
    }
}

// ---------------------------------------------------------------------------
// Plain values
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_upsert_plain_updates_existing_row(pool: PgPool) {
    let group = seed_group(&pool, "Hero", false).await;
    let title = seed_field(&pool, group.id, "Title", FieldType::Text).await;

    let mut tx = pool.begin().await.unwrap();
    let first = FieldValueRepo::upsert_plain_in(&mut tx, 1, &[text(&title, Some("Hello"))])
        .await
        .unwrap();
    let second = FieldValueRepo::upsert_plain_in(&mut tx, 1, &[text(&title, Some("World"))])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(first[0].id, second[0].id);
    assert_eq!(second[0].value.as_deref(), Some("World"));

    let details = FieldValueRepo::list_plain_details(&pool, 1).await.unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].field_slug, "title");
    assert_eq!(details[0].group_slug, "hero");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_upsert_plain_none_keeps_stored_value(pool: PgPool) {
    let group = seed_group(&pool, "Hero", false).await;
    let title = seed_field(&pool, group.id, "Title", FieldType::Text).await;

    let mut tx = pool.begin().await.unwrap();
    FieldValueRepo::upsert_plain_in(&mut tx, 1, &[text(&title, Some("Keep me"))])
        .await
        .unwrap();
    let rows = FieldValueRepo::upsert_plain_in(&mut tx, 1, &[text(&title, None)])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert_eq!(rows[0].value.as_deref(), Some("Keep me"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_update_batch_is_scoped_to_owner(pool: PgPool) {
    let group = seed_group(&pool, "Hero", false).await;
    let title = seed_field(&pool, group.id, "Title", FieldType::Text).await;

    let mut tx = pool.begin().await.unwrap();
    let mine = FieldValueRepo::upsert_plain_in(&mut tx, 1, &[text(&title, Some("mine"))])
        .await
        .unwrap();
    let updated = FieldValueRepo::update_batch_in(
        &mut tx,
        2,
        &[FieldValuePatch {
            id: mine[0].id,
            value: Some("stolen".into()),
            media_id: None,
        }],
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert!(updated.is_empty());
    let stored = FieldValueRepo::find_by_id(&pool, mine[0].id).await.unwrap().unwrap();
    assert_eq!(stored.value.as_deref(), Some("mine"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_owned_field_ids_skips_other_owners(pool: PgPool) {
    let group = seed_group(&pool, "Hero", false).await;
    let title = seed_field(&pool, group.id, "Title", FieldType::Text).await;

    let mut tx = pool.begin().await.unwrap();
    let mine = FieldValueRepo::upsert_plain_in(&mut tx, 1, &[text(&title, Some("mine"))])
        .await
        .unwrap();
    let theirs = FieldValueRepo::upsert_plain_in(&mut tx, 2, &[text(&title, Some("theirs"))])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let owned = FieldValueRepo::owned_field_ids(&pool, 1, &[mine[0].id, theirs[0].id, 9999])
        .await
        .unwrap();
    assert_eq!(owned, vec![(mine[0].id, title.id)]);
    assert!(FieldValueRepo::owned_field_ids(&pool, 1, &[]).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_media_created_in_rolled_back_tx_is_gone(pool: PgPool) {
    let mut tx = pool.begin().await.unwrap();
    let media = MediaRepo::create_in(
        &mut tx,
        &CreateMedia {
            file_name: "c.png".into(),
            path: "/uploads/c.png".into(),
            content_type: None,
            size_bytes: 1,
        },
    )
    .await
    .unwrap();
    tx.rollback().await.unwrap();

    assert!(MediaRepo::find_by_id(&pool, media.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_clear_file_drops_media_reference(pool: PgPool) {
    let group = seed_group(&pool, "Hero", false).await;
    let image = seed_field(&pool, group.id, "Image", FieldType::Upload).await;
    let media = MediaRepo::create(
        &pool,
        &CreateMedia {
            file_name: "a.png".into(),
            path: "/uploads/a.png".into(),
            content_type: Some("image/png".into()),
            size_bytes: 3,
        },
    )
    .await
    .unwrap();

    let mut tx = pool.begin().await.unwrap();
    let rows = FieldValueRepo::upsert_plain_in(
        &mut tx,
        1,
        &[NewFieldValue {
            media_id: Some(media.id),
            ..text(&image, Some("/uploads/a.png"))
        }],
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let details = FieldValueRepo::list_plain_details(&pool, 1).await.unwrap();
    assert_eq!(details[0].resolved(), Some("/uploads/a.png"));

    let cleared = FieldValueRepo::clear_file(&pool, rows[0].id).await.unwrap().unwrap();
    assert_eq!(cleared.value.as_deref(), Some(""));
    assert_eq!(cleared.media_id, None);
    assert!(FieldValueRepo::clear_file(&pool, 9999).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deleting_media_nulls_reference(pool: PgPool) {
    let group = seed_group(&pool, "Hero", false).await;
    let image = seed_field(&pool, group.id, "Image", FieldType::Upload).await;
    let media = MediaRepo::create(
        &pool,
        &CreateMedia {
            file_name: "b.png".into(),
            path: "/uploads/b.png".into(),
            content_type: None,
            size_bytes: 0,
        },
    )
    .await
    .unwrap();

    let mut tx = pool.begin().await.unwrap();
    let rows = FieldValueRepo::upsert_plain_in(
        &mut tx,
        1,
        &[NewFieldValue {
            media_id: Some(media.id),
            ..text(&image, None)
        }],
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    assert!(MediaRepo::delete(&pool, media.id).await.unwrap());
    let stored = FieldValueRepo::find_by_id(&pool, rows[0].id).await.unwrap().unwrap();
    assert_eq!(stored.media_id, None);
}

// ---------------------------------------------------------------------------
// Repeater instances
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_instance_positions_are_per_owner(pool: PgPool) {
    let group = seed_group(&pool, "Slides", true).await;

    let mut tx = pool.begin().await.unwrap();
    let a1 = RepeaterRepo::create_in(&mut tx, group.id, 1).await.unwrap();
    let a2 = RepeaterRepo::create_in(&mut tx, group.id, 1).await.unwrap();
    let b1 = RepeaterRepo::create_in(&mut tx, group.id, 2).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!((a1.position, a2.position, b1.position), (1, 2, 1));

    let owner_one = RepeaterRepo::list_for_owner(&pool, 1, &[group.id]).await.unwrap();
    assert_eq!(owner_one.len(), 2);
    assert!(owner_one.iter().all(|r| r.owner_id == 1));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_instance_lists_its_values(pool: PgPool) {
    let group = seed_group(&pool, "Slides", true).await;
    let caption = seed_field(&pool, group.id, "Caption", FieldType::Text).await;
    let link = seed_field(&pool, group.id, "Link", FieldType::Url).await;

    let mut tx = pool.begin().await.unwrap();
    let instance = RepeaterRepo::create_in(&mut tx, group.id, 1).await.unwrap();
    let values = FieldValueRepo::insert_for_instance_in(
        &mut tx,
        1,
        instance.id,
        &[text(&caption, Some("One")), text(&link, Some("https://a"))],
    )
    .await
    .unwrap();
    let reloaded = RepeaterRepo::find_by_id_in(&mut tx, instance.id)
        .await
        .unwrap()
        .unwrap();
    tx.commit().await.unwrap();

    assert!(values.iter().all(|v| v.in_repeater));
    assert_eq!(reloaded.values, values.iter().map(|v| v.id).collect::<Vec<_>>());

    let details = FieldValueRepo::list_details_for_instances(&pool, &[instance.id])
        .await
        .unwrap();
    let slugs: Vec<&str> = details.iter().map(|d| d.field_slug.as_str()).collect();
    assert_eq!(slugs, vec!["caption", "link"]);

    // Repeater values never show up as plain values.
    assert!(FieldValueRepo::list_plain_details(&pool, 1).await.unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_set_positions_renumbers(pool: PgPool) {
    let group = seed_group(&pool, "Slides", true).await;

    let mut tx = pool.begin().await.unwrap();
    let a = RepeaterRepo::create_in(&mut tx, group.id, 1).await.unwrap();
    let b = RepeaterRepo::create_in(&mut tx, group.id, 1).await.unwrap();
    let c = RepeaterRepo::create_in(&mut tx, group.id, 1).await.unwrap();

    let locked = RepeaterRepo::ids_for_owner_in(&mut tx, group.id, 1).await.unwrap();
    assert_eq!(locked, vec![a.id, b.id, c.id]);

    let n = RepeaterRepo::set_positions_in(&mut tx, &[c.id, a.id, b.id])
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(n, 3);

    let ordered: Vec<i64> = RepeaterRepo::list_for_owner(&pool, 1, &[group.id])
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(ordered, vec![c.id, a.id, b.id]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_instance_removes_values(pool: PgPool) {
    let group = seed_group(&pool, "Slides", true).await;
    let caption = seed_field(&pool, group.id, "Caption", FieldType::Text).await;

    let mut tx = pool.begin().await.unwrap();
    let instance = RepeaterRepo::create_in(&mut tx, group.id, 1).await.unwrap();
    let values = FieldValueRepo::insert_for_instance_in(&mut tx, 1, instance.id, &[text(&caption, Some("x"))])
        .await
        .unwrap();
    tx.commit().await.unwrap();

    assert!(RepeaterRepo::delete(&pool, instance.id).await.unwrap());
    assert!(FieldValueRepo::find_by_id(&pool, values[0].id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_for_owner_leaves_other_owners(pool: PgPool) {
    let group = seed_group(&pool, "Hero", false).await;
    let title = seed_field(&pool, group.id, "Title", FieldType::Text).await;

    let mut tx = pool.begin().await.unwrap();
    FieldValueRepo::upsert_plain_in(&mut tx, 1, &[text(&title, Some("a"))])
        .await
        .unwrap();
    FieldValueRepo::upsert_plain_in(&mut tx, 2, &[text(&title, Some("b"))])
        .await
        .unwrap();
    let removed = FieldValueRepo::delete_for_owner_in(&mut tx, 1).await.unwrap();
    tx.commit().await.unwrap();

    assert_eq!(removed, 1);
    assert!(FieldValueRepo::list_details_for_owner(&pool, 1).await.unwrap().is_empty());
    assert_eq!(FieldValueRepo::list_details_for_owner(&pool, 2).await.unwrap().len(), 1);
}
