//! Postgres-backed lead and cursor stores.
//!
//! These need Docker; run with `cargo test -- --ignored`.

mod common;

use crate::common::{new_lead, TestHarness};
use leadgen_core::domains::discovery::{CursorKey, CursorStore, PaginationCursor, PgCursorStore};
use leadgen_core::domains::leads::{LeadStore, PatchError, PgLeadStore, StoreError};
use serde_json::json;
use test_context::test_context;
use uuid::Uuid;

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4())
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn test_upsert_is_idempotent(ctx: &TestHarness) {
    let store = PgLeadStore::new(ctx.db_pool.clone());
    let external_id = unique("place");

    let (first, created) = store
        .upsert(new_lead(&external_id, "Padaria Boa Vista"))
        .await
        .unwrap();
    assert!(created);

    let (second, created) = store
        .upsert(new_lead(&external_id, "Padaria Renomeada"))
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(first.id, second.id);
    assert_eq!(second.business_name, "Padaria Boa Vista");
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn test_publish_mark_survives_rediscovery(ctx: &TestHarness) {
    let store = PgLeadStore::new(ctx.db_pool.clone());
    let external_id = unique("place");

    let (lead, _) = store.upsert(new_lead(&external_id, "Padaria")).await.unwrap();
    assert!(lead.published_at.is_none());

    let (again, _) = store.upsert(new_lead(&external_id, "Padaria")).await.unwrap();
    assert!(again.published_at.is_none());

    store.mark_published(lead.id).await.unwrap();
    let first_mark = store.get(lead.id).await.unwrap().unwrap().published_at;
    assert!(first_mark.is_some());

    store.mark_published(lead.id).await.unwrap();
    let (again, _) = store.upsert(new_lead(&external_id, "Padaria")).await.unwrap();
    assert_eq!(again.published_at, first_mark);
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn test_upsert_rejects_blank_external_id(ctx: &TestHarness) {
    let store = PgLeadStore::new(ctx.db_pool.clone());
    let err = store.upsert(new_lead("  ", "Sem Id")).await.unwrap_err();
    assert!(matches!(err, StoreError::Invalid(_)));
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn test_patch_field_round_trips_each_kind(ctx: &TestHarness) {
    let store = PgLeadStore::new(ctx.db_pool.clone());
    let (lead, _) = store
        .upsert(new_lead(&unique("place"), "Padaria Boa Vista"))
        .await
        .unwrap();

    store
        .patch_field(lead.id, "RegisteredName", &json!("PADARIA BOA VISTA LTDA"))
        .await
        .unwrap();
    store
        .patch_field(lead.id, "foundation_date", &json!("2010-03-15"))
        .await
        .unwrap();
    store.patch_field(lead.id, "rating", &json!(4.2)).await.unwrap();
    store
        .patch_field(lead.id, "permanently_closed", &json!(true))
        .await
        .unwrap();

    let stored = store.get(lead.id).await.unwrap().unwrap();
    assert_eq!(stored.registered_name, "PADARIA BOA VISTA LTDA");
    assert_eq!(
        stored.foundation_date,
        chrono::NaiveDate::from_ymd_opt(2010, 3, 15)
    );
    assert_eq!(stored.rating, 4.2);
    assert!(stored.permanently_closed);
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn test_patch_unknown_lead_and_field(ctx: &TestHarness) {
    let store = PgLeadStore::new(ctx.db_pool.clone());

    let err = store
        .patch_field(Uuid::new_v4(), "owner", &json!("Maria"))
        .await
        .unwrap_err();
    assert!(matches!(err, PatchError::NotFound(_)));

    let (lead, _) = store
        .upsert(new_lead(&unique("place"), "Padaria Boa Vista"))
        .await
        .unwrap();
    let err = store
        .patch_field(lead.id, "shoe_size", &json!(42))
        .await
        .unwrap_err();
    assert!(matches!(err, PatchError::UnknownField(_)));
}

#[test_context(TestHarness)]
#[tokio::test]
#[ignore = "requires Docker"]
async fn test_cursor_round_trip_keeps_counters_monotonic(ctx: &TestHarness) {
    let store = PgCursorStore::new(ctx.db_pool.clone());
    let key = CursorKey::new(unique("padaria"), "Campinas, SP", 5000);

    assert!(store.load(&key).await.unwrap().is_none());

    let mut cursor = PaginationCursor::start(&key);
    cursor.advance(Some("T1".to_string()), 20);
    cursor.advance(Some("T2".to_string()), 20);
    store.save(&cursor).await.unwrap();

    let loaded = store.load(&key).await.unwrap().unwrap();
    assert_eq!(loaded.next_page_token.as_deref(), Some("T2"));
    assert_eq!(loaded.pages_fetched, 2);
    assert_eq!(loaded.leads_extracted, 40);

    // A stale writer cannot move the counters backwards.
    let mut stale = PaginationCursor::start(&key);
    stale.advance(None, 1);
    store.save(&stale).await.unwrap();

    let loaded = store.load(&key).await.unwrap().unwrap();
    assert_eq!(loaded.next_page_token, None);
    assert_eq!(loaded.pages_fetched, 2);
    assert_eq!(loaded.leads_extracted, 40);
}
