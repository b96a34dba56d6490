#![cfg(feature = "postgres_tests")]

//! Runs against the database in `DATABASE_URL`, which must be disposable. The `init-db`
//! test also needs superuser access through `POSTGRES_HOST` / `POSTGRES_PASSWORD`.

use chrono::DateTime;
use history_models::{AccountQuery, CollectorCursor, Config, FileSequence, Payment, Trustline};
use history_store::{bootstrap, BootstrapOptions, HistoryStore, PgStore};
use sqlx::Executor;

async fn fresh_store() -> PgStore {
    let mut config = Config::default().database;
    config.url = Some(std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"));
    let store = PgStore::connect(&config).await.unwrap();
    store
        .pool()
        .execute("DROP TABLE IF EXISTS payments, trustlines, lastfile")
        .await
        .unwrap();
    store.migrate().await.unwrap();
    store
}

fn payment(tx: &str, op_index: u32, ledger: u32) -> Payment {
    Payment {
        source: "GSOURCE".to_string(),
        destination: "GDEST".to_string(),
        amount: 150_000,
        memo_text: Some("1-test-order".to_string()),
        tx_hash: tx.to_string(),
        op_index,
        ledger_sequence: ledger,
        time: DateTime::from_timestamp(1_546_300_800, 0).unwrap(),
    }
}

#[tokio::test]
async fn test_commit_is_idempotent_and_moves_cursor() {
    let store = fresh_store().await;
    assert!(store.cursor().await.unwrap().is_none());

    store.seed_cursor(FileSequence::new(0x3f)).await.unwrap();
    assert_eq!(
        store.cursor().await.unwrap(),
        Some(CollectorCursor::pending(FileSequence::new(0x3f)))
    );

    let payments = vec![payment("aa", 0, 10), payment("bb", 0, 20)];
    let trustlines = vec![Trustline {
        source: "GSOURCE".to_string(),
        limit: i64::MAX,
        memo_text: None,
        tx_hash: "cc".to_string(),
        op_index: 0,
        ledger_sequence: 15,
        time: DateTime::from_timestamp(1_546_300_900, 0).unwrap(),
    }];
    for _ in 0..2 {
        store
            .commit_checkpoint(FileSequence::new(0x3f), &payments, &trustlines)
            .await
            .unwrap();
    }

    let query = AccountQuery::new("GSOURCE", None);
    let found = store.payments_by_source(&query).await.unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].tx_hash, "bb");
    assert_eq!(found[1], payments[0]);

    assert_eq!(store.trustlines_by_source(&query).await.unwrap(), trustlines);
    assert_eq!(
        store.payment_by_hash("aa").await.unwrap(),
        Some(payments[0].clone())
    );
    assert_eq!(
        store.cursor().await.unwrap(),
        Some(CollectorCursor::processed(FileSequence::new(0x3f)))
    );
    store.ping().await.unwrap();
}

#[tokio::test]
async fn test_collector_user_migrates_after_init_db() {
    let mut database = Config::load(None).unwrap().database;
    database.url = None;
    database.name = "history_init_db_test".to_string();
    database.user = "history_init_db_user".to_string();
    database.password = "collector-secret".to_string();

    let first_file = FileSequence::new(0x3f);
    bootstrap(&BootstrapOptions {
        database: database.clone(),
        first_file,
        force: true,
    })
    .await
    .unwrap();

    // Same connection the collector opens before it starts collecting.
    let store = PgStore::connect(&database).await.unwrap();
    store.migrate().await.unwrap();
    assert_eq!(
        store.cursor().await.unwrap(),
        Some(CollectorCursor::pending(first_file))
    );

    store
        .commit_checkpoint(first_file, &[payment("dd", 0, 2)], &[])
        .await
        .unwrap();
    assert_eq!(
        store.cursor().await.unwrap(),
        Some(CollectorCursor::processed(first_file))
    );
    assert_eq!(store.payment_by_hash("dd").await.unwrap().unwrap().ledger_sequence, 2);
    store.pool().close().await;
}
