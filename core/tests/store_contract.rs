//! Contract tests for the verification-code store capability.
//!
//! These run against the in-memory mock; the same assertions are made
//! against MySQL in the infra crate's integration tests.

use pv_core::repositories::MockVerificationCodeStore;
use pv_core::{StoredVerificationCode, VerificationCodeStore};

#[tokio::test]
async fn idempotent_upsert_keeps_last_record() {
    let store = MockVerificationCodeStore::new();
    let r1 = StoredVerificationCode::new("111111", 1000);
    let r2 = StoredVerificationCode::new("222222", 2000);

    store.insert("+15551234567", &r1).await.unwrap();
    store.insert("+15551234567", &r2).await.unwrap();

    assert_eq!(store.len().await, 1);
    let found = store.find_for_number("+15551234567").await.unwrap();
    assert_eq!(found, Some(r2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_upserts_converge_to_single_winner() {
    let store = MockVerificationCodeStore::new();
    let r1 = StoredVerificationCode::new("111111", 1000).with_push_code("push-a");
    let r2 = StoredVerificationCode::new("222222", 2000).with_push_code("push-b");

    let (s1, s2) = (store.clone(), store.clone());
    let (c1, c2) = (r1.clone(), r2.clone());
    let t1 = tokio::spawn(async move { s1.insert("+15551234567", &c1).await });
    let t2 = tokio::spawn(async move { s2.insert("+15551234567", &c2).await });

    // Neither caller sees a duplicate-key failure
    t1.await.unwrap().unwrap();
    t2.await.unwrap().unwrap();

    assert_eq!(store.len().await, 1);
    let found = store.find_for_number("+15551234567").await.unwrap().unwrap();
    // The survivor is one call's record in its entirety, never a field mix
    assert!(found == r1 || found == r2);
}

#[tokio::test]
async fn round_trip_preserves_every_field() {
    let store = MockVerificationCodeStore::new();
    let record = StoredVerificationCode::new("987654", 123_456_789)
        .with_push_code("push-token")
        .with_twilio_verification_sid("VE42");

    store.insert("+442071838750", &record).await.unwrap();

    let found = store.find_for_number("+442071838750").await.unwrap();
    assert_eq!(found, Some(record));
}

#[tokio::test]
async fn account_scenario_insert_find_remove() {
    let store = MockVerificationCodeStore::new();
    let record = StoredVerificationCode::new("123456", 1000);

    store.insert("+15551234567", &record).await.unwrap();

    let found = store.find_for_number("+15551234567").await.unwrap().unwrap();
    assert_eq!(found.code, "123456");
    assert_eq!(found.timestamp, 1000);
    assert!(found.push_code.is_none());
    assert!(found.twilio_verification_sid.is_none());

    store.remove("+15551234567").await.unwrap();
    assert!(store.find_for_number("+15551234567").await.unwrap().is_none());
}

#[tokio::test]
async fn device_scenario_second_insert_wins_without_failure() {
    let store = MockVerificationCodeStore::new();

    store
        .insert("+15557654321", &StoredVerificationCode::new("000000", 2000))
        .await
        .unwrap();
    store
        .insert("+15557654321", &StoredVerificationCode::new("999999", 2001))
        .await
        .unwrap();

    let found = store.find_for_number("+15557654321").await.unwrap().unwrap();
    assert_eq!(found.code, "999999");
    assert_eq!(store.len().await, 1);
}

#[tokio::test]
async fn numbers_are_independent_keys() {
    let store = MockVerificationCodeStore::new();

    store
        .insert("+15551234567", &StoredVerificationCode::new("111111", 1))
        .await
        .unwrap();
    store
        .insert("+15557654321", &StoredVerificationCode::new("222222", 2))
        .await
        .unwrap();

    store.remove("+15551234567").await.unwrap();

    assert!(store.find_for_number("+15551234567").await.unwrap().is_none());
    let other = store.find_for_number("+15557654321").await.unwrap().unwrap();
    assert_eq!(other.code, "222222");
}
