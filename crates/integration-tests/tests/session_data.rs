//! Session scratch-storage merge semantics, mirrored from the Postgres
//! `jsonb ||` operator the repository uses.

use serde_json::json;
use waba_core::PhoneNumber;
use waba_integration_tests::TestHarness;
use waba_server::db::RepositoryError;

const PHONE: &str = "201000000001";

fn phone() -> PhoneNumber {
    PhoneNumber::parse(PHONE).expect("valid phone")
}

#[test]
fn test_merge_into_empty_session() {
    let harness = TestHarness::new();
    harness.seed_active_user(PHONE, Some("Sara"), "conversation");

    harness
        .users
        .merge_session_data(&phone(), &json!({ "order_id": "A-100" }))
        .expect("merge succeeds");

    let user = harness.users.get(PHONE).expect("user exists");
    assert_eq!(user.session_data, Some(json!({ "order_id": "A-100" })));
}

#[test]
fn test_merge_overwrites_top_level_keys_and_keeps_the_rest() {
    let harness = TestHarness::new();
    harness.seed_active_user(PHONE, Some("Sara"), "conversation");

    harness
        .users
        .merge_session_data(&phone(), &json!({ "order_id": "A-100", "lang": "ar" }))
        .expect("first merge");
    harness
        .users
        .merge_session_data(&phone(), &json!({ "order_id": "A-200" }))
        .expect("second merge");

    let user = harness.users.get(PHONE).expect("user exists");
    assert_eq!(
        user.session_data,
        Some(json!({ "order_id": "A-200", "lang": "ar" })),
        "later keys win, untouched keys survive"
    );
}

#[test]
fn test_merge_replaces_nested_objects_wholesale() {
    let harness = TestHarness::new();
    harness.seed_active_user(PHONE, Some("Sara"), "conversation");

    harness
        .users
        .merge_session_data(&phone(), &json!({ "form": { "step": 1, "name": "Sara" } }))
        .expect("first merge");
    harness
        .users
        .merge_session_data(&phone(), &json!({ "form": { "step": 2 } }))
        .expect("second merge");

    let user = harness.users.get(PHONE).expect("user exists");
    assert_eq!(
        user.session_data,
        Some(json!({ "form": { "step": 2 } })),
        "jsonb || is a shallow merge, nested objects are not merged"
    );
}

#[test]
fn test_merge_for_unknown_user_is_not_found() {
    let harness = TestHarness::new();

    let result = harness
        .users
        .merge_session_data(&phone(), &json!({ "order_id": "A-100" }));

    assert!(matches!(result, Err(RepositoryError::NotFound)));
}
