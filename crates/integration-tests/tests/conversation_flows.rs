//! End-to-end conversation flows through the engine, backed by in-memory
//! stores and a recording sender.

use waba_core::{ConversationStep, UserStatus};
use waba_integration_tests::{RecordingSender, TestHarness, inbound_text};

const PHONE: &str = "201000000001";

#[tokio::test]
async fn test_first_message_triggers_onboarding() {
    let harness = TestHarness::new();

    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN1", "hi"))
        .await
        .expect("cycle succeeds");

    let bodies = harness.sender.bodies();
    assert_eq!(bodies.len(), 1, "exactly one onboarding reply");
    assert!(bodies[0].contains("Welcome"));

    let user = harness.users.get(PHONE).expect("user created");
    assert_eq!(user.status, UserStatus::Active);
    assert_eq!(user.current_step, ConversationStep::Conversation.as_str());
    assert_eq!(user.message_count, 1);
}

#[tokio::test]
async fn test_first_message_command_still_gets_onboarding() {
    let harness = TestHarness::new();

    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN1", "help"))
        .await
        .expect("cycle succeeds");

    let bodies = harness.sender.bodies();
    assert_eq!(bodies.len(), 1);
    assert!(
        bodies[0].contains("Welcome"),
        "command content is ignored for brand-new users"
    );
}

#[tokio::test]
async fn test_second_message_command_is_answered() {
    let harness = TestHarness::new();

    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN1", "hi"))
        .await
        .expect("onboarding");
    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN2", "help"))
        .await
        .expect("command");

    let bodies = harness.sender.bodies();
    assert_eq!(bodies.len(), 2);
    assert!(bodies[1].contains("How can I help you"));

    let user = harness.users.get(PHONE).expect("user exists");
    assert_eq!(user.message_count, 2);
    assert_eq!(
        user.current_step,
        ConversationStep::Conversation.as_str(),
        "commands do not move the step"
    );
}

#[tokio::test]
async fn test_legacy_name_capture_flow() {
    let harness = TestHarness::new();
    harness.seed_active_user(PHONE, None, "awaiting_response");

    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN1", "hello"))
        .await
        .expect("greeting");

    let user = harness.users.get(PHONE).expect("user exists");
    assert_eq!(user.current_step, ConversationStep::AwaitingName.as_str());
    let bodies = harness.sender.bodies();
    assert_eq!(bodies.len(), 2, "greeting plus name prompt");

    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN2", "  Omar  "))
        .await
        .expect("name capture");

    let user = harness.users.get(PHONE).expect("user exists");
    assert_eq!(user.name.as_deref(), Some("Omar"));
    assert_eq!(user.current_step, ConversationStep::Conversation.as_str());

    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN3", "stats"))
        .await
        .expect("stats");

    let bodies = harness.sender.bodies();
    assert!(
        bodies.last().expect("reply").contains("Omar"),
        "captured name flows into later replies"
    );
}

#[tokio::test]
async fn test_menu_is_single_shot() {
    let harness = TestHarness::new();
    harness.seed_active_user(PHONE, Some("Sara"), "conversation");

    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN1", "menu"))
        .await
        .expect("menu");
    let user = harness.users.get(PHONE).expect("user exists");
    assert_eq!(user.current_step, ConversationStep::Menu.as_str());

    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN2", "1"))
        .await
        .expect("selection");
    let user = harness.users.get(PHONE).expect("user exists");
    assert_eq!(
        user.current_step,
        ConversationStep::Conversation.as_str(),
        "selection returns to conversation"
    );
    assert!(
        harness.sender.bodies()[1].contains("Our available services"),
        "option 1 maps to services"
    );

    // A bare "1" outside the menu is not a command.
    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN3", "1"))
        .await
        .expect("fallback");
    let user = harness.users.get(PHONE).expect("user exists");
    assert_eq!(user.current_step, ConversationStep::Conversation.as_str());
    assert!(!harness.sender.bodies()[2].contains("Our available services"));
}

#[tokio::test]
async fn test_invalid_menu_selection_returns_to_conversation() {
    let harness = TestHarness::new();
    harness.seed_active_user(PHONE, Some("Sara"), "menu");

    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN1", "42"))
        .await
        .expect("selection");

    assert!(harness.sender.bodies()[0].contains("Invalid option"));
    let user = harness.users.get(PHONE).expect("user exists");
    assert_eq!(user.current_step, ConversationStep::Conversation.as_str());
}

#[tokio::test]
async fn test_unknown_persisted_step_falls_back_to_conversation() {
    let harness = TestHarness::new();
    harness.seed_active_user(PHONE, Some("Sara"), "legacy_step_v1");

    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN1", "services"))
        .await
        .expect("cycle succeeds");

    assert!(harness.sender.bodies()[0].contains("Our available services"));
}

#[tokio::test]
async fn test_outbound_replies_are_logged_with_provider_ids() {
    let harness = TestHarness::new();
    harness.seed_active_user(PHONE, Some("Sara"), "conversation");

    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN1", "info"))
        .await
        .expect("cycle succeeds");

    let inbound = harness.messages.rows_in("inbound");
    assert_eq!(inbound.len(), 1);
    assert_eq!(inbound[0].message_id, "wamid.IN1");
    assert_eq!(inbound[0].content, "info");

    let outbound = harness.messages.rows_in("outbound");
    assert_eq!(outbound.len(), 1);
    assert!(outbound[0].message_id.starts_with("wamid.OUT"));
}

#[tokio::test]
async fn test_inbound_rows_carry_raw_payload_metadata() {
    let harness = TestHarness::new();
    harness.seed_active_user(PHONE, Some("Sara"), "conversation");

    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN1", "info"))
        .await
        .expect("cycle succeeds");

    let inbound = harness.messages.rows_in("inbound");
    let metadata = inbound[0].metadata.as_ref().expect("inbound row keeps the payload");
    assert_eq!(metadata["type"], "text");
    assert_eq!(metadata["from"], PHONE);
    assert_eq!(metadata["text"]["body"], "info");

    let outbound = harness.messages.rows_in("outbound");
    assert!(
        outbound[0].metadata.is_none(),
        "only inbound rows carry provider metadata"
    );
}

#[tokio::test]
async fn test_soft_failure_sends_but_does_not_log() {
    let harness = TestHarness::with_sender(RecordingSender::without_ids());
    harness.seed_active_user(PHONE, Some("Sara"), "conversation");

    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN1", "info"))
        .await
        .expect("cycle succeeds");

    assert_eq!(harness.sender.bodies().len(), 1, "reply still goes out");
    assert!(
        harness.messages.rows_in("outbound").is_empty(),
        "no provider ID means no outbound row"
    );

    let user = harness.users.get(PHONE).expect("user exists");
    assert_eq!(user.message_count, 4, "activity still recorded");
}

#[tokio::test]
async fn test_provider_rejection_does_not_fail_the_cycle() {
    let harness = TestHarness::with_sender(RecordingSender::failing());
    harness.seed_active_user(PHONE, Some("Sara"), "conversation");

    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN1", "info"))
        .await
        .expect("send failures are soft");

    let user = harness.users.get(PHONE).expect("user exists");
    assert_eq!(user.message_count, 4, "activity recorded despite send failure");
}

#[tokio::test]
async fn test_duplicate_delivery_is_ignored() {
    let harness = TestHarness::new();
    harness.seed_active_user(PHONE, Some("Sara"), "conversation");

    let message = inbound_text(PHONE, "wamid.IN1", "help");
    harness
        .engine
        .handle_message(&message)
        .await
        .expect("first delivery");
    harness
        .engine
        .handle_message(&message)
        .await
        .expect("redelivery is not an error");

    assert_eq!(harness.sender.bodies().len(), 1, "no duplicate reply");
    let user = harness.users.get(PHONE).expect("user exists");
    assert_eq!(user.message_count, 4, "counted once");
}

#[tokio::test]
async fn test_concurrent_messages_for_one_phone_are_serialized() {
    let harness = std::sync::Arc::new(TestHarness::new());
    harness.seed_active_user(PHONE, Some("Sara"), "conversation");

    let mut handles = Vec::new();
    for i in 0..8 {
        let harness = std::sync::Arc::clone(&harness);
        handles.push(tokio::spawn(async move {
            harness
                .engine
                .handle_message(&inbound_text(PHONE, &format!("wamid.IN{i}"), "info"))
                .await
        }));
    }
    for handle in handles {
        handle.await.expect("task").expect("cycle succeeds");
    }

    let user = harness.users.get(PHONE).expect("user exists");
    assert_eq!(user.message_count, 11, "every message counted exactly once");
    assert_eq!(harness.sender.bodies().len(), 8, "one reply per message");
}

#[tokio::test]
async fn test_inbound_messages_are_marked_read() {
    let harness = TestHarness::new();

    harness
        .engine
        .handle_message(&inbound_text(PHONE, "wamid.IN1", "hi"))
        .await
        .expect("cycle succeeds");

    assert_eq!(harness.sender.read_receipts(), vec!["wamid.IN1".to_owned()]);
}
