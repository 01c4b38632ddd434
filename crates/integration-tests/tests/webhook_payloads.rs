//! Webhook payload decoding driven through the engine, using real Cloud
//! API JSON shapes.

use waba_integration_tests::TestHarness;
use waba_server::whatsapp::WebhookPayload;

fn message_payload() -> serde_json::Value {
    serde_json::json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "1234567890",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "metadata": {
                        "display_phone_number": "15550001111",
                        "phone_number_id": "123456789"
                    },
                    "messages": [{
                        "from": "201000000001",
                        "id": "wamid.IN1",
                        "timestamp": "1724832000",
                        "type": "text",
                        "text": { "body": "hello" }
                    }]
                }
            }]
        }]
    })
}

#[tokio::test]
async fn test_full_payload_drives_onboarding() {
    let harness = TestHarness::new();

    let payload: WebhookPayload =
        serde_json::from_value(message_payload()).expect("payload decodes");

    for value in payload.values() {
        for message in &value.messages {
            harness
                .engine
                .handle_message(message)
                .await
                .expect("cycle succeeds");
        }
    }

    assert_eq!(harness.sender.bodies().len(), 1);
    assert!(harness.users.get("201000000001").is_some());
}

#[tokio::test]
async fn test_status_only_payload_has_no_messages() {
    let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
        "object": "whatsapp_business_account",
        "entry": [{
            "id": "1234567890",
            "changes": [{
                "field": "messages",
                "value": {
                    "messaging_product": "whatsapp",
                    "statuses": [{
                        "id": "wamid.OUT1",
                        "status": "delivered",
                        "timestamp": "1724832060",
                        "recipient_id": "201000000001"
                    }]
                }
            }]
        }]
    }))
    .expect("payload decodes");

    let values: Vec<_> = payload.values().collect();
    assert_eq!(values.len(), 1);
    assert!(values[0].messages.is_empty());
    assert_eq!(values[0].statuses.len(), 1);
    assert_eq!(values[0].statuses[0].status, "delivered");
}

#[test]
fn test_foreign_payload_shape_is_rejected_cleanly() {
    // A non-batch JSON document decodes to an empty batch or fails; either
    // way it must not panic.
    let result: Result<WebhookPayload, _> =
        serde_json::from_value(serde_json::json!({ "object": "page", "entry": "nope" }));
    assert!(result.is_err());
}
