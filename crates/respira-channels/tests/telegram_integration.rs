use respira_channels::{Channel, TelegramChannel};
use respira_core::OutboundMessage;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_send_renders_choice_keyboard() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bottok-1/sendMessage"))
        .and(body_json(json!({
            "chat_id": 42,
            "text": "¿En qué te puedo ayudar?",
            "reply_markup": {
                "keyboard": [[
                    { "text": "Confirmar recogida" },
                    { "text": "Programar recogida" }
                ]],
                "one_time_keyboard": true
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "message_id": 9 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let channel = TelegramChannel::new("tok-1", 8).with_base_url(server.uri());
    channel
        .send(OutboundMessage::choices(
            42,
            "¿En qué te puedo ayudar?",
            &["Confirmar recogida", "Programar recogida"],
        ))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_send_maps_api_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": false,
            "description": "Bad Request: chat not found"
        })))
        .mount(&server)
        .await;

    let channel = TelegramChannel::new("tok-1", 8).with_base_url(server.uri());
    let err = channel
        .send(OutboundMessage::text(42, "hola"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("chat not found"));
}

#[tokio::test]
async fn test_poll_forwards_incoming_turns() {
    let server = MockServer::start().await;

    // First poll returns one update; later polls return nothing.
    Mock::given(method("GET"))
        .and(path("/bottok-1/getUpdates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [{
                "update_id": 100,
                "message": {
                    "message_id": 1,
                    "from": { "id": 7, "first_name": "Jon", "username": "jon" },
                    "chat": { "id": 7 },
                    "text": "/start"
                }
            }]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/bottok-1/getUpdates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": []
        })))
        .mount(&server)
        .await;

    let mut channel = TelegramChannel::new("tok-1", 8).with_base_url(server.uri());
    let mut turns = channel.take_turn_receiver().unwrap();
    assert!(channel.take_turn_receiver().is_none());

    let poller = tokio::spawn(async move { channel.poll_updates().await });

    let turn = turns.recv().await.unwrap();
    assert_eq!(turn.user.id, 7);
    assert_eq!(turn.text(), "/start");

    poller.abort();
}
