use std::time::Duration;

use serde_json::json;
use vacancy_core::{period_menu, MAX_MESSAGE_CHARS};
use vacancy_engine::{BotApi, TelegramClient, TelegramSettings, TransportError, Update, UpdateKind};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const TOKEN: &str = "123:abc";

fn client(server: &MockServer) -> TelegramClient {
    let settings = TelegramSettings {
        api_base: server.uri(),
        ..TelegramSettings::default()
    };
    TelegramClient::new(TOKEN, settings).expect("client")
}

fn form_field(request: &Request, key: &str) -> Option<String> {
    url::form_urlencoded::parse(&request.body)
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

#[tokio::test]
async fn send_message_posts_html_form_with_menu() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{TOKEN}/sendMessage")))
        .and(body_string_contains("parse_mode=HTML"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true, "result": {}})))
        .expect(1)
        .mount(&server)
        .await;

    let menu = period_menu();
    assert!(client(&server).send_message(-42, "<b>hi</b>", Some(&menu)).await);

    let requests = server.received_requests().await.unwrap();
    let request = &requests[0];
    assert_eq!(form_field(request, "chat_id").as_deref(), Some("-42"));
    assert_eq!(form_field(request, "text").as_deref(), Some("<b>hi</b>"));
    assert_eq!(
        form_field(request, "disable_web_page_preview").as_deref(),
        Some("true")
    );
    let markup: serde_json::Value =
        serde_json::from_str(&form_field(request, "reply_markup").unwrap()).unwrap();
    assert_eq!(markup["inline_keyboard"][4][0]["callback_data"], "period:86400");
}

#[tokio::test]
async fn long_text_is_truncated_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let text = "ж".repeat(MAX_MESSAGE_CHARS * 2);
    assert!(client(&server).send_message(1, &text, None).await);

    let requests = server.received_requests().await.unwrap();
    let sent = form_field(&requests[0], "text").unwrap();
    assert_eq!(sent.chars().count(), MAX_MESSAGE_CHARS);
    assert!(form_field(&requests[0], "reply_markup").is_none());
}

#[tokio::test]
async fn rejected_send_reports_false() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({"ok": false, "description": "Unauthorized"})),
        )
        .mount(&server)
        .await;

    assert!(!client(&server).send_message(1, "text", None).await);
}

#[tokio::test]
async fn muted_client_never_calls_the_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let settings = TelegramSettings {
        api_base: server.uri(),
        muted: true,
        ..TelegramSettings::default()
    };
    let muted = TelegramClient::new(TOKEN, settings).unwrap();
    assert!(!muted.send_message(1, "text", None).await);
}

#[tokio::test]
async fn get_updates_parses_messages_and_callbacks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/bot{TOKEN}/getUpdates")))
        .and(query_param("offset", "11"))
        .and(query_param("timeout", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [
                {"update_id": 11, "message": {"chat": {"id": 5}, "text": " /start "}},
                {"update_id": 12, "callback_query": {"data": "enable", "message": {"chat": {"id": 5}}}},
                {"update_id": 13, "edited_message": {"chat": {"id": 6}, "text": "/stop"}},
                {"update_id": 14, "channel_post": {"chat": {"id": 7}}},
                {"no_id": true}
            ]
        })))
        .mount(&server)
        .await;

    let updates = client(&server)
        .get_updates(Some(11), Duration::from_secs(1))
        .await
        .unwrap();
    assert_eq!(
        updates,
        vec![
            Update {
                id: 11,
                kind: UpdateKind::Message {
                    chat_id: 5,
                    text: "/start".into()
                }
            },
            Update {
                id: 12,
                kind: UpdateKind::Callback {
                    chat_id: 5,
                    token: "enable".into()
                }
            },
            Update {
                id: 13,
                kind: UpdateKind::Message {
                    chat_id: 6,
                    text: "/stop".into()
                }
            },
            Update {
                id: 14,
                kind: UpdateKind::Ignored
            },
        ]
    );
}

#[tokio::test]
async fn api_errors_surface_description() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "ok": false,
            "description": "Conflict: terminated by other getUpdates request"
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .get_updates(None, Duration::from_secs(1))
        .await
        .unwrap_err();
    match err {
        TransportError::Api { description } => assert!(description.starts_with("Conflict")),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn non_json_bodies_are_transport_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .get_updates(None, Duration::from_secs(1))
        .await
        .unwrap_err();
    assert!(matches!(err, TransportError::Http(_)));
}
