use chrono::NaiveDate;
use larder_core::source::remote::stable_item_id;
use larder_core::{
    FoodItem, HttpNotificationSender, ItemSource, NotificationSender, NotifyError,
    RemoteItemSource, SourceError,
};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn milk() -> FoodItem {
    FoodItem::with_id(
        Uuid::parse_str("7f1e6c2a-2a0b-4f3e-9d1c-0b5e8f7a6d41").unwrap(),
        "Milk",
        2,
        NaiveDate::from_ymd_opt(2024, 6, 15),
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn http_sender_posts_reminder_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/notify"))
        .and(header("authorization", "Bearer secret"))
        .and(body_json(json!({
            "email": "me@example.com",
            "items": [{ "name": "Milk", "quantity": 2, "expiryDate": "2024-06-15" }]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sender = HttpNotificationSender::new(format!("{}/api/notify", server.uri()))
        .with_bearer_token("secret")
        .with_timeout(Duration::from_secs(5));
    let result = tokio::task::spawn_blocking(move || sender.send("me@example.com", &[milk()]))
        .await
        .unwrap();

    assert!(result.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn http_sender_reports_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/notify"))
        .respond_with(ResponseTemplate::new(500).set_body_string("mailer offline"))
        .mount(&server)
        .await;

    let sender = HttpNotificationSender::new(format!("{}/api/notify", server.uri()));
    let err = tokio::task::spawn_blocking(move || sender.send("me@example.com", &[milk()]))
        .await
        .unwrap()
        .unwrap_err();

    match err {
        NotifyError::Rejected { status, body } => {
            assert_eq!(status, 500);
            assert_eq!(body, "mailer offline");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn http_sender_reports_unreachable_endpoint() {
    let sender = HttpNotificationSender::new("http://127.0.0.1:9/api/notify")
        .with_timeout(Duration::from_secs(2));
    let err = sender.send("me@example.com", &[milk()]).unwrap_err();

    assert!(matches!(err, NotifyError::Transport(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_source_decodes_food_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/food"))
        .and(header("authorization", "Bearer token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "_id": "7f1e6c2a-2a0b-4f3e-9d1c-0b5e8f7a6d41",
                "name": "Milk",
                "quantity": 2,
                "expiryDate": "2024-06-15T00:00:00.000Z"
            },
            {
                "_id": "65f0c1d2e3a4b5c6d7e8f901",
                "name": "Jam",
                "quantity": 1,
                "expiryDate": "not a date"
            },
            {
                "_id": "",
                "name": "Ghost",
                "quantity": 1,
                "expiryDate": "2024-06-15"
            }
        ])))
        .mount(&server)
        .await;

    let source = RemoteItemSource::new(format!("{}/", server.uri())).with_bearer_token("token");
    let items = tokio::task::spawn_blocking(move || source.fetch_items())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0], milk());
    assert_eq!(items[1].id, stable_item_id("65f0c1d2e3a4b5c6d7e8f901"));
    assert_eq!(items[1].expiry_date, None);
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_source_maps_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/food"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let source = RemoteItemSource::new(server.uri());
    let err = tokio::task::spawn_blocking(move || source.fetch_items())
        .await
        .unwrap()
        .unwrap_err();

    assert!(matches!(err, SourceError::Status { status: 503 }));
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_source_rejects_non_list_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/food"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .mount(&server)
        .await;

    let source = RemoteItemSource::new(server.uri());
    let err = tokio::task::spawn_blocking(move || source.fetch_items())
        .await
        .unwrap()
        .unwrap_err();

    assert!(matches!(err, SourceError::Decode(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn remote_source_skips_only_malformed_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/food"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "_id": "7f1e6c2a-2a0b-4f3e-9d1c-0b5e8f7a6d41",
                "name": "Milk",
                "quantity": 2,
                "expiryDate": "2024-06-15"
            },
            {
                "_id": "b",
                "name": "Cheese",
                "quantity": 1,
                "expiryDate": 1718409600000_i64
            },
            { "_id": "c", "quantity": 1, "expiryDate": "2024-06-15" },
            { "_id": "d", "name": "Eggs", "quantity": "a dozen", "expiryDate": "2024-06-15" }
        ])))
        .mount(&server)
        .await;

    let source = RemoteItemSource::new(server.uri());
    let items = tokio::task::spawn_blocking(move || source.fetch_items())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0], milk());
    assert_eq!(items[1].name, "Cheese");
    assert_eq!(items[1].expiry_date, None);
}
