#![cfg(feature = "webhook")]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tracing_slack_sink::entry::{Caller, Entry};
use tracing_slack_sink::error::DeliveryError;
use tracing_slack_sink::field::Field;
use tracing_slack_sink::level::Level;
use tracing_slack_sink::message::default_message;
use tracing_slack_sink::sink::SlackSink;
use tracing_slack_sink::webhook::{WebhookClient, WebhookConfig};

const HOOK_PATH: &str = "/services/T000/B000/XXXX";

fn entry() -> Entry {
    Entry::new(Level::Error, "foo")
        .with_caller(Caller::new("/app/src/main.rs", 12))
        .with_time(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
}

#[tokio::test]
async fn posts_attachment_json() {
    let server = MockServer::start().await;
    let mut fields = BTreeMap::new();
    fields.insert("error".to_string(), "bar".to_string());
    let message = default_message(&entry(), &fields, "svc");

    Mock::given(method("POST"))
        .and(path(HOOK_PATH))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({
            "attachments": [{
                "title": "ERROR: foo",
                "fields": [
                    { "title": "Error", "value": "bar", "short": false },
                    { "title": "Caller", "value": "src/main.rs:12", "short": false }
                ],
                "color": "danger",
                "ts": 1700000000,
                "footer": "svc",
                "mrkdwn_in": ["fields"]
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&server)
        .await;

    let client = WebhookClient::new(format!("{}{}", server.uri(), HOOK_PATH));
    client.post(&message).await.expect("post");
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(HOOK_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_string("no_service"))
        .mount(&server)
        .await;

    let client = WebhookClient::from_config(&WebhookConfig {
        url: format!("{}{}", server.uri(), HOOK_PATH),
        timeout: Some(Duration::from_secs(5)),
    })
    .expect("client");

    let message = default_message(&entry(), &BTreeMap::new(), "svc");
    match client.post(&message).await {
        Err(DeliveryError::Status { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body, "no_service");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn sink_write_reaches_webhook() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(HOOK_PATH))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = WebhookClient::new(format!("{}{}", server.uri(), HOOK_PATH));
    let sink = SlackSink::new(Level::Error, Arc::new(client))
        .with_footer("svc")
        .with(&[Field::string("region", "eu-west-1")]);

    sink.write(&entry(), &[Field::duration("elapsed", Duration::from_millis(1))])
        .expect("write");

    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    let requests = loop {
        let requests = server.received_requests().await.unwrap_or_default();
        if !requests.is_empty() || tokio::time::Instant::now() >= deadline {
            break requests;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    };

    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).expect("json body");
    let rows = body["attachments"][0]["fields"].as_array().expect("fields");
    let value = |title: &str| {
        rows.iter()
            .find(|r| r["title"] == title)
            .and_then(|r| r["value"].as_str().map(str::to_string))
    };
    assert_eq!(value("Region").as_deref(), Some("eu-west-1"));
    assert_eq!(value("Elapsed").as_deref(), Some("1ms"));
    assert_eq!(body["attachments"][0]["footer"], "svc");
}
