//! End-to-end client tests against a mock HTTP server.

use serde_json::json;
use tsdbapi::{ConfigBuilder, TsdbClient, TsdbError};
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn date(s: &str) -> chrono::NaiveDate {
    s.parse().unwrap()
}

fn ts_body() -> serde_json::Value {
    json!([
        {
            "ts_key": "ch.kof.barometer",
            "time": ["2024-01-31", "2024-02-29"],
            "value": [101.2, null]
        }
    ])
}

async fn public_client(server: &MockServer) -> TsdbClient {
    let config = ConfigBuilder::new()
        .environment("test")
        .url_test(format!("{}/v2/", server.uri()))
        .access_mode("public")
        .build()
        .unwrap();
    TsdbClient::new(config)
}

async fn oauth_client(server: &MockServer) -> TsdbClient {
    let config = ConfigBuilder::new()
        .environment("test")
        .url_test(format!("{}/v2/", server.uri()))
        .token_url(format!("{}/token", server.uri()))
        .offline_token("offline-secret")
        .build()
        .unwrap();
    TsdbClient::new(config)
}

#[tokio::test]
async fn read_ts_returns_observation_rows() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/ts"))
        .and(query_param("keys", "ch.kof.barometer"))
        .and(query_param("df", "Y-m-d"))
        .and(query_param("mime", "json"))
        .and(query_param("valid_on", "2024-03-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ts_body()))
        .expect(1)
        .mount(&server)
        .await;

    let client = public_client(&server).await;
    let rows = client
        .read_ts(&["ch.kof.barometer"], Some(date("2024-03-01")), false)
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].ts_key, "ch.kof.barometer");
    assert_eq!(rows[0].time, date("2024-01-31"));
    assert_eq!(rows[0].value, Some(101.2));
    assert_eq!(rows[1].value, None);
}

#[tokio::test]
async fn ignore_missing_is_sent_as_query_parameter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/ts"))
        .and(query_param("ignore_missing", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = public_client(&server).await;
    let rows = client
        .read_ts(&["ch.kof.missing"], Some(date("2024-03-01")), true)
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn oauth_mode_exchanges_offline_token_and_sends_bearer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=offline-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-value",
            "token_type": "Bearer",
            "expires_in": 300,
            "refresh_token": "refresh-value",
            "refresh_expires_in": 0
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/ts"))
        .and(header("authorization", "Bearer access-value"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ts_body()))
        .expect(2)
        .mount(&server)
        .await;

    let client = oauth_client(&server).await;
    // Two reads, but only one token exchange.
    client
        .read_ts(&["ch.kof.barometer"], Some(date("2024-03-01")), false)
        .await
        .unwrap();
    client
        .read_ts(&["ch.kof.barometer"], Some(date("2024-03-01")), false)
        .await
        .unwrap();
}

#[tokio::test]
async fn collection_reads_use_owner_in_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/collections/alice/indicators/ts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let client = public_client(&server).await;
    let rows = client
        .read_collection_ts("indicators", Some("alice"), Some(date("2024-03-01")), false)
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn metadata_reads_flatten_keyed_object() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/ts/metadata"))
        .and(query_param("keys", "ch.kof.barometer"))
        .and(query_param("locale", "de"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ch.kof.barometer": {"unit": "Index", "frequency": "monatlich"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = public_client(&server).await;
    let mut rows = client
        .read_ts_metadata(&["ch.kof.barometer"], Some("de"), false)
        .await
        .unwrap();
    rows.sort_by(|a, b| a.key.cmp(&b.key));

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].key, "frequency");
    assert_eq!(rows[0].value, "monatlich");
    assert_eq!(rows[1].key, "unit");
}

#[tokio::test]
async fn forbidden_response_surfaces_api_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/ts"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"message": "Access to ch.kof.secret is forbidden"})),
        )
        .mount(&server)
        .await;

    let client = public_client(&server).await;
    let err = client
        .read_ts(&["ch.kof.secret"], Some(date("2024-03-01")), false)
        .await
        .unwrap_err();

    match err {
        TsdbError::RemoteApi {
            status, message, ..
        } => {
            assert_eq!(status, 403);
            assert_eq!(message, "Access to ch.kof.secret is forbidden");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn rejected_token_exchange_surfaces_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token is not active"
        })))
        .mount(&server)
        .await;

    let client = oauth_client(&server).await;
    let err = client
        .read_ts(&["ch.kof.barometer"], Some(date("2024-03-01")), false)
        .await
        .unwrap_err();

    assert!(err.needs_reauth());
    assert!(err.to_string().contains("Token is not active"));
}
