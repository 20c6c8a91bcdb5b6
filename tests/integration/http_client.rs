//! HTTP transport and token exchange against a mock server

use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use research_data_downloader::fetcher::auth::{ClientCredentials, StaticToken, TokenProvider};
use research_data_downloader::fetcher::research_http::{HttpConnector, ResearchHttpClient};
use research_data_downloader::fetcher::response::VideoPage;
use research_data_downloader::fetcher::{ApiConnector, Endpoint, FetcherError, ResearchApi};

#[tokio::test]
async fn test_post_sends_bearer_token_fields_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/research/video/query/"))
        .and(header("authorization", "Bearer token-123"))
        .and(query_param("fields", Endpoint::VideoQuery.fields()))
        .and(body_string_contains("\"start_date\":\"20240101\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"videos": [{"id": 1, "username": "alice"}], "has_more": false},
            "error": {"code": "ok", "message": "", "log_id": "log-1"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ResearchHttpClient::new(reqwest::Client::new(), server.uri(), "token-123");
    let response = client
        .post(
            Endpoint::VideoQuery,
            &json!({"query": {"and": []}, "start_date": "20240101", "end_date": "20240104"}),
        )
        .await
        .unwrap();

    assert_eq!(response.error.log_id, "log-1");
    let page: VideoPage = response.into_data().unwrap();
    assert_eq!(page.videos.len(), 1);
    assert!(!page.has_more);
}

#[tokio::test]
async fn test_error_code_is_returned_in_envelope() {
    let server = MockServer::start().await;

    // Rejections may come with a non-2xx status; the envelope decides
    Mock::given(method("POST"))
        .and(path("/v2/research/user/info/"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "data": {},
            "error": {"code": "daily_quota_limit_exceeded", "message": "quota"}
        })))
        .mount(&server)
        .await;

    let client = ResearchHttpClient::new(reqwest::Client::new(), server.uri(), "t");
    let response = client
        .post(Endpoint::UserInfo, &json!({"username": "alice"}))
        .await
        .unwrap();

    assert!(response.error.code.is_run_fatal());
}

#[tokio::test]
async fn test_garbage_body_is_a_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let client = ResearchHttpClient::new(reqwest::Client::new(), server.uri(), "t");
    let err = client
        .post(Endpoint::CommentList, &json!({"video_id": 1}))
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::Parse(_)));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_error() {
    let client = ResearchHttpClient::new(reqwest::Client::new(), "http://127.0.0.1:1", "t");
    let err = client
        .post(Endpoint::VideoQuery, &json!({}))
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::Transport(_)));
}

#[tokio::test]
async fn test_client_credentials_exchange() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/oauth/token/"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_key=key-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "clt.abc",
            "expires_in": 7200,
            "token_type": "Bearer"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let credentials = ClientCredentials::new(reqwest::Client::new(), &server.uri(), "key-1", "secret-1");
    assert_eq!(credentials.access_token().await.unwrap(), "clt.abc");
}

#[tokio::test]
async fn test_client_credentials_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/oauth/token/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": "invalid_client",
            "error_description": "Client key or secret is incorrect."
        })))
        .mount(&server)
        .await;

    let credentials = ClientCredentials::new(reqwest::Client::new(), &server.uri(), "key", "wrong");
    let err = credentials.access_token().await.unwrap_err();

    match err {
        FetcherError::Auth(message) => assert!(message.contains("invalid_client")),
        other => panic!("expected auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_connector_uses_fetched_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v2/research/video/comment/list/"))
        .and(header("authorization", "Bearer fixed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {"comments": [], "has_more": false},
            "error": {"code": "ok"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = HttpConnector::new(
        reqwest::Client::new(),
        server.uri(),
        Arc::new(StaticToken("fixed".to_string())),
    );
    let api = connector.connect().await.unwrap();
    let response = api
        .post(Endpoint::CommentList, &json!({"video_id": 1}))
        .await
        .unwrap();

    assert!(response.error.code.is_ok());
}
