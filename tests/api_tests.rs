/// End-to-end tests of the HTTP surface
/// Drives the full router with `oneshot` while wiremock stands in for LHDN
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use bilcekap_api::api::server::build_router;
use bilcekap_api::config::Config;
use bilcekap_api::handlers::AppState;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const EXAMPLE_URI: &str = "/api/v1.0/taxpayer/validate/ABC123456?idType=NRIC&idValue=123456789";

/// Helper function to create test config
fn create_test_config(lhdn_api_url: String) -> Config {
    Config {
        database_url: "sqlite:///./test.db".to_string(),
        port: 8080,
        lhdn_api_url,
        lhdn_api_key: Some("test_key".to_string()),
        lhdn_api_timeout: 5,
        secret_key: None,
        cors_origins: vec!["http://localhost:3000".to_string()],
        rate_limit: None,
    }
}

fn app_with(config: Config) -> Router {
    let state = Arc::new(AppState::new(config).unwrap());
    build_router(state).unwrap()
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn assert_no_validation_result(body: &Value) {
    assert!(body.get("is_valid").is_none());
    assert!(body.get("validated_at").is_none());
}

#[tokio::test]
async fn test_validate_example_scenario() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1.0/taxpayer/validate/ABC123456"))
        .and(query_param("idType", "NRIC"))
        .and(query_param("idValue", "123456789"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "valid": true,
            "message": "Taxpayer validated successfully"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = app_with(create_test_config(mock_server.uri()));
    let (status, body) = get(app, EXAMPLE_URI).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tin"], "ABC123456");
    assert_eq!(body["id_type"], "NRIC");
    assert_eq!(body["id_value"], "123456789");
    assert_eq!(body["is_valid"], true);
    assert_eq!(body["validation_message"], "Taxpayer validated successfully");
    let stamp = body["validated_at"].as_str().unwrap();
    assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
}

#[tokio::test]
async fn test_upstream_flag_is_relayed_exactly() {
    for flag in [true, false] {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "valid": flag })),
            )
            .mount(&mock_server)
            .await;

        let app = app_with(create_test_config(mock_server.uri()));
        let (status, body) = get(app, EXAMPLE_URI).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_valid"], flag);
    }
}

#[tokio::test]
async fn test_lowercase_id_type_is_normalized() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("idType", "PASSPORT"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let app = app_with(create_test_config(mock_server.uri()));
    let (status, body) = get(
        app,
        "/api/v1.0/taxpayer/validate/ABC123456?idType=passport&idValue=A1234567",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id_type"], "PASSPORT");
}

#[tokio::test]
async fn test_invalid_input_never_reaches_upstream() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let uris = [
        "/api/v1.0/taxpayer/validate/ABC123456?idType=&idValue=123456789",
        "/api/v1.0/taxpayer/validate/ABC123456?idType=NRIC&idValue=",
        "/api/v1.0/taxpayer/validate/ABC123456?idValue=123456789",
        "/api/v1.0/taxpayer/validate/ABC123456?idType=NRIC",
        "/api/v1.0/taxpayer/validate/ABC123456",
        "/api/v1.0/taxpayer/validate/%20%20?idType=NRIC&idValue=123456789",
        "/api/v1.0/taxpayer/validate/?idType=NRIC&idValue=123456789",
        "/api/v1.0/taxpayer/validate/AB?idType=NRIC&idValue=123456789",
        "/api/v1.0/taxpayer/validate/ABC123456?idType=SSN&idValue=123456789",
        // Rejected by the extractors themselves
        "/api/v1.0/taxpayer/validate/ABC123456?idType=NRIC&idType=BRN&idValue=123456789",
        "/api/v1.0/taxpayer/validate/ABC%FF123?idType=NRIC&idValue=123456789",
    ];

    for uri in uris {
        let app = app_with(create_test_config(mock_server.uri()));
        let (status, body) = get(app, uri).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert_eq!(body["code"], "INVALID_INPUT", "{}", uri);
        assert_no_validation_result(&body);
    }
}

#[tokio::test]
async fn test_upstream_timeout_returns_gateway_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"valid": true}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let config = Config {
        lhdn_api_timeout: 1,
        ..create_test_config(mock_server.uri())
    };
    let (status, body) = get(app_with(config), EXAMPLE_URI).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["code"], "UPSTREAM_TIMEOUT");
    assert_no_validation_result(&body);
}

#[tokio::test]
async fn test_upstream_auth_failure_is_server_configuration_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let (status, body) = get(app_with(create_test_config(mock_server.uri())), EXAMPLE_URI).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "UPSTREAM_AUTHENTICATION");
    assert_no_validation_result(&body);
}

#[tokio::test]
async fn test_upstream_failures_map_to_status_classes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1.0/taxpayer/validate/MALFORMED1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1.0/taxpayer/validate/BROKEN1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("down for maintenance"))
        .mount(&mock_server)
        .await;

    let (status, body) = get(
        app_with(create_test_config(mock_server.uri())),
        "/api/v1.0/taxpayer/validate/MALFORMED1?idType=NRIC&idValue=123456789",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "UPSTREAM_MALFORMED_RESPONSE");

    let (status, body) = get(
        app_with(create_test_config(mock_server.uri())),
        "/api/v1.0/taxpayer/validate/BROKEN1?idType=NRIC&idValue=123456789",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "UPSTREAM_ERROR");
    // Upstream body stays in the logs only
    assert!(!body["error"]
        .as_str()
        .unwrap()
        .contains("maintenance"));
}

#[tokio::test]
async fn test_upstream_unreachable_returns_service_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let app = app_with(create_test_config(format!("http://{}", addr)));
    let (status, body) = get(app, EXAMPLE_URI).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "UPSTREAM_UNREACHABLE");
}

#[tokio::test]
async fn test_back_to_back_requests_call_upstream_twice() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1.0/taxpayer/validate/ABC123456"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"valid": true})))
        .expect(2)
        .mount(&mock_server)
        .await;

    let app = app_with(create_test_config(mock_server.uri()));
    for _ in 0..2 {
        let (status, _) = get(app.clone(), EXAMPLE_URI).await;
        assert_eq!(status, StatusCode::OK);
    }
}

#[tokio::test]
async fn test_root_health_and_docs() {
    let app = app_with(create_test_config("http://127.0.0.1:9".to_string()));

    let (status, body) = get(app.clone(), "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Bilcekap Backend API is running");

    let (status, body) = get(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "bilcekap-api");

    let (status, body) = get(app.clone(), "/api-docs/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1.0/taxpayer/validate/{tin}"].is_object());

    let response = app
        .oneshot(Request::builder().uri("/docs").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
}

#[tokio::test]
async fn test_unknown_route_is_json_not_found() {
    let app = app_with(create_test_config("http://127.0.0.1:9".to_string()));
    let (status, body) = get(app, "/api/v1.0/taxpayer/unknown/thing").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_cors_allows_configured_origin_only() {
    let app = app_with(create_test_config("http://127.0.0.1:9".to_string()));

    let preflight = |origin: &'static str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/health")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap()
    };

    let allowed = app
        .clone()
        .oneshot(preflight("http://localhost:3000"))
        .await
        .unwrap();
    assert_eq!(
        allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );

    let denied = app.oneshot(preflight("http://evil.example")).await.unwrap();
    assert!(denied
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
async fn test_rate_limited_router_builds() {
    let config = Config {
        rate_limit: Some(bilcekap_api::config::RateLimit {
            per_second: 10,
            burst_size: 20,
        }),
        ..create_test_config("http://127.0.0.1:9".to_string())
    };
    let app = app_with(config);

    // Health sits outside the limiter and needs no client address
    let (status, _) = get(app, "/health").await;
    assert_eq!(status, StatusCode::OK);
}
