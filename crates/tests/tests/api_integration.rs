use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use meridian_agents::DeskAgent;
use meridian_api::rate_limit::IpRateLimiter;
use meridian_api::{build_router, ApiState};
use meridian_genai::GeminiClient;
use meridian_observability::AppMetrics;
use meridian_storage::Store;
use serde_json::json;
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "dev-meridian-key";

fn test_app(gemini_base: &str) -> Router {
    let metrics = AppMetrics::shared();
    let genai = GeminiClient::new("test-key")
        .expect("client should build")
        .with_base_url(gemini_base.to_string());
    let agent = Arc::new(DeskAgent::new(
        Arc::new(Store::memory()),
        genai,
        metrics.clone(),
    ));

    build_router(ApiState {
        agent,
        metrics,
        api_key: API_KEY.to_string(),
        limiter: IpRateLimiter::new(Duration::from_secs(60), 1_000),
    })
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-api-key", API_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_enquiry(app: &Router, name: &str, destination: &str) -> i64 {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/v1/enquiries",
            json!({
                "name": name,
                "phone": "98100 11111",
                "source": "referral",
                "destination": destination,
                "budget": "1.5 lakh",
                "notes": "window seats preferred"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let parsed = json_body(response).await;
    parsed["enquiry"]["id"].as_i64().unwrap()
}

async fn mount_catalog(server: &MockServer) {
    let catalog = json!({
        "models": [
            {"name": "models/gemini-1.0-pro", "supportedGenerationMethods": ["generateContent"]},
            {"name": "models/gemini-1.5-flash-001", "supportedGenerationMethods": ["generateContent"]}
        ]
    });
    Mock::given(method("GET"))
        .and(path("/v1beta/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&catalog))
        .mount(server)
        .await;
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app("http://localhost:1");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let parsed = json_body(response).await;
    assert_eq!(parsed["status"], "ok");
    assert!(parsed["metrics"]["requests_total"].is_u64());
}

#[tokio::test]
async fn enquiries_require_api_key() {
    let app = test_app("http://localhost:1");

    let request = Request::builder()
        .method("POST")
        .uri("/v1/enquiries")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"name": "A", "destination": "B"}).to_string(),
        ))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_and_list_resolve_the_lead() {
    let app = test_app("http://localhost:1");
    create_enquiry(&app, "Asha Verma", "Zanzibar").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/enquiries")
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let parsed = json_body(response).await;
    assert_eq!(parsed.as_array().unwrap().len(), 1);
    assert_eq!(parsed[0]["lead"]["name"], "Asha Verma");
    assert_eq!(parsed[0]["enquiry"]["destination"], "Zanzibar");
    assert_eq!(parsed[0]["enquiry"]["status"], "new");
}

#[tokio::test]
async fn missing_destination_is_rejected() {
    let app = test_app("http://localhost:1");

    let response = app
        .oneshot(json_request(
            "POST",
            "/v1/enquiries",
            json!({"name": "Asha", "destination": "  "}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let parsed = json_body(response).await;
    assert_eq!(parsed["error"], "validation_failed");
}

#[tokio::test]
async fn draft_save_finalize_flow_produces_a_pdf() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    let generated = json!({
        "candidates": [
            {"content": {"parts": [
                {"text": "Day 1: 26 Feb - Arrival & Creek Walk\nSettle in and explore the souks."}
            ]}}
        ]
    });
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash-001:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&generated))
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    let id = create_enquiry(&app, "Rohit Mehta", "Dubai").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/v1/enquiries/{id}/draft"),
            json!({"start_date": "2026-02-26", "structure": "4N Dubai"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let draft = json_body(response).await;
    assert_eq!(draft["model_id"], "gemini-1.5-flash-001");
    assert!(draft["text"].as_str().unwrap().starts_with("Day 1:"));

    // The generated text is persisted and the hotel block still shows the
    // placeholder until someone saves over it.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/v1/enquiries/{id}/session"))
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let session = json_body(response).await;
    assert!(session["itinerary"].as_str().unwrap().contains("Creek Walk"));
    assert!(session["hotels"].as_str().unwrap().starts_with("Option 1:"));

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/v1/enquiries/{id}/save"),
            json!({
                "itinerary": "Day 1: 26 Feb - Arrival & Creek Walk\nSettle in.",
                "hotels": "Address Downtown (BB)",
                "price": "INR 2,10,000 + Taxes"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/v1/enquiries/{id}/finalize"),
            json!({
                "itinerary": "Day 1: 26 Feb - Arrival & Creek Walk\nSettle in.",
                "hotels": "Address Downtown (BB)",
                "price": "INR 2,10,000 + Taxes"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|value| value.to_str().ok()),
        Some("application/pdf")
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/v1/enquiries")
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let listed = json_body(response).await;
    assert_eq!(listed[0]["enquiry"]["status"], "quoted");
}

#[tokio::test]
async fn failed_generation_maps_to_bad_gateway_and_writes_nothing() {
    let server = MockServer::start().await;
    mount_catalog(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash-001:generateContent"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let app = test_app(&server.uri());
    let id = create_enquiry(&app, "Nisha Rao", "Bali").await;

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/v1/enquiries/{id}/draft"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let parsed = json_body(response).await;
    assert_eq!(parsed["error"], "quota_exceeded");

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/v1/enquiries/{id}/session"))
                .header("x-api-key", API_KEY)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let session = json_body(response).await;
    assert_eq!(session["itinerary"], "");
}
