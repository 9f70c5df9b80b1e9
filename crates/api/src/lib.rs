pub mod rate_limit;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{Json, Path, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use chrono::NaiveDate;
use meridian_agents::DeskAgent;
use meridian_core::{DeskError, DraftRequest, NewEnquiry, NewLead};
use meridian_genai::GeminiClient;
use meridian_observability::AppMetrics;
use meridian_storage::Store;
use serde::Deserialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::rate_limit::IpRateLimiter;

#[derive(Clone)]
pub struct ApiState {
    pub agent: Arc<DeskAgent<Store>>,
    pub metrics: Arc<AppMetrics>,
    pub api_key: String,
    pub limiter: IpRateLimiter,
}

#[derive(Debug, serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    metrics: meridian_observability::MetricsSnapshot,
}

#[derive(Debug, Clone, Deserialize)]
struct EnquiryCreateRequest {
    name: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    source: Option<String>,
    destination: String,
    #[serde(default)]
    travel_date: Option<NaiveDate>,
    #[serde(default)]
    party_size: Option<i64>,
    #[serde(default)]
    budget: String,
    #[serde(default)]
    notes: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct DraftGenerateRequest {
    #[serde(default)]
    start_date: Option<NaiveDate>,
    #[serde(default)]
    structure: String,
    #[serde(default)]
    sightseeing: String,
    #[serde(default)]
    flight_pnr: String,
}

#[derive(Debug, Clone, Deserialize)]
struct DraftBlocksRequest {
    itinerary: String,
    #[serde(default)]
    hotels: String,
    #[serde(default)]
    price: String,
}

pub async fn build_app() -> Result<Router> {
    let metrics = AppMetrics::shared();

    let store = if let Ok(database_url) = env::var("MERIDIAN_DATABASE_URL") {
        Store::sqlite(&database_url)
            .await
            .context("failed to open the enquiry database")?
    } else {
        Store::memory()
    };

    let gemini_key = env::var("GEMINI_API_KEY").unwrap_or_default();
    if gemini_key.is_empty() {
        tracing::warn!("GEMINI_API_KEY is not set; draft generation will fail");
    }
    let mut genai = GeminiClient::new(gemini_key).context("failed to build the Gemini client")?;
    if let Ok(base) = env::var("GEMINI_API_BASE") {
        genai = genai.with_base_url(base);
    }

    let agent = Arc::new(DeskAgent::new(Arc::new(store), genai, metrics.clone()));

    let api_key = env::var("MERIDIAN_API_KEY").unwrap_or_else(|_| "dev-meridian-key".to_string());
    let rate_limit_window = Duration::from_secs(
        env::var("MERIDIAN_RATE_LIMIT_WINDOW_SECONDS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(60),
    );
    let rate_limit_max = env::var("MERIDIAN_RATE_LIMIT_MAX")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(80);

    let state = ApiState {
        agent,
        metrics,
        api_key,
        limiter: IpRateLimiter::new(rate_limit_window, rate_limit_max),
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/enquiries", post(create_enquiry).get(list_enquiries))
        .route("/v1/enquiries/:id/session", get(open_session))
        .route("/v1/enquiries/:id/draft", post(request_draft))
        .route("/v1/enquiries/:id/save", post(save_progress))
        .route("/v1/enquiries/:id/finalize", post(finalize))
        .layer(build_cors_layer())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_key_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn create_enquiry(
    State(state): State<ApiState>,
    Json(input): Json<EnquiryCreateRequest>,
) -> Response {
    let lead = NewLead {
        name: input.name,
        phone: input.phone,
        email: input.email,
        source: input
            .source
            .as_deref()
            .and_then(meridian_core::LeadSource::parse),
    };
    let enquiry = NewEnquiry {
        destination: input.destination,
        travel_date: input.travel_date,
        party_size: input.party_size,
        budget: input.budget,
        notes: input.notes,
    };

    match state.agent.create_enquiry(lead, enquiry).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn list_enquiries(State(state): State<ApiState>) -> Response {
    match state.agent.list_enquiries().await {
        Ok(enquiries) => (StatusCode::OK, Json(enquiries)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn open_session(State(state): State<ApiState>, Path(id): Path<i64>) -> Response {
    match state.agent.open_session(id).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn request_draft(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(input): Json<DraftGenerateRequest>,
) -> Response {
    let request = DraftRequest {
        start_date: input.start_date,
        structure: input.structure,
        sightseeing: input.sightseeing,
        flight_pnr: input.flight_pnr,
    };

    match state.agent.request_draft(id, request).await {
        Ok(draft) => (StatusCode::OK, Json(draft)).into_response(),
        Err(error) => error_response(error),
    }
}

async fn save_progress(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(input): Json<DraftBlocksRequest>,
) -> Response {
    match state
        .agent
        .save_progress(id, &input.itinerary, &input.hotels, &input.price)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "ok": true,
                "status": "Work in Progress"
            })),
        )
            .into_response(),
        Err(error) => error_response(error),
    }
}

async fn finalize(
    State(state): State<ApiState>,
    Path(id): Path<i64>,
    Json(input): Json<DraftBlocksRequest>,
) -> Response {
    match state
        .agent
        .finalize(id, &input.itinerary, &input.hotels, &input.price)
        .await
    {
        Ok(bytes) => {
            let mut response = (StatusCode::OK, bytes).into_response();
            response.headers_mut().insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/pdf"),
            );
            if let Ok(disposition) = HeaderValue::from_str(&format!(
                "attachment; filename=\"Quote_{id}.pdf\""
            )) {
                response
                    .headers_mut()
                    .insert(header::CONTENT_DISPOSITION, disposition);
            }
            response
        }
        Err(error) => error_response(error),
    }
}

/// Maps the error taxonomy onto the HTTP surface: validation is the
/// caller's fault, provider failures are upstream, everything else is
/// ours.
fn error_response(error: DeskError) -> Response {
    let (status, code) = match &error {
        DeskError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_failed"),
        DeskError::Persistence { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "persistence_failed"),
        DeskError::Discovery { .. } => (StatusCode::BAD_GATEWAY, "model_discovery_failed"),
        DeskError::NoModelAvailable => (StatusCode::BAD_GATEWAY, "no_model_available"),
        DeskError::QuotaExceeded { .. } => (StatusCode::BAD_GATEWAY, "quota_exceeded"),
        DeskError::ModelNotFound { .. } => (StatusCode::BAD_GATEWAY, "model_not_found"),
        DeskError::Provider { .. } => (StatusCode::BAD_GATEWAY, "provider_error"),
        DeskError::Connection(_) => (StatusCode::BAD_GATEWAY, "provider_unreachable"),
        DeskError::MalformedResponse => (StatusCode::BAD_GATEWAY, "malformed_provider_response"),
        DeskError::Rendering(_) => (StatusCode::INTERNAL_SERVER_ERROR, "rendering_failed"),
    };

    (
        status,
        Json(serde_json::json!({
            "error": code,
            "message": error.to_string()
        })),
    )
        .into_response()
}

fn is_public_endpoint(path: &str) -> bool {
    path == "/health"
}

async fn api_key_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if request.method() == Method::OPTIONS || is_public_endpoint(path.as_str()) {
        return next.run(request).await;
    }

    let header_key = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    if header_key != state.api_key {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": "unauthorized",
                "message": "missing or invalid x-api-key"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        return next.run(request).await;
    }

    let path = request.uri().path().to_string();
    if is_public_endpoint(path.as_str()) {
        return next.run(request).await;
    }

    let ip = request_ip(&request);
    if !state.limiter.allow(&ip) {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "rate_limited",
                "message": "rate limit exceeded for this IP"
            })),
        )
            .into_response();
    }

    next.run(request).await
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn build_cors_layer() -> CorsLayer {
    let origins = env::var("MERIDIAN_ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let origins = if origins.is_empty() {
        vec![HeaderValue::from_static("http://localhost:5500")]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-api-key"),
        ])
}
