//! HTTP API for Konya Water
//!
//! Thin axum layer over [`DataGateway`]. Gateway operations never fail, so
//! the only error responses come from request validation.
//!
//! ## Endpoint Map
//!
//! | Method | Path                                | Description                     |
//! |--------|-------------------------------------|---------------------------------|
//! | GET    | `/health`                           | Load balancer health check      |
//! | GET    | `/api/v1/status`                    | Store initialization phase      |
//! | POST   | `/api/v1/usage`                     | Store a usage record            |
//! | POST   | `/api/v1/intake`                    | Store and analyze a record      |
//! | POST   | `/api/v1/analysis`                  | Analyze a record                |
//! | GET    | `/api/v1/analysis/:id`              | Stored analysis                 |
//! | PUT    | `/api/v1/family-settings/:user_id`  | Replace household settings      |
//! | GET    | `/api/v1/reservoirs`                | Reservoir snapshot              |
//! | GET    | `/api/v1/usage/:user_id/history`    | Chart history                   |

use crate::gateway::{DataGateway, InitPhase};
use crate::models::{FamilySettings, UsageRecord};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<DataGateway>,
    /// Owner stamped on records submitted without a `userId`
    pub default_user_id: String,
}

/// Build the complete HTTP application
pub fn build_app(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/status", get(status))
        .route("/api/v1/usage", post(submit_usage))
        .route("/api/v1/intake", post(intake))
        .route("/api/v1/analysis", post(analyze))
        .route("/api/v1/analysis/:id", get(get_analysis))
        .route("/api/v1/family-settings/:user_id", put(upsert_family_settings))
        .route("/api/v1/reservoirs", get(reservoirs))
        .route("/api/v1/usage/:user_id/history", get(usage_history))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors(cors_origins))
}

// =============================================================================
// Errors
// =============================================================================

/// API error response
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

/// API error detail
#[derive(Debug, Serialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: "BAD_REQUEST".to_string(),
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(self)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// Parse and validate a usage record, giving it an owner when it has none
fn accept_record(
    state: &AppState,
    body: Result<Json<UsageRecord>, JsonRejection>,
) -> Result<UsageRecord, ApiError> {
    let Json(mut record) = body?;
    record
        .validate()
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    if record.user_id.is_none() {
        record.user_id = Some(state.default_user_id.clone());
    }
    Ok(record)
}

// =============================================================================
// Handlers
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct StatusResponse {
    store: InitPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let handle = state.gateway.handle();
    Json(StatusResponse {
        store: handle.phase(),
        reason: handle.failure(),
    })
}

async fn submit_usage(
    State(state): State<AppState>,
    body: Result<Json<UsageRecord>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let record = accept_record(&state, body)?;
    let id = state.gateway.submit_usage_record(&record).await;
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "id": id }))))
}

async fn intake(
    State(state): State<AppState>,
    body: Result<Json<UsageRecord>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let record = accept_record(&state, body)?;
    let intake = state.gateway.record_and_analyze(&record).await;
    Ok((StatusCode::CREATED, Json(intake)))
}

async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<UsageRecord>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let record = accept_record(&state, body)?;
    Ok(Json(state.gateway.analyze_usage(&record).await))
}

async fn get_analysis(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    Json(state.gateway.get_analysis(&id).await)
}

async fn upsert_family_settings(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    body: Result<Json<FamilySettings>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Json(settings) = body?;
    state
        .gateway
        .upsert_family_settings(&user_id, &settings)
        .await;
    Ok(StatusCode::NO_CONTENT)
}

async fn reservoirs(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.gateway.get_reservoir_status().await)
}

async fn usage_history(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> impl IntoResponse {
    let history = state.gateway.get_usage_history(&user_id).await;
    Json(serde_json::json!({ "history": history }))
}

// =============================================================================
// CORS
// =============================================================================

fn build_cors(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() {
        cors.allow_origin(Any)
    } else {
        let parsed: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{StaticAnalyzer, UnavailableAnalyzer};
    use crate::gateway::{fallback_analysis, fallback_reservoirs, GatewayHandle};
    use crate::store::{DocumentStore, MemoryConnector, MemoryStore, FAMILY_SETTINGS};
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn make_app_with(connector: MemoryConnector) -> Router {
        make_app_with_origins(connector, &[])
    }

    fn make_app_with_origins(connector: MemoryConnector, origins: &[String]) -> Router {
        let handle = GatewayHandle::with_timing(
            Arc::new(connector),
            Duration::from_millis(10),
            Some(Duration::from_secs(1)),
        );
        let gateway = DataGateway::new(handle, Arc::new(UnavailableAnalyzer::new("offline")));
        build_app(
            AppState {
                gateway: Arc::new(gateway),
                default_user_id: "current-user".to_string(),
            },
            origins,
        )
    }

    fn make_app() -> (Router, Arc<MemoryStore>) {
        let connector = MemoryConnector::new();
        let store = connector.store();
        (make_app_with(connector), store)
    }

    async fn body_json(resp: Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 64)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn usage_json() -> Value {
        json!({
            "name": "Ayşe",
            "showerDuration": 12,
            "teethBrushing": "twice",
            "dishwasherUsage": "thrice",
            "washingMachineUsage": "twice",
            "gardenWatering": "once",
            "carWashing": "never"
        })
    }

    #[tokio::test]
    async fn test_health_check() {
        let resp = health_check().await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status_reports_phase() {
        let (app, _) = make_app();
        let resp = app.oneshot(get_request("/api/v1/status")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["store"], "uninitialized");
        assert!(json.get("reason").is_none());
    }

    #[tokio::test]
    async fn test_submit_usage_stamps_default_user() {
        let (app, store) = make_app();
        let resp = app
            .oneshot(json_request("POST", "/api/v1/usage", usage_json()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let id = body_json(resp).await["id"].as_str().unwrap().to_string();

        let doc = store.get("waterUsage", &id).await.unwrap().unwrap();
        assert_eq!(doc["userId"], "current-user");
    }

    #[tokio::test]
    async fn test_submit_usage_rejects_long_shower() {
        let (app, store) = make_app();
        let mut body = usage_json();
        body["showerDuration"] = json!(45);
        let resp = app
            .oneshot(json_request("POST", "/api/v1/usage", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"]["code"], "BAD_REQUEST");
        assert!(store.is_empty("waterUsage").await);
    }

    #[tokio::test]
    async fn test_submit_usage_rejects_bad_json() {
        let (app, _) = make_app();
        let resp = app
            .oneshot(json_request("POST", "/api/v1/usage", json!({"name": "x"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_analysis_falls_back() {
        let (app, _) = make_app();
        let resp = app
            .oneshot(json_request("POST", "/api/v1/analysis", usage_json()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["waterUsageScore"], 65.0);
        assert_eq!(json["totalLitersPerDay"], 142.0);
    }

    #[tokio::test]
    async fn test_intake_and_read_back() {
        let connector = MemoryConnector::new();
        let handle = GatewayHandle::with_timing(Arc::new(connector), Duration::from_millis(10), None);
        let mut live = fallback_analysis().clone();
        live.water_usage_score = 30.0;
        let gateway = DataGateway::new(handle, Arc::new(StaticAnalyzer::new(live)));
        let app = build_app(
            AppState {
                gateway: Arc::new(gateway),
                default_user_id: "current-user".to_string(),
            },
            &[],
        );

        let resp = app
            .clone()
            .oneshot(json_request("POST", "/api/v1/intake", usage_json()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let json = body_json(resp).await;
        assert_eq!(json["analysis"]["waterUsageScore"], 30.0);
        let id = json["id"].as_str().unwrap().to_string();

        let resp = app
            .oneshot(get_request(&format!("/api/v1/analysis/{}", id)))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await["waterUsageScore"], 30.0);
    }

    #[tokio::test]
    async fn test_get_unknown_analysis() {
        let (app, _) = make_app();
        let resp = app
            .oneshot(get_request("/api/v1/analysis/nonexistent-id"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["waterUsageScore"], 65.0);
    }

    #[tokio::test]
    async fn test_put_family_settings() {
        let (app, store) = make_app();
        let body = json!({
            "familyName": "Yılmaz",
            "familySize": "3",
            "homeType": "house",
            "hasPets": "yes",
            "hasGarden": "yes",
            "hasCar": "no",
            "region": "meram"
        });
        let resp = app
            .oneshot(json_request("PUT", "/api/v1/family-settings/u-7", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let doc = store.get(FAMILY_SETTINGS, "u-7").await.unwrap().unwrap();
        assert_eq!(doc["region"], "meram");
        assert!(doc["updatedAt"].is_string());
    }

    #[tokio::test]
    async fn test_reservoirs_with_store_down() {
        let app = make_app_with(MemoryConnector::failing("offline"));
        let resp = app.oneshot(get_request("/api/v1/reservoirs")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(
            json["barajlar"].as_array().unwrap().len(),
            fallback_reservoirs().reservoirs.len()
        );
    }

    #[tokio::test]
    async fn test_history_is_null() {
        let (app, _) = make_app();
        let resp = app
            .oneshot(get_request("/api/v1/usage/no-such-user/history"))
            .await
            .unwrap();
        assert_eq!(body_json(resp).await, json!({ "history": null }));
    }

    fn preflight(uri: &str, origin: &str) -> Request<Body> {
        Request::builder()
            .method("OPTIONS")
            .uri(uri)
            .header("origin", origin)
            .header("access-control-request-method", "PUT")
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_cors_preflight_with_origins() {
        let app = make_app_with_origins(
            MemoryConnector::new(),
            &["http://localhost:3000".to_string()],
        );
        let uri = "/api/v1/family-settings/u-1";

        let resp = app
            .clone()
            .oneshot(preflight(uri, "http://localhost:3000"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let headers = resp.headers();
        assert_eq!(
            headers.get("access-control-allow-origin").unwrap(),
            "http://localhost:3000"
        );
        let methods = headers
            .get("access-control-allow-methods")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(methods.contains("PUT"));

        let resp = app
            .oneshot(preflight(uri, "http://evil.example"))
            .await
            .unwrap();
        assert!(resp.headers().get("access-control-allow-origin").is_none());
    }

    #[tokio::test]
    async fn test_cors_preflight_any_origin() {
        let (app, _) = make_app();
        let resp = app
            .oneshot(preflight("/api/v1/usage", "http://example.org"))
            .await
            .unwrap();
        assert_eq!(
            resp.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }
}
