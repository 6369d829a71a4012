//! REST API endpoints for the dashboard.
//!
//! # Concurrency and Lock Acquisition
//!
//! - **`state.session`** (Mutex): Held only to read or commit session fields,
//!   never across a device request. Flash commands do not take it at all.
//! - **`state.latest` / `state.latest_frame`** (RwLock): Cloned out immediately.
//!
//! ## Error Handling
//!
//! All endpoints return structured JSON errors via [`AppError`]. Device
//! failures map to 502, actuator commands outside manual mode to 409.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use plantcare_core::{ClassifierState, Snapshot, apply_thresholds, change_mode, send_manual};
use plantcare_types::{Command, Mode, RoofCommand, Switch, ThresholdSet};

use crate::collector::Collector;
use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        // Health and status
        .route("/api/health", get(health))
        .route("/api/status", get(get_status))
        // Live data
        .route("/api/snapshot", get(get_snapshot))
        .route("/api/camera/frame", get(get_frame))
        .route("/api/camera/flash", post(set_flash))
        // Settings
        .route("/api/thresholds", get(get_thresholds).put(put_thresholds))
        .route("/api/mode", get(get_mode).put(put_mode))
        // Manual controls
        .route("/api/control/pump", post(control_pump))
        .route("/api/control/fan", post(control_fan))
        .route("/api/control/roof", post(control_roof))
        // Session and refresh loop
        .route("/api/session/reset", post(reset_session))
        .route("/api/refresh/start", post(refresh_start))
        .route("/api/refresh/stop", post(refresh_stop))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Health check endpoint.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
    })
}

// ==========================================================================
// Status
// ==========================================================================

/// Service status response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub refresh: RefreshStatus,
    pub classifier: ClassifierState,
    pub session: SessionInfo,
    pub devices: DeviceInfo,
}

/// Refresh loop status.
#[derive(Debug, Serialize)]
pub struct RefreshStatus {
    pub running: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    pub uptime_seconds: Option<u64>,
    pub interval_ms: u64,
    pub auto_actuate: bool,
    pub cycles: u64,
    pub degraded_cycles: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_cycle_at: Option<OffsetDateTime>,
}

/// Session summary.
#[derive(Debug, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    pub mode: Mode,
    pub history_points: usize,
}

/// Configured device addresses.
#[derive(Debug, Serialize)]
pub struct DeviceInfo {
    pub controller: String,
    pub camera: Option<String>,
}

async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let running = state.refresh.is_running();
    let started_at = state.refresh.started_at().filter(|_| running);
    let uptime_seconds = started_at.map(|s| {
        let now = OffsetDateTime::now_utc();
        (now - s).whole_seconds().max(0) as u64
    });

    let config = &state.config;

    let session = {
        let session = state.session.lock().await;
        SessionInfo {
            id: session.id,
            started_at: session.started_at,
            mode: session.mode,
            history_points: session.moisture.len(),
        }
    };

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION"),
        timestamp: OffsetDateTime::now_utc(),
        refresh: RefreshStatus {
            running,
            started_at,
            uptime_seconds,
            interval_ms: config.dashboard.refresh_interval_ms,
            auto_actuate: config.dashboard.auto_actuate,
            cycles: state.refresh.cycles(),
            degraded_cycles: state.refresh.degraded_cycles(),
            last_cycle_at: state.refresh.last_cycle_at(),
        },
        classifier: state.classifier.state(),
        session,
        devices: DeviceInfo {
            controller: config.device.controller.clone(),
            camera: config.device.camera.clone(),
        },
    })
}

// ==========================================================================
// Live data
// ==========================================================================

async fn get_snapshot(State(state): State<Arc<AppState>>) -> Result<Json<Snapshot>, AppError> {
    let latest = state.latest.read().await.clone();
    latest
        .map(|s| Json(Snapshot::clone(&s)))
        .ok_or_else(|| AppError::NotFound("No snapshot yet".to_string()))
}

async fn get_frame(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let frame = state
        .latest_frame
        .read()
        .await
        .clone()
        .ok_or_else(|| AppError::NotFound("No camera frame yet".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, frame_content_type(&frame)),
            (header::CACHE_CONTROL, "no-store"),
        ],
        frame,
    ))
}

fn frame_content_type(frame: &[u8]) -> &'static str {
    const PNG_MAGIC: &[u8] = b"\x89PNG";
    if frame.starts_with(PNG_MAGIC) {
        "image/png"
    } else {
        "image/jpeg"
    }
}

// ==========================================================================
// Commands
// ==========================================================================

/// Body of on/off and open/close requests.
#[derive(Debug, Deserialize)]
pub struct StateRequest<T> {
    pub state: T,
}

/// Response for manual actions.
#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

async fn dispatch(state: &AppState, command: Command) -> Result<Json<ActionResponse>, AppError> {
    let message = send_manual(state.device.as_ref(), &state.session, command).await?;
    Ok(Json(ActionResponse {
        success: true,
        message,
    }))
}

async fn set_flash(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StateRequest<Switch>>,
) -> Result<Json<ActionResponse>, AppError> {
    dispatch(&state, Command::Flash(req.state)).await
}

async fn control_pump(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StateRequest<Switch>>,
) -> Result<Json<ActionResponse>, AppError> {
    dispatch(&state, Command::Pump(req.state)).await
}

async fn control_fan(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StateRequest<Switch>>,
) -> Result<Json<ActionResponse>, AppError> {
    dispatch(&state, Command::Fan(req.state)).await
}

async fn control_roof(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StateRequest<RoofCommand>>,
) -> Result<Json<ActionResponse>, AppError> {
    dispatch(&state, Command::Roof(req.state)).await
}

// ==========================================================================
// Thresholds and mode
// ==========================================================================

/// Threshold sets known to the dashboard.
#[derive(Debug, Serialize)]
pub struct ThresholdsResponse {
    /// Last applied from the dashboard.
    pub configured: ThresholdSet,
    /// Last fetched from the controller.
    pub device: Option<ThresholdSet>,
    /// Used for evaluation.
    pub effective: ThresholdSet,
}

async fn get_thresholds(State(state): State<Arc<AppState>>) -> Json<ThresholdsResponse> {
    let session = state.session.lock().await;
    Json(ThresholdsResponse {
        configured: session.thresholds,
        device: session.device_thresholds,
        effective: session.effective_thresholds(),
    })
}

/// Requested thresholds; values are clamped to the slider ranges.
#[derive(Debug, Deserialize)]
pub struct ThresholdsRequest {
    pub soil: f64,
    pub temp: f64,
    pub hum: f64,
}

/// Response after applying thresholds.
#[derive(Debug, Serialize)]
pub struct ApplyThresholdsResponse {
    pub success: bool,
    pub message: String,
    pub thresholds: ThresholdSet,
}

async fn put_thresholds(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ThresholdsRequest>,
) -> Result<Json<ApplyThresholdsResponse>, AppError> {
    if ![req.soil, req.temp, req.hum].iter().all(|v| v.is_finite()) {
        return Err(AppError::BadRequest(
            "thresholds must be finite numbers".to_string(),
        ));
    }

    let thresholds = apply_thresholds(
        state.device.as_ref(),
        &state.session,
        req.soil,
        req.temp,
        req.hum,
    )
    .await?;

    Ok(Json(ApplyThresholdsResponse {
        success: true,
        message: "Thresholds updated".to_string(),
        thresholds,
    }))
}

/// Current or requested control mode.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModeBody {
    pub mode: Mode,
}

async fn get_mode(State(state): State<Arc<AppState>>) -> Json<ModeBody> {
    let mode = state.session.lock().await.mode;
    Json(ModeBody { mode })
}

/// Response after changing mode.
#[derive(Debug, Serialize)]
pub struct ModeResponse {
    pub success: bool,
    pub message: String,
    pub mode: Mode,
}

async fn put_mode(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ModeBody>,
) -> Result<Json<ModeResponse>, AppError> {
    let message = change_mode(state.device.as_ref(), &state.session, req.mode).await?;
    Ok(Json(ModeResponse {
        success: true,
        message,
        mode: req.mode,
    }))
}

// ==========================================================================
// Session and refresh loop
// ==========================================================================

/// Response after a session reset.
#[derive(Debug, Serialize)]
pub struct SessionResetResponse {
    pub success: bool,
    pub message: String,
    pub session_id: Uuid,
    pub mode: Mode,
    /// Whether the controller was put back into auto mode.
    pub mode_synced: bool,
}

async fn reset_session(State(state): State<Arc<AppState>>) -> Json<SessionResetResponse> {
    let reset = plantcare_core::reset_session(state.device.as_ref(), &state.session).await;
    let message = match &reset.mode_error {
        None => "Session reset".to_string(),
        Some(e) => format!("Session reset, controller stayed in {} mode: {}", reset.mode, e),
    };
    Json(SessionResetResponse {
        success: true,
        message,
        session_id: reset.session_id,
        mode: reset.mode,
        mode_synced: reset.mode_error.is_none(),
    })
}

/// Response for refresh loop control actions.
#[derive(Debug, Serialize)]
pub struct RefreshActionResponse {
    pub success: bool,
    pub message: String,
    pub running: bool,
}

async fn refresh_start(State(state): State<Arc<AppState>>) -> Json<RefreshActionResponse> {
    let started = Collector::new(Arc::clone(&state)).start().await;
    Json(RefreshActionResponse {
        success: started,
        message: if started {
            "Refresh loop started".to_string()
        } else {
            "Refresh loop is already running".to_string()
        },
        running: true,
    })
}

async fn refresh_stop(State(state): State<Arc<AppState>>) -> Json<RefreshActionResponse> {
    let stopped = state.refresh.signal_stop();
    Json(RefreshActionResponse {
        success: stopped,
        message: if stopped {
            "Refresh loop stopped".to_string()
        } else {
            "Refresh loop is not running".to_string()
        },
        running: false,
    })
}

// ==========================================================================
// Errors
// ==========================================================================

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Device(plantcare_core::Error),
}

impl From<plantcare_core::Error> for AppError {
    fn from(e: plantcare_core::Error) -> Self {
        use plantcare_core::Error;
        match e {
            Error::ManualModeRequired(_) => AppError::Conflict(e.to_string()),
            Error::CameraNotConfigured => AppError::NotFound(e.to_string()),
            Error::InvalidConfig(_) => AppError::BadRequest(e.to_string()),
            other => AppError::Device(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use plantcare_core::Error;
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Device(
                e @ (Error::DeviceUnreachable { .. } | Error::MalformedResponse { .. }),
            ) => (StatusCode::BAD_GATEWAY, e.to_string()),
            AppError::Device(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use std::time::Duration;
    use tokio::time::Instant;
    use tower::ServiceExt;

    use plantcare_core::mock::{MockEndpoint, sample_frame};
    use plantcare_core::{ClassifierHandle, MockPlant, PlantDevice, UnreachableReason};

    use crate::config::Config;

    fn test_config() -> Config {
        let mut config = Config::default();
        config.device.controller = "http://127.0.0.1:1".to_string();
        config
    }

    fn create_test_state() -> (Arc<AppState>, Arc<MockPlant>) {
        let frame = sample_frame(4, 4, [0, 128, 0]).unwrap();
        let plant = Arc::new(MockPlant::new().with_frame(frame));
        let state = AppState::new(
            test_config(),
            plant.clone(),
            ClassifierHandle::disabled("model.onnx not found"),
        );
        (state, plant)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn send_json(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_empty(uri: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (state, _) = create_test_state();
        let response = router().with_state(state).oneshot(get("/api/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let (state, _) = create_test_state();
        let response = router().with_state(state).oneshot(get("/api/status")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["refresh"]["running"], false);
        assert_eq!(json["refresh"]["cycles"], 0);
        assert_eq!(json["refresh"]["interval_ms"], 2000);
        assert_eq!(json["classifier"]["state"], "disabled");
        assert_eq!(json["classifier"]["reason"], "model.onnx not found");
        assert_eq!(json["session"]["mode"], "auto");
        assert_eq!(json["devices"]["controller"], "http://127.0.0.1:1");
    }

    #[tokio::test]
    async fn test_snapshot_not_found_before_first_cycle() {
        let (state, _) = create_test_state();
        let response = router()
            .with_state(state)
            .oneshot(get("/api/snapshot"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = response_json(response).await;
        assert_eq!(json["error"], "No snapshot yet");
    }

    #[tokio::test]
    async fn test_snapshot_after_cycle() {
        let (state, plant) = create_test_state();
        plant.set_soil(40).await;
        state.refresh_once().await;

        let response = router()
            .with_state(state)
            .oneshot(get("/api/snapshot"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["cycle"], 1);
        assert_eq!(json["readings"]["soil"], 40);
        assert_eq!(json["status"]["pump"]["state"], "on");
        assert!(json["frame"]["bytes"].as_u64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_camera_frame() {
        let (state, _) = create_test_state();
        let app = router().with_state(Arc::clone(&state));

        let response = app.clone().oneshot(get("/api/camera/frame")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        state.refresh_once().await;
        let response = app.oneshot(get("/api/camera/frame")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert!(bytes.starts_with(b"\x89PNG"));
    }

    #[tokio::test]
    async fn test_manual_control_rejected_in_auto_mode() {
        let (state, plant) = create_test_state();
        let response = router()
            .with_state(state)
            .oneshot(send_json(
                "POST",
                "/api/control/pump",
                serde_json::json!({"state": "on"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Switch to Manual mode to control the pump");
        assert!(plant.commands().await.is_empty());
    }

    #[tokio::test]
    async fn test_manual_control_in_manual_mode() {
        let (state, plant) = create_test_state();
        let app = router().with_state(state);

        let response = app
            .clone()
            .oneshot(send_json(
                "PUT",
                "/api/mode",
                serde_json::json!({"mode": "manual"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["mode"], "manual");

        let response = app
            .clone()
            .oneshot(send_json(
                "POST",
                "/api/control/roof",
                serde_json::json!({"state": "open"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Opening the roof");

        let response = app
            .oneshot(send_json(
                "POST",
                "/api/control/fan",
                serde_json::json!({"state": "off"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(
            plant.commands().await,
            vec![
                Command::Roof(RoofCommand::Open),
                Command::Fan(Switch::Off)
            ]
        );
    }

    #[tokio::test]
    async fn test_flash_allowed_in_auto_mode() {
        let (state, plant) = create_test_state();
        let response = router()
            .with_state(state)
            .oneshot(send_json(
                "POST",
                "/api/camera/flash",
                serde_json::json!({"state": "on"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(plant.commands().await, vec![Command::Flash(Switch::On)]);
    }

    #[tokio::test]
    async fn test_mode_change_failure_is_bad_gateway() {
        let (state, plant) = create_test_state();
        plant.set_failing(MockEndpoint::Mode, true).await;
        let app = router().with_state(state);

        let response = app
            .clone()
            .oneshot(send_json(
                "PUT",
                "/api/mode",
                serde_json::json!({"mode": "manual"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let response = app.oneshot(get("/api/mode")).await.unwrap();
        let json = response_json(response).await;
        assert_eq!(json["mode"], "auto");
    }

    #[tokio::test]
    async fn test_put_thresholds_clamps() {
        let (state, plant) = create_test_state();
        let app = router().with_state(state);

        let response = app
            .clone()
            .oneshot(send_json(
                "PUT",
                "/api/thresholds",
                serde_json::json!({"soil": 150, "temp": 27.3, "hum": 60}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["thresholds"]["soil"], 100);
        assert_eq!(json["thresholds"]["temp"], 27.5);

        let response = app.oneshot(get("/api/thresholds")).await.unwrap();
        let json = response_json(response).await;
        assert_eq!(json["configured"]["soil"], 100);
        assert!(json["device"].is_null());
        assert_eq!(json["effective"]["hum"], 60);
        assert_eq!(plant.thresholds().await.soil, 100);
    }

    #[tokio::test]
    async fn test_invalid_body_rejected() {
        let (state, _) = create_test_state();
        let response = router()
            .with_state(state)
            .oneshot(send_json(
                "POST",
                "/api/control/pump",
                serde_json::json!({"state": "sideways"}),
            ))
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn test_session_reset() {
        let (state, plant) = create_test_state();
        state.refresh_once().await;
        let old_id = state.session.lock().await.id;
        state.session.lock().await.mode = Mode::Manual;
        plant.set_mode(Mode::Manual).await.unwrap();

        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(post_empty("/api/session/reset"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["message"], "Session reset");
        assert_eq!(json["mode"], "auto");
        assert_eq!(json["mode_synced"], true);

        let session = state.session.lock().await;
        assert_ne!(session.id, old_id);
        assert_eq!(json["session_id"], session.id.to_string());
        assert_eq!(session.mode, Mode::Auto);
        assert!(session.moisture.is_empty());
        assert_eq!(session.moisture.capacity(), state.config.dashboard.history_len);
        assert_eq!(plant.mode().await, Mode::Auto);
    }

    #[tokio::test]
    async fn test_session_reset_keeps_mode_when_controller_unreachable() {
        let (state, plant) = create_test_state();
        state.session.lock().await.mode = Mode::Manual;
        plant.set_failing(MockEndpoint::Mode, true).await;

        let response = router()
            .with_state(Arc::clone(&state))
            .oneshot(post_empty("/api/session/reset"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["mode"], "manual");
        assert_eq!(json["mode_synced"], false);
        assert!(
            json["message"]
                .as_str()
                .unwrap()
                .starts_with("Session reset, controller stayed in Manual mode")
        );
        assert_eq!(state.session.lock().await.mode, Mode::Manual);
    }

    #[tokio::test(start_paused = true)]
    async fn test_handlers_answer_during_slow_cycle() {
        let (state, plant) = create_test_state();
        plant.set_latency(Duration::from_secs(5));
        let app = router().with_state(Arc::clone(&state));

        let cycle = tokio::spawn({
            let state = Arc::clone(&state);
            async move { state.refresh_once().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        for uri in ["/api/mode", "/api/thresholds", "/api/status"] {
            let started = Instant::now();
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{}", uri);
            assert!(started.elapsed() < Duration::from_secs(1), "{} waited", uri);
        }

        // Flash pays its own device latency, not the cycle's.
        let started = Instant::now();
        let response = app
            .clone()
            .oneshot(send_json(
                "POST",
                "/api/camera/flash",
                serde_json::json!({"state": "on"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(started.elapsed() < Duration::from_secs(6));

        let snapshot = cycle.await.unwrap();
        assert_eq!(snapshot.cycle, 1);
    }

    #[tokio::test]
    async fn test_refresh_start_and_stop() {
        let (state, _) = create_test_state();
        let app = router().with_state(Arc::clone(&state));

        let response = app.clone().oneshot(post_empty("/api/refresh/stop")).await.unwrap();
        let json = response_json(response).await;
        assert_eq!(json["success"], false);

        let response = app.clone().oneshot(post_empty("/api/refresh/start")).await.unwrap();
        let json = response_json(response).await;
        assert_eq!(json["success"], true);
        assert!(state.refresh.is_running());

        let response = app.clone().oneshot(post_empty("/api/refresh/start")).await.unwrap();
        let json = response_json(response).await;
        assert_eq!(json["success"], false);

        let response = app.oneshot(post_empty("/api/refresh/stop")).await.unwrap();
        let json = response_json(response).await;
        assert_eq!(json["success"], true);
        assert!(!state.refresh.is_running());
    }

    #[test]
    fn test_app_error_statuses() {
        let cases = [
            (AppError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                AppError::Device(plantcare_core::Error::DeviceUnreachable {
                    url: "http://10.0.0.2/dht".into(),
                    reason: UnreachableReason::Timeout,
                }),
                StatusCode::BAD_GATEWAY,
            ),
            (
                AppError::Device(plantcare_core::Error::ModelLoad("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_core_error_conversion() {
        let error: AppError = plantcare_core::Error::ManualModeRequired("fan").into();
        assert!(matches!(error, AppError::Conflict(_)));
        let error: AppError = plantcare_core::Error::CameraNotConfigured.into();
        assert!(matches!(error, AppError::NotFound(_)));
    }

    #[test]
    fn test_frame_content_type() {
        assert_eq!(frame_content_type(b"\x89PNG\r\n"), "image/png");
        assert_eq!(frame_content_type(&[0xFF, 0xD8, 0xFF]), "image/jpeg");
    }
}
