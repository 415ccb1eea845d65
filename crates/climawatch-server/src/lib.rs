//! HTTP adapter for a running [`Monitor`].
//!
//! Exposes region snapshots for dashboards, accepts push events (metric
//! updates, weather updates and record changes) and lets clients start or stop observing
//! regions at runtime.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::Serialize;

use climawatch_core::{
    EventOutcome, MetricKind, Monitor, MonitorError, PushEvent, Reconciled, RegionSnapshot, Trend,
};

/// Consecutive poll failures after which a metric is reported as stale.
pub const STALE_AFTER_FAILURES: u32 = 3;

/// Shared server state.
struct AppState {
    monitor: Arc<Monitor>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    regions: usize,
    source: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct RegionsResponse {
    regions: Vec<RegionSummary>,
    total: usize,
}

#[derive(Debug, Serialize)]
struct RegionSummary {
    region: String,
    metrics: Vec<MetricSummary>,
}

#[derive(Debug, Serialize)]
struct MetricSummary {
    kind: MetricKind,
    label: String,
    unit: String,
    latest: Option<f64>,
    trend: Trend,
    arrow: String,
    /// Poll source has failed repeatedly; values are synthetic only.
    stale: bool,
}

#[derive(Debug, Serialize)]
struct ObserveResponse {
    created: bool,
    snapshot: RegionSnapshot,
}

#[derive(Debug, Serialize)]
struct EventResponse {
    accepted: bool,
    /// Reconcile outcome of a metric update.
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<Reconciled>,
    /// Per-metric results of a weather update.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    metrics: Vec<MetricOutcome>,
}

#[derive(Debug, Serialize)]
struct MetricOutcome {
    kind: MetricKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<Reconciled>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl EventResponse {
    fn accepted(outcome: Option<Reconciled>) -> Self {
        Self {
            accepted: true,
            outcome,
            metrics: Vec::new(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<(StatusCode, Json<T>), ApiError>;

trait JsonWithStatus<T> {
    fn with_status(self, status: StatusCode) -> (StatusCode, Json<T>);
}

impl<T> JsonWithStatus<T> for Json<T> {
    fn with_status(self, status: StatusCode) -> (StatusCode, Json<T>) {
        (status, self)
    }
}

fn api_error(status: StatusCode, error: impl ToString) -> ApiError {
    Json(ErrorResponse {
        error: error.to_string(),
    })
    .with_status(status)
}

fn not_observed(region: &str) -> ApiError {
    api_error(
        StatusCode::NOT_FOUND,
        MonitorError::UnknownRegion(region.to_string()),
    )
}

fn summarize(snapshot: &RegionSnapshot) -> RegionSummary {
    RegionSummary {
        region: snapshot.region.clone(),
        metrics: snapshot
            .metrics
            .iter()
            .map(|m| MetricSummary {
                kind: m.kind,
                label: m.label.clone(),
                unit: m.unit.clone(),
                latest: m.latest,
                trend: m.trend,
                arrow: m.trend.arrow().to_string(),
                stale: m.poll_failures >= STALE_AFTER_FAILURES,
            })
            .collect(),
    }
}

async fn handle_index(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let regions = state.monitor.regions();
    Json(serde_json::json!({
        "name": "Climawatch Server",
        "version": climawatch_core::VERSION,
        "regions": regions.len(),
        "endpoints": {
            "/": "This API index",
            "/health": "Health check",
            "/regions": "Latest value and trend of every metric in every observed region",
            "/regions/{region}": {
                "GET": "Full snapshot (24-sample windows) of one region",
                "PUT": "Start observing a region",
                "DELETE": "Stop observing a region",
            },
            "/events": {
                "method": "POST",
                "description": "Push event: metric_update, weather_update or record_change",
                "example": {
                    "event": "metric_update",
                    "region": regions.first().map(|s| s.as_str()).unwrap_or("Liberia"),
                    "kind": "uv_index",
                    "value": 6.5,
                },
            },
        },
    }))
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let regions = state.monitor.regions().len();
    Json(HealthResponse {
        status: if regions > 0 {
            "healthy".to_string()
        } else {
            "idle".to_string()
        },
        regions,
        source: state.monitor.source_name().to_string(),
        version: climawatch_core::VERSION.to_string(),
    })
}

async fn handle_regions(State(state): State<Arc<AppState>>) -> Json<RegionsResponse> {
    let regions: Vec<RegionSummary> = state.monitor.snapshots().iter().map(summarize).collect();
    let total = regions.len();
    Json(RegionsResponse { regions, total })
}

async fn handle_region(
    State(state): State<Arc<AppState>>,
    Path(region): Path<String>,
) -> ApiResult<RegionSnapshot> {
    match state.monitor.snapshot(&region) {
        Some(snapshot) => Ok(Json(snapshot).with_status(StatusCode::OK)),
        None => Err(not_observed(&region)),
    }
}

async fn handle_observe(
    State(state): State<Arc<AppState>>,
    Path(region): Path<String>,
) -> ApiResult<ObserveResponse> {
    if region.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "region name is empty"));
    }
    let created = state.monitor.observe(&region).await;
    let snapshot = state
        .monitor
        .snapshot(&region)
        // Forgotten by a concurrent request between the two calls.
        .ok_or_else(|| not_observed(&region))?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok(Json(ObserveResponse { created, snapshot }).with_status(status))
}

async fn handle_forget(
    State(state): State<Arc<AppState>>,
    Path(region): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.monitor.forget(&region) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_observed(&region))
    }
}

fn monitor_error(e: MonitorError) -> ApiError {
    let status = match e {
        MonitorError::UnknownRegion(_) => StatusCode::NOT_FOUND,
        MonitorError::Rejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
        MonitorError::Closed { .. } => StatusCode::SERVICE_UNAVAILABLE,
    };
    api_error(status, e)
}

/// A weather update is accepted if at least one metric took its value; when
/// every metric refused it the first error decides the status.
fn weather_response(
    outcomes: Vec<(MetricKind, Result<Reconciled, MonitorError>)>,
) -> ApiResult<EventResponse> {
    if let Some(first) = outcomes.first()
        && outcomes.iter().all(|(_, r)| r.is_err())
        && let Err(e) = &first.1
    {
        return Err(monitor_error(e.clone()));
    }
    let metrics = outcomes
        .into_iter()
        .map(|(kind, result)| match result {
            Ok(outcome) => MetricOutcome {
                kind,
                outcome: Some(outcome),
                error: None,
            },
            Err(e) => MetricOutcome {
                kind,
                outcome: None,
                error: Some(e.to_string()),
            },
        })
        .collect();
    Ok(Json(EventResponse {
        accepted: true,
        outcome: None,
        metrics,
    })
    .with_status(StatusCode::ACCEPTED))
}

async fn handle_event(
    State(state): State<Arc<AppState>>,
    Json(event): Json<PushEvent>,
) -> ApiResult<EventResponse> {
    match state.monitor.handle_event(event).await.map_err(monitor_error)? {
        EventOutcome::Metric(outcome) => {
            Ok(Json(EventResponse::accepted(Some(outcome))).with_status(StatusCode::ACCEPTED))
        }
        EventOutcome::Weather(outcomes) => weather_response(outcomes),
        EventOutcome::Ignored => {
            Ok(Json(EventResponse::accepted(None)).with_status(StatusCode::ACCEPTED))
        }
    }
}

/// Build the axum router.
pub fn build_router(monitor: Arc<Monitor>) -> Router {
    let state = Arc::new(AppState { monitor });

    Router::new()
        .route("/", get(handle_index))
        .route("/health", get(handle_health))
        .route("/regions", get(handle_regions))
        .route(
            "/regions/{region}",
            get(handle_region).put(handle_observe).delete(handle_forget),
        )
        .route("/events", post(handle_event))
        .with_state(state)
}

/// Serve `monitor` over HTTP until the listener fails.
pub async fn run_server(monitor: Arc<Monitor>, host: &str, port: u16) -> std::io::Result<()> {
    let app = build_router(monitor);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("listening on http://{addr}");
    axum::serve(listener, app).await
}
