// HTTP request handlers
use crate::domain::dashboard::CANT_CONTACT_SERVER;
use crate::domain::report::ReportRequest;
use crate::domain::series::TimeWindow;
use crate::error::StatError;
use crate::infrastructure::chunked_json::stream_from_receiver;
use crate::infrastructure::http_response::{
    accepts_brotli, error_response, json_response, pdf_response,
};
use crate::presentation::app_state::AppState;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderMap, Response, StatusCode},
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_MBEAN_PATTERN: &str = "resin:*";

#[derive(Deserialize)]
pub struct RangeQuery {
    pub hours: Option<i32>,
    /// Window end in epoch milliseconds, now when absent.
    pub end: Option<i64>,
}

impl RangeQuery {
    fn window(&self, default_hours: i32) -> TimeWindow {
        let end = self.end.unwrap_or_else(|| Utc::now().timestamp_millis());
        TimeWindow::last_hours(end, self.hours.unwrap_or(default_hours))
    }
}

#[derive(Deserialize)]
pub struct MBeanQuery {
    pub pattern: Option<String>,
}

#[derive(Deserialize)]
pub struct ReportQuery {
    pub title: Option<String>,
    pub hours: Option<i32>,
    pub end: Option<i64>,
}

fn into_response(result: Result<Response<Body>, StatusCode>) -> Response<Body> {
    match result {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

/// Bean server failures become a 502 with a JSON error body.
async fn stat_response<T: Serialize>(
    result: Result<T, StatError>,
    what: &str,
    compress: bool,
) -> Response<Body> {
    match result {
        Ok(data) => into_response(json_response(&data, compress).await),
        Err(e) => {
            tracing::warn!("Error fetching {}: {}", what, e);
            let message = if e.is_unreachable() {
                CANT_CONTACT_SERVER.to_string()
            } else {
                e.to_string()
            };
            into_response(error_response(StatusCode::BAD_GATEWAY, &message, compress).await)
        }
    }
}

/// Lists degrade to empty when the bean server can't be reached.
async fn list_response<T: Serialize>(
    result: Result<Vec<T>, StatError>,
    what: &str,
    compress: bool,
) -> Response<Body> {
    let items = result.unwrap_or_else(|e| {
        tracing::warn!("Error fetching {}: {}", what, e);
        Vec::new()
    });
    into_response(json_response(&items, compress).await)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_servers(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let result = state.server_service.list_servers().await;
    list_response(result, "servers", accepts_brotli(&headers)).await
}

pub async fn get_server(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let result = state.server_service.server_info(&id).await;
    stat_response(result, "server info", accepts_brotli(&headers)).await
}

pub async fn get_memory(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let result = state.server_service.memory_state(&id).await;
    stat_response(result, "memory state", accepts_brotli(&headers)).await
}

pub async fn get_threading(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let result = state.server_service.threading_info(&id).await;
    stat_response(result, "threading info", accepts_brotli(&headers)).await
}

pub async fn list_thread_dumps(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let result = state.server_service.thread_dumps(&id).await;
    list_response(result, "thread dumps", accepts_brotli(&headers)).await
}

pub async fn query_mbeans(
    Path(id): Path<String>,
    Query(query): Query<MBeanQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let pattern = query.pattern.as_deref().unwrap_or(DEFAULT_MBEAN_PATTERN);
    let result = state.server_service.query_mbeans(&id, pattern).await;
    list_response(result, "mbeans", accepts_brotli(&headers)).await
}

pub async fn list_meter_pages(
    Path(id): Path<String>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let pages = state.dashboard_service.meter_pages(&id).await;
    into_response(json_response(&pages, accepts_brotli(&headers)).await)
}

pub async fn get_meter_page(
    Path((id, page_id)): Path<(String, String)>,
    Query(query): Query<RangeQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let window = query.window(state.report_service.settings().default_hours);
    match state.dashboard_service.page_view(&id, &page_id, &window).await {
        Some(view) => into_response(json_response(&view, accepts_brotli(&headers)).await),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Stream a meter page (progressive loading)
pub async fn stream_meter_page(
    Path((id, page_id)): Path<(String, String)>,
    Query(query): Query<RangeQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let window = query.window(state.report_service.settings().default_hours);
    match state.streaming_service.stream_page(&id, &page_id, window).await {
        Some(rx) => stream_from_receiver(rx, accepts_brotli(&headers))
            .await
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn get_report(
    Path(id): Path<String>,
    Query(query): Query<ReportQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let settings = state.report_service.settings();
    let end = query.end.unwrap_or_else(|| Utc::now().timestamp_millis());
    let request = ReportRequest {
        server_id: id,
        title: query.title.unwrap_or_else(|| settings.title.clone()),
        window: TimeWindow::last_hours(end, query.hours.unwrap_or(settings.default_hours)),
    };

    match state.report_service.generate(request).await {
        Ok(report) => into_response(pdf_response(report)),
        Err(e) => {
            tracing::error!("Report generation failed: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dashboard_service::DashboardService;
    use crate::application::report_service::ReportService;
    use crate::application::server_service::ServerService;
    use crate::application::stat_repository::fake::FakeStatRepository;
    use crate::application::streaming_service::StreamingPageService;
    use crate::domain::geometry::RgbColor;
    use crate::domain::meter::{MeterGraph, MeterGraphPage, MeterSeries, YLabelStyle};
    use crate::domain::series::StatSample;
    use crate::infrastructure::config::ReportSettings;
    use crate::presentation::router;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const HEAP: &str = "Resin|JVM|Memory|Heap Used";

    fn state(repo: FakeStatRepository) -> Arc<AppState> {
        let repo = Arc::new(repo);
        let pages = vec![MeterGraphPage {
            id: "jvm".into(),
            title: "JVM".into(),
            columns: 2,
            rows: 3,
            period_hours: 6,
            graphs: vec![MeterGraph {
                id: "heap".into(),
                title: "Heap".into(),
                labels: YLabelStyle::Magnitude,
                meters: vec![MeterSeries {
                    name: HEAP.into(),
                    label: "Heap Used".into(),
                    color: RgbColor::RED,
                    envelope: false,
                }],
            }],
        }];

        let server_service = ServerService::new(repo.clone());
        let dashboard_service = DashboardService::new(repo, pages);
        Arc::new(AppState {
            streaming_service: StreamingPageService::new(dashboard_service.clone()),
            report_service: ReportService::new(
                server_service.clone(),
                dashboard_service.clone(),
                ReportSettings::default(),
            ),
            server_service,
            dashboard_service,
        })
    }

    async fn get(state: Arc<AppState>, uri: &str) -> Response<Body> {
        router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: Response<Body>) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = get(state(FakeStatRepository::default()), "/healthz").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_list_servers() {
        let response = get(state(FakeStatRepository::with_server("app-0")), "/servers").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await[0]["id"], "app-0");
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let state = state(FakeStatRepository::unreachable());

        let response = get(state.clone(), "/servers/app-0").await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await, json!({"error": "Can't contact server"}));

        let response = get(state, "/servers/app-0/thread-dumps").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn test_meter_page_without_data() {
        let repo = FakeStatRepository::with_server("app-0").stat(HEAP, Vec::new());
        let response = get(
            state(repo),
            "/servers/app-0/meter-pages/jvm?hours=1&end=3600000",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let view = body_json(response).await;
        assert_eq!(view["window"], json!({"start_ms": 0, "end_ms": 3_600_000}));
        assert_eq!(view["graphs"][0]["no_data"], true);
        assert_eq!(view["graphs"][0]["message"], "No Data");
    }

    #[tokio::test]
    async fn test_meter_page_series() {
        let repo = FakeStatRepository::with_server("app-0")
            .stat(HEAP, vec![StatSample::new(60_000, 2e8, 1e8, 3e8)]);
        let response = get(
            state(repo),
            "/servers/app-0/meter-pages/jvm?hours=1&end=3600000",
        )
        .await;

        let view = body_json(response).await;
        let graph = &view["graphs"][0];
        assert_eq!(graph["no_data"], false);
        assert_eq!(graph["series"][0]["color"], "#cc0000");
        assert_eq!(graph["series"][0]["data"], json!([[60000.0, 2e8]]));
    }

    #[tokio::test]
    async fn test_meter_page_with_earliest_end_time() {
        let repo = FakeStatRepository::with_server("app-0").stat(HEAP, Vec::new());
        let response = get(
            state(repo),
            "/servers/app-0/meter-pages/jvm?hours=1&end=-9223372036854775808",
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let view = body_json(response).await;
        assert_eq!(view["window"]["start_ms"], json!(i64::MIN));
        assert_eq!(view["window"]["end_ms"], json!(i64::MIN));
    }

    #[tokio::test]
    async fn test_unknown_meter_page() {
        let repo = FakeStatRepository::with_server("app-0").stat(HEAP, Vec::new());
        let response = get(state(repo), "/servers/app-0/meter-pages/os").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_report_download() {
        let repo = FakeStatRepository::with_server("app-0").stat(HEAP, Vec::new());
        let response = get(
            state(repo),
            "/servers/app-0/report.pdf?title=Post%20Mortem&hours=2",
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"Post_Mortem_"));
    }
}
