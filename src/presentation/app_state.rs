// Application state for HTTP handlers
use crate::application::dashboard_service::DashboardService;
use crate::application::report_service::ReportService;
use crate::application::server_service::ServerService;
use crate::application::streaming_service::StreamingPageService;

#[derive(Clone)]
pub struct AppState {
    pub server_service: ServerService,
    pub dashboard_service: DashboardService,
    pub streaming_service: StreamingPageService,
    pub report_service: ReportService,
}
