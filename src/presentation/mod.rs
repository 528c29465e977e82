// Presentation layer - HTTP routes
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    get_memory, get_meter_page, get_report, get_server, get_threading, health_check,
    list_meter_pages, list_servers, list_thread_dumps, query_mbeans, stream_meter_page,
};
use axum::{routing::get, Router};
use std::sync::Arc;

// JSON compression is done in the response builders, so no CompressionLayer
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/servers", get(list_servers))
        .route("/servers/:id", get(get_server))
        .route("/servers/:id/memory", get(get_memory))
        .route("/servers/:id/threading", get(get_threading))
        .route("/servers/:id/thread-dumps", get(list_thread_dumps))
        .route("/servers/:id/mbeans", get(query_mbeans))
        .route("/servers/:id/meter-pages", get(list_meter_pages))
        .route("/servers/:id/meter-pages/:page", get(get_meter_page))
        .route("/servers/:id/meter-pages/:page/stream", get(stream_meter_page))
        .route("/servers/:id/report.pdf", get(get_report))
        .with_state(state)
}
