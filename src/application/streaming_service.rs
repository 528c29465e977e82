// Streaming page service - Progressive loading of meter graph pages
use crate::application::dashboard_service::DashboardService;
use crate::domain::dashboard::{
    CompletionEvent, GraphSkeleton, PageSkeleton, SeriesSkeleton, SeriesUpdate, SeriesView,
    StreamMessage,
};
use crate::domain::meter::MeterGraphPage;
use crate::domain::series::TimeWindow;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinSet;

const CHANNEL_CAPACITY: usize = 100;

#[derive(Clone)]
pub struct StreamingPageService {
    dashboard: DashboardService,
}

impl StreamingPageService {
    pub fn new(dashboard: DashboardService) -> Self {
        Self { dashboard }
    }

    /// Skeleton first, then one update per meter as its fetch finishes, then
    /// a completion event once every fetch is done. `None` when the server
    /// has no such page.
    pub async fn stream_page(
        &self,
        server_id: &str,
        page_id: &str,
        window: TimeWindow,
    ) -> Option<mpsc::Receiver<StreamMessage>> {
        let page = self.dashboard.meter_page(server_id, page_id).await?;
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let start_time = Instant::now();

        let _ = tx
            .send(StreamMessage::Skeleton(build_skeleton(server_id, &page, window)))
            .await;

        let mut tasks = JoinSet::new();
        for graph in &page.graphs {
            for meter in &graph.meters {
                let tx = tx.clone();
                let series_service = self.dashboard.series_service().clone();
                let server_id = server_id.to_string();
                let graph_id = graph.id.clone();
                let meter = meter.clone();

                tasks.spawn(async move {
                    let fetched = series_service.fetch_series(&server_id, &meter, &window).await;
                    let update = SeriesUpdate {
                        graph_id,
                        series: SeriesView::from(&fetched.series),
                        gaps: fetched.gaps.iter().map(|(s, e)| [*s, *e]).collect(),
                        unreachable: fetched.unreachable,
                    };
                    let _ = tx.send(StreamMessage::SeriesUpdate(update)).await;
                });
            }
        }

        let total_series = tasks.len();
        tracing::debug!("Streaming {} series for {}/{}", total_series, server_id, page_id);

        tokio::spawn(async move {
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    tracing::warn!("Series fetch task failed: {}", e);
                }
            }

            let complete = CompletionEvent {
                total_series,
                duration_ms: start_time.elapsed().as_millis() as i64,
            };
            let _ = tx.send(StreamMessage::Complete(complete)).await;
        });

        Some(rx)
    }
}

fn build_skeleton(server_id: &str, page: &MeterGraphPage, window: TimeWindow) -> PageSkeleton {
    let graphs = page
        .graphs
        .iter()
        .map(|graph| GraphSkeleton {
            id: graph.id.clone(),
            title: graph.title.clone(),
            labels: graph.labels,
            series: graph
                .meters
                .iter()
                .map(|m| SeriesSkeleton {
                    label: m.label.clone(),
                    color: m.color,
                })
                .collect(),
        })
        .collect();

    PageSkeleton {
        server_id: server_id.to_string(),
        page_id: page.id.clone(),
        title: page.title.clone(),
        columns: page.columns,
        window,
        graphs,
    }
}
