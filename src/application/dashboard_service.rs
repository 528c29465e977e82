// Dashboard service - Meter graph pages and their plotted series
use crate::application::series_service::SeriesService;
use crate::application::stat_repository::StatRepository;
use crate::domain::dashboard::{
    BlockView, GraphView, MeterPageView, SeriesView, CANT_CONTACT_SERVER, NO_DATA_MESSAGE,
};
use crate::domain::geometry::{Range, RgbColor};
use crate::domain::meter::{MeterGraph, MeterGraphPage};
use crate::domain::series::{BlockData, GraphData, TimeWindow};
use crate::rendering::graph::{compute_x_increment, compute_y_increment, y_range_for};
use std::sync::Arc;

pub const GAP_BLOCK_NAME: &str = "No samples";

/// Series of one graph plus the intervals where samples are missing.
#[derive(Debug, Clone)]
pub struct GraphContent {
    pub series: Vec<GraphData>,
    pub blocks: Vec<BlockData>,
    pub unreachable: bool,
}

impl GraphContent {
    pub fn has_data(&self) -> bool {
        self.series.iter().any(|s| !s.is_empty())
    }

    /// Placeholder text for a graph with nothing to plot.
    pub fn message(&self) -> Option<&'static str> {
        match (self.has_data(), self.unreachable) {
            (true, _) => None,
            (false, true) => Some(CANT_CONTACT_SERVER),
            (false, false) => Some(NO_DATA_MESSAGE),
        }
    }
}

#[derive(Clone)]
pub struct DashboardService {
    repository: Arc<dyn StatRepository>,
    series_service: SeriesService,
    pages: Arc<Vec<MeterGraphPage>>,
}

impl DashboardService {
    pub fn new(repository: Arc<dyn StatRepository>, pages: Vec<MeterGraphPage>) -> Self {
        Self {
            series_service: SeriesService::new(repository.clone()),
            repository,
            pages: Arc::new(pages),
        }
    }

    pub fn series_service(&self) -> &SeriesService {
        &self.series_service
    }

    /// Configured pages trimmed to the meters this server records. A server
    /// that can't be reached has no pages.
    pub async fn meter_pages(&self, server_id: &str) -> Vec<MeterGraphPage> {
        let names = match self.repository.statistics_names(server_id).await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!("Error fetching statistics names for {}: {}", server_id, e);
                return Vec::new();
            }
        };

        tracing::debug!("{} records {} statistics", server_id, names.len());
        self.pages
            .iter()
            .filter_map(|page| page.retain_available(&names))
            .collect()
    }

    pub async fn meter_page(&self, server_id: &str, page_id: &str) -> Option<MeterGraphPage> {
        self.meter_pages(server_id)
            .await
            .into_iter()
            .find(|page| page.id == page_id)
    }

    pub async fn fetch_graph(
        &self,
        server_id: &str,
        graph: &MeterGraph,
        window: &TimeWindow,
    ) -> GraphContent {
        let mut series = Vec::with_capacity(graph.meters.len());
        let mut gaps = Vec::new();
        let mut unreachable = false;

        for meter in &graph.meters {
            let fetched = self.series_service.fetch_series(server_id, meter, window).await;
            unreachable |= fetched.unreachable;
            gaps.extend(fetched.gaps);
            series.push(fetched.series);
        }

        let intervals = merge_intervals(gaps);
        let blocks = if intervals.is_empty() {
            Vec::new()
        } else {
            vec![BlockData::new(GAP_BLOCK_NAME, RgbColor::LIGHT_GREY, intervals)]
        };

        GraphContent {
            series,
            blocks,
            unreachable,
        }
    }

    /// `None` when the page doesn't exist for this server.
    pub async fn page_view(
        &self,
        server_id: &str,
        page_id: &str,
        window: &TimeWindow,
    ) -> Option<MeterPageView> {
        let page = self.meter_page(server_id, page_id).await?;

        let mut graphs = Vec::with_capacity(page.graphs.len());
        for graph in &page.graphs {
            let content = self.fetch_graph(server_id, graph, window).await;
            graphs.push(graph_view(graph, &content, window));
        }

        Some(MeterPageView {
            server_id: server_id.to_string(),
            page_id: page.id,
            title: page.title,
            columns: page.columns,
            window: *window,
            graphs,
        })
    }
}

pub fn graph_view(graph: &MeterGraph, content: &GraphContent, window: &TimeWindow) -> GraphView {
    let x_range = window.as_range();
    let y_range = if content.has_data() {
        y_range_for(&content.series)
    } else {
        Range::new(0.0, 1.0)
    };

    GraphView {
        id: graph.id.clone(),
        title: graph.title.clone(),
        labels: graph.labels,
        no_data: !content.has_data(),
        message: content.message().map(str::to_string),
        x_range,
        y_range,
        x_increment: compute_x_increment(x_range.size()),
        y_increment: compute_y_increment(y_range.size()),
        series: content.series.iter().map(SeriesView::from).collect(),
        blocks: content.blocks.iter().map(BlockView::from).collect(),
    }
}

/// Sorts intervals and joins the ones that overlap.
fn merge_intervals(mut intervals: Vec<(f64, f64)>) -> Vec<(f64, f64)> {
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged: Vec<(f64, f64)> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::stat_repository::fake::FakeStatRepository;
    use crate::domain::meter::{MeterSeries, YLabelStyle};
    use crate::domain::series::StatSample;

    const HEAP: &str = "Resin|JVM|Memory|Heap Used";
    const CPU: &str = "Resin|OS|CPU Load Avg";

    fn meter(name: &str) -> MeterSeries {
        MeterSeries {
            name: name.to_string(),
            label: name.rsplit('|').next().unwrap_or(name).to_string(),
            color: RgbColor::BLUE,
            envelope: false,
        }
    }

    fn pages() -> Vec<MeterGraphPage> {
        vec![MeterGraphPage {
            id: "jvm".into(),
            title: "JVM".into(),
            columns: 2,
            rows: 3,
            period_hours: 6,
            graphs: vec![
                MeterGraph {
                    id: "heap".into(),
                    title: "Heap".into(),
                    labels: YLabelStyle::Magnitude,
                    meters: vec![meter(HEAP)],
                },
                MeterGraph {
                    id: "cpu".into(),
                    title: "CPU".into(),
                    labels: YLabelStyle::Percent,
                    meters: vec![meter(CPU)],
                },
            ],
        }]
    }

    fn samples(times: &[i64]) -> Vec<StatSample> {
        times
            .iter()
            .map(|t| StatSample::new(*t, 100.0, 90.0, 110.0))
            .collect()
    }

    #[tokio::test]
    async fn test_meter_pages_filtered_to_recorded_stats() {
        let repo = FakeStatRepository::with_server("app-0").stat(HEAP, samples(&[1_000]));
        let service = DashboardService::new(Arc::new(repo), pages());

        let pages = service.meter_pages("app-0").await;
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].graphs.len(), 1);
        assert_eq!(pages[0].graphs[0].id, "heap");
    }

    #[tokio::test]
    async fn test_unreachable_server_has_no_pages() {
        let service = DashboardService::new(Arc::new(FakeStatRepository::unreachable()), pages());
        assert!(service.meter_pages("app-0").await.is_empty());
        assert!(
            service
                .page_view("app-0", "jvm", &TimeWindow::new(0, 1_000))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_page_view_marks_missing_data() {
        // recorded, but nothing inside the requested window
        let repo = FakeStatRepository::with_server("app-0")
            .stat(HEAP, samples(&[1_000, 2_000]))
            .stat(CPU, Vec::new());
        let service = DashboardService::new(Arc::new(repo), pages());
        let window = TimeWindow::new(0, 3_600_000);

        let view = service.page_view("app-0", "jvm", &window).await.unwrap();
        let heap = &view.graphs[0];
        assert!(!heap.no_data);
        assert!(heap.message.is_none());
        assert_eq!(heap.series[0].data.len(), 2);

        let cpu = &view.graphs[1];
        assert!(cpu.no_data);
        assert_eq!(cpu.message.as_deref(), Some(NO_DATA_MESSAGE));

        let json = serde_json::to_string(&view).unwrap();
        assert!(json.contains("No Data"));
        assert!(!json.contains("\"error\""));
    }

    #[tokio::test]
    async fn test_gaps_become_blocks() {
        let repo = FakeStatRepository::with_server("app-0")
            .stat(HEAP, samples(&[0, 7_200, 14_400, 3_000_000, 3_007_200]))
            .stat(CPU, Vec::new());
        let service = DashboardService::new(Arc::new(repo), pages());
        let window = TimeWindow::new(0, 3_600_000);

        let graph = &pages()[0].graphs[0];
        let content = service.fetch_graph("app-0", graph, &window).await;
        assert_eq!(content.blocks.len(), 1);
        assert_eq!(content.blocks[0].intervals, vec![(14_400.0, 3_000_000.0)]);
    }

    #[test]
    fn test_merge_intervals() {
        let merged = merge_intervals(vec![(5.0, 8.0), (0.0, 2.0), (1.0, 3.0), (8.0, 9.0)]);
        assert_eq!(merged, vec![(0.0, 3.0), (5.0, 9.0)]);
    }
}
