// Report service - Gathers server state and meter graphs into a PDF
use crate::application::dashboard_service::{DashboardService, GraphContent};
use crate::application::server_service::ServerService;
use crate::domain::dashboard::CANT_CONTACT_SERVER;
use crate::domain::geometry::Size;
use crate::domain::meter::YLabelStyle;
use crate::domain::report::{report_filename, Report, ReportRequest};
use crate::domain::series::TimeWindow;
use crate::domain::server::{MemoryState, ServerInfo, ThreadingInfo};
use crate::error::RenderError;
use crate::infrastructure::config::ReportSettings;
use crate::infrastructure::pdf_backend::PdfBackend;
use crate::rendering::backend::{DrawBackend, FontFace};
use crate::rendering::canvas::{Align, Canvas, Margins, TextOptions};
use crate::rendering::graph::{render_graph, GraphSpec, GraphStyle};
use crate::rendering::labels::{label_fn, magnitude_label};
use crate::rendering::layout::{GraphGrid, GraphPlacer};
use chrono::{DateTime, Utc};

const LABEL_COLUMN_WIDTH: f64 = 120.0;

/// Everything a report shows, fetched before rendering starts.
#[derive(Debug, Clone)]
pub struct ReportData {
    pub title: String,
    pub server_id: String,
    pub window: TimeWindow,
    pub generated_at: DateTime<Utc>,
    pub unreachable: bool,
    pub server: Option<ServerInfo>,
    pub memory: Option<MemoryState>,
    pub threading: Option<ThreadingInfo>,
    pub sections: Vec<ReportSection>,
}

#[derive(Debug, Clone)]
pub struct ReportSection {
    pub title: String,
    pub rows: usize,
    pub columns: usize,
    pub graphs: Vec<ReportGraph>,
}

#[derive(Debug, Clone)]
pub struct ReportGraph {
    pub title: String,
    pub labels: YLabelStyle,
    pub content: GraphContent,
}

/// Drawing state of one report being rendered.
pub struct ReportContext<B: DrawBackend> {
    canvas: Canvas<B>,
    window: TimeWindow,
    server_id: String,
    settings: ReportSettings,
    style: GraphStyle,
}

impl<B: DrawBackend> ReportContext<B> {
    pub fn new(backend: B, data: &ReportData, settings: &ReportSettings) -> Self {
        let page = Size::new(settings.page_width, settings.page_height);
        let style = GraphStyle {
            overshoot: settings.pixel_overshoot,
            ..GraphStyle::default()
        };

        Self {
            canvas: Canvas::new(backend, page, Margins::uniform(settings.margin)),
            window: data.window,
            server_id: data.server_id.clone(),
            settings: settings.clone(),
            style,
        }
    }

    pub fn write_header(
        &mut self,
        title: &str,
        generated_at: DateTime<Utc>,
    ) -> Result<(), RenderError> {
        self.canvas.begin_page()?;
        self.canvas.write_section(title)?;

        let window = format!(
            "{} to {}",
            format_time(self.window.start_ms),
            format_time(self.window.end_ms)
        );
        let server = self.server_id.clone();
        self.write_field("Server", &server)?;
        self.write_field("Time window", &window)?;
        let generated = generated_at.format("%Y-%m-%d %H:%M UTC").to_string();
        self.write_field("Generated", &generated)?;
        self.canvas.skip(8.0);
        Ok(())
    }

    pub fn write_server_summary(&mut self, data: &ReportData) -> Result<(), RenderError> {
        self.canvas.write_subsection("Server")?;

        if data.unreachable {
            self.canvas.save_state();
            self.canvas.set_font(FontFace::HelveticaBold, 10.0);
            let centered = TextOptions {
                align: Align::Center,
                ..TextOptions::default()
            };
            let result = self.canvas.write_text_with(&centered, CANT_CONTACT_SERVER);
            self.canvas.restore_state();
            return result;
        }

        if let Some(info) = &data.server {
            self.write_field("Version", info.version.as_deref().unwrap_or("-"))?;
            self.write_field("State", info.state.as_deref().unwrap_or("-"))?;
            let uptime = info.uptime_ms.map(format_duration).unwrap_or_default();
            self.write_field("Uptime", &uptime)?;
            self.write_field("Cluster", info.cluster.as_deref().unwrap_or("-"))?;
            let address = match (&info.address, info.port) {
                (Some(address), Some(port)) => format!("{}:{}", address, port),
                (Some(address), None) => address.clone(),
                _ => "-".to_string(),
            };
            self.write_field("Address", &address)?;
            if info.is_triad {
                self.write_field("Role", "triad server")?;
            }
        }

        if let Some(memory) = &data.memory {
            let heap = format!(
                "{} used of {} ({} free)",
                magnitude_label(memory.heap.used as f64),
                magnitude_label(memory.heap.max as f64),
                magnitude_label(memory.heap.free() as f64)
            );
            self.write_field("Heap", &heap)?;
        }

        if let Some(threads) = &data.threading {
            let summary = format!(
                "{} live, {} peak, pool {} active / {} idle / {} max",
                threads.thread_count,
                threads.peak_thread_count,
                threads.pool_active,
                threads.pool_idle,
                threads.pool_max
            );
            self.write_field("Threads", &summary)?;
        }
        Ok(())
    }

    /// One section per meter page, each starting on a fresh page.
    pub fn write_graph_section(&mut self, section: &ReportSection) -> Result<(), RenderError> {
        let rows = if section.rows > 0 { section.rows } else { self.settings.rows };
        let columns = if section.columns > 0 {
            section.columns
        } else {
            self.settings.columns
        };
        let mut placer = GraphPlacer::new(GraphGrid::new(rows, columns), section.title.clone());
        let x_range = self.window.as_range();

        for graph in &section.graphs {
            let (origin, size) = placer.place(&mut self.canvas)?;
            let spec = GraphSpec {
                blocks: &graph.content.blocks,
                y_labels: label_fn(graph.labels),
                message: graph.content.message(),
                ..GraphSpec::new(&graph.title, x_range, &graph.content.series)
            };
            render_graph(&mut self.canvas, origin, size, &spec, &self.style);
        }
        placer.finish(&mut self.canvas);
        Ok(())
    }

    fn write_field(&mut self, label: &str, value: &str) -> Result<(), RenderError> {
        let value_width = (self.canvas.content_width() - LABEL_COLUMN_WIDTH).max(1.0);
        self.canvas.begin_row()?;
        self.canvas.save_state();
        self.canvas.set_font(FontFace::HelveticaBold, 9.0);
        let result = self
            .canvas
            .write_text_column(LABEL_COLUMN_WIDTH, Align::Right, label);
        self.canvas.restore_state();
        result?;
        self.canvas.write_text_column(value_width, Align::Left, value)?;
        self.canvas.end_row();
        Ok(())
    }

    pub fn finish(self) -> B {
        self.canvas.into_backend()
    }
}

/// Lays out a whole report on any backend.
pub fn render_report<B: DrawBackend>(
    backend: B,
    data: &ReportData,
    settings: &ReportSettings,
) -> Result<B, RenderError> {
    let mut context = ReportContext::new(backend, data, settings);
    context.write_header(&data.title, data.generated_at)?;
    context.write_server_summary(data)?;

    if data.sections.is_empty() && !data.unreachable {
        context.canvas.skip(8.0);
        context.canvas.write_text("No meter graphs are recorded for this server.")?;
    }
    for section in &data.sections {
        context.write_graph_section(section)?;
    }
    Ok(context.finish())
}

#[derive(Clone)]
pub struct ReportService {
    server_service: ServerService,
    dashboard: DashboardService,
    settings: ReportSettings,
}

impl ReportService {
    pub fn new(
        server_service: ServerService,
        dashboard: DashboardService,
        settings: ReportSettings,
    ) -> Self {
        Self {
            server_service,
            dashboard,
            settings,
        }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }

    pub async fn generate(&self, request: ReportRequest) -> anyhow::Result<Report> {
        let data = self.gather(&request).await;
        let settings = self.settings.clone();
        tracing::info!(
            "Rendering report {} for {} with {} sections",
            data.title,
            data.server_id,
            data.sections.len()
        );

        let filename = report_filename(&data.title, data.generated_at);
        let bytes = tokio::task::spawn_blocking(move || -> Result<Vec<u8>, RenderError> {
            let backend = render_report(PdfBackend::new(data.title.clone()), &data, &settings)?;
            backend.into_bytes()
        })
        .await??;

        Ok(Report { filename, bytes })
    }

    /// Bean server failures never abort a report: an unreachable server is
    /// reported as such, anything else just leaves its part out.
    pub async fn gather(&self, request: &ReportRequest) -> ReportData {
        let server_id = request.server_id.as_str();
        let mut data = ReportData {
            title: request.title.clone(),
            server_id: server_id.to_string(),
            window: request.window,
            generated_at: Utc::now(),
            unreachable: false,
            server: None,
            memory: None,
            threading: None,
            sections: Vec::new(),
        };

        match self.server_service.server_info(server_id).await {
            Ok(info) => data.server = Some(info),
            Err(e) if e.is_unreachable() => {
                tracing::warn!("Report for {}: {}", server_id, e);
                data.unreachable = true;
                return data;
            }
            Err(e) => tracing::warn!("Error fetching server info for {}: {}", server_id, e),
        }
        data.memory = self.server_service.memory_state(server_id).await.ok();
        data.threading = self.server_service.threading_info(server_id).await.ok();

        for page in self.dashboard.meter_pages(server_id).await {
            let mut graphs = Vec::with_capacity(page.graphs.len());
            for graph in &page.graphs {
                graphs.push(ReportGraph {
                    title: graph.title.clone(),
                    labels: graph.labels,
                    content: self.dashboard.fetch_graph(server_id, graph, &request.window).await,
                });
            }
            data.sections.push(ReportSection {
                title: page.title,
                rows: page.rows,
                columns: page.columns,
                graphs,
            });
        }
        data
    }
}

fn format_time(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// "3d 04h 12m"
fn format_duration(ms: i64) -> String {
    let minutes = ms.max(0) / 60_000;
    let (days, hours, minutes) = (minutes / 1440, minutes / 60 % 24, minutes % 60);
    if days > 0 {
        format!("{}d {:02}h {:02}m", days, hours, minutes)
    } else {
        format!("{}h {:02}m", hours, minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::stat_repository::fake::FakeStatRepository;
    use crate::domain::geometry::RgbColor;
    use crate::domain::meter::{MeterGraph, MeterGraphPage, MeterSeries};
    use crate::domain::series::StatSample;
    use crate::rendering::graph::NO_DATA;
    use crate::rendering::recording::RecordingBackend;
    use serde_json::json;
    use std::sync::Arc;

    const HEAP: &str = "Resin|JVM|Memory|Heap Used";
    const THREADS: &str = "Resin|Thread|JVM Thread Count";

    fn pages() -> Vec<MeterGraphPage> {
        let meter = |name: &str| MeterSeries {
            name: name.to_string(),
            label: name.to_string(),
            color: RgbColor::BLUE,
            envelope: false,
        };
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
                    id: "threads".into(),
                    title: "Threads".into(),
                    labels: YLabelStyle::Magnitude,
                    meters: vec![meter(THREADS)],
                },
            ],
        }]
    }

    fn service(repo: FakeStatRepository) -> ReportService {
        let repo = Arc::new(repo);
        ReportService::new(
            ServerService::new(repo.clone()),
            DashboardService::new(repo, pages()),
            ReportSettings::default(),
        )
    }

    fn request() -> ReportRequest {
        ReportRequest {
            server_id: "app-0".into(),
            title: "Snapshot".into(),
            window: TimeWindow::new(0, 3_600_000),
        }
    }

    fn render(data: &ReportData) -> RecordingBackend {
        render_report(RecordingBackend::default(), data, &ReportSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_metric_without_data_reads_no_data() {
        let repo = FakeStatRepository::with_server("app-0")
            .bean("resin:type=Server", json!({"State": "ACTIVE", "Uptime": 90_000_000}))
            .stat(HEAP, vec![StatSample::new(600_000, 5e8, 4e8, 6e8)])
            .stat(THREADS, Vec::new());

        let data = service(repo).gather(&request()).await;
        assert!(!data.unreachable);
        assert_eq!(data.sections.len(), 1);

        let backend = render(&data);
        let texts = backend.texts();
        assert!(texts.contains(&"Snapshot"));
        assert!(texts.contains(&"ACTIVE"));
        assert!(texts.contains(&"1d 01h 00m"));
        assert!(texts.contains(&"JVM"));
        assert!(texts.contains(&"Threads"));
        assert!(texts.contains(&"No Data"));
        assert!(!texts.contains(&NO_DATA));
        // the heap graph plotted its line
        assert!(!backend.polylines_in(RgbColor::BLUE).is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_server_still_renders() {
        let data = service(FakeStatRepository::unreachable()).gather(&request()).await;
        assert!(data.unreachable);
        assert!(data.sections.is_empty());

        let backend = render(&data);
        assert!(backend.texts().contains(&CANT_CONTACT_SERVER));
        assert_eq!(backend.pages(), 1);

        let settings = ReportSettings::default();
        let font = crate::rendering::backend::Font::new(FontFace::HelveticaBold, 10.0);
        let content_width = settings.page_width - 2.0 * settings.margin;
        let expected_x =
            settings.margin + (content_width - font.text_width(CANT_CONTACT_SERVER)) / 2.0;
        let positions = backend.text_positions();
        let (at, _) = positions
            .iter()
            .find(|(_, text)| *text == CANT_CONTACT_SERVER)
            .unwrap();
        assert!((at.x - expected_x).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_field_labels_align_to_value_column() {
        let repo = FakeStatRepository::with_server("app-0")
            .bean("resin:type=Server", json!({"State": "ACTIVE"}));
        let data = service(repo).gather(&request()).await;

        let backend = render(&data);
        let settings = ReportSettings::default();
        let value_x = settings.margin + LABEL_COLUMN_WIDTH;
        let label_font = crate::rendering::backend::Font::new(FontFace::HelveticaBold, 9.0);
        let positions = backend.text_positions();

        let (label_at, _) = positions.iter().find(|(_, text)| *text == "State").unwrap();
        let label_end = label_at.x + label_font.text_width("State");
        assert!((label_end - (value_x - 2.0)).abs() < 1e-9);
        assert!(positions.iter().any(|(at, text)| *text == "ACTIVE" && at.x == value_x));
    }

    #[tokio::test]
    async fn test_sections_start_new_pages() {
        let repo = FakeStatRepository::with_server("app-0")
            .stat(HEAP, Vec::new())
            .stat(THREADS, Vec::new());
        let data = service(repo).gather(&request()).await;

        let backend = render(&data);
        assert_eq!(backend.pages(), 2);
    }

    #[tokio::test]
    async fn test_generate_writes_pdf() {
        let repo = FakeStatRepository::with_server("app-0").stat(HEAP, Vec::new());
        let report = service(repo).generate(request()).await.unwrap();

        assert!(report.bytes.starts_with(b"%PDF"));
        assert!(report.filename.starts_with("Snapshot_"));
        assert!(report.filename.ends_with(".pdf"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(90 * 60_000), "1h 30m");
        assert_eq!(format_duration(3 * 86_400_000 + 4 * 3_600_000), "3d 04h 00m");
        assert_eq!(format_duration(-5), "0h 00m");
    }
}
