// Dashboard view models sent to the browser console
use super::geometry::{Range, RgbColor};
use super::meter::YLabelStyle;
use super::series::{BlockData, GraphData, TimeWindow};
use serde::Serialize;

/// Shown in place of a graph whose series have no samples.
pub const NO_DATA_MESSAGE: &str = "No Data";
pub const CANT_CONTACT_SERVER: &str = "Can't contact server";

/// One line in flot's `{label, color, data: [[x, y], ...]}` shape.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesView {
    pub label: String,
    pub color: RgbColor,
    pub data: Vec<[f64; 2]>,
    /// `[[x, min, max], ...]` band drawn behind the line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<Vec<[f64; 3]>>,
}

impl From<&GraphData> for SeriesView {
    fn from(series: &GraphData) -> Self {
        let band = series.envelope().map(|envelope| {
            series
                .points()
                .iter()
                .zip(envelope)
                .map(|(p, (min, max))| [p.x, *min, *max])
                .collect()
        });
        Self {
            label: series.name.clone(),
            color: series.color,
            data: series.points().iter().map(|p| [p.x, p.y]).collect(),
            band,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockView {
    pub label: String,
    pub color: RgbColor,
    pub intervals: Vec<[f64; 2]>,
}

impl From<&BlockData> for BlockView {
    fn from(block: &BlockData) -> Self {
        Self {
            label: block.name.clone(),
            color: block.color,
            intervals: block.intervals.iter().map(|(s, e)| [*s, *e]).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphView {
    pub id: String,
    pub title: String,
    pub labels: YLabelStyle,
    /// Set when no series has a single sample; the console shows "No Data".
    pub no_data: bool,
    pub message: Option<String>,
    pub x_range: Range,
    pub y_range: Range,
    pub x_increment: f64,
    pub y_increment: f64,
    pub series: Vec<SeriesView>,
    pub blocks: Vec<BlockView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeterPageView {
    pub server_id: String,
    pub page_id: String,
    pub title: String,
    pub columns: usize,
    pub window: TimeWindow,
    pub graphs: Vec<GraphView>,
}

/// Sent first on a page stream so the console can lay out empty graphs.
#[derive(Debug, Clone, Serialize)]
pub struct PageSkeleton {
    pub server_id: String,
    pub page_id: String,
    pub title: String,
    pub columns: usize,
    pub window: TimeWindow,
    pub graphs: Vec<GraphSkeleton>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphSkeleton {
    pub id: String,
    pub title: String,
    pub labels: YLabelStyle,
    pub series: Vec<SeriesSkeleton>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesSkeleton {
    pub label: String,
    pub color: RgbColor,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeriesUpdate {
    pub graph_id: String,
    pub series: SeriesView,
    pub gaps: Vec<[f64; 2]>,
    pub unreachable: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompletionEvent {
    pub total_series: usize,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    Skeleton(PageSkeleton),
    SeriesUpdate(SeriesUpdate),
    Complete(CompletionEvent),
}
