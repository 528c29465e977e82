// Series service - Fetches statistics and shapes them into graph series
use crate::application::stat_repository::StatRepository;
use crate::domain::geometry::{Point, RgbColor};
use crate::domain::meter::MeterSeries;
use crate::domain::series::{GraphData, StatSample, TimeWindow};
use crate::error::StatError;
use std::sync::Arc;

/// Roughly how many buckets a window is split into.
pub const TARGET_BUCKETS: i64 = 500;
/// The statistics service doesn't aggregate below one second.
pub const MIN_STEP_MS: i64 = 1000;
/// Samples further apart than this many steps leave a visible gap.
pub const GAP_STEPS: i64 = 3;

pub fn step_for_window(window: &TimeWindow) -> i64 {
    (window.duration_ms() / TARGET_BUCKETS).max(MIN_STEP_MS)
}

/// A fetched series plus what went wrong getting it, if anything.
#[derive(Debug, Clone)]
pub struct FetchedSeries {
    pub series: GraphData,
    pub gaps: Vec<(f64, f64)>,
    pub unreachable: bool,
}

#[derive(Clone)]
pub struct SeriesService {
    repository: Arc<dyn StatRepository>,
}

impl SeriesService {
    pub fn new(repository: Arc<dyn StatRepository>) -> Self {
        Self { repository }
    }

    pub async fn fetch_samples(
        &self,
        server_id: &str,
        metric: &str,
        window: &TimeWindow,
        step_ms: i64,
    ) -> Result<Vec<StatSample>, StatError> {
        self.repository
            .statistics_data(server_id, metric, window.start_ms, window.end_ms, step_ms)
            .await
    }

    /// Never fails: a fetch error is logged and yields an empty series.
    pub async fn fetch_series(
        &self,
        server_id: &str,
        meter: &MeterSeries,
        window: &TimeWindow,
    ) -> FetchedSeries {
        let step = step_for_window(window);

        match self.fetch_samples(server_id, &meter.name, window, step).await {
            Ok(samples) => {
                tracing::debug!(
                    "Fetched {} samples of {} for {}",
                    samples.len(),
                    meter.name,
                    server_id
                );
                FetchedSeries {
                    gaps: find_gaps(&samples, step),
                    series: to_graph_data(&meter.label, meter.color, &samples, window, meter.envelope),
                    unreachable: false,
                }
            }
            Err(e) => {
                tracing::warn!("Error fetching {} for {}: {}", meter.name, server_id, e);
                FetchedSeries {
                    series: GraphData::new(meter.label.clone(), meter.color, Vec::new()),
                    gaps: Vec::new(),
                    unreachable: e.is_unreachable(),
                }
            }
        }
    }
}

/// Keeps samples inside the window in time order. With `expand_envelope`
/// each sample becomes `min, max, avg` points at the same time so the line
/// shows the spread; otherwise min/max ride along as the envelope.
pub fn to_graph_data(
    label: &str,
    color: RgbColor,
    samples: &[StatSample],
    window: &TimeWindow,
    expand_envelope: bool,
) -> GraphData {
    let mut kept: Vec<&StatSample> = samples
        .iter()
        .filter(|s| window.contains(s.time_ms) && s.value.is_finite())
        .collect();
    kept.sort_by_key(|s| s.time_ms);

    if expand_envelope {
        let points = kept
            .iter()
            .flat_map(|s| {
                let t = s.time_ms as f64;
                [
                    Point::new(t, finite_or(s.min, s.value)),
                    Point::new(t, finite_or(s.max, s.value)),
                    Point::new(t, s.value),
                ]
            })
            .collect();
        return GraphData::new(label, color, points);
    }

    let points = kept
        .iter()
        .map(|s| Point::new(s.time_ms as f64, s.value))
        .collect();
    let envelope = kept
        .iter()
        .map(|s| (finite_or(s.min, s.value), finite_or(s.max, s.value)))
        .collect();
    GraphData::new(label, color, points).with_envelope(envelope)
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() { value } else { fallback }
}

/// Intervals between consecutive samples spaced more than `GAP_STEPS` apart.
pub fn find_gaps(samples: &[StatSample], step_ms: i64) -> Vec<(f64, f64)> {
    let mut times: Vec<i64> = samples.iter().map(|s| s.time_ms).collect();
    times.sort_unstable();

    let limit = step_ms.max(1) * GAP_STEPS;
    times
        .windows(2)
        .filter(|pair| pair[1].saturating_sub(pair[0]) > limit)
        .map(|pair| (pair[0] as f64, pair[1] as f64))
        .collect()
}
