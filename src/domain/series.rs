// Time-series domain models
use super::geometry::{Point, Range, RgbColor};
use serde::{Deserialize, Serialize};

/// One bucket as returned by the statistics service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatSample {
    #[serde(rename = "time")]
    pub time_ms: i64,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl StatSample {
    #[cfg(test)]
    pub fn new(time_ms: i64, value: f64, min: f64, max: f64) -> Self {
        Self {
            time_ms,
            value,
            min,
            max,
        }
    }
}

/// The time span a graph or report covers, in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl TimeWindow {
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        if end_ms < start_ms {
            Self {
                start_ms: end_ms,
                end_ms: start_ms,
            }
        } else {
            Self { start_ms, end_ms }
        }
    }

    pub fn last_hours(end_ms: i64, hours: i32) -> Self {
        let span = i64::from(hours.max(1)) * 3_600_000;
        Self::new(end_ms.saturating_sub(span), end_ms)
    }

    pub fn duration_ms(&self) -> i64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    pub fn contains(&self, time_ms: i64) -> bool {
        time_ms >= self.start_ms && time_ms <= self.end_ms
    }

    pub fn as_range(&self) -> Range {
        Range::new(self.start_ms as f64, self.end_ms as f64)
    }
}

/// A named line on a graph. Built once from fetched samples.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphData {
    pub name: String,
    pub color: RgbColor,
    points: Vec<Point>,
    envelope: Option<Vec<(f64, f64)>>,
    max_value: f64,
}

impl GraphData {
    pub fn new(name: impl Into<String>, color: RgbColor, points: Vec<Point>) -> Self {
        let max_value = points.iter().map(|p| p.y).fold(0.0, f64::max);
        Self {
            name: name.into(),
            color,
            points,
            envelope: None,
            max_value,
        }
    }

    /// Attaches a per-point (min, max) envelope. Ignored unless it lines up
    /// one-to-one with the points.
    pub fn with_envelope(mut self, envelope: Vec<(f64, f64)>) -> Self {
        if envelope.len() == self.points.len() {
            self.max_value = envelope
                .iter()
                .map(|(_, max)| *max)
                .fold(self.max_value, f64::max);
            self.envelope = Some(envelope);
        }
        self
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn envelope(&self) -> Option<&[(f64, f64)]> {
        self.envelope.as_deref()
    }

    pub fn max_value(&self) -> f64 {
        self.max_value
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Shaded background intervals, e.g. windows with no samples.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockData {
    pub name: String,
    pub color: RgbColor,
    pub intervals: Vec<(f64, f64)>,
}

impl BlockData {
    pub fn new(name: impl Into<String>, color: RgbColor, intervals: Vec<(f64, f64)>) -> Self {
        Self {
            name: name.into(),
            color,
            intervals,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }
}
