// Meter graph page domain models
use super::geometry::RgbColor;
use serde::{Deserialize, Serialize};

/// How a graph's y-axis ticks are labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum YLabelStyle {
    #[default]
    Magnitude,
    Percent,
    Health,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeterSeries {
    /// Statistics name, e.g. "Resin|JVM|Memory|Heap Used".
    pub name: String,
    pub label: String,
    pub color: RgbColor,
    /// Draw min/max spikes around the average.
    pub envelope: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeterGraph {
    pub id: String,
    pub title: String,
    pub labels: YLabelStyle,
    pub meters: Vec<MeterSeries>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeterGraphPage {
    pub id: String,
    pub title: String,
    pub columns: usize,
    pub rows: usize,
    pub period_hours: i32,
    pub graphs: Vec<MeterGraph>,
}

impl MeterGraphPage {
    /// Keeps only meters the server actually records, dropping graphs left
    /// with nothing to plot.
    pub fn retain_available(&self, available: &[String]) -> Option<MeterGraphPage> {
        let graphs: Vec<MeterGraph> = self
            .graphs
            .iter()
            .filter_map(|graph| {
                let meters: Vec<MeterSeries> = graph
                    .meters
                    .iter()
                    .filter(|m| available.iter().any(|name| name == &m.name))
                    .cloned()
                    .collect();

                if meters.is_empty() {
                    tracing::debug!("Skipping graph {} - no recorded meters", graph.id);
                    return None;
                }

                Some(MeterGraph {
                    meters,
                    ..graph.clone()
                })
            })
            .collect();

        if graphs.is_empty() {
            return None;
        }

        Some(MeterGraphPage {
            graphs,
            ..self.clone()
        })
    }
}
