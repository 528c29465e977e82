// Console settings and meter page configuration loading
use crate::domain::geometry::RgbColor;
use crate::domain::meter::{MeterGraph, MeterGraphPage, MeterSeries, YLabelStyle};
use crate::error::RenderError;
use crate::rendering::mapper::DEFAULT_OVERSHOOT;
use serde::Deserialize;

const ENV_PREFIX: &str = "STAT_CONSOLE";

#[derive(Debug, Deserialize, Clone)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub management: ManagementSettings,
    #[serde(default)]
    pub report: ReportSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ManagementSettings {
    /// Base URL of the management REST service.
    pub url: String,
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReportSettings {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_rows")]
    pub rows: usize,
    #[serde(default = "default_columns")]
    pub columns: usize,
    #[serde(default = "default_page_width")]
    pub page_width: f64,
    #[serde(default = "default_page_height")]
    pub page_height: f64,
    #[serde(default = "default_margin")]
    pub margin: f64,
    #[serde(default = "default_hours")]
    pub default_hours: i32,
    /// How far outside a graph converted points may land before the graph
    /// is treated as holding bad data.
    #[serde(default = "default_overshoot")]
    pub pixel_overshoot: f64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            title: default_title(),
            rows: default_rows(),
            columns: default_columns(),
            page_width: default_page_width(),
            page_height: default_page_height(),
            margin: default_margin(),
            default_hours: default_hours(),
            pixel_overshoot: default_overshoot(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_title() -> String {
    "Snapshot".to_string()
}

fn default_rows() -> usize {
    3
}

fn default_columns() -> usize {
    2
}

fn default_page_width() -> f64 {
    612.0
}

fn default_page_height() -> f64 {
    792.0
}

fn default_margin() -> f64 {
    36.0
}

fn default_hours() -> i32 {
    6
}

fn default_overshoot() -> f64 {
    DEFAULT_OVERSHOOT
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct MeterPagesConfig {
    #[serde(default)]
    pub pages: Vec<PageConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PageConfig {
    pub id: String,
    pub title: String,
    pub columns: Option<usize>,
    pub rows: Option<usize>,
    pub period_hours: Option<i32>,
    #[serde(default)]
    pub graphs: Vec<GraphConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GraphConfig {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub labels: YLabelStyle,
    #[serde(default)]
    pub meters: Vec<MeterConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MeterConfig {
    pub name: String,
    pub label: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub envelope: bool,
}

impl MeterPagesConfig {
    /// Resolves colors and per-page defaults.
    pub fn to_pages(&self, defaults: &ReportSettings) -> Result<Vec<MeterGraphPage>, RenderError> {
        self.pages
            .iter()
            .map(|page| -> Result<MeterGraphPage, RenderError> {
                let graphs = page
                    .graphs
                    .iter()
                    .map(|graph| -> Result<MeterGraph, RenderError> {
                        let meters = graph
                            .meters
                            .iter()
                            .enumerate()
                            .map(|(i, meter)| -> Result<MeterSeries, RenderError> {
                                let color = match &meter.color {
                                    Some(c) => c.parse()?,
                                    None => RgbColor::palette(i),
                                };
                                Ok(MeterSeries {
                                    name: meter.name.clone(),
                                    label: meter
                                        .label
                                        .clone()
                                        .unwrap_or_else(|| short_name(&meter.name)),
                                    color,
                                    envelope: meter.envelope,
                                })
                            })
                            .collect::<Result<Vec<_>, RenderError>>()?;

                        Ok(MeterGraph {
                            id: graph.id.clone(),
                            title: graph.title.clone(),
                            labels: graph.labels,
                            meters,
                        })
                    })
                    .collect::<Result<Vec<_>, RenderError>>()?;

                Ok(MeterGraphPage {
                    id: page.id.clone(),
                    title: page.title.clone(),
                    columns: page.columns.unwrap_or(defaults.columns).max(1),
                    rows: page.rows.unwrap_or(defaults.rows).max(1),
                    period_hours: page.period_hours.unwrap_or(defaults.default_hours),
                    graphs,
                })
            })
            .collect()
    }
}

/// "Resin|JVM|Memory|Heap Used" -> "Heap Used"
fn short_name(meter: &str) -> String {
    meter.rsplit('|').next().unwrap_or(meter).trim().to_string()
}

pub fn load_console_config() -> anyhow::Result<ConsoleConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/console"))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

pub fn load_meter_pages_config() -> anyhow::Result<MeterPagesConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/meter-pages").required(false))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{Config, File, FileFormat};

    fn parse<T: serde::de::DeserializeOwned>(toml: &str) -> T {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_console_defaults() {
        let config: ConsoleConfig = parse(
            r#"
            [management]
            url = "http://localhost:8080/resin-admin/rest"
            "#,
        );

        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.management.timeout_secs, 10);
        assert_eq!(config.report, ReportSettings::default());
    }

    #[test]
    fn test_meter_pages_resolve_colors_and_defaults() {
        let config: MeterPagesConfig = parse(
            r#"
            [[pages]]
            id = "jvm"
            title = "JVM"
            columns = 1

            [[pages.graphs]]
            id = "heap"
            title = "Heap"

            [[pages.graphs.meters]]
            name = "Resin|JVM|Memory|Heap Used"
            color = "red"

            [[pages.graphs.meters]]
            name = "Resin|JVM|Memory|Heap Free"
            label = "Free"

            [[pages.graphs]]
            id = "health"
            title = "Health"
            labels = "health"

            [[pages.graphs.meters]]
            name = "Resin|Health|Overall"
            "#,
        );

        let pages = config.to_pages(&ReportSettings::default()).unwrap();
        let page = &pages[0];
        assert_eq!(page.columns, 1);
        assert_eq!(page.rows, 3);
        assert_eq!(page.period_hours, 6);

        let heap = &page.graphs[0];
        assert_eq!(heap.meters[0].label, "Heap Used");
        assert_eq!(heap.meters[0].color, RgbColor::RED);
        assert_eq!(heap.meters[1].label, "Free");
        assert_eq!(heap.meters[1].color, RgbColor::palette(1));
        assert_eq!(page.graphs[1].labels, YLabelStyle::Health);
    }

    #[test]
    fn test_bad_color_is_rejected() {
        let config: MeterPagesConfig = parse(
            r#"
            [[pages]]
            id = "x"
            title = "X"
            [[pages.graphs]]
            id = "g"
            title = "G"
            [[pages.graphs.meters]]
            name = "m"
            color = "not-a-color"
            "#,
        );

        assert!(config.to_pages(&ReportSettings::default()).is_err());
    }
}
