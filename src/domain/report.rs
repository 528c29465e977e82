// PDF report domain models
use super::series::TimeWindow;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub server_id: String,
    pub title: String,
    pub window: TimeWindow,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// `<title>_<YYYYMMDD_HHMM>.pdf`, with characters unsafe in a
/// Content-Disposition filename replaced by underscores.
pub fn report_filename(title: &str, generated_at: DateTime<Utc>) -> String {
    let safe: String = title
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = if safe.is_empty() { "report".to_string() } else { safe };

    format!("{}_{}.pdf", safe, generated_at.format("%Y%m%d_%H%M"))
}
