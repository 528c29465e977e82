// Axis tick label formatting
use crate::domain::meter::YLabelStyle;
use chrono::{DateTime, Timelike, Utc};

pub const DAY_MS: i64 = 86_400_000;

/// Formats a tick value for display.
pub type LabelFn = fn(f64) -> String;

/// Date at a day boundary, time of day otherwise. Times are UTC.
pub fn time_label(time_ms: f64) -> String {
    let ms = time_ms.round() as i64;
    let Some(time) = DateTime::<Utc>::from_timestamp_millis(ms) else {
        return String::new();
    };

    if ms.rem_euclid(DAY_MS) == 0 {
        time.format("%m-%d").to_string()
    } else if time.second() == 0 {
        time.format("%H:%M").to_string()
    } else {
        time.format("%H:%M:%S").to_string()
    }
}

/// Human-readable magnitude with G/M/K suffixes.
pub fn magnitude_label(value: f64) -> String {
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e9 {
        (value / 1e9, "G")
    } else if abs >= 1e6 {
        (value / 1e6, "M")
    } else if abs >= 1e3 {
        (value / 1e3, "K")
    } else {
        (value, "")
    };

    format!("{}{}", trim_number(scaled), suffix)
}

pub fn percent_label(value: f64) -> String {
    format!("{}%", trim_number(value))
}

/// Health meters record the status ordinal.
pub fn health_label(value: f64) -> String {
    let rounded = value.round();
    if (value - rounded).abs() > 1e-6 {
        return trim_number(value);
    }
    match rounded as i64 {
        0 => "UNKNOWN".to_string(),
        1 => "OK".to_string(),
        2 => "WARNING".to_string(),
        3 => "CRITICAL".to_string(),
        4 => "FATAL".to_string(),
        other => other.to_string(),
    }
}

pub fn label_fn(style: YLabelStyle) -> LabelFn {
    match style {
        YLabelStyle::Magnitude => magnitude_label,
        YLabelStyle::Percent => percent_label,
        YLabelStyle::Health => health_label,
    }
}

/// At most one decimal, none when whole.
fn trim_number(value: f64) -> String {
    let tenths = (value * 10.0).round() / 10.0;
    if tenths.fract() == 0.0 {
        format!("{}", tenths as i64)
    } else {
        format!("{:.1}", tenths)
    }
}
