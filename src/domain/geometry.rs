// Geometry value types used by the rendering pipeline
use crate::error::RenderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A closed interval in time or value space. `stop >= start` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    pub start: f64,
    pub stop: f64,
}

impl Range {
    pub fn new(start: f64, stop: f64) -> Self {
        if stop < start {
            Self { start: stop, stop: start }
        } else {
            Self { start, stop }
        }
    }

    pub fn size(&self) -> f64 {
        self.stop - self.start
    }

    /// Zero-width or non-finite ranges can't be mapped onto pixels.
    pub fn is_degenerate(&self) -> bool {
        let size = self.size();
        !size.is_finite() || size <= 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const BLACK: RgbColor = RgbColor::new(0, 0, 0);
    pub const WHITE: RgbColor = RgbColor::new(0xff, 0xff, 0xff);
    pub const BLUE: RgbColor = RgbColor::new(0x00, 0x00, 0xcc);
    pub const RED: RgbColor = RgbColor::new(0xcc, 0x00, 0x00);
    pub const GREEN: RgbColor = RgbColor::new(0x00, 0x99, 0x00);
    pub const ORANGE: RgbColor = RgbColor::new(0xff, 0x99, 0x00);
    pub const PURPLE: RgbColor = RgbColor::new(0x80, 0x00, 0x80);
    pub const CYAN: RgbColor = RgbColor::new(0x00, 0x99, 0x99);
    pub const BROWN: RgbColor = RgbColor::new(0x99, 0x66, 0x33);
    pub const MAGENTA: RgbColor = RgbColor::new(0xcc, 0x00, 0xcc);
    pub const NAVY: RgbColor = RgbColor::new(0x00, 0x00, 0x66);
    pub const YELLOW: RgbColor = RgbColor::new(0xcc, 0xcc, 0x00);
    pub const GREY: RgbColor = RgbColor::new(0x80, 0x80, 0x80);
    pub const DARK_GREY: RgbColor = RgbColor::new(0x40, 0x40, 0x40);
    pub const LIGHT_GREY: RgbColor = RgbColor::new(0xdd, 0xdd, 0xdd);

    /// Colors handed to series that don't configure one, in order.
    pub const SERIES_PALETTE: [RgbColor; 8] = [
        Self::BLUE,
        Self::RED,
        Self::GREEN,
        Self::ORANGE,
        Self::PURPLE,
        Self::CYAN,
        Self::BROWN,
        Self::MAGENTA,
    ];

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn palette(index: usize) -> Self {
        Self::SERIES_PALETTE[index % Self::SERIES_PALETTE.len()]
    }

    /// Channels scaled to 0.0..=1.0, as PDF color operators expect.
    pub fn to_unit(self) -> (f32, f32, f32) {
        (
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    fn named(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        let color = match normalized.as_str() {
            "black" => Self::BLACK,
            "white" => Self::WHITE,
            "blue" => Self::BLUE,
            "red" => Self::RED,
            "green" => Self::GREEN,
            "orange" => Self::ORANGE,
            "purple" => Self::PURPLE,
            "cyan" => Self::CYAN,
            "brown" => Self::BROWN,
            "magenta" => Self::MAGENTA,
            "navy" => Self::NAVY,
            "yellow" => Self::YELLOW,
            "grey" | "gray" => Self::GREY,
            "darkgrey" | "darkgray" => Self::DARK_GREY,
            "lightgrey" | "lightgray" => Self::LIGHT_GREY,
            _ => return None,
        };
        Some(color)
    }
}

impl FromStr for RgbColor {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(hex) = trimmed.strip_prefix('#') {
            if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(RenderError::InvalidColor(s.to_string()));
            }
            let channel = |i: usize| {
                u8::from_str_radix(&hex[i..i + 2], 16)
                    .map_err(|_| RenderError::InvalidColor(s.to_string()))
            };
            return Ok(Self::new(channel(0)?, channel(2)?, channel(4)?));
        }

        Self::named(trimmed).ok_or_else(|| RenderError::InvalidColor(s.to_string()))
    }
}

impl fmt::Display for RgbColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for RgbColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for RgbColor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
