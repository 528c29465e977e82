// Backend that records draw calls instead of producing output
use super::backend::{DrawBackend, Font};
use crate::domain::geometry::{Point, RgbColor, Size};
use crate::error::RenderError;

#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    BeginPage(Size),
    Polyline {
        points: Vec<Point>,
        color: RgbColor,
        width: f64,
    },
    FillRect {
        origin: Point,
        size: Size,
        color: RgbColor,
    },
    StrokeRect {
        origin: Point,
        size: Size,
        color: RgbColor,
    },
    Text {
        at: Point,
        text: String,
        font: Font,
        color: RgbColor,
    },
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    commands: Vec<DrawCommand>,
    /// `begin_page` fails once this many pages exist.
    page_limit: Option<usize>,
}

impl RecordingBackend {
    pub fn with_page_limit(limit: usize) -> Self {
        Self {
            page_limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn pages(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::BeginPage(_)))
            .count()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn text_positions(&self) -> Vec<(Point, &str)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { at, text, .. } => Some((*at, text.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn polylines(&self) -> Vec<Vec<Point>> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Polyline { points, .. } => Some(points.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn polylines_in(&self, color: RgbColor) -> Vec<Vec<Point>> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Polyline {
                    points,
                    color: line_color,
                    ..
                } if *line_color == color => {
                    Some(points.clone())
                }
                _ => None,
            })
            .collect()
    }

    pub fn filled_rects(&self) -> Vec<(Point, Size, RgbColor)> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::FillRect {
                    origin,
                    size,
                    color,
                } => Some((*origin, *size, *color)),
                _ => None,
            })
            .collect()
    }
}

impl DrawBackend for RecordingBackend {
    fn begin_page(&mut self, size: Size) -> Result<(), RenderError> {
        if self.page_limit.is_some_and(|limit| self.pages() >= limit) {
            return Err(RenderError::Pdf("page limit reached".to_string()));
        }
        self.commands.push(DrawCommand::BeginPage(size));
        Ok(())
    }

    fn polyline(&mut self, points: &[Point], color: RgbColor, line_width: f64) {
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            color,
            width: line_width,
        });
    }

    fn fill_rect(&mut self, origin: Point, size: Size, color: RgbColor) {
        self.commands.push(DrawCommand::FillRect {
            origin,
            size,
            color,
        });
    }

    fn stroke_rect(&mut self, origin: Point, size: Size, color: RgbColor, _line_width: f64) {
        self.commands.push(DrawCommand::StrokeRect {
            origin,
            size,
            color,
        });
    }

    fn text(&mut self, at: Point, text: &str, font: Font, color: RgbColor) {
        self.commands.push(DrawCommand::Text {
            at,
            text: text.to_string(),
            font,
            color,
        });
    }
}
