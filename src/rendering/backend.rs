// Output surface seam for the canvas layer
use crate::domain::geometry::{Point, RgbColor, Size};
use crate::error::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontFace {
    Helvetica,
    HelveticaBold,
    Courier,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Font {
    pub face: FontFace,
    pub size: f64,
}

impl Font {
    pub const fn new(face: FontFace, size: f64) -> Self {
        Self { face, size }
    }

    /// Rough advance width of `text`. Builtin PDF fonts carry no metrics we
    /// can query, so this uses average glyph widths.
    pub fn text_width(&self, text: &str) -> f64 {
        let per_char = match self.face {
            FontFace::Courier => 0.6,
            FontFace::Helvetica => 0.5,
            FontFace::HelveticaBold => 0.55,
        };
        text.chars().count() as f64 * per_char * self.size
    }

    pub fn line_height(&self) -> f64 {
        (self.size * 1.25).ceil()
    }
}

impl Default for Font {
    fn default() -> Self {
        Self::new(FontFace::Helvetica, 9.0)
    }
}

/// Absolute drawing primitives in page coordinates: points, origin at the
/// top-left corner of the page, y growing downwards.
pub trait DrawBackend {
    fn begin_page(&mut self, size: Size) -> Result<(), RenderError>;

    fn polyline(&mut self, points: &[Point], color: RgbColor, line_width: f64);

    fn fill_rect(&mut self, origin: Point, size: Size, color: RgbColor);

    fn stroke_rect(&mut self, origin: Point, size: Size, color: RgbColor, line_width: f64);

    /// `at` is the left end of the text baseline.
    fn text(&mut self, at: Point, text: &str, font: Font, color: RgbColor);
}
