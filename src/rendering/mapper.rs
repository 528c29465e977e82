// Data space -> pixel space conversion for one graph
use crate::domain::geometry::{Point, Range, Size};

/// How far outside the pixel box a converted point may land before the
/// data is treated as garbage and the graph invalidated.
pub const DEFAULT_OVERSHOOT: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateMapper {
    x_range: Range,
    y_range: Range,
    size: Size,
    ppu_x: f64,
    ppu_y: f64,
    offset_x: f64,
    offset_y: f64,
    overshoot: f64,
    valid: bool,
}

impl CoordinateMapper {
    pub fn new(x_range: Range, y_range: Range, size: Size) -> Self {
        let mut mapper = Self {
            x_range,
            y_range,
            size,
            ppu_x: 0.0,
            ppu_y: 0.0,
            offset_x: 0.0,
            offset_y: 0.0,
            overshoot: DEFAULT_OVERSHOOT,
            valid: false,
        };

        if x_range.is_degenerate() || y_range.is_degenerate() {
            tracing::debug!(
                "Degenerate graph range x={:?} y={:?}",
                x_range,
                y_range
            );
            return mapper;
        }

        mapper.ppu_x = size.width / x_range.size();
        mapper.ppu_y = size.height / y_range.size();
        let usable = |ppu: f64| ppu.is_finite() && ppu > 0.0;
        if !usable(mapper.ppu_x) || !usable(mapper.ppu_y) {
            return mapper;
        }

        mapper.offset_x = x_range.start * mapper.ppu_x;
        mapper.offset_y = y_range.start * mapper.ppu_y;
        mapper.valid = true;
        mapper
    }

    pub fn with_overshoot(mut self, overshoot: f64) -> Self {
        self.overshoot = overshoot.max(0.0);
        self
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    pub fn x_range(&self) -> Range {
        self.x_range
    }

    pub fn y_range(&self) -> Range {
        self.y_range
    }

    pub fn size(&self) -> Size {
        self.size
    }

    /// Horizontal pixel, range start at 0.
    pub fn scale_x(&self, x: f64) -> f64 {
        (x * self.ppu_x - self.offset_x).round()
    }

    /// Vertical pixel before inversion, range start at 0.
    pub fn scale_y(&self, y: f64) -> f64 {
        (y * self.ppu_y - self.offset_y).round()
    }

    /// Graph-local pixel position; y is inverted so larger values sit higher.
    pub fn to_pixel(&self, p: Point) -> Point {
        Point::new(self.scale_x(p.x), self.size.height - self.scale_y(p.y))
    }

    /// Like `to_pixel`, but a point far outside the box invalidates the
    /// mapper and yields `None`.
    pub fn convert_point(&mut self, p: Point) -> Option<Point> {
        if !self.valid {
            return None;
        }

        let pixel = self.to_pixel(p);
        let in_bounds = |v: f64, limit: f64| {
            v.is_finite() && v >= -self.overshoot && v <= limit + self.overshoot
        };

        if !in_bounds(pixel.x, self.size.width) || !in_bounds(pixel.y, self.size.height) {
            tracing::debug!("Point {:?} maps outside the graph at {:?}", p, pixel);
            self.valid = false;
            return None;
        }

        Some(pixel)
    }
}
