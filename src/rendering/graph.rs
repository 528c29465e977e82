// Graph composer: axes, grid, blocks, lines and legends inside one graph slot
use super::backend::{DrawBackend, Font, FontFace};
use super::canvas::Canvas;
use super::labels::{self, LabelFn};
use super::mapper::{CoordinateMapper, DEFAULT_OVERSHOOT};
use crate::domain::geometry::{Point, Range, RgbColor, Size};
use crate::domain::series::{BlockData, GraphData};

pub const NO_DATA: &str = "NO DATA";

const MINUTE_MS: f64 = 60_000.0;
const HOUR_MS: f64 = 60.0 * MINUTE_MS;
const DAY_MS: f64 = 24.0 * HOUR_MS;

/// Candidate x-axis steps, smallest first.
const TIME_STEPS: [f64; 15] = [
    MINUTE_MS,
    5.0 * MINUTE_MS,
    10.0 * MINUTE_MS,
    15.0 * MINUTE_MS,
    30.0 * MINUTE_MS,
    HOUR_MS,
    2.0 * HOUR_MS,
    3.0 * HOUR_MS,
    6.0 * HOUR_MS,
    12.0 * HOUR_MS,
    DAY_MS,
    2.0 * DAY_MS,
    7.0 * DAY_MS,
    14.0 * DAY_MS,
    30.0 * DAY_MS,
];

const MAX_X_TICKS: f64 = 8.0;
const MAX_TICKS: usize = 1000;

const LEGEND_ROW_HEIGHT: f64 = 10.0;
const Y_LABEL_GUTTER: f64 = 36.0;
const TITLE_HEIGHT: f64 = 14.0;
const X_LABEL_HEIGHT: f64 = 12.0;

/// Picks a readable tick increment splitting `max` into roughly four steps.
pub fn compute_y_increment(max: f64) -> f64 {
    let raw = max / 4.0;
    if !raw.is_finite() || raw <= 0.0 {
        return raw;
    }

    let scale = 10f64.powf(raw.log10().floor());
    let nice = [1.0, 2.0, 2.5, 5.0, 10.0]
        .iter()
        .map(|m| m * scale)
        .fold(f64::NAN, |best, candidate| {
            if best.is_nan() || (candidate - raw).abs() < (best - raw).abs() {
                candidate
            } else {
                best
            }
        });

    if nice.is_finite() && nice > 0.0 {
        nice
    } else {
        raw
    }
}

/// Smallest wall-clock step that keeps the time axis to a handful of ticks.
pub fn compute_x_increment(range_ms: f64) -> f64 {
    TIME_STEPS
        .iter()
        .copied()
        .find(|step| range_ms / step <= MAX_X_TICKS)
        .unwrap_or(TIME_STEPS[TIME_STEPS.len() - 1])
}

/// Multiples of `step` inside `range`.
pub fn ticks(range: Range, step: f64) -> Vec<f64> {
    if !step.is_finite() || step <= 0.0 || range.is_degenerate() {
        return Vec::new();
    }

    let epsilon = step * 1e-9;
    let mut tick = (range.start / step).ceil() * step;
    let mut out = Vec::new();
    while tick <= range.stop + epsilon && out.len() < MAX_TICKS {
        out.push(tick);
        tick += step;
    }
    out
}

/// Value range for a set of series: from zero (or the lowest negative
/// value) up to the running maximum rounded up to a whole increment.
pub fn y_range_for(series: &[GraphData]) -> Range {
    let min = series
        .iter()
        .flat_map(|s| s.points().iter().map(|p| p.y))
        .fold(0.0, f64::min);
    let mut max = series.iter().map(GraphData::max_value).fold(0.0, f64::max);
    if max <= min {
        max = min + 1.0;
    }

    let increment = compute_y_increment(max - min);
    if increment.is_finite() && increment > 0.0 {
        let steps = ((max - min) / increment).ceil();
        Range::new(min, min + steps * increment)
    } else {
        Range::new(min, max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphStyle {
    pub grid_color: RgbColor,
    pub border_color: RgbColor,
    pub text_color: RgbColor,
    pub axis_font: Font,
    pub title_font: Font,
    pub legend_font: Font,
    pub line_width: f64,
    pub overshoot: f64,
}

impl Default for GraphStyle {
    fn default() -> Self {
        Self {
            grid_color: RgbColor::LIGHT_GREY,
            border_color: RgbColor::DARK_GREY,
            text_color: RgbColor::BLACK,
            axis_font: Font::new(FontFace::Helvetica, 7.0),
            title_font: Font::new(FontFace::HelveticaBold, 9.0),
            legend_font: Font::new(FontFace::Helvetica, 7.0),
            line_width: 1.0,
            overshoot: DEFAULT_OVERSHOOT,
        }
    }
}

/// One graph bound to a region of the page.
#[derive(Debug, Clone)]
pub struct Graph {
    title: String,
    origin: Point,
    mapper: CoordinateMapper,
}

impl Graph {
    /// `origin` is the top-left corner of the plot area in the caller's frame.
    pub fn new(title: impl Into<String>, origin: Point, size: Size, x: Range, y: Range) -> Self {
        Self {
            title: title.into(),
            origin,
            mapper: CoordinateMapper::new(x, y, size),
        }
    }

    pub fn with_overshoot(mut self, overshoot: f64) -> Self {
        self.mapper = self.mapper.with_overshoot(overshoot);
        self
    }

    pub fn is_valid(&self) -> bool {
        self.mapper.is_valid()
    }

    pub fn invalidate(&mut self) {
        self.mapper.invalidate();
    }

    pub fn size(&self) -> Size {
        self.mapper.size()
    }

    fn enter<B: DrawBackend>(&self, canvas: &mut Canvas<B>) {
        canvas.save_state();
        canvas.translate(self.origin.x, self.origin.y);
    }

    fn leave<B: DrawBackend>(&self, canvas: &mut Canvas<B>) {
        canvas.restore_state();
    }

    /// Converts every point of a series, invalidating the graph if any of
    /// them is unusable.
    pub fn convert_series(&mut self, series: &GraphData) -> Option<Vec<Point>> {
        series
            .points()
            .iter()
            .map(|p| self.mapper.convert_point(*p))
            .collect()
    }

    pub fn draw_title<B: DrawBackend>(&self, canvas: &mut Canvas<B>, style: &GraphStyle) {
        self.enter(canvas);
        canvas.set_font(style.title_font.face, style.title_font.size);
        canvas.set_color(style.text_color);
        canvas.write_text_at(Point::new(0.0, -4.0), &self.title);
        self.leave(canvas);
    }

    pub fn draw_border<B: DrawBackend>(&self, canvas: &mut Canvas<B>, style: &GraphStyle) {
        self.enter(canvas);
        canvas.set_color(style.border_color);
        canvas.set_line_width(0.5);
        canvas.stroke_rect(Point::default(), self.size());
        self.leave(canvas);
    }

    /// Centered placeholder for graphs with nothing to plot.
    pub fn draw_no_data<B: DrawBackend>(&self, canvas: &mut Canvas<B>, message: &str) {
        let size = self.size();
        self.enter(canvas);
        canvas.set_font(FontFace::HelveticaBold, 12.0);
        canvas.set_color(RgbColor::GREY);
        canvas.write_text_centered(Point::new(size.width / 2.0, size.height / 2.0 + 4.0), message);
        self.leave(canvas);
    }

    pub fn draw_grid_lines<B: DrawBackend>(
        &self,
        canvas: &mut Canvas<B>,
        x_step: f64,
        y_step: f64,
        color: RgbColor,
    ) {
        if !self.is_valid() {
            return;
        }
        let size = self.size();

        self.enter(canvas);
        canvas.set_color(color);
        canvas.set_line_width(0.5);
        for x in ticks(self.mapper.x_range(), x_step) {
            let px = self.mapper.scale_x(x);
            canvas.draw_line(Point::new(px, 0.0), Point::new(px, size.height));
        }
        for y in ticks(self.mapper.y_range(), y_step) {
            let py = size.height - self.mapper.scale_y(y);
            canvas.draw_line(Point::new(0.0, py), Point::new(size.width, py));
        }
        self.leave(canvas);
    }

    pub fn draw_axis_labels<B: DrawBackend>(
        &self,
        canvas: &mut Canvas<B>,
        x_step: f64,
        y_step: f64,
        x_label: LabelFn,
        y_label: LabelFn,
        style: &GraphStyle,
    ) {
        if !self.is_valid() {
            return;
        }
        let size = self.size();
        let font = style.axis_font;

        self.enter(canvas);
        canvas.set_font(font.face, font.size);
        canvas.set_color(style.text_color);
        for x in ticks(self.mapper.x_range(), x_step) {
            let px = self.mapper.scale_x(x);
            canvas.write_text_centered(Point::new(px, size.height + font.size + 2.0), &x_label(x));
        }
        for y in ticks(self.mapper.y_range(), y_step) {
            let py = size.height - self.mapper.scale_y(y);
            canvas.write_text_right(Point::new(-3.0, py + font.size / 3.0), &y_label(y));
        }
        self.leave(canvas);
    }

    /// Straight segments through the series in order.
    pub fn draw_line_graph<B: DrawBackend>(
        &mut self,
        canvas: &mut Canvas<B>,
        series: &GraphData,
        color: RgbColor,
        line_width: f64,
    ) {
        if !self.is_valid() || series.is_empty() {
            return;
        }
        let Some(pixels) = self.convert_series(series) else {
            return;
        };

        self.enter(canvas);
        canvas.set_color(color);
        canvas.set_line_width(line_width);
        canvas.move_to(pixels[0]);
        if pixels.len() == 1 {
            canvas.line_to(pixels[0].offset(1.0, 0.0));
        }
        for p in &pixels[1..] {
            canvas.line_to(*p);
        }
        canvas.stroke();
        self.leave(canvas);
    }

    /// Full-height shaded spans; never narrower than one pixel.
    pub fn draw_graph_blocks<B: DrawBackend>(
        &self,
        canvas: &mut Canvas<B>,
        blocks: &[BlockData],
        line_width: f64,
    ) {
        if !self.is_valid() {
            return;
        }
        let size = self.size();
        let min_width = line_width.max(1.0);

        self.enter(canvas);
        for block in blocks {
            for (start, end) in &block.intervals {
                let x1 = self
                    .mapper
                    .scale_x(*start)
                    .clamp(0.0, (size.width - min_width).max(0.0));
                let x2 = self.mapper.scale_x(*end).clamp(0.0, size.width);
                if self.mapper.scale_x(*end) < 0.0 || self.mapper.scale_x(*start) > size.width {
                    continue;
                }
                let width = (x2 - x1).max(min_width);
                canvas.fill_rect(Point::new(x1, 0.0), Size::new(width, size.height), block.color);
            }
        }
        self.leave(canvas);
    }

    /// Swatch + label per series then per block, two columns, stacked in
    /// rows starting at `top` below the plot area.
    pub fn draw_legends<B: DrawBackend>(
        &self,
        canvas: &mut Canvas<B>,
        series: &[GraphData],
        blocks: &[BlockData],
        top: f64,
        style: &GraphStyle,
    ) {
        let column_width = self.size().width / 2.0;
        let font = style.legend_font;

        self.enter(canvas);
        canvas.set_font(font.face, font.size);
        let entries = series
            .iter()
            .map(|s| (s.name.as_str(), s.color, false))
            .chain(blocks.iter().map(|b| (b.name.as_str(), b.color, true)));

        for (i, (name, color, is_block)) in entries.enumerate() {
            let x = (i % 2) as f64 * column_width;
            let y = top + (i / 2) as f64 * LEGEND_ROW_HEIGHT;
            let mid = y + LEGEND_ROW_HEIGHT / 2.0;

            if is_block {
                canvas.fill_rect(Point::new(x, mid - 3.0), Size::new(8.0, 6.0), color);
            } else {
                canvas.set_color(color);
                canvas.set_line_width(2.0);
                canvas.draw_line(Point::new(x, mid), Point::new(x + 12.0, mid));
            }
            canvas.set_color(style.text_color);
            canvas.write_text_at(Point::new(x + 16.0, mid + font.size / 3.0), name);
        }
        self.leave(canvas);
    }
}

pub fn legend_height(entries: usize) -> f64 {
    entries.div_ceil(2) as f64 * LEGEND_ROW_HEIGHT
}

/// Plot area inside a layout slot, leaving room for the title, the y-axis
/// labels, the x-axis labels and the legend rows.
pub fn plot_area(slot_origin: Point, slot_size: Size, legend_entries: usize) -> (Point, Size) {
    let origin = slot_origin.offset(Y_LABEL_GUTTER, TITLE_HEIGHT);
    let width = (slot_size.width - Y_LABEL_GUTTER - 8.0).max(0.0);
    let height = (slot_size.height - TITLE_HEIGHT - X_LABEL_HEIGHT - legend_height(legend_entries))
        .max(0.0);
    (origin, Size::new(width, height))
}

/// Everything needed to draw one graph.
#[derive(Debug, Clone)]
pub struct GraphSpec<'a> {
    pub title: &'a str,
    pub x_range: Range,
    pub series: &'a [GraphData],
    pub blocks: &'a [BlockData],
    pub x_labels: LabelFn,
    pub y_labels: LabelFn,
    /// Replaces the "NO DATA" placeholder, e.g. when the server was down.
    pub message: Option<&'a str>,
}

impl<'a> GraphSpec<'a> {
    pub fn new(title: &'a str, x_range: Range, series: &'a [GraphData]) -> Self {
        Self {
            title,
            x_range,
            series,
            blocks: &[],
            x_labels: labels::time_label,
            y_labels: labels::magnitude_label,
            message: None,
        }
    }
}

/// Draws a complete graph into a layout slot. Returns whether data was
/// plotted; an invalid graph still gets its title, border and placeholder.
pub fn render_graph<B: DrawBackend>(
    canvas: &mut Canvas<B>,
    slot_origin: Point,
    slot_size: Size,
    spec: &GraphSpec<'_>,
    style: &GraphStyle,
) -> bool {
    let blocks: Vec<BlockData> = spec.blocks.iter().filter(|b| !b.is_empty()).cloned().collect();
    let (origin, size) = plot_area(slot_origin, slot_size, spec.series.len() + blocks.len());
    let y_range = y_range_for(spec.series);

    let mut graph = Graph::new(spec.title, origin, size, spec.x_range, y_range)
        .with_overshoot(style.overshoot);

    if spec.message.is_some() || spec.series.iter().all(GraphData::is_empty) {
        graph.invalidate();
    }

    // reject bad data before anything is drawn
    if graph.is_valid() {
        for series in spec.series {
            if graph.convert_series(series).is_none() {
                tracing::warn!("Graph {} has out-of-range data, skipping", spec.title);
                break;
            }
        }
    }

    graph.draw_title(canvas, style);

    if !graph.is_valid() {
        graph.draw_border(canvas, style);
        graph.draw_no_data(canvas, spec.message.unwrap_or(NO_DATA));
        return false;
    }

    let x_step = compute_x_increment(spec.x_range.size());
    let y_step = compute_y_increment(y_range.size());

    graph.draw_graph_blocks(canvas, &blocks, style.line_width);
    graph.draw_grid_lines(canvas, x_step, y_step, style.grid_color);
    for series in spec.series {
        graph.draw_line_graph(canvas, series, series.color, style.line_width);
    }
    graph.draw_axis_labels(canvas, x_step, y_step, spec.x_labels, spec.y_labels, style);
    graph.draw_border(canvas, style);
    graph.draw_legends(
        canvas,
        spec.series,
        &blocks,
        size.height + X_LABEL_HEIGHT,
        style,
    );
    true
}
