// Canvas primitive layer: graphics state, paths, text flow and pagination
use super::backend::{DrawBackend, Font, FontFace};
use crate::domain::geometry::{Point, RgbColor, Size};
use crate::error::RenderError;

/// US Letter in points.
#[cfg(test)]
pub const LETTER: Size = Size::new(612.0, 792.0);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub const fn uniform(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::uniform(36.0)
    }
}

/// The unit saved and restored around nested drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphicsState {
    pub font: Font,
    pub color: RgbColor,
    pub line_width: f64,
    /// Translation applied to every local coordinate.
    pub origin: Point,
    pub page_number: usize,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            font: Font::default(),
            color: RgbColor::BLACK,
            line_width: 1.0,
            origin: Point::default(),
            page_number: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextOptions {
    /// Offset from the left margin.
    pub indent: f64,
    pub align: Align,
    /// Width of the text box; the rest of the line when unset.
    pub width: Option<f64>,
    /// Break long text into several lines within `width`.
    pub wrap: bool,
    /// Advance the cursor past the last line.
    pub newline: bool,
    /// Keep all lines on one page, starting a new page if they don't fit.
    pub block: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            indent: 0.0,
            align: Align::Left,
            width: None,
            wrap: false,
            newline: true,
            block: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct RowCursor {
    column_x: f64,
    row_y: f64,
    row_max_y: f64,
}

pub struct Canvas<B: DrawBackend> {
    backend: B,
    page_size: Size,
    margins: Margins,
    state: GraphicsState,
    saved: Vec<GraphicsState>,
    subpaths: Vec<Vec<Point>>,
    text_y: f64,
    rows: Vec<RowCursor>,
    page_open: bool,
    page_count: usize,
}

impl<B: DrawBackend> Canvas<B> {
    pub fn new(backend: B, page_size: Size, margins: Margins) -> Self {
        Self {
            backend,
            page_size,
            margins,
            state: GraphicsState::default(),
            saved: Vec::new(),
            subpaths: Vec::new(),
            text_y: margins.top,
            rows: Vec::new(),
            page_open: false,
            page_count: 0,
        }
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    pub fn margins(&self) -> Margins {
        self.margins
    }

    #[cfg(test)]
    pub fn page_number(&self) -> usize {
        self.page_count
    }

    #[cfg(test)]
    pub fn text_y(&self) -> f64 {
        self.text_y
    }

    pub fn set_text_y(&mut self, y: f64) {
        self.text_y = y;
    }

    pub fn content_width(&self) -> f64 {
        self.page_size.width - self.margins.left - self.margins.right
    }

    pub fn bottom_limit(&self) -> f64 {
        self.page_size.height - self.margins.bottom
    }

    pub fn is_page_open(&self) -> bool {
        self.page_open
    }

    // --- pages ---

    pub fn begin_page(&mut self) -> Result<(), RenderError> {
        self.backend.begin_page(self.page_size)?;
        self.page_count += 1;
        self.page_open = true;
        self.state.page_number = self.page_count;
        self.text_y = self.margins.top;
        self.rows.clear();
        tracing::trace!("Started page {}", self.page_count);
        Ok(())
    }

    /// Closes the current page. Drawing afterwards opens the next one.
    pub fn end_page(&mut self) {
        if !self.subpaths.is_empty() {
            self.stroke();
        }
        self.page_open = false;
    }

    pub fn new_page(&mut self) -> Result<(), RenderError> {
        self.end_page();
        self.begin_page()
    }

    fn ensure_page(&mut self) -> Result<(), RenderError> {
        if !self.page_open {
            self.begin_page()?;
        }
        Ok(())
    }

    /// Starts a new page when `height` more points don't fit above the bottom
    /// margin. Returns whether a page was started.
    pub fn ensure_space(&mut self, height: f64) -> Result<bool, RenderError> {
        self.ensure_page()?;
        if self.text_y + height > self.bottom_limit() && self.text_y > self.margins.top {
            self.new_page()?;
            return Ok(true);
        }
        Ok(false)
    }

    // --- graphics state ---

    #[cfg(test)]
    pub fn state(&self) -> &GraphicsState {
        &self.state
    }

    pub fn save_state(&mut self) {
        self.saved.push(self.state);
    }

    pub fn restore_state(&mut self) {
        match self.saved.pop() {
            Some(saved) => {
                if saved.page_number != self.page_count {
                    tracing::debug!(
                        "Restoring state saved on page {} while on page {}",
                        saved.page_number,
                        self.page_count
                    );
                }
                self.state = GraphicsState {
                    page_number: self.page_count,
                    ..saved
                };
            }
            None => tracing::warn!("restore_state without matching save_state"),
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.state.origin = self.state.origin.offset(dx, dy);
    }

    pub fn set_color(&mut self, color: RgbColor) {
        self.state.color = color;
    }

    pub fn set_line_width(&mut self, width: f64) {
        self.state.line_width = width;
    }

    pub fn set_font(&mut self, face: FontFace, size: f64) {
        self.state.font = Font::new(face, size);
    }

    #[cfg(test)]
    pub fn font(&self) -> Font {
        self.state.font
    }

    pub fn line_height(&self) -> f64 {
        self.state.font.line_height()
    }

    fn to_page(&self, local: Point) -> Point {
        local.offset(self.state.origin.x, self.state.origin.y)
    }

    // --- paths and shapes (local coordinates) ---

    pub fn move_to(&mut self, p: Point) {
        let abs = self.to_page(p);
        self.subpaths.push(vec![abs]);
    }

    pub fn line_to(&mut self, p: Point) {
        let abs = self.to_page(p);
        match self.subpaths.last_mut() {
            Some(path) => path.push(abs),
            None => self.subpaths.push(vec![abs]),
        }
    }

    /// Strokes every pending subpath with the current color and line width.
    pub fn stroke(&mut self) {
        if self.ensure_page().is_err() {
            self.subpaths.clear();
            return;
        }
        let (color, width) = (self.state.color, self.state.line_width);
        for path in std::mem::take(&mut self.subpaths) {
            if path.len() >= 2 {
                self.backend.polyline(&path, color, width);
            }
        }
    }

    pub fn draw_line(&mut self, from: Point, to: Point) {
        self.move_to(from);
        self.line_to(to);
        self.stroke();
    }

    pub fn fill_rect(&mut self, origin: Point, size: Size, color: RgbColor) {
        if self.ensure_page().is_err() {
            return;
        }
        let abs = self.to_page(origin);
        self.backend.fill_rect(abs, size, color);
    }

    pub fn stroke_rect(&mut self, origin: Point, size: Size) {
        if self.ensure_page().is_err() {
            return;
        }
        let abs = self.to_page(origin);
        self.backend
            .stroke_rect(abs, size, self.state.color, self.state.line_width);
    }

    /// Text with its baseline starting at a local point.
    pub fn write_text_at(&mut self, at: Point, text: &str) {
        if text.is_empty() || self.ensure_page().is_err() {
            return;
        }
        let abs = self.to_page(at);
        self.backend.text(abs, text, self.state.font, self.state.color);
    }

    /// Text whose right end sits at a local point.
    pub fn write_text_right(&mut self, at: Point, text: &str) {
        let width = self.state.font.text_width(text);
        self.write_text_at(at.offset(-width, 0.0), text);
    }

    pub fn write_text_centered(&mut self, at: Point, text: &str) {
        let width = self.state.font.text_width(text);
        self.write_text_at(at.offset(-width / 2.0, 0.0), text);
    }

    // --- flowing text (page coordinates) ---

    pub fn write_text(&mut self, text: &str) -> Result<(), RenderError> {
        self.write_text_with(&TextOptions::default(), text)
    }

    pub fn write_text_with(&mut self, opts: &TextOptions, text: &str) -> Result<(), RenderError> {
        self.ensure_page()?;
        let font = self.state.font;
        let line_height = font.line_height();
        let width = opts
            .width
            .unwrap_or(self.content_width() - opts.indent)
            .max(1.0);

        let lines = if opts.wrap {
            wrap_text(text, width, font)
        } else {
            vec![text.to_string()]
        };

        if opts.block {
            self.ensure_space(line_height * lines.len() as f64)?;
        }

        let left = self.margins.left + opts.indent;
        let count = lines.len();
        for (i, line) in lines.iter().enumerate() {
            self.ensure_space(line_height)?;
            let line_width = font.text_width(line);
            let x = match opts.align {
                Align::Left => left,
                Align::Center => left + (width - line_width) / 2.0,
                Align::Right => left + width - line_width,
            };
            let baseline = self.text_y + font.size;
            self.backend.text(Point::new(x, baseline), line, font, self.state.color);

            if i + 1 < count || opts.newline {
                self.text_y += line_height;
            }
        }
        Ok(())
    }

    /// Vertical gap in the text flow.
    pub fn skip(&mut self, height: f64) {
        self.text_y += height;
    }

    /// A rule across the content width at the cursor.
    pub fn write_hrule(&mut self) -> Result<(), RenderError> {
        self.ensure_space(4.0)?;
        let y = self.text_y + 2.0;
        let (left, right) = (self.margins.left, self.page_size.width - self.margins.right);
        let (color, width) = (self.state.color, self.state.line_width);
        self.backend
            .polyline(&[Point::new(left, y), Point::new(right, y)], color, width);
        self.text_y += 4.0;
        Ok(())
    }

    pub fn write_section(&mut self, title: &str) -> Result<(), RenderError> {
        let font = Font::new(FontFace::HelveticaBold, 14.0);
        self.ensure_space(font.line_height() * 3.0)?;
        self.save_state();
        self.state.font = font;
        self.skip(6.0);
        let result = self
            .write_text(title)
            .and_then(|_| self.write_hrule());
        self.restore_state();
        self.skip(4.0);
        result
    }

    pub fn write_subsection(&mut self, title: &str) -> Result<(), RenderError> {
        let font = Font::new(FontFace::HelveticaBold, 11.0);
        self.ensure_space(font.line_height() * 2.0)?;
        self.save_state();
        self.state.font = font;
        self.skip(4.0);
        let result = self.write_text(title);
        self.restore_state();
        result
    }

    // --- tabular rows ---

    pub fn begin_row(&mut self) -> Result<(), RenderError> {
        self.ensure_space(self.line_height())?;
        self.rows.push(RowCursor {
            column_x: self.margins.left,
            row_y: self.text_y,
            row_max_y: self.text_y,
        });
        Ok(())
    }

    /// Writes one cell of the current row and moves to the next column.
    pub fn write_text_column(
        &mut self,
        width: f64,
        align: Align,
        text: &str,
    ) -> Result<(), RenderError> {
        if self.rows.is_empty() {
            self.begin_row()?;
        }
        let font = self.state.font;
        let color = self.state.color;
        let line_height = font.line_height();
        let lines = wrap_text(text, (width - 2.0).max(1.0), font);

        let Some(row) = self.rows.last_mut() else {
            return Ok(());
        };
        for (i, line) in lines.iter().enumerate() {
            let line_width = font.text_width(line);
            let x = match align {
                Align::Left => row.column_x,
                Align::Center => row.column_x + (width - line_width) / 2.0,
                Align::Right => row.column_x + width - line_width - 2.0,
            };
            let baseline = row.row_y + i as f64 * line_height + font.size;
            self.backend.text(Point::new(x, baseline), line, font, color);
        }
        row.row_max_y = row
            .row_max_y
            .max(row.row_y + lines.len().max(1) as f64 * line_height);
        row.column_x += width;
        Ok(())
    }

    pub fn end_row(&mut self) {
        if let Some(row) = self.rows.pop() {
            self.text_y = row.row_max_y;
        }
    }

    pub fn into_backend(mut self) -> B {
        self.end_page();
        self.backend
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    #[cfg(test)]
    pub fn saved_depth(&self) -> usize {
        self.saved.len()
    }
}

/// Greedy word wrap; words wider than the box are split by characters.
pub fn wrap_text(text: &str, width: f64, font: Font) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };

            if font.text_width(&candidate) <= width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }

            if font.text_width(word) <= width {
                current = word.to_string();
            } else {
                for ch in word.chars() {
                    current.push(ch);
                    if font.text_width(&current) > width && current.chars().count() > 1 {
                        current.pop();
                        lines.push(std::mem::take(&mut current));
                        current.push(ch);
                    }
                }
            }
        }
        lines.push(current);
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::recording::{DrawCommand, RecordingBackend};

    fn canvas() -> Canvas<RecordingBackend> {
        Canvas::new(RecordingBackend::default(), LETTER, Margins::uniform(36.0))
    }

    #[test]
    fn test_text_cursor_advances_by_line_height() {
        let mut canvas = canvas();
        let start = canvas.text_y();
        canvas.write_text("first").unwrap();
        canvas.write_text("second").unwrap();
        assert_eq!(canvas.text_y(), start + 2.0 * canvas.line_height());
        assert_eq!(canvas.backend().texts(), vec!["first", "second"]);
    }

    #[test]
    fn test_text_overflow_starts_new_page() {
        let mut canvas = canvas();
        let per_page = ((canvas.bottom_limit() - 36.0) / canvas.line_height()) as usize;
        for i in 0..per_page + 1 {
            canvas.write_text(&format!("line {}", i)).unwrap();
        }
        assert_eq!(canvas.page_number(), 2);
        assert_eq!(canvas.text_y(), 36.0 + canvas.line_height());
        assert_eq!(canvas.backend().pages(), 2);
    }

    #[test]
    fn test_no_newline_keeps_cursor() {
        let mut canvas = canvas();
        let start = canvas.text_y();
        let opts = TextOptions {
            newline: false,
            ..TextOptions::default()
        };
        canvas.write_text_with(&opts, "label").unwrap();
        assert_eq!(canvas.text_y(), start);
    }

    #[test]
    fn test_right_aligned_text_ends_at_box_edge() {
        let mut canvas = canvas();
        let opts = TextOptions {
            align: Align::Right,
            width: Some(200.0),
            ..TextOptions::default()
        };
        canvas.write_text_with(&opts, "abcd").unwrap();

        let font = canvas.font();
        let expected_x = 36.0 + 200.0 - font.text_width("abcd");
        match &canvas.backend().commands()[1] {
            DrawCommand::Text { at, .. } => assert!((at.x - expected_x).abs() < 1e-9),
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_save_restore_does_not_leak_state() {
        let mut canvas = canvas();
        canvas.save_state();
        canvas.translate(100.0, 50.0);
        canvas.set_color(RgbColor::RED);
        canvas.set_line_width(3.0);
        canvas.restore_state();

        assert_eq!(canvas.state().origin, Point::default());
        assert_eq!(canvas.state().color, RgbColor::BLACK);
        assert_eq!(canvas.state().line_width, 1.0);
    }

    #[test]
    fn test_translated_drawing_uses_page_coordinates() {
        let mut canvas = canvas();
        canvas.translate(10.0, 20.0);
        canvas.draw_line(Point::new(0.0, 0.0), Point::new(5.0, 5.0));

        let lines = canvas.backend().polylines();
        assert_eq!(lines, vec![vec![Point::new(10.0, 20.0), Point::new(15.0, 25.0)]]);
    }

    #[test]
    fn test_first_path_opens_page_without_losing_it() {
        let mut canvas = canvas();
        canvas.draw_line(Point::new(0.0, 0.0), Point::new(5.0, 5.0));
        canvas.draw_line(Point::new(1.0, 1.0), Point::new(6.0, 6.0));

        assert_eq!(canvas.backend().pages(), 1);
        assert_eq!(
            canvas.backend().polylines(),
            vec![
                vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)],
                vec![Point::new(1.0, 1.0), Point::new(6.0, 6.0)],
            ]
        );
    }

    #[test]
    fn test_drawing_after_end_page_lands_on_next_page() {
        let mut canvas = canvas();
        canvas.begin_page().unwrap();
        canvas.end_page();
        canvas.draw_line(Point::new(0.0, 0.0), Point::new(5.0, 5.0));

        assert_eq!(canvas.backend().pages(), 2);
        assert!(matches!(
            canvas.backend().commands().last(),
            Some(DrawCommand::Polyline { .. })
        ));
    }

    #[test]
    fn test_failed_section_does_not_leak_state() {
        let mut canvas = Canvas::new(
            RecordingBackend::with_page_limit(0),
            LETTER,
            Margins::uniform(36.0),
        );
        assert!(canvas.write_section("Heap").is_err());
        assert!(canvas.write_subsection("Threads").is_err());

        assert_eq!(canvas.saved_depth(), 0);
        assert_eq!(canvas.font(), Font::default());
    }

    #[test]
    fn test_columns_advance_row_by_tallest_cell() {
        let mut canvas = canvas();
        let start = canvas.text_y();
        let lh = canvas.line_height();

        canvas.begin_row().unwrap();
        canvas.write_text_column(60.0, Align::Left, "Name").unwrap();
        canvas
            .write_text_column(60.0, Align::Left, "a much longer value that wraps")
            .unwrap();
        canvas.end_row();

        assert!(canvas.text_y() >= start + 2.0 * lh);
        let texts = canvas.backend().text_positions();
        assert_eq!(texts[0].0.x, 36.0);
        assert_eq!(texts[1].0.x, 96.0);
    }

    #[test]
    fn test_wrap_text() {
        let font = Font::new(FontFace::Courier, 10.0);
        // six characters per 36pt line
        let lines = wrap_text("aaa bbb cccccccc", 36.0, font);
        assert_eq!(lines, vec!["aaa", "bbb", "cccccc", "cc"]);
        assert_eq!(wrap_text("", 36.0, font), vec![""]);
    }
}
