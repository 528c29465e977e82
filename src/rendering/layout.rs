// Page layout driver: graph grid slots and pagination
use super::backend::DrawBackend;
use super::canvas::{Canvas, Margins};
use crate::domain::geometry::{Point, Size};
use crate::error::RenderError;

/// `rows x columns` graph slots per page below a header band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphGrid {
    pub rows: usize,
    pub columns: usize,
    /// Space between neighbouring slots.
    pub gap: f64,
    /// Band at the top of the content area kept free for section headers.
    pub header_height: f64,
}

impl GraphGrid {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            rows: rows.max(1),
            columns: columns.max(1),
            gap: 12.0,
            header_height: 30.0,
        }
    }

    pub fn slots_per_page(&self) -> usize {
        self.rows * self.columns
    }

    /// Zero-based page a slot lands on.
    #[cfg(test)]
    pub fn page_of(&self, index: usize) -> usize {
        index / self.slots_per_page()
    }

    fn area(&self, page: Size, margins: Margins) -> (Point, Size) {
        let origin = Point::new(margins.left, margins.top + self.header_height);
        let size = Size::new(
            (page.width - margins.left - margins.right).max(0.0),
            (page.height - margins.top - margins.bottom - self.header_height).max(0.0),
        );
        (origin, size)
    }

    pub fn slot_size(&self, page: Size, margins: Margins) -> Size {
        let (_, area) = self.area(page, margins);
        let columns = self.columns as f64;
        let rows = self.rows as f64;
        Size::new(
            ((area.width - self.gap * (columns - 1.0)) / columns).max(0.0),
            ((area.height - self.gap * (rows - 1.0)) / rows).max(0.0),
        )
    }

    /// Top-left corner of a slot. Slots fill left-to-right, top-to-bottom,
    /// and every page repeats the same positions.
    pub fn slot_origin(&self, index: usize, page: Size, margins: Margins) -> Point {
        let (area_origin, _) = self.area(page, margins);
        let slot = self.slot_size(page, margins);
        let within_page = index % self.slots_per_page();
        let row = within_page / self.columns;
        let column = within_page % self.columns;

        area_origin.offset(
            column as f64 * (slot.width + self.gap),
            row as f64 * (slot.height + self.gap),
        )
    }
}

/// Hands out grid slots for one report section, starting pages as needed.
#[derive(Debug, Clone)]
pub struct GraphPlacer {
    grid: GraphGrid,
    title: String,
    next: usize,
}

impl GraphPlacer {
    pub fn new(grid: GraphGrid, title: impl Into<String>) -> Self {
        Self {
            grid,
            title: title.into(),
            next: 0,
        }
    }

    /// Slot origin and size for the next graph.
    pub fn place<B: DrawBackend>(
        &mut self,
        canvas: &mut Canvas<B>,
    ) -> Result<(Point, Size), RenderError> {
        let index = self.next;
        if index % self.grid.slots_per_page() == 0 {
            if canvas.is_page_open() {
                canvas.new_page()?;
            } else {
                canvas.begin_page()?;
            }
            let header = if index == 0 {
                self.title.clone()
            } else {
                format!("{} (continued)", self.title)
            };
            canvas.write_section(&header)?;
        }
        self.next += 1;

        let page = canvas.page_size();
        let margins = canvas.margins();
        Ok((
            self.grid.slot_origin(index, page, margins),
            self.grid.slot_size(page, margins),
        ))
    }

    /// Moves the text cursor below the last row used.
    pub fn finish<B: DrawBackend>(&self, canvas: &mut Canvas<B>) {
        if self.next == 0 {
            return;
        }
        let page = canvas.page_size();
        let margins = canvas.margins();
        let last = self.grid.slot_origin(self.next - 1, page, margins);
        let slot = self.grid.slot_size(page, margins);
        canvas.set_text_y(last.y + slot.height + self.grid.gap);
    }
}
