// printpdf implementation of the draw backend
use crate::domain::geometry::{Point as CanvasPoint, RgbColor, Size};
use crate::error::RenderError;
use crate::rendering::backend::{DrawBackend, Font, FontFace};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Polygon, PolygonMode, Pt, Rgb, WindingOrder,
};

const LAYER_NAME: &str = "content";

pub struct PdfBackend {
    title: String,
    doc: Option<PdfDocumentReference>,
    layer: Option<PdfLayerReference>,
    fonts: Vec<(FontFace, IndirectFontRef)>,
    page_height: f32,
}

impl PdfBackend {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            doc: None,
            layer: None,
            fonts: Vec::new(),
            page_height: 0.0,
        }
    }

    /// Finishes the document. A report that never drew anything still gets
    /// one blank page.
    pub fn into_bytes(mut self) -> Result<Vec<u8>, RenderError> {
        if self.doc.is_none() {
            self.begin_page(Size::new(612.0, 792.0))?;
        }
        let Some(doc) = self.doc.take() else {
            return Err(RenderError::Pdf("document was never started".to_string()));
        };
        // layer and font handles hold references into the document
        self.layer = None;
        self.fonts.clear();
        doc.save_to_bytes().map_err(|e| RenderError::Pdf(e.to_string()))
    }

    fn load_fonts(&mut self, doc: &PdfDocumentReference) -> Result<(), RenderError> {
        for (face, builtin) in [
            (FontFace::Helvetica, BuiltinFont::Helvetica),
            (FontFace::HelveticaBold, BuiltinFont::HelveticaBold),
            (FontFace::Courier, BuiltinFont::Courier),
        ] {
            let font = doc
                .add_builtin_font(builtin)
                .map_err(|e| RenderError::Pdf(e.to_string()))?;
            self.fonts.push((face, font));
        }
        Ok(())
    }

    fn font(&self, face: FontFace) -> Option<&IndirectFontRef> {
        self.fonts.iter().find(|(f, _)| *f == face).map(|(_, font)| font)
    }

    /// Canvas points (top-left origin) to a PDF point (bottom-left origin).
    fn point(&self, p: CanvasPoint) -> Point {
        Point::new(Mm::from(Pt(p.x as f32)), Mm::from(Pt(self.page_height - p.y as f32)))
    }

    fn rgb(color: RgbColor) -> Color {
        let (r, g, b) = color.to_unit();
        Color::Rgb(Rgb::new(r, g, b, None))
    }

    fn rect_ring(&self, origin: CanvasPoint, size: Size) -> Vec<(Point, bool)> {
        vec![
            (self.point(origin), false),
            (self.point(origin.offset(size.width, 0.0)), false),
            (self.point(origin.offset(size.width, size.height)), false),
            (self.point(origin.offset(0.0, size.height)), false),
        ]
    }
}

impl DrawBackend for PdfBackend {
    fn begin_page(&mut self, size: Size) -> Result<(), RenderError> {
        let width = Mm::from(Pt(size.width as f32));
        let height = Mm::from(Pt(size.height as f32));
        self.page_height = size.height as f32;

        if let Some(doc) = &self.doc {
            let (page, layer) = doc.add_page(width, height, LAYER_NAME);
            self.layer = Some(doc.get_page(page).get_layer(layer));
            return Ok(());
        }

        let (doc, page, layer) = PdfDocument::new(self.title.as_str(), width, height, LAYER_NAME);
        self.load_fonts(&doc)?;
        self.layer = Some(doc.get_page(page).get_layer(layer));
        self.doc = Some(doc);
        Ok(())
    }

    fn polyline(&mut self, points: &[CanvasPoint], color: RgbColor, line_width: f64) {
        let Some(layer) = &self.layer else {
            return;
        };
        let line = Line {
            points: points.iter().map(|p| (self.point(*p), false)).collect(),
            is_closed: false,
        };
        layer.set_outline_color(Self::rgb(color));
        layer.set_outline_thickness(line_width as f32);
        layer.add_line(line);
    }

    fn fill_rect(&mut self, origin: CanvasPoint, size: Size, color: RgbColor) {
        let Some(layer) = &self.layer else {
            return;
        };
        let polygon = Polygon {
            rings: vec![self.rect_ring(origin, size)],
            mode: PolygonMode::Fill,
            winding_order: WindingOrder::NonZero,
        };
        layer.set_fill_color(Self::rgb(color));
        layer.add_polygon(polygon);
    }

    fn stroke_rect(&mut self, origin: CanvasPoint, size: Size, color: RgbColor, line_width: f64) {
        let Some(layer) = &self.layer else {
            return;
        };
        let line = Line {
            points: self.rect_ring(origin, size),
            is_closed: true,
        };
        layer.set_outline_color(Self::rgb(color));
        layer.set_outline_thickness(line_width as f32);
        layer.add_line(line);
    }

    fn text(&mut self, at: CanvasPoint, text: &str, font: Font, color: RgbColor) {
        let (Some(layer), Some(font_ref)) = (&self.layer, self.font(font.face)) else {
            return;
        };
        if text.is_empty() {
            return;
        }
        let position = self.point(at);
        layer.set_fill_color(Self::rgb(color));
        layer.use_text(text, font.size as f32, position.x.into(), position.y.into(), font_ref);
    }
}
