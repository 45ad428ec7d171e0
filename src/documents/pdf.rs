use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const PT_TO_MM: f32 = 0.3528;
/// Mean Helvetica glyph advance as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

/// Flowing A4 text layout on top of printpdf's absolute positioning.
pub struct PdfBuilder {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
    /// Baseline of the next line, measured from the bottom edge.
    cursor: f32,
}

#[derive(Clone, Copy)]
pub enum Style {
    Regular,
    Bold,
    Italic,
}

impl PdfBuilder {
    pub fn new(title: &str) -> Result<Self, String> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| format!("PDF font error: {e}"))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| format!("PDF font error: {e}"))?;
        let italic = doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(|e| format!("PDF font error: {e}"))?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            italic,
            cursor: PAGE_HEIGHT - MARGIN,
        })
    }

    /// Centered single line, for titles.
    pub fn centered(&mut self, text: &str, size: f32, style: Style) {
        let text = sanitize(text);
        let width = text.chars().count() as f32 * size * AVG_GLYPH_WIDTH * PT_TO_MM;
        let x = ((PAGE_WIDTH - width) / 2.0).max(MARGIN);
        self.advance(size);
        self.layer
            .use_text(text, size, Mm(x), Mm(self.cursor), self.font(style));
    }

    /// Wrapped text. Blank lines in `text` become paragraph breaks.
    pub fn paragraph(&mut self, text: &str, size: f32, style: Style) {
        let max_chars = chars_per_line(CONTENT_WIDTH, size);
        for source_line in text.lines() {
            if source_line.trim().is_empty() {
                self.gap(size * PT_TO_MM * 0.6);
                continue;
            }
            for line in wrap(&sanitize(source_line), max_chars) {
                self.advance(size);
                self.layer
                    .use_text(line, size, Mm(MARGIN), Mm(self.cursor), self.font(style));
            }
        }
    }

    /// Two cells on one line: left at the margin, right at `split` mm from it.
    pub fn columns(&mut self, left: &str, right: &str, split: f32, size: f32, style: Style) {
        self.advance(size);
        let font = self.font(style).clone();
        self.layer
            .use_text(sanitize(left), size, Mm(MARGIN), Mm(self.cursor), &font);
        self.layer
            .use_text(sanitize(right), size, Mm(MARGIN + split), Mm(self.cursor), &font);
    }

    pub fn gap(&mut self, mm: f32) {
        self.cursor -= mm;
    }

    pub fn finish(self) -> Result<Vec<u8>, String> {
        self.doc
            .save_to_bytes()
            .map_err(|e| format!("PDF serialization error: {e}"))
    }

    fn font(&self, style: Style) -> &IndirectFontRef {
        match style {
            Style::Regular => &self.regular,
            Style::Bold => &self.bold,
            Style::Italic => &self.italic,
        }
    }

    /// Move to the next baseline, starting a new page when the bottom margin
    /// would be crossed.
    fn advance(&mut self, size: f32) {
        let line_height = size * PT_TO_MM * 1.4;
        if self.cursor - line_height < MARGIN {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.cursor = PAGE_HEIGHT - MARGIN;
        }
        self.cursor -= line_height;
    }
}

fn chars_per_line(width_mm: f32, size: f32) -> usize {
    ((width_mm / (size * AVG_GLYPH_WIDTH * PT_TO_MM)) as usize).max(10)
}

/// Builtin PDF fonts only cover WinAnsi; fold everything else to ASCII.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' | '\u{2022}' => '-',
            '\t' => ' ',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '?',
        })
        .collect()
}

/// Greedy word wrap. Words longer than a line are split hard.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split: String = word.chars().take(max_chars).collect();
            word = word.chars().skip(max_chars).collect();
            lines.push(split);
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}
