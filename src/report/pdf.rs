//! A4 PDF layout of a [`ReportBundle`] via `printpdf` builtin fonts.

use std::io::BufWriter;

use printpdf::*;

use super::render::ReportBundle;
use super::ReportError;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const TOP: f32 = 280.0;
const BOTTOM: f32 = 20.0;
const LEFT: f32 = 20.0;
const INDENT: f32 = 25.0;
const WRAP_CHARS: usize = 90;

/// Cursor over the current page. Starts a new page when text would run
/// past the bottom margin.
struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl PageWriter {
    fn new(title: &str) -> Result<Self, ReportError> {
        let (doc, page1, layer1) =
            PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let layer = doc.get_page(page1).get_layer(layer1);
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| ReportError::Pdf(format!("PDF font error: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| ReportError::Pdf(format!("PDF font error: {e}")))?;
        Ok(Self {
            doc,
            layer,
            font,
            bold,
            y: TOP,
        })
    }

    fn ensure_space(&mut self, needed: f32) {
        if self.y - needed < BOTTOM {
            let (page, layer) = self
                .doc
                .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = TOP;
        }
    }

    fn title(&mut self, text: &str) {
        self.layer
            .use_text(text, 14.0, Mm(LEFT), Mm(self.y), &self.bold);
        self.y -= 10.0;
    }

    fn heading(&mut self, text: &str) {
        self.ensure_space(12.0);
        self.y -= 4.0;
        self.layer
            .use_text(text, 11.0, Mm(LEFT), Mm(self.y), &self.bold);
        self.y -= 6.0;
    }

    fn paragraph(&mut self, text: &str, size: f32) {
        for line in wrap_text(text, WRAP_CHARS) {
            self.ensure_space(4.5);
            self.layer
                .use_text(&line, size, Mm(INDENT), Mm(self.y), &self.font);
            self.y -= 4.5;
        }
    }

    fn bullets(&mut self, items: &[String]) {
        if items.is_empty() {
            self.paragraph("None.", 9.0);
            return;
        }
        for item in items {
            self.paragraph(&format!("- {item}"), 9.0);
        }
    }

    fn finish(self) -> Result<Vec<u8>, ReportError> {
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| ReportError::Pdf(format!("PDF save error: {e}")))?;
        buf.into_inner()
            .map_err(|e| ReportError::Pdf(format!("PDF buffer error: {e}")))
    }
}

/// Render the bundle as PDF bytes.
pub fn render_pdf(bundle: &ReportBundle) -> Result<Vec<u8>, ReportError> {
    let mut w = PageWriter::new(&bundle.title)?;
    let summary = &bundle.diagnosis_summary;

    w.title(&bundle.title);
    w.paragraph(
        &format!(
            "Assessed: {}",
            bundle.assessed_at.format("%Y-%m-%d %H:%M:%S UTC")
        ),
        9.0,
    );

    w.heading("DIAGNOSIS");
    w.paragraph(&format!("Primary diagnosis: {}", summary.primary_diagnosis), 10.0);
    w.paragraph(
        &format!(
            "Severity: {} ({:.1}/10)    Urgency: {}    Confidence: {}",
            summary.severity, summary.severity_score, summary.urgency, summary.confidence_level
        ),
        10.0,
    );
    w.paragraph(&format!("Source: {}", summary.source), 9.0);

    let soap = &bundle.soap_note;
    for (heading, lines) in [
        ("SUBJECTIVE", &soap.subjective),
        ("OBJECTIVE", &soap.objective),
        ("ASSESSMENT", &soap.assessment),
        ("PLAN", &soap.plan),
    ] {
        w.heading(heading);
        for line in lines {
            w.paragraph(line, 9.0);
        }
    }

    w.heading("CLINICAL REASONING");
    w.paragraph(&bundle.clinical_reasoning, 9.0);

    let risk = &bundle.risk_analysis;
    w.heading("RISK FACTORS");
    w.bullets(&risk.risk_factors);
    w.heading("RED FLAGS");
    w.bullets(&risk.red_flags);
    w.heading("DIFFERENTIAL DIAGNOSES");
    w.bullets(&risk.differentials);
    if let Some(agreement) = &risk.model_agreement {
        w.heading("MODEL AGREEMENT");
        w.paragraph(agreement, 9.0);
    }

    w.heading("FOR THE PATIENT");
    w.paragraph(&bundle.patient_summary.explanation, 9.0);

    w.heading("DISCLAIMER");
    w.paragraph(&bundle.disclaimer, 8.0);

    w.finish()
}

fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.len() + word.len() + 1 > max_chars && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
