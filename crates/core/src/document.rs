//! Printable clinical record document.
//!
//! Lays out a record detail on A4 pages using the built-in Helvetica font, so no font files are
//! needed at runtime. Content that does not fit continues on a new page.

use crate::error::{ClinicaError, ClinicaResult};
use api_shared::pb;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 18.0;
const BODY_SIZE: f32 = 10.0;
const HEADING_SIZE: f32 = 12.0;
const TITLE_SIZE: f32 = 16.0;
const LINE_HEIGHT: f32 = 5.0;
/// Characters per body line at [`BODY_SIZE`] within the margins.
const WRAP_AT: usize = 95;

/// Renders the record detail to PDF bytes.
pub fn render_record(detail: &pb::RecordDetailRes) -> ClinicaResult<Vec<u8>> {
    let title = format!("Ficha clínica {}", detail.record.id);
    let (doc, page, layer) =
        PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(document_error)?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(document_error)?;

    let mut writer = PageWriter {
        layer: doc.get_page(page).get_layer(layer),
        doc: &doc,
        y: PAGE_HEIGHT - MARGIN,
        pages: 1,
    };

    writer.line(&title, TITLE_SIZE, &bold);
    writer.gap();

    let patient = &detail.patient;
    writer.heading("Paciente", &bold);
    writer.field("Nombre", &format!("{} {}", patient.given_names, patient.last_names), &regular);
    writer.field("RUT", &patient.national_id, &regular);
    writer.field("Sexo", opt(&patient.sex), &regular);
    writer.field("Fecha de nacimiento", opt(&patient.birth_date), &regular);
    writer.field("Grupo sanguíneo", opt(&patient.blood_type), &regular);
    writer.field("Peso (kg)", &opt_number(patient.weight_kg), &regular);
    writer.field("Estatura (m)", &opt_number(patient.height_m), &regular);
    let tags = detail
        .allergies
        .iter()
        .map(|a| a.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    writer.field("Alergias", if tags.is_empty() { "-" } else { &tags }, &regular);
    writer.field("Notas de alergia", opt(&patient.allergy_notes), &regular);
    writer.gap();

    let admission = &detail.admission;
    writer.heading("Ingreso", &bold);
    writer.field(
        "Centro / Área",
        &format!("{} / {}", admission.center_name, admission.area_name),
        &regular,
    );
    writer.field("Fecha de ingreso", &admission.admitted_at, &regular);
    writer.field("Estado", &admission.status, &regular);
    writer.field("Detalle de alta", opt(&admission.discharge_details), &regular);
    writer.gap();

    let record = &detail.record;
    writer.heading("Ficha", &bold);
    writer.field("Médico responsable", &record.responsible_physician_name, &regular);
    writer.field("Estado actual", &record.current_status, &regular);
    writer.field("Sector", or_dash(&record.sector), &regular);
    writer.field("Subsector", or_dash(&record.subsector), &regular);
    writer.field("Resumen de tratamiento", or_dash(&record.treatment_summary), &regular);
    writer.gap();

    writer.heading("Notas", &bold);
    if detail.notes.is_empty() {
        writer.line("Sin notas registradas.", BODY_SIZE, &regular);
    }
    for note in &detail.notes {
        writer.line(
            &format!("{} - {}", note.written_at, note.physician_name),
            BODY_SIZE,
            &bold,
        );
        writer.paragraph(&note.detail, &regular);
    }

    let pages = writer.pages;
    let bytes = doc.save_to_bytes().map_err(document_error)?;
    tracing::debug!(record_id = record.id, pages, "record document laid out");
    Ok(bytes)
}

fn document_error(err: printpdf::Error) -> ClinicaError {
    tracing::error!("record document generation failed: {err}");
    ClinicaError::Document(err.to_string())
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("-")
}

fn or_dash(value: &str) -> &str {
    if value.trim().is_empty() { "-" } else { value }
}

fn opt_number(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl PageWriter<'_> {
    fn ensure_room(&mut self, height: f32) {
        if self.y - height < MARGIN {
            self.pages += 1;
            let (page, layer) = self.doc.add_page(
                Mm(PAGE_WIDTH),
                Mm(PAGE_HEIGHT),
                format!("Layer {}", self.pages),
            );
            self.layer = self.doc.get_page(page).get_layer(layer);
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn line(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        let height = LINE_HEIGHT * size / BODY_SIZE;
        self.ensure_room(height);
        self.layer.use_text(text, size, Mm(MARGIN), Mm(self.y), font);
        self.y -= height;
    }

    fn heading(&mut self, text: &str, font: &IndirectFontRef) {
        self.line(text, HEADING_SIZE, font);
    }

    fn field(&mut self, label: &str, value: &str, font: &IndirectFontRef) {
        self.paragraph(&format!("{label}: {value}"), font);
    }

    fn paragraph(&mut self, text: &str, font: &IndirectFontRef) {
        for line in wrap(text, WRAP_AT) {
            self.line(&line, BODY_SIZE, font);
        }
    }

    fn gap(&mut self) {
        self.y -= LINE_HEIGHT;
    }
}

/// Greedy word wrap on character counts. Words longer than `width` are split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for source_line in text.lines() {
        let mut current = String::new();
        for word in source_line.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }
            let current_len = current.chars().count();
            if current_len > 0 && current_len + 1 + word.len() > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.extend(word);
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
