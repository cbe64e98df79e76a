//! PDF layout: title block, severity banner, one section per tool with the raw
//! output followed by a framed narrative card, then the overall summary.

use std::path::{Path, PathBuf};

use genpdf::{
    elements::{Break, FrameCellDecorator, Paragraph, TableLayout},
    fonts::{FontData, FontFamily},
    style::{Color, Style},
    Alignment, Document, Element as _, PaperSize, SimplePageDecorator,
};

use super::{text, OutputFormat, RenderError, Report, ReportRenderer};
use crate::severity::SeverityScore;

/// Longest unbroken run laid out in raw output. The layout engine drops any
/// word wider than the column, so longer tokens are split first.
const RAW_MAX_RUN: usize = 55;
/// Same limit for narrative card rows, which use the larger body size.
const CARD_MAX_RUN: usize = 45;
/// Banner text never gets lighter than this relative luminance.
const MAX_INK_LUMINANCE: f64 = 0.45;

const TITLE_SIZE: u8 = 18;
const HEADING_SIZE: u8 = 14;
const BODY_SIZE: u8 = 11;
const RAW_SIZE: u8 = 9;

pub struct PdfRenderer {
    font_path: PathBuf,
}

impl PdfRenderer {
    pub fn new(font_path: impl Into<PathBuf>) -> Self {
        Self {
            font_path: font_path.into(),
        }
    }

    /// The same face serves every style.
    fn load_fonts(&self) -> Result<FontFamily<FontData>, RenderError> {
        let data = FontData::load(&self.font_path, None).map_err(|source| RenderError::Font {
            path: self.font_path.clone(),
            source,
        })?;
        Ok(FontFamily {
            regular: data.clone(),
            bold: data.clone(),
            italic: data.clone(),
            bold_italic: data,
        })
    }

    fn build(&self, report: &Report) -> Result<Document, RenderError> {
        let mut doc = Document::new(self.load_fonts()?);
        doc.set_title(report.title.clone());
        doc.set_paper_size(PaperSize::Letter);
        doc.set_font_size(BODY_SIZE);
        doc.set_line_spacing(1.25);
        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(14);
        doc.set_page_decorator(decorator);

        doc.push(
            Paragraph::new(report.title.as_str()).styled(Style::new().bold().with_font_size(TITLE_SIZE)),
        );
        doc.push(Break::new(1.0));
        doc.push(Paragraph::new(format!("Target: {}", report.target)));
        doc.push(Paragraph::new(format!(
            "Date: {}",
            report.generated_at.format("%Y-%m-%d %H:%M:%S")
        )));
        doc.push(Break::new(1.5));

        doc.push(heading("Overall security status"));
        doc.push(banner(&report.severity));
        doc.push(Break::new(1.5));

        for section in &report.sections {
            doc.push(heading(&section.heading));
            if let Some(count) = section.finding_count {
                doc.push(Paragraph::new(format!("Vulnerabilities reported: {count}")));
            }
            for line in text::split_long_runs(&section.raw_output, RAW_MAX_RUN) {
                doc.push(raw_line(line));
            }
            doc.push(Break::new(1.0));
            doc.push(heading(&section.narrative_heading));
            doc.push(card(&section.narrative_card())?);
            doc.push(Break::new(1.5));
        }

        doc.push(heading(&report.summary.heading));
        doc.push(card(&report.summary.narrative_card())?);
        Ok(doc)
    }
}

impl ReportRenderer for PdfRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Pdf
    }

    fn render(&self, report: &Report, path: &Path) -> Result<(), RenderError> {
        let doc = self.build(report)?;
        doc.render_to_file(path).map_err(|source| RenderError::Pdf {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn heading(text: &str) -> impl genpdf::Element {
    Paragraph::new(text).styled(Style::new().bold().with_font_size(HEADING_SIZE))
}

fn raw_line(line: String) -> impl genpdf::Element {
    // an empty paragraph has no height
    let line = if line.is_empty() { " ".to_string() } else { line };
    Paragraph::new(line).styled(Style::new().with_font_size(RAW_SIZE))
}

fn banner(severity: &SeverityScore) -> impl genpdf::Element {
    let (r, g, b) = ink(severity.level.color());
    Paragraph::new(format!("{} (score {}/10)", severity.banner(), severity.score))
        .aligned(Alignment::Center)
        .styled(
            Style::new()
                .bold()
                .with_font_size(12)
                .with_color(Color::Rgb(r, g, b)),
        )
        .padded(3)
        .framed()
}

/// Darken a colour until it reads on a white page, keeping its hue.
fn ink((r, g, b): (u8, u8, u8)) -> (u8, u8, u8) {
    let luminance = relative_luminance((r, g, b));
    if luminance <= MAX_INK_LUMINANCE {
        return (r, g, b);
    }
    let scale = MAX_INK_LUMINANCE / luminance;
    let darken = |channel: u8| (f64::from(channel) * scale).floor() as u8;
    (darken(r), darken(g), darken(b))
}

fn relative_luminance((r, g, b): (u8, u8, u8)) -> f64 {
    (0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)) / 255.0
}

/// Framed single-column table, one row per wrapped line so it can split across pages.
fn card(lines: &[String]) -> Result<TableLayout, RenderError> {
    let mut table = TableLayout::new(vec![1]);
    table.set_cell_decorator(FrameCellDecorator::new(false, true, true));
    let rows = lines
        .iter()
        .flat_map(|line| text::split_long_runs(line, CARD_MAX_RUN));
    for row in rows {
        let line = if row.is_empty() { " " } else { row.as_str() };
        table
            .row()
            .element(Paragraph::new(line).padded((0, 2, 0, 2)))
            .push()
            .map_err(|source| RenderError::Pdf {
                path: PathBuf::new(),
                source,
            })?;
    }
    Ok(table)
}
