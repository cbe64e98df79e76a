use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::{
    scanner::{ScanKind, ScanRequest, ToolKind, ToolResult},
    severity::{count_json_vulnerabilities, SeverityScore},
};

pub mod json;
pub mod pdf;
pub mod text;

pub use json::JsonRenderer;
pub use pdf::PdfRenderer;

/// Column width of narrative cards.
pub const CARD_WIDTH: usize = 100;

pub const REPORT_TITLE: &str = "Vulnerability Scan Report";

/// Output formats supported by the bundled renderers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pdf,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Error)]
#[error("unknown report format `{0}` (expected pdf or json)")]
pub struct ParseFormatError(String);

impl FromStr for OutputFormat {
    type Err = ParseFormatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "json" => Ok(Self::Json),
            other => Err(ParseFormatError(other.to_string())),
        }
    }
}

/// Errors raised while writing a report to disk.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to load font {}: {source}", path.display())]
    Font {
        path: PathBuf,
        #[source]
        source: genpdf::error::Error,
    },
    #[error("failed to render PDF {}: {source}", path.display())]
    Pdf {
        path: PathBuf,
        #[source]
        source: genpdf::error::Error,
    },
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}

/// One tool's output together with the narrative generated for it.
#[derive(Debug, Clone)]
pub struct NarratedResult {
    pub result: ToolResult,
    /// False for tools the scan kind skips.
    pub ran: bool,
    pub narrative: String,
}

/// Raw output and narrative for one tool.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSection {
    pub tool: ToolKind,
    pub heading: String,
    pub ran: bool,
    pub success: bool,
    /// Vulnerability count when the output is a decodable JSON report.
    pub finding_count: Option<usize>,
    /// Escaped tool output.
    pub raw_output: String,
    pub narrative_heading: String,
    pub narrative: String,
}

impl ReportSection {
    fn from_narrated(narrated: NarratedResult) -> Self {
        let NarratedResult {
            result,
            ran,
            narrative,
        } = narrated;
        let finding_count = match result.tool {
            ToolKind::Wapiti if ran => count_json_vulnerabilities(&result.output),
            _ => None,
        };
        Self {
            tool: result.tool,
            heading: section_heading(result.tool).to_string(),
            ran,
            success: result.success,
            finding_count,
            raw_output: text::escape_for_embedding(&result.output),
            narrative_heading: format!("{} analysis", result.tool),
            narrative,
        }
    }

    /// Narrative as fixed-width card lines.
    pub fn narrative_card(&self) -> Vec<String> {
        text::wrap_text(&self.narrative, CARD_WIDTH)
    }
}

fn section_heading(tool: ToolKind) -> &'static str {
    match tool {
        ToolKind::Nmap => "Port scan results (nmap)",
        ToolKind::Nikto => "Nikto results",
        ToolKind::Wapiti => "Wapiti results (JSON)",
    }
}

/// Aggregate narrative over every tool.
#[derive(Debug, Clone, Serialize)]
pub struct SummarySection {
    pub heading: String,
    pub narrative: String,
}

impl SummarySection {
    pub fn narrative_card(&self) -> Vec<String> {
        text::wrap_text(&self.narrative, CARD_WIDTH)
    }
}

/// The assembled document, independent of output format.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub title: String,
    pub target: String,
    pub scan_kind: ScanKind,
    pub generated_at: DateTime<Local>,
    pub severity: SeverityScore,
    pub sections: Vec<ReportSection>,
    pub summary: SummarySection,
}

impl Report {
    /// Compose the document. Section order follows `results`.
    pub fn assemble(
        request: &ScanRequest,
        severity: SeverityScore,
        results: Vec<NarratedResult>,
        summary: String,
        generated_at: DateTime<Local>,
    ) -> Self {
        Self {
            title: REPORT_TITLE.to_string(),
            target: request.target.clone(),
            scan_kind: request.kind,
            generated_at,
            severity,
            sections: results
                .into_iter()
                .map(ReportSection::from_narrated)
                .collect(),
            summary: SummarySection {
                heading: "Overall summary and recommendations".to_string(),
                narrative: summary,
            },
        }
    }

    /// Deterministic output file name, e.g. `report_example.com_8080_path.pdf`.
    pub fn file_name(&self, format: OutputFormat) -> String {
        report_file_name(&self.target, format)
    }
}

pub fn report_file_name(target: &str, format: OutputFormat) -> String {
    format!("report_{}.{}", text::sanitize_target(target), format.extension())
}

/// Serialises a [`Report`] to one file.
pub trait ReportRenderer: Send + Sync {
    fn format(&self) -> OutputFormat;

    fn render(&self, report: &Report, path: &Path) -> Result<(), RenderError>;
}

/// Render `report` into `output_dir` under its derived file name.
pub fn write_report(
    renderer: &dyn ReportRenderer,
    report: &Report,
    output_dir: &Path,
) -> Result<PathBuf, RenderError> {
    let path = output_dir.join(report.file_name(renderer.format()));
    renderer.render(report, &path)?;
    info!(path = %path.display(), format = %renderer.format(), "report written");
    Ok(path)
}
