use std::path::Path;

use super::{OutputFormat, RenderError, Report, ReportRenderer};

/// Writes the report as pretty-printed JSON.
#[derive(Debug, Default, Clone)]
pub struct JsonRenderer;

impl ReportRenderer for JsonRenderer {
    fn format(&self) -> OutputFormat {
        OutputFormat::Json
    }

    fn render(&self, report: &Report, path: &Path) -> Result<(), RenderError> {
        let body = serde_json::to_string_pretty(report)?;
        std::fs::write(path, body).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
