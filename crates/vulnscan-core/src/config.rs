use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    report::OutputFormat,
    scanner::{ToolPaths, WapitiSettings},
};

/// Report output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// TrueType font used for every text style in the PDF.
    pub font_path: PathBuf,
    pub output_dir: PathBuf,
    pub format: OutputFormat,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            font_path: PathBuf::from("fonts/SFPro-Regular.ttf"),
            output_dir: PathBuf::from("."),
            format: OutputFormat::Pdf,
        }
    }
}

/// File/environment configuration for a run. Every section is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub tools: ToolPaths,
    pub wapiti: WapitiSettings,
    pub report: ReportSettings,
}
