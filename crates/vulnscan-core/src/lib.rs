pub mod config;
pub mod llm;
pub mod narrative;
pub mod pipeline;
pub mod report;
pub mod scanner;
pub mod severity;

pub use config::{AppConfig, ReportSettings};
pub use llm::{build_summarizer, LlmSettings, Summarizer};
pub use narrative::{NarrativeGenerator, NarrativeTask, FALLBACK_NARRATIVE};
pub use pipeline::{Pipeline, Progress, RunOutcome};
pub use report::{OutputFormat, RenderError, Report, ReportRenderer};
pub use scanner::{ScanKind, ScanRequest, ToolAdapter, ToolKind, ToolPaths, ToolResult};
pub use severity::{SeverityLevel, SeverityScore};
