use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

pub mod nikto;
pub mod nmap;
pub mod process;
pub mod wapiti;

pub use nikto::NiktoAdapter;
pub use nmap::NmapAdapter;
pub use wapiti::{WapitiAdapter, WapitiSettings};

/// Which kind of target the operator asked to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanKind {
    /// Port scan only.
    Host,
    /// Port scan of the URL's host plus both web scanners.
    Web,
}

/// A single operator request, resolved before any tool runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    pub kind: ScanKind,
    /// Host or URL exactly as entered.
    pub target: String,
    /// Hostname handed to the port scanner and used to find wapiti's report.
    pub hostname: Option<String>,
}

impl ScanRequest {
    pub fn host(target: impl Into<String>) -> Self {
        let target = target.into().trim().to_string();
        let hostname = Some(target.clone()).filter(|h| !h.is_empty());
        Self {
            kind: ScanKind::Host,
            target,
            hostname,
        }
    }

    pub fn web(target: impl Into<String>) -> Self {
        let target = target.into().trim().to_string();
        let hostname = Url::parse(&target)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string));
        Self {
            kind: ScanKind::Web,
            target,
            hostname,
        }
    }
}

/// External tools driven by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Nmap,
    Nikto,
    Wapiti,
}

impl ToolKind {
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Nmap => "nmap",
            Self::Nikto => "Nikto",
            Self::Wapiti => "Wapiti",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Outcome of one tool invocation. `output` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: ToolKind,
    pub output: String,
    pub success: bool,
}

impl ToolResult {
    pub fn success(tool: ToolKind, output: impl Into<String>) -> Self {
        Self::build(tool, output.into(), true)
    }

    pub fn failure(tool: ToolKind, output: impl Into<String>) -> Self {
        Self::build(tool, output.into(), false)
    }

    /// Placeholder for a tool the selected scan kind does not run.
    pub fn not_run(tool: ToolKind) -> Self {
        Self::failure(tool, format!("{tool} was not run."))
    }

    fn build(tool: ToolKind, output: String, success: bool) -> Self {
        let output = if output.trim().is_empty() {
            format!("No output from {tool}.")
        } else {
            output
        };
        Self {
            tool,
            output,
            success,
        }
    }
}

/// Binary locations for the external scanners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub nmap: String,
    pub nikto: String,
    pub wapiti: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            nmap: "nmap".into(),
            nikto: "nikto".into(),
            wapiti: "wapiti".into(),
        }
    }
}

/// Wrapper around one external scanner. Implementations never fail: every
/// problem is folded into the returned [`ToolResult`].
#[async_trait]
pub trait ToolAdapter: Send + Sync {
    fn kind(&self) -> ToolKind;

    async fn run(&self, target: &str) -> ToolResult;
}
