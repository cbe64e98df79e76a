use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Nikto's summary line, e.g. `1 host(s) tested, 0 error(s) and 12 item(s) reported`.
static ITEM_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"and (\d+) item\(s\)").expect("item count pattern is valid"));

/// Ordinal severity buckets shown in the report banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityLevel {
    Excellent,
    Good,
    Moderate,
    High,
    Critical,
}

impl SeverityLevel {
    /// Bucket a finding count: 0, 1–4, 5–9, 10–14, 15+.
    pub fn from_findings(count: usize) -> Self {
        match count {
            0 => Self::Excellent,
            1..=4 => Self::Good,
            5..=9 => Self::Moderate,
            10..=14 => Self::High,
            _ => Self::Critical,
        }
    }

    pub fn score(self) -> u8 {
        match self {
            Self::Excellent => 1,
            Self::Good => 3,
            Self::Moderate => 5,
            Self::High => 7,
            Self::Critical => 10,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Excellent => "The system is secure.",
            Self::Good => "Minor improvements required.",
            Self::Moderate => "Strengthening security is recommended.",
            Self::High => "Urgent measures are needed.",
            Self::Critical => "Serious vulnerabilities detected.",
        }
    }

    /// Banner colour as RGB.
    pub fn color(self) -> (u8, u8, u8) {
        match self {
            Self::Excellent => (0, 128, 0),
            Self::Good => (124, 252, 0),
            Self::Moderate => (255, 255, 0),
            Self::High => (255, 165, 0),
            Self::Critical => (255, 0, 0),
        }
    }
}

/// Severity derived from one tool's finding count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityScore {
    pub findings: usize,
    pub level: SeverityLevel,
    pub score: u8,
}

impl SeverityScore {
    pub fn from_findings(findings: usize) -> Self {
        let level = SeverityLevel::from_findings(findings);
        Self {
            findings,
            level,
            score: level.score(),
        }
    }

    /// One-line banner text, e.g. `High: Urgent measures are needed.`
    pub fn banner(&self) -> String {
        format!("{}: {}", self.level.label(), self.level.description())
    }
}

/// Count reported by the `and N item(s)` phrase; zero when the phrase is absent.
/// Counts too large for `usize` saturate.
pub fn count_reported_items(output: &str) -> usize {
    match ITEM_COUNT.captures(output) {
        Some(caps) => caps[1].parse().unwrap_or(usize::MAX),
        None => {
            if !output.trim().is_empty() {
                debug!("no item count phrase found in scanner output");
            }
            0
        }
    }
}

/// Severity for a web scanner's text output. Never fails.
pub fn score_output(output: &str) -> SeverityScore {
    SeverityScore::from_findings(count_reported_items(output))
}

/// Number of vulnerabilities listed in a wapiti JSON report, summed over
/// every category of the top-level `vulnerabilities` object.
pub fn count_json_vulnerabilities(report: &str) -> Option<usize> {
    let value: serde_json::Value = serde_json::from_str(report).ok()?;
    let categories = value.get("vulnerabilities")?.as_object()?;
    Some(
        categories
            .values()
            .filter_map(|entries| entries.as_array())
            .map(Vec::len)
            .sum(),
    )
}
