//! Web application fuzzing through wapiti's JSON report.
//!
//! Wapiti writes its report next to where it runs instead of to stdout, so the
//! adapter clears stale reports for the host, runs the tool inside the results
//! directory and then waits for a fresh, fully written report file to appear.

use std::{
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};
use url::Url;

use super::{
    process::{format_elapsed, run_command},
    ToolAdapter, ToolKind, ToolPaths, ToolResult,
};

/// Returned when no report shows up before the poll timeout.
pub const REPORT_NOT_FOUND: &str = "Wapiti JSON report not found.";

/// Coarse filesystem timestamps can put a fresh file slightly before the run start.
const MTIME_SLACK: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WapitiSettings {
    /// Directory wapiti runs in and writes its report to.
    pub results_dir: PathBuf,
    pub max_links_per_page: u32,
    pub poll_interval_ms: u64,
    pub poll_timeout_secs: u64,
}

impl Default for WapitiSettings {
    fn default() -> Self {
        Self {
            results_dir: PathBuf::from("."),
            max_links_per_page: 10,
            poll_interval_ms: 500,
            poll_timeout_secs: 30,
        }
    }
}

impl WapitiSettings {
    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }
}

#[derive(Debug, Error)]
pub enum ReportLookupError {
    #[error("no wapiti report for `{hostname}` appeared within {waited}")]
    Timeout { hostname: String, waited: String },
    #[error("failed to inspect {}: {source}", dir.display())]
    Io {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct WapitiAdapter {
    binary: String,
    settings: WapitiSettings,
}

impl WapitiAdapter {
    pub fn new(tools: &ToolPaths, settings: WapitiSettings) -> Self {
        Self {
            binary: tools.wapiti.clone(),
            settings,
        }
    }

    fn args(&self, url: &str) -> Vec<String> {
        vec![
            "-u".into(),
            url.into(),
            "-f".into(),
            "json".into(),
            "--max-links-per-page".into(),
            self.settings.max_links_per_page.to_string(),
        ]
    }

    async fn read_report(path: &Path) -> ToolResult {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                info!(report = %path.display(), bytes = content.len(), "loaded wapiti report");
                ToolResult::success(ToolKind::Wapiti, content)
            }
            Err(err) => {
                warn!(report = %path.display(), error = %err, "wapiti report unreadable");
                ToolResult::failure(
                    ToolKind::Wapiti,
                    format!("Error running Wapiti: failed to read {}: {err}", path.display()),
                )
            }
        }
    }
}

#[async_trait]
impl ToolAdapter for WapitiAdapter {
    fn kind(&self) -> ToolKind {
        ToolKind::Wapiti
    }

    async fn run(&self, url: &str) -> ToolResult {
        let Some(hostname) = Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_string))
        else {
            warn!(%url, "cannot derive hostname for wapiti report lookup");
            return ToolResult::failure(
                ToolKind::Wapiti,
                format!("Error running Wapiti: could not derive a hostname from `{url}`"),
            );
        };
        let dir = &self.settings.results_dir;

        match remove_previous_reports(dir, &hostname).await {
            Ok(0) => {}
            Ok(removed) => debug!(removed, "removed stale wapiti reports"),
            Err(err) => warn!(error = %err, "could not clear stale wapiti reports"),
        }

        info!(tool = %ToolKind::Wapiti, binary = %self.binary, "running external tool");
        let started_at = SystemTime::now();
        let started = Instant::now();
        match run_command(&self.binary, &self.args(url), Some(dir)).await {
            Ok(output) => {
                info!(
                    tool = %ToolKind::Wapiti,
                    success = output.success,
                    elapsed = %format_elapsed(started.elapsed()),
                    "external tool finished"
                );
            }
            Err(err) => {
                warn!(tool = %ToolKind::Wapiti, error = %err, "external tool could not be started");
                return ToolResult::failure(ToolKind::Wapiti, format!("Error running Wapiti: {err}"));
            }
        }

        let since = started_at.checked_sub(MTIME_SLACK).unwrap_or(started_at);
        match locate_report(
            dir,
            &hostname,
            since,
            self.settings.poll_interval(),
            self.settings.poll_timeout(),
        )
        .await
        {
            Ok(path) => Self::read_report(&path).await,
            Err(ReportLookupError::Timeout { .. }) => {
                warn!(%hostname, dir = %dir.display(), "wapiti report never appeared");
                ToolResult::failure(ToolKind::Wapiti, REPORT_NOT_FOUND)
            }
            Err(err) => {
                warn!(error = %err, "wapiti report lookup failed");
                ToolResult::failure(ToolKind::Wapiti, format!("Error running Wapiti: {err}"))
            }
        }
    }
}

/// Equivalent of the glob `*<hostname>*.json`.
fn matches_report_name(file_name: &str, hostname: &str) -> bool {
    file_name.ends_with(".json") && file_name.contains(hostname)
}

/// Delete every report for `hostname` in `dir`, returning how many went away.
pub async fn remove_previous_reports(dir: &Path, hostname: &str) -> Result<usize, ReportLookupError> {
    let io_err = |source: std::io::Error| ReportLookupError::Io {
        dir: dir.to_path_buf(),
        source,
    };
    let mut removed = 0;
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let name = entry.file_name();
        if !matches_report_name(&name.to_string_lossy(), hostname) {
            continue;
        }
        if entry.file_type().await.map_err(io_err)?.is_file() {
            tokio::fs::remove_file(entry.path()).await.map_err(io_err)?;
            removed += 1;
        }
    }
    Ok(removed)
}

/// Most recently modified report for `hostname` not older than `since`, with its size.
async fn newest_report(
    dir: &Path,
    hostname: &str,
    since: SystemTime,
) -> Result<Option<(PathBuf, u64)>, ReportLookupError> {
    let io_err = |source: std::io::Error| ReportLookupError::Io {
        dir: dir.to_path_buf(),
        source,
    };
    let mut newest: Option<(SystemTime, PathBuf, u64)> = None;
    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        if !matches_report_name(&entry.file_name().to_string_lossy(), hostname) {
            continue;
        }
        let metadata = match entry.metadata().await {
            Ok(metadata) if metadata.is_file() => metadata,
            // removed between listing and stat
            _ => continue,
        };
        let modified = metadata.modified().map_err(io_err)?;
        if modified < since {
            continue;
        }
        if newest.as_ref().map_or(true, |(seen, _, _)| modified > *seen) {
            newest = Some((modified, entry.path(), metadata.len()));
        }
    }
    Ok(newest.map(|(_, path, len)| (path, len)))
}

/// Poll `dir` until a report for `hostname` exists and its size is unchanged
/// between two consecutive polls, or until `timeout` elapses.
pub async fn locate_report(
    dir: &Path,
    hostname: &str,
    since: SystemTime,
    interval: Duration,
    timeout: Duration,
) -> Result<PathBuf, ReportLookupError> {
    let deadline = Instant::now() + timeout;
    let mut previous: Option<(PathBuf, u64)> = None;
    loop {
        let current = newest_report(dir, hostname, since).await?;
        if let Some((path, len)) = &current {
            if *len > 0 && previous.as_ref() == current.as_ref() {
                debug!(report = %path.display(), len, "wapiti report is stable");
                return Ok(path.clone());
            }
        }
        previous = current;
        if Instant::now() >= deadline {
            return Err(ReportLookupError::Timeout {
                hostname: hostname.to_string(),
                waited: format_elapsed(timeout),
            });
        }
        sleep(interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_settings(dir: &Path) -> WapitiSettings {
        WapitiSettings {
            results_dir: dir.to_path_buf(),
            max_links_per_page: 10,
            poll_interval_ms: 20,
            poll_timeout_secs: 0,
        }
    }

    #[test]
    fn report_name_matching_follows_glob() {
        assert!(matches_report_name("example.com_202401011200.json", "example.com"));
        assert!(matches_report_name("scan-example.com.json", "example.com"));
        assert!(!matches_report_name("example.com.html", "example.com"));
        assert!(!matches_report_name("other.org.json", "example.com"));
    }

    #[test]
    fn builds_fixed_arguments() {
        let adapter = WapitiAdapter::new(&ToolPaths::default(), WapitiSettings::default());
        assert_eq!(
            adapter.args("http://example.com"),
            vec!["-u", "http://example.com", "-f", "json", "--max-links-per-page", "10"]
        );
    }

    #[tokio::test]
    async fn removes_only_matching_reports() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("example.com_1.json"), "{}").unwrap();
        std::fs::write(dir.path().join("example.com_2.json"), "{}").unwrap();
        std::fs::write(dir.path().join("other.org.json"), "{}").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "keep").unwrap();

        let removed = remove_previous_reports(dir.path(), "example.com").await.unwrap();
        assert_eq!(removed, 2);
        assert!(dir.path().join("other.org.json").exists());
        assert!(dir.path().join("notes.txt").exists());
    }

    #[tokio::test]
    async fn finds_report_written_after_polling_starts() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("example.com_20240101.json");
        let writer_target = target.clone();
        let since = SystemTime::now() - MTIME_SLACK;
        let writer = tokio::spawn(async move {
            sleep(Duration::from_millis(60)).await;
            tokio::fs::write(&writer_target, r#"{"vulnerabilities":{}}"#)
                .await
                .unwrap();
        });

        let found = locate_report(
            dir.path(),
            "example.com",
            since,
            Duration::from_millis(20),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        writer.await.unwrap();
        assert_eq!(found, target);
    }

    fn write_with_mtime(path: &Path, body: &str, modified: SystemTime) {
        std::fs::write(path, body).unwrap();
        std::fs::File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(modified)
            .unwrap();
    }

    #[tokio::test]
    async fn most_recently_modified_report_wins() {
        let dir = tempfile::tempdir().unwrap();
        let now = SystemTime::now();
        let older = dir.path().join("example.com_older.json");
        let newer = dir.path().join("example.com_newer.json");
        write_with_mtime(&newer, r#"{"run":2}"#, now - Duration::from_secs(5));
        write_with_mtime(&older, r#"{"run":1}"#, now - Duration::from_secs(30));

        let found = locate_report(
            dir.path(),
            "example.com",
            now - Duration::from_secs(60),
            Duration::from_millis(10),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(found, newer);
    }

    #[tokio::test]
    async fn reports_older_than_the_run_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("example.com_stale.json");
        let now = SystemTime::now();
        write_with_mtime(&stale, r#"{"old":true}"#, now - Duration::from_secs(600));

        let err = locate_report(
            dir.path(),
            "example.com",
            now - MTIME_SLACK,
            Duration::from_millis(10),
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ReportLookupError::Timeout { .. }));
        assert!(stale.exists());
    }

    #[tokio::test]
    async fn ignores_empty_reports_until_timeout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("example.com.json"), "").unwrap();
        let err = locate_report(
            dir.path(),
            "example.com",
            SystemTime::now() - MTIME_SLACK,
            Duration::from_millis(10),
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ReportLookupError::Timeout { hostname, .. } if hostname == "example.com"));
    }

    #[tokio::test]
    async fn missing_directory_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        let err = locate_report(
            &missing,
            "example.com",
            SystemTime::now(),
            Duration::from_millis(10),
            Duration::from_millis(10),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ReportLookupError::Io { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn returns_not_found_sentinel_when_tool_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("example.com_stale.json"), "{\"old\":true}").unwrap();
        let tools = ToolPaths {
            wapiti: "true".into(),
            ..ToolPaths::default()
        };
        let adapter = WapitiAdapter::new(&tools, fast_settings(dir.path()));

        let result = adapter.run("http://example.com/app").await;
        assert!(!result.success);
        assert_eq!(result.output, REPORT_NOT_FOUND);
        assert!(!dir.path().join("example.com_stale.json").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_returns_report_written_by_tool() {
        use std::os::unix::fs::PermissionsExt;

        const REPORT: &str = r#"{"vulnerabilities":{"XSS":[{}]}}"#;
        let bin_dir = tempfile::tempdir().unwrap();
        let script = bin_dir.path().join("wapiti");
        std::fs::write(
            &script,
            format!("#!/bin/sh\nprintf '%s\\n' '{REPORT}' > example.com_1.json\n"),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let results = tempfile::tempdir().unwrap();
        let tools = ToolPaths {
            wapiti: script.to_string_lossy().into_owned(),
            ..ToolPaths::default()
        };
        let settings = WapitiSettings {
            poll_timeout_secs: 5,
            ..fast_settings(results.path())
        };
        let adapter = WapitiAdapter::new(&tools, settings);

        // a freshly written script can briefly be busy for exec
        let mut result = adapter.run("http://example.com/app").await;
        for _ in 0..5 {
            if !result.output.contains("Text file busy") {
                break;
            }
            sleep(Duration::from_millis(50)).await;
            result = adapter.run("http://example.com/app").await;
        }

        assert!(result.success, "unexpected output: {}", result.output);
        assert_eq!(result.output.trim_end(), REPORT);
        assert!(results.path().join("example.com_1.json").exists());
    }

    #[tokio::test]
    async fn url_without_host_is_reported_inline() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = WapitiAdapter::new(&ToolPaths::default(), fast_settings(dir.path()));
        let result = adapter.run("not a url").await;
        assert!(!result.success);
        assert!(result.output.contains("could not derive a hostname"));
    }

    #[tokio::test]
    async fn missing_binary_is_reported_inline() {
        let dir = tempfile::tempdir().unwrap();
        let tools = ToolPaths {
            wapiti: "/nonexistent/wapiti".into(),
            ..ToolPaths::default()
        };
        let adapter = WapitiAdapter::new(&tools, fast_settings(dir.path()));
        let result = adapter.run("http://example.com").await;
        assert!(!result.success);
        assert!(result.output.starts_with("Error running Wapiti:"));
    }
}
