use std::path::PathBuf;

use chrono::Local;
use tracing::{error, info, instrument};

use crate::{
    config::AppConfig,
    narrative::NarrativeGenerator,
    report::{write_report, JsonRenderer, NarratedResult, OutputFormat, PdfRenderer, RenderError, Report, ReportRenderer},
    scanner::{
        NiktoAdapter, NmapAdapter, ScanKind, ScanRequest, ToolAdapter, ToolKind, ToolResult,
        WapitiAdapter,
    },
    severity::{score_output, SeverityScore},
};

/// Coarse step reporting for the operator. Carries no cancellation.
pub trait Progress: Send + Sync {
    fn start(&self, total_steps: usize);
    fn step_done(&self, step: &str);
    fn finish(&self);
}

/// Progress sink that reports nothing.
#[derive(Debug, Default, Clone)]
pub struct SilentProgress;

impl Progress for SilentProgress {
    fn start(&self, _total_steps: usize) {}
    fn step_done(&self, _step: &str) {}
    fn finish(&self) {}
}

/// Result of one run. The report is always assembled; writing it may fail.
#[derive(Debug)]
pub struct RunOutcome {
    pub report: Report,
    pub output: Result<PathBuf, RenderError>,
}

/// Runs the tools for a request in order, narrates their output and writes the report.
pub struct Pipeline {
    nmap: Box<dyn ToolAdapter>,
    nikto: Box<dyn ToolAdapter>,
    wapiti: Box<dyn ToolAdapter>,
    narrator: NarrativeGenerator,
    renderer: Box<dyn ReportRenderer>,
    output_dir: PathBuf,
}

impl Pipeline {
    /// Wire the real adapters and the configured renderer.
    pub fn new(config: &AppConfig, narrator: NarrativeGenerator) -> Self {
        let renderer: Box<dyn ReportRenderer> = match config.report.format {
            OutputFormat::Pdf => Box::new(PdfRenderer::new(config.report.font_path.clone())),
            OutputFormat::Json => Box::new(JsonRenderer),
        };
        Self::with_parts(
            Box::new(NmapAdapter::new(&config.tools)),
            Box::new(NiktoAdapter::new(&config.tools)),
            Box::new(WapitiAdapter::new(&config.tools, config.wapiti.clone())),
            narrator,
            renderer,
            config.report.output_dir.clone(),
        )
    }

    pub fn with_parts(
        nmap: Box<dyn ToolAdapter>,
        nikto: Box<dyn ToolAdapter>,
        wapiti: Box<dyn ToolAdapter>,
        narrator: NarrativeGenerator,
        renderer: Box<dyn ReportRenderer>,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            nmap,
            nikto,
            wapiti,
            narrator,
            renderer,
            output_dir,
        }
    }

    #[instrument(name = "scan_run", skip(self, request, progress), fields(scan_target = %request.target, kind = ?request.kind))]
    pub async fn run(&self, request: &ScanRequest, progress: &dyn Progress) -> RunOutcome {
        let results = match request.kind {
            ScanKind::Host => {
                progress.start(1);
                let nmap = self.port_scan(request).await;
                progress.step_done("nmap");
                vec![
                    (nmap, true),
                    (ToolResult::not_run(ToolKind::Nikto), false),
                    (ToolResult::not_run(ToolKind::Wapiti), false),
                ]
            }
            ScanKind::Web => {
                progress.start(4);
                let nmap = self.port_scan(request).await;
                progress.step_done("nmap");
                let nikto = self.nikto.run(&request.target).await;
                progress.step_done("nikto");
                let wapiti = self.wapiti.run(&request.target).await;
                progress.step_done("wapiti");
                vec![(nmap, true), (nikto, true), (wapiti, true)]
            }
        };

        let severity = results
            .iter()
            .find(|(result, ran)| *ran && result.tool == ToolKind::Nikto)
            .map(|(result, _)| score_output(&result.output))
            .unwrap_or_else(|| SeverityScore::from_findings(0));
        info!(
            findings = severity.findings,
            score = severity.score,
            level = severity.level.label(),
            "severity computed"
        );

        let mut narrated = Vec::with_capacity(results.len());
        for (result, ran) in results {
            let narrative = self.narrator.narrate_tool(&result, ran).await;
            narrated.push(NarratedResult {
                result,
                ran,
                narrative,
            });
        }
        let ran: Vec<ToolResult> = narrated
            .iter()
            .filter(|n| n.ran)
            .map(|n| n.result.clone())
            .collect();
        let summary = self.narrator.narrate_aggregate(&ran).await;

        let report = Report::assemble(request, severity, narrated, summary, Local::now());
        let output = write_report(self.renderer.as_ref(), &report, &self.output_dir);
        if let Err(err) = &output {
            error!(error = %err, "failed to write report");
        }
        if request.kind == ScanKind::Web {
            progress.step_done("report");
        }
        progress.finish();
        RunOutcome { report, output }
    }

    async fn port_scan(&self, request: &ScanRequest) -> ToolResult {
        match request.hostname.as_deref() {
            Some(host) => self.nmap.run(host).await,
            None => ToolResult::failure(
                ToolKind::Nmap,
                format!(
                    "Error running nmap: could not derive a hostname from `{}`",
                    request.target
                ),
            ),
        }
    }
}
