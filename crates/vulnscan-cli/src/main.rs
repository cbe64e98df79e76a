mod menu;
mod settings;

use std::{
    io::{self, Write},
    path::PathBuf,
    sync::atomic::{AtomicUsize, Ordering},
};

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use vulnscan_core::{
    build_summarizer, AppConfig, LlmSettings, NarrativeGenerator, OutputFormat, Pipeline,
    Progress, ScanRequest,
};

use crate::menu::Action;

#[derive(Parser, Debug)]
#[command(
    name = "vulnscan",
    author,
    version,
    about = "Runs nmap, Nikto and Wapiti against a target and writes an annotated report"
)]
struct Cli {
    /// Optional configuration file (TOML, YAML or JSON)
    #[arg(long, value_name = "FILE", default_value = "vulnscan.toml")]
    config: PathBuf,

    /// Report format, overriding the configuration
    #[arg(long, value_name = "FORMAT")]
    format: Option<OutputFormat>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let dotenv = dotenvy::dotenv();
    init_tracing();
    match dotenv {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(err) if err.not_found() => {}
        Err(err) => warn!(error = %err, "failed to load .env"),
    }
    let cli = Cli::parse();

    let mut config = settings::load_config(&cli.config)?;
    if let Some(format) = cli.format {
        config.report.format = format;
    }
    let llm = LlmSettings::from_env().context("invalid LLM settings")?;

    let action = {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut out = io::stdout();
        menu::prompt_action(&mut input, &mut out)?
    };

    match action {
        Action::Exit => println!("Exiting..."),
        Action::Invalid(reason) => println!("{reason}"),
        Action::Scan(request) => run_scan(&config, &llm, request).await,
    }
    Ok(())
}

async fn run_scan(config: &AppConfig, llm: &LlmSettings, request: ScanRequest) {
    let summarizer = build_summarizer(llm);
    let narrator = NarrativeGenerator::new(summarizer, llm.max_input_chars);
    let pipeline = Pipeline::new(config, narrator);
    info!(scan_target = %request.target, kind = ?request.kind, format = %config.report.format, "starting scan");

    let outcome = pipeline.run(&request, &TerminalProgress::default()).await;
    match outcome.output {
        Ok(path) => println!("{} {}", "Report generated:".green().bold(), path.display()),
        Err(err) => println!("{} {err}", "Error generating report:".red().bold()),
    }
}

/// Step counter printed to stderr, e.g. `[2/4] nikto`.
#[derive(Default)]
struct TerminalProgress {
    total: AtomicUsize,
    done: AtomicUsize,
}

impl Progress for TerminalProgress {
    fn start(&self, total_steps: usize) {
        self.total.store(total_steps, Ordering::Relaxed);
        self.done.store(0, Ordering::Relaxed);
        eprintln!("{} {} step(s)", "Scan progress:".cyan(), total_steps);
    }

    fn step_done(&self, step: &str) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let total = self.total.load(Ordering::Relaxed);
        eprintln!("{} {step} done", format!("[{done}/{total}]").cyan());
        let _ = io::stderr().flush();
    }

    fn finish(&self) {
        eprintln!("{}", "Scan complete.".cyan());
    }
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,hyper=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .try_init();
}
