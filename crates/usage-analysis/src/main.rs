use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, warn};
use trace_events::TraceEvent;
use usage::{Config, Engine, NameFilter, WindowReport};

mod event_source;
mod json_report;
mod report_writer;
mod text_report;

use json_report::render_json;
use report_writer::ReportWriter;
use text_report::{Sections, TextRenderer};

/// CPU, per-task, syscall and disk usage from a kernel trace, per refresh window
#[derive(Debug, Parser)]
#[command(name = "usage-analysis")]
struct Cli {
    /// Input Parquet event file
    path: PathBuf,

    /// Refresh period in seconds (0 = one report for the whole trace)
    #[arg(short, long, default_value = "0")]
    refresh: u64,

    /// Show per-CPU usage
    #[arg(long)]
    cpu: bool,

    /// Show per-TID usage
    #[arg(long)]
    tid: bool,

    /// Show disk request statistics
    #[arg(long)]
    disk: bool,

    /// Show syscall statistics across all tasks
    #[arg(long)]
    global_syscalls: bool,

    /// Show syscall statistics per TID (implies --tid)
    #[arg(long)]
    tid_syscalls: bool,

    /// Show overall CPU usage
    #[arg(long)]
    overall: bool,

    /// Show trace information
    #[arg(long)]
    info: bool,

    /// Only show the N busiest tasks (0 = all)
    #[arg(long, default_value = "0")]
    top: usize,

    /// Only show tasks with these comma separated names or TIDs
    #[arg(long, value_name = "NAMES")]
    name: Option<String>,

    /// Also write every window as a Parquet metric time series
    #[arg(long, value_name = "FILE")]
    parquet_out: Option<PathBuf>,

    /// Print text reports (the default unless another output is chosen)
    #[arg(long)]
    text: bool,

    /// Print every window as one JSON object per line
    #[arg(long)]
    json: bool,

    /// Verbose debug output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Selected text sections. Without any section flag everything is shown.
    fn sections(&self) -> Sections {
        let any = self.info
            || self.overall
            || self.cpu
            || self.tid
            || self.tid_syscalls
            || self.global_syscalls
            || self.disk;
        if !any {
            return Sections::all();
        }

        Sections {
            info: self.info,
            overall: self.overall,
            cpu: self.cpu,
            tid: self.tid || self.tid_syscalls,
            tid_syscalls: self.tid_syscalls,
            global_syscalls: self.global_syscalls,
            disk: self.disk,
        }
    }

    /// Text is printed when asked for, or when no other output is chosen
    fn text_enabled(&self) -> bool {
        self.text || (!self.json && self.parquet_out.is_none())
    }

    fn config(&self, sections: &Sections) -> Config {
        Config {
            refresh_period_secs: self.refresh,
            global_syscalls: sections.global_syscalls,
            tid_syscalls: sections.tid_syscalls,
            disk_stats: sections.disk,
            name_filter: self
                .name
                .as_deref()
                .map(NameFilter::parse)
                .unwrap_or_default(),
            top: self.top,
            ..Config::default()
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

/// Report outputs enabled on the command line
struct Outputs {
    text: Option<TextRenderer>,
    json: bool,
    parquet: Option<ReportWriter<File>>,
}

impl Outputs {
    /// Hands one report to every enabled output
    fn emit<W: Write>(&mut self, out: &mut W, report: &WindowReport) -> Result<()> {
        if let Some(text) = &self.text {
            text.render(out, report)
                .with_context(|| "Failed to write text report")?;
        }
        if self.json {
            render_json(out, report)?;
        }
        if let Some(parquet) = self.parquet.as_mut() {
            parquet.write(report)?;
        }
        Ok(())
    }
}

/// Decodes events, skipping the ones that do not match their schema
fn decode_events(path: &std::path::Path) -> Result<(Vec<TraceEvent>, usize)> {
    let mut events = Vec::new();
    let mut decode_failures = 0usize;

    for raw in event_source::read_events(path)? {
        match TraceEvent::decode(&raw) {
            Ok(event) => events.push(event),
            Err(e) => {
                warn!("Skipping {} event at {}: {}", raw.name, raw.timestamp, e);
                decode_failures += 1;
            }
        }
    }

    Ok((events, decode_failures))
}

fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    let sections = cli.sections();
    let config = cli.config(&sections);
    debug!("Configuration: {:?}", config);

    // Every read and validation error surfaces before any output exists
    let (events, decode_failures) = decode_events(&cli.path)?;
    debug!("Read {} events from {}", events.len(), cli.path.display());

    let parquet = match &cli.parquet_out {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Some(ReportWriter::new(file)?)
        }
        None => None,
    };

    let mut outputs = Outputs {
        text: cli.text_enabled().then(|| TextRenderer::new(sections)),
        json: cli.json,
        parquet,
    };

    let mut engine = Engine::new(config);
    let result = emit_all(&mut engine, &events, &mut outputs, out);

    // The Parquet footer is written even when emitting failed
    let closed = outputs.parquet.take().map(ReportWriter::close).transpose();
    result?;
    closed?;

    let stats = engine.dispatch_stats();
    debug!(
        "Done: {} events dispatched, {} unhandled, {} disabled, {} unresolved syscalls, {} dropped, {} undecodable",
        stats.events_dispatched,
        stats.unknown_events,
        stats.disabled_events,
        stats.unresolved_syscalls,
        engine.dropped_events(),
        decode_failures
    );

    Ok(())
}

fn emit_all<W: Write>(
    engine: &mut Engine,
    events: &[TraceEvent],
    outputs: &mut Outputs,
    out: &mut W,
) -> Result<()> {
    for event in events {
        if let Some(report) = engine.handle(event) {
            outputs.emit(out, &report)?;
        }
    }

    if let Some(report) = engine.finish() {
        outputs.emit(out, &report)?;
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let stdout = io::stdout();
    run(&cli, &mut stdout.lock())
}
