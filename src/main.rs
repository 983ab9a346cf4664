//! # CPU Flipbook Application Entry Point
//!
//! This binary wires the library together: it loads both flipbooks, starts the CPU
//! sampler, the render loop and the status loop, and stops them on Ctrl-C.
//! It supports both normal mode (icon published to a file for the tray host) and
//! development mode (`--stdout`: icon updates traced, status printed to stdout).
//! The `convert` subcommand turns a directory of PNG frames into a flipbook.

// Test modules
#[cfg(test)]
mod tests;

use anyhow::Context;
use clap::{Parser, Subcommand};
use cpu_flipbook_lib::config::{Config, DEFAULT_CONFIG_FILE};
use cpu_flipbook_lib::convert::{convert_dir, DEFAULT_FRAME_SIZE};
use cpu_flipbook_lib::engine::AnimationEngine;
use cpu_flipbook_lib::flipbook::load_book_from_dir;
use cpu_flipbook_lib::sample::SharedSample;
use cpu_flipbook_lib::sampler::{run_sampler, SysinfoProbe};
use cpu_flipbook_lib::sink::{
    FileIconSink, FileStatusSink, IconSink, LogIconSink, StatusSink, StdoutStatusSink,
};
use cpu_flipbook_lib::status::run_status;
use cpu_flipbook_lib::{shutdown, Flipbook};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cpu-flipbook")]
#[command(about = "Tray icon animation that speeds up with CPU load", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Development mode: trace icon updates and print status lines to stdout
    #[arg(long)]
    stdout: bool,

    /// Append logs to this file instead of stderr
    #[arg(short = 'l', long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a directory of PNG frames into numbered .ico frames
    Convert {
        /// Directory of .png frames, processed in name order
        input: PathBuf,
        /// Output directory for frame_NNNN.ico files
        output: PathBuf,
        /// Edge length of the square output icons (1 to 256)
        #[arg(short, long, default_value_t = DEFAULT_FRAME_SIZE)]
        size: u32,
    },
}

/// Set up `tracing` with `RUST_LOG` filtering (default `info`).
fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn load_book(label: &str, dir: &Path, config: &Config) -> anyhow::Result<Flipbook> {
    let book = load_book_from_dir(dir, config.base_frame_rate())
        .with_context(|| format!("cannot load {label} frames from {}", dir.display()))?;
    info!("loaded {label} frames: {} from {}", book.len(), dir.display());
    Ok(book)
}

fn icon_sink(config: &Config, development_mode: bool) -> Box<dyn IconSink> {
    match (&config.sink.icon_file, development_mode) {
        (Some(path), false) => {
            info!("publishing icon frames to {}", path.display());
            Box::new(FileIconSink::new(path))
        }
        _ => Box::new(LogIconSink::new()),
    }
}

fn status_sink(config: &Config, development_mode: bool) -> Option<Box<dyn StatusSink>> {
    if development_mode {
        return Some(Box::new(StdoutStatusSink));
    }
    config
        .status
        .file
        .as_ref()
        .map(|path| Box::new(FileStatusSink::new(path)) as Box<dyn StatusSink>)
}

/// Load everything, run the three loops, wait for Ctrl-C.
fn run_agent(config: Config, development_mode: bool) -> anyhow::Result<()> {
    // Startup failures are fatal: there is nothing to animate without frames
    let idle = load_book("idle", &config.frames.idle_dir, &config)?;
    let active = load_book("active", &config.frames.active_dir, &config)?;

    let rt = tokio::runtime::Runtime::new().context("cannot start async runtime")?;
    rt.block_on(async {
        let sample = SharedSample::new();
        let (trigger, listener) = shutdown::channel();

        let sampler = tokio::spawn(run_sampler(
            SysinfoProbe::new(),
            sample.clone(),
            config.sampler_timing(),
            listener.clone(),
        ));

        let engine = AnimationEngine::new(Some(idle), Some(active), config.timing());
        let render = tokio::spawn(engine.run(
            sample.clone(),
            icon_sink(&config, development_mode),
            listener.clone(),
        ));

        let status = match status_sink(&config, development_mode) {
            Some(sink) => Some(tokio::spawn(run_status(
                sample.clone(),
                sink,
                config.status_period(),
                listener.clone(),
            ))),
            None => {
                info!("no status output configured");
                None
            }
        };

        info!("application ready");
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for Ctrl-C, shutting down: {err}");
        }
        info!("application exiting");
        trigger.trigger();

        let tasks = [
            ("sampler", Some(sampler)),
            ("render", Some(render)),
            ("status", status),
        ];
        for (name, task) in tasks {
            if let Some(task) = task {
                if let Err(err) = task.await {
                    error!("{name} loop ended abnormally: {err}");
                }
            }
        }
    });

    Ok(())
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref())?;

    match cli.command {
        Some(Command::Convert {
            input,
            output,
            size,
        }) => {
            let report = convert_dir(&input, &output, size)?;
            println!(
                "{} frames written to {} ({} skipped)",
                report.written.len(),
                output.display(),
                report.skipped
            );
            Ok(())
        }
        None => {
            let config = Config::load_from_path(&cli.config);
            run_agent(config, cli.stdout)
        }
    }
}
