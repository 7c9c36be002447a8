//! osci - drive an oscilloscope in X-Y mode from the sound card
//!
//! Run with: cargo run -- --help

mod app;
mod ui;

use std::{fs::File, path::PathBuf, sync::Mutex};

use clap::Parser;
use color_eyre::eyre::{Result as EyreResult, WrapErr};
use tracing_subscriber::EnvFilter;

use app::Osci;

#[derive(Parser, Debug)]
#[command(author, version, about = "Trace shapes on an oscilloscope through the sound card", long_about = None)]
struct Cli {
    /// Print the available output devices and exit.
    #[arg(long)]
    list_devices: bool,
    /// Output device to open instead of the host default.
    #[arg(short, long)]
    device: Option<String>,
    /// Image redraw rate in Hz.
    #[arg(long, default_value_t = 60.0)]
    frame_rate: f32,
    /// Play for this many seconds without the terminal interface.
    #[arg(long, value_name = "SECONDS")]
    headless: Option<f32>,
    /// Write logs here. Without it the interface runs with logging off.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(&cli)?;

    let osci = Osci::new(cli.device, cli.frame_rate);
    if cli.list_devices {
        return osci.list_devices();
    }
    match cli.headless {
        Some(seconds) => osci.run_headless(seconds),
        None => osci.run_tui(),
    }
}

fn init_tracing(cli: &Cli) -> EyreResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    // The terminal interface owns stdout and stderr
    let _ = match (&cli.log_file, cli.headless) {
        (Some(path), _) => {
            let file = File::create(path)
                .wrap_err_with(|| format!("failed to create log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        (None, Some(_)) => builder.with_writer(std::io::stderr).try_init(),
        (None, None) => builder.with_writer(std::io::sink).try_init(),
    };
    Ok(())
}
