//! dvbscan: transponder and channel discovery from the command line.
//!
//! Scans run on the library's own worker thread; the async runtime only
//! drives the progress display and listens for Ctrl-C, which requests a
//! cooperative stop.

use std::io;
use std::process::ExitCode;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};

use dvbscan::database::Database;
use dvbscan::plan::{COUNTRIES, SATELLITES};
use dvbscan::{
    ChannelStore, MemoryStore, ReplayTuner, ScanError, ScanEvent, ScanReport, ScanRequest,
    Scanner, Tuner,
};

mod config;
mod context;
mod error;
mod logging;
mod output;

use config::{ConfigFile, LogSettings, ScanSettings};
use context::{Cli, Commands};
use error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("dvbscan: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let file_config = match config::config_path(cli.config.as_deref()) {
        Some(path) => {
            let c = config::load_config(&path)?;
            eprintln!("Loaded config from: {}", path.display());
            c
        }
        None => ConfigFile::default(),
    };

    match &cli.command {
        Commands::ListCountries => Ok(output::write_countries(io::stdout().lock(), COUNTRIES)?),
        Commands::ListSatellites => Ok(output::write_satellites(io::stdout().lock(), SATELLITES)?),
        Commands::Scan(args) => {
            let log_settings = LogSettings::resolve(&cli, &file_config.logging);
            let _guard = logging::init_logging(&log_settings)?;
            let settings = ScanSettings::resolve(args, file_config)?;
            scan(settings).await
        }
    }
}

async fn scan(settings: ScanSettings) -> Result<(), CliError> {
    info!("dvbscan {} starting", env!("CARGO_PKG_VERSION"));
    info!("  Scan type: {}", settings.request.scan_type.display_name());
    if !settings.request.country.is_empty() {
        info!("  Country: {}", settings.request.country);
    }
    if !settings.request.satellite.is_empty() {
        info!("  Satellite: {}", settings.request.satellite);
    }
    info!("  Network information: {}", if settings.setup.use_nit { "followed" } else { "ignored" });

    let devices = open_devices(&settings)?;
    let scanner = Scanner::new(devices, settings.setup.clone());

    let report = match &settings.database {
        Some(path) => {
            info!("Opening database: {:?}", path);
            let db = Database::open(path)?;
            run_scan(scanner, settings.request.clone(), db).await?
        }
        None => run_scan(scanner, settings.request.clone(), MemoryStore::new()).await?,
    };

    if report.stopped {
        warn!("Scan stopped early, the channel list may be incomplete");
    }
    info!(
        "Found {} channels on {} transponders",
        report.channels.len(),
        report.scanned_transponders
    );
    if let Some(merge) = report.merge {
        info!("Channel store: {}", merge);
    }

    if settings.database.is_none() || settings.output.is_some() {
        output::save_channels(settings.output.as_deref(), &report.channels, settings.format)?;
        if let Some(path) = &settings.output {
            info!("Channel list written to {:?}", path);
        }
    }
    Ok(())
}

fn open_devices(settings: &ScanSettings) -> Result<Vec<Arc<dyn Tuner>>, CliError> {
    let Some(dir) = &settings.replay_dir else {
        warn!("No replay directory configured, no tuner available");
        return Ok(Vec::new());
    };
    let tuner = ReplayTuner::open(dir)
        .map_err(|e| ScanError::Tuner(format!("{:?}: {}", dir, e)))?
        .with_tolerances(settings.setup.tolerances);
    info!("  Replay directory: {:?} ({} recordings)", dir, tuner.recordings().len());
    Ok(vec![Arc::new(tuner) as Arc<dyn Tuner>])
}

async fn run_scan<S>(scanner: Scanner, request: ScanRequest, store: S) -> Result<ScanReport, CliError>
where
    S: ChannelStore + Send + 'static,
{
    let events = scanner.session().subscribe();
    let handle = scanner.spawn(request, store)?;
    let progress = progress_bar();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;
    let mut ticker = tokio::time::interval(Duration::from_millis(100));

    loop {
        tokio::select! {
            result = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                match result {
                    Ok(()) => {
                        progress.suspend(|| warn!("Interrupted, stopping scan..."));
                        handle.stop();
                    }
                    Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
                }
            }
            _ = ticker.tick() => {
                show_events(&events, &progress);
                if handle.is_finished() {
                    break;
                }
            }
        }
    }
    show_events(&events, &progress);
    progress.finish_and_clear();

    // the thread has already ended, join returns at once
    let (result, _store) = handle.join();
    Ok(result?)
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(100);
    match ProgressStyle::with_template("{spinner} [{elapsed_precise}] [{bar:40}] {pos:>3}% {msg}") {
        Ok(style) => pb.set_style(style.progress_chars("=> ")),
        Err(e) => debug!("Progress template rejected: {}", e),
    }
    pb.enable_steady_tick(Duration::from_millis(200));
    pb
}

fn show_events(events: &Receiver<ScanEvent>, pb: &ProgressBar) {
    while let Ok(event) = events.try_recv() {
        match event {
            ScanEvent::Status(status) => debug!("Status: {:?}", status),
            ScanEvent::Device(name) => pb.suspend(|| info!("Using device {}", name)),
            ScanEvent::Transponder(printed) => pb.set_message(printed),
            ScanEvent::Signal { strength, lock } => {
                debug!("Signal {}%{}", strength, if lock { ", locked" } else { "" })
            }
            ScanEvent::Channel(channel) => pb.suspend(|| info!("  {}", channel.to_vdr_line())),
            ScanEvent::Progress(p) => {
                pb.set_position(p.percent.round() as u64);
                pb.set_message(format!("{} ({} channels)", p.transponder, p.channels));
            }
        }
    }
}
