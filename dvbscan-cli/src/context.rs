use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[clap(name = "dvbscan")]
#[clap(about = "dvbscan discovers DVB-T/T2, DVB-C, DVB-S/S2 and ATSC transponders and services.", long_about = None)]
#[clap(version)]
pub(crate) struct Cli {
    /// Configuration file.{n}
    /// `dvbscan.toml` in the working directory is read if present.
    #[clap(short = 'f', long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging.
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Directory where log files are stored.
    #[clap(long, global = true)]
    pub log_dir: Option<PathBuf>,

    /// Number of days to keep log files.
    #[clap(long, global = true)]
    pub log_retention_days: Option<u64>,

    #[clap(subcommand)]
    pub command: Commands,
}

/// Output format of the channel list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum OutputFormat {
    /// VDR channels.conf lines
    #[default]
    Vdr,
    /// JSON array of channel records
    Json,
}

/// Network type to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ScanKind {
    /// DVB-T/T2 by country frequency plan
    Terrestrial,
    /// DVB-C by country frequency plan
    Cable,
    /// DVB-S/S2 by satellite transponder table
    Satellite,
    /// ATSC VSB and/or US cable QAM
    Atsc,
    /// A single transponder given on the command line
    Transponder,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Run a scan.{n}
    /// Candidates come from the country frequency plan, the satellite
    /// transponder table or a single transponder. Transport streams announced
    /// in network information tables are followed unless `--no-nit` is given.
    Scan(ScanArgs),
    /// Print the known countries.
    #[clap(name = "list-countries")]
    ListCountries,
    /// Print the built-in satellite table.
    #[clap(name = "list-satellites")]
    ListSatellites,
}

#[derive(Debug, Default, Args)]
pub(crate) struct ScanArgs {
    /// Network type.
    #[clap(value_enum, short = 't', long = "type")]
    pub scan_type: Option<ScanKind>,

    /// ISO 3166 alpha-2 country code, e.g. `DE`.
    #[clap(short, long)]
    pub country: Option<String>,

    /// Satellite short name, e.g. `S19E2`.
    #[clap(short, long)]
    pub satellite: Option<String>,

    /// Directory of recorded transport streams served as the tuner.{n}
    /// Files are named `<tag><frequency>.ts`, e.g. `T474000000.ts`.
    #[clap(short = 'r', long, value_name = "DIR")]
    pub replay_dir: Option<PathBuf>,

    /// Write the channel list to this file instead of stdout.
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Channel list format.
    #[clap(value_enum, long)]
    pub format: Option<OutputFormat>,

    /// Merge the result into this SQLite channel database.
    #[clap(short, long)]
    pub database: Option<PathBuf>,

    /// Do not follow network information tables.
    #[clap(long)]
    pub no_nit: bool,

    /// Transponder frequency, in Hz, kHz or MHz.
    #[clap(long)]
    pub frequency: Option<u32>,

    /// Modulation code as printed in channels.conf (e.g. 64 for QAM64, 999 for auto).
    #[clap(long)]
    pub modulation: Option<i32>,

    /// Symbol rate in kSym/s.
    #[clap(long)]
    pub symbolrate: Option<u32>,

    /// Satellite polarization: H, V, L or R.
    #[clap(long)]
    pub polarization: Option<char>,

    /// Channel bandwidth in MHz.
    #[clap(long)]
    pub bandwidth: Option<i32>,

    /// Delivery system generation: 0 first, 1 second.
    #[clap(long)]
    pub system: Option<i32>,

    /// Source of a transponder scan: T, C, A or an orbital position like S19.2E.
    #[clap(long)]
    pub source: Option<String>,
}
