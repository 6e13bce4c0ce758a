//! Configuration file and its merge with the command line.
//!
//! Command-line flags take precedence over the file, the file over built-in
//! defaults.

use std::path::{Path, PathBuf};

use dvbscan::plan::{find_country, find_satellite};
use dvbscan::{Channel, ScanRequest, Setup, Source};
use dvbscan_protocol::{normalize_khz, Polarization, UNSET};
use serde::Deserialize;

use crate::context::{Cli, OutputFormat, ScanArgs, ScanKind};
use crate::error::CliError;

pub(crate) const DEFAULT_CONFIG_PATH: &str = "dvbscan.toml";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_RETENTION_DAYS: u64 = 7;
/// VDR modulation code of 8VSB.
const MODULATION_VSB8: i32 = 10;

/// Configuration file format.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(crate) struct ConfigFile {
    pub scan: ScanSection,
    pub setup: Setup,
    pub tuner: TunerSection,
    pub output: OutputSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct ScanSection {
    #[serde(rename = "type")]
    pub scan_type: Option<ScanKind>,
    pub country: Option<String>,
    pub satellite: Option<String>,
    pub use_nit: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct TunerSection {
    pub replay_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct OutputSection {
    pub path: Option<PathBuf>,
    pub format: Option<OutputFormat>,
    pub database: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
pub(crate) struct LoggingSection {
    pub log_dir: Option<PathBuf>,
    pub retention_days: Option<u64>,
    pub level: Option<String>,
}

pub(crate) fn load_config(path: &Path) -> Result<ConfigFile, CliError> {
    let contents = std::fs::read_to_string(path).map_err(|source| CliError::ReadConfig {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| CliError::ParseConfig {
        path: path.to_path_buf(),
        source,
    })
}

/// Explicit path, else `dvbscan.toml` if it exists.
pub(crate) fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    explicit.map(Path::to_path_buf).or_else(|| {
        let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
        default_path.exists().then_some(default_path)
    })
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LogSettings {
    pub log_dir: PathBuf,
    pub retention_days: u64,
    pub verbose: bool,
    pub level: Option<String>,
}

impl LogSettings {
    pub(crate) fn resolve(cli: &Cli, file: &LoggingSection) -> Self {
        Self {
            log_dir: cli
                .log_dir
                .clone()
                .or_else(|| file.log_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            retention_days: cli
                .log_retention_days
                .or(file.retention_days)
                .unwrap_or(DEFAULT_RETENTION_DAYS),
            verbose: cli.verbose,
            level: file.level.clone(),
        }
    }
}

/// Everything a scan run needs, after merging.
#[derive(Debug, Clone)]
pub(crate) struct ScanSettings {
    pub request: ScanRequest,
    pub setup: Setup,
    pub replay_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub format: OutputFormat,
    pub database: Option<PathBuf>,
}

impl ScanSettings {
    pub(crate) fn resolve(args: &ScanArgs, file: ConfigFile) -> Result<Self, CliError> {
        let ConfigFile {
            scan,
            mut setup,
            tuner,
            output,
            ..
        } = file;

        let kind = args.scan_type.or(scan.scan_type).ok_or_else(|| {
            CliError::InvalidArgument("No scan type given, use --type or [scan] type".to_string())
        })?;
        let country = args
            .country
            .clone()
            .or(scan.country)
            .map(|c| c.to_ascii_uppercase());
        let satellite = args.satellite.clone().or(scan.satellite);
        let use_nit = !args.no_nit && scan.use_nit.unwrap_or(setup.use_nit);
        setup.use_nit = use_nit;

        if setup.country_alpha3.is_empty() {
            if let Some(c) = country.as_deref().and_then(find_country) {
                setup.country_alpha3 = c.alpha3.to_string();
            }
        }

        let require_country = || {
            country.clone().ok_or_else(|| {
                CliError::InvalidArgument("This scan type needs --country".to_string())
            })
        };
        let request = match kind {
            ScanKind::Terrestrial => ScanRequest::terrestrial(&require_country()?),
            ScanKind::Cable => ScanRequest::cable(&require_country()?),
            ScanKind::Atsc => ScanRequest::atsc(&require_country()?),
            ScanKind::Satellite => {
                let satellite = satellite.ok_or_else(|| {
                    CliError::InvalidArgument("Satellite scan needs --satellite".to_string())
                })?;
                ScanRequest::satellite(&satellite)
            }
            ScanKind::Transponder => {
                ScanRequest::transponder(transponder(args, satellite.as_deref())?, use_nit)
            }
        };

        Ok(Self {
            request,
            setup,
            replay_dir: args.replay_dir.clone().or(tuner.replay_dir),
            output: args.output.clone().or(output.path),
            format: args.format.or(output.format).unwrap_or_default(),
            database: args.database.clone().or(output.database),
        })
    }
}

/// The single transponder of a `--type transponder` run.
fn transponder(args: &ScanArgs, satellite: Option<&str>) -> Result<Channel, CliError> {
    let source = match (&args.source, satellite) {
        (Some(s), _) => s.parse::<Source>().map_err(CliError::InvalidArgument)?,
        (None, Some(sat)) => find_satellite(sat)?.source(),
        (None, None) => {
            return Err(CliError::InvalidArgument(
                "Transponder scan needs --source or --satellite".to_string(),
            ))
        }
    };
    let frequency = args.frequency.ok_or_else(|| {
        CliError::InvalidArgument("Transponder scan needs --frequency".to_string())
    })?;

    let mut tp = Channel::new(source);
    let khz = normalize_khz(frequency);
    tp.frequency = match source {
        Source::Terrestrial => khz * 1000,
        // MHz for satellites
        _ => khz,
    };
    if let Some(system) = args.system {
        tp.delsys = system;
    }
    if let Some(bandwidth) = args.bandwidth {
        tp.bandwidth = bandwidth;
    }

    match source {
        Source::Terrestrial => {
            tp.modulation = args.modulation.unwrap_or(UNSET);
        }
        Source::Atsc => {
            tp.modulation = args.modulation.unwrap_or(MODULATION_VSB8);
        }
        Source::Cable => {
            tp.modulation = args.modulation.unwrap_or(UNSET);
            tp.symbol_rate = args.symbolrate.ok_or_else(|| {
                CliError::InvalidArgument("Cable transponder needs --symbolrate".to_string())
            })?;
        }
        Source::Satellite { .. } => {
            if let Some(modulation) = args.modulation {
                tp.modulation = modulation;
            }
            tp.symbol_rate = args.symbolrate.ok_or_else(|| {
                CliError::InvalidArgument("Satellite transponder needs --symbolrate".to_string())
            })?;
            let pol = args.polarization.ok_or_else(|| {
                CliError::InvalidArgument("Satellite transponder needs --polarization".to_string())
            })?;
            tp.polarization = Some(Polarization::from_char(pol).ok_or_else(|| {
                CliError::InvalidArgument(format!("Invalid polarization '{}'", pol))
            })?);
        }
    }
    Ok(tp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvbscan::{ScanError, ScanType};

    fn parse(toml: &str) -> ConfigFile {
        toml::from_str(toml).unwrap()
    }

    #[test]
    fn test_parse_config_file() {
        let file = parse(
            r#"
            [scan]
            type = "cable"
            country = "de"
            use_nit = false

            [setup]
            dvbc_symbolrate = 16
            update_existing = true

            [setup.tolerances]
            terrestrial_khz = 300

            [tuner]
            replay_dir = "/srv/ts"

            [output]
            format = "json"

            [logging]
            retention_days = 3
            "#,
        );
        assert_eq!(file.scan.scan_type, Some(ScanKind::Cable));
        assert_eq!(file.setup.dvbc_symbolrate, 16);
        assert!(file.setup.update_existing);
        // untouched knobs keep their default
        assert_eq!(file.setup.lnb_slof, 11700);
        assert_eq!(file.setup.tolerances.terrestrial_khz, 300);
        assert_eq!(file.setup.tolerances.satellite_mhz, 2);
        assert_eq!(file.output.format, Some(OutputFormat::Json));
        assert_eq!(file.logging.retention_days, Some(3));
    }

    #[test]
    fn test_command_line_overrides_file() {
        let file = parse(
            r#"
            [scan]
            type = "cable"
            country = "DE"

            [output]
            format = "json"
            path = "from-file.conf"
            "#,
        );
        let args = ScanArgs {
            scan_type: Some(ScanKind::Terrestrial),
            country: Some("fi".to_string()),
            format: Some(OutputFormat::Vdr),
            ..ScanArgs::default()
        };
        let settings = ScanSettings::resolve(&args, file).unwrap();
        assert_eq!(settings.request.scan_type, ScanType::Terrestrial);
        assert_eq!(settings.request.country, "FI");
        assert_eq!(settings.setup.country_alpha3, "FIN");
        assert_eq!(settings.format, OutputFormat::Vdr);
        assert_eq!(settings.output, Some(PathBuf::from("from-file.conf")));
        assert!(settings.setup.use_nit);
    }

    #[test]
    fn test_missing_scan_type() {
        let err = ScanSettings::resolve(&ScanArgs::default(), ConfigFile::default()).unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }

    #[test]
    fn test_country_required() {
        let args = ScanArgs {
            scan_type: Some(ScanKind::Atsc),
            ..ScanArgs::default()
        };
        assert!(ScanSettings::resolve(&args, ConfigFile::default()).is_err());
    }

    #[test]
    fn test_no_nit_flag() {
        let args = ScanArgs {
            scan_type: Some(ScanKind::Satellite),
            satellite: Some("S19E2".to_string()),
            no_nit: true,
            ..ScanArgs::default()
        };
        let settings = ScanSettings::resolve(&args, ConfigFile::default()).unwrap();
        assert!(!settings.setup.use_nit);
        assert_eq!(settings.request.satellite, "S19E2");
    }

    #[test]
    fn test_satellite_transponder() {
        let args = ScanArgs {
            scan_type: Some(ScanKind::Transponder),
            satellite: Some("S19E2".to_string()),
            frequency: Some(11_494_000),
            symbolrate: Some(22000),
            polarization: Some('h'),
            system: Some(1),
            ..ScanArgs::default()
        };
        let settings = ScanSettings::resolve(&args, ConfigFile::default()).unwrap();
        let tp = settings.request.transponder.unwrap();
        assert_eq!(tp.source, Source::Satellite { position: 192, west: false });
        assert_eq!(tp.frequency, 11494);
        assert_eq!(tp.symbol_rate, 22000);
        assert_eq!(tp.polarization, Some(Polarization::Horizontal));
        assert_eq!(tp.delsys, 1);
        assert_eq!(settings.request.use_nit, Some(true));
    }

    #[test]
    fn test_terrestrial_transponder_in_hz() {
        let args = ScanArgs {
            scan_type: Some(ScanKind::Transponder),
            source: Some("T".to_string()),
            frequency: Some(474),
            bandwidth: Some(7),
            ..ScanArgs::default()
        };
        let settings = ScanSettings::resolve(&args, ConfigFile::default()).unwrap();
        let tp = settings.request.transponder.unwrap();
        assert_eq!(tp.frequency, 474_000_000);
        assert_eq!(tp.bandwidth, 7);
        assert_eq!(tp.modulation, UNSET);
    }

    #[test]
    fn test_transponder_errors() {
        let missing_pol = ScanArgs {
            scan_type: Some(ScanKind::Transponder),
            source: Some("S19.2E".to_string()),
            frequency: Some(11494),
            symbolrate: Some(22000),
            ..ScanArgs::default()
        };
        assert!(ScanSettings::resolve(&missing_pol, ConfigFile::default()).is_err());

        let unknown_sat = ScanArgs {
            scan_type: Some(ScanKind::Transponder),
            satellite: Some("S99E9".to_string()),
            frequency: Some(11494),
            ..ScanArgs::default()
        };
        assert!(matches!(
            ScanSettings::resolve(&unknown_sat, ConfigFile::default()),
            Err(CliError::Scan(ScanError::UnknownSatellite(_)))
        ));
    }

    #[test]
    fn test_log_settings() {
        let cli = Cli {
            config: None,
            verbose: true,
            log_dir: None,
            log_retention_days: Some(1),
            command: crate::context::Commands::ListCountries,
        };
        let file = LoggingSection {
            log_dir: Some(PathBuf::from("/var/log/dvbscan")),
            retention_days: Some(30),
            level: Some("warn".to_string()),
        };
        let settings = LogSettings::resolve(&cli, &file);
        assert_eq!(settings.log_dir, PathBuf::from("/var/log/dvbscan"));
        assert_eq!(settings.retention_days, 1);
        assert!(settings.verbose);
    }
}
