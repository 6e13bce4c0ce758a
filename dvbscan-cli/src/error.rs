use std::path::PathBuf;

use dvbscan::database::DatabaseError;
use dvbscan::ScanError;
use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error("Failed to read config file {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    ParseConfig {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

impl CliError {
    /// Process exit status. Configuration problems are 2, everything else 1.
    pub(crate) fn exit_code(&self) -> u8 {
        match self {
            CliError::ReadConfig { .. }
            | CliError::ParseConfig { .. }
            | CliError::InvalidArgument(_)
            | CliError::Scan(
                ScanError::UnknownCountry(_)
                | ScanError::UnknownSatellite(_)
                | ScanError::UnknownChannelList(_)
                | ScanError::UnsupportedScanType(_),
            ) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::InvalidArgument("x".into()).exit_code(), 2);
        assert_eq!(CliError::from(ScanError::UnknownCountry("XX".into())).exit_code(), 2);
        assert_eq!(CliError::from(ScanError::NoDevice("DVB-C".into())).exit_code(), 1);
    }
}
