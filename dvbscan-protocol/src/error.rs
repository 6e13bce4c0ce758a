//! Error types for a discovery run.

use thiserror::Error;

/// Configuration-fatal errors. Any of these aborts a scan run before a single
/// transponder is tuned; per-transponder problems never surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// The frequency plan id is not one of the known channel lists.
    #[error("Undefined channel list: {0}")]
    UnknownChannelList(i32),

    /// Country code without a frequency plan.
    #[error("Country identifier '{0}' not defined")]
    UnknownCountry(String),

    /// Satellite short name not found in the satellite table.
    #[error("Satellite '{0}' not defined")]
    UnknownSatellite(String),

    /// Channel bandwidth unusable for symbol rate estimation.
    #[error("Unknown channel bandwidth: {0} Hz")]
    InvalidBandwidth(u32),

    /// No tuner provides the requested delivery system.
    #[error("No device available for {0}")]
    NoDevice(String),

    /// Scan type is not implemented for the selected source.
    #[error("Unsupported scan type: {0}")]
    UnsupportedScanType(i32),

    /// Tuner collaborator failed in a way that prevents any scanning.
    #[error("Tuner error: {0}")]
    Tuner(String),
}

/// Run status reported to the caller of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum StatusCode {
    /// No scan running (finished or never started).
    #[default]
    Idle = 0,
    /// Scan in progress.
    Running = 1,
    /// No usable tuner was found, the run was aborted.
    NoDevice = 2,
    /// Only a first generation tuner (DVB-T or DVB-S) was found.
    FallbackFirstGeneration = 3,
    /// The run aborted on another configuration-fatal error.
    Failed = 4,
}

impl From<u8> for StatusCode {
    fn from(value: u8) -> Self {
        match value {
            1 => StatusCode::Running,
            2 => StatusCode::NoDevice,
            3 => StatusCode::FallbackFirstGeneration,
            4 => StatusCode::Failed,
            _ => StatusCode::Idle,
        }
    }
}

impl From<StatusCode> for u8 {
    fn from(value: StatusCode) -> Self {
        value as u8
    }
}

impl From<&ScanError> for StatusCode {
    fn from(err: &ScanError) -> Self {
        match err {
            ScanError::NoDevice(_) => StatusCode::NoDevice,
            _ => StatusCode::Failed,
        }
    }
}

impl StatusCode {
    /// Returns true while a scan is still in progress.
    pub fn is_running(self) -> bool {
        matches!(self, StatusCode::Running | StatusCode::FallbackFirstGeneration)
    }
}
