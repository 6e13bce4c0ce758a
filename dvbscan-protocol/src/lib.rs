//! Shared record types for the dvbscan channel discovery engine.
//!
//! This crate defines the transponder/channel record that flows between the
//! frequency plan generator, the table decoders, the scan state machine and
//! the channel store, together with the error taxonomy of a scan run.
//!
//! # Unset parameters
//!
//! Tuning parameters that carry no meaning for a delivery system, or that are
//! left to hardware auto-detection, hold the sentinel [`UNSET`] (999). Printing
//! and comparison treat the sentinel as "don't care".
//!
//! ```rust
//! use dvbscan_protocol::{Channel, Source, UNSET};
//!
//! let mut tp = Channel::new(Source::Terrestrial);
//! tp.frequency = 474_000_000;
//! tp.modulation = UNSET;
//! tp.bandwidth = 8;
//! assert_eq!(tp.params(), "B8S0");
//! assert_eq!(tp.print_transponder(), "T    474.00 MHz");
//! ```

pub mod channel;
pub mod error;
pub mod types;

pub use channel::{normalize_khz, Channel};
pub use error::{ScanError, StatusCode};
pub use types::{
    Cell, Lnb, Pid, Polarization, ScanFlags, ScanType, Source, Transposer, UNSET,
};
