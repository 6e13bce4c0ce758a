//! dvbscan library - DVB/ATSC transponder and channel discovery
//!
//! A scan walks a frequency plan (or a satellite transponder table), tunes
//! every candidate that is not known yet through a [`Tuner`], reads the
//! PAT, PMT, NIT and SDT of each locked transponder and follows the
//! transponders announced in network information tables. The resolved
//! channels are merged into a [`ChannelStore`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use dvbscan::{MemoryStore, ReplayTuner, ScanRequest, Scanner, Setup};
//!
//! let tuner = Arc::new(ReplayTuner::open("recordings").unwrap());
//! let scanner = Scanner::new(vec![tuner], Setup::default());
//! let mut store = MemoryStore::new();
//! let report = scanner.run(&ScanRequest::terrestrial("DE"), &mut store).unwrap();
//! for channel in &report.channels {
//!     println!("{}", channel.to_vdr_line());
//! }
//! ```

pub mod context;
#[cfg(feature = "database")]
pub mod database;
pub mod decoder;
pub mod plan;
pub mod scanner;
pub mod session;
pub mod statemachine;
pub mod store;
pub mod transponder;
pub mod ts_analyzer;
pub mod tuner;

// Re-export commonly used types
pub use context::Setup;
pub use dvbscan_protocol::{Channel, ScanError, ScanFlags, ScanType, Source, StatusCode};
pub use scanner::{ScanHandle, ScanReport, ScanRequest, Scanner};
pub use session::{Progress, ScanEvent, ScanSession};
pub use statemachine::{State, StateMachine, Timing};
pub use store::{ChannelStore, MemoryStore, MergePolicy, MergeResult};
pub use tuner::{Capabilities, MockTuner, ReplayTuner, Tuner, TunerError};
