//! Tuner/device collaborator.
//!
//! The discovery engine never talks to hardware directly. Everything it needs
//! from a frontend and its demultiplexer goes through [`Tuner`]: switching
//! transponders, lock and signal telemetry, and section filters that deliver
//! one complete PSI/SI section per read.

use std::time::Duration;

use dvbscan_protocol::{Channel, Source};
use thiserror::Error;

pub mod mock;
pub mod replay;

pub use mock::MockTuner;
pub use replay::ReplayTuner;

/// Tuner-related errors.
#[derive(Debug, Error)]
pub enum TunerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Tuner is not tuned to a transponder")]
    NotTuned,

    #[error("Invalid filter handle {0}")]
    InvalidFilter(u32),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Handle of an open section filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterHandle(pub u32);

/// Per delivery system capability flags of a frontend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub auto_fec: bool,
    pub auto_modulation: bool,
    pub auto_inversion: bool,
    pub auto_bandwidth: bool,
    pub auto_hierarchy: bool,
    pub auto_transmission: bool,
    pub auto_guard: bool,
    pub second_generation: bool,
    pub vsb: bool,
    pub qam: bool,
}

impl Capabilities {
    /// Everything left to the hardware.
    pub fn all() -> Self {
        Self {
            auto_fec: true,
            auto_modulation: true,
            auto_inversion: true,
            auto_bandwidth: true,
            auto_hierarchy: true,
            auto_transmission: true,
            auto_guard: true,
            second_generation: true,
            vsb: true,
            qam: true,
        }
    }
}

/// A frontend plus demultiplexer.
///
/// Methods take `&self` so that the table decoders can share one tuner
/// across their worker threads.
pub trait Tuner: Send + Sync {
    fn name(&self) -> String;

    /// Whether this device can receive `channel` at all.
    fn provides(&self, channel: &Channel) -> bool;

    fn capabilities(&self, source: &Source) -> Capabilities;

    /// Switch to the transponder parameters of `channel`.
    fn switch(&self, channel: &Channel) -> Result<(), TunerError>;

    fn has_signal(&self) -> bool;

    /// Wait up to `timeout` for a lock.
    fn has_lock(&self, timeout: Duration) -> bool;

    /// Signal strength, 0..=100.
    fn signal_strength(&self) -> u8;

    fn open_filter(&self, pid: u16, table_id: u8, mask: u8) -> Result<FilterHandle, TunerError>;

    /// Non-blocking read of at most one section into `buf`. Returns 0 when no
    /// section is pending.
    fn read_filter(&self, handle: FilterHandle, buf: &mut [u8]) -> Result<usize, TunerError>;

    fn close_filter(&self, handle: FilterHandle);

    /// Keep the device occupied while a transponder is scanned.
    fn attach_receiver(&self);

    fn detach_all_receivers(&self);
}

/// Whether `table_id` passes a (table id, mask) filter.
pub fn filter_matches(filter_table_id: u8, mask: u8, table_id: u8) -> bool {
    (table_id & mask) == (filter_table_id & mask)
}

/// Sections of one open filter, served round-robin.
#[derive(Debug, Default)]
pub struct SectionCarousel {
    sections: Vec<Vec<u8>>,
    next: usize,
    once: bool,
}

impl SectionCarousel {
    /// Keep those of `sections` whose table id passes the filter.
    pub fn new(sections: &[Vec<u8>], table_id: u8, mask: u8) -> Self {
        let sections = sections
            .iter()
            .filter(|s| s.first().is_some_and(|&tid| filter_matches(table_id, mask, tid)))
            .cloned()
            .collect();
        Self { sections, next: 0, once: false }
    }

    /// Stop after one pass instead of wrapping.
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Copy the next section into `buf`, 0 if the filter never matches.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        if self.sections.is_empty() || (self.once && self.next >= self.sections.len()) {
            return 0;
        }
        let section = &self.sections[self.next % self.sections.len()];
        self.next += 1;

        let n = section.len().min(buf.len());
        buf[..n].copy_from_slice(&section[..n]);
        n
    }
}
