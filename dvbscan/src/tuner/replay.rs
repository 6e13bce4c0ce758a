//! Tuner that replays recorded transport streams.
//!
//! Each transponder is a file `<tag><frequency>[polarization].ts` in one
//! directory, e.g. `T474000000.ts`, `C346000.ts` or `S11494H.ts`. Switching
//! to a transponder demultiplexes the PSI/SI sections of the matching file;
//! filters then serve them round-robin.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use dvbscan_protocol::{Channel, Polarization, Source};

use super::{Capabilities, FilterHandle, SectionCarousel, Tuner, TunerError};
use crate::plan::Tolerances;
use crate::transponder::{max_delta, nearly_same_frequency};
use crate::ts_analyzer::{SectionCollector, TsPacketIterator};

/// A recording found in the replay directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    pub tag: char,
    pub frequency: u32,
    pub polarization: Option<Polarization>,
    pub path: PathBuf,
}

impl Recording {
    /// Parse `<tag><frequency>[pol].ts`.
    pub fn from_path(path: &Path) -> Option<Self> {
        if path.extension()? != "ts" {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let mut chars = stem.chars();
        let tag = chars.next()?;
        if !matches!(tag, 'T' | 'C' | 'S' | 'A') {
            return None;
        }
        let rest = chars.as_str();
        let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let frequency = rest[..digits_end].parse().ok()?;
        let polarization = match &rest[digits_end..] {
            "" => None,
            p => Some(Polarization::from_char(p.chars().next()?)?),
        };
        Some(Self {
            tag,
            frequency,
            polarization,
            path: path.to_path_buf(),
        })
    }

    fn matches(&self, channel: &Channel, tol: &Tolerances) -> bool {
        if self.tag != channel.source.tag() {
            return false;
        }
        if self.polarization.is_some() && channel.polarization.is_some() && self.polarization != channel.polarization {
            return false;
        }
        nearly_same_frequency(self.frequency, channel.frequency, max_delta(&channel.source, tol))
    }
}

/// Demultiplex every PSI/SI section of a transport stream, per PID.
///
/// Identical sections are kept once, in order of first appearance.
pub fn demux_sections(data: &[u8]) -> HashMap<u16, Vec<Vec<u8>>> {
    let mut collectors: HashMap<u16, SectionCollector> = HashMap::new();
    let mut sections: HashMap<u16, Vec<Vec<u8>>> = HashMap::new();

    for packet in TsPacketIterator::new(data) {
        if !packet.carries_psi() {
            continue;
        }
        let pid = packet.header.pid;
        let collector = collectors.entry(pid).or_default();
        for section in collector.push(
            packet.payload,
            packet.header.continuity_counter,
            packet.header.payload_unit_start,
        ) {
            let list = sections.entry(pid).or_default();
            if !list.contains(&section) {
                list.push(section);
            }
        }
    }
    sections
}

#[derive(Default)]
struct State {
    current: Option<usize>,
    sections: HashMap<u16, Vec<Vec<u8>>>,
    filters: HashMap<u32, SectionCarousel>,
}

/// Tuner backed by a directory of recordings.
pub struct ReplayTuner {
    dir: PathBuf,
    recordings: Vec<Recording>,
    tolerances: Tolerances,
    state: Mutex<State>,
    next_handle: AtomicU32,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl ReplayTuner {
    /// Index the recordings in `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, TunerError> {
        let dir = dir.as_ref().to_path_buf();
        let mut recordings = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            match Recording::from_path(&path) {
                Some(r) => recordings.push(r),
                None => log::trace!("ReplayTuner: ignoring {}", path.display()),
            }
        }
        recordings.sort_by(|a, b| (a.tag, a.frequency).cmp(&(b.tag, b.frequency)));
        log::info!("ReplayTuner: {} recordings in {}", recordings.len(), dir.display());

        Ok(Self {
            dir,
            recordings,
            tolerances: Tolerances::default(),
            state: Mutex::new(State::default()),
            next_handle: AtomicU32::new(1),
        })
    }

    pub fn with_tolerances(mut self, tolerances: Tolerances) -> Self {
        self.tolerances = tolerances;
        self
    }

    pub fn recordings(&self) -> &[Recording] {
        &self.recordings
    }
}

impl Tuner for ReplayTuner {
    fn name(&self) -> String {
        format!("replay:{}", self.dir.display())
    }

    fn provides(&self, channel: &Channel) -> bool {
        self.recordings.iter().any(|r| r.tag == channel.source.tag())
    }

    fn capabilities(&self, _source: &Source) -> Capabilities {
        Capabilities::all()
    }

    fn switch(&self, channel: &Channel) -> Result<(), TunerError> {
        let found = self
            .recordings
            .iter()
            .position(|r| r.matches(channel, &self.tolerances));

        let sections = match found {
            Some(i) => {
                let data = fs::read(&self.recordings[i].path)?;
                demux_sections(&data)
            }
            None => HashMap::new(),
        };
        log::debug!(
            "ReplayTuner: {} -> {}",
            channel.print_transponder(),
            found
                .map(|i| self.recordings[i].path.display().to_string())
                .unwrap_or_else(|| "no recording".to_string())
        );

        let mut state = lock(&self.state);
        state.current = found;
        state.sections = sections;
        state.filters.clear();
        Ok(())
    }

    fn has_signal(&self) -> bool {
        lock(&self.state).current.is_some()
    }

    fn has_lock(&self, _timeout: Duration) -> bool {
        lock(&self.state).current.is_some()
    }

    fn signal_strength(&self) -> u8 {
        if lock(&self.state).current.is_some() {
            100
        } else {
            0
        }
    }

    fn open_filter(&self, pid: u16, table_id: u8, mask: u8) -> Result<FilterHandle, TunerError> {
        let mut state = lock(&self.state);
        if state.current.is_none() {
            return Err(TunerError::NotTuned);
        }
        let carousel = match state.sections.get(&pid) {
            Some(sections) => SectionCarousel::new(sections, table_id, mask),
            None => SectionCarousel::default(),
        };
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst);
        state.filters.insert(handle, carousel);
        Ok(FilterHandle(handle))
    }

    fn read_filter(&self, handle: FilterHandle, buf: &mut [u8]) -> Result<usize, TunerError> {
        let mut state = lock(&self.state);
        let carousel = state
            .filters
            .get_mut(&handle.0)
            .ok_or(TunerError::InvalidFilter(handle.0))?;
        Ok(carousel.read(buf))
    }

    fn close_filter(&self, handle: FilterHandle) {
        lock(&self.state).filters.remove(&handle.0);
    }

    fn attach_receiver(&self) {}

    fn detach_all_receivers(&self) {
        let mut state = lock(&self.state);
        state.filters.clear();
    }
}
