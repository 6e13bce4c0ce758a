//! Scripted tuner.
//!
//! A [`MockTuner`] holds a fixed set of transponders, each with the sections
//! that its filters deliver. Sections of one PID are served as a carousel,
//! so a table keeps repeating for as long as a filter stays open, the way a
//! real multiplex does.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use dvbscan_protocol::{Channel, Source};

use super::{Capabilities, FilterHandle, SectionCarousel, Tuner, TunerError};
use crate::transponder::nearly_same_frequency;

/// Frequency tolerance used to match a tuning request to a scripted transponder.
const MATCH_DELTA: u32 = 2;

/// One scripted transponder.
#[derive(Debug, Clone)]
pub struct MockTransponder {
    pub transponder: Channel,
    pub strength: u8,
    pub locks: bool,
    /// Complete sections per PID.
    pub sections: HashMap<u16, Vec<Vec<u8>>>,
    /// PIDs whose sections are sent once per filter rather than repeated.
    pub single_pass: HashSet<u16>,
}

impl MockTransponder {
    pub fn new(transponder: Channel) -> Self {
        Self {
            transponder,
            strength: 80,
            locks: true,
            sections: HashMap::new(),
            single_pass: HashSet::new(),
        }
    }

    pub fn without_lock(mut self) -> Self {
        self.locks = false;
        self
    }

    pub fn with_section(mut self, pid: u16, section: Vec<u8>) -> Self {
        self.sections.entry(pid).or_default().push(section);
        self
    }

    /// Like [`with_section`](Self::with_section), but the PID's sections are
    /// not repeated, so a table missing sections never completes.
    pub fn with_section_once(mut self, pid: u16, section: Vec<u8>) -> Self {
        self.single_pass.insert(pid);
        self.with_section(pid, section)
    }
}

#[derive(Default)]
struct State {
    current: Option<usize>,
    filters: HashMap<u32, SectionCarousel>,
    receivers: usize,
}

/// Tuner backed by [`MockTransponder`]s.
pub struct MockTuner {
    transponders: Vec<MockTransponder>,
    capabilities: Capabilities,
    sources: Vec<char>,
    state: Mutex<State>,
    next_handle: AtomicU32,
    open_filters: AtomicUsize,
    max_open_filters: AtomicUsize,
    switches: Mutex<Vec<Channel>>,
}

impl MockTuner {
    pub fn new(transponders: Vec<MockTransponder>) -> Self {
        Self {
            transponders,
            capabilities: Capabilities::all(),
            sources: vec!['T', 'C', 'S', 'A'],
            state: Mutex::new(State::default()),
            next_handle: AtomicU32::new(1),
            open_filters: AtomicUsize::new(0),
            max_open_filters: AtomicUsize::new(0),
            switches: Mutex::new(Vec::new()),
        }
    }

    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Restrict the delivery tags this device provides.
    pub fn with_sources(mut self, tags: &[char]) -> Self {
        self.sources = tags.to_vec();
        self
    }

    /// Highest number of filters that were open at the same time.
    pub fn max_open_filters(&self) -> usize {
        self.max_open_filters.load(Ordering::SeqCst)
    }

    pub fn open_filters(&self) -> usize {
        self.open_filters.load(Ordering::SeqCst)
    }

    /// Every transponder passed to [`Tuner::switch`], in order.
    pub fn switches(&self) -> Vec<Channel> {
        lock(&self.switches).clone()
    }

    pub fn receivers(&self) -> usize {
        lock(&self.state).receivers
    }

    fn current(&self) -> Option<&MockTransponder> {
        lock(&self.state).current.map(|i| &self.transponders[i])
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl Tuner for MockTuner {
    fn name(&self) -> String {
        "mock".to_string()
    }

    fn provides(&self, channel: &Channel) -> bool {
        if !self.sources.contains(&channel.source.tag()) {
            return false;
        }
        !channel.is_second_generation() || self.capabilities.second_generation
    }

    fn capabilities(&self, _source: &Source) -> Capabilities {
        self.capabilities
    }

    fn switch(&self, channel: &Channel) -> Result<(), TunerError> {
        lock(&self.switches).push(channel.clone());

        let found = self.transponders.iter().position(|t| {
            t.transponder.source.tag() == channel.source.tag()
                && nearly_same_frequency(t.transponder.frequency, channel.frequency, MATCH_DELTA)
                && (channel.source != Source::Terrestrial || t.transponder.delsys == channel.delsys)
        });

        let mut state = lock(&self.state);
        state.current = found;
        state.filters.clear();
        self.open_filters.store(0, Ordering::SeqCst);
        Ok(())
    }

    fn has_signal(&self) -> bool {
        self.current().is_some()
    }

    fn has_lock(&self, _timeout: Duration) -> bool {
        self.current().is_some_and(|t| t.locks)
    }

    fn signal_strength(&self) -> u8 {
        self.current().map(|t| t.strength).unwrap_or(0)
    }

    fn open_filter(&self, pid: u16, table_id: u8, mask: u8) -> Result<FilterHandle, TunerError> {
        let mut state = lock(&self.state);
        let current = state.current.ok_or(TunerError::NotTuned)?;

        let transponder = &self.transponders[current];
        let carousel = match transponder.sections.get(&pid) {
            Some(sections) if transponder.single_pass.contains(&pid) => {
                SectionCarousel::new(sections, table_id, mask).once()
            }
            Some(sections) => SectionCarousel::new(sections, table_id, mask),
            None => SectionCarousel::default(),
        };

        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst);
        state.filters.insert(handle, carousel);

        let open = self.open_filters.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open_filters.fetch_max(open, Ordering::SeqCst);
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
        if lock(&self.state).filters.remove(&handle.0).is_some() {
            self.open_filters.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn attach_receiver(&self) {
        lock(&self.state).receivers += 1;
    }

    fn detach_all_receivers(&self) {
        lock(&self.state).receivers = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts_analyzer::{build_section, table_id};

    fn terrestrial(freq: u32) -> Channel {
        let mut c = Channel::new(Source::Terrestrial);
        c.frequency = freq;
        c
    }

    #[test]
    fn test_carousel_and_filter_count() {
        let pat = build_section(table_id::PAT, 1, 0, 0, 0, &[0x00, 0x01, 0xE1, 0x00]);
        let sdt = build_section(table_id::SDT_ACTUAL, 1, 0, 0, 0, &[0x00, 0x01, 0xFF]);
        let tuner = MockTuner::new(vec![MockTransponder::new(terrestrial(474_000_000))
            .with_section(0x00, pat.clone())
            .with_section(0x11, sdt)]);

        assert!(tuner.open_filter(0, 0, 0xFF).is_err());
        tuner.switch(&terrestrial(474_000_000)).unwrap();
        assert!(tuner.has_lock(Duration::from_millis(1)));
        assert_eq!(tuner.signal_strength(), 80);

        let f = tuner.open_filter(0x00, table_id::PAT, 0xFF).unwrap();
        let g = tuner.open_filter(0x11, table_id::PAT, 0xFF).unwrap();
        assert_eq!(tuner.max_open_filters(), 2);

        let mut buf = [0u8; 4096];
        for _ in 0..3 {
            let n = tuner.read_filter(f, &mut buf).unwrap();
            assert_eq!(&buf[..n], &pat[..]);
        }
        // table id filter rejects the SDT
        assert_eq!(tuner.read_filter(g, &mut buf).unwrap(), 0);

        tuner.close_filter(f);
        tuner.close_filter(g);
        assert_eq!(tuner.open_filters(), 0);
        assert!(tuner.read_filter(f, &mut buf).is_err());
    }

    #[test]
    fn test_unknown_frequency_has_no_lock() {
        let tuner = MockTuner::new(vec![MockTransponder::new(terrestrial(474_000_000))]);
        tuner.switch(&terrestrial(482_000_000)).unwrap();
        assert!(!tuner.has_lock(Duration::from_millis(1)));
        assert_eq!(tuner.switches().len(), 1);
    }
}
