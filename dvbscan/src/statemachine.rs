//! Per transponder scan sequence.
//!
//! ```text
//! Start ─► Tune ─lock─► ScanAssociation ─► ScanMap ─► ScanNetworkAndService ─► AddChannels
//!            │                 │ no services                                        │
//!            │ no lock         └──────────────► DetachReceiver ◄────────────────────┘
//!            ▼                                        │
//!      NextTransponder ◄──────────────────────────────┘
//!            │ queue empty / network expansion off
//!            ▼
//!          Stop
//! ```
//!
//! Transponders announced in network information tables are queued in the
//! session and tuned by the same machine until the queue is drained.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dvbscan_protocol::{Channel, Source, UNSET};

use crate::decoder::{
    lock, DecoderHandle, LcnEntry, NitContext, NitDecoder, PatData, PatDecoder, PmtData, PmtDecoder, PollPolicy,
    SdtDecoder, TICK,
};
use crate::session::ScanSession;
use crate::ts_analyzer::pid;
use crate::tuner::Tuner;

/// Upper bound of concurrently running PMT decoders.
pub const MAX_PMT_DECODERS: usize = 16;

/// NIT entries further away than this (tenths of a degree) are not queued.
const MAX_QUEUE_ORBITAL_DISTANCE: i32 = 5;

/// Cell frequency links at or below this frequency (Hz) use 7 MHz channels.
const VHF_LIMIT: u32 = 226_500_000;

/// Service types without audio or video.
const NON_AV_SERVICE_TYPES: &[u16] = &[0x03, 0x06, 0x08, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x10];

const TV_SERVICE_TYPES: &[u16] = &[
    0x01, 0x04, 0x05, 0x11, 0x16, 0x17, 0x18, 0x19, 0x1A, 0x1B, 0x1C, 0x1D, 0x1E, 0x1F,
];

const RADIO_SERVICE_TYPES: &[u16] = &[0x02, 0x07, 0x0A];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Start,
    Tune,
    ScanAssociation,
    ScanMap,
    ScanNetworkAndService,
    AddChannels,
    DetachReceiver,
    NextTransponder,
    Stop,
    Unknown,
}

impl State {
    pub const GET_TABLES: State = State::ScanNetworkAndService;
}

/// Poll budgets of the table decoders and the tick the machine waits on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub pat: PollPolicy,
    pub pmt: PollPolicy,
    pub nit: PollPolicy,
    pub sdt: PollPolicy,
    pub tick: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            pat: PollPolicy::PAT,
            pmt: PollPolicy::PMT,
            nit: PollPolicy::NIT,
            sdt: PollPolicy::SDT,
            tick: TICK,
        }
    }
}

impl Timing {
    /// Same poll counts on a different tick.
    pub fn with_tick(tick: Duration) -> Self {
        let d = Self::default();
        Self {
            pat: d.pat.with_tick(tick),
            pmt: d.pmt.with_tick(tick),
            nit: d.nit.with_tick(tick),
            sdt: d.sdt.with_tick(tick),
            tick,
        }
    }
}

pub struct StateMachine {
    tuner: Arc<dyn Tuner>,
    session: Arc<ScanSession>,
    initial: Channel,
    use_nit: bool,
    timing: Timing,
    transponder: Channel,
    pat: PatData,
    pmts: Vec<PmtData>,
    trace: Vec<State>,
}

impl StateMachine {
    pub fn new(tuner: Arc<dyn Tuner>, session: Arc<ScanSession>, initial: Channel, use_nit: bool) -> Self {
        Self {
            tuner,
            session,
            transponder: initial.clone(),
            initial,
            use_nit,
            timing: Timing::default(),
            pat: PatData::default(),
            pmts: Vec::new(),
            trace: Vec::new(),
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// States visited by [`run`](Self::run), in order.
    pub fn trace(&self) -> &[State] {
        &self.trace
    }

    /// Run until [`State::Stop`].
    pub fn run(&mut self) {
        let mut state = State::Start;
        loop {
            self.trace.push(state);
            if state == State::Stop {
                break;
            }
            let next = if self.session.is_stopped() {
                State::Stop
            } else {
                self.step(state)
            };
            if next != state {
                log::debug!("StateMachine: {:?} -> {:?}", state, next);
            }
            state = next;
        }
    }

    fn step(&mut self, state: State) -> State {
        match state {
            State::Start => self.start(),
            State::Tune => self.tune(),
            State::ScanAssociation => self.scan_association(),
            State::ScanMap => self.scan_map(),
            State::ScanNetworkAndService => self.scan_network_and_service(),
            State::AddChannels => self.add_channels(),
            State::DetachReceiver => self.detach_receiver(),
            State::NextTransponder => self.next_transponder(),
            State::Stop | State::Unknown => State::Stop,
        }
    }

    fn start(&mut self) -> State {
        self.transponder = self.initial.clone();
        if self.session.is_scanned(&self.transponder) {
            log::debug!("StateMachine: {} already scanned", self.transponder.print_transponder());
            return State::Stop;
        }
        State::Tune
    }

    fn tune(&mut self) -> State {
        let printed = self.transponder.print_transponder();
        log::debug!("StateMachine: tuning to {}", printed);
        self.session.set_transponder(&printed);
        self.session.set_signal(0, false);

        let has_lock = match self.tuner.switch(&self.transponder) {
            Ok(()) => {
                self.tuner.attach_receiver();
                thread::sleep(self.session.setup().signal_wait());
                self.tuner.has_lock(self.session.setup().lock_timeout())
            }
            Err(e) => {
                log::warn!("StateMachine: cannot tune {}: {}", printed, e);
                false
            }
        };

        let mut tp = self.transponder.transponder();
        tp.tested = true;
        tp.tunable = has_lock;
        self.session.scanned_transponders.add(tp);
        self.session.set_signal(self.tuner.signal_strength(), has_lock);

        if has_lock {
            log::info!("StateMachine: {}: lock", printed);
            State::ScanAssociation
        } else {
            log::info!("StateMachine: {}: no lock", printed);
            self.tuner.detach_all_receivers();
            State::NextTransponder
        }
    }

    fn next_transponder(&mut self) -> State {
        if !self.use_nit {
            return State::Stop;
        }
        let next = self.session.new_transponders.next_untested();
        self.session.report_progress();
        match next {
            Some(tp) => {
                self.transponder = tp;
                State::Tune
            }
            None => State::Stop,
        }
    }

    fn detach_receiver(&mut self) -> State {
        self.tuner.detach_all_receivers();
        if self.session.is_stopped() {
            State::Stop
        } else {
            State::NextTransponder
        }
    }

    /// Poll `handle` on the machine tick, forwarding a stop request, then join it.
    fn wait<T: Send + 'static>(&self, handle: DecoderHandle<T>) -> Option<T> {
        while handle.is_active() {
            if self.session.is_stopped() {
                handle.stop();
            }
            thread::sleep(self.timing.tick);
        }
        handle.join()
    }

    fn scan_association(&mut self) -> State {
        let handle = PatDecoder::spawn(self.tuner.clone(), self.timing.pat);
        self.pat = self.wait(handle).unwrap_or_default();

        if self.session.is_stopped() || self.pat.services.is_empty() {
            log::debug!("StateMachine: no services on {}", self.transponder.print_transponder());
            self.pat = PatData::default();
            self.pmts.clear();
            return State::DetachReceiver;
        }
        log::debug!("StateMachine: searching {} services", self.pat.services.len());
        State::ScanMap
    }

    fn scan_map(&mut self) -> State {
        let mut pending = self.pat.services.iter().enumerate().rev().collect::<Vec<_>>();
        let mut running: Vec<(usize, DecoderHandle<PmtData>)> = Vec::new();
        let mut done: Vec<(usize, PmtData)> = Vec::with_capacity(pending.len());

        loop {
            if self.session.is_stopped() {
                pending.clear();
                for (_, h) in &running {
                    h.stop();
                }
            }
            while running.len() < MAX_PMT_DECODERS {
                let Some((index, entry)) = pending.pop() else {
                    break;
                };
                let handle = PmtDecoder::spawn(self.tuner.clone(), entry.program_number, entry.pmt_pid, self.timing.pmt);
                running.push((index, handle));
            }

            let (finished, active): (Vec<_>, Vec<_>) = running.into_iter().partition(|(_, h)| !h.is_active());
            running = active;
            for (index, handle) in finished {
                if let Some(data) = handle.join() {
                    done.push((index, data));
                }
            }

            if running.is_empty() && pending.is_empty() {
                break;
            }
            thread::sleep(self.timing.tick);
        }

        done.sort_by_key(|(index, _)| *index);
        self.pmts = done.into_iter().map(|(_, data)| data).collect();

        if self.session.is_stopped() {
            State::DetachReceiver
        } else {
            State::GET_TABLES
        }
    }

    fn scan_network_and_service(&mut self) -> State {
        let setup = self.session.setup();
        let network_pid = if setup.network_pid != pid::NIT {
            setup.network_pid
        } else {
            self.pat.network_pid.unwrap_or(pid::NIT)
        };

        let sdt_data = self.session.sdt_data();
        lock(&sdt_data).original_network_id = 0;

        let context = NitContext {
            source: self.initial.source,
            parse_lcn: setup.parse_lcn,
            country_alpha3: setup.country_alpha3.clone(),
        };
        let nit = NitDecoder::spawn(
            self.tuner.clone(),
            network_pid,
            context,
            self.session.nit_data(),
            self.timing.nit,
        );
        let sdt = SdtDecoder::spawn(self.tuner.clone(), sdt_data, self.timing.sdt);

        while nit.is_active() || sdt.is_active() {
            if self.session.is_stopped() {
                nit.stop();
                sdt.stop();
            }
            thread::sleep(self.timing.tick);
        }
        let nit_outcome = nit.join();
        let sdt_outcome = sdt.join();
        log::debug!("StateMachine: NIT {:?}, SDT {:?}", nit_outcome, sdt_outcome);

        if self.session.is_stopped() {
            State::DetachReceiver
        } else {
            State::AddChannels
        }
    }

    fn add_channels(&mut self) -> State {
        let setup = self.session.setup().clone();
        let nit_data = self.session.nit_data();
        let sdt_data = self.session.sdt_data();
        let nit = lock(&nit_data).clone();
        let sdt = lock(&sdt_data).clone();

        let tp = &mut self.transponder;
        tp.tid = self.pat.transport_stream_id;
        if sdt.original_network_id != 0 {
            tp.onid = sdt.original_network_id;
        }

        if let Some(ts) = nit
            .transport_streams
            .iter()
            .find(|ts| (ts.nid == tp.nid || ts.onid == tp.onid) && ts.tid == tp.tid)
        {
            let tuned = tp.frequency;
            let center = ts.frequency;
            tp.copy_transponder_data(ts);
            tp.nid = ts.nid;
            if !(100_000_000..=858_000_000).contains(&center) || center.abs_diff(tuned) > 2_000_000 {
                tp.frequency = tuned;
            }
        }

        for pmt in &self.pmts {
            let mut n = tp.transponder();
            n.nid = tp.nid;
            n.onid = tp.onid;
            n.tid = tp.tid;
            n.sid = pmt.program_number;
            n.vpid = pmt.pids.vpid.clone();
            n.pcr_pid = pmt.pids.pcr_pid;
            n.tpid = pmt.pids.tpid;
            n.apids = pmt.pids.apids.clone();
            n.dpids = pmt.pids.dpids.clone();
            n.spids = pmt.pids.spids.clone();
            n.caids = pmt.pids.caids.clone();
            n.pmt_pid = pmt.pmt_pid;

            if n.vpid.pid == 0 && n.apids.is_empty() && n.dpids.is_empty() {
                continue;
            }

            if let Some(s) = sdt.find(n.tid, n.sid) {
                n.name = s.name.clone();
                n.short_name = s.short_name.clone();
                n.provider = s.provider.clone();
                n.free_ca_mode = s.free_ca_mode;
                n.service_type = s.service_type;
                n.onid = s.original_network_id;
            }

            if NON_AV_SERVICE_TYPES.contains(&n.service_type) {
                log::debug!("StateMachine: skip service {} '{}' (no audio/video)", n.sid, n.name);
                continue;
            }
            if let Some(reason) = filtered(&setup, &n) {
                log::debug!("StateMachine: skip service {} '{}' ({})", n.sid, n.name, reason);
                continue;
            }

            if setup.parse_lcn {
                n.lcn = LcnEntry::lookup(&nit.lcn_entries, n.onid, n.tid, n.sid);
            }
            if n.name != "???" {
                log::info!("StateMachine: {}", n.name);
            }
            log::debug!("StateMachine: new channel '{}'", n.to_vdr_line());
            self.session.add_channel(n);
        }

        self.session.new_channels.for_each_unnamed(|c| {
            if let Some(s) = sdt.find(c.tid, c.sid) {
                c.name = s.name.clone();
                c.short_name = s.short_name.clone();
                c.provider = s.provider.clone();
                c.free_ca_mode = s.free_ca_mode;
                log::debug!("StateMachine: update '{}'", c.to_vdr_line());
            }
        });

        let initial_position = self.initial.source.orbital_position();
        for ts in &nit.transport_streams {
            if (ts.source.orbital_position() - initial_position).abs() > MAX_QUEUE_ORBITAL_DISTANCE {
                continue;
            }
            let mut candidate = ts.transponder();
            candidate.nid = ts.nid;
            candidate.onid = ts.onid;
            candidate.tid = ts.tid;
            self.enqueue(candidate);

            if ts.source == Source::Terrestrial && ts.is_second_generation() {
                for cell in &ts.cells {
                    let alternates = cell
                        .center_frequencies
                        .iter()
                        .copied()
                        .chain(cell.transposers.iter().map(|t| t.frequency));
                    for frequency in alternates {
                        let mut candidate = ts.transponder();
                        candidate.nid = ts.nid;
                        candidate.tid = ts.tid;
                        candidate.frequency = frequency;
                        self.enqueue(candidate);
                    }
                }
            }
        }

        for link in &nit.cell_links {
            log::trace!(
                "StateMachine: cell {} at {} Hz, network {}",
                link.cell_id,
                link.frequency,
                link.network_id
            );
            let frequencies = std::iter::once(link.frequency).chain(link.subcells.iter().map(|s| s.frequency));
            for frequency in frequencies {
                for delsys in [0, 1] {
                    self.enqueue(cell_candidate(frequency, delsys));
                }
            }
        }

        self.pat = PatData::default();
        self.pmts.clear();
        lock(&nit_data).clear_transponder();
        State::DetachReceiver
    }

    /// Queue `candidate` unless it is already queued or scanned. Nothing is
    /// queued without network expansion, so the plan still visits it.
    fn enqueue(&self, candidate: Channel) {
        if !self.use_nit || self.session.is_known(&candidate, true) {
            return;
        }
        log::debug!(
            "StateMachine: queued {}, NID = {}, TID = {}",
            candidate.print_transponder(),
            candidate.nid,
            candidate.tid
        );
        self.session.new_transponders.add(candidate);
    }
}

/// Terrestrial candidate for a cell frequency link.
fn cell_candidate(frequency: u32, delsys: i32) -> Channel {
    let mut t = Channel::new(Source::Terrestrial);
    t.frequency = frequency;
    t.bandwidth = if frequency <= VHF_LIMIT { 7 } else { 8 };
    t.modulation = UNSET;
    t.delsys = delsys;
    t
}

/// Why the service inclusion flags reject `n`, if they do.
fn filtered(setup: &crate::context::Setup, n: &Channel) -> Option<&'static str> {
    use dvbscan_protocol::ScanFlags;

    let flags = setup.scan_flags;
    if flags.is_all() || n.service_type >= 0xFFFF {
        return None;
    }
    if !flags.contains(ScanFlags::SCRAMBLED) && n.free_ca_mode {
        return Some("encrypted");
    }
    if !flags.contains(ScanFlags::FTA) && !n.free_ca_mode {
        return Some("FTA");
    }
    if !flags.contains(ScanFlags::TV) && TV_SERVICE_TYPES.contains(&n.service_type) {
        return Some("tv");
    }
    if !flags.contains(ScanFlags::RADIO) && RADIO_SERVICE_TYPES.contains(&n.service_type) {
        return Some("radio");
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Setup;
    use crate::ts_analyzer::{build_section, descriptor_tag, stream_type, table_id};
    use crate::tuner::mock::{MockTransponder, MockTuner};
    use dvbscan_protocol::ScanFlags;

    fn setup() -> Setup {
        Setup {
            signal_wait_ms: 0,
            lock_timeout_ms: 0,
            ..Setup::default()
        }
    }

    fn timing() -> Timing {
        let mut t = Timing::with_tick(Duration::from_micros(50));
        t.pmt.max_polls = 50;
        t.nit.max_polls = 200;
        t.sdt.max_polls = 200;
        t
    }

    fn terrestrial(freq: u32) -> Channel {
        let mut c = Channel::new(Source::Terrestrial);
        c.frequency = freq;
        c
    }

    fn pat(tid: u16, services: &[(u16, u16)]) -> Vec<u8> {
        let mut body = vec![0x00, 0x00, 0xE0, 0x10];
        for (sid, pmt_pid) in services {
            body.extend_from_slice(&sid.to_be_bytes());
            body.extend_from_slice(&(0xE000 | pmt_pid).to_be_bytes());
        }
        build_section(table_id::PAT, tid, 0, 0, 0, &body)
    }

    fn pmt(sid: u16, vpid: u16, apid: u16) -> Vec<u8> {
        let mut body = (0xE000 | vpid).to_be_bytes().to_vec();
        body.extend_from_slice(&[0xF0, 0x00]);
        if vpid != 0 {
            body.push(stream_type::MPEG2_VIDEO);
            body.extend_from_slice(&(0xE000 | vpid).to_be_bytes());
            body.extend_from_slice(&[0xF0, 0x00]);
        }
        if apid != 0 {
            body.push(stream_type::MPEG1_AUDIO);
            body.extend_from_slice(&(0xE000 | apid).to_be_bytes());
            body.extend_from_slice(&[0xF0, 0x00]);
        }
        build_section(table_id::PMT, sid, 0, 0, 0, &body)
    }

    fn sdt(tid: u16, onid: u16, services: &[(u16, u8, bool, &str)]) -> Vec<u8> {
        let mut body = onid.to_be_bytes().to_vec();
        body.push(0xFF);
        for (sid, service_type, scrambled, name) in services {
            let mut sd = vec![0x48, 0, *service_type, 3];
            sd.extend_from_slice(b"ARD");
            sd.push(name.len() as u8);
            sd.extend_from_slice(name.as_bytes());
            sd[1] = (sd.len() - 2) as u8;

            body.extend_from_slice(&sid.to_be_bytes());
            body.push(0xFC);
            body.push(0x80 | if *scrambled { 0x10 } else { 0 });
            body.push(sd.len() as u8);
            body.extend_from_slice(&sd);
        }
        build_section(table_id::SDT_ACTUAL, tid, 0, 0, 0, &body)
    }

    /// NIT of network `nid` with one terrestrial transport stream per entry.
    fn nit(nid: u16, streams: &[(u16, u16, u32)]) -> Vec<u8> {
        let mut loop_body = Vec::new();
        for (tid, onid, hz) in streams {
            let mut d = vec![descriptor_tag::TERRESTRIAL_DELIVERY, 11];
            d.extend_from_slice(&(hz / 10).to_be_bytes());
            d.extend_from_slice(&[0x1F, 0x81, 0x1A, 0xFF, 0xFF, 0xFF, 0xFF]);

            loop_body.extend_from_slice(&tid.to_be_bytes());
            loop_body.extend_from_slice(&onid.to_be_bytes());
            loop_body.push(0xF0);
            loop_body.push(d.len() as u8);
            loop_body.extend_from_slice(&d);
        }
        let mut body = vec![0xF0, 0x00];
        body.push(0xF0 | ((loop_body.len() >> 8) as u8 & 0x0F));
        body.push(loop_body.len() as u8);
        body.extend_from_slice(&loop_body);
        build_section(table_id::NIT_ACTUAL, nid, 0, 0, 0, &body)
    }

    fn run(tuner: Arc<MockTuner>, session: &Arc<ScanSession>, initial: Channel, use_nit: bool) -> Vec<State> {
        let mut machine = StateMachine::new(tuner, session.clone(), initial, use_nit).with_timing(timing());
        machine.run();
        machine.trace().to_vec()
    }

    fn multiplex() -> MockTransponder {
        MockTransponder::new(terrestrial(474_000_000))
            .with_section(0x00, pat(0x0401, &[(0x6D66, 0x100), (0x6D67, 0x101), (0x6D68, 0x102)]))
            .with_section(0x100, pmt(0x6D66, 0x200, 0x201))
            .with_section(0x101, pmt(0x6D67, 0, 0x211))
            // teletext only
            .with_section(0x102, pmt(0x6D68, 0, 0))
            .with_section(
                0x11,
                sdt(
                    0x0401,
                    0x2114,
                    &[(0x6D66, 0x01, false, "Das Erste HD"), (0x6D67, 0x02, true, "Radio")],
                ),
            )
            .with_section(0x10, nit(0x3001, &[(0x0401, 0x2114, 474_000_000), (0x0402, 0x2114, 482_000_000)]))
    }

    #[test]
    fn test_transponder_with_network_expansion() {
        let tuner = Arc::new(MockTuner::new(vec![
            multiplex(),
            MockTransponder::new(terrestrial(482_000_000)).without_lock(),
        ]));
        let session = Arc::new(ScanSession::new(setup()));
        let trace = run(tuner.clone(), &session, terrestrial(474_000_000), true);

        assert_eq!(
            trace,
            vec![
                State::Start,
                State::Tune,
                State::ScanAssociation,
                State::ScanMap,
                State::ScanNetworkAndService,
                State::AddChannels,
                State::DetachReceiver,
                State::NextTransponder,
                State::Tune,
                State::NextTransponder,
                State::Stop,
            ]
        );

        let channels = session.channels();
        assert_eq!(channels.len(), 2);
        let tv = &channels[0];
        assert_eq!(tv.name, "Das Erste HD");
        assert_eq!(tv.provider, "ARD");
        assert_eq!((tv.onid, tv.tid, tv.sid), (0x2114, 0x0401, 0x6D66));
        assert_eq!(tv.vpid.pid, 0x200);
        assert_eq!(tv.pmt_pid, 0x100);
        // tuning parameters taken from the NIT
        assert_eq!(tv.modulation, 64);
        assert_eq!(tv.guard, 4);
        assert_eq!(channels[1].name, "Radio");
        assert!(channels[1].free_ca_mode);

        let scanned = session.scanned_transponders.snapshot();
        assert_eq!(scanned.len(), 2);
        assert!(scanned[0].tunable);
        assert!(!scanned[1].tunable);
        assert!(scanned.iter().all(|t| t.tested));

        let queued = session.new_transponders.snapshot();
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].tid, 0x0402);
        assert_eq!(tuner.receivers(), 0);
        assert_eq!(tuner.open_filters(), 0);
    }

    #[test]
    fn test_without_network_expansion() {
        let tuner = Arc::new(MockTuner::new(vec![multiplex()]));
        let session = Arc::new(ScanSession::new(setup()));
        let trace = run(tuner.clone(), &session, terrestrial(474_000_000), false);

        assert_eq!(trace.last(), Some(&State::Stop));
        assert_eq!(trace.iter().filter(|s| **s == State::Tune).count(), 1);
        assert_eq!(session.channels().len(), 2);
        assert!(session.new_transponders.is_empty());
        assert_eq!(tuner.switches().len(), 1);
    }

    #[test]
    fn test_scanned_transponder_is_not_tuned_again() {
        let tuner = Arc::new(MockTuner::new(vec![multiplex()]));
        let session = Arc::new(ScanSession::new(setup()));
        let mut done = terrestrial(474_000_000);
        done.tunable = true;
        session.scanned_transponders.add(done);

        let trace = run(tuner.clone(), &session, terrestrial(474_000_000), true);
        assert_eq!(trace, vec![State::Start, State::Stop]);
        assert!(tuner.switches().is_empty());
    }

    #[test]
    fn test_no_lock() {
        let tuner = Arc::new(MockTuner::new(vec![
            MockTransponder::new(terrestrial(474_000_000)).without_lock()
        ]));
        let session = Arc::new(ScanSession::new(setup()));
        let trace = run(tuner.clone(), &session, terrestrial(474_000_000), true);

        assert_eq!(trace, vec![State::Start, State::Tune, State::NextTransponder, State::Stop]);
        assert_eq!(session.scanned_transponders.len(), 1);
        assert!(session.channels().is_empty());
    }

    #[test]
    fn test_empty_pat_goes_to_detach() {
        let tuner = Arc::new(MockTuner::new(vec![
            MockTransponder::new(terrestrial(474_000_000)).with_section(0x00, pat(0x0401, &[]))
        ]));
        let session = Arc::new(ScanSession::new(setup()));
        let trace = run(tuner, &session, terrestrial(474_000_000), true);
        assert_eq!(
            trace,
            vec![
                State::Start,
                State::Tune,
                State::ScanAssociation,
                State::DetachReceiver,
                State::NextTransponder,
                State::Stop,
            ]
        );
    }

    #[test]
    fn test_incomplete_pat_keeps_services() {
        // section 0 of 2, sent once, so the PAT decoder runs into its timeout
        let body = [0x6D, 0x66, 0xE1, 0x00];
        let tuner = Arc::new(MockTuner::new(vec![MockTransponder::new(terrestrial(474_000_000))
            .with_section_once(0x00, build_section(table_id::PAT, 0x0401, 0, 0, 1, &body))
            .with_section(0x100, pmt(0x6D66, 0x200, 0x201))]));
        let session = Arc::new(ScanSession::new(setup()));
        let trace = run(tuner, &session, terrestrial(474_000_000), false);

        assert_eq!(
            &trace[..4],
            &[State::Start, State::Tune, State::ScanAssociation, State::ScanMap]
        );
        let channels = session.channels();
        assert_eq!(channels.len(), 1);
        assert_eq!(channels[0].sid, 0x6D66);
    }

    #[test]
    fn test_stop_request_short_circuits() {
        let tuner = Arc::new(MockTuner::new(vec![multiplex()]));
        let session = Arc::new(ScanSession::new(setup()));
        session.request_stop();
        let trace = run(tuner.clone(), &session, terrestrial(474_000_000), true);
        assert_eq!(trace, vec![State::Start, State::Stop]);
        assert!(tuner.switches().is_empty());
    }

    #[test]
    fn test_pmt_fan_out_is_bounded() {
        let services: Vec<(u16, u16)> = (0..20).map(|i| (0x100 + i, 0x1000 + i)).collect();
        let mut tp = MockTransponder::new(terrestrial(474_000_000)).with_section(0x00, pat(0x0401, &services));
        for (sid, pmt_pid) in &services {
            tp = tp.with_section(*pmt_pid, pmt(*sid, 0x200 + sid, 0));
        }
        let tuner = Arc::new(MockTuner::new(vec![tp]));
        let session = Arc::new(ScanSession::new(setup()));

        let mut machine = StateMachine::new(tuner.clone(), session.clone(), terrestrial(474_000_000), false)
            .with_timing(timing());
        assert_eq!(machine.start(), State::Tune);
        assert_eq!(machine.tune(), State::ScanAssociation);
        assert_eq!(machine.scan_association(), State::ScanMap);
        assert_eq!(machine.scan_map(), State::ScanNetworkAndService);

        assert!(tuner.max_open_filters() <= MAX_PMT_DECODERS);
        assert_eq!(machine.pmts.len(), 20);
        assert!(machine.pmts.iter().all(|p| p.complete));
        assert_eq!(machine.pmts[19].program_number, 0x113);
    }

    #[test]
    fn test_service_filter() {
        let mut setup = setup();
        let mut n = terrestrial(474_000_000);
        n.service_type = 0x02;
        n.free_ca_mode = true;
        assert_eq!(filtered(&setup, &n), None);

        setup.scan_flags = ScanFlags::TV | ScanFlags::FTA | ScanFlags::SCRAMBLED;
        assert_eq!(filtered(&setup, &n), Some("radio"));
        setup.scan_flags = ScanFlags::TV | ScanFlags::RADIO | ScanFlags::FTA;
        assert_eq!(filtered(&setup, &n), Some("encrypted"));

        n.service_type = 0xFFFF;
        assert_eq!(filtered(&setup, &n), None);
    }

    #[test]
    fn test_cell_candidate_bandwidth() {
        assert_eq!(cell_candidate(226_500_000, 0).bandwidth, 7);
        let c = cell_candidate(474_000_000, 1);
        assert_eq!(c.bandwidth, 8);
        assert_eq!(c.delsys, 1);
        assert_eq!(c.modulation, UNSET);
    }
}
