//! Run context shared by the orchestrator and the state machine.
//!
//! A [`ScanSession`] owns the three result collections of a run, the
//! accumulated NIT and SDT data, the stop flag and the progress counters.
//! It is shared as `Arc<ScanSession>` between the scanning thread and the
//! caller, which may poll [`ScanSession::progress`], request a stop or
//! subscribe to [`ScanEvent`]s.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use dvbscan_protocol::{Channel, StatusCode};

use crate::context::Setup;
use crate::decoder::{lock, NitData, SdtData, StopToken};
use crate::transponder::known_transponder;

/// Something the caller may want to show while a run is in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Status(StatusCode),
    Device(String),
    /// Printed transponder about to be tuned.
    Transponder(String),
    Signal { strength: u8, lock: bool },
    /// A channel was added to the result.
    Channel(Box<Channel>),
    Progress(Progress),
}

/// Snapshot of a running scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Progress {
    pub status: StatusCode,
    /// 0.0..=100.0
    pub percent: f64,
    /// Candidates handled so far, plan entries plus scanned transponders.
    pub current: usize,
    /// Plan entries plus queued transponders.
    pub total: usize,
    pub device: String,
    pub transponder: String,
    pub strength: u8,
    pub lock: bool,
    pub channels: usize,
    pub new_transponders: usize,
}

/// `0.5 + 100 * (this_channel + scanned) / (new + initial)`, 0 without plan
/// entries, at most 100.
pub fn progress_percent(this_channel: usize, scanned: usize, new: usize, initial: usize) -> f64 {
    if initial == 0 {
        return 0.0;
    }
    let p = 0.5 + 100.0 * (this_channel + scanned) as f64 / (new + initial) as f64;
    p.min(100.0)
}

/// Transponders found in network information tables, waiting to be tuned.
#[derive(Debug, Default)]
pub struct NewTransponders {
    items: Mutex<Vec<Channel>>,
}

impl NewTransponders {
    pub fn add(&self, tp: Channel) {
        lock(&self.items).push(tp);
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// First transponder not yet tested. It is marked tested before it is
    /// returned, so every entry is handed out once.
    pub fn next_untested(&self) -> Option<Channel> {
        let mut items = lock(&self.items);
        let tp = items.iter_mut().find(|t| !t.tested)?;
        tp.tested = true;
        Some(tp.clone())
    }

    pub fn snapshot(&self) -> Vec<Channel> {
        lock(&self.items).clone()
    }
}

/// Every transponder a tuning attempt was made on, with or without lock.
#[derive(Debug, Default)]
pub struct ScannedTransponders {
    items: Mutex<Vec<Channel>>,
}

impl ScannedTransponders {
    pub fn add(&self, tp: Channel) {
        lock(&self.items).push(tp);
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<Channel> {
        lock(&self.items).clone()
    }
}

/// Resolved channels, the result of a run.
#[derive(Debug, Default)]
pub struct NewChannels {
    items: Mutex<Vec<Channel>>,
}

impl NewChannels {
    pub fn add(&self, channel: Channel) {
        lock(&self.items).push(channel);
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `f` to every channel still called "???".
    pub fn for_each_unnamed<F: FnMut(&mut Channel)>(&self, mut f: F) {
        for c in lock(&self.items).iter_mut().filter(|c| c.name == "???") {
            f(c);
        }
    }

    pub fn snapshot(&self) -> Vec<Channel> {
        lock(&self.items).clone()
    }
}

#[derive(Debug, Default)]
struct Counters {
    status: StatusCode,
    this_channel: usize,
    initial: usize,
    device: String,
    transponder: String,
    strength: u8,
    lock: bool,
}

/// Context of one scan run.
#[derive(Debug)]
pub struct ScanSession {
    setup: Setup,
    pub new_transponders: NewTransponders,
    pub scanned_transponders: ScannedTransponders,
    pub new_channels: NewChannels,
    nit: Arc<Mutex<NitData>>,
    sdt: Arc<Mutex<SdtData>>,
    stop: StopToken,
    counters: Mutex<Counters>,
    events: Mutex<Option<Sender<ScanEvent>>>,
}

impl ScanSession {
    pub fn new(setup: Setup) -> Self {
        Self {
            setup,
            new_transponders: NewTransponders::default(),
            scanned_transponders: ScannedTransponders::default(),
            new_channels: NewChannels::default(),
            nit: Arc::new(Mutex::new(NitData::default())),
            sdt: Arc::new(Mutex::new(SdtData::default())),
            stop: StopToken::new(),
            counters: Mutex::new(Counters::default()),
            events: Mutex::new(None),
        }
    }

    pub fn setup(&self) -> &Setup {
        &self.setup
    }

    /// Receive [`ScanEvent`]s from now on. A later call replaces the
    /// previous subscriber.
    pub fn subscribe(&self) -> Receiver<ScanEvent> {
        let (tx, rx) = mpsc::channel();
        *lock(&self.events) = Some(tx);
        rx
    }

    pub(crate) fn emit(&self, event: ScanEvent) {
        let mut events = lock(&self.events);
        if let Some(tx) = events.as_ref() {
            if tx.send(event).is_err() {
                // receiver gone
                *events = None;
            }
        }
    }

    pub fn nit_data(&self) -> Arc<Mutex<NitData>> {
        self.nit.clone()
    }

    pub fn sdt_data(&self) -> Arc<Mutex<SdtData>> {
        self.sdt.clone()
    }

    /// Ask the run to finish at the next check.
    pub fn request_stop(&self) {
        log::info!("ScanSession: stop requested");
        self.stop.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_stopped()
    }

    pub fn stop_token(&self) -> StopToken {
        self.stop.clone()
    }

    /// `candidate` is queued or was already scanned.
    pub fn is_known(&self, candidate: &Channel, relaxed: bool) -> bool {
        let new = lock(&self.new_transponders.items);
        let scanned = lock(&self.scanned_transponders.items);
        known_transponder(
            candidate,
            relaxed,
            &[new.as_slice(), scanned.as_slice()],
            &self.setup.tolerances,
        )
    }

    /// `candidate` was already scanned, compared strictly.
    pub fn is_scanned(&self, candidate: &Channel) -> bool {
        let scanned = lock(&self.scanned_transponders.items);
        known_transponder(candidate, false, &[scanned.as_slice()], &self.setup.tolerances)
    }

    pub fn status(&self) -> StatusCode {
        lock(&self.counters).status
    }

    pub fn set_status(&self, status: StatusCode) {
        lock(&self.counters).status = status;
        self.emit(ScanEvent::Status(status));
    }

    pub fn set_device(&self, name: &str) {
        lock(&self.counters).device = name.to_string();
        self.emit(ScanEvent::Device(name.to_string()));
    }

    pub fn set_transponder(&self, printed: &str) {
        lock(&self.counters).transponder = printed.to_string();
        self.emit(ScanEvent::Transponder(printed.to_string()));
    }

    pub fn set_signal(&self, strength: u8, has_lock: bool) {
        {
            let mut c = lock(&self.counters);
            c.strength = strength.min(100);
            c.lock = has_lock;
        }
        self.emit(ScanEvent::Signal {
            strength: strength.min(100),
            lock: has_lock,
        });
    }

    pub fn set_initial_transponders(&self, count: usize) {
        lock(&self.counters).initial = count;
    }

    pub fn initial_transponders(&self) -> usize {
        lock(&self.counters).initial
    }

    /// One more plan entry handled.
    pub fn advance(&self) {
        lock(&self.counters).this_channel += 1;
    }

    pub fn this_channel(&self) -> usize {
        lock(&self.counters).this_channel
    }

    pub fn add_channel(&self, channel: Channel) {
        self.emit(ScanEvent::Channel(Box::new(channel.clone())));
        self.new_channels.add(channel);
    }

    pub fn progress(&self) -> Progress {
        let scanned = self.scanned_transponders.len();
        let new = self.new_transponders.len();
        let channels = self.new_channels.len();
        let c = lock(&self.counters);
        Progress {
            status: c.status,
            percent: progress_percent(c.this_channel, scanned, new, c.initial),
            current: c.this_channel + scanned,
            total: new + c.initial,
            device: c.device.clone(),
            transponder: c.transponder.clone(),
            strength: c.strength,
            lock: c.lock,
            channels,
            new_transponders: new,
        }
    }

    /// Publish the current [`Progress`].
    pub fn report_progress(&self) {
        let progress = self.progress();
        log::trace!(
            "ScanSession: {:.1}% ({}/{})",
            progress.percent,
            progress.current,
            progress.total
        );
        self.emit(ScanEvent::Progress(progress));
    }

    /// Resolved channels.
    pub fn channels(&self) -> Vec<Channel> {
        self.new_channels.snapshot()
    }
}
