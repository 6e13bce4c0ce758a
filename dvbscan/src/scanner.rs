//! Scan orchestrator.
//!
//! Picks a device, checks what the frontend can auto-detect, enumerates the
//! candidate transponders of the requested network type and runs one
//! [`StateMachine`] per candidate that is not known yet. Discovered channels
//! are merged into a [`ChannelStore`] once the plan is exhausted.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use dvbscan_protocol::{Channel, ScanError, ScanType, Source, StatusCode, UNSET};

use crate::context::Setup;
use crate::plan::countries::{ATSC_TYPE_BOTH, ATSC_TYPE_QAM, ATSC_TYPE_VSB};
use crate::plan::{self, ChannelList, CHANNEL_MAX, OFFSET_INDEX_MAX};
use crate::session::{Progress, ScanSession};
use crate::statemachine::{StateMachine, Timing};
use crate::store::{ChannelStore, MergePolicy, MergeResult};
use crate::tuner::Tuner;

/// Frontends known to misbehave during a scan. Used only if nothing else fits.
const KNOWN_BAD_DEVICES: &[&str] = &["VLSI VES1820", "Sony CXD2820R"];

/// Highest DVB-T2 PLP id tried per frequency.
const T2_PLP_MAX: i32 = 3;

/// What to scan.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanRequest {
    pub scan_type: ScanType,
    /// ISO 3166 alpha-2, selects the frequency plan.
    pub country: String,
    /// Short satellite name, e.g. `S19E2`.
    pub satellite: String,
    /// The single transponder of a [`ScanType::Transponder`] scan.
    pub transponder: Option<Channel>,
    /// Overrides [`Setup::use_nit`] for this run.
    pub use_nit: Option<bool>,
}

impl ScanRequest {
    fn new(scan_type: ScanType) -> Self {
        Self {
            scan_type,
            country: String::new(),
            satellite: String::new(),
            transponder: None,
            use_nit: None,
        }
    }

    pub fn terrestrial(country: &str) -> Self {
        Self {
            country: country.to_string(),
            ..Self::new(ScanType::Terrestrial)
        }
    }

    pub fn cable(country: &str) -> Self {
        Self {
            country: country.to_string(),
            ..Self::new(ScanType::Cable)
        }
    }

    pub fn atsc(country: &str) -> Self {
        Self {
            country: country.to_string(),
            ..Self::new(ScanType::TerrCableAtsc)
        }
    }

    pub fn satellite(satellite: &str) -> Self {
        Self {
            satellite: satellite.to_string(),
            ..Self::new(ScanType::Satellite)
        }
    }

    pub fn transponder(transponder: Channel, use_nit: bool) -> Self {
        Self {
            transponder: Some(transponder),
            use_nit: Some(use_nit),
            ..Self::new(ScanType::Transponder)
        }
    }
}

/// Outcome of a finished run.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub channels: Vec<Channel>,
    /// `None` if the store rejected the merge.
    pub merge: Option<MergeResult>,
    pub scanned_transponders: usize,
    /// Whether the run ended on a stop request.
    pub stopped: bool,
}

/// One entry of the enumeration space.
#[derive(Debug, Clone)]
enum Candidate {
    Tune(Channel),
    /// Counted for progress, never tuned.
    Skip(Channel, &'static str),
}

/// Device plus enumeration space of one run.
struct Plan {
    device: Arc<dyn Tuner>,
    candidates: Vec<Candidate>,
    use_nit: bool,
    /// Tune without checking the known sets first.
    single: bool,
}

/// Runs scans over a set of devices.
pub struct Scanner {
    devices: Vec<Arc<dyn Tuner>>,
    session: Arc<ScanSession>,
    timing: Timing,
}

impl Scanner {
    pub fn new(devices: Vec<Arc<dyn Tuner>>, setup: Setup) -> Self {
        Self {
            devices,
            session: Arc::new(ScanSession::new(setup)),
            timing: Timing::default(),
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn session(&self) -> Arc<ScanSession> {
        self.session.clone()
    }

    fn setup(&self) -> &Setup {
        self.session.setup()
    }

    /// Scan on the calling thread and merge the result into `store`.
    pub fn run<S: ChannelStore>(&self, request: &ScanRequest, store: &mut S) -> Result<ScanReport, ScanError> {
        self.session.set_status(StatusCode::Running);
        log::info!("Scanner: {} scan started", request.scan_type.display_name());

        let plan = match self.plan(request) {
            Ok(plan) => plan,
            Err(e) => {
                log::error!("Scanner: {}", e);
                self.session.set_status(StatusCode::from(&e));
                return Err(e);
            }
        };

        self.execute(&plan);
        plan.device.detach_all_receivers();

        let channels = self.session.channels();
        let merge = match store.merge(&channels, &MergePolicy::from(self.setup())) {
            Ok(result) => {
                log::info!("Scanner: channel store: {}", result);
                Some(result)
            }
            Err(e) => {
                log::error!("Scanner: channel store merge failed: {}", e);
                None
            }
        };

        let report = ScanReport {
            channels,
            merge,
            scanned_transponders: self.session.scanned_transponders.len(),
            stopped: self.session.is_stopped(),
        };
        log::info!(
            "Scanner: {} channels on {} transponders{}",
            report.channels.len(),
            report.scanned_transponders,
            if report.stopped { " (stopped)" } else { "" }
        );
        self.session.set_status(StatusCode::Idle);
        self.session.report_progress();
        Ok(report)
    }

    /// Scan on a worker thread. The store is handed back by
    /// [`ScanHandle::join`].
    pub fn spawn<S>(self, request: ScanRequest, mut store: S) -> std::io::Result<ScanHandle<S>>
    where
        S: ChannelStore + Send + 'static,
    {
        let session = self.session.clone();
        let thread = thread::Builder::new().name("scanner".to_string()).spawn(move || {
            let result = self.run(&request, &mut store);
            (result, store)
        })?;
        Ok(ScanHandle { session, thread })
    }

    fn execute(&self, plan: &Plan) {
        let session = &self.session;
        let setup = self.setup();

        for candidate in &plan.candidates {
            if session.is_stopped() {
                log::info!("Scanner: stopped");
                break;
            }

            let tp = match candidate {
                Candidate::Skip(tp, reason) => {
                    log::debug!("Scanner: {}: skipped ({})", tp.print_transponder(), reason);
                    session.advance();
                    session.report_progress();
                    continue;
                }
                Candidate::Tune(tp) => tp,
            };

            let printed = tp.print_transponder();
            if !plan.single && session.is_known(tp, false) {
                log::debug!("Scanner: {}: skipped (already known transponder)", printed);
                session.advance();
                session.report_progress();
                continue;
            }

            session.advance();
            session.set_transponder(&printed);
            session.set_signal(0, false);
            session.report_progress();
            log::debug!("Scanner: {}", printed);

            let device = &plan.device;
            let has_lock = match device.switch(tp) {
                Ok(()) => {
                    thread::sleep(setup.signal_wait());
                    device.has_signal() && device.has_lock(setup.lock_timeout())
                }
                Err(e) => {
                    log::warn!("Scanner: cannot tune {}: {}", printed, e);
                    false
                }
            };

            if has_lock {
                session.set_signal(device.signal_strength(), true);
                let mut machine = StateMachine::new(device.clone(), session.clone(), tp.clone(), plan.use_nit)
                    .with_timing(self.timing);
                machine.run();
            }
            device.detach_all_receivers();
        }
    }

    fn plan(&self, request: &ScanRequest) -> Result<Plan, ScanError> {
        let use_nit = request.use_nit.unwrap_or(self.setup().use_nit);
        let plan = match request.scan_type {
            ScanType::Transponder => self.plan_transponder(request, use_nit)?,
            ScanType::Satellite => self.plan_satellite(&request.satellite, use_nit)?,
            ScanType::Terrestrial | ScanType::Cable | ScanType::TerrCableAtsc => {
                let (scan_type, list) =
                    plan::choose_country(&request.country, self.setup().atsc_type, request.scan_type)?;
                log::info!("Scanner: {} using '{}'", request.country.to_uppercase(), list.name());
                match scan_type {
                    ScanType::Terrestrial => self.plan_terrestrial(list, use_nit)?,
                    ScanType::Cable => self.plan_cable(list, use_nit)?,
                    ScanType::TerrCableAtsc => self.plan_atsc(use_nit)?,
                    other => return Err(ScanError::UnsupportedScanType(other as i32)),
                }
            }
            ScanType::NoDevice => return Err(ScanError::UnsupportedScanType(ScanType::NoDevice as i32)),
        };

        let initial = plan.candidates.len();
        self.session.set_initial_transponders(initial);
        self.session.set_device(&plan.device.name());
        log::info!("Scanner: frontend '{}', {} candidates", plan.device.name(), initial);
        Ok(plan)
    }

    /// Best device that provides `template`. Second generation capable devices
    /// win immediately.
    fn select_device(&self, template: &Channel) -> Option<Arc<dyn Tuner>> {
        let mut best: Option<(u8, &Arc<dyn Tuner>)> = None;

        for device in &self.devices {
            let name = device.name();
            if !device.provides(template) {
                log::debug!("Scanner: device '{}' not usable for {}", name, template.print_transponder());
                continue;
            }
            let gen2 = matches!(template.source, Source::Terrestrial | Source::Satellite { .. }) && {
                let mut second = template.clone();
                second.delsys = 1;
                device.provides(&second)
            };
            let preference = device_preference(&name, gen2);
            match preference {
                0 => log::debug!("Scanner: device '{}' known to have problems, usable anyway", name),
                1 => log::debug!("Scanner: device '{}' has no second generation support", name),
                _ => {
                    log::debug!("Scanner: device '{}' has second generation support", name);
                    return Some(device.clone());
                }
            }
            if best.map_or(true, |(p, _)| preference >= p) {
                best = Some((preference, device));
            }
        }
        best.map(|(_, device)| device.clone())
    }

    fn no_device(&self, what: &str) -> ScanError {
        log::error!("Scanner: no device available for {}", what);
        ScanError::NoDevice(what.to_string())
    }

    fn plan_transponder(&self, request: &ScanRequest, use_nit: bool) -> Result<Plan, ScanError> {
        let tp = request
            .transponder
            .clone()
            .ok_or(ScanError::UnsupportedScanType(ScanType::Transponder as i32))?;
        let device = self
            .select_device(&tp)
            .ok_or_else(|| self.no_device(ScanType::Transponder.display_name()))?;
        Ok(Plan {
            device,
            candidates: vec![Candidate::Tune(tp)],
            use_nit,
            single: true,
        })
    }

    fn plan_terrestrial(&self, list: ChannelList, use_nit: bool) -> Result<Plan, ScanError> {
        let setup = self.setup();
        let mut template = Channel::new(Source::Terrestrial);
        template.frequency = 474_000_000;
        template.inversion = UNSET;
        template.bandwidth = 8;
        template.fec = 23;
        template.modulation = 256;
        template.delsys = 1;
        template.transmission = 8;
        template.guard = UNSET;
        template.hierarchy = 0;

        let (device, fallback) = match self.select_device(&template) {
            Some(device) => (device, false),
            None => {
                log::warn!("Scanner: no DVB-T2 device available, trying DVB-T");
                self.session.set_status(StatusCode::FallbackFirstGeneration);
                template.modulation = 64;
                template.delsys = 0;
                let device = self
                    .select_device(&template)
                    .ok_or_else(|| self.no_device(ScanType::Terrestrial.display_name()))?;
                (device, true)
            }
        };

        let caps = device.capabilities(&Source::Terrestrial);
        let t2 = caps.second_generation && !fallback;
        if !t2 {
            log::warn!("Scanner: device '{}' has no DVB-T2 support", device.name());
        }
        let or_auto = |auto: bool, value: i32| if auto { UNSET } else { value };
        let inversion = or_auto(caps.auto_inversion, setup.dvbt_inversion);
        let modulation = or_auto(caps.auto_modulation, 64);
        let transmission = or_auto(caps.auto_transmission, plan::dvbt_transmission_mode(5, list));
        let guard = or_auto(caps.auto_guard, 8);
        let hierarchy = or_auto(caps.auto_hierarchy, 0);
        let fec = or_auto(caps.auto_fec, 0);

        let systems: &[i32] = if t2 { &[1, 0] } else { &[0] };
        let mut candidates = Vec::new();
        for &delsys in systems {
            let plp_max = if delsys == 1 { T2_PLP_MAX } else { 0 };
            for channel in 0..=CHANNEL_MAX {
                for offset in 0..=OFFSET_INDEX_MAX {
                    let Some(frequency) = plan::candidate_frequency(channel, list, offset) else {
                        continue;
                    };
                    let bandwidth_hz = plan::bandwidth(channel, list);
                    for plp in 0..=plp_max {
                        let mut tp = Channel::new(Source::Terrestrial);
                        tp.frequency = frequency;
                        tp.symbol_rate = 0;
                        tp.bandwidth = if bandwidth_hz == 1_712_000 {
                            1712
                        } else {
                            (bandwidth_hz / 1_000_000) as i32
                        };
                        tp.inversion = inversion;
                        tp.fec = fec;
                        tp.fec_low = fec;
                        tp.modulation = modulation;
                        tp.delsys = delsys;
                        tp.transmission = transmission;
                        tp.guard = guard;
                        tp.hierarchy = hierarchy;
                        tp.stream_id = plp;
                        candidates.push(Candidate::Tune(tp));
                    }
                }
            }
        }
        Ok(Plan {
            device,
            candidates,
            use_nit,
            single: false,
        })
    }

    fn plan_cable(&self, list: ChannelList, use_nit: bool) -> Result<Plan, ScanError> {
        let setup = self.setup();
        let mut template = Channel::new(Source::Cable);
        template.frequency = 410_000;
        template.modulation = 64;
        template.symbol_rate = 6900;
        template.inversion = UNSET;
        template.fec = 0;
        template.delsys = 0;

        let device = self
            .select_device(&template)
            .ok_or_else(|| self.no_device(ScanType::Cable.display_name()))?;
        let caps = device.capabilities(&Source::Cable);
        let inversion = if caps.auto_inversion {
            UNSET
        } else {
            setup.dvbc_inversion
        };

        let modulations: Vec<i32> = if caps.auto_modulation {
            vec![UNSET]
        } else {
            (plan::dvbc_qam_min(0, list)..=plan::dvbc_qam_max(0, list))
                .map(plan::dvbc_modulation)
                .collect()
        };
        log::debug!("Scanner: DVB-C modulations {:?}", modulations);

        let mut candidates = Vec::new();
        for &modulation in &modulations {
            for channel in 0..=CHANNEL_MAX {
                for offset in 0..=OFFSET_INDEX_MAX {
                    let Some(frequency) = plan::candidate_frequency(channel, list, offset) else {
                        continue;
                    };
                    for sr in setup.dvbc_symbolrate_range() {
                        let mut tp = Channel::new(Source::Cable);
                        tp.frequency = frequency / 1000;
                        tp.symbol_rate = plan::dvbc_symbolrate(sr) / 1000;
                        tp.inversion = inversion;
                        tp.bandwidth = UNSET;
                        tp.fec = 0;
                        tp.modulation = modulation;
                        tp.delsys = 0;
                        candidates.push(Candidate::Tune(tp));
                    }
                }
            }
        }
        Ok(Plan {
            device,
            candidates,
            use_nit,
            single: false,
        })
    }

    fn plan_satellite(&self, name: &str, use_nit: bool) -> Result<Plan, ScanError> {
        let setup = self.setup();
        let satellite = plan::find_satellite(name)?;
        let source = satellite.source();
        let lnb = setup.lnb();
        log::info!("Scanner: {} ({})", satellite.full_name, source);

        let mut template = satellite
            .transponders
            .iter()
            .map(|t| t.to_channel(source))
            .find(|c| c.valid_sat_if(&lnb))
            .or_else(|| satellite.transponders.first().map(|t| t.to_channel(source)))
            .ok_or_else(|| self.no_device(&source.to_string()))?;
        template.symbol_rate = 27500;
        template.fec = 23;
        template.modulation = 5;
        template.delsys = 1;
        template.rolloff = 35;

        let (device, fallback) = match self.select_device(&template) {
            Some(device) => (device, false),
            None => {
                log::warn!("Scanner: no DVB-S2 device available, trying DVB-S");
                self.session.set_status(StatusCode::FallbackFirstGeneration);
                template.modulation = 2;
                template.delsys = 0;
                let device = self
                    .select_device(&template)
                    .ok_or_else(|| self.no_device(ScanType::Satellite.display_name()))?;
                (device, true)
            }
        };

        let caps = device.capabilities(&source);
        let s2 = !fallback && caps.second_generation && setup.enable_s2;
        if !s2 {
            log::info!("Scanner: DVB-S2 transponders are skipped");
        }

        let mut candidates = Vec::new();
        for t in satellite.transponders {
            let mut tp = t.to_channel(source);
            if !tp.valid_sat_if(&lnb) {
                continue;
            }
            if t.is_second_generation() && !s2 {
                candidates.push(Candidate::Skip(tp, "no S2 support"));
            } else {
                candidates.push(Candidate::Tune(tp));
            }
        }
        Ok(Plan {
            device,
            candidates,
            use_nit,
            single: false,
        })
    }

    fn plan_atsc(&self, use_nit: bool) -> Result<Plan, ScanError> {
        let setup = self.setup();
        let mut template = Channel::new(Source::Atsc);
        template.frequency = 474_000;
        template.modulation = 256;
        template.symbol_rate = 6900;
        template.inversion = 0;
        template.fec = 0;
        template.delsys = 0;

        let device = self
            .select_device(&template)
            .ok_or_else(|| self.no_device(ScanType::TerrCableAtsc.display_name()))?;
        let caps = device.capabilities(&Source::Atsc);
        let inversion = if caps.auto_inversion { UNSET } else { 0 };

        let lists: &[(ChannelList, i32)] = match setup.atsc_type {
            ATSC_TYPE_VSB => &[(ChannelList::AtscVsb, 10)],
            ATSC_TYPE_QAM => &[(ChannelList::AtscQam, 256)],
            ATSC_TYPE_BOTH => &[(ChannelList::AtscVsb, 10), (ChannelList::AtscQam, 256)],
            other => {
                log::warn!("Scanner: unknown ATSC type {}, scanning VSB and QAM", other);
                &[(ChannelList::AtscVsb, 10), (ChannelList::AtscQam, 256)]
            }
        };

        let mut candidates = Vec::new();
        for &(list, modulation) in lists {
            if (modulation == 10 && !caps.vsb) || (modulation == 256 && !caps.qam) {
                log::warn!("Scanner: device '{}' lacks {}", device.name(), list.name());
            }
            for channel in 0..=CHANNEL_MAX {
                for offset in 0..=OFFSET_INDEX_MAX {
                    let Some(frequency) = plan::candidate_frequency(channel, list, offset) else {
                        continue;
                    };
                    let mut tp = Channel::new(Source::Atsc);
                    tp.frequency = frequency / 1000;
                    tp.symbol_rate = 0;
                    tp.modulation = modulation;
                    tp.inversion = inversion;
                    tp.fec = 0;
                    tp.delsys = 0;
                    candidates.push(Candidate::Tune(tp));
                }
            }
        }
        Ok(Plan {
            device,
            candidates,
            use_nit,
            single: false,
        })
    }
}

/// 0 for known problematic frontends, 2 for second generation, else 1.
fn device_preference(name: &str, gen2: bool) -> u8 {
    if KNOWN_BAD_DEVICES.iter().any(|bad| name == *bad) {
        0
    } else if gen2 {
        2
    } else {
        1
    }
}

/// A scan running on its own thread.
pub struct ScanHandle<S> {
    session: Arc<ScanSession>,
    thread: JoinHandle<(Result<ScanReport, ScanError>, S)>,
}

impl<S> ScanHandle<S> {
    pub fn session(&self) -> Arc<ScanSession> {
        self.session.clone()
    }

    /// Cooperative: the run ends at its next check, [`join`](Self::join) still
    /// has to be called.
    pub fn stop(&self) {
        self.session.request_stop();
    }

    pub fn progress(&self) -> Progress {
        self.session.progress()
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    pub fn join(self) -> (Result<ScanReport, ScanError>, Option<S>) {
        match self.thread.join() {
            Ok((result, store)) => (result, Some(store)),
            Err(_) => {
                log::error!("Scanner: scan thread panicked");
                (Err(ScanError::Tuner("scan thread panicked".to_string())), None)
            }
        }
    }
}
