//! Table decoders.
//!
//! Every decoder is a worker thread that opens one section filter, polls it
//! on a fixed tick and hands each section to a table specific `process`
//! closure until the table is complete, a poll budget is spent or a stop is
//! requested. Budgets are counted in polls, not wall-clock time.

pub mod nit;
pub mod pat;
pub mod pmt;
pub mod sdt;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::tuner::Tuner;

pub use nit::{LcnEntry, NitContext, NitData, NitDecoder};
pub use pat::{PatData, PatDecoder};
pub use pmt::{PmtData, PmtDecoder};
pub use sdt::{SdtData, SdtDecoder, SdtEntry};

/// Largest section a filter read may return.
pub const SECTION_BUFFER_SIZE: usize = 4096;

/// Default poll interval.
pub const TICK: Duration = Duration::from_millis(10);

/// Poll budget of one decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Give up after this many polls.
    pub max_polls: u32,
    /// Give up earlier if not a single byte arrived within this many polls.
    pub max_polls_without_data: Option<u32>,
    pub tick: Duration,
}

impl PollPolicy {
    pub const PAT: PollPolicy = PollPolicy {
        max_polls: 1000,
        max_polls_without_data: Some(300),
        tick: TICK,
    };
    pub const PMT: PollPolicy = PollPolicy {
        max_polls: 500,
        max_polls_without_data: None,
        tick: TICK,
    };
    pub const NIT: PollPolicy = PollPolicy {
        max_polls: 4000,
        max_polls_without_data: Some(1800),
        tick: TICK,
    };
    pub const SDT: PollPolicy = PollPolicy {
        max_polls: 4000,
        max_polls_without_data: Some(1800),
        tick: TICK,
    };

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }
}

/// Lock a shared accumulator, ignoring poisoning by a panicked worker.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Cooperative cancellation flag shared between a worker and its owner.
#[derive(Debug, Clone, Default)]
pub struct StopToken(Arc<AtomicBool>);

impl StopToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a `process` closure wants after one section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Done,
}

/// Why a filter loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopOutcome {
    Complete,
    Timeout,
    /// No byte received within the early-abort budget.
    NoData,
    Stopped,
    FilterError,
}

/// Section filter parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterSpec {
    pub pid: u16,
    pub table_id: u8,
    pub mask: u8,
}

impl FilterSpec {
    pub fn new(pid: u16, table_id: u8) -> Self {
        Self {
            pid,
            table_id,
            mask: 0xFF,
        }
    }
}

/// Poll one filter until `process` reports completion or the budget ends.
/// The filter is always closed before returning.
pub fn run_filter_loop<F>(
    tuner: &dyn Tuner,
    filter: FilterSpec,
    policy: &PollPolicy,
    stop: &StopToken,
    mut process: F,
) -> LoopOutcome
where
    F: FnMut(&[u8]) -> Flow,
{
    let handle = match tuner.open_filter(filter.pid, filter.table_id, filter.mask) {
        Ok(h) => h,
        Err(e) => {
            log::debug!("Filter {:#06x}/{:#04x}: {}", filter.pid, filter.table_id, e);
            return LoopOutcome::FilterError;
        }
    };

    let mut buffer = vec![0u8; SECTION_BUFFER_SIZE];
    let mut polls = 0u32;
    let mut any_bytes = false;

    let outcome = loop {
        if stop.is_stopped() {
            break LoopOutcome::Stopped;
        }
        if polls >= policy.max_polls {
            break LoopOutcome::Timeout;
        }
        if !any_bytes && policy.max_polls_without_data.is_some_and(|limit| polls >= limit) {
            break LoopOutcome::NoData;
        }
        polls += 1;

        match tuner.read_filter(handle, &mut buffer) {
            Ok(0) => {}
            Ok(n) => {
                any_bytes = true;
                if process(&buffer[..n]) == Flow::Done {
                    break LoopOutcome::Complete;
                }
                continue;
            }
            Err(e) => {
                log::debug!("Filter {:#06x}/{:#04x}: {}", filter.pid, filter.table_id, e);
                break LoopOutcome::FilterError;
            }
        }
        thread::sleep(policy.tick);
    };

    tuner.close_filter(handle);
    outcome
}

/// Running decoder worker.
pub struct DecoderHandle<T> {
    active: Arc<AtomicBool>,
    stop: StopToken,
    thread: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> DecoderHandle<T> {
    /// Run `work` on its own thread.
    pub fn spawn<F>(name: &str, work: F) -> Self
    where
        F: FnOnce(StopToken) -> T + Send + 'static,
    {
        let active = Arc::new(AtomicBool::new(true));
        let stop = StopToken::new();

        let thread_active = active.clone();
        let thread_stop = stop.clone();
        let builder = thread::Builder::new().name(name.to_string());
        let thread = builder.spawn(move || {
            let result = work(thread_stop);
            thread_active.store(false, Ordering::SeqCst);
            result
        });

        let thread = match thread {
            Ok(t) => Some(t),
            Err(e) => {
                log::error!("{}: failed to spawn worker: {}", name, e);
                active.store(false, Ordering::SeqCst);
                None
            }
        };

        Self { active, stop, thread }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Ask the worker to finish at its next poll.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Wait for the worker. `None` if it could not be started or panicked.
    pub fn join(mut self) -> Option<T> {
        let thread = self.thread.take()?;
        match thread.join() {
            Ok(result) => Some(result),
            Err(_) => {
                log::error!("Decoder worker panicked");
                None
            }
        }
    }
}

impl<T> Drop for DecoderHandle<T> {
    fn drop(&mut self) {
        self.stop.stop();
    }
}
