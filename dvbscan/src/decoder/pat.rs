//! Program association table acquisition.

use std::collections::HashSet;
use std::sync::Arc;

use super::{run_filter_loop, DecoderHandle, FilterSpec, Flow, LoopOutcome, PollPolicy, StopToken};
use crate::ts_analyzer::{pid, table_id, PatEntry, PatTable, PsiSection, SectionSyncer};
use crate::tuner::Tuner;

/// Services of one transport stream.
#[derive(Debug, Clone, Default)]
pub struct PatData {
    pub transport_stream_id: u16,
    /// PID announced for program number 0, if any.
    pub network_pid: Option<u16>,
    pub services: Vec<PatEntry>,
    pub complete: bool,
}

/// Feeds sections of PID 0 into a [`PatData`].
#[derive(Debug, Default)]
pub struct PatDecoder {
    data: PatData,
    syncer: SectionSyncer,
    seen_crcs: HashSet<u32>,
}

impl PatDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one raw section.
    pub fn process(&mut self, raw: &[u8]) -> Flow {
        let section = match PsiSection::parse_checked(raw) {
            Ok(s) => s,
            Err(e) => {
                log::debug!("PatDecoder: dropping section: {}", e);
                return Flow::Continue;
            }
        };

        // the carousel came round again without news
        if self.seen_crcs.contains(&section.crc32) {
            self.data.complete = true;
            return Flow::Done;
        }

        let h = section.header;
        if !self.syncer.sync(h.version_number, h.section_number, h.last_section_number) {
            return Flow::Continue;
        }
        self.seen_crcs.insert(section.crc32);

        let pat = match PatTable::parse(&section) {
            Ok(p) => p,
            Err(e) => {
                log::debug!("PatDecoder: {}", e);
                return Flow::Continue;
            }
        };

        self.data.transport_stream_id = pat.transport_stream_id;
        if pat.network_pid.is_some() {
            self.data.network_pid = pat.network_pid;
        }
        for entry in pat.programs {
            if !self.data.services.iter().any(|s| s.program_number == entry.program_number) {
                self.data.services.push(entry);
            }
        }

        if self.syncer.is_complete() {
            self.data.complete = true;
            return Flow::Done;
        }
        Flow::Continue
    }

    pub fn into_data(self) -> PatData {
        self.data
    }

    /// Start a worker reading PID 0.
    pub fn spawn(tuner: Arc<dyn Tuner>, policy: PollPolicy) -> DecoderHandle<PatData> {
        DecoderHandle::spawn("pat", move |stop: StopToken| {
            let mut decoder = PatDecoder::new();
            let outcome = run_filter_loop(
                tuner.as_ref(),
                FilterSpec::new(pid::PAT, table_id::PAT),
                &policy,
                &stop,
                |raw| decoder.process(raw),
            );
            if outcome != LoopOutcome::Complete {
                log::debug!("PatDecoder: ended with {:?}", outcome);
            }
            decoder.into_data()
        })
    }
}
