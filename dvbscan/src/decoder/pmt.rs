//! Program map table acquisition, one worker per service.

use std::sync::Arc;

use super::{run_filter_loop, DecoderHandle, FilterSpec, Flow, PollPolicy, StopToken};
use crate::ts_analyzer::pmt::ServicePids;
use crate::ts_analyzer::{table_id, PmtTable, PsiSection};
use crate::tuner::Tuner;

/// Streams of one service.
#[derive(Debug, Clone, Default)]
pub struct PmtData {
    pub program_number: u16,
    pub pmt_pid: u16,
    pub pids: ServicePids,
    pub complete: bool,
}

/// Waits for the first valid PMT section of one program.
#[derive(Debug)]
pub struct PmtDecoder {
    data: PmtData,
}

impl PmtDecoder {
    pub fn new(program_number: u16, pmt_pid: u16) -> Self {
        Self {
            data: PmtData {
                program_number,
                pmt_pid,
                ..Default::default()
            },
        }
    }

    pub fn process(&mut self, raw: &[u8]) -> Flow {
        let section = match PsiSection::parse_checked(raw) {
            Ok(s) => s,
            Err(e) => {
                log::debug!("PmtDecoder: dropping section on pid {}: {}", self.data.pmt_pid, e);
                return Flow::Continue;
            }
        };
        let pmt = match PmtTable::parse(&section) {
            Ok(p) => p,
            Err(e) => {
                log::debug!("PmtDecoder: {}", e);
                return Flow::Continue;
            }
        };
        // several programs may share one PMT pid
        if self.data.program_number != 0 && pmt.program_number != self.data.program_number {
            return Flow::Continue;
        }

        self.data.program_number = pmt.program_number;
        self.data.pids = pmt.service_pids();
        self.data.complete = true;
        Flow::Done
    }

    pub fn into_data(self) -> PmtData {
        self.data
    }

    pub fn spawn(
        tuner: Arc<dyn Tuner>,
        program_number: u16,
        pmt_pid: u16,
        policy: PollPolicy,
    ) -> DecoderHandle<PmtData> {
        DecoderHandle::spawn("pmt", move |stop: StopToken| {
            let mut decoder = PmtDecoder::new(program_number, pmt_pid);
            let outcome = run_filter_loop(
                tuner.as_ref(),
                FilterSpec::new(pmt_pid, table_id::PMT),
                &policy,
                &stop,
                |raw| decoder.process(raw),
            );
            log::trace!("PmtDecoder: pid {} ended with {:?}", pmt_pid, outcome);
            decoder.into_data()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts_analyzer::{build_section, stream_type};
    use crate::tuner::mock::{MockTransponder, MockTuner};
    use dvbscan_protocol::{Channel, Source};
    use std::time::Duration;

    /// PMT with one MPEG-2 video and one MPEG audio stream.
    fn pmt_section(program_number: u16, vpid: u16, apid: u16) -> Vec<u8> {
        let mut body = vec![0xE0 | (vpid >> 8) as u8, vpid as u8, 0xF0, 0x00];
        body.extend_from_slice(&[stream_type::MPEG2_VIDEO, 0xE0 | (vpid >> 8) as u8, vpid as u8, 0xF0, 0x00]);
        body.extend_from_slice(&[stream_type::MPEG1_AUDIO, 0xE0 | (apid >> 8) as u8, apid as u8, 0xF0, 0x00]);
        build_section(table_id::PMT, program_number, 0, 0, 0, &body)
    }

    #[test]
    fn test_first_section_completes() {
        let mut decoder = PmtDecoder::new(0x6D66, 0x64);
        assert_eq!(decoder.process(&pmt_section(0x6D67, 0x100, 0x101)), Flow::Continue);
        assert_eq!(decoder.process(&pmt_section(0x6D66, 0x200, 0x201)), Flow::Done);

        let data = decoder.into_data();
        assert!(data.complete);
        assert_eq!(data.pmt_pid, 0x64);
        assert_eq!(data.pids.vpid.pid, 0x200);
        assert_eq!(data.pids.pcr_pid, 0x200);
        assert_eq!(data.pids.apids.len(), 1);
        assert_eq!(data.pids.apids[0].pid, 0x201);
    }

    #[test]
    fn test_pmt_worker_times_out_without_data() {
        let mut tp = Channel::new(Source::Cable);
        tp.frequency = 346_000;
        let tuner = Arc::new(MockTuner::new(vec![MockTransponder::new(tp.clone())]));
        tuner.switch(&tp).unwrap();

        let policy = PollPolicy {
            max_polls: 5,
            max_polls_without_data: None,
            tick: Duration::from_micros(50),
        };
        let data = PmtDecoder::spawn(tuner, 1, 0x100, policy).join().unwrap();
        assert!(!data.complete);
        assert_eq!(data.program_number, 1);
    }
}
