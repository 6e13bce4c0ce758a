//! Service description table acquisition.
//!
//! Services accumulate across every transponder of a run; only the original
//! network id belongs to the transponder currently scanned.

use std::sync::{Arc, Mutex};

use super::{lock, run_filter_loop, DecoderHandle, FilterSpec, Flow, LoopOutcome, PollPolicy, StopToken};
use crate::ts_analyzer::{pid, table_id, PsiSection, SdtTable};
use crate::tuner::Tuner;

/// A named service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SdtEntry {
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub service_id: u16,
    pub free_ca_mode: bool,
    pub service_type: u16,
    pub name: String,
    pub short_name: String,
    pub provider: String,
}

#[derive(Debug, Clone, Default)]
pub struct SdtData {
    /// Taken from the first section of the current transponder.
    pub original_network_id: u16,
    pub services: Vec<SdtEntry>,
}

impl SdtData {
    /// Service `sid` of transport stream `tid`.
    pub fn find(&self, tid: u16, sid: u16) -> Option<&SdtEntry> {
        self.services
            .iter()
            .find(|s| s.transport_stream_id == tid && s.service_id == sid)
    }
}

/// Merges SDT actual sections into a shared [`SdtData`].
#[derive(Debug)]
pub struct SdtDecoder {
    data: Arc<Mutex<SdtData>>,
    first_crc: Option<u32>,
}

impl SdtDecoder {
    pub fn new(data: Arc<Mutex<SdtData>>) -> Self {
        Self { data, first_crc: None }
    }

    pub fn process(&mut self, raw: &[u8]) -> Flow {
        let section = match PsiSection::parse_checked(raw) {
            Ok(s) => s,
            Err(e) => {
                log::debug!("SdtDecoder: dropping section: {}", e);
                return Flow::Continue;
            }
        };

        match self.first_crc {
            Some(crc) if crc == section.crc32 => return Flow::Done,
            None => self.first_crc = Some(section.crc32),
            _ => {}
        }

        let sdt = match SdtTable::parse(&section) {
            Ok(t) => t,
            Err(e) => {
                log::debug!("SdtDecoder: {}", e);
                return Flow::Continue;
            }
        };

        let mut data = lock(&self.data);
        if data.original_network_id == 0 {
            data.original_network_id = sdt.original_network_id;
        }

        for service in sdt.services {
            if service.name.is_empty() {
                continue;
            }
            let known = data.services.iter().any(|s| {
                s.transport_stream_id == sdt.transport_stream_id
                    && s.original_network_id == sdt.original_network_id
                    && s.service_id == service.service_id
            });
            if known {
                continue;
            }
            log::trace!("SdtDecoder: {:#06x} '{}'", service.service_id, service.name);
            data.services.push(SdtEntry {
                transport_stream_id: sdt.transport_stream_id,
                original_network_id: sdt.original_network_id,
                service_id: service.service_id,
                free_ca_mode: service.free_ca_mode,
                service_type: service.service_type,
                name: service.name,
                short_name: service.short_name,
                provider: service.provider,
            });
        }
        Flow::Continue
    }

    pub fn spawn(tuner: Arc<dyn Tuner>, data: Arc<Mutex<SdtData>>, policy: PollPolicy) -> DecoderHandle<LoopOutcome> {
        DecoderHandle::spawn("sdt", move |stop: StopToken| {
            let mut decoder = SdtDecoder::new(data);
            let outcome = run_filter_loop(
                tuner.as_ref(),
                FilterSpec::new(pid::SDT, table_id::SDT_ACTUAL),
                &policy,
                &stop,
                |raw| decoder.process(raw),
            );
            if outcome != LoopOutcome::Complete {
                log::debug!("SdtDecoder: ended with {:?}", outcome);
            }
            outcome
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts_analyzer::build_section;

    fn service_loop(sid: u16, scrambled: bool, service_type: u8, provider: &str, name: &str) -> Vec<u8> {
        let mut sd = vec![0x48, 0, service_type, provider.len() as u8];
        sd.extend_from_slice(provider.as_bytes());
        sd.push(name.len() as u8);
        sd.extend_from_slice(name.as_bytes());
        sd[1] = (sd.len() - 2) as u8;

        let flags = 0x80 | if scrambled { 0x10 } else { 0 };
        let mut out = sid.to_be_bytes().to_vec();
        out.push(0xFC);
        out.push(flags | ((sd.len() >> 8) as u8 & 0x0F));
        out.push(sd.len() as u8);
        out.extend_from_slice(&sd);
        out
    }

    fn sdt(tid: u16, onid: u16, services: &[Vec<u8>]) -> Vec<u8> {
        let mut body = onid.to_be_bytes().to_vec();
        body.push(0xFF);
        for s in services {
            body.extend_from_slice(s);
        }
        build_section(table_id::SDT_ACTUAL, tid, 0, 0, 0, &body)
    }

    #[test]
    fn test_services_and_repeat() {
        let shared = Arc::new(Mutex::new(SdtData::default()));
        let mut decoder = SdtDecoder::new(shared.clone());
        let section = sdt(
            0x0401,
            0x0001,
            &[
                service_loop(0x6D66, false, 0x01, "ARD", "Das Erste HD"),
                service_loop(0x6D67, true, 0x02, "ARD", ""),
                service_loop(0x6D68, true, 0x02, "UPC", "Radio Wien>Wien"),
            ],
        );
        assert_eq!(decoder.process(&section), Flow::Continue);
        assert_eq!(decoder.process(&section), Flow::Done);

        let data = shared.lock().unwrap();
        assert_eq!(data.original_network_id, 1);
        // unnamed services are dropped
        assert_eq!(data.services.len(), 2);
        let first = data.find(0x0401, 0x6D66).unwrap();
        assert_eq!(first.name, "Das Erste HD");
        assert_eq!(first.provider, "ARD");
        assert!(!first.free_ca_mode);
        let radio = data.find(0x0401, 0x6D68).unwrap();
        assert_eq!(radio.name, "Radio Wien");
        assert_eq!(radio.short_name, "Wien");
        assert!(radio.free_ca_mode);
        assert_eq!(radio.service_type, 0x02);
    }

    #[test]
    fn test_accumulates_across_decoders() {
        let shared = Arc::new(Mutex::new(SdtData::default()));
        let a = sdt(1, 0x85, &[service_loop(10, false, 1, "P", "One")]);
        let b = sdt(2, 0x85, &[service_loop(10, false, 1, "P", "One"), service_loop(11, false, 1, "P", "Two")]);

        SdtDecoder::new(shared.clone()).process(&a);
        // next transponder
        shared.lock().unwrap().original_network_id = 0;
        let mut second = SdtDecoder::new(shared.clone());
        second.process(&b);
        second.process(&a);

        let data = shared.lock().unwrap();
        assert_eq!(data.original_network_id, 0x85);
        assert_eq!(data.services.len(), 3);
        assert!(data.find(2, 11).is_some());
    }
}
