//! Network information table acquisition.
//!
//! Every transport stream entry with a delivery system descriptor matching
//! the scanned delivery system becomes a transponder candidate. Alongside,
//! the decoder collects frequency lists, cell frequency links, service lists
//! and logical channel numbers.
//!
//! Descriptor tags 0x80..=0xFE are user defined: their meaning depends on the
//! private data specifier most recently seen in the same descriptor loop.

use std::sync::{Arc, Mutex};

use dvbscan_protocol::{Channel, Source, Transposer, UNSET};

use super::{lock, run_filter_loop, DecoderHandle, FilterSpec, Flow, LoopOutcome, PollPolicy, StopToken};
use crate::ts_analyzer::descriptors::{
    cell_frequency_links, logical_channels, service_list, CableDeliveryDescriptor,
    FrequencyListDescriptor, SatelliteDeliveryDescriptor, T2DeliveryDescriptor, TerrestrialDeliveryDescriptor,
};
use crate::ts_analyzer::{
    descriptor_tag, descriptors, private_data_specifier, table_id, NitTable, NitTransportStream, PsiSection,
};
use crate::tuner::Tuner;

/// Satellite entries further away than this (tenths of a degree) belong to
/// another position.
const MAX_ORBITAL_DISTANCE: i32 = 2;

/// Symbol rate stored for terrestrial transponders.
const TERRESTRIAL_SYMBOL_RATE: u32 = 27500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyListItem {
    pub network_id: u16,
    pub frequency: u32,
}

/// One cell of a cell frequency link descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellLink {
    pub network_id: u16,
    pub cell_id: u16,
    /// Hz.
    pub frequency: u32,
    pub subcells: Vec<Transposer>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceListItem {
    pub network_id: u16,
    pub original_network_id: u16,
    pub transport_stream_id: u16,
    pub service_id: u16,
    pub service_type: u8,
}

/// A visible logical channel number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LcnEntry {
    pub network_id: u16,
    pub original_network_id: u16,
    pub transport_stream_id: u16,
    pub service_id: u16,
    pub list_id: u32,
    pub hd_simulcast: bool,
    pub lcn: u16,
}

impl LcnEntry {
    /// Channel number of a service.
    ///
    /// Version 2 lists win over version 1 descriptors; among version 1
    /// entries the HD simulcast number wins.
    pub fn lookup(entries: &[LcnEntry], onid: u16, tid: u16, sid: u16) -> Option<u16> {
        entries
            .iter()
            .filter(|e| e.original_network_id == onid && e.transport_stream_id == tid && e.service_id == sid)
            .min_by_key(|e| (e.list_id, !e.hd_simulcast))
            .map(|e| e.lcn)
    }
}

/// What the network information tables of a run announced.
///
/// Transport streams, service lists and logical channels accumulate over the
/// whole run. Frequency lists and cell links describe the current
/// transponder and are cleared after each.
#[derive(Debug, Clone, Default)]
pub struct NitData {
    pub transport_streams: Vec<Channel>,
    pub frequency_list: Vec<FrequencyListItem>,
    pub cell_links: Vec<CellLink>,
    pub service_types: Vec<ServiceListItem>,
    pub lcn_entries: Vec<LcnEntry>,
}

impl NitData {
    pub fn clear_transponder(&mut self) {
        self.frequency_list.clear();
        self.cell_links.clear();
    }
}

/// Scan wide inputs of the NIT decoder.
#[derive(Debug, Clone)]
pub struct NitContext {
    /// Source of the scanned transponder; selects the delivery descriptors
    /// to decode and, for satellite, the orbital position to accept.
    pub source: Source,
    pub parse_lcn: bool,
    /// ISO 3166 alpha-3 code selecting version 2 logical channel lists.
    pub country_alpha3: String,
}

/// Merges NIT sections into a shared [`NitData`].
#[derive(Debug)]
pub struct NitDecoder {
    context: NitContext,
    data: Arc<Mutex<NitData>>,
    first_crc: Option<u32>,
}

impl NitDecoder {
    pub fn new(context: NitContext, data: Arc<Mutex<NitData>>) -> Self {
        Self {
            context,
            data,
            first_crc: None,
        }
    }

    pub fn process(&mut self, raw: &[u8]) -> Flow {
        let section = match PsiSection::parse_checked(raw) {
            Ok(s) => s,
            Err(e) => {
                log::debug!("NitDecoder: dropping section: {}", e);
                return Flow::Continue;
            }
        };

        match self.first_crc {
            Some(crc) if crc == section.crc32 => return Flow::Done,
            None => self.first_crc = Some(section.crc32),
            _ => {}
        }

        let nit = match NitTable::parse(&section) {
            Ok(t) => t,
            Err(e) => {
                log::debug!("NitDecoder: {}", e);
                return Flow::Continue;
            }
        };
        if let Some(name) = &nit.network_name {
            log::debug!("NitDecoder: network {:#06x} '{}'", nit.network_id, name);
        }

        let mut data = lock(&self.data);
        for ts in &nit.transport_streams {
            self.transport_stream(nit.network_id, ts, &mut data);
        }
        Flow::Continue
    }

    fn transport_stream(&self, nid: u16, ts: &NitTransportStream, data: &mut NitData) {
        let source = self.context.source;
        let mut pds = private_data_specifier::RESERVED;

        for d in ts.descriptors() {
            match d.tag {
                descriptor_tag::SATELLITE_DELIVERY if source.is_satellite() => {
                    match SatelliteDeliveryDescriptor::parse(d.data) {
                        Ok(sd) => {
                            if let Some(tp) = self.satellite(nid, ts, &sd) {
                                add_transport_stream(&mut data.transport_streams, tp);
                            }
                        }
                        Err(e) => log::debug!("NitDecoder: {}", e),
                    }
                }
                descriptor_tag::CABLE_DELIVERY if source == Source::Cable => {
                    match CableDeliveryDescriptor::parse(d.data) {
                        Ok(cd) => {
                            let mut tp = transponder(Source::Cable, nid, ts);
                            tp.frequency = cd.frequency;
                            tp.symbol_rate = cd.symbol_rate;
                            tp.fec = cd.fec();
                            tp.modulation = cd.modulation();
                            add_transport_stream(&mut data.transport_streams, tp);
                        }
                        Err(e) => log::debug!("NitDecoder: {}", e),
                    }
                }
                descriptor_tag::TERRESTRIAL_DELIVERY if source == Source::Terrestrial => {
                    match TerrestrialDeliveryDescriptor::parse(d.data) {
                        Ok(td) => {
                            let mut tp = transponder(Source::Terrestrial, nid, ts);
                            tp.frequency = td.centre_frequency;
                            tp.symbol_rate = TERRESTRIAL_SYMBOL_RATE;
                            tp.bandwidth = td.bandwidth();
                            tp.modulation = td.modulation();
                            tp.hierarchy = td.hierarchy();
                            tp.fec = td.fec_hp();
                            tp.fec_low = td.fec_lp();
                            tp.guard = td.guard();
                            tp.transmission = td.transmission();
                            tp.delsys = 0;
                            add_transport_stream(&mut data.transport_streams, tp);
                        }
                        Err(e) => log::debug!("NitDecoder: {}", e),
                    }
                }
                descriptor_tag::EXTENSION if source == Source::Terrestrial => {
                    if d.data.first() != Some(&descriptor_tag::EXT_T2_DELIVERY) {
                        continue;
                    }
                    match T2DeliveryDescriptor::parse(d.data) {
                        Ok(t2) => {
                            let mut tp = transponder(Source::Terrestrial, nid, ts);
                            tp.delsys = 1;
                            tp.frequency = t2.frequency();
                            tp.symbol_rate = TERRESTRIAL_SYMBOL_RATE;
                            tp.modulation = UNSET;
                            tp.hierarchy = 0;
                            tp.fec = UNSET;
                            tp.fec_low = 0;
                            tp.system_id = i32::from(t2.t2_system_id);
                            tp.stream_id = i32::from(t2.plp_id);
                            tp.bandwidth = t2.bandwidth();
                            tp.guard = t2.guard();
                            tp.transmission = t2.transmission();
                            tp.cells = t2.cells;
                            add_transport_stream(&mut data.transport_streams, tp);
                        }
                        Err(e) => log::debug!("NitDecoder: {}", e),
                    }
                }
                descriptor_tag::FREQUENCY_LIST => match FrequencyListDescriptor::parse(d.data) {
                    Ok(fl) if fl.coding_type > 0 => {
                        for frequency in fl.frequencies {
                            if !data.frequency_list.iter().any(|f| f.frequency == frequency) {
                                data.frequency_list.push(FrequencyListItem {
                                    network_id: nid,
                                    frequency,
                                });
                            }
                        }
                        data.frequency_list.sort_by_key(|f| (f.network_id, f.frequency));
                    }
                    Ok(_) => {}
                    Err(e) => log::debug!("NitDecoder: {}", e),
                },
                descriptor_tag::CELL_FREQUENCY_LINK if source == Source::Terrestrial => {
                    for link in cell_frequency_links(d.data) {
                        let known = data
                            .cell_links
                            .iter()
                            .any(|c| c.cell_id == link.cell_id && c.network_id == nid);
                        if !known {
                            data.cell_links.push(CellLink {
                                network_id: nid,
                                cell_id: link.cell_id,
                                frequency: link.frequency,
                                subcells: link.subcells,
                            });
                        }
                    }
                    data.cell_links.sort_by_key(|c| c.cell_id);
                }
                descriptor_tag::CELL_LIST if source == Source::Terrestrial => {
                    log::debug!("NitDecoder: cell list descriptor ignored");
                }
                descriptor_tag::SERVICE_LIST => {
                    for (service_id, service_type) in service_list(d.data) {
                        let known = data
                            .service_types
                            .iter()
                            .any(|s| s.service_id == service_id && s.network_id == nid);
                        if !known {
                            data.service_types.push(ServiceListItem {
                                network_id: nid,
                                original_network_id: ts.original_network_id,
                                transport_stream_id: ts.transport_stream_id,
                                service_id,
                                service_type,
                            });
                        }
                    }
                }
                descriptor_tag::PRIVATE_DATA_SPECIFIER => {
                    if let Some(value) = descriptors::private_data_specifier(d.data) {
                        if value != pds {
                            log::trace!("NitDecoder: private data specifier {:#010x}", value);
                        }
                        pds = value;
                    }
                }
                0x80..=0xFE => {
                    if !self.context.parse_lcn {
                        continue;
                    }
                    match logical_channels(pds, d.tag, d.data, &self.context.country_alpha3) {
                        Some(channels) => {
                            for lc in channels {
                                log::trace!(
                                    "NitDecoder: logical channel onid {} tid {} sid {} list {} lcn {}",
                                    ts.original_network_id,
                                    ts.transport_stream_id,
                                    lc.service_id,
                                    lc.list_id,
                                    lc.lcn
                                );
                                data.lcn_entries.push(LcnEntry {
                                    network_id: nid,
                                    original_network_id: ts.original_network_id,
                                    transport_stream_id: ts.transport_stream_id,
                                    service_id: lc.service_id,
                                    list_id: lc.list_id,
                                    hd_simulcast: lc.hd_simulcast,
                                    lcn: lc.lcn,
                                });
                            }
                        }
                        None => log::trace!(
                            "NitDecoder: descriptor {:#04x} unknown under specifier {:#010x}",
                            d.tag,
                            pds
                        ),
                    }
                }
                _ => {}
            }
        }
    }

    fn satellite(&self, nid: u16, ts: &NitTransportStream, sd: &SatelliteDeliveryDescriptor) -> Option<Channel> {
        let scanned = self.context.source;
        let (position, west) = match scanned {
            Source::Satellite { position, west } => (position, west),
            _ => return None,
        };
        let distance = (i32::from(sd.orbital_position) - i32::from(position)).abs();
        if sd.is_west() != west || distance > MAX_ORBITAL_DISTANCE {
            log::debug!(
                "NitDecoder: skipping transport stream for S{}.{}{}",
                sd.orbital_position / 10,
                sd.orbital_position % 10,
                if sd.is_west() { 'W' } else { 'E' }
            );
            return None;
        }

        let source = Source::Satellite {
            position: sd.orbital_position,
            west: sd.is_west(),
        };
        let mut tp = transponder(source, nid, ts);
        tp.frequency = sd.frequency;
        tp.symbol_rate = sd.symbol_rate;
        tp.polarization = Some(sd.polarization());
        tp.fec = sd.fec();
        tp.modulation = sd.modulation();
        tp.delsys = sd.delsys();
        tp.rolloff = sd.rolloff();
        Some(tp)
    }

    pub fn spawn(
        tuner: Arc<dyn Tuner>,
        network_pid: u16,
        context: NitContext,
        data: Arc<Mutex<NitData>>,
        policy: PollPolicy,
    ) -> DecoderHandle<LoopOutcome> {
        DecoderHandle::spawn("nit", move |stop: StopToken| {
            let mut decoder = NitDecoder::new(context, data);
            let outcome = run_filter_loop(
                tuner.as_ref(),
                FilterSpec::new(network_pid, table_id::NIT_ACTUAL),
                &policy,
                &stop,
                |raw| decoder.process(raw),
            );
            if outcome != LoopOutcome::Complete {
                log::debug!("NitDecoder: pid {} ended with {:?}", network_pid, outcome);
            }
            outcome
        })
    }
}

fn transponder(source: Source, nid: u16, ts: &NitTransportStream) -> Channel {
    let mut tp = Channel::new(source);
    tp.nid = nid;
    tp.onid = ts.original_network_id;
    tp.tid = ts.transport_stream_id;
    tp.inversion = UNSET;
    tp
}

fn add_transport_stream(list: &mut Vec<Channel>, tp: Channel) {
    let printed = tp.print_transponder();
    let known = list.iter().any(|t| {
        t.print_transponder() == printed
            && t.tid == tp.tid
            && (t.nid == tp.nid || t.onid == tp.onid)
            && (!tp.is_second_generation() || t.cells.len() == tp.cells.len())
    });
    if !known {
        log::debug!("NitDecoder: transport stream {} tid {}", printed, tp.tid);
        list.push(tp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts_analyzer::build_section;
    use crate::ts_analyzer::descriptors::LogicalChannel;
    use crate::ts_analyzer::private_data_specifier as pds;

    fn descriptor(tag: u8, body: &[u8]) -> Vec<u8> {
        let mut d = vec![tag, body.len() as u8];
        d.extend_from_slice(body);
        d
    }

    fn ts_entry(tid: u16, onid: u16, descriptors: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = descriptors.concat();
        let mut out = tid.to_be_bytes().to_vec();
        out.extend_from_slice(&onid.to_be_bytes());
        out.push(0xF0 | ((body.len() >> 8) as u8 & 0x0F));
        out.push(body.len() as u8);
        out.extend_from_slice(&body);
        out
    }

    fn nit(nid: u16, version: u8, entries: &[Vec<u8>]) -> Vec<u8> {
        let loop_body: Vec<u8> = entries.concat();
        let mut body = vec![0xF0, 0x00];
        body.push(0xF0 | ((loop_body.len() >> 8) as u8 & 0x0F));
        body.push(loop_body.len() as u8);
        body.extend_from_slice(&loop_body);
        build_section(table_id::NIT_ACTUAL, nid, version, 0, 0, &body)
    }

    fn terrestrial_delivery(centre_10hz: u32) -> Vec<u8> {
        let mut body = centre_10hz.to_be_bytes().to_vec();
        // 8 MHz, 64-QAM, non hierarchical, 2/3, 1/2, 1/4, 8k
        body.extend_from_slice(&[0x1F, 0x81, 0x1A, 0xFF, 0xFF, 0xFF, 0xFF]);
        descriptor(descriptor_tag::TERRESTRIAL_DELIVERY, &body)
    }

    fn context(source: Source) -> NitContext {
        NitContext {
            source,
            parse_lcn: true,
            country_alpha3: "DEU".to_string(),
        }
    }

    fn shared() -> Arc<Mutex<NitData>> {
        Arc::new(Mutex::new(NitData::default()))
    }

    #[test]
    fn test_terrestrial_transport_streams() {
        let data = shared();
        let mut decoder = NitDecoder::new(context(Source::Terrestrial), data.clone());
        let section = nit(
            0x3001,
            1,
            &[
                ts_entry(0x0401, 0x2114, &[terrestrial_delivery(47_400_000)]),
                // same transponder announced twice
                ts_entry(0x0401, 0x2114, &[terrestrial_delivery(47_400_000)]),
                ts_entry(0x0402, 0x2114, &[terrestrial_delivery(48_200_000)]),
            ],
        );
        assert_eq!(decoder.process(&section), Flow::Continue);
        assert_eq!(decoder.process(&section), Flow::Done);

        let data = data.lock().unwrap();
        assert_eq!(data.transport_streams.len(), 2);
        let tp = &data.transport_streams[0];
        assert_eq!(tp.source, Source::Terrestrial);
        assert_eq!(tp.frequency, 474_000_000);
        assert_eq!(tp.nid, 0x3001);
        assert_eq!(tp.onid, 0x2114);
        assert_eq!(tp.tid, 0x0401);
        assert_eq!(tp.symbol_rate, 27500);
        assert_eq!(tp.inversion, UNSET);
        assert_eq!(tp.delsys, 0);
    }

    #[test]
    fn test_delivery_descriptors_of_other_systems_are_ignored() {
        let data = shared();
        let mut decoder = NitDecoder::new(context(Source::Cable), data.clone());
        decoder.process(&nit(1, 0, &[ts_entry(1, 1, &[terrestrial_delivery(47_400_000)])]));
        assert!(data.lock().unwrap().transport_streams.is_empty());
    }

    #[test]
    fn test_cable_delivery() {
        // 346.000 MHz, 256-QAM, 6900 kSym/s, FEC auto
        let cable = descriptor(
            descriptor_tag::CABLE_DELIVERY,
            &[0x03, 0x46, 0x00, 0x00, 0xFF, 0xF0, 0x05, 0x00, 0x69, 0x00, 0x0F],
        );
        let data = shared();
        let mut decoder = NitDecoder::new(context(Source::Cable), data.clone());
        decoder.process(&nit(0xF001, 0, &[ts_entry(0x0011, 0x0085, &[cable])]));

        let data = data.lock().unwrap();
        assert_eq!(data.transport_streams.len(), 1);
        let tp = &data.transport_streams[0];
        assert_eq!(tp.source, Source::Cable);
        assert_eq!(tp.frequency, 346_000);
        assert_eq!(tp.symbol_rate, 6900);
        assert_eq!(tp.modulation, 256);
    }

    #[test]
    fn test_satellite_position_filter() {
        // 11.49400 GHz at 19.2E and at 13.0E
        let sat = |pos: [u8; 2]| {
            descriptor(
                descriptor_tag::SATELLITE_DELIVERY,
                &[0x01, 0x14, 0x94, 0x00, pos[0], pos[1], 0x80, 0x02, 0x20, 0x00, 0x03],
            )
        };
        let data = shared();
        let astra = Source::Satellite {
            position: 192,
            west: false,
        };
        let mut decoder = NitDecoder::new(context(astra), data.clone());
        decoder.process(&nit(
            1,
            0,
            &[ts_entry(1051, 1, &[sat([0x01, 0x92])]), ts_entry(1052, 1, &[sat([0x01, 0x30])])],
        ));

        let data = data.lock().unwrap();
        assert_eq!(data.transport_streams.len(), 1);
        let tp = &data.transport_streams[0];
        assert_eq!(tp.source, astra);
        assert_eq!(tp.frequency, 11494);
        assert_eq!(tp.symbol_rate, 22000);
        assert_eq!(tp.fec, 34);
        assert_eq!(tp.rolloff, 35);
        assert_eq!(tp.tid, 1051);
    }

    #[test]
    fn test_t2_with_cells() {
        // plp 0, system id 0x8001, 8 MHz, 1/128, 32k, one cell at 538 MHz
        let mut t2 = vec![descriptor_tag::EXT_T2_DELIVERY, 0x00, 0x80, 0x01, 0x00, 0x94, 0x00, 0x01];
        t2.extend_from_slice(&53_800_000u32.to_be_bytes());
        t2.push(0x00);
        let d = descriptor(descriptor_tag::EXTENSION, &t2);

        let data = shared();
        let mut decoder = NitDecoder::new(context(Source::Terrestrial), data.clone());
        decoder.process(&nit(0x3001, 0, &[ts_entry(0x0301, 0x2114, &[d])]));

        let data = data.lock().unwrap();
        assert_eq!(data.transport_streams.len(), 1);
        let tp = &data.transport_streams[0];
        assert_eq!(tp.delsys, 1);
        assert_eq!(tp.frequency, 538_000_000);
        assert_eq!(tp.system_id, 0x8001);
        assert_eq!(tp.stream_id, 0);
        assert_eq!(tp.modulation, UNSET);
        assert_eq!(tp.cells.len(), 1);
    }

    #[test]
    fn test_lists_and_links() {
        let freq_list = descriptor(
            descriptor_tag::FREQUENCY_LIST,
            &[0xFF, 0x02, 0xD3, 0x44, 0x40, 0x02, 0xDF, 0x79, 0x40],
        );
        let mut link = vec![0x00, 0x07];
        link.extend_from_slice(&47_400_000u32.to_be_bytes());
        link.push(5);
        link.push(0x01);
        link.extend_from_slice(&49_000_000u32.to_be_bytes());
        let links = descriptor(descriptor_tag::CELL_FREQUENCY_LINK, &link);
        let services = descriptor(descriptor_tag::SERVICE_LIST, &[0x00, 0x10, 0x01, 0x00, 0x11, 0x02]);

        let data = shared();
        let mut decoder = NitDecoder::new(context(Source::Terrestrial), data.clone());
        decoder.process(&nit(7, 0, &[ts_entry(1, 2, &[freq_list, links, services])]));

        let data = data.lock().unwrap();
        let freqs: Vec<u32> = data.frequency_list.iter().map(|f| f.frequency).collect();
        assert_eq!(freqs, vec![474_000_000, 482_000_000]);
        assert_eq!(data.cell_links.len(), 1);
        assert_eq!(data.cell_links[0].cell_id, 7);
        assert_eq!(data.cell_links[0].subcells[0].frequency, 490_000_000);
        assert_eq!(data.service_types.len(), 2);
        assert_eq!(data.service_types[1].service_type, 0x02);
        assert_eq!(data.service_types[1].transport_stream_id, 1);
    }

    #[test]
    fn test_lcn_needs_private_data_specifier() {
        // visible sid 0x10 on lcn 5
        let lcd = descriptor(descriptor_tag::LOGICAL_CHANNEL, &[0x00, 0x10, 0xFC, 0x05]);
        let eacem = descriptor(descriptor_tag::PRIVATE_DATA_SPECIFIER, &pds::EACEM.to_be_bytes());

        let data = shared();
        let mut decoder = NitDecoder::new(context(Source::Terrestrial), data.clone());
        decoder.process(&nit(1, 0, &[ts_entry(1, 2, &[lcd.clone()])]));
        assert!(data.lock().unwrap().lcn_entries.is_empty());

        // the specifier is reset for every transport stream
        let mut decoder = NitDecoder::new(context(Source::Terrestrial), data.clone());
        decoder.process(&nit(1, 1, &[ts_entry(1, 2, &[eacem, lcd.clone()]), ts_entry(3, 2, &[lcd])]));
        let data = data.lock().unwrap();
        assert_eq!(data.lcn_entries.len(), 1);
        assert_eq!(data.lcn_entries[0].lcn, 5);
        assert_eq!(data.lcn_entries[0].transport_stream_id, 1);
        assert_eq!(LcnEntry::lookup(&data.lcn_entries, 2, 1, 0x10), Some(5));
        assert_eq!(LcnEntry::lookup(&data.lcn_entries, 2, 3, 0x10), None);
    }

    #[test]
    fn test_lcn_lookup_preference() {
        let entry = |list_id, hd_simulcast, lcn| LcnEntry {
            network_id: 1,
            original_network_id: 2,
            transport_stream_id: 3,
            service_id: 4,
            list_id,
            hd_simulcast,
            lcn,
        };
        let v1 = LcnEntry::lookup(&[entry(LogicalChannel::V1_LIST, false, 1), entry(LogicalChannel::V1_LIST, true, 101)], 2, 3, 4);
        assert_eq!(v1, Some(101));
        let v2 = LcnEntry::lookup(&[entry(LogicalChannel::V1_LIST, true, 101), entry(4, false, 7)], 2, 3, 4);
        assert_eq!(v2, Some(7));
    }
}
