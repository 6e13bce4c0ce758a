//! PMT (Program Map Table) parsing.
//!
//! The PMT lists the elementary streams of one program. [`PmtTable::service_pids`]
//! classifies them into the video, audio, Dolby/DTS/AAC, subtitle and
//! teletext PIDs of a channel record.

use dvbscan_protocol::Pid;

use super::descriptors::{ca_system_id, iso639_languages, subtitling_languages, DescriptorIter};
use super::psi::PsiSection;
use super::{descriptor_tag, stream_type, table_id};

/// Languages joined per stream.
const MAX_LANGUAGES: usize = 2;

/// A single elementary stream entry in the PMT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmtStream {
    pub stream_type: u8,
    pub elementary_pid: u16,
    /// ES info descriptor loop (raw).
    pub descriptors: Vec<u8>,
}

impl PmtStream {
    pub fn is_video(&self) -> bool {
        matches!(
            self.stream_type,
            stream_type::MPEG1_VIDEO
                | stream_type::MPEG2_VIDEO
                | stream_type::MPEG4_VIDEO
                | stream_type::H264_VIDEO
                | stream_type::H265_VIDEO
        )
    }

    pub fn is_audio(&self) -> bool {
        matches!(
            self.stream_type,
            stream_type::MPEG1_AUDIO
                | stream_type::MPEG2_AUDIO
                | stream_type::AAC_AUDIO
                | stream_type::AAC_LATM
                | stream_type::MPEG4_AUDIO
        )
    }
}

/// Parsed PMT (Program Map Table).
#[derive(Debug, Clone, Default)]
pub struct PmtTable {
    /// Program number (service ID).
    pub program_number: u16,
    pub version_number: u8,
    pub pcr_pid: u16,
    /// Program info descriptors (raw).
    pub program_info: Vec<u8>,
    pub streams: Vec<PmtStream>,
}

/// Elementary stream PIDs of one service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServicePids {
    pub vpid: Pid,
    pub pcr_pid: u16,
    pub apids: Vec<Pid>,
    pub dpids: Vec<Pid>,
    pub spids: Vec<Pid>,
    pub tpid: u16,
    pub caids: Vec<u16>,
}

impl PmtTable {
    pub fn parse(section: &PsiSection) -> Result<Self, &'static str> {
        if section.header.table_id != table_id::PMT {
            return Err("Not a PMT section");
        }

        let data = section.data;
        if data.len() < 4 {
            return Err("PMT data too short");
        }

        let pcr_pid = ((data[0] as u16 & 0x1F) << 8) | data[1] as u16;
        let program_info_length = ((data[2] as usize & 0x0F) << 8) | data[3] as usize;

        if data.len() < 4 + program_info_length {
            return Err("Invalid program info length");
        }

        let mut pmt = PmtTable {
            program_number: section.header.table_id_extension,
            version_number: section.header.version_number,
            pcr_pid,
            program_info: data[4..4 + program_info_length].to_vec(),
            streams: Vec::new(),
        };

        let mut offset = 4 + program_info_length;
        while offset + 5 <= data.len() {
            let stream_type = data[offset];
            let elementary_pid = ((data[offset + 1] as u16 & 0x1F) << 8) | data[offset + 2] as u16;
            let es_info_length = ((data[offset + 3] as usize & 0x0F) << 8) | data[offset + 4] as usize;
            offset += 5;

            if offset + es_info_length > data.len() {
                break;
            }

            pmt.streams.push(PmtStream {
                stream_type,
                elementary_pid,
                descriptors: data[offset..offset + es_info_length].to_vec(),
            });
            offset += es_info_length;
        }

        Ok(pmt)
    }

    /// Classify the elementary streams.
    pub fn service_pids(&self) -> ServicePids {
        let mut out = ServicePids::default();

        for d in DescriptorIter::new(&self.program_info) {
            if d.tag == descriptor_tag::CA {
                add_caid(&mut out.caids, d.data);
            }
        }

        for stream in &self.streams {
            let pid = stream.elementary_pid;
            match stream.stream_type {
                _ if stream.is_video() => {
                    out.vpid = Pid::new(pid, stream.stream_type);
                    out.pcr_pid = self.pcr_pid;
                }
                _ if stream.is_audio() => {
                    let mut apid = Pid::new(pid, stream.stream_type);
                    for d in DescriptorIter::new(&stream.descriptors) {
                        if d.tag == descriptor_tag::ISO_639_LANGUAGE {
                            let codes = iso639_languages(d.data);
                            // "---" marks no language
                            if codes.first().is_some_and(|c| !c.starts_with('-')) {
                                apid.lang = join_languages(&codes);
                            }
                        }
                    }
                    out.apids.push(apid);
                }
                stream_type::PRIVATE_SECTIONS | stream_type::PES_PRIVATE_DATA => {
                    let mut dpid: Option<Pid> = None;
                    let mut lang = String::new();
                    for d in DescriptorIter::new(&stream.descriptors) {
                        match d.tag {
                            descriptor_tag::AC3
                            | descriptor_tag::ENHANCED_AC3
                            | descriptor_tag::DTS
                            | descriptor_tag::AAC => dpid = Some(Pid::new(pid, d.tag)),
                            descriptor_tag::SUBTITLING => {
                                let codes: Vec<String> = subtitling_languages(d.data)
                                    .into_iter()
                                    .filter(|c| !c.starts_with('\0'))
                                    .collect();
                                out.spids.push(Pid {
                                    pid,
                                    stream_type: 0,
                                    lang: join_languages(&codes),
                                });
                            }
                            descriptor_tag::TELETEXT => out.tpid = pid,
                            descriptor_tag::ISO_639_LANGUAGE => {
                                if let Some(code) = iso639_languages(d.data).into_iter().next() {
                                    lang = code;
                                }
                            }
                            _ => {}
                        }
                    }
                    if let Some(mut dpid) = dpid {
                        dpid.lang = lang;
                        out.dpids.push(dpid);
                    }
                }
                stream_type::ATSC_AC3 => {
                    let mut dpid = Pid::new(pid, descriptor_tag::AC3);
                    for d in DescriptorIter::new(&stream.descriptors) {
                        if d.tag == descriptor_tag::ISO_639_LANGUAGE {
                            if let Some(code) = iso639_languages(d.data).into_iter().next() {
                                dpid.lang = code;
                            }
                        }
                    }
                    out.dpids.push(dpid);
                }
                _ => {}
            }

            for d in DescriptorIter::new(&stream.descriptors) {
                if d.tag == descriptor_tag::CA {
                    add_caid(&mut out.caids, d.data);
                }
            }
        }

        out
    }
}

fn add_caid(caids: &mut Vec<u16>, data: &[u8]) {
    if let Some(ca) = ca_system_id(data) {
        if !caids.contains(&ca) {
            caids.push(ca);
        }
    }
}

fn join_languages(codes: &[String]) -> String {
    codes
        .iter()
        .take(MAX_LANGUAGES)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("+")
}
