//! Descriptor parsing for PSI/SI tables.
//!
//! This module handles parsing of the descriptors found in the PMT, NIT and
//! SDT that a channel scan cares about. Every parser takes the descriptor
//! body, i.e. the bytes after tag and length.

use dvbscan_protocol::{Cell, Polarization, Transposer, UNSET};

use super::descriptor_tag;
use super::private_data_specifier as pds;
use super::text::{decode_dvb_text, DvbText};

/// One descriptor of a descriptor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor<'a> {
    pub tag: u8,
    pub data: &'a [u8],
}

/// Iterator over a descriptor loop. Stops at the first truncated descriptor.
#[derive(Debug, Clone)]
pub struct DescriptorIter<'a> {
    data: &'a [u8],
}

impl<'a> DescriptorIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }
}

impl<'a> Iterator for DescriptorIter<'a> {
    type Item = Descriptor<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.len() < 2 {
            return None;
        }
        let tag = self.data[0];
        let length = self.data[1] as usize;
        if self.data.len() < 2 + length {
            self.data = &[];
            return None;
        }
        let descriptor = Descriptor {
            tag,
            data: &self.data[2..2 + length],
        };
        self.data = &self.data[2 + length..];
        Some(descriptor)
    }
}

/// Read the first `digits` BCD nibbles of `bytes`, most significant first.
pub fn bcd_to_u32(bytes: &[u8], digits: usize) -> u32 {
    let mut value = 0u32;
    for i in 0..digits {
        let Some(&byte) = bytes.get(i / 2) else {
            break;
        };
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0F };
        value = value * 10 + nibble as u32;
    }
    value
}

fn rounded_div(value: u32, divisor: u32) -> u32 {
    (value + divisor / 2) / divisor
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Inner FEC field of satellite and cable delivery descriptors.
pub fn fec_inner(code: u8) -> i32 {
    match code {
        1 => 12,
        2 => 23,
        3 => 34,
        4 => 56,
        5 => 78,
        6 => 89,
        7 => 35,
        8 => 45,
        9 => 910,
        15 => 0,
        _ => UNSET,
    }
}

/// ISO 639 language codes of an ISO_639_language_descriptor (0x0A).
pub fn iso639_languages(data: &[u8]) -> Vec<String> {
    data.chunks_exact(4)
        .map(|entry| String::from_utf8_lossy(&entry[..3]).into_owned())
        .collect()
}

/// CA system id of a CA descriptor (0x09).
pub fn ca_system_id(data: &[u8]) -> Option<u16> {
    (data.len() >= 2).then(|| u16::from_be_bytes([data[0], data[1]]))
}

/// Languages of a subtitling descriptor (0x59), one per 8-byte entry.
pub fn subtitling_languages(data: &[u8]) -> Vec<String> {
    data.chunks_exact(8)
        .map(|entry| String::from_utf8_lossy(&entry[..3]).into_owned())
        .collect()
}

/// Private data specifier descriptor (0x5F).
pub fn private_data_specifier(data: &[u8]) -> Option<u32> {
    (data.len() >= 4).then(|| be_u32(data))
}

/// Service descriptor (0x48).
#[derive(Debug, Clone, Default)]
pub struct ServiceDescriptor {
    pub service_type: u8,
    pub provider_name: DvbText,
    pub service_name: DvbText,
}

impl ServiceDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, &'static str> {
        if data.len() < 3 {
            return Err("Service descriptor too short");
        }

        let service_type = data[0];
        let provider_name_length = data[1] as usize;

        if data.len() < 2 + provider_name_length + 1 {
            return Err("Invalid provider name length");
        }

        let provider_name = decode_dvb_text(&data[2..2 + provider_name_length]);

        let service_name_offset = 2 + provider_name_length;
        let service_name_length = data[service_name_offset] as usize;

        if data.len() < service_name_offset + 1 + service_name_length {
            return Err("Invalid service name length");
        }

        let service_name = decode_dvb_text(
            &data[service_name_offset + 1..service_name_offset + 1 + service_name_length],
        );

        Ok(ServiceDescriptor {
            service_type,
            provider_name,
            service_name,
        })
    }
}

/// Satellite delivery system descriptor (0x43).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SatelliteDeliveryDescriptor {
    /// MHz.
    pub frequency: u32,
    /// Tenths of a degree.
    pub orbital_position: u16,
    /// Set for east positions.
    pub west_east_flag: bool,
    pub polarization: u8,
    pub roll_off: u8,
    /// Set for DVB-S2.
    pub modulation_system: bool,
    pub modulation_type: u8,
    /// kSym/s.
    pub symbol_rate: u32,
    pub fec_inner: u8,
}

impl SatelliteDeliveryDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, &'static str> {
        if data.len() < 11 {
            return Err("Satellite delivery descriptor too short");
        }
        let flags = data[6];
        Ok(Self {
            // 8 digits in 10 kHz units
            frequency: rounded_div(bcd_to_u32(&data[0..4], 8), 100),
            orbital_position: bcd_to_u32(&data[4..6], 4) as u16,
            west_east_flag: flags & 0x80 != 0,
            polarization: (flags >> 5) & 0x03,
            roll_off: (flags >> 3) & 0x03,
            modulation_system: (flags >> 2) & 0x01 != 0,
            modulation_type: flags & 0x03,
            // 7 digits in 100 sym/s units
            symbol_rate: rounded_div(bcd_to_u32(&data[7..11], 7), 10),
            fec_inner: data[10] & 0x0F,
        })
    }

    pub fn is_west(&self) -> bool {
        !self.west_east_flag
    }

    pub fn polarization(&self) -> Polarization {
        Polarization::from_bits(self.polarization)
    }

    pub fn delsys(&self) -> i32 {
        i32::from(self.modulation_system)
    }

    /// QPSK for DVB-S; DVB-S2 may signal 8PSK or 16APSK.
    pub fn modulation(&self) -> i32 {
        match (self.modulation_system, self.modulation_type) {
            (true, 2) => 5,
            (true, 3) => 16,
            _ => 2,
        }
    }

    pub fn rolloff(&self) -> i32 {
        match (self.modulation_system, self.roll_off) {
            (true, 1) => 25,
            (true, 2) => 20,
            _ => 35,
        }
    }

    pub fn fec(&self) -> i32 {
        fec_inner(self.fec_inner)
    }
}

/// S2 satellite delivery system descriptor (0x79).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct S2SatelliteDeliveryDescriptor {
    pub scrambling_sequence_index: Option<u32>,
    pub multiple_input_stream_identifier: Option<u8>,
    pub backwards_compatibility: bool,
}

impl S2SatelliteDeliveryDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, &'static str> {
        let Some(&flags) = data.first() else {
            return Err("S2 satellite delivery descriptor too short");
        };
        let mut offset = 1;
        let scrambling_sequence_index = if flags & 0x80 != 0 {
            let b = data.get(offset..offset + 3).ok_or("Truncated scrambling sequence index")?;
            offset += 3;
            Some(((b[0] as u32 & 0x03) << 16) | (b[1] as u32) << 8 | b[2] as u32)
        } else {
            None
        };
        let multiple_input_stream_identifier = if flags & 0x40 != 0 {
            Some(*data.get(offset).ok_or("Truncated input stream identifier")?)
        } else {
            None
        };
        Ok(Self {
            scrambling_sequence_index,
            multiple_input_stream_identifier,
            backwards_compatibility: flags & 0x20 != 0,
        })
    }
}

/// Cable delivery system descriptor (0x44).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CableDeliveryDescriptor {
    /// kHz.
    pub frequency: u32,
    pub fec_outer: u8,
    pub modulation: u8,
    /// kSym/s.
    pub symbol_rate: u32,
    pub fec_inner: u8,
}

impl CableDeliveryDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, &'static str> {
        if data.len() < 11 {
            return Err("Cable delivery descriptor too short");
        }
        Ok(Self {
            // 8 digits in 100 Hz units
            frequency: rounded_div(bcd_to_u32(&data[0..4], 8), 10),
            fec_outer: data[5] & 0x0F,
            modulation: data[6],
            symbol_rate: rounded_div(bcd_to_u32(&data[7..11], 7), 10),
            fec_inner: data[10] & 0x0F,
        })
    }

    /// QAM order.
    pub fn modulation(&self) -> i32 {
        match self.modulation {
            1 => 16,
            2 => 32,
            3 => 64,
            4 => 128,
            5 => 256,
            _ => UNSET,
        }
    }

    pub fn fec(&self) -> i32 {
        fec_inner(self.fec_inner)
    }
}

fn terrestrial_code_rate(code: u8) -> i32 {
    match code {
        0 => 12,
        1 => 23,
        2 => 34,
        3 => 56,
        4 => 78,
        _ => UNSET,
    }
}

/// Terrestrial delivery system descriptor (0x5A).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrestrialDeliveryDescriptor {
    /// Hz.
    pub centre_frequency: u32,
    pub bandwidth: u8,
    pub constellation: u8,
    pub hierarchy_information: u8,
    pub code_rate_hp: u8,
    pub code_rate_lp: u8,
    pub guard_interval: u8,
    pub transmission_mode: u8,
    pub other_frequency: bool,
}

impl TerrestrialDeliveryDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, &'static str> {
        if data.len() < 7 {
            return Err("Terrestrial delivery descriptor too short");
        }
        Ok(Self {
            centre_frequency: be_u32(&data[0..4]).wrapping_mul(10),
            bandwidth: data[4] >> 5,
            constellation: data[5] >> 6,
            hierarchy_information: (data[5] >> 3) & 0x07,
            code_rate_hp: data[5] & 0x07,
            code_rate_lp: data[6] >> 5,
            guard_interval: (data[6] >> 3) & 0x03,
            transmission_mode: (data[6] >> 1) & 0x03,
            other_frequency: data[6] & 0x01 != 0,
        })
    }

    /// MHz; reserved values fall back to 8.
    pub fn bandwidth(&self) -> i32 {
        match self.bandwidth {
            1 => 7,
            2 => 6,
            3 => 5,
            _ => 8,
        }
    }

    pub fn modulation(&self) -> i32 {
        match self.constellation {
            0 => 2,
            1 => 16,
            2 => 64,
            _ => UNSET,
        }
    }

    pub fn hierarchy(&self) -> i32 {
        match self.hierarchy_information {
            1 => 1,
            2 => 2,
            3 => 4,
            _ => 0,
        }
    }

    pub fn fec_hp(&self) -> i32 {
        terrestrial_code_rate(self.code_rate_hp)
    }

    pub fn fec_lp(&self) -> i32 {
        terrestrial_code_rate(self.code_rate_lp)
    }

    pub fn guard(&self) -> i32 {
        match self.guard_interval {
            0 => 32,
            1 => 16,
            2 => 8,
            _ => 4,
        }
    }

    pub fn transmission(&self) -> i32 {
        match self.transmission_mode {
            0 => 2,
            1 => 8,
            2 => 4,
            _ => UNSET,
        }
    }
}

/// T2 delivery system descriptor (extension 0x04 of tag 0x7F).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct T2DeliveryDescriptor {
    pub plp_id: u8,
    pub t2_system_id: u16,
    pub siso_miso: u8,
    pub bandwidth: u8,
    pub guard_interval: u8,
    pub transmission_mode: u8,
    pub other_frequency: bool,
    pub tfs: bool,
    pub cells: Vec<Cell>,
}

impl T2DeliveryDescriptor {
    /// `data` is the extension descriptor body, starting at the extension tag.
    pub fn parse(data: &[u8]) -> Result<Self, &'static str> {
        if data.len() < 4 || data[0] != descriptor_tag::EXT_T2_DELIVERY {
            return Err("Not a T2 delivery descriptor");
        }
        let mut t2 = Self {
            plp_id: data[1],
            t2_system_id: u16::from_be_bytes([data[2], data[3]]),
            ..Default::default()
        };
        if data.len() < 6 {
            return Ok(t2);
        }

        t2.siso_miso = data[4] >> 6;
        t2.bandwidth = (data[4] >> 2) & 0x0F;
        t2.guard_interval = data[5] >> 5;
        t2.transmission_mode = (data[5] >> 2) & 0x07;
        t2.other_frequency = data[5] & 0x02 != 0;
        t2.tfs = data[5] & 0x01 != 0;

        let mut rest = &data[6..];
        while rest.len() >= 2 {
            let mut cell = Cell {
                cell_id: u16::from_be_bytes([rest[0], rest[1]]),
                ..Default::default()
            };
            rest = &rest[2..];

            if t2.tfs {
                let Some((&loop_length, tail)) = rest.split_first() else {
                    break;
                };
                let loop_length = (loop_length as usize).min(tail.len());
                for f in tail[..loop_length].chunks_exact(4) {
                    if cell.center_frequencies.len() < Cell::MAX_CENTER_FREQUENCIES {
                        cell.center_frequencies.push(be_u32(f).wrapping_mul(10));
                    }
                }
                rest = &tail[loop_length..];
            } else {
                if rest.len() < 4 {
                    break;
                }
                cell.center_frequencies.push(be_u32(rest).wrapping_mul(10));
                rest = &rest[4..];
            }

            let Some((&subcell_length, tail)) = rest.split_first() else {
                t2.cells.push(cell);
                break;
            };
            let subcell_length = (subcell_length as usize).min(tail.len());
            for sub in tail[..subcell_length].chunks_exact(5) {
                if cell.transposers.len() < Cell::MAX_TRANSPOSERS {
                    cell.transposers.push(Transposer {
                        cell_id_extension: sub[0],
                        frequency: be_u32(&sub[1..]).wrapping_mul(10),
                    });
                }
            }
            rest = &tail[subcell_length..];
            t2.cells.push(cell);
        }
        Ok(t2)
    }

    /// MHz, or 1712 for 1.712 MHz.
    pub fn bandwidth(&self) -> i32 {
        match self.bandwidth {
            1 => 7,
            2 => 6,
            3 => 5,
            4 => 10,
            5 => 1712,
            _ => 8,
        }
    }

    pub fn guard(&self) -> i32 {
        match self.guard_interval {
            0 => 32,
            1 => 16,
            2 => 8,
            3 => 4,
            4 => 128,
            5 => 19128,
            6 => 19256,
            _ => UNSET,
        }
    }

    pub fn transmission(&self) -> i32 {
        match self.transmission_mode {
            0 => 2,
            1 => 8,
            2 => 4,
            3 => 1,
            4 => 16,
            5 => 32,
            _ => UNSET,
        }
    }

    /// First center frequency of the first cell, 0 if none was announced.
    pub fn frequency(&self) -> u32 {
        self.cells
            .first()
            .and_then(|c| c.center_frequencies.first())
            .copied()
            .unwrap_or(0)
    }
}

/// Frequency list descriptor (0x62), converted to the unit of the coding
/// type: MHz for satellite, kHz for cable, Hz for terrestrial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyListDescriptor {
    pub coding_type: u8,
    pub frequencies: Vec<u32>,
}

impl FrequencyListDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, &'static str> {
        let Some((&first, rest)) = data.split_first() else {
            return Err("Frequency list descriptor too short");
        };
        let coding_type = first & 0x03;
        let frequencies = rest
            .chunks_exact(4)
            .map(|f| match coding_type {
                1 => rounded_div(bcd_to_u32(f, 8), 100),
                2 => rounded_div(bcd_to_u32(f, 8), 10),
                3 => be_u32(f).wrapping_mul(10),
                _ => be_u32(f),
            })
            .collect();
        Ok(Self {
            coding_type,
            frequencies,
        })
    }
}

/// One cell of a cell frequency link descriptor (0x6D).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellFrequencyLink {
    pub cell_id: u16,
    /// Hz.
    pub frequency: u32,
    pub subcells: Vec<Transposer>,
}

pub fn cell_frequency_links(data: &[u8]) -> Vec<CellFrequencyLink> {
    let mut links = Vec::new();
    let mut rest = data;
    while rest.len() >= 7 {
        let cell_id = u16::from_be_bytes([rest[0], rest[1]]);
        let frequency = be_u32(&rest[2..6]).wrapping_mul(10);
        let subcell_length = (rest[6] as usize).min(rest.len() - 7);
        let subcells = rest[7..7 + subcell_length]
            .chunks_exact(5)
            .map(|sub| Transposer {
                cell_id_extension: sub[0],
                frequency: be_u32(&sub[1..]).wrapping_mul(10),
            })
            .collect();
        links.push(CellFrequencyLink {
            cell_id,
            frequency,
            subcells,
        });
        rest = &rest[7 + subcell_length..];
    }
    links
}

/// Service list descriptor (0x41): `(service_id, service_type)` pairs.
pub fn service_list(data: &[u8]) -> Vec<(u16, u8)> {
    data.chunks_exact(3)
        .map(|e| (u16::from_be_bytes([e[0], e[1]]), e[2]))
        .collect()
}

/// Visible entry of a logical channel descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalChannel {
    pub service_id: u16,
    pub lcn: u16,
    /// Channel list id of a version 2 descriptor, [`LogicalChannel::V1_LIST`] otherwise.
    pub list_id: u32,
    pub hd_simulcast: bool,
}

impl LogicalChannel {
    /// List id given to version 1 entries, outside the 8-bit v2 range.
    pub const V1_LIST: u32 = 100_000;
}

fn logical_channels_v1(data: &[u8], mask: u16, hd_simulcast: bool) -> Vec<LogicalChannel> {
    data.chunks_exact(4)
        .filter(|e| e[2] & 0x80 != 0)
        .map(|e| LogicalChannel {
            service_id: u16::from_be_bytes([e[0], e[1]]),
            lcn: u16::from_be_bytes([e[2], e[3]]) & mask,
            list_id: LogicalChannel::V1_LIST,
            hd_simulcast,
        })
        .collect()
}

/// Version 2 descriptors carry one channel list per country; lists of other
/// countries are skipped.
fn logical_channels_v2(data: &[u8], country_alpha3: &str) -> Vec<LogicalChannel> {
    let mut out = Vec::new();
    let mut rest = data;
    while rest.len() >= 2 {
        let list_id = rest[0] as u32;
        let name_length = rest[1] as usize;
        let Some(header) = rest.get(2 + name_length..2 + name_length + 4) else {
            break;
        };
        let country: String = header[..3]
            .iter()
            .map(|&b| (b as char).to_ascii_uppercase())
            .collect();
        let body_start = 2 + name_length + 4;
        let body_length = (header[3] as usize).min(rest.len() - body_start);
        let body = &rest[body_start..body_start + body_length];
        rest = &rest[body_start + body_length..];

        if !country.eq_ignore_ascii_case(country_alpha3) {
            log::debug!("Ignoring logical channel list {}: country '{}'", list_id, country);
            continue;
        }
        out.extend(
            body.chunks_exact(4)
                .filter(|e| e[2] & 0x80 != 0)
                .map(|e| LogicalChannel {
                    service_id: u16::from_be_bytes([e[0], e[1]]),
                    lcn: ((e[2] as u16 & 0x03) << 8) | e[3] as u16,
                    list_id,
                    hd_simulcast: false,
                }),
        );
    }
    out
}

/// Decode a user defined descriptor (0x80..=0xFE) as a logical channel
/// descriptor, interpreted under the private data specifier in force.
/// Returns `None` if the pair is not a known logical channel descriptor.
pub fn logical_channels(
    private_data_specifier: u32,
    tag: u8,
    data: &[u8],
    country_alpha3: &str,
) -> Option<Vec<LogicalChannel>> {
    use descriptor_tag::{HD_SIMULCAST_LOGICAL_CHANNEL, LOGICAL_CHANNEL, NORDIG_LOGICAL_CHANNEL_V2};

    match (private_data_specifier, tag) {
        (pds::EACEM, LOGICAL_CHANNEL) => Some(logical_channels_v1(data, 0x3FF, false)),
        (pds::EACEM, HD_SIMULCAST_LOGICAL_CHANNEL) => Some(logical_channels_v1(data, 0x3FF, true)),
        (pds::NORDIG, LOGICAL_CHANNEL) => Some(logical_channels_v1(data, 0x3FFF, false)),
        (pds::SINGAPORE, LOGICAL_CHANNEL) => Some(logical_channels_v1(data, 0x3FF, false)),
        (pds::NORDIG | pds::SINGAPORE, NORDIG_LOGICAL_CHANNEL_V2) => {
            Some(logical_channels_v2(data, country_alpha3))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_iter_stops_on_truncation() {
        let data = [0x0A, 0x04, b'd', b'e', b'u', 0x00, 0x09, 0x04, 0x17];
        let all: Vec<_> = DescriptorIter::new(&data).collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].tag, 0x0A);
        assert_eq!(iso639_languages(all[0].data), vec!["deu".to_string()]);
    }

    #[test]
    fn test_bcd() {
        assert_eq!(bcd_to_u32(&[0x01, 0x14, 0x94, 0x00], 8), 1_149_400);
        assert_eq!(bcd_to_u32(&[0x02, 0x75, 0x00, 0x03], 7), 275_000);
    }

    #[test]
    fn test_satellite_delivery() {
        // 11.49400 GHz, 19.2E, H, S2 8PSK roll-off 0.20, 22000 kSym/s, 2/3
        let data = [0x01, 0x14, 0x94, 0x00, 0x01, 0x92, 0x80 | 0x10 | 0x04 | 0x02, 0x02, 0x20, 0x00, 0x02];
        let sd = SatelliteDeliveryDescriptor::parse(&data).unwrap();
        assert_eq!(sd.frequency, 11494);
        assert_eq!(sd.orbital_position, 192);
        assert!(!sd.is_west());
        assert_eq!(sd.polarization(), Polarization::Horizontal);
        assert_eq!(sd.symbol_rate, 22000);
        assert_eq!(sd.delsys(), 1);
        assert_eq!(sd.modulation(), 5);
        assert_eq!(sd.rolloff(), 20);
        assert_eq!(sd.fec(), 23);

        let mut dvbs = data;
        dvbs[6] = 0x20; // west, vertical, DVB-S
        let sd = SatelliteDeliveryDescriptor::parse(&dvbs).unwrap();
        assert!(sd.is_west());
        assert_eq!(sd.polarization(), Polarization::Vertical);
        assert_eq!(sd.modulation(), 2);
        assert_eq!(sd.rolloff(), 35);
    }

    #[test]
    fn test_cable_delivery() {
        // 346 MHz, 256-QAM, 6900 kSym/s, FEC not defined
        let data = [0x03, 0x46, 0x00, 0x00, 0xFF, 0xF2, 0x05, 0x00, 0x69, 0x00, 0x00];
        let cd = CableDeliveryDescriptor::parse(&data).unwrap();
        assert_eq!(cd.frequency, 346_000);
        assert_eq!(cd.symbol_rate, 6900);
        assert_eq!(cd.modulation(), 256);
        assert_eq!(cd.fec(), UNSET);
        assert!(CableDeliveryDescriptor::parse(&data[..10]).is_err());
    }

    #[test]
    fn test_terrestrial_delivery() {
        let hz10 = 474_000_000u32 / 10;
        let mut data = hz10.to_be_bytes().to_vec();
        data.push(0b001_00000); // 7 MHz
        data.push(0b10_011_001); // 64-QAM, hierarchy 3, HP 2/3
        data.push(0b100_11_01_0); // LP 7/8, 1/4, 8k
        data.extend_from_slice(&[0xFF; 4]);
        let td = TerrestrialDeliveryDescriptor::parse(&data).unwrap();
        assert_eq!(td.centre_frequency, 474_000_000);
        assert_eq!(td.bandwidth(), 7);
        assert_eq!(td.modulation(), 64);
        assert_eq!(td.hierarchy(), 4);
        assert_eq!(td.fec_hp(), 23);
        assert_eq!(td.fec_lp(), 78);
        assert_eq!(td.guard(), 4);
        assert_eq!(td.transmission(), 8);
    }

    #[test]
    fn test_t2_delivery_with_cells() {
        let mut data = vec![0x04, 0x01, 0x00, 0x0C];
        data.push(0b00_0010_00); // 6 MHz
        data.push(0b100_101_0_0); // 1/128, 32k, no tfs
        data.extend_from_slice(&[0x00, 0x07]);
        data.extend_from_slice(&(626_000_000u32 / 10).to_be_bytes());
        data.push(5);
        data.push(0x01);
        data.extend_from_slice(&(634_000_000u32 / 10).to_be_bytes());

        let t2 = T2DeliveryDescriptor::parse(&data).unwrap();
        assert_eq!(t2.plp_id, 1);
        assert_eq!(t2.t2_system_id, 12);
        assert_eq!(t2.bandwidth(), 6);
        assert_eq!(t2.guard(), 128);
        assert_eq!(t2.transmission(), 32);
        assert_eq!(t2.cells.len(), 1);
        assert_eq!(t2.cells[0].cell_id, 7);
        assert_eq!(t2.frequency(), 626_000_000);
        assert_eq!(t2.cells[0].transposers[0].frequency, 634_000_000);

        let short = T2DeliveryDescriptor::parse(&[0x04, 0x00, 0x00, 0x01]).unwrap();
        assert_eq!(short.frequency(), 0);
        assert_eq!(short.bandwidth(), 8);
    }

    #[test]
    fn test_t2_delivery_tfs_frequency_loop() {
        let mut data = vec![0x04, 0x00, 0x00, 0x01, 0x00, 0b000_001_0_1];
        data.extend_from_slice(&[0x00, 0x01, 8]);
        data.extend_from_slice(&(474_000_000u32 / 10).to_be_bytes());
        data.extend_from_slice(&(482_000_000u32 / 10).to_be_bytes());
        data.push(0);
        let t2 = T2DeliveryDescriptor::parse(&data).unwrap();
        assert!(t2.tfs);
        assert_eq!(t2.cells[0].center_frequencies, vec![474_000_000, 482_000_000]);
    }

    #[test]
    fn test_frequency_list_coding_types() {
        let sat = FrequencyListDescriptor::parse(&[0xFD, 0x01, 0x17, 0x27, 0x50]).unwrap();
        assert_eq!(sat.frequencies, vec![11728]);
        let cable = FrequencyListDescriptor::parse(&[0xFE, 0x03, 0x46, 0x00, 0x00]).unwrap();
        assert_eq!(cable.frequencies, vec![346_000]);
        let mut terr = vec![0xFF];
        terr.extend_from_slice(&(490_000_000u32 / 10).to_be_bytes());
        assert_eq!(FrequencyListDescriptor::parse(&terr).unwrap().frequencies, vec![490_000_000]);
    }

    #[test]
    fn test_cell_frequency_links() {
        let mut data = vec![0x00, 0x05];
        data.extend_from_slice(&(506_000_000u32 / 10).to_be_bytes());
        data.push(5);
        data.push(0x02);
        data.extend_from_slice(&(514_000_000u32 / 10).to_be_bytes());
        data.extend_from_slice(&[0x00, 0x06]);
        data.extend_from_slice(&(522_000_000u32 / 10).to_be_bytes());
        data.push(0);

        let links = cell_frequency_links(&data);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].frequency, 506_000_000);
        assert_eq!(links[0].subcells[0].cell_id_extension, 2);
        assert_eq!(links[1].cell_id, 6);
        assert!(links[1].subcells.is_empty());
    }

    #[test]
    fn test_logical_channels_by_private_data_specifier() {
        let data = [0x00, 0x10, 0xFC, 0x01, 0x00, 0x11, 0x7C, 0x02];
        let eacem = logical_channels(pds::EACEM, 0x83, &data, "FRA").unwrap();
        assert_eq!(eacem.len(), 1);
        assert_eq!(eacem[0].service_id, 0x10);
        assert_eq!(eacem[0].lcn, 0x001);
        assert_eq!(eacem[0].list_id, LogicalChannel::V1_LIST);

        let nordig = logical_channels(pds::NORDIG, 0x83, &data, "SWE").unwrap();
        assert_eq!(nordig[0].lcn, 0x3C01);

        assert!(logical_channels(pds::RESERVED, 0x83, &data, "DEU").is_none());
        assert!(logical_channels(pds::EACEM, 0x87, &data, "DEU").is_none());
        assert!(logical_channels(pds::EACEM, 0x88, &data, "FRA").unwrap()[0].hd_simulcast);
    }

    #[test]
    fn test_logical_channels_v2_country_filter() {
        let mut data = vec![3, 2, b'N', b'O', b'n', b'o', b'r', 8];
        data.extend_from_slice(&[0x00, 0x20, 0x80, 0x05, 0x00, 0x21, 0x00, 0x06]);
        data.extend_from_slice(&[4, 0, b'S', b'W', b'E', 4, 0x00, 0x30, 0x81, 0x02]);

        let no = logical_channels(pds::NORDIG, 0x87, &data, "NOR").unwrap();
        assert_eq!(no.len(), 1);
        assert_eq!(no[0].service_id, 0x20);
        assert_eq!(no[0].lcn, 5);
        assert_eq!(no[0].list_id, 3);

        let se = logical_channels(pds::SINGAPORE, 0x87, &data, "SWE").unwrap();
        assert_eq!(se.len(), 1);
        assert_eq!(se[0].lcn, 0x102);
    }

    #[test]
    fn test_service_descriptor() {
        let mut data = vec![0x01, 3];
        data.extend_from_slice(b"ARD");
        data.push(12);
        data.extend_from_slice(b"Das Erste HD");
        let sd = ServiceDescriptor::parse(&data).unwrap();
        assert_eq!(sd.service_type, 1);
        assert_eq!(sd.provider_name.text, "ARD");
        assert_eq!(sd.service_name.text, "Das Erste HD");
        assert!(ServiceDescriptor::parse(&data[..10]).is_err());
    }
}
