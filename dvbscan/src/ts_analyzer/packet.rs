//! MPEG-TS packet parsing.
//!
//! This module handles parsing of 188-byte MPEG Transport Stream packets and
//! the reverse, splitting a PSI section into packets.

/// TS packet size in bytes.
pub const TS_PACKET_SIZE: usize = 188;

/// TS sync byte (0x47).
pub const SYNC_BYTE: u8 = 0x47;

/// Parsed TS packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TsHeader {
    pub transport_error: bool,
    pub payload_unit_start: bool,
    /// Packet Identifier (13 bits).
    pub pid: u16,
    /// Transport scrambling control (2 bits).
    pub scrambling_control: u8,
    /// Adaptation field control (2 bits).
    pub adaptation_field_control: u8,
    /// Continuity counter (4 bits).
    pub continuity_counter: u8,
}

impl TsHeader {
    pub fn has_adaptation_field(&self) -> bool {
        self.adaptation_field_control & 0x02 != 0
    }

    pub fn has_payload(&self) -> bool {
        self.adaptation_field_control & 0x01 != 0
    }

    pub fn is_scrambled(&self) -> bool {
        self.scrambling_control != 0
    }
}

/// A parsed TS packet.
#[derive(Debug, Clone)]
pub struct TsPacket<'a> {
    pub header: TsHeader,
    /// Payload after any adaptation field.
    pub payload: &'a [u8],
}

impl<'a> TsPacket<'a> {
    /// Parse a TS packet from the first 188 bytes of `data`.
    pub fn parse(data: &'a [u8]) -> Result<Self, &'static str> {
        if data.len() < TS_PACKET_SIZE {
            return Err("Packet too short");
        }

        if data[0] != SYNC_BYTE {
            return Err("Invalid sync byte");
        }

        let header = TsHeader {
            transport_error: data[1] & 0x80 != 0,
            payload_unit_start: data[1] & 0x40 != 0,
            pid: ((data[1] as u16 & 0x1F) << 8) | data[2] as u16,
            scrambling_control: (data[3] >> 6) & 0x03,
            adaptation_field_control: (data[3] >> 4) & 0x03,
            continuity_counter: data[3] & 0x0F,
        };

        let offset = if header.has_adaptation_field() {
            5 + data[4] as usize
        } else {
            4
        };

        let payload = if header.has_payload() && offset < TS_PACKET_SIZE {
            &data[offset..TS_PACKET_SIZE]
        } else {
            &[]
        };

        Ok(TsPacket { header, payload })
    }

    /// True if the payload can carry PSI: no transport error, not scrambled.
    pub fn carries_psi(&self) -> bool {
        !self.header.transport_error && !self.header.is_scrambled() && !self.payload.is_empty()
    }
}

/// Iterator over TS packets in a byte stream, skipping garbage between
/// packets.
pub struct TsPacketIterator<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> TsPacketIterator<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        let offset = data.iter().position(|&b| b == SYNC_BYTE).unwrap_or(data.len());
        Self { data, offset }
    }

    fn resync(&mut self) {
        self.offset += 1;
        while self.offset < self.data.len() && self.data[self.offset] != SYNC_BYTE {
            self.offset += 1;
        }
    }
}

impl<'a> Iterator for TsPacketIterator<'a> {
    type Item = TsPacket<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.offset + TS_PACKET_SIZE <= self.data.len() {
            // a real packet boundary is followed by another sync byte or EOF
            let next = self.offset + TS_PACKET_SIZE;
            if next < self.data.len() && self.data[next] != SYNC_BYTE {
                self.resync();
                continue;
            }
            match TsPacket::parse(&self.data[self.offset..]) {
                Ok(packet) => {
                    self.offset = next;
                    return Some(packet);
                }
                Err(_) => self.resync(),
            }
        }
        None
    }
}

/// Split one section into TS packets on `pid`, starting at continuity
/// counter `cc`. Unused payload bytes are stuffed with 0xFF.
pub fn packetize_section(pid: u16, section: &[u8], cc: &mut u8) -> Vec<[u8; TS_PACKET_SIZE]> {
    let mut packets = Vec::new();
    let mut remaining = section;
    let mut first = true;

    while first || !remaining.is_empty() {
        let mut packet = [0xFFu8; TS_PACKET_SIZE];
        packet[0] = SYNC_BYTE;
        packet[1] = ((pid >> 8) as u8 & 0x1F) | if first { 0x40 } else { 0x00 };
        packet[2] = pid as u8;
        packet[3] = 0x10 | (*cc & 0x0F);
        *cc = (*cc + 1) & 0x0F;

        let mut offset = 4;
        if first {
            packet[offset] = 0; // pointer field
            offset += 1;
        }
        let n = remaining.len().min(TS_PACKET_SIZE - offset);
        packet[offset..offset + n].copy_from_slice(&remaining[..n]);
        remaining = &remaining[n..];
        first = false;
        packets.push(packet);
    }
    packets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts_analyzer::psi::{build_section, SectionCollector};

    #[test]
    fn test_parse_null_packet() {
        let mut packet = [0u8; 188];
        packet[0] = SYNC_BYTE;
        packet[1] = 0x1F;
        packet[2] = 0xFF;
        packet[3] = 0x10;

        let parsed = TsPacket::parse(&packet).unwrap();
        assert_eq!(parsed.header.pid, 0x1FFF);
        assert!(parsed.header.has_payload());
        assert!(!parsed.header.has_adaptation_field());
        assert_eq!(parsed.payload.len(), 184);
    }

    #[test]
    fn test_adaptation_field_is_skipped() {
        let mut packet = [0u8; 188];
        packet[0] = SYNC_BYTE;
        packet[1] = 0x40;
        packet[3] = 0x30; // adaptation field and payload
        packet[4] = 7;
        let parsed = TsPacket::parse(&packet).unwrap();
        assert!(parsed.header.payload_unit_start);
        assert_eq!(parsed.payload.len(), 188 - 12);
    }

    #[test]
    fn test_invalid_sync_byte() {
        let packet = [0u8; 188];
        assert!(TsPacket::parse(&packet).is_err());
    }

    #[test]
    fn test_iterator_resyncs_after_garbage() {
        let section = build_section(0x00, 1, 0, 0, 0, &[0x00, 0x01, 0xE1, 0x00]);
        let mut cc = 0;
        let mut stream = vec![0x12, 0x47, 0x00];
        for p in packetize_section(0, &section, &mut cc) {
            stream.extend_from_slice(&p);
        }
        for p in packetize_section(0, &section, &mut cc) {
            stream.extend_from_slice(&p);
        }
        let packets: Vec<_> = TsPacketIterator::new(&stream).collect();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[1].header.continuity_counter, 1);
    }

    #[test]
    fn test_packetize_long_section_round_trips_through_collector() {
        let section = build_section(0x42, 7, 1, 0, 0, &[0x20; 400]);
        let mut cc = 14;
        let packets = packetize_section(0x11, &section, &mut cc);
        assert_eq!(packets.len(), 3);
        assert_eq!(cc, 1);

        let mut collector = SectionCollector::new();
        let mut out = Vec::new();
        for raw in &packets {
            let p = TsPacket::parse(raw).unwrap();
            assert_eq!(p.header.pid, 0x11);
            out.extend(collector.push(p.payload, p.header.continuity_counter, p.header.payload_unit_start));
        }
        assert_eq!(out, vec![section]);
    }
}
