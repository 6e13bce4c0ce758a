//! NIT (Network Information Table) parsing.
//!
//! The NIT names the transport streams of a network together with their
//! delivery system descriptors.

use super::descriptors::DescriptorIter;
use super::psi::PsiSection;
use super::text::decode_dvb_text;
use super::{descriptor_tag, table_id};

/// Transport stream entry in the NIT.
#[derive(Debug, Clone, Default)]
pub struct NitTransportStream {
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    /// Transport descriptors (raw).
    pub descriptors: Vec<u8>,
}

impl NitTransportStream {
    pub fn descriptors(&self) -> DescriptorIter<'_> {
        DescriptorIter::new(&self.descriptors)
    }
}

/// One parsed NIT section.
#[derive(Debug, Clone, Default)]
pub struct NitTable {
    pub network_id: u16,
    pub version_number: u8,
    pub section_number: u8,
    pub last_section_number: u8,
    pub network_name: Option<String>,
    /// Network descriptors (raw).
    pub network_descriptors: Vec<u8>,
    pub transport_streams: Vec<NitTransportStream>,
}

impl NitTable {
    pub fn parse(section: &PsiSection) -> Result<Self, &'static str> {
        if section.header.table_id != table_id::NIT_ACTUAL
            && section.header.table_id != table_id::NIT_OTHER
        {
            return Err("Not a NIT section");
        }

        let data = section.data;
        if data.len() < 2 {
            return Err("NIT data too short");
        }

        let network_descriptors_length = ((data[0] as usize & 0x0F) << 8) | data[1] as usize;

        if data.len() < 2 + network_descriptors_length + 2 {
            return Err("Invalid network descriptors length");
        }

        let network_descriptors = data[2..2 + network_descriptors_length].to_vec();

        let network_name = DescriptorIter::new(&network_descriptors)
            .find(|d| d.tag == descriptor_tag::NETWORK_NAME)
            .map(|d| decode_dvb_text(d.data).text);

        let mut nit = NitTable {
            network_id: section.header.table_id_extension,
            version_number: section.header.version_number,
            section_number: section.header.section_number,
            last_section_number: section.header.last_section_number,
            network_name,
            network_descriptors,
            transport_streams: Vec::new(),
        };

        let ts_loop_offset = 2 + network_descriptors_length;
        let ts_loop_length =
            ((data[ts_loop_offset] as usize & 0x0F) << 8) | data[ts_loop_offset + 1] as usize;

        let mut offset = ts_loop_offset + 2;
        let ts_loop_end = (offset + ts_loop_length).min(data.len());

        while offset + 6 <= ts_loop_end {
            let transport_stream_id = u16::from_be_bytes([data[offset], data[offset + 1]]);
            let original_network_id = u16::from_be_bytes([data[offset + 2], data[offset + 3]]);
            let ts_descriptors_length =
                ((data[offset + 4] as usize & 0x0F) << 8) | data[offset + 5] as usize;

            offset += 6;

            if offset + ts_descriptors_length > ts_loop_end {
                break;
            }

            nit.transport_streams.push(NitTransportStream {
                transport_stream_id,
                original_network_id,
                descriptors: data[offset..offset + ts_descriptors_length].to_vec(),
            });
            offset += ts_descriptors_length;
        }

        Ok(nit)
    }

    pub fn is_last_section(&self) -> bool {
        self.section_number == self.last_section_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts_analyzer::psi::build_section;

    #[test]
    fn test_parse_nit() {
        let body = [
            // Network descriptors length = 8
            0xF0, 0x08,
            // Network name descriptor: tag=0x40, length=6, "Net001"
            0x40, 0x06, b'N', b'e', b't', b'0', b'0', b'1',
            // Transport stream loop length = 16
            0xF0, 0x10,
            // TS entry: TSID=0x0401, ONID=0x0001, descriptors_length=2
            0x04, 0x01, 0x00, 0x01, 0xF0, 0x02,
            0xFF, 0x00,
            // TS entry: TSID=0x0402, ONID=0x0001, no descriptors
            0x04, 0x02, 0x00, 0x01, 0xF0, 0x00,
        ];
        let raw = build_section(table_id::NIT_ACTUAL, 0x0001, 1, 0, 1, &body);
        let section = PsiSection::parse_checked(&raw).unwrap();
        let nit = NitTable::parse(&section).unwrap();

        assert_eq!(nit.network_id, 0x0001);
        assert_eq!(nit.network_name.as_deref(), Some("Net001"));
        assert_eq!(nit.transport_streams.len(), 2);
        assert_eq!(nit.transport_streams[0].transport_stream_id, 0x0401);
        assert_eq!(nit.transport_streams[0].descriptors().count(), 1);
        assert_eq!(nit.transport_streams[1].transport_stream_id, 0x0402);
        assert!(!nit.is_last_section());
    }

    #[test]
    fn test_truncated_transport_stream_loop() {
        // loop length claims more than is present
        let body = [0xF0, 0x00, 0xF0, 0x20, 0x04, 0x01, 0x00, 0x01, 0xF0, 0x10, 0x00];
        let raw = build_section(table_id::NIT_OTHER, 2, 0, 0, 0, &body);
        let section = PsiSection::parse(&raw).unwrap();
        let nit = NitTable::parse(&section).unwrap();
        assert!(nit.transport_streams.is_empty());
        assert!(nit.is_last_section());
    }

    #[test]
    fn test_not_a_nit() {
        let raw = build_section(table_id::SDT_ACTUAL, 2, 0, 0, 0, &[0xF0, 0x00, 0xF0, 0x00]);
        let section = PsiSection::parse(&raw).unwrap();
        assert!(NitTable::parse(&section).is_err());
    }
}
