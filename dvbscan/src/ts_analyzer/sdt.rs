//! SDT (Service Description Table) parsing.
//!
//! The SDT is transmitted on PID 0x0011 and names the services of a
//! transport stream.

use super::descriptors::{DescriptorIter, ServiceDescriptor};
use super::psi::PsiSection;
use super::{descriptor_tag, table_id};

/// Service entry in the SDT.
#[derive(Debug, Clone)]
pub struct SdtService {
    pub service_id: u16,
    pub running_status: u8,
    pub free_ca_mode: bool,
    /// 0xFFFF without a service descriptor.
    pub service_type: u16,
    pub name: String,
    pub short_name: String,
    pub provider: String,
}

impl SdtService {
    fn from_descriptors(service_id: u16, running_status: u8, free_ca_mode: bool, descriptors: &[u8]) -> Self {
        let mut service = SdtService {
            service_id,
            running_status,
            free_ca_mode,
            service_type: 0xFFFF,
            name: String::new(),
            short_name: String::new(),
            provider: String::new(),
        };

        for d in DescriptorIter::new(descriptors) {
            if d.tag != descriptor_tag::SERVICE {
                continue;
            }
            match ServiceDescriptor::parse(d.data) {
                Ok(sd) => {
                    let (name, short_name) = split_short_name(sd.service_name.text, sd.service_name.short);
                    service.name = name;
                    service.short_name = short_name;
                    service.provider = sd.provider_name.text;
                    service.service_type = sd.service_type as u16;
                }
                Err(e) => log::debug!("SDT: service {}: {}", service_id, e),
            }
        }
        service
    }
}

/// Without an emphasised short name, some networks append one after '>'
/// ("name>short") or ',' ("name, short").
fn split_short_name(name: String, short: String) -> (String, String) {
    if !short.is_empty() {
        return (name, short);
    }
    let pos = name.find('>').or_else(|| name.find(','));
    match pos {
        Some(p) if p > 0 => {
            let short = name[p + 1..].trim_start().to_string();
            let name = name[..p].trim_end().to_string();
            (name, short)
        }
        _ => (name, short),
    }
}

/// One parsed SDT section.
#[derive(Debug, Clone, Default)]
pub struct SdtTable {
    pub transport_stream_id: u16,
    pub original_network_id: u16,
    pub version_number: u8,
    pub services: Vec<SdtService>,
}

impl SdtTable {
    pub fn parse(section: &PsiSection) -> Result<Self, &'static str> {
        if section.header.table_id != table_id::SDT_ACTUAL {
            return Err("Not a SDT actual section");
        }

        let data = section.data;
        if data.len() < 3 {
            return Err("SDT data too short");
        }

        let mut sdt = SdtTable {
            transport_stream_id: section.header.table_id_extension,
            original_network_id: u16::from_be_bytes([data[0], data[1]]),
            version_number: section.header.version_number,
            services: Vec::new(),
        };

        // data[2] is reserved
        let mut offset = 3;
        while offset + 5 <= data.len() {
            let service_id = u16::from_be_bytes([data[offset], data[offset + 1]]);
            let running_status = (data[offset + 3] >> 5) & 0x07;
            let free_ca_mode = data[offset + 3] & 0x10 != 0;
            let descriptors_length =
                ((data[offset + 3] as usize & 0x0F) << 8) | data[offset + 4] as usize;

            offset += 5;

            if offset + descriptors_length > data.len() {
                break;
            }

            sdt.services.push(SdtService::from_descriptors(
                service_id,
                running_status,
                free_ca_mode,
                &data[offset..offset + descriptors_length],
            ));
            offset += descriptors_length;
        }

        Ok(sdt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts_analyzer::psi::build_section;

    fn service(sid: u16, free_ca: bool, provider: &[u8], name: &[u8]) -> Vec<u8> {
        let mut sd = vec![0x48, (3 + provider.len() + name.len()) as u8, 0x01, provider.len() as u8];
        sd.extend_from_slice(provider);
        sd.push(name.len() as u8);
        sd.extend_from_slice(name);

        let mut v = sid.to_be_bytes().to_vec();
        v.push(0xFC);
        let ca_flag = if free_ca { 0x10 } else { 0x00 };
        v.push(0x80 | ca_flag | (sd.len() >> 8) as u8);
        v.push(sd.len() as u8);
        v.extend_from_slice(&sd);
        v
    }

    #[test]
    fn test_parse_sdt() {
        let mut body = vec![0x00, 0x01, 0xFF];
        body.extend(service(28106, false, b"ARD", b"Das Erste HD"));
        body.extend(service(28107, true, b"ZDFvision", b"\x86ZDF\x87neo"));
        let raw = build_section(table_id::SDT_ACTUAL, 1019, 4, 0, 0, &body);
        let section = PsiSection::parse_checked(&raw).unwrap();
        let sdt = SdtTable::parse(&section).unwrap();

        assert_eq!(sdt.transport_stream_id, 1019);
        assert_eq!(sdt.original_network_id, 1);
        assert_eq!(sdt.services.len(), 2);
        let ard = &sdt.services[0];
        assert_eq!(ard.name, "Das Erste HD");
        assert_eq!(ard.provider, "ARD");
        assert_eq!(ard.service_type, 1);
        assert!(!ard.free_ca_mode);
        assert_eq!(ard.running_status, 4);
        let zdf = &sdt.services[1];
        assert_eq!(zdf.name, "ZDFneo");
        assert_eq!(zdf.short_name, "ZDF");
        assert!(zdf.free_ca_mode);
    }

    #[test]
    fn test_service_without_descriptor() {
        let mut body = vec![0x00, 0x01, 0xFF];
        body.extend_from_slice(&[0x00, 0x10, 0xFC, 0x80, 0x00]);
        let raw = build_section(table_id::SDT_ACTUAL, 1, 0, 0, 0, &body);
        let section = PsiSection::parse(&raw).unwrap();
        let sdt = SdtTable::parse(&section).unwrap();
        assert_eq!(sdt.services[0].service_type, 0xFFFF);
        assert!(sdt.services[0].name.is_empty());
    }

    #[test]
    fn test_split_short_name() {
        assert_eq!(
            split_short_name("ORF1>ORF".into(), String::new()),
            ("ORF1".to_string(), "ORF".to_string())
        );
        assert_eq!(
            split_short_name("Sat.1 Bayern , Sat1".into(), String::new()),
            ("Sat.1 Bayern".to_string(), "Sat1".to_string())
        );
        // '>' wins over ','
        assert_eq!(
            split_short_name("a,b>c".into(), String::new()),
            ("a,b".to_string(), "c".to_string())
        );
        // separator at position 0 is not a split
        assert_eq!(
            split_short_name(",x".into(), String::new()),
            (",x".to_string(), String::new())
        );
        assert_eq!(
            split_short_name("A, B".into(), "S".into()),
            ("A, B".to_string(), "S".to_string())
        );
    }
}
