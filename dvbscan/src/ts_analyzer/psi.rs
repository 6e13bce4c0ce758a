//! PSI section framing.
//!
//! Header parsing, CRC32/MPEG-2 validation, reassembly of sections from TS
//! packets and version-locked section tracking.

/// PSI section header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsiHeader {
    pub table_id: u8,
    pub section_syntax_indicator: bool,
    /// 12 bits, counts the bytes following the length field.
    pub section_length: u16,
    /// Transport stream id, program number, network id or service id
    /// depending on the table.
    pub table_id_extension: u16,
    pub version_number: u8,
    pub current_next_indicator: bool,
    pub section_number: u8,
    pub last_section_number: u8,
}

/// A PSI section borrowed from a capture buffer.
#[derive(Debug, Clone)]
pub struct PsiSection<'a> {
    pub header: PsiHeader,
    /// Payload between the header and the CRC.
    pub data: &'a [u8],
    pub crc32: u32,
    raw: &'a [u8],
}

impl<'a> PsiSection<'a> {
    /// Parse a section starting at `table_id`. Trailing bytes are ignored.
    pub fn parse(data: &'a [u8]) -> Result<Self, &'static str> {
        if data.len() < 3 {
            return Err("Section too short for header");
        }

        let table_id = data[0];
        let section_syntax_indicator = data[1] & 0x80 != 0;
        let section_length = ((data[1] as u16 & 0x0F) << 8) | data[2] as u16;
        if section_length < 5 {
            return Err("Section length too small");
        }

        let total_length = 3 + section_length as usize;
        if data.len() < total_length {
            return Err("Incomplete section data");
        }

        let header = if section_syntax_indicator {
            if total_length < 12 {
                return Err("Section too short for extended header");
            }
            PsiHeader {
                table_id,
                section_syntax_indicator,
                section_length,
                table_id_extension: u16::from_be_bytes([data[3], data[4]]),
                version_number: (data[5] >> 1) & 0x1F,
                current_next_indicator: data[5] & 0x01 != 0,
                section_number: data[6],
                last_section_number: data[7],
            }
        } else {
            PsiHeader {
                table_id,
                section_syntax_indicator,
                section_length,
                table_id_extension: 0,
                version_number: 0,
                current_next_indicator: true,
                section_number: 0,
                last_section_number: 0,
            }
        };

        let data_start = if section_syntax_indicator { 8 } else { 3 };
        let crc_offset = total_length - 4;
        let crc32 = u32::from_be_bytes([
            data[crc_offset],
            data[crc_offset + 1],
            data[crc_offset + 2],
            data[crc_offset + 3],
        ]);

        Ok(PsiSection {
            header,
            data: &data[data_start.min(crc_offset)..crc_offset],
            crc32,
            raw: &data[..total_length],
        })
    }

    /// Parse and reject sections whose CRC does not match.
    pub fn parse_checked(data: &'a [u8]) -> Result<Self, &'static str> {
        let section = Self::parse(data)?;
        if !section.verify_crc() {
            return Err("CRC mismatch");
        }
        Ok(section)
    }

    pub fn verify_crc(&self) -> bool {
        crc32_mpeg2(&self.raw[..self.raw.len() - 4]) == self.crc32
    }

    /// Header, payload and CRC.
    pub fn total_length(&self) -> usize {
        self.raw.len()
    }

    pub fn as_bytes(&self) -> &'a [u8] {
        self.raw
    }
}

/// Build a long-form section with a valid CRC around `body`.
pub fn build_section(
    table_id: u8,
    table_id_extension: u16,
    version: u8,
    section_number: u8,
    last_section_number: u8,
    body: &[u8],
) -> Vec<u8> {
    let section_length = 5 + body.len() + 4;
    let mut out = Vec::with_capacity(3 + section_length);
    out.push(table_id);
    out.push(0xB0 | ((section_length >> 8) as u8 & 0x0F));
    out.push(section_length as u8);
    out.extend_from_slice(&table_id_extension.to_be_bytes());
    out.push(0xC1 | ((version & 0x1F) << 1));
    out.push(section_number);
    out.push(last_section_number);
    out.extend_from_slice(body);
    let crc = crc32_mpeg2(&out);
    out.extend_from_slice(&crc.to_be_bytes());
    out
}

/// Reassembles sections of one PID from TS packet payloads.
#[derive(Debug, Default)]
pub struct SectionCollector {
    buffer: Vec<u8>,
    last_cc: Option<u8>,
}

impl SectionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.last_cc = None;
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Feed one packet payload and return every section completed by it.
    ///
    /// With `payload_unit_start` set the first byte is the pointer field; the
    /// bytes it skips finish the section in progress. Several sections may
    /// start in one packet; a 0xFF table id marks stuffing.
    pub fn push(&mut self, payload: &[u8], cc: u8, payload_unit_start: bool) -> Vec<Vec<u8>> {
        let mut sections = Vec::new();

        if let Some(last) = self.last_cc {
            if cc == last {
                // duplicate packet
                return sections;
            }
            if cc != (last + 1) & 0x0F {
                self.buffer.clear();
            }
        }
        self.last_cc = Some(cc);

        if !payload_unit_start {
            if !self.buffer.is_empty() {
                self.buffer.extend_from_slice(payload);
                self.drain_complete(&mut sections);
            }
            return sections;
        }

        let Some((&pointer, rest)) = payload.split_first() else {
            return sections;
        };
        let pointer = pointer as usize;
        if pointer > rest.len() {
            self.buffer.clear();
            return sections;
        }

        if !self.buffer.is_empty() {
            self.buffer.extend_from_slice(&rest[..pointer]);
            self.drain_complete(&mut sections);
        }
        self.buffer.clear();
        self.buffer.extend_from_slice(&rest[pointer..]);
        self.drain_complete(&mut sections);
        sections
    }

    fn drain_complete(&mut self, out: &mut Vec<Vec<u8>>) {
        loop {
            match self.buffer.first() {
                None => return,
                Some(0xFF) => {
                    self.buffer.clear();
                    return;
                }
                Some(_) => {}
            }
            if self.buffer.len() < 3 {
                return;
            }
            let total = 3 + (((self.buffer[1] as usize) & 0x0F) << 8 | self.buffer[2] as usize);
            if self.buffer.len() < total {
                return;
            }
            out.push(self.buffer.drain(..total).collect());
        }
    }
}

/// Tracks the sections of one table version.
///
/// A section is accepted only in order, starting at section 0 of a version;
/// a version change restarts the sequence. Once the last section is accepted
/// the table is complete and further sections of the same version are
/// rejected.
#[derive(Debug, Clone, Default)]
pub struct SectionSyncer {
    version: Option<u8>,
    next: u8,
    complete: bool,
}

impl SectionSyncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// True if the section should be processed.
    pub fn sync(&mut self, version: u8, section_number: u8, last_section_number: u8) -> bool {
        if self.version != Some(version) {
            self.version = Some(version);
            self.next = 0;
            self.complete = false;
        }
        if self.complete || section_number != self.next {
            return false;
        }
        if section_number >= last_section_number {
            self.complete = true;
        } else {
            self.next = section_number + 1;
        }
        true
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// CRC32/MPEG-2 (polynomial 0x04C11DB7, no reflection, no final xor).
pub fn crc32_mpeg2(data: &[u8]) -> u32 {
    static CRC_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = (i as u32) << 24;
            let mut bit = 0;
            while bit < 8 {
                crc = if crc & 0x8000_0000 != 0 {
                    (crc << 1) ^ 0x04C1_1DB7
                } else {
                    crc << 1
                };
                bit += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    data.iter().fold(0xFFFF_FFFF, |crc, &byte| {
        (crc << 8) ^ CRC_TABLE[((crc >> 24) ^ byte as u32) as usize]
    })
}
