//! PAT (Program Association Table) parsing.
//!
//! The PAT is transmitted on PID 0x0000 and lists the programs of a
//! transport stream with their PMT PIDs.

use super::psi::PsiSection;
use super::table_id;

/// A single PAT entry (program number and PMT PID).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatEntry {
    /// Program number, equal to the service id.
    pub program_number: u16,
    pub pmt_pid: u16,
}

/// One parsed PAT section.
#[derive(Debug, Clone, Default)]
pub struct PatTable {
    pub transport_stream_id: u16,
    pub version_number: u8,
    pub programs: Vec<PatEntry>,
    /// PID announced for program number 0.
    pub network_pid: Option<u16>,
}

impl PatTable {
    pub fn parse(section: &PsiSection) -> Result<Self, &'static str> {
        if section.header.table_id != table_id::PAT {
            return Err("Not a PAT section");
        }

        let data = section.data;
        if data.len() % 4 != 0 {
            return Err("Invalid PAT data length");
        }

        let mut pat = PatTable {
            transport_stream_id: section.header.table_id_extension,
            version_number: section.header.version_number,
            programs: Vec::with_capacity(data.len() / 4),
            network_pid: None,
        };

        for chunk in data.chunks_exact(4) {
            let program_number = u16::from_be_bytes([chunk[0], chunk[1]]);
            let pid = ((chunk[2] as u16 & 0x1F) << 8) | chunk[3] as u16;

            if program_number == 0 {
                pat.network_pid = Some(pid);
            } else {
                pat.programs.push(PatEntry {
                    program_number,
                    pmt_pid: pid,
                });
            }
        }

        Ok(pat)
    }

    pub fn pmt_pid(&self, program_number: u16) -> Option<u16> {
        self.programs
            .iter()
            .find(|p| p.program_number == program_number)
            .map(|p| p.pmt_pid)
    }
}
