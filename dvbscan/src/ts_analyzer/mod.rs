//! MPEG-TS and DVB/ATSC service information parsing.
//!
//! This module provides parsing functionality for TS packets and the PSI/SI
//! tables a channel scan needs.
//!
//! # Supported Tables
//! - PAT (Program Association Table) - PID 0x0000
//! - PMT (Program Map Table) - Variable PIDs from PAT
//! - NIT (Network Information Table) - PID 0x0010 or the PAT network PID
//! - SDT (Service Description Table) - PID 0x0011
//!
//! Table parsers take a [`PsiSection`] and return plain values; what to do
//! with repeated or out of order sections is left to the caller.

pub mod descriptors;
pub mod nit;
pub mod packet;
pub mod pat;
pub mod pmt;
pub mod psi;
pub mod sdt;
pub mod text;

pub use descriptors::{Descriptor, DescriptorIter};
pub use nit::{NitTable, NitTransportStream};
pub use packet::{TsHeader, TsPacket, TsPacketIterator, SYNC_BYTE, TS_PACKET_SIZE};
pub use pat::{PatEntry, PatTable};
pub use pmt::{PmtStream, PmtTable};
pub use psi::{build_section, crc32_mpeg2, PsiHeader, PsiSection, SectionCollector, SectionSyncer};
pub use sdt::{SdtService, SdtTable};

/// Well-known PIDs in MPEG-TS.
pub mod pid {
    /// Program Association Table PID.
    pub const PAT: u16 = 0x0000;
    /// Network Information Table PID unless the PAT names another.
    pub const NIT: u16 = 0x0010;
    /// Service Description Table PID.
    pub const SDT: u16 = 0x0011;
    /// Null packet PID (stuffing).
    pub const NULL: u16 = 0x1FFF;
}

/// Table IDs for PSI/SI tables.
pub mod table_id {
    pub const PAT: u8 = 0x00;
    pub const PMT: u8 = 0x02;
    /// Network Information Section - actual.
    pub const NIT_ACTUAL: u8 = 0x40;
    /// Network Information Section - other.
    pub const NIT_OTHER: u8 = 0x41;
    /// Service Description Section - actual.
    pub const SDT_ACTUAL: u8 = 0x42;
}

/// Descriptor tags used in PSI/SI tables.
pub mod descriptor_tag {
    pub const CA: u8 = 0x09;
    pub const ISO_639_LANGUAGE: u8 = 0x0A;
    pub const NETWORK_NAME: u8 = 0x40;
    pub const SERVICE_LIST: u8 = 0x41;
    pub const SATELLITE_DELIVERY: u8 = 0x43;
    pub const CABLE_DELIVERY: u8 = 0x44;
    pub const SERVICE: u8 = 0x48;
    pub const TELETEXT: u8 = 0x56;
    pub const SUBTITLING: u8 = 0x59;
    pub const TERRESTRIAL_DELIVERY: u8 = 0x5A;
    pub const PRIVATE_DATA_SPECIFIER: u8 = 0x5F;
    pub const FREQUENCY_LIST: u8 = 0x62;
    pub const AC3: u8 = 0x6A;
    pub const CELL_LIST: u8 = 0x6C;
    pub const CELL_FREQUENCY_LINK: u8 = 0x6D;
    pub const S2_SATELLITE_DELIVERY: u8 = 0x79;
    pub const ENHANCED_AC3: u8 = 0x7A;
    pub const DTS: u8 = 0x7B;
    pub const AAC: u8 = 0x7C;
    pub const EXTENSION: u8 = 0x7F;

    /// Tag inside an extension descriptor.
    pub const EXT_T2_DELIVERY: u8 = 0x04;

    /// Logical channel descriptors live in the user defined range.
    pub const LOGICAL_CHANNEL: u8 = 0x83;
    pub const NORDIG_LOGICAL_CHANNEL_V2: u8 = 0x87;
    pub const HD_SIMULCAST_LOGICAL_CHANNEL: u8 = 0x88;
}

/// Stream type constants.
pub mod stream_type {
    pub const MPEG1_VIDEO: u8 = 0x01;
    pub const MPEG2_VIDEO: u8 = 0x02;
    pub const MPEG1_AUDIO: u8 = 0x03;
    pub const MPEG2_AUDIO: u8 = 0x04;
    pub const PRIVATE_SECTIONS: u8 = 0x05;
    pub const PES_PRIVATE_DATA: u8 = 0x06;
    /// AAC Audio (ADTS).
    pub const AAC_AUDIO: u8 = 0x0F;
    pub const MPEG4_VIDEO: u8 = 0x10;
    /// AAC Audio (LATM).
    pub const AAC_LATM: u8 = 0x11;
    pub const MPEG4_AUDIO: u8 = 0x1C;
    pub const H264_VIDEO: u8 = 0x1B;
    pub const H265_VIDEO: u8 = 0x24;
    /// ATSC AC-3 audio.
    pub const ATSC_AC3: u8 = 0x81;
}

/// Private data specifiers that change the meaning of user defined
/// descriptor tags.
pub mod private_data_specifier {
    pub const RESERVED: u32 = 0x0000_0000;
    pub const SINGAPORE: u32 = 0x0000_0019;
    pub const EACEM: u32 = 0x0000_0028;
    pub const NORDIG: u32 = 0x0000_0029;
}
