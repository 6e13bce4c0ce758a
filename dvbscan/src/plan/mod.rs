//! Frequency plans.
//!
//! Every candidate frequency of a terrestrial, cable or ATSC scan is computed
//! as
//!
//! ```text
//! frequency(list, channel, offset_index) =
//!     base_offset(channel, list) + channel * freq_step(channel, list)
//!     + freq_offset(channel, list, offset_index)
//! ```
//!
//! Channels a plan does not use yield [`None`] from [`base_offset`] and are
//! never combined into a frequency.

pub mod countries;
pub mod satellites;

use dvbscan_protocol::ScanError;
use serde::{Deserialize, Serialize};

pub use countries::{choose_country, find_country, Country, COUNTRIES};
pub use satellites::{find_satellite, SatTransponder, Satellite, SATELLITES};

/// Highest channel index iterated by the orchestrator.
pub const CHANNEL_MAX: u32 = 133;

/// Highest frequency offset index iterated by the orchestrator.
///
/// Plans define offsets up to [`OffsetIndex::Pos2`], but only the first
/// three are walked during a scan.
pub const OFFSET_INDEX_MAX: u8 = 2;

/// Known channel lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ChannelList {
    AtscVsb = 1,
    AtscQam = 2,
    DvbtAu = 3,
    DvbtDe = 4,
    DvbtFr = 5,
    DvbtGb = 6,
    DvbcQam = 7,
    DvbcFi = 8,
    DvbcFr = 9,
    DvbcBr = 10,
    IsdbT6Mhz = 11,
    DvbtEuBand3 = 12,
    UserList = 999,
}

impl ChannelList {
    pub fn from_id(id: i32) -> Result<Self, ScanError> {
        Ok(match id {
            1 => ChannelList::AtscVsb,
            2 => ChannelList::AtscQam,
            3 => ChannelList::DvbtAu,
            4 => ChannelList::DvbtDe,
            5 => ChannelList::DvbtFr,
            6 => ChannelList::DvbtGb,
            7 => ChannelList::DvbcQam,
            8 => ChannelList::DvbcFi,
            9 => ChannelList::DvbcFr,
            10 => ChannelList::DvbcBr,
            11 => ChannelList::IsdbT6Mhz,
            12 => ChannelList::DvbtEuBand3,
            999 => ChannelList::UserList,
            other => return Err(ScanError::UnknownChannelList(other)),
        })
    }

    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn name(self) -> &'static str {
        match self {
            ChannelList::AtscVsb => "ATSC VSB",
            ChannelList::AtscQam => "ATSC QAM",
            ChannelList::DvbtAu => "DVB-T AU",
            ChannelList::DvbtDe => "DVB-T Europe",
            ChannelList::DvbtFr => "DVB-T FR",
            ChannelList::DvbtGb => "DVB-T GB",
            ChannelList::DvbcQam => "DVB-C",
            ChannelList::DvbcFi => "DVB-C FI",
            ChannelList::DvbcFr => "DVB-C FR",
            ChannelList::DvbcBr => "DVB-C BR",
            ChannelList::IsdbT6Mhz => "ISDB-T 6MHz",
            ChannelList::DvbtEuBand3 => "DVB-T Europe w. Band III",
            ChannelList::UserList => "user list",
        }
    }
}

/// Frequency offset index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OffsetIndex {
    None = 0,
    Pos = 1,
    Neg = 2,
    Pos1 = 3,
    Pos2 = 4,
}

impl OffsetIndex {
    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(OffsetIndex::None),
            1 => Some(OffsetIndex::Pos),
            2 => Some(OffsetIndex::Neg),
            3 => Some(OffsetIndex::Pos1),
            4 => Some(OffsetIndex::Pos2),
            _ => None,
        }
    }
}

/// Result of [`freq_offset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    /// Add this many Hz to the channel center.
    Value(i32),
    /// This offset is not used for the channel.
    Skip,
    /// No further offsets exist for the channel.
    Stop,
}

impl Offset {
    pub fn value(self) -> Option<i32> {
        match self {
            Offset::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Base offset in Hz, or `None` if the channel is not part of the plan.
pub fn base_offset(channel: u32, list: ChannelList) -> Option<i64> {
    use ChannelList::*;
    let base = match list {
        AtscQam | DvbcBr => match channel {
            2..=4 => 45_000_000,
            5..=6 => 49_000_000,
            7..=13 => 135_000_000,
            14..=22 => 39_000_000,
            23..=94 => 81_000_000,
            95..=99 => -477_000_000,
            100..=133 => 51_000_000,
            _ => return None,
        },
        AtscVsb => match channel {
            2..=4 => 45_000_000,
            5..=6 => 49_000_000,
            7..=13 => 135_000_000,
            14..=69 => 389_000_000,
            _ => return None,
        },
        // Channels 7..=13 are reserved.
        IsdbT6Mhz => match channel {
            14..=69 => 389_000_000,
            _ => return None,
        },
        DvbtAu => match channel {
            5..=12 => 142_500_000,
            21..=69 => 333_500_000,
            _ => return None,
        },
        DvbtDe => match channel {
            21..=59 => 306_000_000,
            _ => return None,
        },
        DvbtEuBand3 => match channel {
            5..=12 => 142_500_000,
            21..=69 => 306_000_000,
            _ => return None,
        },
        DvbtFr => match channel {
            21..=49 => 306_000_000,
            _ => return None,
        },
        DvbtGb => match channel {
            21..=55 => 306_000_000,
            _ => return None,
        },
        DvbcQam | DvbcFi => match channel {
            0 | 5..=98 => 74_000_000,
            _ => return None,
        },
        DvbcFr => match channel {
            1..=39 => 107_000_000,
            40..=89 => 138_000_000,
            _ => return None,
        },
        UserList => return None,
    };
    Some(base)
}

/// Channel spacing in Hz.
pub fn freq_step(channel: u32, list: ChannelList) -> u32 {
    use ChannelList::*;
    match list {
        AtscQam | AtscVsb | DvbcBr | IsdbT6Mhz => 6_000_000,
        DvbtAu => 7_000_000,
        DvbtDe | DvbtFr | DvbtGb | DvbtEuBand3 => match channel {
            5..=12 => 7_000_000,
            _ => 8_000_000,
        },
        DvbcQam | DvbcFi | DvbcFr | UserList => 8_000_000,
    }
}

/// Channel bandwidth in Hz; identical to the channel spacing.
pub fn bandwidth(channel: u32, list: ChannelList) -> u32 {
    freq_step(channel, list)
}

/// Constant offset around the channel center for the given offset index.
pub fn freq_offset(channel: u32, list: ChannelList, index: u8) -> Offset {
    use ChannelList::*;
    use OffsetIndex as I;

    let Some(index) = OffsetIndex::from_index(index) else {
        return Offset::Stop;
    };

    match list {
        UserList => Offset::Value(0),
        AtscQam => match (channel, index) {
            (14..=16 | 25..=53 | 98..=99, I::None) => Offset::Value(0),
            // US EIA/NCTA standard cable center frequencies
            (14..=16 | 25..=53 | 98..=99, I::Pos) => Offset::Value(12_500),
            (_, I::None) => Offset::Value(0),
            _ => Offset::Stop,
        },
        DvbtFr => match (channel, index) {
            (5..=12, _) => Offset::Stop,
            (_, I::None) => Offset::Value(0),
            (_, I::Pos) => Offset::Value(166_000),
            (_, I::Neg) => Offset::Value(-166_000),
            (_, I::Pos1) => Offset::Value(332_000),
            (_, I::Pos2) => Offset::Value(498_000),
        },
        DvbtGb => match (channel, index) {
            (5..=12, _) => Offset::Stop,
            (_, I::None) => Offset::Value(0),
            (_, I::Pos) => Offset::Value(167_000),
            (_, I::Neg) => Offset::Value(-167_000),
            _ => Offset::Stop,
        },
        DvbtAu => match index {
            I::None => Offset::Value(0),
            I::Pos => Offset::Value(125_000),
            _ => Offset::Stop,
        },
        DvbcFr => match (channel, index) {
            (1..=39, I::Pos) => Offset::Value(125_000),
            (_, I::None) => Offset::Value(0),
            _ => Offset::Stop,
        },
        DvbcQam | DvbcFi => match (channel, index) {
            (0, I::None | I::Pos) => Offset::Skip,
            (0, I::Neg) => Offset::Value(-1_000_000),
            (5..=12, I::None) => Offset::Value(0),
            (5..=12, I::Pos) => Offset::Skip,
            (5..=12, I::Neg) => Offset::Value(-1_000_000),
            (_, I::None) => Offset::Value(0),
            _ => Offset::Stop,
        },
        IsdbT6Mhz => match (channel, index) {
            (7..=69, I::None) => Offset::Skip,
            (7..=69, I::Pos) => Offset::Value(142_857),
            _ => Offset::Stop,
        },
        AtscVsb | DvbtDe | DvbtEuBand3 | DvbcBr => match index {
            I::None => Offset::Value(0),
            _ => Offset::Stop,
        },
    }
}

/// Estimated maximum DVB-C symbol rate (Sym/s) for a channel bandwidth in Hz,
/// using the 0.15 roll-off of EN 300 429.
pub fn max_dvbc_srate(bandwidth: u32) -> Result<u32, ScanError> {
    const DVBC_SYMBOL_LEN: f64 = 1.0 + 0.15;
    match bandwidth {
        5_000_000 | 6_000_000 | 7_000_000 | 8_000_000 => {
            Ok((0.5 + bandwidth as f64 / DVBC_SYMBOL_LEN) as u32)
        }
        other => Err(ScanError::InvalidBandwidth(other)),
    }
}

/// DVB-T transmission mode (in K) used when the device cannot auto-detect it.
pub fn dvbt_transmission_mode(_channel: u32, _list: ChannelList) -> i32 {
    8
}

/// Upper bound of the DVB-C modulation loop, see [`dvbc_modulation`].
pub fn dvbc_qam_max(_channel: u32, list: ChannelList) -> u8 {
    match list {
        ChannelList::DvbcFi => 2,
        ChannelList::DvbcBr | ChannelList::DvbcFr | ChannelList::DvbcQam => 1,
        _ => 0,
    }
}

/// Lower bound of the DVB-C modulation loop.
pub fn dvbc_qam_min(_channel: u32, _list: ChannelList) -> u8 {
    0
}

/// QAM order tried at a DVB-C modulation loop index.
pub fn dvbc_modulation(index: u8) -> i32 {
    match index {
        0 => 256,
        1 => 64,
        2 => 128,
        _ => dvbscan_protocol::UNSET,
    }
}

const DVBC_SYMBOLRATES: [u32; 15] = [
    6_900_000, 6_875_000, 6_111_000, 6_250_000, 6_790_000, 6_811_000, 5_900_000, 5_000_000,
    3_450_000, 4_000_000, 6_950_000, 7_000_000, 6_952_000, 5_156_000, 5_483_000,
];

/// DVB-C symbol rate (Sym/s) at a loop index, or 0 past the end of the table.
pub fn dvbc_symbolrate(index: usize) -> u32 {
    DVBC_SYMBOLRATES.get(index).copied().unwrap_or(0)
}

/// Number of entries in the DVB-C symbol rate table.
pub fn dvbc_symbolrate_count() -> usize {
    DVBC_SYMBOLRATES.len()
}

/// Channel center frequency in Hz, or 0 if the plan does not use `channel`.
pub fn chan_to_freq(channel: u32, list: ChannelList) -> u32 {
    match base_offset(channel, list) {
        Some(base) => {
            let f = base + channel as i64 * freq_step(channel, list) as i64;
            u32::try_from(f).unwrap_or(0)
        }
        None => 0,
    }
}

/// Candidate frequency in Hz for `(channel, offset index)`, if both exist.
pub fn candidate_frequency(channel: u32, list: ChannelList, offset_index: u8) -> Option<u32> {
    let f = chan_to_freq(channel, list);
    if f == 0 {
        return None;
    }
    let offset = freq_offset(channel, list, offset_index).value()?;
    u32::try_from(f as i64 + offset as i64).ok()
}

/// Frequency tolerances of the equivalence rules.
///
/// `satellite_mhz` applies to satellite sources, `terrestrial_khz` to
/// terrestrial and `generic_khz` to cable and ATSC when two transponders are
/// compared structurally. `default_delta` is the tolerance used for plain
/// "is this frequency already queued" lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    pub satellite_mhz: u32,
    pub terrestrial_khz: u32,
    pub generic_khz: u32,
    pub default_delta: u32,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            satellite_mhz: 2,
            terrestrial_khz: 250,
            generic_khz: 500,
            default_delta: 2001,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_list_from_id() {
        assert_eq!(ChannelList::from_id(4).unwrap(), ChannelList::DvbtDe);
        assert_eq!(ChannelList::from_id(999).unwrap(), ChannelList::UserList);
        assert_eq!(
            ChannelList::from_id(13).unwrap_err(),
            ScanError::UnknownChannelList(13)
        );
    }

    #[test]
    fn test_germany_channel_12_is_skipped() {
        assert_eq!(base_offset(12, ChannelList::DvbtDe), None);
        assert_eq!(chan_to_freq(12, ChannelList::DvbtDe), 0);
        // Band III list has it.
        assert_eq!(chan_to_freq(12, ChannelList::DvbtEuBand3), 226_500_000);
        assert_eq!(bandwidth(12, ChannelList::DvbtEuBand3), 7_000_000);
    }

    #[test]
    fn test_uhf_frequencies() {
        assert_eq!(chan_to_freq(21, ChannelList::DvbtDe), 474_000_000);
        assert_eq!(chan_to_freq(59, ChannelList::DvbtDe), 778_000_000);
        assert_eq!(chan_to_freq(14, ChannelList::AtscVsb), 473_000_000);
        assert_eq!(chan_to_freq(95, ChannelList::AtscQam), 93_000_000);
    }

    #[test]
    fn test_offsets() {
        assert_eq!(freq_offset(30, ChannelList::DvbtFr, 2), Offset::Value(-166_000));
        assert_eq!(freq_offset(30, ChannelList::DvbtFr, 4), Offset::Value(498_000));
        assert_eq!(freq_offset(30, ChannelList::DvbtDe, 1), Offset::Stop);
        assert_eq!(freq_offset(0, ChannelList::DvbcQam, 0), Offset::Skip);
        assert_eq!(freq_offset(0, ChannelList::DvbcQam, 2), Offset::Value(-1_000_000));
        assert_eq!(freq_offset(20, ChannelList::IsdbT6Mhz, 0), Offset::Skip);
        assert_eq!(freq_offset(20, ChannelList::IsdbT6Mhz, 9), Offset::Stop);
    }

    #[test]
    fn test_candidate_frequency_never_uses_skipped_channels() {
        for list in [ChannelList::DvbtDe, ChannelList::DvbcQam, ChannelList::AtscQam] {
            for ch in 0..=CHANNEL_MAX {
                for offs in 0..=OFFSET_INDEX_MAX {
                    if let Some(f) = candidate_frequency(ch, list, offs) {
                        assert!(base_offset(ch, list).is_some());
                        assert_eq!(candidate_frequency(ch, list, offs), Some(f));
                    }
                }
            }
        }
        assert_eq!(candidate_frequency(0, ChannelList::DvbcQam, 2), Some(73_000_000));
        assert_eq!(candidate_frequency(0, ChannelList::DvbcQam, 0), None);
    }

    #[test]
    fn test_max_dvbc_srate() {
        assert_eq!(max_dvbc_srate(8_000_000).unwrap(), 6_956_522);
        assert_eq!(
            max_dvbc_srate(4_000_000).unwrap_err(),
            ScanError::InvalidBandwidth(4_000_000)
        );
    }

    #[test]
    fn test_dvbc_tables() {
        assert_eq!(dvbc_modulation(0), 256);
        assert_eq!(dvbc_modulation(1), 64);
        assert_eq!(dvbc_modulation(2), 128);
        assert_eq!(dvbc_modulation(3), dvbscan_protocol::UNSET);
        assert_eq!(dvbc_symbolrate(0), 6_900_000);
        assert_eq!(dvbc_symbolrate(14), 5_483_000);
        assert_eq!(dvbc_symbolrate(15), 0);
        assert_eq!(dvbc_qam_max(0, ChannelList::DvbcFi), 2);
        assert_eq!(dvbc_qam_max(0, ChannelList::DvbtDe), 0);
    }
}
