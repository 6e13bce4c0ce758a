//! Basic value types shared by transponder and channel records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Reserved value for tuning parameters that are unset or left to auto-detection.
pub const UNSET: i32 = 999;

/// Delivery system family of a transponder, including the orbital position
/// for satellite sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Source {
    /// DVB-T/T2 and ISDB-T.
    Terrestrial,
    /// DVB-C.
    Cable,
    /// DVB-S/S2 at an orbital position given in tenths of a degree.
    Satellite { position: u16, west: bool },
    /// ATSC VSB and US cable QAM.
    Atsc,
}

impl Source {
    /// Single letter delivery tag ('T', 'C', 'S' or 'A').
    pub fn tag(&self) -> char {
        match self {
            Source::Terrestrial => 'T',
            Source::Cable => 'C',
            Source::Satellite { .. } => 'S',
            Source::Atsc => 'A',
        }
    }

    pub fn is_satellite(&self) -> bool {
        matches!(self, Source::Satellite { .. })
    }

    /// Signed orbital position in tenths of a degree, west negative.
    /// Zero for every non-satellite source.
    pub fn orbital_position(&self) -> i32 {
        match *self {
            Source::Satellite { position, west } => {
                if west {
                    -(position as i32)
                } else {
                    position as i32
                }
            }
            _ => 0,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Source::Satellite { position, west } => write!(
                f,
                "S{}.{}{}",
                position / 10,
                position % 10,
                if west { 'W' } else { 'E' }
            ),
            other => write!(f, "{}", other.tag()),
        }
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "T" => Ok(Source::Terrestrial),
            "C" => Ok(Source::Cable),
            "A" => Ok(Source::Atsc),
            _ if s.starts_with('S') && s.len() >= 3 => {
                let (body, dir) = s[1..].split_at(s.len() - 2);
                let west = match dir {
                    "W" => true,
                    "E" => false,
                    _ => return Err(format!("invalid source '{}'", s)),
                };
                let degrees: f64 = body
                    .parse()
                    .map_err(|_| format!("invalid orbital position in '{}'", s))?;
                Ok(Source::Satellite {
                    position: (degrees * 10.0).round() as u16,
                    west,
                })
            }
            _ => Err(format!("invalid source '{}'", s)),
        }
    }
}

/// Kind of scan requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanType {
    Terrestrial = 0,
    Cable = 1,
    Satellite = 2,
    /// ATSC terrestrial (VSB) and/or US cable (QAM).
    #[serde(rename = "atsc")]
    TerrCableAtsc = 5,
    /// No usable device for any delivery system.
    NoDevice = 6,
    /// A single user supplied transponder.
    Transponder = 999,
}

impl ScanType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ScanType::Terrestrial => "DVB-T/T2",
            ScanType::Cable => "DVB-C",
            ScanType::Satellite => "DVB-S/S2",
            ScanType::TerrCableAtsc => "ATSC",
            ScanType::NoDevice => "no device",
            ScanType::Transponder => "single transponder",
        }
    }
}

/// Service inclusion filter (TV, radio, free-to-air, scrambled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanFlags(pub u8);

impl ScanFlags {
    pub const TV: ScanFlags = ScanFlags(1);
    pub const RADIO: ScanFlags = ScanFlags(2);
    pub const FTA: ScanFlags = ScanFlags(4);
    pub const SCRAMBLED: ScanFlags = ScanFlags(8);
    pub const ALL: ScanFlags = ScanFlags(1 | 2 | 4 | 8);

    pub fn contains(self, other: ScanFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_all(self) -> bool {
        self.contains(Self::ALL)
    }
}

impl Default for ScanFlags {
    fn default() -> Self {
        Self::ALL
    }
}

impl std::ops::BitOr for ScanFlags {
    type Output = ScanFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        ScanFlags(self.0 | rhs.0)
    }
}

/// Satellite polarization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarization {
    Horizontal,
    Vertical,
    CircularLeft,
    CircularRight,
}

impl Polarization {
    /// Decode the two bit polarization field used in delivery descriptors and
    /// satellite tables (0=H, 1=V, 2=L, 3=R).
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Polarization::Horizontal,
            1 => Polarization::Vertical,
            2 => Polarization::CircularLeft,
            _ => Polarization::CircularRight,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Polarization::Horizontal => 'H',
            Polarization::Vertical => 'V',
            Polarization::CircularLeft => 'L',
            Polarization::CircularRight => 'R',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'H' => Some(Polarization::Horizontal),
            'V' => Some(Polarization::Vertical),
            'L' => Some(Polarization::CircularLeft),
            'R' => Some(Polarization::CircularRight),
            _ => None,
        }
    }
}

/// Elementary stream reference inside a channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pid {
    pub pid: u16,
    /// Stream type for video/audio, descriptor tag for AC3/EAC3/DTS/AAC.
    pub stream_type: u8,
    /// ISO 639 code(s), joined with '+'.
    pub lang: String,
}

impl Pid {
    pub fn new(pid: u16, stream_type: u8) -> Self {
        Self {
            pid,
            stream_type,
            lang: String::new(),
        }
    }
}

/// Transposer of a DVB-T2 cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transposer {
    pub cell_id_extension: u8,
    /// Hz.
    pub frequency: u32,
}

/// DVB-T2 cell with its center and transposer frequencies.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub cell_id: u16,
    /// Hz, at most [`Cell::MAX_CENTER_FREQUENCIES`].
    pub center_frequencies: Vec<u32>,
    /// At most [`Cell::MAX_TRANSPOSERS`].
    pub transposers: Vec<Transposer>,
}

impl Cell {
    pub const MAX_CENTER_FREQUENCIES: usize = 6;
    pub const MAX_TRANSPOSERS: usize = 16;
}

/// LNB local oscillator settings (MHz) used to validate satellite IFs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lnb {
    /// Switch frequency between low and high band.
    pub slof: u32,
    pub low: u32,
    pub high: u32,
}

impl Default for Lnb {
    fn default() -> Self {
        // Universal LNB.
        Self {
            slof: 11700,
            low: 9750,
            high: 10600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_display_and_parse() {
        let astra = Source::Satellite { position: 192, west: false };
        assert_eq!(astra.to_string(), "S19.2E");
        assert_eq!("S19.2E".parse::<Source>().unwrap(), astra);

        let thor = Source::Satellite { position: 8, west: true };
        assert_eq!(thor.to_string(), "S0.8W");
        assert_eq!(thor.orbital_position(), -8);

        assert_eq!("T".parse::<Source>().unwrap(), Source::Terrestrial);
        assert!("X".parse::<Source>().is_err());
        assert!("S19.2Q".parse::<Source>().is_err());
    }

    #[test]
    fn test_scan_flags() {
        let flags = ScanFlags::TV | ScanFlags::FTA;
        assert!(flags.contains(ScanFlags::TV));
        assert!(!flags.contains(ScanFlags::RADIO));
        assert!(!flags.is_all());
        assert!(ScanFlags::default().is_all());
    }

    #[test]
    fn test_polarization_bits() {
        assert_eq!(Polarization::from_bits(1).as_char(), 'V');
        assert_eq!(Polarization::from_bits(3), Polarization::CircularRight);
        assert_eq!(Polarization::from_char('h'), Some(Polarization::Horizontal));
    }
}
