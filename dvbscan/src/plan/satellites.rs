//! Built-in satellite transponder tables.

use dvbscan_protocol::{Channel, Polarization, ScanError, Source, UNSET};

/// First generation modulation system.
pub const SYS_DVBS: u8 = 5;
/// Second generation modulation system.
pub const SYS_DVBS2: u8 = 6;

// FEC, modulation and roll-off are stored as table indices.
const FEC: [i32; 12] = [0, 12, 23, 34, 45, 56, 67, 78, 89, UNSET, 35, 910];
const MODULATION: [i32; 14] = [2, 16, 32, 64, 128, 256, UNSET, 10, 11, 5, 6, 7, 12, 0];
const ROLLOFF: [i32; 4] = [35, 20, 25, UNSET];

const F12: u8 = 1;
const F23: u8 = 2;
const F34: u8 = 3;
const F56: u8 = 5;
const F78: u8 = 7;
const F89: u8 = 8;
const F35: u8 = 10;

const QPSK: u8 = 0;
const PSK8: u8 = 9;

const H: u8 = 0;
const V: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SatTransponder {
    /// [`SYS_DVBS`] or [`SYS_DVBS2`].
    pub system: u8,
    /// MHz.
    pub frequency: u32,
    /// 0=H, 1=V, 2=L, 3=R.
    pub polarization: u8,
    /// kSym/s.
    pub symbol_rate: u32,
    pub fec: u8,
    pub rolloff: u8,
    pub modulation: u8,
    pub stream_id: u8,
}

const fn tp(system: u8, frequency: u32, polarization: u8, symbol_rate: u32, fec: u8, modulation: u8) -> SatTransponder {
    SatTransponder {
        system,
        frequency,
        polarization,
        symbol_rate,
        fec,
        rolloff: 0,
        modulation,
        stream_id: 0,
    }
}

impl SatTransponder {
    pub fn is_second_generation(&self) -> bool {
        self.system == SYS_DVBS2
    }

    pub fn fec_value(&self) -> i32 {
        FEC.get(self.fec as usize).copied().unwrap_or(UNSET)
    }

    pub fn modulation_value(&self) -> i32 {
        MODULATION.get(self.modulation as usize).copied().unwrap_or(UNSET)
    }

    pub fn rolloff_value(&self) -> i32 {
        ROLLOFF.get(self.rolloff as usize).copied().unwrap_or(UNSET)
    }

    /// Tuning record for this transponder on `source`.
    pub fn to_channel(&self, source: Source) -> Channel {
        let mut c = Channel::new(source);
        c.frequency = self.frequency;
        c.symbol_rate = self.symbol_rate;
        c.delsys = i32::from(self.is_second_generation());
        c.stream_id = self.stream_id as i32;
        c.polarization = Some(Polarization::from_bits(self.polarization));
        c.fec = self.fec_value();
        c.modulation = self.modulation_value();
        c.rolloff = self.rolloff_value();
        c.pilot = UNSET;
        c
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Satellite {
    pub short_name: &'static str,
    pub full_name: &'static str,
    /// Tenths of a degree.
    pub position: u16,
    pub west: bool,
    pub transponders: &'static [SatTransponder],
}

impl Satellite {
    pub fn source(&self) -> Source {
        Source::Satellite {
            position: self.position,
            west: self.west,
        }
    }
}

static S19E2: &[SatTransponder] = &[
    tp(SYS_DVBS, 10744, H, 22000, F56, QPSK),
    tp(SYS_DVBS, 10832, H, 22000, F56, QPSK),
    tp(SYS_DVBS2, 11053, H, 22000, F23, PSK8),
    tp(SYS_DVBS2, 11362, H, 22000, F23, PSK8),
    tp(SYS_DVBS2, 11494, H, 22000, F23, PSK8),
    tp(SYS_DVBS, 11836, H, 27500, F34, QPSK),
    tp(SYS_DVBS, 11954, H, 27500, F34, QPSK),
    tp(SYS_DVBS, 12109, H, 27500, F34, QPSK),
    tp(SYS_DVBS, 12188, H, 27500, F34, QPSK),
    tp(SYS_DVBS, 12480, V, 27500, F34, QPSK),
    tp(SYS_DVBS, 12544, H, 22000, F56, QPSK),
    tp(SYS_DVBS, 12603, H, 22000, F56, QPSK),
];

static S13E0: &[SatTransponder] = &[
    tp(SYS_DVBS, 10719, V, 27500, F56, QPSK),
    tp(SYS_DVBS2, 10992, V, 27500, F23, PSK8),
    tp(SYS_DVBS, 11034, V, 27500, F34, QPSK),
    tp(SYS_DVBS, 11137, H, 27500, F34, QPSK),
    tp(SYS_DVBS2, 11766, H, 29900, F35, PSK8),
    tp(SYS_DVBS, 12111, V, 27500, F34, QPSK),
    tp(SYS_DVBS, 12245, H, 27500, F34, QPSK),
    tp(SYS_DVBS, 12476, H, 29900, F34, QPSK),
];

static S28E2: &[SatTransponder] = &[
    tp(SYS_DVBS, 10714, H, 22000, F56, QPSK),
    tp(SYS_DVBS2, 10847, V, 23000, F89, PSK8),
    tp(SYS_DVBS2, 11023, H, 23000, F89, PSK8),
    tp(SYS_DVBS, 11426, H, 27500, F23, QPSK),
    tp(SYS_DVBS, 11778, V, 27500, F23, QPSK),
    tp(SYS_DVBS, 12051, V, 27500, F23, QPSK),
    tp(SYS_DVBS, 12422, H, 27500, F23, QPSK),
];

static S23E5: &[SatTransponder] = &[
    tp(SYS_DVBS, 11739, H, 27500, F34, QPSK),
    tp(SYS_DVBS2, 11798, H, 27500, F34, PSK8),
    tp(SYS_DVBS, 12070, H, 27500, F34, QPSK),
    tp(SYS_DVBS, 12525, V, 27500, F34, QPSK),
];

static S5E0: &[SatTransponder] = &[
    tp(SYS_DVBS2, 11265, H, 30000, F34, PSK8),
    tp(SYS_DVBS, 11727, H, 27500, F34, QPSK),
    tp(SYS_DVBS, 12245, V, 27500, F34, QPSK),
];

static S0W8: &[SatTransponder] = &[
    tp(SYS_DVBS, 11216, V, 24500, F78, QPSK),
    tp(SYS_DVBS2, 11229, V, 25000, F23, PSK8),
    tp(SYS_DVBS, 12226, V, 28000, F78, QPSK),
];

static S30W0: &[SatTransponder] = &[
    tp(SYS_DVBS2, 10730, H, 30000, F34, PSK8),
    tp(SYS_DVBS, 11931, V, 27500, F34, QPSK),
    tp(SYS_DVBS, 12012, V, 27500, F34, QPSK),
    tp(SYS_DVBS, 12092, V, 27500, F12, QPSK),
];

pub static SATELLITES: &[Satellite] = &[
    Satellite {
        short_name: "S30W0",
        full_name: "Hispasat 30.0W",
        position: 300,
        west: true,
        transponders: S30W0,
    },
    Satellite {
        short_name: "S0W8",
        full_name: "Thor 0.8W",
        position: 8,
        west: true,
        transponders: S0W8,
    },
    Satellite {
        short_name: "S5E0",
        full_name: "SES-5/Astra 4A 5.0E",
        position: 50,
        west: false,
        transponders: S5E0,
    },
    Satellite {
        short_name: "S13E0",
        full_name: "Hotbird 13.0E",
        position: 130,
        west: false,
        transponders: S13E0,
    },
    Satellite {
        short_name: "S19E2",
        full_name: "Astra 1KR/1L/1M/1N 19.2E",
        position: 192,
        west: false,
        transponders: S19E2,
    },
    Satellite {
        short_name: "S23E5",
        full_name: "Astra 3B 23.5E",
        position: 235,
        west: false,
        transponders: S23E5,
    },
    Satellite {
        short_name: "S28E2",
        full_name: "Astra 2E/2F/2G 28.2E",
        position: 282,
        west: false,
        transponders: S28E2,
    },
];

/// Look up a satellite by short name, e.g. `"S19E2"`.
pub fn find_satellite(short_name: &str) -> Result<&'static Satellite, ScanError> {
    SATELLITES
        .iter()
        .find(|s| s.short_name.eq_ignore_ascii_case(short_name))
        .ok_or_else(|| ScanError::UnknownSatellite(short_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_satellite() {
        let astra = find_satellite("s19e2").unwrap();
        assert_eq!(astra.source().to_string(), "S19.2E");
        assert_eq!(find_satellite("S30W0").unwrap().source().orbital_position(), -300);
        assert_eq!(
            find_satellite("S99E9").unwrap_err(),
            ScanError::UnknownSatellite("S99E9".into())
        );
    }

    #[test]
    fn test_transponder_to_channel() {
        let astra = find_satellite("S19E2").unwrap();
        let hd = astra
            .transponders
            .iter()
            .find(|t| t.frequency == 11494)
            .unwrap();
        let c = hd.to_channel(astra.source());
        assert_eq!(c.print_transponder(), "S2  11494.00 MHz SR 22000 HC23M5O35P0S1");

        let sd = astra.transponders[5].to_channel(astra.source());
        assert_eq!(sd.params(), "HC34M2S0");
    }

    #[test]
    fn test_all_tables_are_in_if_band() {
        let lnb = dvbscan_protocol::Lnb::default();
        for sat in SATELLITES {
            assert!(!sat.transponders.is_empty());
            for t in sat.transponders {
                assert!(t.to_channel(sat.source()).valid_sat_if(&lnb), "{} {}", sat.short_name, t.frequency);
            }
        }
    }
}
