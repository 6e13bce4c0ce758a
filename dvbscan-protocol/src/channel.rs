//! The transponder/channel record.
//!
//! A single record type describes both a bare transponder (tuning parameters
//! only, as produced by the frequency plan or a network information table) and
//! a fully resolved channel (tuning parameters plus service identifiers and
//! elementary stream PIDs).

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::types::{Cell, Lnb, Pid, Polarization, Source, UNSET};

/// Normalize a frequency to kHz (MHz for satellite values), accepting MHz,
/// kHz or Hz input.
pub fn normalize_khz(frequency: u32) -> u32 {
    let mut f = frequency as u64;
    if f < 1000 {
        f *= 1000;
    }
    if f > 999_999 {
        f /= 1000;
    }
    f as u32
}

/// Transponder or channel record.
///
/// Frequency units depend on the source: MHz for satellite, Hz for
/// terrestrial, kHz for cable and ATSC. Symbol rates are kSym/s.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub short_name: String,
    pub provider: String,

    pub source: Source,
    pub frequency: u32,
    pub symbol_rate: u32,
    pub polarization: Option<Polarization>,
    /// MHz, or 1712 for 1.712 MHz.
    pub bandwidth: i32,
    pub fec: i32,
    pub fec_low: i32,
    pub guard: i32,
    pub inversion: i32,
    pub modulation: i32,
    pub pilot: i32,
    pub rolloff: i32,
    pub stream_id: i32,
    pub system_id: i32,
    /// 0 = first generation, 1 = second generation.
    pub delsys: i32,
    pub transmission: i32,
    pub miso: i32,
    pub hierarchy: i32,

    pub nid: u16,
    pub onid: u16,
    pub tid: u16,
    pub sid: u16,
    pub rid: u16,

    pub vpid: Pid,
    pub pcr_pid: u16,
    pub tpid: u16,
    pub pmt_pid: u16,
    pub apids: Vec<Pid>,
    pub dpids: Vec<Pid>,
    pub spids: Vec<Pid>,
    pub caids: Vec<u16>,

    pub free_ca_mode: bool,
    pub service_type: u16,
    pub lcn: Option<u16>,

    /// DVB-T2 cells announced in the network information table.
    pub cells: Vec<Cell>,

    /// Lock was achieved on this transponder.
    pub tunable: bool,
    /// Already processed for transponder expansion.
    pub tested: bool,
    /// Already logged.
    pub reported: bool,
}

impl Channel {
    /// A skeleton record with every tuning parameter at its default.
    pub fn new(source: Source) -> Self {
        Self {
            name: "???".to_string(),
            short_name: String::new(),
            provider: String::new(),
            source,
            frequency: 0,
            symbol_rate: 0,
            polarization: None,
            bandwidth: 8,
            fec: UNSET,
            fec_low: UNSET,
            guard: UNSET,
            inversion: UNSET,
            modulation: 2,
            pilot: UNSET,
            rolloff: UNSET,
            stream_id: 0,
            system_id: 0,
            delsys: 0,
            transmission: UNSET,
            miso: 0,
            hierarchy: UNSET,
            nid: 0,
            onid: 0,
            tid: 0,
            sid: 0,
            rid: 0,
            vpid: Pid::default(),
            pcr_pid: 0,
            tpid: 0,
            pmt_pid: 0,
            apids: Vec::new(),
            dpids: Vec::new(),
            spids: Vec::new(),
            caids: Vec::new(),
            free_ca_mode: false,
            service_type: 0xFFFF,
            lcn: None,
            cells: Vec::new(),
            tunable: false,
            tested: false,
            reported: false,
        }
    }

    /// Copy the tuning parameters (not the identifiers or PIDs) of `other`.
    pub fn copy_transponder_data(&mut self, other: &Channel) {
        self.frequency = other.frequency;
        self.source = other.source;
        self.symbol_rate = other.symbol_rate;
        self.bandwidth = other.bandwidth;
        self.fec = other.fec;
        self.fec_low = other.fec_low;
        self.guard = other.guard;
        self.polarization = other.polarization;
        self.inversion = other.inversion;
        self.modulation = other.modulation;
        self.pilot = other.pilot;
        self.rolloff = other.rolloff;
        self.stream_id = other.stream_id;
        self.system_id = other.system_id;
        self.delsys = other.delsys;
        self.transmission = other.transmission;
        self.miso = other.miso;
        self.hierarchy = other.hierarchy;
    }

    /// A fresh record carrying only the tuning parameters of `self`.
    pub fn transponder(&self) -> Channel {
        let mut tp = Channel::new(self.source);
        tp.copy_transponder_data(self);
        tp
    }

    pub fn is_second_generation(&self) -> bool {
        self.delsys == 1
    }

    /// VDR style parameter string; parameters holding [`UNSET`] are omitted.
    pub fn params(&self) -> String {
        let mut s = String::with_capacity(72);
        let s2 = self.delsys != 0;

        match self.source {
            Source::Atsc => {
                put_param(&mut s, 'I', self.inversion);
                put_param(&mut s, 'M', self.modulation);
            }
            Source::Cable => {
                put_param(&mut s, 'C', self.fec);
                put_param(&mut s, 'I', self.inversion);
                put_param(&mut s, 'M', self.modulation);
            }
            Source::Satellite { .. } => {
                if let Some(p) = self.polarization {
                    s.push(p.as_char());
                }
                put_param(&mut s, 'C', self.fec);
                put_param(&mut s, 'I', self.inversion);
                put_param(&mut s, 'M', self.modulation);
                if s2 {
                    put_param(&mut s, 'N', self.pilot);
                    put_param(&mut s, 'O', self.rolloff);
                    put_param(&mut s, 'P', self.stream_id);
                }
                put_param(&mut s, 'S', self.delsys);
            }
            Source::Terrestrial => {
                put_param(&mut s, 'B', self.bandwidth);
                put_param(&mut s, 'C', self.fec);
                put_param(&mut s, 'D', self.fec_low);
                put_param(&mut s, 'G', self.guard);
                put_param(&mut s, 'I', self.inversion);
                put_param(&mut s, 'M', self.modulation);
                if s2 {
                    put_param(&mut s, 'P', self.stream_id);
                    put_param(&mut s, 'Q', self.system_id);
                }
                put_param(&mut s, 'S', self.delsys);
                put_param(&mut s, 'T', self.transmission);
                if s2 {
                    put_param(&mut s, 'X', self.miso);
                }
                put_param(&mut s, 'Y', self.hierarchy);
            }
        }
        s
    }

    /// One line transponder description, e.g. `"S2  11494.00 MHz SR 22000 HC23M5O35P0S1"`.
    pub fn print_transponder(&self) -> String {
        let tag = self.source.tag();
        let f = normalize_khz(self.frequency);
        let mut s = String::with_capacity(48);
        s.push(tag);
        s.push_str(if self.delsys == 1 { "2 " } else { "  " });
        let mhz = if self.source.is_satellite() {
            f as f64
        } else {
            f as f64 / 1000.0
        };
        let _ = write!(s, "{:8.2} MHz", mhz);

        if matches!(self.source, Source::Cable | Source::Satellite { .. }) {
            let sr = normalize_khz(self.symbol_rate);
            let _ = write!(s, " SR {} {}", sr, self.params());
        }
        s
    }

    /// Full `channels.conf` line:
    /// `name,short;provider:freq:params:source:srate:vpid+pcr=type:apids;dpids:tpid:caids:sid:onid:tid:rid`.
    pub fn to_vdr_line(&self) -> String {
        let mut s = String::with_capacity(160);

        if self.name.is_empty() {
            s.push_str("NULL");
        } else {
            s.push_str(&self.name);
        }
        if !self.short_name.is_empty() {
            s.push(',');
            s.push_str(&self.short_name);
        }
        if !self.provider.is_empty() {
            s.push(';');
            s.push_str(&self.provider);
        }

        let _ = write!(
            s,
            ":{}:{}:{}:{}:{}",
            self.frequency,
            self.params(),
            self.source,
            self.symbol_rate,
            self.vpid.pid
        );
        if self.pcr_pid != 0 && self.pcr_pid != self.vpid.pid {
            let _ = write!(s, "+{}", self.pcr_pid);
        }
        if self.vpid.stream_type != 0 {
            let _ = write!(s, "={}", self.vpid.stream_type);
        }

        if self.apids.is_empty() {
            s.push_str(":0");
        } else {
            for (i, a) in self.apids.iter().enumerate() {
                s.push(if i == 0 { ':' } else { ',' });
                write_pid(&mut s, a);
            }
        }
        for (i, d) in self.dpids.iter().enumerate() {
            s.push(if i == 0 { ';' } else { ',' });
            write_pid(&mut s, d);
        }

        let _ = write!(s, ":{}", self.tpid);

        if self.caids.is_empty() {
            s.push_str(":0");
        } else {
            for (i, ca) in self.caids.iter().enumerate() {
                s.push(if i == 0 { ':' } else { ',' });
                let _ = write!(s, "{:x}", ca);
            }
        }

        let _ = write!(s, ":{}:{}:{}:{}", self.sid, self.onid, self.tid, self.rid);
        s
    }

    /// True if the satellite intermediate frequency after LNB conversion lies
    /// within the 950..=2150 MHz IF band.
    pub fn valid_sat_if(&self, lnb: &Lnb) -> bool {
        let mut f = self.frequency as i64;
        while f > 999_999 {
            f /= 1000;
        }
        f -= if f < lnb.slof as i64 {
            lnb.low as i64
        } else {
            lnb.high as i64
        };
        (950..=2150).contains(&f)
    }
}

fn put_param(s: &mut String, letter: char, value: i32) {
    if value != UNSET {
        let _ = write!(s, "{}{}", letter, value);
    }
}

fn write_pid(s: &mut String, pid: &Pid) {
    let _ = write!(s, "{}", pid.pid);
    if !pid.lang.is_empty() {
        let _ = write!(s, "={}", pid.lang);
    }
    if pid.stream_type != 0 {
        let _ = write!(s, "@{}", pid.stream_type);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn astra_tp() -> Channel {
        let mut c = Channel::new(Source::Satellite { position: 192, west: false });
        c.frequency = 11494;
        c.symbol_rate = 22000;
        c.polarization = Some(Polarization::Horizontal);
        c.fec = 23;
        c.modulation = 5;
        c.delsys = 1;
        c.rolloff = 35;
        c.inversion = UNSET;
        c
    }

    #[test]
    fn test_normalize_khz() {
        assert_eq!(normalize_khz(474), 474_000);
        assert_eq!(normalize_khz(474_000), 474_000);
        assert_eq!(normalize_khz(474_000_000), 474_000);
        assert_eq!(normalize_khz(11494), 11494);
    }

    #[test]
    fn test_satellite_params_and_print() {
        let tp = astra_tp();
        assert_eq!(tp.params(), "HC23M5O35P0S1");
        assert_eq!(tp.print_transponder(), "S2  11494.00 MHz SR 22000 HC23M5O35P0S1");
    }

    #[test]
    fn test_first_generation_satellite_omits_s2_fields() {
        let mut tp = astra_tp();
        tp.delsys = 0;
        tp.modulation = 2;
        tp.fec = 34;
        assert_eq!(tp.params(), "HC34M2S0");
    }

    #[test]
    fn test_terrestrial_t2_params() {
        let mut tp = Channel::new(Source::Terrestrial);
        tp.frequency = 626_000_000;
        tp.delsys = 1;
        tp.stream_id = 0;
        tp.system_id = 12;
        tp.modulation = UNSET;
        tp.guard = 128;
        tp.transmission = 32;
        tp.hierarchy = 0;
        assert_eq!(tp.params(), "B8G128P0Q12S1T32X0Y0");
        assert_eq!(tp.print_transponder(), "T2   626.00 MHz");
    }

    #[test]
    fn test_cable_print() {
        let mut tp = Channel::new(Source::Cable);
        tp.frequency = 346_000;
        tp.symbol_rate = 6900;
        tp.modulation = 256;
        tp.fec = 0;
        tp.inversion = UNSET;
        assert_eq!(tp.print_transponder(), "C    346.00 MHz SR 6900 C0M256");
    }

    #[test]
    fn test_vdr_line() {
        let mut ch = astra_tp();
        ch.name = "Das Erste HD".into();
        ch.provider = "ARD".into();
        ch.vpid = Pid::new(5101, 27);
        ch.pcr_pid = 5101;
        ch.apids.push(Pid { pid: 5102, stream_type: 4, lang: "deu".into() });
        ch.dpids.push(Pid { pid: 5106, stream_type: 0x7A, lang: "deu".into() });
        ch.tpid = 5104;
        ch.sid = 10301;
        ch.onid = 1;
        ch.tid = 1019;

        assert_eq!(
            ch.to_vdr_line(),
            "Das Erste HD;ARD:11494:HC23M5O35P0S1:S19.2E:22000:5101=27:5102=deu@4;5106=deu@122:5104:0:10301:1:1019:0"
        );
    }

    #[test]
    fn test_vdr_line_caids_and_pcr() {
        let mut ch = Channel::new(Source::Cable);
        ch.name = String::new();
        ch.frequency = 346_000;
        ch.symbol_rate = 6900;
        ch.vpid = Pid::new(100, 2);
        ch.pcr_pid = 101;
        ch.caids = vec![0x1702, 0x0D05];
        let line = ch.to_vdr_line();
        assert!(line.starts_with("NULL:346000:"));
        assert!(line.contains(":100+101=2:0:0:1702,d05:"));
    }

    #[test]
    fn test_valid_sat_if() {
        let lnb = Lnb::default();
        let mut tp = astra_tp();
        assert!(tp.valid_sat_if(&lnb));
        tp.frequency = 10_600;
        assert!(!tp.valid_sat_if(&lnb));
    }

    #[test]
    fn test_transponder_copy_drops_ids() {
        let mut ch = astra_tp();
        ch.sid = 42;
        ch.apids.push(Pid::new(10, 3));
        let tp = ch.transponder();
        assert_eq!(tp.sid, 0);
        assert!(tp.apids.is_empty());
        assert_eq!(tp.frequency, ch.frequency);
        assert_eq!(tp.polarization, ch.polarization);
    }
}
