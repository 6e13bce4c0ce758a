//! Run-wide settings of a scan.

use dvbscan_protocol::{Lnb, ScanFlags};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::plan::countries::ATSC_TYPE_VSB;
use crate::plan::Tolerances;
use crate::ts_analyzer::pid;

/// Every knob of a scan run. Missing fields of a deserialized `Setup` take
/// their default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Setup {
    /// Which services end up in the result.
    pub scan_flags: ScanFlags,
    pub enable_s2: bool,
    /// NIT pid. Anything but 0x10 overrides the pid announced in the PAT.
    pub network_pid: u16,
    pub dvbt_inversion: i32,
    pub dvbc_inversion: i32,
    /// 0 tries the first two table rates, 1..=15 a single rate, anything
    /// above every rate.
    pub dvbc_symbolrate: u8,
    /// One of the `ATSC_TYPE_*` constants.
    pub atsc_type: u8,
    pub signal_wait_ms: u64,
    pub lock_timeout_ms: u64,
    /// Follow transport streams announced in network information tables.
    pub use_nit: bool,
    pub parse_lcn: bool,
    /// ISO 3166 alpha-3, selects country specific logical channel lists.
    pub country_alpha3: String,
    pub lnb_slof: u32,
    pub lnb_low: u32,
    pub lnb_high: u32,
    pub append_new: bool,
    pub update_existing: bool,
    pub remove_invalid: bool,
    pub tolerances: Tolerances,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            scan_flags: ScanFlags::ALL,
            enable_s2: true,
            network_pid: pid::NIT,
            dvbt_inversion: 0,
            dvbc_inversion: 0,
            dvbc_symbolrate: 0,
            atsc_type: ATSC_TYPE_VSB,
            signal_wait_ms: 1000,
            lock_timeout_ms: 3000,
            use_nit: true,
            parse_lcn: true,
            country_alpha3: String::new(),
            lnb_slof: 11700,
            lnb_low: 9750,
            lnb_high: 10600,
            append_new: true,
            update_existing: false,
            remove_invalid: false,
            tolerances: Tolerances::default(),
        }
    }
}

impl Setup {
    pub fn lnb(&self) -> Lnb {
        Lnb {
            slof: self.lnb_slof,
            low: self.lnb_low,
            high: self.lnb_high,
        }
    }

    pub fn signal_wait(&self) -> Duration {
        Duration::from_millis(self.signal_wait_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    /// Indices into the DVB-C symbol rate table to walk.
    pub fn dvbc_symbolrate_range(&self) -> std::ops::RangeInclusive<usize> {
        match self.dvbc_symbolrate {
            0 => 0..=1,
            n @ 1..=15 => {
                let i = usize::from(n) - 1;
                i..=i
            }
            _ => 0..=14,
        }
    }
}
