//! Transponder equivalence.
//!
//! Two records denote the same physical transponder when their sources match,
//! their frequencies are within a per-source tolerance and their delivery
//! specific parameters agree. In relaxed mode a parameter holding its
//! "auto" value on either side is not a difference.

use dvbscan_protocol::{Channel, Source, UNSET};

use crate::plan::Tolerances;

/// Bring a frequency to kHz (MHz for satellites) whatever unit it is stored in.
pub fn format_freq(f: u32) -> u32 {
    dvbscan_protocol::normalize_khz(f)
}

/// `|a - b| <= delta` after normalisation. The boundary is inclusive.
pub fn nearly_same_frequency(a: u32, b: u32, delta: u32) -> bool {
    let f1 = format_freq(a);
    let f2 = format_freq(b);
    f1.abs_diff(f2) <= delta
}

pub fn is_nearly_same_transponder(a: &Channel, b: &Channel, delta: u32) -> bool {
    nearly_same_frequency(a.frequency, b.frequency, delta)
}

/// Structural frequency tolerance for a source.
pub fn max_delta(source: &Source, tol: &Tolerances) -> u32 {
    match source {
        Source::Satellite { .. } => tol.satellite_mhz,
        Source::Terrestrial => tol.terrestrial_khz,
        Source::Cable | Source::Atsc => tol.generic_khz,
    }
}

fn different(a: i32, b: i32, relaxed: bool, auto_value: i32) -> bool {
    if relaxed && (a == auto_value || b == auto_value) {
        return false;
    }
    a != b
}

/// False only if `a` and `b` denote the same transponder.
pub fn is_different_transponder(a: &Channel, b: &Channel, relaxed: bool, tol: &Tolerances) -> bool {
    if a.source != b.source {
        return true;
    }
    if !is_nearly_same_transponder(a, b, max_delta(&a.source, tol)) {
        return true;
    }

    match a.source {
        Source::Terrestrial => {
            different(a.modulation, b.modulation, relaxed, UNSET)
                // bandwidth 8 is the "unspecified" default
                || different(a.bandwidth, b.bandwidth, relaxed, 8)
                || different(a.fec, b.fec, relaxed, UNSET)
                || different(a.hierarchy, b.hierarchy, relaxed, UNSET)
                || different(a.fec_low, b.fec_low, relaxed, UNSET)
                || different(a.transmission, b.transmission, relaxed, UNSET)
                || different(a.guard, b.guard, relaxed, UNSET)
                || a.delsys != b.delsys
        }
        Source::Atsc => different(a.modulation, b.modulation, relaxed, UNSET),
        Source::Cable => {
            different(a.modulation, b.modulation, relaxed, UNSET)
                || a.symbol_rate != b.symbol_rate
                || different(a.fec, b.fec, relaxed, UNSET)
                || a.delsys != b.delsys
        }
        Source::Satellite { .. } => {
            if a.symbol_rate != b.symbol_rate
                || a.polarization != b.polarization
                || different(a.fec, b.fec, relaxed, UNSET)
                || a.delsys != b.delsys
            {
                return true;
            }
            a.delsys == 1
                && (different(a.modulation, b.modulation, relaxed, UNSET)
                    || a.stream_id != b.stream_id)
        }
    }
}

/// Relaxed comparison used while merging discovered transponders: a field
/// left to auto-detection on either side never makes a difference.
pub fn is_different_transponder_deep_scan(a: &Channel, b: &Channel, tol: &Tolerances) -> bool {
    is_different_transponder(a, b, true, tol)
}

/// True if `candidate` is already present in any of `sets`.
///
/// Terrestrial, cable and ATSC entries are matched by frequency (ATSC also by
/// modulation); satellites need a full structural match.
pub fn known_transponder(
    candidate: &Channel,
    relaxed: bool,
    sets: &[&[Channel]],
    tol: &Tolerances,
) -> bool {
    sets.iter()
        .flat_map(|set| set.iter())
        .filter(|known| known.source.tag() == candidate.source.tag())
        .any(|known| match candidate.source {
            Source::Terrestrial => {
                // several PLPs may share one frequency
                if candidate.delsys != 0 && known.stream_id != candidate.stream_id {
                    return false;
                }
                // a T2 attempt does not shadow a failed T attempt and vice versa
                if candidate.delsys != known.delsys && !known.tunable {
                    return false;
                }
                is_nearly_same_transponder(known, candidate, tol.default_delta)
            }
            Source::Cable => is_nearly_same_transponder(known, candidate, tol.default_delta),
            Source::Atsc => {
                is_nearly_same_transponder(known, candidate, tol.default_delta)
                    && known.modulation == candidate.modulation
            }
            Source::Satellite { .. } => !is_different_transponder(candidate, known, relaxed, tol),
        })
}

/// Index of the channel in `channels` carried on `transponder` with the same
/// transport stream and service id.
pub fn find_by_transponder(channels: &[Channel], transponder: &Channel, tol: &Tolerances) -> Option<usize> {
    let delta = max_delta(&transponder.source, tol);
    channels.iter().position(|ch| {
        is_nearly_same_transponder(ch, transponder, delta)
            && ch.source == transponder.source
            && ch.tid == transponder.tid
            && ch.sid == transponder.sid
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dvbscan_protocol::Polarization;

    fn sat(freq: u32) -> Channel {
        let mut c = Channel::new(Source::Satellite { position: 192, west: false });
        c.frequency = freq;
        c.symbol_rate = 27500;
        c.polarization = Some(Polarization::Vertical);
        c.fec = 34;
        c
    }

    fn terr(freq: u32) -> Channel {
        let mut c = Channel::new(Source::Terrestrial);
        c.frequency = freq;
        c.modulation = 64;
        c.fec = 23;
        c.guard = 4;
        c.transmission = 8;
        c.hierarchy = 0;
        c
    }

    #[test]
    fn test_nearly_same_frequency_boundary_is_inclusive() {
        assert!(nearly_same_frequency(11727, 11729, 2));
        assert!(!nearly_same_frequency(11727, 11730, 2));
        // Hz, kHz and MHz forms of one frequency
        assert!(nearly_same_frequency(474, 474_000_000, 0));
        assert!(nearly_same_frequency(474_000, 476_001, 2001));
        assert!(!nearly_same_frequency(474_000_000, 476_002_000, 2001));
    }

    #[test]
    fn test_satellite_known_within_two_mhz() {
        let tol = Tolerances::default();
        let known = vec![sat(11728)];
        let candidate = sat(11727);
        assert!(known_transponder(&candidate, false, &[&known], &tol));

        let mut other_pol = sat(11727);
        other_pol.polarization = Some(Polarization::Horizontal);
        assert!(!known_transponder(&other_pol, false, &[&known], &tol));

        let far = sat(11731);
        assert!(!known_transponder(&far, false, &[&known], &tol));
    }

    #[test]
    fn test_terrestrial_relaxed_modulation() {
        let tol = Tolerances::default();
        let mut a = terr(474_000_000);
        a.modulation = UNSET;
        let b = terr(474_000_000);
        assert!(!is_different_transponder(&a, &b, true, &tol));
        assert!(is_different_transponder(&a, &b, false, &tol));
    }

    #[test]
    fn test_delsys_never_relaxed() {
        let tol = Tolerances::default();
        let a = terr(474_000_000);
        let mut b = terr(474_000_000);
        b.delsys = 1;
        assert!(is_different_transponder(&a, &b, true, &tol));
    }

    #[test]
    fn test_is_different_is_symmetric() {
        let tol = Tolerances::default();
        let mut variants = Vec::new();
        for (m, bw, g) in [(64, 8, 4), (UNSET, 8, 4), (64, 7, UNSET), (16, 8, 4)] {
            let mut c = terr(474_000_000);
            c.modulation = m;
            c.bandwidth = bw;
            c.guard = g;
            variants.push(c);
        }
        variants.push(terr(474_200_000));
        variants.push(terr(474_300_000));
        for a in &variants {
            for b in &variants {
                for relaxed in [false, true] {
                    assert_eq!(
                        is_different_transponder(a, b, relaxed, &tol),
                        is_different_transponder(b, a, relaxed, &tol)
                    );
                }
            }
        }
    }

    #[test]
    fn test_satellite_s2_stream_id() {
        let tol = Tolerances::default();
        let mut a = sat(11494);
        a.delsys = 1;
        a.modulation = 5;
        let mut b = a.clone();
        assert!(!is_different_transponder(&a, &b, false, &tol));
        b.stream_id = 1;
        assert!(is_different_transponder(&a, &b, true, &tol));
        b.stream_id = 0;
        b.modulation = UNSET;
        assert!(!is_different_transponder(&a, &b, true, &tol));
    }

    #[test]
    fn test_known_transponder_terrestrial_plp_and_tunable() {
        let tol = Tolerances::default();
        let mut scanned = terr(474_000_000);
        scanned.delsys = 0;
        let set = vec![scanned.clone()];

        let mut t2 = terr(474_000_000);
        t2.delsys = 1;
        // untunable T entry does not hide a T2 candidate
        assert!(!known_transponder(&t2, false, &[&set], &tol));

        let mut tunable = scanned;
        tunable.tunable = true;
        let set = vec![tunable];
        assert!(known_transponder(&t2, false, &[&set], &tol));

        t2.stream_id = 1;
        assert!(!known_transponder(&t2, false, &[&set], &tol));
    }

    #[test]
    fn test_known_transponder_atsc_modulation() {
        let tol = Tolerances::default();
        let mut vsb = Channel::new(Source::Atsc);
        vsb.frequency = 473_000;
        vsb.modulation = 10;
        let set = vec![vsb.clone()];
        assert!(known_transponder(&vsb, false, &[&set], &tol));
        let mut qam = vsb;
        qam.modulation = 256;
        assert!(!known_transponder(&qam, false, &[&set], &tol));
    }

    #[test]
    fn test_dedup_idempotence() {
        let tol = Tolerances::default();
        let mut known: Vec<Channel> = Vec::new();
        let discovered = sat(12188);
        for _ in 0..2 {
            if !known_transponder(&discovered, true, &[&known], &tol) {
                known.push(discovered.clone());
            }
            assert!(known_transponder(&discovered, true, &[&known], &tol));
        }
        assert_eq!(known.len(), 1);
    }

    #[test]
    fn test_find_by_transponder() {
        let tol = Tolerances::default();
        let mut ch = sat(11836);
        ch.tid = 1101;
        ch.sid = 28106;
        let channels = vec![sat(10744), ch.clone()];
        let mut tp = sat(11837);
        tp.tid = 1101;
        tp.sid = 28106;
        assert_eq!(find_by_transponder(&channels, &tp, &tol), Some(1));
        tp.sid = 1;
        assert_eq!(find_by_transponder(&channels, &tp, &tol), None);
    }

    #[test]
    fn test_deep_scan_ignores_auto_fields() {
        let tol = Tolerances::default();
        let mut a = terr(474_000_000);
        a.fec = UNSET;
        a.guard = UNSET;
        let b = terr(474_100_000);
        assert!(!is_different_transponder_deep_scan(&a, &b, &tol));
        let c = terr(474_300_000);
        assert!(is_different_transponder_deep_scan(&a, &c, &tol));
    }
}
