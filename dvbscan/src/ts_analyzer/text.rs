//! DVB text strings (EN 300 468 Annex A).
//!
//! The first byte may select a character table; without one the default
//! table (ISO/IEC 6937 with the euro sign) applies. Control codes
//! 0x80..=0x9F are removed, except that 0x86/0x87 delimit the emphasised
//! part of a name, which becomes the short name.

use encoding_rs::{
    Encoding, ISO_8859_10, ISO_8859_13, ISO_8859_14, ISO_8859_15, ISO_8859_16, ISO_8859_2, ISO_8859_3,
    ISO_8859_4, ISO_8859_5, ISO_8859_6, ISO_8859_7, ISO_8859_8, UTF_16BE, UTF_8, WINDOWS_1252,
    WINDOWS_1254, WINDOWS_874,
};

const EMPHASIS_ON: char = '\u{86}';
const EMPHASIS_OFF: char = '\u{87}';

/// A decoded service or provider name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DvbText {
    pub text: String,
    /// Text found between emphasis control codes.
    pub short: String,
}

/// Decode a DVB string and split off the emphasised short name.
pub fn decode_dvb_text(bytes: &[u8]) -> DvbText {
    let raw = decode_raw(bytes);

    let mut text = String::with_capacity(raw.len());
    let mut short = String::new();
    let mut emphasis = false;
    for c in raw.chars() {
        match c {
            EMPHASIS_ON => emphasis = true,
            EMPHASIS_OFF => emphasis = false,
            '\u{80}'..='\u{9F}' => {}
            _ => {
                if emphasis {
                    short.push(c);
                }
                text.push(c);
            }
        }
    }

    DvbText {
        text: compact_whitespace(&text),
        short: compact_whitespace(&short),
    }
}

/// Decode to a plain string, control codes kept.
pub fn decode_raw(bytes: &[u8]) -> String {
    let Some(&first) = bytes.first() else {
        return String::new();
    };

    let (encoding, body): (Option<&'static Encoding>, &[u8]) = match first {
        0x01..=0x0B => (iso_8859_part(first as u16 + 4), &bytes[1..]),
        0x10 if bytes.len() >= 3 => {
            let part = u16::from_be_bytes([bytes[1], bytes[2]]);
            (iso_8859_part(part), &bytes[3..])
        }
        0x11 | 0x14 => (Some(UTF_16BE), &bytes[1..]),
        0x15 => (Some(UTF_8), &bytes[1..]),
        0x00..=0x1F => (None, &bytes[1..]),
        _ => (None, bytes),
    };

    match encoding {
        Some(enc) if enc == UTF_16BE || enc == UTF_8 => {
            let (decoded, _, _) = enc.decode(body);
            decoded.into_owned()
        }
        Some(enc) => decode_single_byte(enc, body),
        None => decode_default_table(body),
    }
}

/// Decode with a single byte table, passing control codes 0x80..=0x9F
/// through unchanged. The windows-125x tables would map them to printable
/// characters.
fn decode_single_byte(encoding: &'static Encoding, bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for run in bytes.split_inclusive(|b| (0x80..=0x9F).contains(b)) {
        let (text, control) = match run.split_last() {
            Some((&last, text)) if (0x80..=0x9F).contains(&last) => (text, Some(char::from(last))),
            _ => (run, None),
        };
        let (decoded, _) = encoding.decode_without_bom_handling(text);
        out.push_str(&decoded);
        out.extend(control);
    }
    out
}

fn iso_8859_part(part: u16) -> Option<&'static Encoding> {
    Some(match part {
        1 => WINDOWS_1252,
        2 => ISO_8859_2,
        3 => ISO_8859_3,
        4 => ISO_8859_4,
        5 => ISO_8859_5,
        6 => ISO_8859_6,
        7 => ISO_8859_7,
        8 => ISO_8859_8,
        9 => WINDOWS_1254,
        10 => ISO_8859_10,
        11 => WINDOWS_874,
        13 => ISO_8859_13,
        14 => ISO_8859_14,
        15 => ISO_8859_15,
        16 => ISO_8859_16,
        _ => return None,
    })
}

/// Default DVB table. Diacritical marks 0xC1..=0xCF precede their base
/// letter and are emitted as combining characters after it.
fn decode_default_table(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut pending: Option<char> = None;

    for &b in bytes {
        if (0xC1..=0xCF).contains(&b) {
            pending = combining_mark(b);
            continue;
        }
        let c = match b {
            0x00..=0x7F => b as char,
            0x80..=0x9F => char::from_u32(b as u32).unwrap_or('\u{FFFD}'),
            _ => default_table_upper(b),
        };
        out.push(c);
        if let Some(mark) = pending.take() {
            out.push(mark);
        }
    }
    out
}

fn combining_mark(b: u8) -> Option<char> {
    Some(match b {
        0xC1 => '\u{300}',
        0xC2 => '\u{301}',
        0xC3 => '\u{302}',
        0xC4 => '\u{303}',
        0xC5 => '\u{304}',
        0xC6 => '\u{306}',
        0xC7 => '\u{307}',
        0xC8 => '\u{308}',
        0xCA => '\u{30A}',
        0xCB => '\u{327}',
        0xCD => '\u{30B}',
        0xCE => '\u{328}',
        0xCF => '\u{30C}',
        _ => return None,
    })
}

fn default_table_upper(b: u8) -> char {
    match b {
        0xA4 => '\u{20AC}',
        0xA6 => '#',
        0xA8 => '\u{A4}',
        0xA9 => '\u{2018}',
        0xAA => '\u{201C}',
        0xAC => '\u{2190}',
        0xAD => '\u{2191}',
        0xAE => '\u{2192}',
        0xAF => '\u{2193}',
        0xB4 => '\u{D7}',
        0xB8 => '\u{F7}',
        0xB9 => '\u{2019}',
        0xBA => '\u{201D}',
        0xD0 => '\u{2015}',
        0xD1 => '\u{B9}',
        0xD2 => '\u{AE}',
        0xD3 => '\u{A9}',
        0xD4 => '\u{2122}',
        0xD5 => '\u{266A}',
        0xE0 => '\u{2126}',
        0xE1 => '\u{C6}',
        0xE2 => '\u{110}',
        0xE3 => '\u{AA}',
        0xE4 => '\u{126}',
        0xE6 => '\u{132}',
        0xE7 => '\u{13F}',
        0xE8 => '\u{141}',
        0xE9 => '\u{D8}',
        0xEA => '\u{152}',
        0xEB => '\u{BA}',
        0xEC => '\u{DE}',
        0xED => '\u{166}',
        0xEE => '\u{14A}',
        0xEF => '\u{149}',
        0xF0 => '\u{138}',
        0xF1 => '\u{E6}',
        0xF2 => '\u{111}',
        0xF3 => '\u{F0}',
        0xF4 => '\u{127}',
        0xF5 => '\u{131}',
        0xF6 => '\u{133}',
        0xF7 => '\u{140}',
        0xF8 => '\u{142}',
        0xF9 => '\u{F8}',
        0xFA => '\u{153}',
        0xFB => '\u{DF}',
        0xFC => '\u{FE}',
        0xFD => '\u{167}',
        0xFE => '\u{14B}',
        0xFF => '\u{AD}',
        // the rest of the upper half matches Latin-1
        _ => b as char,
    }
}

/// Collapse whitespace runs to a single space and trim both ends.
pub fn compact_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
