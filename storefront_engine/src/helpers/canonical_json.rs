//! Canonical JSON text for payload signing.
//!
//! The output is compact (`,` and `:` separators, no whitespace), keys are emitted in sorted order, and every `/` is
//! written as `\/`. Two escaping flavours exist because the payment provider has signed with both over time:
//!
//! * [`JsonEscaping::Ascii`] escapes everything outside printable ASCII as `\uXXXX` (astral characters become
//!   surrogate pairs).
//! * [`JsonEscaping::Utf8`] writes non-ASCII characters literally and only escapes control characters.
//!
//! In both flavours `"` and `\` are backslash-escaped, `\n`, `\r`, `\t`, `\b` and `\f` use their short escapes and
//! other control characters use lowercase `\u00xx`.
use std::fmt::Write;

use super::payload_value::{PayloadMap, PayloadValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsonEscaping {
    Ascii,
    Utf8,
}

pub fn canonical_json(map: &PayloadMap, escaping: JsonEscaping) -> String {
    let mut out = String::with_capacity(128);
    write_map(map, escaping, &mut out);
    out
}

fn write_value(value: &PayloadValue, escaping: JsonEscaping, out: &mut String) {
    match value {
        PayloadValue::Text(s) => write_str(s, escaping, out),
        PayloadValue::List(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(item, escaping, out);
            }
            out.push(']');
        },
        PayloadValue::Map(map) => write_map(map, escaping, out),
    }
}

fn write_map(map: &PayloadMap, escaping: JsonEscaping, out: &mut String) {
    out.push('{');
    for (i, (k, v)) in map.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_str(k, escaping, out);
        out.push(':');
        write_value(v, escaping, out);
    }
    out.push('}');
}

fn write_str(s: &str, escaping: JsonEscaping, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '/' => out.push_str("\\/"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => push_unicode_escape(c as u16, out),
            ' '..='~' => out.push(c),
            c => match escaping {
                JsonEscaping::Utf8 => out.push(c),
                JsonEscaping::Ascii => {
                    let mut units = [0u16; 2];
                    for unit in c.encode_utf16(&mut units) {
                        push_unicode_escape(*unit, out);
                    }
                },
            },
        }
    }
    out.push('"');
}

fn push_unicode_escape(unit: u16, out: &mut String) {
    // Writing to a String cannot fail
    let _ = write!(out, "\\u{unit:04x}");
}
