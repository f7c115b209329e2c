//! ASCII property list writer.
//!
//! Layout is fixed so that writing an unchanged tree twice gives identical
//! bytes: one entry per line, tab indentation, `{}`/`()`/`[]` for empty
//! containers. Output is pure ASCII; other characters are written as `\uXXXX`
//! escapes.
//!
//! Neither dialect has a fractional-second date form, so dates are written
//! to the whole second and any fraction is lost on the way back in.
//!
//! # Example
//! ```
//! use plist_core::text::{to_string, Dialect};
//! use plist_core::{Dictionary, Value};
//!
//! let mut dict = Dictionary::new();
//! dict.insert("name".to_string(), Value::from("Alice"));
//! dict.insert("age".to_string(), Value::from(30));
//!
//! assert_eq!(to_string(&Value::Dictionary(dict.clone()), Dialect::Apple), "{\n\tname = Alice;\n\tage = 30;\n}");
//! assert_eq!(to_string(&Value::Dictionary(dict), Dialect::GnuStep), "{\n\tname = Alice;\n\tage = <*I30>;\n}");
//! ```

use std::fmt::Write;

use crate::text::{is_bare_char, Dialect};
use crate::value::{Dictionary, Value};

/// Serialize a value tree as an ASCII property list in `dialect`.
///
/// Any value may be the root here; document-level saves that require a
/// dictionary or array root go through [`crate::format`].
pub fn to_string(value: &Value, dialect: Dialect) -> String {
    let mut out = String::new();
    encode_value(value, dialect, 0, &mut out);
    out
}

fn encode_value(value: &Value, dialect: Dialect, depth: usize, out: &mut String) {
    match value {
        Value::Dictionary(dict) => encode_dictionary(dict, dialect, depth, out),
        Value::Array(items) => encode_sequence(items, ('(', ')'), dialect, depth, out),
        Value::Set(items) => {
            // The Apple dialect has no set; its members survive as an array.
            let brackets = match dialect {
                Dialect::Apple => ('(', ')'),
                Dialect::GnuStep => ('[', ']'),
            };
            encode_sequence(items, brackets, dialect, depth, out)
        }
        Value::String(s) => encode_string(s, out),
        Value::Integer(i) => match dialect {
            Dialect::Apple => encode_string(&i.to_string(), out),
            Dialect::GnuStep => {
                let _ = write!(out, "<*I{i}>");
            }
        },
        Value::Real(r) => match dialect {
            Dialect::Apple => encode_string(&r.value().to_string(), out),
            Dialect::GnuStep => {
                let _ = write!(out, "<*R{}>", r.value());
            }
        },
        Value::Boolean(b) => out.push_str(match (dialect, b) {
            (Dialect::Apple, true) => "YES",
            (Dialect::Apple, false) => "NO",
            (Dialect::GnuStep, true) => "<*BY>",
            (Dialect::GnuStep, false) => "<*BN>",
        }),
        Value::Date(d) => match dialect {
            Dialect::Apple => encode_string(&d.to_xml_string(), out),
            Dialect::GnuStep => {
                let _ = write!(out, "<*D{}>", d.to_gnustep_string());
            }
        },
        Value::Data(bytes) => encode_data(bytes, out),
        Value::Uid(uid) => {
            let mut dict = Dictionary::new();
            dict.insert("CF$UID".to_string(), Value::from(uid.get()));
            encode_dictionary(&dict, dialect, depth, out);
        }
    }
}

fn encode_dictionary(dict: &Dictionary, dialect: Dialect, depth: usize, out: &mut String) {
    if dict.is_empty() {
        out.push_str("{}");
        return;
    }
    let indent = make_indent(depth + 1);
    out.push_str("{\n");
    for (key, value) in dict {
        out.push_str(&indent);
        encode_string(key, out);
        out.push_str(" = ");
        encode_value(value, dialect, depth + 1, out);
        out.push_str(";\n");
    }
    out.push_str(&make_indent(depth));
    out.push('}');
}

fn encode_sequence(
    items: &[Value],
    (open, close): (char, char),
    dialect: Dialect,
    depth: usize,
    out: &mut String,
) {
    out.push(open);
    if items.is_empty() {
        out.push(close);
        return;
    }
    let indent = make_indent(depth + 1);
    for (i, item) in items.iter().enumerate() {
        out.push_str(if i == 0 { "\n" } else { ",\n" });
        out.push_str(&indent);
        encode_value(item, dialect, depth + 1, out);
    }
    out.push('\n');
    out.push_str(&make_indent(depth));
    out.push(close);
}

/// Hex bytes in groups of four: `<0fbd7778 e2>`.
fn encode_data(bytes: &[u8], out: &mut String) {
    out.push('<');
    for (i, byte) in bytes.iter().enumerate() {
        if i > 0 && i % 4 == 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out.push('>');
}

/// Emit `s` bare when the parser would read it back unchanged, quoted
/// otherwise.
fn encode_string(s: &str, out: &mut String) {
    if !needs_quoting(s) {
        out.push_str(s);
        return;
    }
    out.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ' '..='~' => out.push(ch),
            _ => {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
        }
    }
    out.push('"');
}

/// A string must be quoted if it is empty, has a character outside the bare
/// set, or contains `//` (which would read as a comment).
fn needs_quoting(s: &str) -> bool {
    s.is_empty() || !s.chars().all(is_bare_char) || s.contains("//")
}

fn make_indent(depth: usize) -> String {
    "\t".repeat(depth)
}
