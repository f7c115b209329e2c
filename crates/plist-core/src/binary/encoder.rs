//! Binary plist encoder: converts a [`Value`] tree into `bplist00` bytes.
//!
//! Encoding runs in two passes:
//!
//! - **Enumerate**: walk the tree depth-first (a container before its
//!   children, dictionary keys before dictionary values) and give every object
//!   a table index. Equal scalars (strings, numbers, dates, data, uids,
//!   booleans) share one entry, so repeated keys cost one reference each.
//! - **Serialize**: write the header, each object in table order while
//!   recording its offset, then the offset table and the trailer.
//!
//! Every size is chosen minimally: object references and offset-table entries
//! use the smallest of 1, 2, 4 or 8 bytes that fits, integers the smallest
//! width that keeps their value, and strings the one-byte form whenever they
//! are pure ASCII.

use std::collections::HashMap;

use tracing::debug;

use super::{check_version, marker, unsigned_width, Trailer, MAGIC};
use crate::error::Result;
use crate::value::{Date, Integer, Real, RealWidth, Uid, Value};

/// Encode a value tree as a binary property list.
///
/// Fails with `UnsupportedVersion` when the tree needs a newer binary format
/// than v0.0 (any `Set` does).
pub fn to_bytes(value: &Value) -> Result<Vec<u8>> {
    let version = check_version(value)?;
    let out = encode_unchecked(value);
    debug!(%version, bytes = out.len(), "encoded binary plist");
    Ok(out)
}

/// Encode without the version gate.
fn encode_unchecked(value: &Value) -> Vec<u8> {
    let mut table = ObjectTable::default();
    let root = table.enumerate(value);
    table.serialize(root)
}

/// One entry of the object table, borrowing from the source tree.
enum Object<'a> {
    Boolean(bool),
    Integer(Integer),
    Real(Real),
    Date(Date),
    Data(&'a [u8]),
    Uid(Uid),
    String(&'a str),
    Array(Vec<usize>),
    Set(Vec<usize>),
    Dictionary { keys: Vec<usize>, values: Vec<usize> },
}

/// Identity of a scalar for de-duplication. Reals and dates compare by bit
/// pattern so NaN payloads and signed zeros stay distinct.
#[derive(PartialEq, Eq, Hash)]
enum ScalarKey<'a> {
    String(&'a str),
    Integer(Integer),
    Real(u64, RealWidth),
    Boolean(bool),
    Date(u64),
    Data(&'a [u8]),
    Uid(u64),
}

#[derive(Default)]
struct ObjectTable<'a> {
    objects: Vec<Object<'a>>,
    scalars: HashMap<ScalarKey<'a>, usize>,
}

impl<'a> ObjectTable<'a> {
    /// Assign table indices to `value` and its descendants; returns the index
    /// of `value` itself.
    fn enumerate(&mut self, value: &'a Value) -> usize {
        match value {
            Value::Array(items) | Value::Set(items) => {
                let index = self.objects.len();
                self.objects.push(Object::Array(Vec::new()));
                let mut refs = Vec::with_capacity(items.len());
                for item in items {
                    refs.push(self.enumerate(item));
                }
                self.objects[index] = match value {
                    Value::Set(_) => Object::Set(refs),
                    _ => Object::Array(refs),
                };
                index
            }
            Value::Dictionary(dict) => {
                let index = self.objects.len();
                self.objects.push(Object::Array(Vec::new()));
                let mut keys = Vec::with_capacity(dict.len());
                for key in dict.keys() {
                    keys.push(self.intern(ScalarKey::String(key), Object::String(key)));
                }
                let mut values = Vec::with_capacity(dict.len());
                for item in dict.values() {
                    values.push(self.enumerate(item));
                }
                self.objects[index] = Object::Dictionary { keys, values };
                index
            }
            Value::String(s) => self.intern(ScalarKey::String(s), Object::String(s)),
            Value::Integer(i) => self.intern(ScalarKey::Integer(*i), Object::Integer(*i)),
            Value::Real(r) => self.intern(
                ScalarKey::Real(r.value().to_bits(), r.width()),
                Object::Real(*r),
            ),
            Value::Boolean(b) => self.intern(ScalarKey::Boolean(*b), Object::Boolean(*b)),
            Value::Date(d) => self.intern(
                ScalarKey::Date(d.secs_since_2001().to_bits()),
                Object::Date(*d),
            ),
            Value::Data(bytes) => self.intern(ScalarKey::Data(bytes), Object::Data(bytes)),
            Value::Uid(uid) => self.intern(ScalarKey::Uid(uid.get()), Object::Uid(*uid)),
        }
    }

    fn intern(&mut self, key: ScalarKey<'a>, object: Object<'a>) -> usize {
        if let Some(&index) = self.scalars.get(&key) {
            return index;
        }
        let index = self.objects.len();
        self.objects.push(object);
        self.scalars.insert(key, index);
        index
    }

    fn serialize(&self, root: usize) -> Vec<u8> {
        let num_objects = self.objects.len();
        let ref_size = unsigned_width(num_objects.saturating_sub(1) as u64);

        let mut out = Vec::new();
        out.extend_from_slice(MAGIC);

        let mut offsets = Vec::with_capacity(num_objects);
        for object in &self.objects {
            offsets.push(out.len() as u64);
            write_object(object, ref_size, &mut out);
        }

        let offset_table_offset = out.len() as u64;
        let offset_int_size = unsigned_width(offsets.last().copied().unwrap_or(0));
        for &offset in &offsets {
            write_sized(offset, offset_int_size, &mut out);
        }

        let trailer = Trailer {
            sort_version: 0,
            offset_int_size,
            object_ref_size: ref_size,
            num_objects: num_objects as u64,
            top_object: root as u64,
            offset_table_offset,
        };
        debug!(
            num_objects,
            object_ref_size = ref_size,
            offset_int_size,
            "serialized object table"
        );
        trailer.write(&mut out);
        out
    }
}

fn write_object(object: &Object<'_>, ref_size: u8, out: &mut Vec<u8>) {
    match object {
        Object::String(s) => write_string(s, out),
        Object::Array(refs) | Object::Set(refs) => {
            let kind = match object {
                Object::Set(_) => marker::SET,
                _ => marker::ARRAY,
            };
            write_marker(kind, refs.len(), out);
            for &r in refs {
                write_sized(r as u64, ref_size, out);
            }
        }
        Object::Dictionary { keys, values } => {
            write_marker(marker::DICTIONARY, keys.len(), out);
            for &r in keys.iter().chain(values) {
                write_sized(r as u64, ref_size, out);
            }
        }
        Object::Boolean(b) => out.push(if *b { marker::TRUE } else { marker::FALSE }),
        Object::Integer(i) => write_integer(i.value(), out),
        Object::Real(r) => match r.width() {
            RealWidth::Single => {
                out.push((marker::REAL << 4) | 2);
                out.extend_from_slice(&(r.value() as f32).to_be_bytes());
            }
            RealWidth::Double => {
                out.push((marker::REAL << 4) | 3);
                out.extend_from_slice(&r.value().to_be_bytes());
            }
        },
        Object::Date(d) => {
            out.push((marker::DATE << 4) | 3);
            out.extend_from_slice(&d.secs_since_2001().to_be_bytes());
        }
        Object::Data(bytes) => {
            write_marker(marker::DATA, bytes.len(), out);
            out.extend_from_slice(bytes);
        }
        Object::Uid(uid) => {
            let width = unsigned_width(uid.get());
            out.push((marker::UID << 4) | (width - 1));
            write_sized(uid.get(), width, out);
        }
    }
}

/// ASCII strings take one byte per character, everything else UTF-16BE.
fn write_string(s: &str, out: &mut Vec<u8>) {
    if s.is_ascii() {
        write_marker(marker::ASCII_STRING, s.len(), out);
        out.extend_from_slice(s.as_bytes());
    } else {
        let units: Vec<u16> = s.encode_utf16().collect();
        write_marker(marker::UTF16_STRING, units.len(), out);
        for unit in units {
            out.extend_from_slice(&unit.to_be_bytes());
        }
    }
}

/// Non-negative values up to `u32::MAX` take 1, 2 or 4 unsigned bytes; other
/// `i64` values take 8 bytes; values above `i64::MAX` take 16.
fn write_integer(n: i128, out: &mut Vec<u8>) {
    if (0..=u32::MAX as i128).contains(&n) {
        let width = unsigned_width(n as u64);
        out.push((marker::INTEGER << 4) | width.trailing_zeros() as u8);
        write_sized(n as u64, width, out);
    } else if let Ok(n) = i64::try_from(n) {
        out.push((marker::INTEGER << 4) | 3);
        out.extend_from_slice(&n.to_be_bytes());
    } else {
        out.push((marker::INTEGER << 4) | 4);
        out.extend_from_slice(&n.to_be_bytes());
    }
}

/// Marker byte with the length inline, or `0xF` plus an integer object when
/// the length does not fit the nibble.
fn write_marker(kind: u8, len: usize, out: &mut Vec<u8>) {
    if len < marker::EXTENDED_SIZE as usize {
        out.push((kind << 4) | len as u8);
    } else {
        out.push((kind << 4) | marker::EXTENDED_SIZE);
        write_integer(len as i128, out);
    }
}

/// The low `width` bytes of `n`, big-endian.
fn write_sized(n: u64, width: u8, out: &mut Vec<u8>) {
    let bytes = n.to_be_bytes();
    out.extend_from_slice(&bytes[8 - width as usize..]);
}
