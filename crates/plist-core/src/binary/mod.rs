//! Apple binary property lists (`bplist00`).
//!
//! A document is four segments:
//!
//! 1. Header: the 8-byte magic `bplist00`
//! 2. Object table: every object's encoding, back to back
//! 3. Offset table: one big-endian entry per object, giving its byte offset
//! 4. Trailer: the last 32 bytes, sizing and locating everything above
//!
//! Containers refer to their children by object index, so one encoded object
//! may be shared by several parents.
//!
//! - [`decoder`]: bytes → [`Value`](crate::Value)
//! - [`encoder`]: [`Value`](crate::Value) → bytes

pub mod decoder;
pub mod encoder;

pub use decoder::from_bytes;
pub use encoder::to_bytes;

use std::fmt;

use crate::error::{PlistError, Result};
use crate::value::Value;

/// The bplist magic plus the `00` version digits.
pub const MAGIC: &[u8; 8] = b"bplist00";

/// The number of bytes in the trailer.
pub const TRAILER_SIZE: usize = 32;

/// Object kind, the high nibble of a marker byte.
pub(crate) mod marker {
    pub const SIMPLE: u8 = 0x0;
    pub const INTEGER: u8 = 0x1;
    pub const REAL: u8 = 0x2;
    pub const DATE: u8 = 0x3;
    pub const DATA: u8 = 0x4;
    pub const ASCII_STRING: u8 = 0x5;
    pub const UTF16_STRING: u8 = 0x6;
    pub const UID: u8 = 0x8;
    pub const ARRAY: u8 = 0xA;
    pub const SET: u8 = 0xC;
    pub const DICTIONARY: u8 = 0xD;

    pub const FALSE: u8 = 0x08;
    pub const TRUE: u8 = 0x09;

    /// Size nibble announcing an out-of-line length.
    pub const EXTENDED_SIZE: u8 = 0xF;
}

/// Binary format versions, in ascending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Version {
    V0_0,
    V1_0,
    V1_5,
    V2_0,
}

impl Version {
    /// The highest version the encoder can write.
    pub const SUPPORTED: Version = Version::V0_0;
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Version::V0_0 => "v0.0",
            Version::V1_0 => "v1.0",
            Version::V1_5 => "v1.5",
            Version::V2_0 => "v2.0",
        };
        f.write_str(s)
    }
}

/// The lowest binary format version able to represent every node of `value`.
pub fn minimum_version(value: &Value) -> Version {
    match value {
        Value::Set(items) => items
            .iter()
            .map(minimum_version)
            .fold(Version::V1_0, Version::max),
        Value::Array(items) => items
            .iter()
            .map(minimum_version)
            .fold(Version::V0_0, Version::max),
        Value::Dictionary(dict) => dict
            .values()
            .map(minimum_version)
            .fold(Version::V0_0, Version::max),
        Value::String(_)
        | Value::Integer(_)
        | Value::Real(_)
        | Value::Boolean(_)
        | Value::Date(_)
        | Value::Data(_)
        | Value::Uid(_) => Version::V0_0,
    }
}

/// Accepts `value` when the encoder can write its minimum version.
pub fn check_version(value: &Value) -> Result<Version> {
    let required = minimum_version(value);
    if required > Version::SUPPORTED {
        return Err(PlistError::UnsupportedVersion {
            required,
            supported: Version::SUPPORTED,
        });
    }
    Ok(required)
}

/// The fields of the 32-byte trailer: 5 unused bytes, then the sort version,
/// the two width bytes and three big-endian `u64`s. The decoder bounds-checks
/// every field before use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub sort_version: u8,
    pub offset_int_size: u8,
    pub object_ref_size: u8,
    pub num_objects: u64,
    pub top_object: u64,
    pub offset_table_offset: u64,
}

impl Trailer {
    /// Reads the trailer from the last [`TRAILER_SIZE`] bytes of `bytes`.
    pub fn read(bytes: &[u8]) -> Result<Trailer> {
        if bytes.len() < MAGIC.len() + TRAILER_SIZE {
            return Err(PlistError::TruncatedInput {
                offset: bytes.len(),
                message: format!(
                    "a binary plist needs at least {} bytes",
                    MAGIC.len() + TRAILER_SIZE
                ),
            });
        }
        let t = &bytes[bytes.len() - TRAILER_SIZE..];
        Ok(Trailer {
            sort_version: t[5],
            offset_int_size: t[6],
            object_ref_size: t[7],
            num_objects: be_u64(&t[8..16]),
            top_object: be_u64(&t[16..24]),
            offset_table_offset: be_u64(&t[24..32]),
        })
    }

    /// Appends the 32-byte encoding of this trailer to `out`.
    pub fn write(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&[0u8; 5]);
        out.push(self.sort_version);
        out.push(self.offset_int_size);
        out.push(self.object_ref_size);
        out.extend_from_slice(&self.num_objects.to_be_bytes());
        out.extend_from_slice(&self.top_object.to_be_bytes());
        out.extend_from_slice(&self.offset_table_offset.to_be_bytes());
    }
}

/// Big-endian unsigned integer of 1 to 8 bytes.
pub(crate) fn be_u64(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// The smallest of 1, 2, 4 or 8 bytes able to hold `n` unsigned.
pub(crate) fn unsigned_width(n: u64) -> u8 {
    if n <= u8::MAX as u64 {
        1
    } else if n <= u16::MAX as u64 {
        2
    } else if n <= u32::MAX as u64 {
        4
    } else {
        8
    }
}
