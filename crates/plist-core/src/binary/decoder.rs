//! Binary plist decoder: converts `bplist00` bytes into a [`Value`] tree.
//!
//! The trailer is read first, then the offset table is loaded and every entry
//! is checked against the object region (the bytes between the header and the
//! offset table). Objects are resolved recursively from the root index.
//!
//! # Key design decisions
//!
//! - **Slot table**: each object index has a [`Slot`]. Resolved scalars are
//!   cached; containers are decoded again for every parent that references
//!   them. An index met again while still `InProgress` is a cycle and fails
//!   with `CyclicReference` instead of recursing forever.
//! - **Budget**: every value placed in the output tree costs one unit plus
//!   its string or data length. The total may not exceed
//!   [`BUDGET_PER_INPUT_BYTE`] units per input byte (at least [`MIN_BUDGET`]),
//!   so a small file of shared references cannot expand without bound.
//!   Container nesting stops at [`MAX_DEPTH`]. Both fail with `LimitExceeded`.
//! - **Checked reads only**: every byte range goes through [`Decoder::read`],
//!   so a hostile length or offset becomes an error, never a panic.
//! - **Integer widths**: 1, 2 and 4-byte integers are unsigned, 8-byte ones
//!   are two's complement, 16-byte ones are signed 128-bit and must land in
//!   `i64::MIN..=u64::MAX`.

use tracing::debug;

use super::{be_u64, marker, Trailer, MAGIC, TRAILER_SIZE};
use crate::error::{PlistError, Result};
use crate::value::{Date, Dictionary, Integer, Real, Uid, Value, MAX_DEPTH};

/// Output units allowed per byte of input.
pub const BUDGET_PER_INPUT_BYTE: usize = 64;

/// Output units allowed for any input, however small.
pub const MIN_BUDGET: usize = 1 << 16;

/// Decode a binary property list.
///
/// The whole document must be in `bytes`; the root object named by the
/// trailer is returned.
pub fn from_bytes(bytes: &[u8]) -> Result<Value> {
    if bytes.len() < MAGIC.len() || &bytes[..MAGIC.len()] != MAGIC {
        return Err(PlistError::InvalidSignature(
            "binary property list must start with \"bplist00\"".to_string(),
        ));
    }

    let trailer = Trailer::read(bytes)?;
    debug!(
        num_objects = trailer.num_objects,
        top_object = trailer.top_object,
        offset_int_size = trailer.offset_int_size,
        object_ref_size = trailer.object_ref_size,
        "decoding binary plist"
    );

    let mut decoder = Decoder::new(bytes, trailer)?;
    decoder.resolve(trailer.top_object)
}

/// Resolution state of one object index.
enum Slot {
    Unvisited,
    InProgress,
    Resolved(Value),
}

struct Decoder<'a> {
    bytes: &'a [u8],
    /// End of the object region (start of the offset table).
    objects_end: usize,
    object_ref_size: usize,
    offsets: Vec<usize>,
    slots: Vec<Slot>,
    /// Containers currently being decoded.
    depth: usize,
    /// Units spent so far, and the most that may be spent.
    spent: usize,
    budget: usize,
}

impl<'a> Decoder<'a> {
    fn new(bytes: &'a [u8], trailer: Trailer) -> Result<Self> {
        let len = bytes.len();
        let offset_int_size = trailer.offset_int_size as usize;
        let object_ref_size = trailer.object_ref_size as usize;

        if !(1..=8).contains(&offset_int_size) {
            return Err(PlistError::InvalidSignature(format!(
                "trailer declares an offset size of {offset_int_size} bytes"
            )));
        }
        if !(1..=8).contains(&object_ref_size) {
            return Err(PlistError::InvalidSignature(format!(
                "trailer declares an object reference size of {object_ref_size} bytes"
            )));
        }
        if trailer.top_object >= trailer.num_objects {
            return Err(PlistError::OffsetOutOfRange {
                offset: trailer.top_object,
                len,
            });
        }

        // The offset table sits between the object region and the trailer.
        let table_start = trailer.offset_table_offset;
        let table_end = trailer
            .num_objects
            .checked_mul(offset_int_size as u64)
            .and_then(|table_len| table_start.checked_add(table_len));
        let trailer_start = (len - TRAILER_SIZE) as u64;
        let table_end = match table_end {
            Some(end) if table_start >= MAGIC.len() as u64 && end <= trailer_start => end,
            _ => {
                return Err(PlistError::OffsetOutOfRange {
                    offset: table_start,
                    len,
                })
            }
        };
        let objects_end = table_start as usize;

        let table = &bytes[objects_end..table_end as usize];
        let mut offsets = Vec::with_capacity(trailer.num_objects as usize);
        for entry in table.chunks_exact(offset_int_size) {
            let offset = be_u64(entry);
            if offset < MAGIC.len() as u64 || offset >= objects_end as u64 {
                return Err(PlistError::OffsetOutOfRange { offset, len });
            }
            offsets.push(offset as usize);
        }

        let slots = offsets.iter().map(|_| Slot::Unvisited).collect();
        Ok(Decoder {
            bytes,
            objects_end,
            object_ref_size,
            offsets,
            slots,
            depth: 0,
            spent: 0,
            budget: len.saturating_mul(BUDGET_PER_INPUT_BYTE).max(MIN_BUDGET),
        })
    }

    /// Resolve object `index`. Scalars decode once; containers decode on
    /// every reference.
    fn resolve(&mut self, index: u64) -> Result<Value> {
        let idx = usize::try_from(index)
            .ok()
            .filter(|&i| i < self.offsets.len())
            .ok_or(PlistError::OffsetOutOfRange {
                offset: index,
                len: self.bytes.len(),
            })?;

        match &self.slots[idx] {
            Slot::Resolved(value) => {
                let value = value.clone();
                self.charge(&value)?;
                return Ok(value);
            }
            Slot::InProgress => return Err(PlistError::CyclicReference { index: idx }),
            Slot::Unvisited => {}
        }

        self.slots[idx] = Slot::InProgress;
        let value = self.parse_object(self.offsets[idx])?;
        self.charge(&value)?;
        self.slots[idx] = match value {
            Value::Array(_) | Value::Set(_) | Value::Dictionary(_) => Slot::Unvisited,
            _ => Slot::Resolved(value.clone()),
        };
        Ok(value)
    }

    /// Spend the units for one output value; its children were charged when
    /// they were resolved.
    fn charge(&mut self, value: &Value) -> Result<()> {
        let payload = match value {
            Value::String(s) => s.len(),
            Value::Data(bytes) => bytes.len(),
            _ => 0,
        };
        self.spent = self.spent.saturating_add(1 + payload);
        if self.spent > self.budget {
            return Err(PlistError::LimitExceeded(format!(
                "shared references expand past {} output units for a {}-byte input",
                self.budget,
                self.bytes.len()
            )));
        }
        Ok(())
    }

    /// Decode the references of a container, one level deeper.
    fn resolve_children(&mut self, refs: Vec<u64>) -> Result<Vec<Value>> {
        if self.depth >= MAX_DEPTH {
            return Err(PlistError::LimitExceeded(format!(
                "containers nested deeper than {MAX_DEPTH} levels"
            )));
        }
        self.depth += 1;
        let mut items = Vec::with_capacity(refs.len());
        for index in refs {
            items.push(self.resolve(index)?);
        }
        self.depth -= 1;
        Ok(items)
    }

    /// Decode the object whose marker byte is at `offset`.
    fn parse_object(&mut self, offset: usize) -> Result<Value> {
        let marker_byte = self.read(offset, 1)?[0];
        let kind = marker_byte >> 4;
        let size = marker_byte & 0x0F;
        let invalid = PlistError::InvalidTypeMarker {
            marker: marker_byte,
            offset,
        };

        match kind {
            marker::SIMPLE => match marker_byte {
                marker::FALSE => Ok(Value::Boolean(false)),
                marker::TRUE => Ok(Value::Boolean(true)),
                // Null and fill bytes have no value-model counterpart.
                _ => Err(invalid),
            },
            marker::INTEGER => {
                if size > 4 {
                    return Err(invalid);
                }
                let bytes = self.read(offset + 1, 1 << size)?;
                Ok(Value::Integer(parse_integer(bytes, offset)?))
            }
            marker::REAL => match size {
                2 => {
                    let bytes = self.read(offset + 1, 4)?;
                    let bits = be_u64(bytes) as u32;
                    Ok(Value::Real(Real::single(f32::from_bits(bits))))
                }
                3 => {
                    let bytes = self.read(offset + 1, 8)?;
                    Ok(Value::Real(Real::double(f64::from_bits(be_u64(bytes)))))
                }
                _ => Err(invalid),
            },
            marker::DATE => {
                if size != 3 {
                    return Err(invalid);
                }
                let bytes = self.read(offset + 1, 8)?;
                let secs = f64::from_bits(be_u64(bytes));
                Ok(Value::Date(Date::from_secs_since_2001(secs)))
            }
            marker::DATA => {
                let (len, start) = self.read_length(offset, size)?;
                Ok(Value::Data(self.read(start, len)?.to_vec()))
            }
            marker::ASCII_STRING => {
                let (len, start) = self.read_length(offset, size)?;
                let bytes = self.read(start, len)?;
                Ok(Value::String(bytes.iter().map(|&b| b as char).collect()))
            }
            marker::UTF16_STRING => {
                let (count, start) = self.read_length(offset, size)?;
                let byte_len = checked_span(count, 2, start, self.bytes.len())?;
                let bytes = self.read(start, byte_len)?;
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                    .collect();
                Ok(Value::String(String::from_utf16_lossy(&units)))
            }
            marker::UID => {
                let width = size as usize + 1;
                let bytes = self.read(offset + 1, width)?;
                let (high, low) = bytes.split_at(width.saturating_sub(8));
                if high.iter().any(|&b| b != 0) {
                    return Err(PlistError::IntegerOverflow {
                        position: offset,
                        message: format!("UID of {width} bytes does not fit in 64 bits"),
                    });
                }
                Ok(Value::Uid(Uid::new(be_u64(low))))
            }
            marker::ARRAY | marker::SET => {
                let (count, start) = self.read_length(offset, size)?;
                let refs = self.read_refs(start, count)?;
                let items = self.resolve_children(refs)?;
                if kind == marker::SET {
                    Ok(Value::Set(items))
                } else {
                    Ok(Value::Array(items))
                }
            }
            marker::DICTIONARY => {
                let (count, start) = self.read_length(offset, size)?;
                let key_refs = self.read_refs(start, count)?;
                let value_start = start + key_refs.len() * self.object_ref_size;
                let value_refs = self.read_refs(value_start, count)?;

                let keys = self.resolve_children(key_refs.clone())?;
                let values = self.resolve_children(value_refs)?;

                let mut dict = Dictionary::with_capacity(count);
                for ((key, key_ref), value) in keys.into_iter().zip(key_refs).zip(values) {
                    let Value::String(key) = key else {
                        return Err(self.non_string_key(key_ref));
                    };
                    dict.insert(key, value);
                }
                Ok(Value::Dictionary(dict))
            }
            _ => Err(invalid),
        }
    }

    /// Read the count carried by a marker's size nibble, following an
    /// out-of-line integer when the nibble is `0xF`. Returns the count and
    /// the offset of the first payload byte.
    fn read_length(&self, offset: usize, size: u8) -> Result<(usize, usize)> {
        if size != marker::EXTENDED_SIZE {
            return Ok((size as usize, offset + 1));
        }

        let int_offset = offset + 1;
        let int_marker = self.read(int_offset, 1)?[0];
        let int_size = int_marker & 0x0F;
        if int_marker >> 4 != marker::INTEGER || int_size > 3 {
            return Err(PlistError::InvalidTypeMarker {
                marker: int_marker,
                offset: int_offset,
            });
        }
        let width = 1usize << int_size;
        let len = be_u64(self.read(int_offset + 1, width)?);
        let len = usize::try_from(len).map_err(|_| PlistError::OffsetOutOfRange {
            offset: len,
            len: self.bytes.len(),
        })?;
        Ok((len, int_offset + 1 + width))
    }

    /// Read `count` object references starting at `start`.
    fn read_refs(&self, start: usize, count: usize) -> Result<Vec<u64>> {
        let byte_len = checked_span(count, self.object_ref_size, start, self.bytes.len())?;
        let bytes = self.read(start, byte_len)?;
        Ok(bytes.chunks_exact(self.object_ref_size).map(be_u64).collect())
    }

    /// Borrow `len` bytes at `offset`, confined to the object region.
    fn read(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        match offset.checked_add(len) {
            Some(end) if end <= self.objects_end => Ok(&self.bytes[offset..end]),
            _ => Err(PlistError::TruncatedInput {
                offset,
                message: format!("object needs {len} bytes past the end of the object table"),
            }),
        }
    }

    fn non_string_key(&self, key_ref: u64) -> PlistError {
        // `key_ref` was just resolved, so it indexes `offsets`.
        let offset = self.offsets[key_ref as usize];
        PlistError::InvalidTypeMarker {
            marker: self.bytes[offset],
            offset,
        }
    }
}

/// `count * width` bytes, or `OffsetOutOfRange` when that overflows.
fn checked_span(count: usize, width: usize, start: usize, len: usize) -> Result<usize> {
    count
        .checked_mul(width)
        .ok_or(PlistError::OffsetOutOfRange {
            offset: start as u64,
            len,
        })
}

fn parse_integer(bytes: &[u8], offset: usize) -> Result<Integer> {
    match bytes.len() {
        8 => Ok(Integer::from(be_u64(bytes) as i64)),
        16 => {
            let mut wide = [0u8; 16];
            wide.copy_from_slice(bytes);
            let value = i128::from_be_bytes(wide);
            Integer::new(value).ok_or_else(|| PlistError::IntegerOverflow {
                position: offset,
                message: format!("{value} is outside the 64-bit range"),
            })
        }
        _ => Ok(Integer::from(be_u64(bytes))),
    }
}
