//! # plist-core
//!
//! Pure-Rust reader and writer for **property lists**, the typed tree format
//! used throughout Apple platforms and by GnuStep.
//!
//! A property list is a tree of dictionaries (string keys, insertion order
//! kept), arrays and sets over strings, integers, reals, booleans, dates, raw
//! data and archiver uids. Three encodings are supported:
//!
//! - **binary** (`bplist00`): compact, random-access, used for preferences
//!   and archives
//! - **old-style ASCII**: the NeXTSTEP/Apple dialect and the GnuStep dialect
//!   with typed `<*...>` literals
//! - **XML**: `<plist version="1.0">` documents
//!
//! ## Quick start
//!
//! ```rust
//! use plist_core::{from_bytes, to_bytes, Dialect, Dictionary, OutputFormat, Value};
//!
//! let mut dict = Dictionary::new();
//! dict.insert("name".to_string(), Value::from("Alice"));
//! dict.insert("scores".to_string(), Value::from(vec![Value::from(95), Value::from(87)]));
//! let value = Value::Dictionary(dict);
//!
//! // Binary round trip
//! let bytes = to_bytes(&value, OutputFormat::Binary).unwrap();
//! assert!(bytes.starts_with(b"bplist00"));
//! assert_eq!(from_bytes(&bytes).unwrap(), value);
//!
//! // GnuStep text keeps the integer types
//! let text = to_bytes(&value, OutputFormat::Ascii(Dialect::GnuStep)).unwrap();
//! assert_eq!(from_bytes(&text).unwrap(), value);
//! ```
//!
//! ## Modules
//!
//! - [`value`]: the [`Value`] tree and its scalar types
//! - [`binary`]: `bplist00` decoder and encoder
//! - [`text`]: old-style ASCII parser and writer
//! - [`xml`]: XML reader and writer
//! - [`format`]: format detection, dispatch and file adapters
//! - [`error`]: [`PlistError`] for every failure

pub mod binary;
pub mod error;
pub mod format;
mod ser;
pub mod text;
pub mod value;
pub mod xml;

pub use binary::Version;
pub use error::{PlistError, Result};
pub use format::{
    convert_file, detect_format, from_bytes, from_file, save_as_ascii, save_as_binary,
    save_as_xml, to_bytes, Format, OutputFormat,
};
pub use text::Dialect;
pub use value::{Date, Dictionary, Integer, Real, RealWidth, Uid, Value, MAX_DEPTH};
