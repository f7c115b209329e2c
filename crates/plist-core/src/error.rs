//! Error types for property list decoding and encoding.

use std::path::PathBuf;

use thiserror::Error;

use crate::binary::Version;

/// Errors that can occur while decoding or encoding a property list.
///
/// Every variant is terminal for the call that produced it: the codecs never
/// retry and never surface a partial tree alongside an error.
#[derive(Error, Debug)]
pub enum PlistError {
    /// The binary magic is missing, or a document root has the wrong kind.
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// The input ends before a length-declared field completes.
    #[error("Truncated input at byte {offset}: {message}")]
    TruncatedInput { offset: usize, message: String },

    /// A binary offset-table entry or derived byte range lies outside the buffer.
    #[error("Offset {offset} out of range (buffer is {len} bytes)")]
    OffsetOutOfRange { offset: u64, len: usize },

    /// An unrecognized binary object marker.
    #[error("Invalid type marker 0x{marker:02x} at byte {offset}")]
    InvalidTypeMarker { marker: u8, offset: usize },

    /// An integer that does not fit in `i64::MIN..=u64::MAX`.
    #[error("Integer overflow at {position}: {message}")]
    IntegerOverflow { position: usize, message: String },

    /// An object whose resolution depends on itself.
    #[error("Cyclic reference to object {index}")]
    CyclicReference { index: usize },

    /// The input nests containers deeper than [`crate::value::MAX_DEPTH`], or
    /// its shared references expand to more values than its size allows.
    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    /// The value tree needs a binary format version the encoder cannot write.
    #[error(
        "The required version of the binary format ({required}) is not supported (highest is {supported})"
    )]
    UnsupportedVersion { required: Version, supported: Version },

    /// Unterminated string/comment/data, invalid escape or invalid hex pair.
    /// Line and column are 1-based.
    #[error("Lexical error at line {line}, column {column}: {message}")]
    Lexical {
        line: usize,
        column: usize,
        message: String,
    },

    /// Unbalanced bracket, missing separator or trailing garbage.
    /// Line and column are 1-based.
    #[error("Syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// The XML adapter could not read the document or map it to a value.
    #[error("XML error: {0}")]
    Xml(String),

    /// A file adapter failed to read or write `path`.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience alias used throughout plist-core.
pub type Result<T> = std::result::Result<T, PlistError>;
