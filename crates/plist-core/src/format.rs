//! Format detection, byte-level dispatch and file adapters.
//!
//! [`from_bytes`] sniffs the encoding of a document and hands it to the right
//! codec; [`to_bytes`] is the inverse for a caller-chosen [`OutputFormat`].
//! The file adapters wrap both with filesystem I/O, creating the parent
//! directory of any file they write.

use std::fmt;
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{PlistError, Result};
use crate::text::Dialect;
use crate::value::Value;
use crate::{binary, text, xml};

/// The encoding of a stored property list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Binary,
    Xml,
    /// Old-style ASCII, in either dialect.
    Ascii,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Binary => "binary",
            Format::Xml => "xml",
            Format::Ascii => "ascii",
        })
    }
}

/// Target encoding for [`to_bytes`] and [`convert_file`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Binary,
    Xml,
    Ascii(Dialect),
}

impl OutputFormat {
    pub fn format(self) -> Format {
        match self {
            OutputFormat::Binary => Format::Binary,
            OutputFormat::Xml => Format::Xml,
            OutputFormat::Ascii(_) => Format::Ascii,
        }
    }
}

/// Guess the encoding of `bytes` from its first significant characters.
///
/// A byte-order mark and leading whitespace are skipped. `bplist` means
/// binary; `<?`, `<!` or `<` followed by a letter means XML; `{`, `(`, `/`,
/// `"` or any other `<` means ASCII. UTF-16 input (detected by its BOM) is
/// always treated as ASCII.
pub fn detect_format(bytes: &[u8]) -> Result<Format> {
    if bytes.starts_with(b"bplist") {
        return Ok(Format::Binary);
    }
    if bytes.starts_with(&[0xFE, 0xFF]) || bytes.starts_with(&[0xFF, 0xFE]) {
        return Ok(Format::Ascii);
    }
    let body = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    let start = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .ok_or_else(|| PlistError::InvalidSignature("document is empty".to_string()))?;

    match (body[start], body.get(start + 1)) {
        (b'<', Some(next)) if *next == b'?' || *next == b'!' || next.is_ascii_alphabetic() => {
            Ok(Format::Xml)
        }
        (b'<' | b'{' | b'(' | b'/' | b'"', _) => Ok(Format::Ascii),
        (other, _) => Err(PlistError::InvalidSignature(format!(
            "unrecognized property list starting with byte 0x{other:02x}"
        ))),
    }
}

/// Decode a property list in any supported encoding.
pub fn from_bytes(bytes: &[u8]) -> Result<Value> {
    let format = detect_format(bytes)?;
    debug!(%format, bytes = bytes.len(), "detected property list format");
    match format {
        Format::Binary => binary::from_bytes(bytes),
        Format::Xml => xml::from_bytes(bytes),
        Format::Ascii => text::parser::from_bytes(bytes),
    }
}

/// Encode `value` as a complete document in `format`.
///
/// ASCII documents must have a dictionary or array root; any other root
/// fails with `InvalidSignature`.
pub fn to_bytes(value: &Value, format: OutputFormat) -> Result<Vec<u8>> {
    match format {
        OutputFormat::Binary => binary::to_bytes(value),
        OutputFormat::Xml => xml::to_string(value).map(String::into_bytes),
        OutputFormat::Ascii(dialect) => {
            check_document_root(value)?;
            let mut out = text::to_string(value, dialect);
            out.push('\n');
            Ok(out.into_bytes())
        }
    }
}

fn check_document_root(value: &Value) -> Result<()> {
    match value {
        Value::Dictionary(_) | Value::Array(_) => Ok(()),
        other => Err(PlistError::InvalidSignature(format!(
            "the root of a document must be a dictionary or an array, not {}",
            other.kind_name()
        ))),
    }
}

/// Read and decode the property list at `path`.
pub fn from_file(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|source| PlistError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "read property list file");
    from_bytes(&bytes)
}

pub fn save_as_binary(value: &Value, path: impl AsRef<Path>) -> Result<()> {
    save(value, path.as_ref(), OutputFormat::Binary)
}

pub fn save_as_xml(value: &Value, path: impl AsRef<Path>) -> Result<()> {
    save(value, path.as_ref(), OutputFormat::Xml)
}

pub fn save_as_ascii(value: &Value, path: impl AsRef<Path>, dialect: Dialect) -> Result<()> {
    save(value, path.as_ref(), OutputFormat::Ascii(dialect))
}

/// Re-encode the property list at `input` as `format`, writing it to `output`.
pub fn convert_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    format: OutputFormat,
) -> Result<()> {
    let value = from_file(input)?;
    save(&value, output.as_ref(), format)
}

/// The file is only touched once encoding has succeeded.
fn save(value: &Value, path: &Path, format: OutputFormat) -> Result<()> {
    let bytes = to_bytes(value, format)?;
    let io_error = |source: std::io::Error| PlistError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(path, &bytes).map_err(io_error)?;
    debug!(path = %path.display(), format = %format.format(), bytes = bytes.len(), "saved property list");
    Ok(())
}
