//! Old-style ASCII property lists, in the NeXTSTEP/Apple and GnuStep dialects.
//!
//! Both dialects share the dictionary, array, string and data productions.
//! GnuStep adds typed literals (`<*BY>`, `<*I42>`, `<*R1.5>`,
//! `<*D2011-11-28 09:21:30 +0000>`) and `[ ... ]` sets. The parser accepts
//! both dialects at once and decides per token; the writer targets one
//! [`Dialect`] chosen by the caller.
//!
//! - [`parser`]: text → [`Value`](crate::Value)
//! - [`writer`]: [`Value`](crate::Value) → text

pub mod parser;
pub mod writer;

pub use parser::from_str;
pub use writer::to_string;

/// Target dialect for textual output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// NeXTSTEP/Apple: strings, data, arrays and dictionaries only. Numbers,
    /// booleans and dates are written as strings and read back as strings.
    #[default]
    Apple,
    /// GnuStep: adds typed literals and sets, so every value except a
    /// [`Uid`](crate::Uid) round-trips with its type.
    GnuStep,
}

/// Characters allowed in an unquoted string.
pub(crate) fn is_bare_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '/' | ':' | '.' | '-')
}
