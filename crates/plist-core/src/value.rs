//! The property list value model.
//!
//! A [`Value`] is a tagged union over every type a plist can carry. All codecs
//! in this crate produce and consume this tree; behavior that differs per type
//! (serialization, comparison) is an exhaustive `match` over the variants.
//!
//! Dictionaries are [`IndexMap`]s so key order survives a parse → encode → parse
//! round trip. Note that `IndexMap`'s `PartialEq` ignores order; compare
//! `keys()` explicitly when order matters.

use chrono::{DateTime, NaiveDateTime, Utc};
use indexmap::IndexMap;

/// Deepest container nesting the readers accept. A dictionary, array or set
/// at the root is depth 1.
pub const MAX_DEPTH: usize = 512;

/// Ordered mapping of unique keys to values.
pub type Dictionary = IndexMap<String, Value>;

/// A property list value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Dictionary(Dictionary),
    Array(Vec<Value>),
    /// GnuStep extension. Not representable in binary format v0.0 or the
    /// Apple text dialect.
    Set(Vec<Value>),
    String(String),
    Integer(Integer),
    Real(Real),
    Boolean(bool),
    Date(Date),
    Data(Vec<u8>),
    /// Keyed-archive object reference. Binary format only.
    Uid(Uid),
}

impl Value {
    /// Lower-case name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Dictionary(_) => "dictionary",
            Value::Array(_) => "array",
            Value::Set(_) => "set",
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Real(_) => "real",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::Data(_) => "data",
            Value::Uid(_) => "uid",
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            Value::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_set(&self) -> Option<&[Value]> {
        match self {
            Value::Set(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// The integer as `i64`, if it is an integer within `i64` range.
    pub fn as_signed_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => i.as_signed(),
            _ => None,
        }
    }

    /// The integer as `u64`, if it is a non-negative integer.
    pub fn as_unsigned_integer(&self) -> Option<u64> {
        match self {
            Value::Integer(i) => i.as_unsigned(),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Value::Real(r) => Some(r.value()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<Date> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Value::Data(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_uid(&self) -> Option<Uid> {
        match self {
            Value::Uid(uid) => Some(*uid),
            _ => None,
        }
    }
}

/// A plist integer.
///
/// The binary format stores integers in up to 16 bytes, so the model covers
/// `i64::MIN..=u64::MAX`. Values above `i64::MAX` are the "overflow" range:
/// they only fit the 16-byte binary slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Integer(i128);

impl Integer {
    pub const MIN: i128 = i64::MIN as i128;
    pub const MAX: i128 = u64::MAX as i128;

    /// Returns `None` when `value` is outside `i64::MIN..=u64::MAX`.
    pub fn new(value: i128) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Integer(value))
    }

    pub fn value(self) -> i128 {
        self.0
    }

    pub fn as_signed(self) -> Option<i64> {
        i64::try_from(self.0).ok()
    }

    pub fn as_unsigned(self) -> Option<u64> {
        u64::try_from(self.0).ok()
    }

    /// True when the magnitude needs more than 63 bits.
    pub fn is_overflow(self) -> bool {
        self.0 > i64::MAX as i128
    }
}

impl std::fmt::Display for Integer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! integer_from {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Integer {
                fn from(n: $t) -> Self {
                    Integer(n as i128)
                }
            }

            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Integer(Integer::from(n))
                }
            }
        )*
    };
}

integer_from!(i8, i16, i32, i64, u8, u16, u32, u64);

/// Byte width a real was read from (or should be written with).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RealWidth {
    /// 4-byte IEEE-754.
    Single,
    /// 8-byte IEEE-754.
    Double,
}

/// A floating point value tagged with its source precision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Real {
    value: f64,
    width: RealWidth,
}

impl Real {
    pub fn double(value: f64) -> Self {
        Real {
            value,
            width: RealWidth::Double,
        }
    }

    pub fn single(value: f32) -> Self {
        Real {
            value: value as f64,
            width: RealWidth::Single,
        }
    }

    pub fn value(self) -> f64 {
        self.value
    }

    pub fn width(self) -> RealWidth {
        self.width
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Real(Real::double(value))
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Real(Real::single(value))
    }
}

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z.
const APPLE_EPOCH_UNIX: i64 = 978_307_200;

const GNUSTEP_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";
const XML_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// An absolute instant, stored as fractional seconds since 2001-01-01T00:00:00Z.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Date {
    secs: f64,
}

impl Date {
    pub fn from_secs_since_2001(secs: f64) -> Self {
        Date { secs }
    }

    pub fn secs_since_2001(self) -> f64 {
        self.secs
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let whole = (dt.timestamp() - APPLE_EPOCH_UNIX) as f64;
        Date {
            secs: whole + dt.timestamp_subsec_nanos() as f64 / 1e9,
        }
    }

    /// Converts to a chrono instant. `None` for NaN, infinities and instants
    /// outside chrono's range.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if !self.secs.is_finite() {
            return None;
        }
        let whole = self.secs.floor();
        let mut nanos = ((self.secs - whole) * 1e9).round() as u32;
        let mut whole = whole as i64;
        if nanos >= 1_000_000_000 {
            whole += 1;
            nanos = 0;
        }
        DateTime::from_timestamp(whole.checked_add(APPLE_EPOCH_UNIX)?, nanos)
    }

    /// Like [`Date::to_datetime`], but clamps unrepresentable instants to
    /// chrono's bounds (NaN maps to the 2001 epoch) so writers stay total.
    pub(crate) fn to_datetime_lossy(self) -> DateTime<Utc> {
        if let Some(dt) = self.to_datetime() {
            return dt;
        }
        if self.secs.is_nan() {
            DateTime::from_timestamp(APPLE_EPOCH_UNIX, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
        } else if self.secs > 0.0 {
            DateTime::<Utc>::MAX_UTC
        } else {
            DateTime::<Utc>::MIN_UTC
        }
    }

    /// Parses the date forms found in textual and XML plists:
    /// `2011-11-28T09:21:30Z` (RFC 3339), `2011-11-28 09:21:30 +0000`
    /// (GnuStep) and the zone-less `2011-11-28 09:21:30` (taken as UTC).
    pub fn parse(text: &str) -> Option<Date> {
        let text = text.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(Date::from_datetime(dt.with_timezone(&Utc)));
        }
        if let Ok(dt) = DateTime::parse_from_str(text, GNUSTEP_DATE_FORMAT) {
            return Some(Date::from_datetime(dt.with_timezone(&Utc)));
        }
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|naive| Date::from_datetime(naive.and_utc()))
    }

    /// `2011-11-28T09:21:30Z`, as used by XML plists.
    pub fn to_xml_string(self) -> String {
        self.to_datetime_lossy().format(XML_DATE_FORMAT).to_string()
    }

    /// `2011-11-28 09:21:30 +0000`, as used in GnuStep `<*D...>` literals.
    pub fn to_gnustep_string(self) -> String {
        self.to_datetime_lossy()
            .format(GNUSTEP_DATE_FORMAT)
            .to_string()
    }
}

impl From<DateTime<Utc>> for Date {
    fn from(dt: DateTime<Utc>) -> Self {
        Date::from_datetime(dt)
    }
}

/// A keyed-archive object reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uid(u64);

impl Uid {
    pub fn new(id: u64) -> Self {
        Uid(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Data(bytes)
    }
}

impl From<Dictionary> for Value {
    fn from(dict: Dictionary) -> Self {
        Value::Dictionary(dict)
    }
}

impl From<Integer> for Value {
    fn from(i: Integer) -> Self {
        Value::Integer(i)
    }
}

impl From<Real> for Value {
    fn from(r: Real) -> Self {
        Value::Real(r)
    }
}

impl From<Date> for Value {
    fn from(d: Date) -> Self {
        Value::Date(d)
    }
}

impl From<Uid> for Value {
    fn from(uid: Uid) -> Self {
        Value::Uid(uid)
    }
}
