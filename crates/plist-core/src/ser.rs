//! `serde::Serialize` for [`Value`], for exporting property lists to
//! self-describing formats such as JSON.
//!
//! Types without a JSON counterpart are flattened: sets serialize as
//! sequences, data as a base64 string, dates as an RFC 3339 string and uids as
//! `{"CF$UID": n}`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::SecondsFormat;
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::value::Value;

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Dictionary(dict) => {
                let mut map = serializer.serialize_map(Some(dict.len()))?;
                for (key, value) in dict {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
            Value::Array(items) | Value::Set(items) => items.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => match (i.as_signed(), i.as_unsigned()) {
                (Some(n), _) => serializer.serialize_i64(n),
                (None, Some(n)) => serializer.serialize_u64(n),
                (None, None) => serializer.serialize_i128(i.value()),
            },
            Value::Real(r) => serializer.serialize_f64(r.value()),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Date(d) => serializer.serialize_str(
                &d.to_datetime_lossy()
                    .to_rfc3339_opts(SecondsFormat::AutoSi, true),
            ),
            Value::Data(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            Value::Uid(uid) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("CF$UID", &uid.get())?;
                map.end()
            }
        }
    }
}
