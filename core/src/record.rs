// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Decoder for the structured record returned by the trusted UI
//!
//! The trusted UI returns a CBOR map describing exactly what was shown to the
//! user (typically the prompt text and the extra data). This module decodes
//! that map into a [ConfirmedRecord] for display. Decoding is shallow: text
//! and byte string values are kept as-is and any other value is rendered to
//! its generic text form.

use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_cbor::Value as Cbor;

use crate::helpers::escape_ascii;

/// Malformed or non-map confirmation payload
#[derive(Clone, PartialEq, Eq, Debug, thiserror::Error)]
#[error("malformed confirmation record: {message}")]
pub struct DecodeError {
    message: String,
}

impl DecodeError {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<serde_cbor::Error> for DecodeError {
    fn from(e: serde_cbor::Error) -> Self {
        Self {
            message: e.to_string(),
        }
    }
}

/// Record entry value
#[derive(Clone, PartialEq, Debug)]
pub enum Value {
    Text(String),
    Bytes(Vec<u8>),
    /// Any other value, in generic text form
    Other(String),
}

impl From<Cbor> for Value {
    fn from(v: Cbor) -> Self {
        match v {
            Cbor::Text(s) => Value::Text(s),
            Cbor::Bytes(b) => Value::Bytes(b),
            other => Value::Other(render(&other)),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&escape_ascii(b)),
            Value::Other(s) => f.write_str(s),
        }
    }
}

/// Generic text form for values not decoded further
fn render(v: &Cbor) -> String {
    match v {
        Cbor::Null => "null".to_string(),
        Cbor::Bool(b) => b.to_string(),
        Cbor::Integer(i) => i.to_string(),
        Cbor::Float(n) => n.to_string(),
        Cbor::Text(s) => s.clone(),
        Cbor::Bytes(b) => escape_ascii(b),
        Cbor::Array(a) => {
            let items: Vec<_> = a.iter().map(render).collect();
            format!("[{}]", items.join(", "))
        }
        Cbor::Map(m) => {
            let items: Vec<_> = m
                .iter()
                .map(|(k, v)| format!("{}={}", render(k), render(v)))
                .collect();
            format!("{{{}}}", items.join(", "))
        }
        Cbor::Tag(t, inner) => format!("{}({})", t, render(inner)),
        _ => format!("{:?}", v),
    }
}

/// Decoded confirmation record, entries in payload order
#[derive(Clone, PartialEq, Debug, Default)]
pub struct ConfirmedRecord {
    entries: Vec<(String, Value)>,
}

impl ConfirmedRecord {
    /// Iterate over `(key, value)` entries in payload order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Keys in payload order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Fetch a value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One `- key: value` line per entry
impl fmt::Display for ConfirmedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "- {}: {}", k, v)?;
        }
        Ok(())
    }
}

impl<'de> Deserialize<'de> for ConfirmedRecord {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        d.deserialize_map(RecordVisitor)
    }
}

struct RecordVisitor;

impl<'de> Visitor<'de> for RecordVisitor {
    type Value = ConfirmedRecord;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map with text keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        // Declared length is untrusted, grow with the entries actually read
        let mut entries: Vec<(String, Value)> = Vec::new();

        while let Some((k, v)) = map.next_entry::<String, Cbor>()? {
            if entries.iter().any(|(e, _)| e == &k) {
                return Err(serde::de::Error::custom(format!("duplicate key '{}'", k)));
            }
            entries.push((k, Value::from(v)));
        }

        Ok(ConfirmedRecord { entries })
    }
}

/// Decode a confirmation payload
///
/// Fails with [DecodeError] where `data` is not a single well-formed CBOR
/// item, the item is not a map, or a map key is not text.
pub fn decode(data: &[u8]) -> Result<ConfirmedRecord, DecodeError> {
    let r = serde_cbor::from_slice::<ConfirmedRecord>(data)?;

    log::trace!("decoded record with {} entries", r.len());

    Ok(r)
}
