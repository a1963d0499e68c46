//! Response normalization
//!
//! The catalog wraps row data in several envelope shapes. [`Envelope`]
//! names each one; [`normalize`] turns any of them into the same [`Table`],
//! so a cached result and a live one look identical to callers.

mod table;

pub use table::{Cell, RowRef, Table};

use serde_json::Value;

/// Outer shape of a response body
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    /// `[ {...}, {...} ]`
    Records(Vec<Value>),
    /// `{ "results": ... }` (search)
    Results(Value),
    /// `{ "data": ... }`
    Data(Value),
    /// `{ "feeds": ... }`
    Feeds(Value),
    /// A single record, e.g. a feed fetched by ID
    Record(Value),
    /// Anything else (scalars, null)
    Other(Value),
}

impl Envelope {
    /// Classify a raw body. Wrapper fields are checked in the order
    /// `results`, `data`, `feeds`; the first one present wins.
    pub fn classify(body: Value) -> Self {
        match body {
            Value::Array(records) => Envelope::Records(records),
            Value::Object(mut map) => {
                if let Some(inner) = map.remove("results") {
                    Envelope::Results(inner)
                } else if let Some(inner) = map.remove("data") {
                    Envelope::Data(inner)
                } else if let Some(inner) = map.remove("feeds") {
                    Envelope::Feeds(inner)
                } else {
                    Envelope::Record(Value::Object(map))
                }
            }
            other => Envelope::Other(other),
        }
    }

    /// Convert to the uniform table shape.
    pub fn into_table(self) -> Table {
        match self {
            Envelope::Records(records) => Table::from_records(records),
            Envelope::Results(inner) | Envelope::Data(inner) | Envelope::Feeds(inner) => {
                unwrapped(inner)
            }
            Envelope::Record(record) => Table::from_records(vec![record]),
            Envelope::Other(Value::Null) => Table::new(),
            Envelope::Other(scalar) => Table::from_records(vec![scalar]),
        }
    }
}

/// The contents of a wrapper field: usually an array, but tolerate a
/// single object or null.
fn unwrapped(inner: Value) -> Table {
    match inner {
        Value::Array(records) => Table::from_records(records),
        Value::Null => Table::new(),
        other => Table::from_records(vec![other]),
    }
}

/// Normalize a raw response body into a [`Table`].
pub fn normalize(body: Value) -> Table {
    Envelope::classify(body).into_table()
}
