//! Field extraction for the dict form of records.
//!
//! Each accessor removes the field it reads; `finish` then rejects whatever
//! is left, so a dict can only carry known fields.

use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};

use crate::clock::parse_timestamp;
use crate::error::{CoreError, Result};

pub(crate) struct Fields {
    map: Map<String, Value>,
}

impl Fields {
    pub(crate) fn new(map: Map<String, Value>) -> Self {
        Self { map }
    }

    /// A field whose absence means "use the default", but which may not be null.
    pub(crate) fn string(&mut self, field: &'static str) -> Result<Option<String>> {
        match self.map.remove(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(CoreError::InvalidField {
                field,
                expected: "a string",
            }),
        }
    }

    /// A field that may be absent or null.
    pub(crate) fn optional_string(&mut self, field: &'static str) -> Result<Option<String>> {
        match self.map.remove(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(CoreError::InvalidField {
                field,
                expected: "a string or null",
            }),
        }
    }

    pub(crate) fn optional_f64(&mut self, field: &'static str) -> Result<Option<f64>> {
        match self.map.remove(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n.as_f64().map(Some).ok_or(CoreError::InvalidField {
                field,
                expected: "a number or null",
            }),
            Some(_) => Err(CoreError::InvalidField {
                field,
                expected: "a number or null",
            }),
        }
    }

    pub(crate) fn timestamp(&mut self, field: &'static str) -> Result<Option<DateTime<FixedOffset>>> {
        match self.map.remove(field) {
            None => Ok(None),
            Some(Value::String(s)) => parse_timestamp(&s).map(Some),
            Some(_) => Err(CoreError::InvalidField {
                field,
                expected: "an ISO-8601 string",
            }),
        }
    }

    /// Raw value, for fields whose shape the record itself checks.
    pub(crate) fn value(&mut self, field: &'static str) -> Option<Value> {
        self.map.remove(field)
    }

    pub(crate) fn finish(self) -> Result<()> {
        match self.map.into_iter().next() {
            Some((key, _)) => Err(CoreError::UnknownField(key)),
            None => Ok(()),
        }
    }
}
