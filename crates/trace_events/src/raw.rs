use std::collections::BTreeMap;
use std::fmt;

use crate::CpuId;

/// Value of a single event attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Str(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Int(v) => write!(f, "{}", v),
            FieldValue::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

/// An event as delivered by a trace source, before its name is resolved
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    /// Event name, e.g. `sched_switch`
    pub name: String,
    /// Timestamp in nanoseconds
    pub timestamp: u64,
    /// CPU that emitted the event
    pub cpu: CpuId,
    /// Event-specific attributes
    pub fields: BTreeMap<String, FieldValue>,
}

impl RawEvent {
    /// Creates an event with no attributes
    pub fn new(name: impl Into<String>, timestamp: u64, cpu: CpuId) -> Self {
        Self {
            name: name.into(),
            timestamp,
            cpu,
            fields: BTreeMap::new(),
        }
    }

    /// Adds an attribute, replacing any previous value with the same name
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}
