use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fields every record carries regardless of its type.
pub const COMMON_FIELDS: [&str; 4] = ["host", "data", "ttl", "type"];

#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    AAAA,
    CNAME,
    ANAME,
    TLSA,
    MX,
    SRV,
    DS,
    CAA,
    NS,
    TXT,
}

impl RecordType {
    pub const ALL: [RecordType; 11] = [
        RecordType::A,
        RecordType::AAAA,
        RecordType::CNAME,
        RecordType::ANAME,
        RecordType::TLSA,
        RecordType::MX,
        RecordType::SRV,
        RecordType::DS,
        RecordType::CAA,
        RecordType::NS,
        RecordType::TXT,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
            RecordType::CNAME => "CNAME",
            RecordType::ANAME => "ANAME",
            RecordType::TLSA => "TLSA",
            RecordType::MX => "MX",
            RecordType::SRV => "SRV",
            RecordType::DS => "DS",
            RecordType::CAA => "CAA",
            RecordType::NS => "NS",
            RecordType::TXT => "TXT",
        }
    }

    /// Type-specific fields the API expects on top of [`COMMON_FIELDS`].
    pub fn extra_fields(&self) -> &'static [&'static str] {
        match self {
            RecordType::MX => &["priority"],
            RecordType::SRV => &["priority", "weight", "port"],
            RecordType::TLSA => &["usage", "selector", "dtype"],
            RecordType::DS => &["tag", "alg", "digest"],
            RecordType::CAA => &["flags", "tag"],
            RecordType::A
            | RecordType::AAAA
            | RecordType::CNAME
            | RecordType::ANAME
            | RecordType::NS
            | RecordType::TXT => &[],
        }
    }

    pub fn required_fields(&self) -> BTreeSet<String> {
        COMMON_FIELDS
            .iter()
            .chain(self.extra_fields())
            .map(|f| f.to_string())
            .collect()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RecordError::InvalidType {
                found: s.to_string(),
            })
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Record has invalid type {found:?}. Valid types: {}", valid_types())]
    InvalidType { found: String },

    #[error("{record_type} record is missing or has invalid keys. Required keys: {}", .required.join(", "))]
    InvalidFields {
        record_type: RecordType,
        required: Vec<String>,
    },
}

fn valid_types() -> String {
    RecordType::ALL
        .iter()
        .map(RecordType::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A resource record as the Domeneshop API reads and writes it.
///
/// `id` is assigned by the provider and only present on fetched records.
/// Type-specific fields (MX `priority`, SRV `weight`, ...) live in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(rename = "type")]
    pub record_type: String,
    pub host: String,
    pub data: String,
    pub ttl: u32,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl DnsRecord {
    pub fn new(record_type: RecordType, host: &str, data: &str, ttl: u32) -> Self {
        Self {
            id: None,
            record_type: record_type.to_string(),
            host: host.to_string(),
            data: data.to_string(),
            ttl,
            extra: BTreeMap::new(),
        }
    }

    pub fn txt(host: &str, data: &str, ttl: u32) -> Self {
        Self::new(RecordType::TXT, host, data, ttl)
    }

    #[cfg(test)]
    pub fn with_field(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.extra.insert(name.to_string(), value.into());
        self
    }

    /// Names of every field this record serializes.
    pub fn field_names(&self) -> BTreeSet<String> {
        let mut fields: BTreeSet<String> = COMMON_FIELDS.iter().map(|f| f.to_string()).collect();
        if self.id.is_some() {
            fields.insert("id".to_string());
        }
        fields.extend(self.extra.keys().cloned());
        fields
    }
}

/// Checks a record's field set against its declared type before it is sent.
///
/// The API still validates values (addresses, ports, ...) on its side.
pub fn validate_record(record: &DnsRecord) -> Result<RecordType, RecordError> {
    let record_type: RecordType = record.record_type.parse()?;
    let required = record_type.required_fields();

    if record.field_names() != required {
        return Err(RecordError::InvalidFields {
            record_type,
            required: required.into_iter().collect(),
        });
    }
    Ok(record_type)
}

/// Cleanup lookup: a remote record matches when its own fields contain this
/// `type`/`host`/`data` triple. TTL and type-specific fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    pub record_type: RecordType,
    pub host: String,
    pub data: String,
}

impl RecordFilter {
    pub fn txt(host: &str, data: &str) -> Self {
        Self {
            record_type: RecordType::TXT,
            host: host.to_string(),
            data: data.to_string(),
        }
    }

    pub fn matches(&self, record: &DnsRecord) -> bool {
        record.record_type == self.record_type.as_str()
            && record.host == self.host
            && record.data == self.data
    }
}
