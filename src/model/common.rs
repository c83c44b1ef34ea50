//! Document trait and building blocks shared by reference-data records.

use crate::error::AppError;
use crate::service::rules;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Reference-data collections held by the document store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Collection {
    Colleges,
    Students,
    Programs,
    Doctors,
    Hospitals,
    Enrollments,
    Assignments,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Colleges => "colleges",
            Collection::Students => "students",
            Collection::Programs => "programs",
            Collection::Doctors => "doctors",
            Collection::Hospitals => "hospitals",
            Collection::Enrollments => "enrollments",
            Collection::Assignments => "assignments",
        }
    }

    /// Singular noun used in error messages.
    pub fn noun(&self) -> &'static str {
        match self {
            Collection::Colleges => "college",
            Collection::Students => "student",
            Collection::Programs => "training program",
            Collection::Doctors => "doctor",
            Collection::Hospitals => "hospital",
            Collection::Enrollments => "enrollment",
            Collection::Assignments => "hospital assignment",
        }
    }
}

/// A value that must be unique within its collection (e.g. a student's email).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniqueKey {
    pub name: &'static str,
    pub value: String,
}

impl UniqueKey {
    pub fn new(name: &'static str, value: impl Into<String>) -> Self {
        UniqueKey {
            name,
            value: value.into(),
        }
    }
}

/// A field holding the id of a document in another collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reference {
    pub field: &'static str,
    pub collection: Collection,
    pub id: Uuid,
}

/// A typed reference-data record stored as JSON.
///
/// Records serialize with camelCase keys and always carry `id`, `createdAt`
/// and `updatedAt`; the directory fills those in, callers never choose them.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: Collection;
    /// Message for a missing record, e.g. "Student not found".
    const NOT_FOUND: &'static str;
    /// Message for a unique-key clash.
    const DUPLICATE: &'static str;

    fn id(&self) -> Uuid;

    /// Trim and case-fold fields before validation.
    fn normalize(&mut self) {}

    fn validate(&self) -> Result<(), AppError>;

    fn unique_keys(&self) -> Vec<UniqueKey> {
        Vec::new()
    }

    /// Other documents this one points at; they must exist and are expanded in views.
    fn references(&self) -> Vec<Reference> {
        Vec::new()
    }

    /// Equality filters understood by the store, derived from query parameters.
    fn list_filter(_params: &HashMap<String, String>) -> Map<String, Value> {
        Map::new()
    }

    /// In-process filtering for conditions the store filter cannot express.
    fn matches(&self, _params: &HashMap<String, String>) -> bool {
        true
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl Address {
    pub fn normalize(&mut self) {
        trim(&mut self.street);
        trim(&mut self.city);
        trim(&mut self.state);
        trim(&mut self.pincode);
    }

    pub fn validate(&self, field: &str) -> Result<(), AppError> {
        rules::required(&format!("{}.street", field), &self.street)?;
        rules::required(&format!("{}.city", field), &self.city)?;
        rules::required(&format!("{}.state", field), &self.state)?;
        rules::pincode(&format!("{}.pincode", field), &self.pincode)
    }
}

pub fn trim(s: &mut String) {
    let t = s.trim();
    if t.len() != s.len() {
        *s = t.to_string();
    }
}

pub fn trim_lower(s: &mut String) {
    *s = s.trim().to_lowercase();
}

pub fn trim_opt(s: &mut Option<String>) {
    if let Some(v) = s {
        trim(v);
    }
}

/// Accepts RFC 3339 timestamps and plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        if let Some(naive) = d.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(format!("invalid date '{}': expected YYYY-MM-DD or RFC 3339", s))
}

pub fn de_datetime<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_datetime(&s).map_err(serde::de::Error::custom)
}

pub fn de_opt_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(s) => parse_datetime(&s).map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

pub fn default_true() -> bool {
    true
}

/// Filter value for an id query parameter, in the canonical form ids are stored in.
pub fn id_filter_value(raw: &str) -> Value {
    match Uuid::parse_str(raw.trim()) {
        Ok(id) => Value::String(id.to_string()),
        Err(_) => Value::String(raw.to_string()),
    }
}

/// Boolean query parameter: absent is no filter, `"true"` is true, any other value is false.
pub fn bool_param(params: &HashMap<String, String>, key: &str) -> Option<bool> {
    params.get(key).map(|v| v == "true")
}
