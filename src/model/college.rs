use crate::error::AppError;
use crate::model::common::{default_true, trim, trim_lower, Address, Collection, Document, UniqueKey};
use crate::service::rules;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

pub const EARLIEST_ESTABLISHED_YEAR: i32 = 1800;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct College {
    pub id: Uuid,
    pub college_name: String,
    pub address: Address,
    pub contact_email: String,
    pub contact_phone: String,
    pub accreditation_number: String,
    pub established_year: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for College {
    const COLLECTION: Collection = Collection::Colleges;
    const NOT_FOUND: &'static str = "College not found";
    const DUPLICATE: &'static str = "College with this name or accreditation number already exists";

    fn id(&self) -> Uuid {
        self.id
    }

    fn normalize(&mut self) {
        trim(&mut self.college_name);
        self.address.normalize();
        trim_lower(&mut self.contact_email);
        trim(&mut self.contact_phone);
        trim(&mut self.accreditation_number);
    }

    fn validate(&self) -> Result<(), AppError> {
        rules::required("collegeName", &self.college_name)?;
        self.address.validate("address")?;
        rules::email("contactEmail", &self.contact_email)?;
        rules::phone("contactPhone", &self.contact_phone)?;
        rules::required("accreditationNumber", &self.accreditation_number)?;
        rules::range(
            "establishedYear",
            self.established_year,
            EARLIEST_ESTABLISHED_YEAR,
            Utc::now().year(),
        )
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![
            UniqueKey::new("collegeName", self.college_name.clone()),
            UniqueKey::new("accreditationNumber", self.accreditation_number.clone()),
        ]
    }

    /// Only active colleges are listed.
    fn list_filter(_params: &HashMap<String, String>) -> Map<String, Value> {
        let mut filter = Map::new();
        filter.insert("isActive".into(), Value::Bool(true));
        filter
    }
}
