use crate::error::AppError;
use crate::model::common::{default_true, trim, Collection, Document};
use crate::service::rules;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_city() -> String {
    "Pune".into()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacilityType {
    Hospital,
    #[serde(rename = "Nursing Home")]
    NursingHome,
    Lab,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FacilityClass {
    Public,
    Private,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    pub id: Uuid,
    pub facility_name: String,
    #[serde(default = "default_city")]
    pub city_name: String,
    pub zone_name: String,
    pub ward_name: String,
    pub zone_no: i64,
    pub ward_no: i64,
    #[serde(rename = "type")]
    pub facility_type: FacilityType,
    #[serde(rename = "class")]
    pub facility_class: FacilityClass,
    #[serde(default)]
    pub pharmacy_available: bool,
    #[serde(default)]
    pub emergency_beds: u32,
    #[serde(default)]
    pub total_beds: u32,
    #[serde(default)]
    pub doctor_count: u32,
    #[serde(default)]
    pub nurse_count: u32,
    #[serde(default)]
    pub midwives_count: u32,
    #[serde(default)]
    pub avg_monthly_patients: u32,
    #[serde(default)]
    pub ambulance_service: bool,
    #[serde(default)]
    pub ambulance_count: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for Hospital {
    const COLLECTION: Collection = Collection::Hospitals;
    const NOT_FOUND: &'static str = "Hospital not found";
    const DUPLICATE: &'static str = "Hospital already exists";

    fn id(&self) -> Uuid {
        self.id
    }

    fn normalize(&mut self) {
        trim(&mut self.facility_name);
        trim(&mut self.city_name);
        trim(&mut self.zone_name);
        trim(&mut self.ward_name);
    }

    // Counters are unsigned, so negative values fail at deserialization.
    fn validate(&self) -> Result<(), AppError> {
        rules::required("facilityName", &self.facility_name)?;
        rules::required("cityName", &self.city_name)?;
        rules::required("zoneName", &self.zone_name)?;
        rules::required("wardName", &self.ward_name)
    }
}
