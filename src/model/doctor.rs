use crate::error::AppError;
use crate::model::common::{
    bool_param, de_datetime, de_opt_datetime, default_true, trim, trim_lower, Collection, Document, Reference,
    UniqueKey,
};
use crate::service::rules;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Qualification {
    pub degree: String,
    pub institution: String,
    pub year: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub specialization: String,
    /// Years.
    pub experience: u32,
    #[serde(default)]
    pub is_senior_doctor: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub license_number: String,
    #[serde(default)]
    pub qualifications: Vec<Qualification>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Document for Doctor {
    const COLLECTION: Collection = Collection::Doctors;
    const NOT_FOUND: &'static str = "Doctor not found";
    const DUPLICATE: &'static str = "Doctor with this email or license number already exists";

    fn id(&self) -> Uuid {
        self.id
    }

    fn normalize(&mut self) {
        trim(&mut self.first_name);
        trim(&mut self.last_name);
        trim_lower(&mut self.email);
        trim(&mut self.phone);
        trim(&mut self.specialization);
        trim(&mut self.license_number);
    }

    fn validate(&self) -> Result<(), AppError> {
        rules::required("firstName", &self.first_name)?;
        rules::required("lastName", &self.last_name)?;
        rules::email("email", &self.email)?;
        rules::phone("phone", &self.phone)?;
        rules::required("specialization", &self.specialization)?;
        rules::required("licenseNumber", &self.license_number)?;
        for (i, q) in self.qualifications.iter().enumerate() {
            rules::required(&format!("qualifications[{}].degree", i), &q.degree)?;
            rules::required(&format!("qualifications[{}].institution", i), &q.institution)?;
        }
        Ok(())
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![
            UniqueKey::new("email", self.email.clone()),
            UniqueKey::new("licenseNumber", self.license_number.clone()),
        ]
    }

    /// Active doctors only, optionally by seniority.
    fn list_filter(params: &HashMap<String, String>) -> Map<String, Value> {
        let mut filter = Map::new();
        filter.insert("isActive".into(), Value::Bool(true));
        if let Some(senior) = bool_param(params, "isSeniorDoctor") {
            filter.insert("isSeniorDoctor".into(), Value::Bool(senior));
        }
        filter
    }

    /// `specialization` matches as a case-insensitive substring.
    fn matches(&self, params: &HashMap<String, String>) -> bool {
        match params.get("specialization").map(|s| s.trim()).filter(|s| !s.is_empty()) {
            Some(needle) => self
                .specialization
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            None => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
}

/// A doctor's posting at a hospital.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorHospitalAssignment {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub hospital_id: Uuid,
    #[serde(default = "Utc::now", deserialize_with = "de_datetime")]
    pub start_date: DateTime<Utc>,
    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub department: String,
    pub position: String,
    pub working_hours: WorkingHours,
    #[serde(default)]
    pub working_days: Vec<Weekday>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for DoctorHospitalAssignment {
    const COLLECTION: Collection = Collection::Assignments;
    const NOT_FOUND: &'static str = "Assignment not found";
    const DUPLICATE: &'static str = "Hospital assignment already exists";

    fn id(&self) -> Uuid {
        self.id
    }

    fn normalize(&mut self) {
        trim(&mut self.department);
        trim(&mut self.position);
        trim(&mut self.working_hours.start);
        trim(&mut self.working_hours.end);
    }

    fn validate(&self) -> Result<(), AppError> {
        rules::required("department", &self.department)?;
        rules::required("position", &self.position)?;
        rules::time_of_day("workingHours.start", &self.working_hours.start)?;
        rules::time_of_day("workingHours.end", &self.working_hours.end)
    }

    fn references(&self) -> Vec<Reference> {
        vec![
            Reference {
                field: "doctorId",
                collection: Collection::Doctors,
                id: self.doctor_id,
            },
            Reference {
                field: "hospitalId",
                collection: Collection::Hospitals,
                id: self.hospital_id,
            },
        ]
    }
}
