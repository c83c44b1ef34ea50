use crate::error::AppError;
use crate::model::certificate::Grade;
use crate::model::common::{
    de_datetime, de_opt_datetime, id_filter_value, trim, trim_lower, Address, Collection, Document, Reference,
    UniqueKey,
};
use crate::service::rules;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StudentStatus {
    #[default]
    Active,
    Inactive,
    Graduated,
    Dropped,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmergencyContact {
    pub name: String,
    pub relationship: String,
    pub phone: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(deserialize_with = "de_datetime")]
    pub date_of_birth: DateTime<Utc>,
    pub college_id: Uuid,
    pub enrollment_number: String,
    #[serde(default = "Utc::now", deserialize_with = "de_datetime")]
    pub admission_date: DateTime<Utc>,
    #[serde(default)]
    pub status: StudentStatus,
    pub address: Address,
    pub emergency_contact: EmergencyContact,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl Document for Student {
    const COLLECTION: Collection = Collection::Students;
    const NOT_FOUND: &'static str = "Student not found";
    const DUPLICATE: &'static str = "Student with this email or enrollment number already exists";

    fn id(&self) -> Uuid {
        self.id
    }

    fn normalize(&mut self) {
        trim(&mut self.first_name);
        trim(&mut self.last_name);
        trim_lower(&mut self.email);
        trim(&mut self.phone);
        trim(&mut self.enrollment_number);
        self.address.normalize();
        trim(&mut self.emergency_contact.name);
        trim(&mut self.emergency_contact.relationship);
        trim(&mut self.emergency_contact.phone);
    }

    fn validate(&self) -> Result<(), AppError> {
        rules::required("firstName", &self.first_name)?;
        rules::required("lastName", &self.last_name)?;
        rules::email("email", &self.email)?;
        rules::phone("phone", &self.phone)?;
        rules::required("enrollmentNumber", &self.enrollment_number)?;
        self.address.validate("address")?;
        rules::required("emergencyContact.name", &self.emergency_contact.name)?;
        rules::required("emergencyContact.relationship", &self.emergency_contact.relationship)?;
        rules::phone("emergencyContact.phone", &self.emergency_contact.phone)
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![
            UniqueKey::new("email", self.email.clone()),
            UniqueKey::new("enrollmentNumber", self.enrollment_number.clone()),
        ]
    }

    fn references(&self) -> Vec<Reference> {
        vec![Reference {
            field: "collegeId",
            collection: Collection::Colleges,
            id: self.college_id,
        }]
    }

    fn list_filter(params: &HashMap<String, String>) -> Map<String, Value> {
        let mut filter = Map::new();
        if let Some(status) = params.get("status").filter(|s| !s.is_empty()) {
            filter.insert("status".into(), Value::String(status.clone()));
        }
        if let Some(college) = params.get("collegeId").filter(|s| !s.is_empty()) {
            filter.insert("collegeId".into(), id_filter_value(college));
        }
        filter
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrollmentStatus {
    #[default]
    Enrolled,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
    Dropped,
    Failed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrollmentPhase {
    #[default]
    Classroom,
    Examination,
    Internship,
    Completed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeesStatus {
    #[default]
    Pending,
    Partial,
    Paid,
    Waived,
}

/// Certificate grades plus a failing outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OverallGrade {
    Passed(Grade),
    Failed(FailGrade),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailGrade {
    Fail,
}

/// A student's enrollment in a training program; one per (student, program).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentEnrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub program_id: Uuid,
    #[serde(default = "Utc::now", deserialize_with = "de_datetime")]
    pub enrollment_date: DateTime<Utc>,
    #[serde(default)]
    pub status: EnrollmentStatus,
    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub completion_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_phase: EnrollmentPhase,
    #[serde(deserialize_with = "de_datetime")]
    pub classroom_start_date: DateTime<Utc>,
    #[serde(deserialize_with = "de_datetime")]
    pub classroom_end_date: DateTime<Utc>,
    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub internship_start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub internship_end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub overall_grade: Option<OverallGrade>,
    #[serde(default)]
    pub final_score: Option<f64>,
    #[serde(default)]
    pub attendance_percentage: f64,
    #[serde(default)]
    pub fees_status: FeesStatus,
    #[serde(default)]
    pub fees_paid: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for StudentEnrollment {
    const COLLECTION: Collection = Collection::Enrollments;
    const NOT_FOUND: &'static str = "Enrollment not found";
    const DUPLICATE: &'static str = "Student already enrolled in this program";

    fn id(&self) -> Uuid {
        self.id
    }

    fn validate(&self) -> Result<(), AppError> {
        if let Some(score) = self.final_score {
            rules::finite("finalScore", score)?;
            rules::range("finalScore", score, 0.0, 100.0)?;
        }
        rules::finite("attendancePercentage", self.attendance_percentage)?;
        rules::range("attendancePercentage", self.attendance_percentage, 0.0, 100.0)?;
        rules::finite("feesPaid", self.fees_paid)?;
        rules::minimum("feesPaid", self.fees_paid, 0.0)
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![UniqueKey::new(
            "studentProgram",
            format!("{}:{}", self.student_id, self.program_id),
        )]
    }

    fn references(&self) -> Vec<Reference> {
        vec![
            Reference {
                field: "studentId",
                collection: Collection::Students,
                id: self.student_id,
            },
            Reference {
                field: "programId",
                collection: Collection::Programs,
                id: self.program_id,
            },
        ]
    }
}
