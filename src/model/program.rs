use crate::error::AppError;
use crate::model::common::{de_datetime, default_true, trim, Collection, Document, UniqueKey};
use crate::service::rules;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_duration_months() -> u32 {
    12
}

fn default_max_students() -> u32 {
    30
}

fn default_phase_months() -> u32 {
    6
}

fn default_min_passing_marks() -> f64 {
    60.0
}

fn default_currency() -> String {
    "INR".into()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CurriculumItem {
    pub subject: String,
    pub hours: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fees {
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClassroomPhase {
    #[serde(default = "default_phase_months")]
    pub duration: u32,
    pub location: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternshipPhase {
    #[serde(default = "default_phase_months")]
    pub duration: u32,
    #[serde(default = "default_min_passing_marks")]
    pub min_passing_marks: f64,
}

impl Default for InternshipPhase {
    fn default() -> Self {
        InternshipPhase {
            duration: default_phase_months(),
            min_passing_marks: default_min_passing_marks(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingProgram {
    pub id: Uuid,
    pub program_name: String,
    pub program_code: String,
    /// Months.
    #[serde(default = "default_duration_months")]
    pub duration: u32,
    pub description: String,
    #[serde(deserialize_with = "de_datetime")]
    pub start_date: DateTime<Utc>,
    #[serde(deserialize_with = "de_datetime")]
    pub end_date: DateTime<Utc>,
    #[serde(default = "default_max_students")]
    pub max_students: u32,
    #[serde(default)]
    pub current_enrollment: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub curriculum: Vec<CurriculumItem>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    pub fees: Fees,
    pub classroom_phase: ClassroomPhase,
    #[serde(default)]
    pub internship_phase: InternshipPhase,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for TrainingProgram {
    const COLLECTION: Collection = Collection::Programs;
    const NOT_FOUND: &'static str = "Training program not found";
    const DUPLICATE: &'static str = "Training program with this name or code already exists";

    fn id(&self) -> Uuid {
        self.id
    }

    fn normalize(&mut self) {
        trim(&mut self.program_name);
        self.program_code = self.program_code.trim().to_uppercase();
        trim(&mut self.description);
        for p in &mut self.prerequisites {
            trim(p);
        }
    }

    fn validate(&self) -> Result<(), AppError> {
        rules::required("programName", &self.program_name)?;
        rules::required("programCode", &self.program_code)?;
        rules::required("description", &self.description)?;
        rules::minimum("duration", self.duration, 1)?;
        rules::minimum("maxStudents", self.max_students, 1)?;
        for (i, item) in self.curriculum.iter().enumerate() {
            rules::required(&format!("curriculum[{}].subject", i), &item.subject)?;
            rules::minimum(&format!("curriculum[{}].hours", i), item.hours, 1)?;
        }
        rules::finite("fees.amount", self.fees.amount)?;
        rules::minimum("fees.amount", self.fees.amount, 0.0)?;
        rules::required("classroomPhase.location", &self.classroom_phase.location)?;
        rules::finite("internshipPhase.minPassingMarks", self.internship_phase.min_passing_marks)
    }

    fn unique_keys(&self) -> Vec<UniqueKey> {
        vec![
            UniqueKey::new("programName", self.program_name.clone()),
            UniqueKey::new("programCode", self.program_code.clone()),
        ]
    }
}
