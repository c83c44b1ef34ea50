//! Audit record of a third party checking a certificate.

use crate::error::AppError;
use crate::model::certificate::CertificateStatus;
use crate::model::common::{trim, trim_lower, trim_opt};
use crate::service::rules;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

pub const NOTES_MAX_CHARS: usize = 500;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationPurpose {
    #[serde(rename = "Employment Verification")]
    EmploymentVerification,
    #[serde(rename = "Academic Verification")]
    AcademicVerification,
    #[serde(rename = "License Application")]
    LicenseApplication,
    #[serde(rename = "Background Check")]
    BackgroundCheck,
    Other,
}

impl ValidationPurpose {
    pub const ALL: [ValidationPurpose; 5] = [
        ValidationPurpose::EmploymentVerification,
        ValidationPurpose::AcademicVerification,
        ValidationPurpose::LicenseApplication,
        ValidationPurpose::BackgroundCheck,
        ValidationPurpose::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationPurpose::EmploymentVerification => "Employment Verification",
            ValidationPurpose::AcademicVerification => "Academic Verification",
            ValidationPurpose::LicenseApplication => "License Application",
            ValidationPurpose::BackgroundCheck => "Background Check",
            ValidationPurpose::Other => "Other",
        }
    }
}

impl FromStr for ValidationPurpose {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ValidationPurpose::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "validationPurpose must be one of: {}",
                    ValidationPurpose::ALL
                        .iter()
                        .map(ValidationPurpose::as_str)
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}

/// Immutable once written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateValidation {
    pub id: Uuid,
    pub certificate_id: Uuid,
    pub validator_name: String,
    pub validator_email: String,
    pub validator_organization: String,
    pub validation_date: DateTime<Utc>,
    pub validation_purpose: ValidationPurpose,
    pub ip_address: String,
    pub user_agent: String,
    pub validation_result: CertificateStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_notes: Option<String>,
}

/// Who asked, from the request rather than the body.
#[derive(Clone, Debug)]
pub struct RequestOrigin {
    pub ip_address: String,
    pub user_agent: String,
}

/// POST /certificates/validate/:number/log body.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogValidation {
    #[serde(default)]
    pub validator_name: String,
    #[serde(default)]
    pub validator_email: String,
    #[serde(default)]
    pub validator_organization: String,
    #[serde(default)]
    pub validation_purpose: String,
    #[serde(default)]
    pub additional_notes: Option<String>,
}

impl LogValidation {
    /// Normalize and check the body, producing the record to append.
    pub fn into_record(
        mut self,
        certificate_id: Uuid,
        result: CertificateStatus,
        origin: RequestOrigin,
        now: DateTime<Utc>,
    ) -> Result<CertificateValidation, AppError> {
        trim(&mut self.validator_name);
        trim_lower(&mut self.validator_email);
        trim(&mut self.validator_organization);
        trim(&mut self.validation_purpose);
        trim_opt(&mut self.additional_notes);

        rules::required("validatorName", &self.validator_name)?;
        rules::required("validatorEmail", &self.validator_email)?;
        rules::email("validatorEmail", &self.validator_email)?;
        rules::required("validatorOrganization", &self.validator_organization)?;
        rules::required("validationPurpose", &self.validation_purpose)?;
        let purpose: ValidationPurpose = self.validation_purpose.parse()?;
        if let Some(notes) = &self.additional_notes {
            rules::max_length("additionalNotes", notes, NOTES_MAX_CHARS)?;
        }

        Ok(CertificateValidation {
            id: Uuid::new_v4(),
            certificate_id,
            validator_name: self.validator_name,
            validator_email: self.validator_email,
            validator_organization: self.validator_organization,
            validation_date: now,
            validation_purpose: purpose,
            ip_address: origin.ip_address,
            user_agent: origin.user_agent,
            validation_result: result,
            additional_notes: self.additional_notes,
        })
    }
}
