//! Certificate record, its enumerations, and status derivation.

use crate::error::AppError;
use crate::model::common::de_opt_datetime;
use crate::service::rules;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    #[serde(rename = "B+")]
    BPlus,
    B,
    #[serde(rename = "C+")]
    CPlus,
    C,
    Pass,
}

impl Grade {
    pub const ALL: [Grade; 7] = [
        Grade::APlus,
        Grade::A,
        Grade::BPlus,
        Grade::B,
        Grade::CPlus,
        Grade::C,
        Grade::Pass,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::Pass => "Pass",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grade::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "grade must be one of: {}",
                    Grade::ALL.iter().map(Grade::as_str).collect::<Vec<_>>().join(", ")
                ))
            })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateType {
    #[default]
    Completion,
    Excellence,
    Participation,
}

impl CertificateType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateType::Completion => "Completion",
            CertificateType::Excellence => "Excellence",
            CertificateType::Participation => "Participation",
        }
    }
}

impl FromStr for CertificateType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Completion" => Ok(CertificateType::Completion),
            "Excellence" => Ok(CertificateType::Excellence),
            "Participation" => Ok(CertificateType::Participation),
            _ => Err(AppError::Validation(
                "certificateType must be one of: Completion, Excellence, Participation".into(),
            )),
        }
    }
}

/// Computed validity; never persisted on the certificate itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateStatus {
    Valid,
    Invalid,
    Expired,
    Revoked,
}

impl CertificateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateStatus::Valid => "Valid",
            CertificateStatus::Invalid => "Invalid",
            CertificateStatus::Expired => "Expired",
            CertificateStatus::Revoked => "Revoked",
        }
    }
}

impl fmt::Display for CertificateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CertificateStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Valid" => Ok(CertificateStatus::Valid),
            "Invalid" => Ok(CertificateStatus::Invalid),
            "Expired" => Ok(CertificateStatus::Expired),
            "Revoked" => Ok(CertificateStatus::Revoked),
            other => Err(AppError::Internal(format!("unknown validation result '{}'", other))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: Uuid,
    pub certificate_number: String,
    pub student_id: Uuid,
    pub program_id: Uuid,
    pub issue_date: DateTime<Utc>,
    pub is_valid: bool,
    pub certificate_type: CertificateType,
    pub grade: Grade,
    pub final_score: f64,
    pub validation_count: i64,
    /// Opaque random token. Nothing verifies it.
    pub digital_signature: String,
    pub qr_code: String,
    pub expiry_date: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<String>,
    pub revoke_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Certificate {
    /// Build a freshly issued certificate from a checked request.
    pub fn issue(req: &IssueCertificate, grade: Grade, certificate_type: CertificateType, now: DateTime<Utc>) -> Self {
        Certificate {
            id: Uuid::new_v4(),
            certificate_number: generate_certificate_number(),
            student_id: req.student_id,
            program_id: req.program_id,
            issue_date: now,
            is_valid: true,
            certificate_type,
            grade,
            final_score: req.final_score,
            validation_count: 0,
            digital_signature: generate_digital_signature(),
            qr_code: generate_qr_code(now),
            expiry_date: req.expiry_date,
            revoked_at: None,
            revoked_by: None,
            revoke_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self, now: DateTime<Utc>) -> CertificateStatus {
        derive_status(self, now)
    }
}

/// Priority is fixed: revoked, then expired, then invalid, else valid.
pub fn derive_status(cert: &Certificate, now: DateTime<Utc>) -> CertificateStatus {
    if cert.revoked_at.is_some() {
        CertificateStatus::Revoked
    } else if cert.expiry_date.map_or(false, |expiry| expiry < now) {
        CertificateStatus::Expired
    } else if !cert.is_valid {
        CertificateStatus::Invalid
    } else {
        CertificateStatus::Valid
    }
}

/// Human-readable explanation of a derived status.
pub fn status_message(cert: &Certificate, status: CertificateStatus) -> String {
    match status {
        CertificateStatus::Valid => "Certificate is valid".into(),
        CertificateStatus::Revoked => format!(
            "Certificate was revoked on {}. Reason: {}",
            cert.revoked_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            cert.revoke_reason.as_deref().unwrap_or("not specified")
        ),
        CertificateStatus::Expired => format!(
            "Certificate expired on {}",
            cert.expiry_date.map(|t| t.to_rfc3339()).unwrap_or_default()
        ),
        CertificateStatus::Invalid => "Certificate is marked as invalid".into(),
    }
}

/// `CERT-` followed by eight uppercase hex characters.
pub fn generate_certificate_number() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("CERT-{}", id[..8].to_uppercase())
}

pub fn generate_digital_signature() -> String {
    let bytes: [u8; 32] = rand::random();
    hex::encode(bytes)
}

pub fn generate_qr_code(now: DateTime<Utc>) -> String {
    let bytes: [u8; 8] = rand::random();
    format!("CERT-{}-{}", now.timestamp_millis(), hex::encode(bytes))
}

/// POST /certificates body.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCertificate {
    pub student_id: Uuid,
    pub program_id: Uuid,
    pub grade: String,
    pub final_score: f64,
    #[serde(default)]
    pub certificate_type: Option<String>,
    #[serde(default, deserialize_with = "de_opt_datetime")]
    pub expiry_date: Option<DateTime<Utc>>,
}

impl IssueCertificate {
    /// Check enums and score range; returns the parsed grade and type.
    pub fn check(&self) -> Result<(Grade, CertificateType), AppError> {
        let grade: Grade = self.grade.trim().parse()?;
        rules::finite("finalScore", self.final_score)?;
        rules::range("finalScore", self.final_score, 0.0, 100.0)?;
        let certificate_type = match self.certificate_type.as_deref() {
            Some(t) => t.trim().parse()?,
            None => CertificateType::default(),
        };
        Ok((grade, certificate_type))
    }
}

/// PUT /certificates/:id/revoke body.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeCertificate {
    #[serde(default)]
    pub revoked_by: Option<String>,
    #[serde(default)]
    pub revoke_reason: Option<String>,
}

/// GET /certificates query filters.
#[derive(Clone, Debug, Default)]
pub struct CertificateFilter {
    pub student_id: Option<Uuid>,
    pub program_id: Option<Uuid>,
    pub is_valid: Option<bool>,
}

impl CertificateFilter {
    pub fn matches(&self, cert: &Certificate) -> bool {
        self.student_id.map_or(true, |id| cert.student_id == id)
            && self.program_id.map_or(true, |id| cert.program_id == id)
            && self.is_valid.map_or(true, |v| cert.is_valid == v)
    }
}
