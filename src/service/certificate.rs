//! Certificate lifecycle: issue, look up, validate, log validations, revoke.

use crate::error::AppError;
use crate::model::certificate::status_message;
use crate::model::{
    Certificate, CertificateFilter, CertificateStatus, CertificateValidation, Collection, IssueCertificate,
    LogValidation, RequestOrigin, RevokeCertificate, Student, TrainingProgram,
};
use crate::service::Directory;
use crate::store::CertificateStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

const NOT_FOUND: &str = "Certificate not found";

/// Public summary returned by a validation check.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSummary {
    pub certificate_number: String,
    pub student_name: Option<String>,
    pub program_name: Option<String>,
    pub issue_date: DateTime<Utc>,
    pub grade: String,
    pub final_score: f64,
    pub validation_count: i64,
}

#[derive(Clone, Debug)]
pub struct ValidationOutcome {
    pub status: CertificateStatus,
    pub message: String,
    pub summary: CertificateSummary,
}

#[derive(Clone)]
pub struct CertificateService {
    certs: Arc<dyn CertificateStore>,
    directory: Directory,
}

fn not_found() -> AppError {
    AppError::NotFound(NOT_FOUND.into())
}

impl CertificateService {
    pub fn new(certs: Arc<dyn CertificateStore>, directory: Directory) -> Self {
        CertificateService { certs, directory }
    }

    /// Issue a new certificate for an existing student and program.
    pub async fn issue(&self, req: IssueCertificate) -> Result<Certificate, AppError> {
        let (grade, certificate_type) = req.check()?;
        if !self.directory.exists(Collection::Students, req.student_id).await? {
            return Err(AppError::Validation(format!("studentId: student {} does not exist", req.student_id)));
        }
        if !self.directory.exists(Collection::Programs, req.program_id).await? {
            return Err(AppError::Validation(format!(
                "programId: training program {} does not exist",
                req.program_id
            )));
        }
        let cert = Certificate::issue(&req, grade, certificate_type, Utc::now());
        self.certs.insert_certificate(&cert).await?;
        tracing::info!(
            certificate_number = %cert.certificate_number,
            student_id = %cert.student_id,
            program_id = %cert.program_id,
            "certificate issued"
        );
        Ok(cert)
    }

    pub async fn lookup_by_number(&self, number: &str) -> Result<Certificate, AppError> {
        self.certs.certificate_by_number(number).await?.ok_or_else(not_found)
    }

    pub async fn get(&self, id: Uuid) -> Result<Certificate, AppError> {
        self.certs.certificate_by_id(id).await?.ok_or_else(not_found)
    }

    pub async fn list(&self, filter: &CertificateFilter) -> Result<Vec<Certificate>, AppError> {
        self.certs.list_certificates(filter).await
    }

    /// Check validity and count the check. The reported count is the stored
    /// value plus this check, even if other checks land concurrently.
    pub async fn validate(&self, number: &str) -> Result<ValidationOutcome, AppError> {
        let cert = self.lookup_by_number(number).await?;
        let status = cert.status(Utc::now());
        if !self.certs.increment_validation_count(cert.id).await? {
            tracing::warn!(certificate_number = %number, "certificate vanished before count update");
        }

        let student: Option<Student> = self.directory.find(cert.student_id).await?;
        let program: Option<TrainingProgram> = self.directory.find(cert.program_id).await?;
        let summary = CertificateSummary {
            certificate_number: cert.certificate_number.clone(),
            student_name: student.map(|s| s.full_name()),
            program_name: program.map(|p| p.program_name),
            issue_date: cert.issue_date,
            grade: cert.grade.as_str().to_string(),
            final_score: cert.final_score,
            validation_count: cert.validation_count + 1,
        };
        tracing::info!(certificate_number = %number, result = %status, "certificate validated");
        Ok(ValidationOutcome {
            status,
            message: status_message(&cert, status),
            summary,
        })
    }

    /// Record a third-party check. Counts independently of `validate`.
    pub async fn log_validation(
        &self,
        number: &str,
        body: LogValidation,
        origin: RequestOrigin,
    ) -> Result<CertificateValidation, AppError> {
        let cert = self.lookup_by_number(number).await?;
        let now = Utc::now();
        let entry = body.into_record(cert.id, cert.status(now), origin, now)?;
        self.certs.append_validation(&entry).await?;
        if !self.certs.increment_validation_count(cert.id).await? {
            tracing::warn!(certificate_number = %number, "certificate vanished before count update");
        }
        tracing::info!(
            certificate_number = %number,
            validation_id = %entry.id,
            result = %entry.validation_result,
            "validation logged"
        );
        Ok(entry)
    }

    /// Revoke unconditionally; a later call overwrites the earlier actor, reason and time.
    pub async fn revoke(&self, id: Uuid, req: RevokeCertificate) -> Result<Certificate, AppError> {
        let cert = self
            .certs
            .revoke(id, &req, Utc::now())
            .await?
            .ok_or_else(not_found)?;
        tracing::info!(
            certificate_number = %cert.certificate_number,
            revoked_by = req.revoked_by.as_deref().unwrap_or(""),
            "certificate revoked"
        );
        Ok(cert)
    }

    /// Newest first. An unknown certificate simply has no entries.
    pub async fn list_validations(&self, id: Uuid) -> Result<Vec<CertificateValidation>, AppError> {
        self.certs.validations_for(id).await
    }

    /// Certificate JSON with its derived `status` and the student and program expanded.
    pub async fn view(&self, cert: &Certificate) -> Result<Value, AppError> {
        let mut value = serde_json::to_value(cert)?;
        let student = self.directory.payload(Collection::Students, cert.student_id).await?;
        let program = self.directory.payload(Collection::Programs, cert.program_id).await?;
        if let Some(obj) = value.as_object_mut() {
            obj.insert("status".into(), Value::String(cert.status(Utc::now()).to_string()));
            obj.insert("studentId".into(), student.unwrap_or(Value::Null));
            obj.insert("programId".into(), program.unwrap_or(Value::Null));
        }
        Ok(value)
    }

    pub async fn views(&self, certs: &[Certificate]) -> Result<Vec<Value>, AppError> {
        let mut out = Vec::with_capacity(certs.len());
        for cert in certs {
            out.push(self.view(cert).await?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{College, ValidationPurpose};
    use crate::store::MemoryStore;
    use chrono::Duration;
    use serde_json::json;

    struct Fixture {
        service: CertificateService,
        store: Arc<MemoryStore>,
        student_id: Uuid,
        program_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let directory = Directory::new(store.clone());
        let college: College = directory
            .create(json!({
                "collegeName": "Test Medical College",
                "address": {"street": "1 Main Rd", "city": "Pune", "state": "MH", "pincode": "411001"},
                "contactEmail": "office@tmc.edu",
                "contactPhone": "9876543210",
                "accreditationNumber": "NAAC-001",
                "establishedYear": 1985
            }))
            .await
            .unwrap();
        let student: Student = directory
            .create(json!({
                "firstName": "John",
                "lastName": "Doe",
                "email": "john@test.com",
                "phone": "1234567890",
                "dateOfBirth": "2000-01-01",
                "collegeId": college.id,
                "enrollmentNumber": "EN001",
                "address": {"street": "123 Test St", "city": "Pune", "state": "MH", "pincode": "411001"},
                "emergencyContact": {"name": "Jane Doe", "relationship": "Mother", "phone": "9876543210"}
            }))
            .await
            .unwrap();
        let program: TrainingProgram = directory
            .create(json!({
                "programName": "Emergency Medicine",
                "programCode": "em-101",
                "description": "Acute care training",
                "startDate": "2024-01-01",
                "endDate": "2024-12-31",
                "fees": {"amount": 50000},
                "classroomPhase": {"location": "Block A"}
            }))
            .await
            .unwrap();
        Fixture {
            service: CertificateService::new(store.clone(), directory),
            store,
            student_id: student.id,
            program_id: program.id,
        }
    }

    fn issue_req(f: &Fixture) -> IssueCertificate {
        IssueCertificate {
            student_id: f.student_id,
            program_id: f.program_id,
            grade: "A".into(),
            final_score: 85.0,
            certificate_type: None,
            expiry_date: None,
        }
    }

    fn log_body() -> LogValidation {
        LogValidation {
            validator_name: "HR Manager".into(),
            validator_email: "hr@company.com".into(),
            validator_organization: "Test Company".into(),
            validation_purpose: ValidationPurpose::EmploymentVerification.as_str().into(),
            additional_notes: None,
        }
    }

    fn origin() -> RequestOrigin {
        RequestOrigin {
            ip_address: "10.0.0.1".into(),
            user_agent: "Test Agent".into(),
        }
    }

    #[tokio::test]
    async fn test_issue_then_validate() {
        let f = fixture().await;
        let cert = f.service.issue(issue_req(&f)).await.unwrap();
        assert!(cert.certificate_number.starts_with("CERT-"));

        let first = f.service.validate(&cert.certificate_number).await.unwrap();
        assert_eq!(first.status, CertificateStatus::Valid);
        assert_eq!(first.message, "Certificate is valid");
        assert_eq!(first.summary.grade, "A");
        assert_eq!(first.summary.student_name.as_deref(), Some("John Doe"));
        assert_eq!(first.summary.program_name.as_deref(), Some("Emergency Medicine"));
        assert_eq!(first.summary.validation_count, 1);

        let second = f.service.validate(&cert.certificate_number).await.unwrap();
        assert_eq!(second.summary.validation_count, 2);
    }

    #[tokio::test]
    async fn test_issue_requires_existing_refs() {
        let f = fixture().await;
        let mut req = issue_req(&f);
        req.student_id = Uuid::new_v4();
        assert!(matches!(f.service.issue(req).await, Err(AppError::Validation(_))));

        let mut req = issue_req(&f);
        req.final_score = 101.0;
        assert!(matches!(f.service.issue(req).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_validate_unknown_number() {
        let f = fixture().await;
        let err = f.service.validate("CERT-00000000").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(m) if m == "Certificate not found"));
    }

    #[tokio::test]
    async fn test_expired_and_revoked_results() {
        let f = fixture().await;
        let mut req = issue_req(&f);
        req.expiry_date = Some(Utc::now() - Duration::days(1));
        let cert = f.service.issue(req).await.unwrap();
        let outcome = f.service.validate(&cert.certificate_number).await.unwrap();
        assert_eq!(outcome.status, CertificateStatus::Expired);
        assert!(outcome.message.starts_with("Certificate expired on"));

        f.service
            .revoke(
                cert.id,
                RevokeCertificate {
                    revoked_by: Some("registrar".into()),
                    revoke_reason: Some("Academic misconduct".into()),
                },
            )
            .await
            .unwrap();
        let outcome = f.service.validate(&cert.certificate_number).await.unwrap();
        assert_eq!(outcome.status, CertificateStatus::Revoked);
        assert!(outcome.message.contains("Academic misconduct"));
    }

    #[tokio::test]
    async fn test_log_validation_appends_and_counts() {
        let f = fixture().await;
        let cert = f.service.issue(issue_req(&f)).await.unwrap();
        let entry = f
            .service
            .log_validation(&cert.certificate_number, log_body(), origin())
            .await
            .unwrap();
        assert_eq!(entry.validation_result, CertificateStatus::Valid);
        assert_eq!(entry.ip_address, "10.0.0.1");

        let log = f.service.list_validations(cert.id).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].id, entry.id);
        let stored = f.store.certificate_by_id(cert.id).await.unwrap().unwrap();
        assert_eq!(stored.validation_count, 1);

        let err = f
            .service
            .log_validation("CERT-MISSING0", log_body(), origin())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    /// Delegates to a `MemoryStore` but reports every count update as missing its row.
    struct LostCountStore(Arc<MemoryStore>);

    #[async_trait::async_trait]
    impl CertificateStore for LostCountStore {
        async fn ping(&self) -> Result<(), AppError> {
            self.0.ping().await
        }
        async fn insert_certificate(&self, cert: &Certificate) -> Result<(), AppError> {
            self.0.insert_certificate(cert).await
        }
        async fn certificate_by_id(&self, id: Uuid) -> Result<Option<Certificate>, AppError> {
            self.0.certificate_by_id(id).await
        }
        async fn certificate_by_number(&self, number: &str) -> Result<Option<Certificate>, AppError> {
            self.0.certificate_by_number(number).await
        }
        async fn list_certificates(&self, filter: &CertificateFilter) -> Result<Vec<Certificate>, AppError> {
            self.0.list_certificates(filter).await
        }
        async fn increment_validation_count(&self, _id: Uuid) -> Result<bool, AppError> {
            Ok(false)
        }
        async fn revoke(
            &self,
            id: Uuid,
            req: &RevokeCertificate,
            at: DateTime<Utc>,
        ) -> Result<Option<Certificate>, AppError> {
            self.0.revoke(id, req, at).await
        }
        async fn append_validation(&self, entry: &CertificateValidation) -> Result<(), AppError> {
            self.0.append_validation(entry).await
        }
        async fn validations_for(&self, certificate_id: Uuid) -> Result<Vec<CertificateValidation>, AppError> {
            self.0.validations_for(certificate_id).await
        }
    }

    #[tokio::test]
    async fn test_missing_count_row_does_not_fail_checks() {
        let f = fixture().await;
        let cert = f.service.issue(issue_req(&f)).await.unwrap();
        let service = CertificateService::new(
            Arc::new(LostCountStore(f.store.clone())),
            f.service.directory.clone(),
        );

        let outcome = service.validate(&cert.certificate_number).await.unwrap();
        assert_eq!(outcome.status, CertificateStatus::Valid);
        let entry = service
            .log_validation(&cert.certificate_number, log_body(), origin())
            .await
            .unwrap();
        assert_eq!(service.list_validations(cert.id).await.unwrap()[0].id, entry.id);
        let stored = f.store.certificate_by_id(cert.id).await.unwrap().unwrap();
        assert_eq!(stored.validation_count, 0);
    }

    #[tokio::test]
    async fn test_revoke_twice_overwrites() {
        let f = fixture().await;
        let cert = f.service.issue(issue_req(&f)).await.unwrap();
        let first = f
            .service
            .revoke(
                cert.id,
                RevokeCertificate {
                    revoked_by: Some("a".into()),
                    revoke_reason: Some("first".into()),
                },
            )
            .await
            .unwrap();
        let second = f
            .service
            .revoke(
                cert.id,
                RevokeCertificate {
                    revoked_by: Some("b".into()),
                    revoke_reason: Some("second".into()),
                },
            )
            .await
            .unwrap();
        assert!(!second.is_valid);
        assert_eq!(second.revoke_reason.as_deref(), Some("second"));
        assert!(second.revoked_at >= first.revoked_at);
        assert!(matches!(
            f.service.revoke(Uuid::new_v4(), RevokeCertificate::default()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_view_expands_references() {
        let f = fixture().await;
        let cert = f.service.issue(issue_req(&f)).await.unwrap();
        let view = f.service.view(&cert).await.unwrap();
        assert_eq!(view["status"], "Valid");
        assert_eq!(view["studentId"]["firstName"], "John");
        assert_eq!(view["programId"]["programCode"], "EM-101");
        assert_eq!(view["grade"], "A");
    }
}
