pub mod certificate;
pub mod certificate_validation;
pub mod college;
pub mod common;
pub mod doctor;
pub mod hospital;
pub mod program;
pub mod student;

pub use certificate::{
    Certificate, CertificateFilter, CertificateStatus, CertificateType, Grade, IssueCertificate, RevokeCertificate,
};
pub use certificate_validation::{CertificateValidation, LogValidation, RequestOrigin, ValidationPurpose};
pub use college::College;
pub use common::{Collection, Document, Reference, UniqueKey};
pub use doctor::{Doctor, DoctorHospitalAssignment};
pub use hospital::Hospital;
pub use program::TrainingProgram;
pub use student::{Student, StudentEnrollment};
