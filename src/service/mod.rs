//! Business logic over the stores.

mod certificate;
mod directory;
pub mod rules;

pub use certificate::{CertificateService, CertificateSummary, ValidationOutcome};
pub use directory::Directory;
