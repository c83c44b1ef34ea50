//! Storage contracts. Services only see these traits; `PgStore` backs them with
//! Postgres and `MemoryStore` with in-process maps.

pub mod memory;
pub mod postgres;

use crate::error::AppError;
use crate::model::{
    Certificate, CertificateFilter, CertificateValidation, Collection, RevokeCertificate, UniqueKey,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::{ensure_database_exists, PgStore};

/// Certificates and their validation log.
#[async_trait]
pub trait CertificateStore: Send + Sync {
    /// Cheap round trip used by the readiness probe.
    async fn ping(&self) -> Result<(), AppError>;

    /// Fails with `Conflict` when the certificate number is taken.
    async fn insert_certificate(&self, cert: &Certificate) -> Result<(), AppError>;

    async fn certificate_by_id(&self, id: Uuid) -> Result<Option<Certificate>, AppError>;

    async fn certificate_by_number(&self, number: &str) -> Result<Option<Certificate>, AppError>;

    /// Newest issue date first; equal dates newest insert first.
    async fn list_certificates(&self, filter: &CertificateFilter) -> Result<Vec<Certificate>, AppError>;

    /// Atomically add one to `validationCount`. Returns false if the certificate is gone.
    async fn increment_validation_count(&self, id: Uuid) -> Result<bool, AppError>;

    /// Mark revoked and invalid, overwriting any earlier revocation.
    async fn revoke(
        &self,
        id: Uuid,
        req: &RevokeCertificate,
        at: DateTime<Utc>,
    ) -> Result<Option<Certificate>, AppError>;

    /// Append-only.
    async fn append_validation(&self, entry: &CertificateValidation) -> Result<(), AppError>;

    /// Newest validation date first; equal dates newest insert first.
    async fn validations_for(&self, certificate_id: Uuid) -> Result<Vec<CertificateValidation>, AppError>;
}

/// A reference document as the store sees it: an opaque JSON payload plus the
/// keys that must stay unique within its collection.
#[derive(Clone, Debug)]
pub struct DocumentRecord {
    pub collection: Collection,
    pub id: Uuid,
    pub payload: Value,
    pub unique_keys: Vec<UniqueKey>,
}

/// JSON documents grouped by collection.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fails with `Conflict` when a unique key is already held by another document.
    async fn insert(&self, record: DocumentRecord) -> Result<(), AppError>;

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, AppError>;

    /// Documents whose top-level fields equal every entry of `filter`, in insertion order.
    async fn list(&self, collection: Collection, filter: &Map<String, Value>) -> Result<Vec<Value>, AppError>;

    /// Overwrite the payload and unique keys. Returns false if no such document exists.
    async fn replace(&self, record: DocumentRecord) -> Result<bool, AppError>;
}

/// Shallow containment, the in-process equivalent of Postgres `payload @> filter`
/// for scalar filter values.
pub fn payload_matches(payload: &Value, filter: &Map<String, Value>) -> bool {
    filter.iter().all(|(k, v)| payload.get(k) == Some(v))
}
