//! In-process store for tests and `STORAGE_BACKEND=memory`.

use super::{payload_matches, CertificateStore, DocumentRecord, DocumentStore};
use crate::error::AppError;
use crate::model::{
    Certificate, CertificateFilter, CertificateValidation, Collection, RevokeCertificate, UniqueKey,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::cmp::Reverse;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct CertificateTables {
    next_seq: u64,
    by_id: HashMap<Uuid, (u64, Certificate)>,
    by_number: HashMap<String, Uuid>,
    /// Append order is insertion order.
    validations: Vec<CertificateValidation>,
}

#[derive(Default)]
struct DocumentTable {
    next_seq: u64,
    rows: HashMap<Uuid, (u64, Value)>,
    keys: HashMap<(&'static str, String), Uuid>,
}

impl DocumentTable {
    fn clash<'k>(&self, id: Uuid, keys: &'k [UniqueKey]) -> Option<&'k UniqueKey> {
        keys.iter().find(|k| {
            self.keys
                .get(&(k.name, k.value.clone()))
                .map_or(false, |owner| *owner != id)
        })
    }

    fn set_keys(&mut self, id: Uuid, keys: Vec<UniqueKey>) {
        self.keys.retain(|_, owner| *owner != id);
        for k in keys {
            self.keys.insert((k.name, k.value), id);
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    certificates: RwLock<CertificateTables>,
    documents: RwLock<HashMap<Collection, DocumentTable>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn conflict(collection: Collection, key: &UniqueKey) -> AppError {
    AppError::Conflict(format!(
        "{} with {} '{}' already exists",
        collection.noun(),
        key.name,
        key.value
    ))
}

#[async_trait]
impl CertificateStore for MemoryStore {
    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn insert_certificate(&self, cert: &Certificate) -> Result<(), AppError> {
        let mut t = self.certificates.write().await;
        if t.by_number.contains_key(&cert.certificate_number) {
            return Err(AppError::Conflict(format!(
                "certificate number {} already exists",
                cert.certificate_number
            )));
        }
        if t.by_id.contains_key(&cert.id) {
            return Err(AppError::Conflict(format!("certificate {} already exists", cert.id)));
        }
        t.next_seq += 1;
        let seq = t.next_seq;
        t.by_number.insert(cert.certificate_number.clone(), cert.id);
        t.by_id.insert(cert.id, (seq, cert.clone()));
        Ok(())
    }

    async fn certificate_by_id(&self, id: Uuid) -> Result<Option<Certificate>, AppError> {
        let t = self.certificates.read().await;
        Ok(t.by_id.get(&id).map(|(_, c)| c.clone()))
    }

    async fn certificate_by_number(&self, number: &str) -> Result<Option<Certificate>, AppError> {
        let t = self.certificates.read().await;
        Ok(t.by_number
            .get(number)
            .and_then(|id| t.by_id.get(id))
            .map(|(_, c)| c.clone()))
    }

    async fn list_certificates(&self, filter: &CertificateFilter) -> Result<Vec<Certificate>, AppError> {
        let t = self.certificates.read().await;
        let mut rows: Vec<&(u64, Certificate)> = t.by_id.values().filter(|(_, c)| filter.matches(c)).collect();
        rows.sort_by_key(|(seq, c)| (Reverse(c.issue_date), Reverse(*seq)));
        Ok(rows.into_iter().map(|(_, c)| c.clone()).collect())
    }

    async fn increment_validation_count(&self, id: Uuid) -> Result<bool, AppError> {
        let mut t = self.certificates.write().await;
        match t.by_id.get_mut(&id) {
            Some((_, c)) => {
                c.validation_count += 1;
                c.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn revoke(
        &self,
        id: Uuid,
        req: &RevokeCertificate,
        at: DateTime<Utc>,
    ) -> Result<Option<Certificate>, AppError> {
        let mut t = self.certificates.write().await;
        Ok(t.by_id.get_mut(&id).map(|(_, c)| {
            c.revoked_at = Some(at);
            c.revoked_by = req.revoked_by.clone();
            c.revoke_reason = req.revoke_reason.clone();
            c.is_valid = false;
            c.updated_at = at;
            c.clone()
        }))
    }

    async fn append_validation(&self, entry: &CertificateValidation) -> Result<(), AppError> {
        let mut t = self.certificates.write().await;
        t.validations.push(entry.clone());
        Ok(())
    }

    async fn validations_for(&self, certificate_id: Uuid) -> Result<Vec<CertificateValidation>, AppError> {
        let t = self.certificates.read().await;
        // Reverse first so the stable sort leaves equal dates newest-insert first.
        let mut out: Vec<CertificateValidation> = t
            .validations
            .iter()
            .rev()
            .filter(|v| v.certificate_id == certificate_id)
            .cloned()
            .collect();
        out.sort_by_key(|v| Reverse(v.validation_date));
        Ok(out)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, record: DocumentRecord) -> Result<(), AppError> {
        let mut docs = self.documents.write().await;
        let table = docs.entry(record.collection).or_default();
        if table.rows.contains_key(&record.id) {
            return Err(AppError::Conflict(format!(
                "{} {} already exists",
                record.collection.noun(),
                record.id
            )));
        }
        if let Some(key) = table.clash(record.id, &record.unique_keys) {
            return Err(conflict(record.collection, key));
        }
        table.next_seq += 1;
        let seq = table.next_seq;
        table.set_keys(record.id, record.unique_keys);
        table.rows.insert(record.id, (seq, record.payload));
        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, AppError> {
        let docs = self.documents.read().await;
        Ok(docs
            .get(&collection)
            .and_then(|t| t.rows.get(&id))
            .map(|(_, v)| v.clone()))
    }

    async fn list(&self, collection: Collection, filter: &Map<String, Value>) -> Result<Vec<Value>, AppError> {
        let docs = self.documents.read().await;
        let Some(table) = docs.get(&collection) else {
            return Ok(Vec::new());
        };
        let mut rows: Vec<&(u64, Value)> = table
            .rows
            .values()
            .filter(|(_, v)| payload_matches(v, filter))
            .collect();
        rows.sort_by_key(|(seq, _)| *seq);
        Ok(rows.into_iter().map(|(_, v)| v.clone()).collect())
    }

    async fn replace(&self, record: DocumentRecord) -> Result<bool, AppError> {
        let mut docs = self.documents.write().await;
        let Some(table) = docs.get_mut(&record.collection) else {
            return Ok(false);
        };
        if !table.rows.contains_key(&record.id) {
            return Ok(false);
        }
        if let Some(key) = table.clash(record.id, &record.unique_keys) {
            return Err(conflict(record.collection, key));
        }
        table.set_keys(record.id, record.unique_keys);
        if let Some(row) = table.rows.get_mut(&record.id) {
            row.1 = record.payload;
        }
        Ok(true)
    }
}
