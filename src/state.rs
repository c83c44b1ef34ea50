//! Shared application state for all routes.

use crate::service::{CertificateService, Directory};
use crate::store::{CertificateStore, DocumentStore, MemoryStore, PgStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub certificates: CertificateService,
    pub directory: Directory,
    /// Probed by `/ready`.
    pub store: Arc<dyn CertificateStore>,
}

impl AppState {
    pub fn new(certs: Arc<dyn CertificateStore>, docs: Arc<dyn DocumentStore>) -> Self {
        let directory = Directory::new(docs);
        AppState {
            certificates: CertificateService::new(certs.clone(), directory.clone()),
            directory,
            store: certs,
        }
    }

    pub fn postgres(store: PgStore) -> Self {
        let store = Arc::new(store);
        Self::new(store.clone(), store)
    }

    /// Everything in process memory; used by tests and `STORAGE_BACKEND=memory`.
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store)
    }
}
