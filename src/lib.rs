//! Training registry: REST backend for a medical training program. Reference data
//! (colleges, students, programs, doctors, hospitals) plus the certificate lifecycle.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod model;
pub mod routes;
pub mod service;
pub mod settings;
pub mod state;
pub mod store;

pub use error::{AppError, ConfigError};
pub use routes::app;
pub use settings::{Settings, StorageBackend};
pub use state::AppState;
pub use store::{ensure_database_exists, MemoryStore, PgStore};
