//! Postgres storage. All tables live in the schema from `REGISTRY_SCHEMA` (default `registry`)
//! and are created idempotently at startup.

use super::{CertificateStore, DocumentRecord, DocumentStore};
use crate::error::{AppError, ConfigError};
use crate::model::{
    Certificate, CertificateFilter, CertificateValidation, Collection, RevokeCertificate,
};
use crate::settings::Settings;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{ConnectOptions, PgConnection, PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

const CERTIFICATES: &str = "certificates";
const VALIDATIONS: &str = "certificate_validations";
const DOCUMENTS: &str = "documents";
const DOCUMENT_KEYS: &str = "document_keys";

const CERTIFICATE_COLUMNS: &str = "id, certificate_number, student_id, program_id, issue_date, is_valid, \
     certificate_type, grade, final_score, validation_count, digital_signature, qr_code, expiry_date, \
     revoked_at, revoked_by, revoke_reason, created_at, updated_at";

const VALIDATION_COLUMNS: &str = "id, certificate_id, validator_name, validator_email, validator_organization, \
     validation_date, validation_purpose, ip_address, user_agent, validation_result, additional_notes";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
        }
    }

    /// Create the database if needed, open the pool and ensure tables exist.
    pub async fn connect(settings: &Settings) -> Result<Self, AppError> {
        ensure_database_exists(&settings.database_url).await?;
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(&settings.database_url)
            .await?;
        let store = PgStore::new(pool, settings.schema.clone());
        store.ensure_tables().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Schema-qualified table name, e.g. `registry.certificates`.
    fn table(&self, name: &str) -> String {
        format!("{}.{}", self.schema, name)
    }

    /// `seq` columns record insertion order and break ties when sorting by date.
    pub async fn ensure_tables(&self) -> Result<(), AppError> {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema))
            .execute(&self.pool)
            .await?;

        let certificates = self.table(CERTIFICATES);
        let validations = self.table(VALIDATIONS);
        let documents = self.table(DOCUMENTS);
        let keys = self.table(DOCUMENT_KEYS);

        let ddl = [
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id UUID PRIMARY KEY,
                    seq BIGSERIAL NOT NULL,
                    certificate_number TEXT NOT NULL UNIQUE,
                    student_id UUID NOT NULL,
                    program_id UUID NOT NULL,
                    issue_date TIMESTAMPTZ NOT NULL,
                    is_valid BOOLEAN NOT NULL DEFAULT TRUE,
                    certificate_type TEXT NOT NULL,
                    grade TEXT NOT NULL,
                    final_score DOUBLE PRECISION NOT NULL,
                    validation_count BIGINT NOT NULL DEFAULT 0,
                    digital_signature TEXT NOT NULL,
                    qr_code TEXT NOT NULL,
                    expiry_date TIMESTAMPTZ,
                    revoked_at TIMESTAMPTZ,
                    revoked_by TEXT,
                    revoke_reason TEXT,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
                )
                "#,
                certificates
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS certificates_student_idx ON {} (student_id)",
                certificates
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    id UUID PRIMARY KEY,
                    seq BIGSERIAL NOT NULL,
                    certificate_id UUID NOT NULL REFERENCES {} (id),
                    validator_name TEXT NOT NULL,
                    validator_email TEXT NOT NULL,
                    validator_organization TEXT NOT NULL,
                    validation_date TIMESTAMPTZ NOT NULL,
                    validation_purpose TEXT NOT NULL,
                    ip_address TEXT NOT NULL,
                    user_agent TEXT NOT NULL,
                    validation_result TEXT NOT NULL,
                    additional_notes TEXT
                )
                "#,
                validations, certificates
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS certificate_validations_cert_idx ON {} (certificate_id, validation_date DESC)",
                validations
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    collection TEXT NOT NULL,
                    id UUID NOT NULL,
                    seq BIGSERIAL NOT NULL,
                    payload JSONB NOT NULL,
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    PRIMARY KEY (collection, id)
                )
                "#,
                documents
            ),
            format!(
                "CREATE INDEX IF NOT EXISTS documents_payload_idx ON {} USING GIN (payload jsonb_path_ops)",
                documents
            ),
            format!(
                r#"
                CREATE TABLE IF NOT EXISTS {} (
                    collection TEXT NOT NULL,
                    key_name TEXT NOT NULL,
                    key_value TEXT NOT NULL,
                    id UUID NOT NULL,
                    PRIMARY KEY (collection, key_name, key_value)
                )
                "#,
                keys
            ),
        ];
        for statement in &ddl {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        tracing::info!(schema = %self.schema, "storage tables ready");
        Ok(())
    }

    async fn insert_keys(&self, conn: &mut PgConnection, record: &DocumentRecord) -> Result<(), AppError> {
        let sql = format!(
            "INSERT INTO {} (collection, key_name, key_value, id) VALUES ($1, $2, $3, $4)",
            self.table(DOCUMENT_KEYS)
        );
        for key in &record.unique_keys {
            sqlx::query(&sql)
                .bind(record.collection.as_str())
                .bind(key.name)
                .bind(&key.value)
                .bind(record.id)
                .execute(&mut *conn)
                .await
                .map_err(|e| {
                    unique_violation(e, || {
                        format!(
                            "{} with {} '{}' already exists",
                            record.collection.noun(),
                            key.name,
                            key.value
                        )
                    })
                })?;
        }
        Ok(())
    }
}

/// Map a unique-constraint violation to `Conflict`; anything else stays a database error.
fn unique_violation(e: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    let is_unique = matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation());
    if is_unique {
        AppError::Conflict(message())
    } else {
        AppError::Db(e)
    }
}

/// Parse an enum column written by this store.
fn stored<T: FromStr>(column: &str, raw: String) -> Result<T, AppError> {
    raw.parse()
        .map_err(|_| AppError::Internal(format!("unexpected {} '{}' in storage", column, raw)))
}

fn certificate_from_row(row: &PgRow) -> Result<Certificate, AppError> {
    Ok(Certificate {
        id: row.try_get("id")?,
        certificate_number: row.try_get("certificate_number")?,
        student_id: row.try_get("student_id")?,
        program_id: row.try_get("program_id")?,
        issue_date: row.try_get("issue_date")?,
        is_valid: row.try_get("is_valid")?,
        certificate_type: stored("certificate_type", row.try_get("certificate_type")?)?,
        grade: stored("grade", row.try_get("grade")?)?,
        final_score: row.try_get("final_score")?,
        validation_count: row.try_get("validation_count")?,
        digital_signature: row.try_get("digital_signature")?,
        qr_code: row.try_get("qr_code")?,
        expiry_date: row.try_get("expiry_date")?,
        revoked_at: row.try_get("revoked_at")?,
        revoked_by: row.try_get("revoked_by")?,
        revoke_reason: row.try_get("revoke_reason")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn validation_from_row(row: &PgRow) -> Result<CertificateValidation, AppError> {
    Ok(CertificateValidation {
        id: row.try_get("id")?,
        certificate_id: row.try_get("certificate_id")?,
        validator_name: row.try_get("validator_name")?,
        validator_email: row.try_get("validator_email")?,
        validator_organization: row.try_get("validator_organization")?,
        validation_date: row.try_get("validation_date")?,
        validation_purpose: stored("validation_purpose", row.try_get("validation_purpose")?)?,
        ip_address: row.try_get("ip_address")?,
        user_agent: row.try_get("user_agent")?,
        validation_result: stored("validation_result", row.try_get("validation_result")?)?,
        additional_notes: row.try_get("additional_notes")?,
    })
}

#[async_trait]
impl CertificateStore for PgStore {
    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_certificate(&self, cert: &Certificate) -> Result<(), AppError> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
            self.table(CERTIFICATES),
            CERTIFICATE_COLUMNS
        );
        tracing::debug!(sql = %sql, id = %cert.id, "query");
        sqlx::query(&sql)
            .bind(cert.id)
            .bind(&cert.certificate_number)
            .bind(cert.student_id)
            .bind(cert.program_id)
            .bind(cert.issue_date)
            .bind(cert.is_valid)
            .bind(cert.certificate_type.as_str())
            .bind(cert.grade.as_str())
            .bind(cert.final_score)
            .bind(cert.validation_count)
            .bind(&cert.digital_signature)
            .bind(&cert.qr_code)
            .bind(cert.expiry_date)
            .bind(cert.revoked_at)
            .bind(&cert.revoked_by)
            .bind(&cert.revoke_reason)
            .bind(cert.created_at)
            .bind(cert.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                unique_violation(e, || {
                    format!("certificate number {} already exists", cert.certificate_number)
                })
            })?;
        Ok(())
    }

    async fn certificate_by_id(&self, id: Uuid) -> Result<Option<Certificate>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            CERTIFICATE_COLUMNS,
            self.table(CERTIFICATES)
        );
        tracing::debug!(sql = %sql, id = %id, "query");
        let row = sqlx::query(&sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(certificate_from_row).transpose()
    }

    async fn certificate_by_number(&self, number: &str) -> Result<Option<Certificate>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE certificate_number = $1",
            CERTIFICATE_COLUMNS,
            self.table(CERTIFICATES)
        );
        tracing::debug!(sql = %sql, number, "query");
        let row = sqlx::query(&sql).bind(number).fetch_optional(&self.pool).await?;
        row.as_ref().map(certificate_from_row).transpose()
    }

    async fn list_certificates(&self, filter: &CertificateFilter) -> Result<Vec<Certificate>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} \
             WHERE ($1::uuid IS NULL OR student_id = $1) \
               AND ($2::uuid IS NULL OR program_id = $2) \
               AND ($3::boolean IS NULL OR is_valid = $3) \
             ORDER BY issue_date DESC, seq DESC",
            CERTIFICATE_COLUMNS,
            self.table(CERTIFICATES)
        );
        tracing::debug!(sql = %sql, filter = ?filter, "query");
        let rows = sqlx::query(&sql)
            .bind(filter.student_id)
            .bind(filter.program_id)
            .bind(filter.is_valid)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(certificate_from_row).collect()
    }

    async fn increment_validation_count(&self, id: Uuid) -> Result<bool, AppError> {
        let sql = format!(
            "UPDATE {} SET validation_count = validation_count + 1, updated_at = NOW() WHERE id = $1",
            self.table(CERTIFICATES)
        );
        tracing::debug!(sql = %sql, id = %id, "query");
        let done = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn revoke(
        &self,
        id: Uuid,
        req: &RevokeCertificate,
        at: DateTime<Utc>,
    ) -> Result<Option<Certificate>, AppError> {
        let sql = format!(
            "UPDATE {} SET revoked_at = $2, revoked_by = $3, revoke_reason = $4, is_valid = FALSE, updated_at = $2 \
             WHERE id = $1 RETURNING {}",
            self.table(CERTIFICATES),
            CERTIFICATE_COLUMNS
        );
        tracing::debug!(sql = %sql, id = %id, "query");
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(at)
            .bind(&req.revoked_by)
            .bind(&req.revoke_reason)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(certificate_from_row).transpose()
    }

    async fn append_validation(&self, entry: &CertificateValidation) -> Result<(), AppError> {
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            self.table(VALIDATIONS),
            VALIDATION_COLUMNS
        );
        tracing::debug!(sql = %sql, certificate_id = %entry.certificate_id, "query");
        sqlx::query(&sql)
            .bind(entry.id)
            .bind(entry.certificate_id)
            .bind(&entry.validator_name)
            .bind(&entry.validator_email)
            .bind(&entry.validator_organization)
            .bind(entry.validation_date)
            .bind(entry.validation_purpose.as_str())
            .bind(&entry.ip_address)
            .bind(&entry.user_agent)
            .bind(entry.validation_result.as_str())
            .bind(&entry.additional_notes)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn validations_for(&self, certificate_id: Uuid) -> Result<Vec<CertificateValidation>, AppError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE certificate_id = $1 ORDER BY validation_date DESC, seq DESC",
            VALIDATION_COLUMNS,
            self.table(VALIDATIONS)
        );
        tracing::debug!(sql = %sql, certificate_id = %certificate_id, "query");
        let rows = sqlx::query(&sql).bind(certificate_id).fetch_all(&self.pool).await?;
        rows.iter().map(validation_from_row).collect()
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert(&self, record: DocumentRecord) -> Result<(), AppError> {
        let sql = format!(
            "INSERT INTO {} (collection, id, payload) VALUES ($1, $2, $3)",
            self.table(DOCUMENTS)
        );
        tracing::debug!(sql = %sql, collection = record.collection.as_str(), id = %record.id, "query (tx)");
        let mut tx = self.pool.begin().await?;
        sqlx::query(&sql)
            .bind(record.collection.as_str())
            .bind(record.id)
            .bind(&record.payload)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                unique_violation(e, || {
                    format!("{} {} already exists", record.collection.noun(), record.id)
                })
            })?;
        self.insert_keys(&mut tx, &record).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, AppError> {
        let sql = format!(
            "SELECT payload FROM {} WHERE collection = $1 AND id = $2",
            self.table(DOCUMENTS)
        );
        tracing::debug!(sql = %sql, collection = collection.as_str(), id = %id, "query");
        let row: Option<(Value,)> = sqlx::query_as(&sql)
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(payload,)| payload))
    }

    async fn list(&self, collection: Collection, filter: &Map<String, Value>) -> Result<Vec<Value>, AppError> {
        let sql = format!(
            "SELECT payload FROM {} WHERE collection = $1 AND payload @> $2 ORDER BY seq",
            self.table(DOCUMENTS)
        );
        let filter = Value::Object(filter.clone());
        tracing::debug!(sql = %sql, collection = collection.as_str(), filter = %filter, "query");
        let rows: Vec<(Value,)> = sqlx::query_as(&sql)
            .bind(collection.as_str())
            .bind(&filter)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(payload,)| payload).collect())
    }

    async fn replace(&self, record: DocumentRecord) -> Result<bool, AppError> {
        let update = format!(
            "UPDATE {} SET payload = $3, updated_at = NOW() WHERE collection = $1 AND id = $2",
            self.table(DOCUMENTS)
        );
        let clear_keys = format!(
            "DELETE FROM {} WHERE collection = $1 AND id = $2",
            self.table(DOCUMENT_KEYS)
        );
        tracing::debug!(sql = %update, collection = record.collection.as_str(), id = %record.id, "query (tx)");
        let mut tx = self.pool.begin().await?;
        let done = sqlx::query(&update)
            .bind(record.collection.as_str())
            .bind(record.id)
            .bind(&record.payload)
            .execute(&mut *tx)
            .await?;
        if done.rows_affected() == 0 {
            return Ok(false);
        }
        sqlx::query(&clear_keys)
            .bind(record.collection.as_str())
            .bind(record.id)
            .execute(&mut *tx)
            .await?;
        self.insert_keys(&mut tx, &record).await?;
        tx.commit().await?;
        Ok(true)
    }
}

/// Ensure the database named in `database_url` exists, creating it if not. Connects to
/// the default `postgres` database to run CREATE DATABASE. Call before opening the pool.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = split_database_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url).map_err(|e| ConfigError::Invalid {
        var: "DATABASE_URL",
        reason: e.to_string(),
    })?;
    let mut conn: PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
        tracing::info!(database = %db_name, "created database");
    }
    Ok(())
}

/// Returns the admin URL (same server, `postgres` database) and the target database name.
fn split_database_url(url: &str) -> Result<(String, String), ConfigError> {
    let path_start = url.rfind('/').ok_or_else(|| ConfigError::Invalid {
        var: "DATABASE_URL",
        reason: "no database path".into(),
    })? + 1;
    let (base, path_and_query) = url.split_at(path_start);
    let (db_name, query) = match path_and_query.split_once('?') {
        Some((name, query)) => (name.trim(), Some(query)),
        None => (path_and_query.trim(), None),
    };
    let admin_url = match query {
        Some(q) => format!("{}postgres?{}", base, q),
        None => format!("{}postgres", base),
    };
    Ok((admin_url, db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
