//! Typed create/read/update/list for reference documents.

use crate::error::AppError;
use crate::model::{Collection, Document};
use crate::store::{DocumentRecord, DocumentStore};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Fields the server owns; request bodies cannot set them.
const SERVER_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

#[derive(Clone)]
pub struct Directory {
    docs: Arc<dyn DocumentStore>,
}

fn into_object(body: Value) -> Result<Map<String, Value>, AppError> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::BadRequest("request body must be a JSON object".into())),
    }
}

/// Decode request data into a document; shape errors are the caller's fault.
fn decode<D: Document>(value: Value) -> Result<D, AppError> {
    serde_json::from_value(value).map_err(|e| AppError::Validation(e.to_string()))
}

/// Decode a stored payload; failures here mean the stored data is corrupt.
fn decode_stored<D: Document>(value: Value) -> Result<D, AppError> {
    serde_json::from_value(value).map_err(|e| {
        AppError::Internal(format!("stored {} is unreadable: {}", D::COLLECTION.noun(), e))
    })
}

fn duplicate<D: Document>(e: AppError) -> AppError {
    match e {
        AppError::Conflict(_) => AppError::Conflict(D::DUPLICATE.into()),
        other => other,
    }
}

impl Directory {
    pub fn new(docs: Arc<dyn DocumentStore>) -> Self {
        Directory { docs }
    }

    fn record<D: Document>(doc: &D) -> Result<DocumentRecord, AppError> {
        Ok(DocumentRecord {
            collection: D::COLLECTION,
            id: doc.id(),
            payload: serde_json::to_value(doc)?,
            unique_keys: doc.unique_keys(),
        })
    }

    /// Normalize, validate and check that every referenced document exists.
    async fn prepare<D: Document>(&self, doc: &mut D) -> Result<(), AppError> {
        doc.normalize();
        doc.validate()?;
        for r in doc.references() {
            if !self.exists(r.collection, r.id).await? {
                return Err(AppError::Validation(format!(
                    "{}: {} {} does not exist",
                    r.field,
                    r.collection.noun(),
                    r.id
                )));
            }
        }
        Ok(())
    }

    pub async fn exists(&self, collection: Collection, id: Uuid) -> Result<bool, AppError> {
        Ok(self.docs.get(collection, id).await?.is_some())
    }

    /// Create from a request body. Id and timestamps are assigned here.
    pub async fn create<D: Document>(&self, body: Value) -> Result<D, AppError> {
        let mut fields = into_object(body)?;
        let now = serde_json::to_value(Utc::now())?;
        fields.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
        fields.insert("createdAt".into(), now.clone());
        fields.insert("updatedAt".into(), now);

        let mut doc: D = decode(Value::Object(fields))?;
        self.prepare(&mut doc).await?;
        self.docs
            .insert(Self::record(&doc)?)
            .await
            .map_err(duplicate::<D>)?;
        tracing::info!(collection = D::COLLECTION.as_str(), id = %doc.id(), "document created");
        Ok(doc)
    }

    pub async fn find<D: Document>(&self, id: Uuid) -> Result<Option<D>, AppError> {
        self.docs
            .get(D::COLLECTION, id)
            .await?
            .map(decode_stored::<D>)
            .transpose()
    }

    pub async fn get<D: Document>(&self, id: Uuid) -> Result<D, AppError> {
        self.find(id)
            .await?
            .ok_or_else(|| AppError::NotFound(D::NOT_FOUND.into()))
    }

    /// List using the document's own query-parameter filters.
    pub async fn list<D: Document>(&self, params: &HashMap<String, String>) -> Result<Vec<D>, AppError> {
        let docs: Vec<D> = self.list_where(&D::list_filter(params)).await?;
        Ok(docs.into_iter().filter(|d| d.matches(params)).collect())
    }

    /// List documents whose fields equal every entry of `filter`.
    pub async fn list_where<D: Document>(&self, filter: &Map<String, Value>) -> Result<Vec<D>, AppError> {
        self.docs
            .list(D::COLLECTION, filter)
            .await?
            .into_iter()
            .map(decode_stored::<D>)
            .collect()
    }

    /// Merge the body's top-level fields over the stored document and re-validate.
    pub async fn update<D: Document>(&self, id: Uuid, body: Value) -> Result<D, AppError> {
        let changes = into_object(body)?;
        let stored = self
            .docs
            .get(D::COLLECTION, id)
            .await?
            .ok_or_else(|| AppError::NotFound(D::NOT_FOUND.into()))?;
        let mut fields = into_object(stored)?;
        for (k, v) in changes {
            if !SERVER_FIELDS.contains(&k.as_str()) {
                fields.insert(k, v);
            }
        }
        fields.insert("updatedAt".into(), serde_json::to_value(Utc::now())?);

        let mut doc: D = decode(Value::Object(fields))?;
        self.prepare(&mut doc).await?;
        let replaced = self
            .docs
            .replace(Self::record(&doc)?)
            .await
            .map_err(duplicate::<D>)?;
        if !replaced {
            return Err(AppError::NotFound(D::NOT_FOUND.into()));
        }
        tracing::info!(collection = D::COLLECTION.as_str(), id = %id, "document updated");
        Ok(doc)
    }

    /// JSON view with each reference field replaced by the referenced document
    /// (`null` if it no longer exists).
    pub async fn view<D: Document>(&self, doc: &D) -> Result<Value, AppError> {
        let mut value = serde_json::to_value(doc)?;
        for r in doc.references() {
            let target = self.docs.get(r.collection, r.id).await?.unwrap_or(Value::Null);
            if let Some(obj) = value.as_object_mut() {
                obj.insert(r.field.into(), target);
            }
        }
        Ok(value)
    }

    pub async fn views<D: Document>(&self, docs: &[D]) -> Result<Vec<Value>, AppError> {
        let mut out = Vec::with_capacity(docs.len());
        for doc in docs {
            out.push(self.view(doc).await?);
        }
        Ok(out)
    }

    /// Raw stored payload, for expanding references held outside the directory.
    pub async fn payload(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, AppError> {
        self.docs.get(collection, id).await
    }
}
