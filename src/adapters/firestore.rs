use crate::config::FirestoreConfig;
use crate::domain::device::{DEVICES_FIELD, USER_ID_FIELD, UserDevices};
use crate::services::documents::{DocumentPath, DocumentStore, FieldPath, StoreError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{Value, json};
use std::sync::Arc;

const DEFAULT_ENDPOINT: &str = "https://firestore.googleapis.com";

/// Supplies the OAuth bearer token that authorizes Firestore requests,
/// typically the signed-in user's ID token so security rules see the
/// request as that user.
#[async_trait]
pub trait BearerTokenSource: Send + Sync + std::fmt::Debug {
    /// Returns a token valid for the next request.
    ///
    /// # Errors
    /// Returns `StoreError` if no credential is available.
    async fn bearer_token(&self) -> Result<String, StoreError>;
}

/// [`DocumentStore`] backed by the Firestore REST API.
///
/// Merges are expressed as `PATCH` with an `updateMask` naming exactly the
/// fields being written, so sibling device entries survive. Field deletes
/// are a masked `PATCH` with the field omitted from the body.
#[derive(Debug)]
pub struct FirestoreDocumentStore {
    client: reqwest::Client,
    config: FirestoreConfig,
    auth: Arc<dyn BearerTokenSource>,
}

impl FirestoreDocumentStore {
    #[must_use]
    pub fn new(config: FirestoreConfig, auth: Arc<dyn BearerTokenSource>) -> Self {
        Self { client: reqwest::Client::new(), config, auth }
    }

    fn document_url(&self, path: &DocumentPath) -> String {
        let base = self.config.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT).trim_end_matches('/');
        format!(
            "{base}/v1/projects/{}/databases/{}/documents/{}/{}",
            self.config.project_id, self.config.database_id, path.collection, path.doc_id
        )
    }
}

async fn check(response: reqwest::Response) -> Result<(), StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::NOT_FOUND {
        return Err(StoreError::NotFound);
    }
    let message = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(StoreError::Unauthorized(message));
    }
    Err(StoreError::Rejected { status: status.as_u16(), message })
}

/// Quotes one field-path segment for an `updateMask`. Simple identifiers
/// pass through; anything else gets backtick quoting, which device ids
/// usually need.
fn mask_segment(segment: &str) -> String {
    let simple = segment.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        segment.to_string()
    } else {
        format!("`{}`", segment.replace('\\', "\\\\").replace('`', "\\`"))
    }
}

fn mask_path(field: &FieldPath) -> String {
    field.segments().iter().map(|s| mask_segment(s)).collect::<Vec<_>>().join(".")
}

/// Re-encodes plain JSON into Firestore's typed value representation.
fn to_field_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if n.is_f64() {
                json!({ "doubleValue": n })
            } else {
                // Firestore carries integers as strings.
                json!({ "integerValue": n.to_string() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(to_field_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => {
            let fields: serde_json::Map<String, Value> =
                map.iter().map(|(k, v)| (k.clone(), to_field_value(v))).collect();
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

fn document_body(doc: &UserDevices) -> Result<Value, StoreError> {
    let plain = serde_json::to_value(doc).map_err(anyhow::Error::from)?;
    let Value::Object(map) = plain else {
        return Err(StoreError::Other(anyhow::anyhow!("document did not encode as a map")));
    };
    let fields: serde_json::Map<String, Value> = map.iter().map(|(k, v)| (k.clone(), to_field_value(v))).collect();
    Ok(json!({ "fields": fields }))
}

#[async_trait]
impl DocumentStore for FirestoreDocumentStore {
    #[tracing::instrument(skip(self, doc), fields(path = %path))]
    async fn merge_write(&self, path: &DocumentPath, doc: &UserDevices) -> Result<(), StoreError> {
        let token = self.auth.bearer_token().await?;
        let mut query: Vec<(&str, String)> = vec![("updateMask.fieldPaths", USER_ID_FIELD.to_string())];
        for device_id in doc.devices.keys() {
            query.push(("updateMask.fieldPaths", format!("{DEVICES_FIELD}.{}", mask_segment(device_id))));
        }
        let body = document_body(doc)?;

        let response = self
            .client
            .patch(self.document_url(path))
            .query(&query)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(anyhow::Error::from)?;
        check(response).await
    }

    #[tracing::instrument(skip(self), fields(path = %path, field = %field))]
    async fn delete_field(&self, path: &DocumentPath, field: &FieldPath) -> Result<(), StoreError> {
        let token = self.auth.bearer_token().await?;
        let query =
            [("updateMask.fieldPaths", mask_path(field)), ("currentDocument.exists", "true".to_string())];

        let response = self
            .client
            .patch(self.document_url(path))
            .query(&query)
            .bearer_auth(token)
            .json(&json!({}))
            .send()
            .await
            .map_err(anyhow::Error::from)?;
        match check(response).await {
            Err(StoreError::NotFound) => {
                // Nothing registered for this user; nothing to delete.
                tracing::debug!("Skipped delete, document does not exist");
                Ok(())
            }
            other => other,
        }
    }
}
