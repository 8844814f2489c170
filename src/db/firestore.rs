// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed [`DocumentStore`].
//!
//! Every commit runs in its own Firestore transaction, so a group of writes
//! lands atomically. Documents are read untyped (`serde_json::Value`) and
//! decoded by the caller.

use crate::db::document::set_field;
use crate::db::{CollectionPath, DocPath, Document, DocumentStore, FieldFilter, FilterOp, Write};
use crate::error::AppError;
use async_trait::async_trait;
use firestore::errors::FirestoreError;
use firestore::FirestoreWritePrecondition;
use serde_json::{Map, Value};

/// Metadata keys the Firestore deserializer may inject into document bodies.
const FIRESTORE_META_PREFIX: &str = "_firestore_";

/// Attempts at a read-modify-write transaction before giving up on contention.
const MAX_TRANSACTION_ATTEMPTS: u32 = 3;

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreDb {
    client: Option<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str) -> Result<Self, AppError> {
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Emulator connection with a dummy token (the emulator ignores auth).
    async fn create_emulator_client(project_id: &str) -> Result<Self, AppError> {
        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new("emulator-owner".to_string().into()),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let client = firestore::FirestoreDb::with_options_token_source(
            firestore::FirestoreDbOptions::new(project_id.to_string()),
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(project = project_id, "Connected to Firestore emulator");

        Ok(Self {
            client: Some(client),
        })
    }

    /// Offline client: every operation fails with a database error.
    pub fn new_mock() -> Self {
        Self { client: None }
    }

    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    /// Full parent path of a collection, e.g. `projects/p/databases/(default)/documents/users/u1`.
    fn parent_of(client: &firestore::FirestoreDb, collection: &CollectionPath) -> String {
        let mut parent = client.get_documents_path().clone();
        for (name, id) in collection.parents() {
            parent.push('/');
            parent.push_str(name);
            parent.push('/');
            parent.push_str(id);
        }
        parent
    }

    /// Convert a raw Firestore document into our untyped form.
    fn to_document(
        collection: &CollectionPath,
        raw: &gcloud_sdk::google::firestore::v1::Document,
    ) -> Result<Document, AppError> {
        let id = raw.name.rsplit('/').next().unwrap_or_default();
        let value: Value = firestore::FirestoreDb::deserialize_doc_to(raw).map_err(|e| {
            AppError::Database(format!("Failed to read document {}: {}", raw.name, e))
        })?;
        let mut data = match value {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        data.retain(|key, _| !key.starts_with(FIRESTORE_META_PREFIX));
        Ok(Document {
            path: collection.doc(id),
            data,
        })
    }

    /// Stage one write into an open transaction.
    fn add_write(
        client: &firestore::FirestoreDb,
        transaction: &mut firestore::FirestoreTransaction<'_>,
        write: &Write,
    ) -> Result<(), AppError> {
        let path = write.path();
        let collection = path.collection_path();
        let parent = Self::parent_of(client, collection);
        let err = |e: FirestoreError| {
            AppError::Database(format!("Failed to stage write for {}: {}", path, e))
        };

        match write {
            Write::Set { data, .. } => {
                client
                    .fluent()
                    .update()
                    .in_col(collection.name())
                    .document_id(path.id())
                    .parent(&parent)
                    .object(data)
                    .add_to_transaction(transaction)
                    .map_err(err)?;
            }
            Write::Merge { fields, .. } => {
                client
                    .fluent()
                    .update()
                    .fields(fields.iter().map(|(name, _)| name.as_str()))
                    .in_col(collection.name())
                    .document_id(path.id())
                    .parent(&parent)
                    .object(&nest_fields(fields))
                    .add_to_transaction(transaction)
                    .map_err(err)?;
            }
            Write::Update { fields, .. } => {
                client
                    .fluent()
                    .update()
                    .fields(fields.iter().map(|(name, _)| name.as_str()))
                    .in_col(collection.name())
                    .precondition(FirestoreWritePrecondition::Exists(true))
                    .document_id(path.id())
                    .parent(&parent)
                    .object(&nest_fields(fields))
                    .add_to_transaction(transaction)
                    .map_err(err)?;
            }
            Write::Delete { .. } => {
                client
                    .fluent()
                    .delete()
                    .from(collection.name())
                    .document_id(path.id())
                    .parent(&parent)
                    .add_to_transaction(transaction)
                    .map_err(err)?;
            }
        }
        Ok(())
    }
}

/// Expand `[("a.b", v)]` into `{"a": {"b": v}}` to pair with a field mask.
fn nest_fields(fields: &[(String, Value)]) -> Map<String, Value> {
    let mut nested = Map::new();
    for (name, value) in fields {
        set_field(&mut nested, name, value.clone());
    }
    nested
}

#[async_trait]
impl DocumentStore for FirestoreDb {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, AppError> {
        let client = self.get_client()?;
        let collection = path.collection_path();

        let raw = client
            .fluent()
            .select()
            .by_id_in(collection.name())
            .parent(Self::parent_of(client, collection))
            .one(path.id())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        raw.map(|doc| Self::to_document(collection, &doc))
            .transpose()
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        filters: &[FieldFilter],
    ) -> Result<Vec<Document>, AppError> {
        let client = self.get_client()?;

        let raw = client
            .fluent()
            .select()
            .from(collection.name())
            .parent(Self::parent_of(client, collection))
            .filter(|q| {
                q.for_all(filters.iter().map(|f| {
                    let field = q.field(f.field.as_str());
                    let value = f.value.clone();
                    match f.op {
                        FilterOp::Equal => field.eq(value),
                        FilterOp::LessThan => field.less_than(value),
                        FilterOp::LessThanOrEqual => field.less_than_or_equal(value),
                        FilterOp::GreaterThan => field.greater_than(value),
                        FilterOp::GreaterThanOrEqual => field.greater_than_or_equal(value),
                    }
                }))
            })
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        raw.iter()
            .map(|doc| Self::to_document(collection, doc))
            .collect()
    }

    async fn commit(&self, writes: &[Write]) -> Result<(), AppError> {
        if writes.is_empty() {
            return Ok(());
        }
        let client = self.get_client()?;

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        for write in writes {
            Self::add_write(client, &mut transaction, write)?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Transaction commit failed: {}", e)))?;

        tracing::debug!(operations = writes.len(), "Committed Firestore transaction");
        Ok(())
    }

    async fn increment(&self, path: &DocPath, field: &str, by: i64) -> Result<(), AppError> {
        let client = self.get_client()?;
        let collection = path.collection_path();

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        client
            .fluent()
            .update()
            .in_col(collection.name())
            .document_id(path.id())
            .parent(Self::parent_of(client, collection))
            .transforms(|t| t.fields([t.field(field).increment(by)]))
            .only_transform()
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to stage increment for {}: {}", path, e))
            })?;

        transaction
            .commit()
            .await
            .map_err(|e| AppError::Database(format!("Increment commit failed: {}", e)))?;
        Ok(())
    }

    async fn read_modify_write(
        &self,
        path: &DocPath,
        decide: &(dyn for<'d> Fn(Option<&'d Document>) -> Result<Vec<Write>, AppError> + Send + Sync),
    ) -> Result<Option<Document>, AppError> {
        let client = self.get_client()?;
        let collection = path.collection_path();
        let mut attempt = 1;

        loop {
            let mut transaction = client
                .begin_transaction()
                .await
                .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

            // Reads bound to the transaction register the document for
            // conflict detection at commit.
            let reader = client.clone_with_consistency_selector(
                firestore::FirestoreConsistencySelector::Transaction(
                    transaction.transaction_id().clone(),
                ),
            );
            let read = reader
                .fluent()
                .select()
                .by_id_in(collection.name())
                .parent(Self::parent_of(client, collection))
                .one(path.id())
                .await;
            let current = match read {
                Ok(raw) => raw.map(|doc| Self::to_document(collection, &doc)).transpose(),
                Err(e) => Err(AppError::Database(format!(
                    "Failed to read {} in transaction: {}",
                    path, e
                ))),
            };

            let decided = current.and_then(|doc| decide(doc.as_ref()).map(|writes| (doc, writes)));
            let (current, writes) = match decided {
                Ok(decided) => decided,
                Err(e) => {
                    let _ = transaction.rollback().await;
                    return Err(e);
                }
            };

            if writes.is_empty() {
                let _ = transaction.rollback().await;
                return Ok(current);
            }
            for write in &writes {
                Self::add_write(client, &mut transaction, write)?;
            }

            match transaction.commit().await {
                Ok(_) => return Ok(current),
                Err(FirestoreError::DatabaseError(e))
                    if e.retry_possible && attempt < MAX_TRANSACTION_ATTEMPTS =>
                {
                    tracing::warn!(%path, attempt, error = %e, "Transaction contended, retrying");
                    attempt += 1;
                }
                Err(e) => {
                    return Err(AppError::Database(format!(
                        "Transaction commit failed: {}",
                        e
                    )))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nest_fields_builds_mask_payload() {
        let nested = nest_fields(&[
            ("subscription.tier".to_string(), json!("free")),
            ("subscription.autoRenew".to_string(), json!(false)),
            ("trialExpired".to_string(), json!(true)),
        ]);

        assert_eq!(
            Value::Object(nested),
            json!({
                "subscription": {"tier": "free", "autoRenew": false},
                "trialExpired": true
            })
        );
    }

    #[tokio::test]
    async fn test_offline_client_fails_cleanly() {
        let db = FirestoreDb::new_mock();
        let path = CollectionPath::root("users").doc("u1");

        assert!(matches!(db.get(&path).await, Err(AppError::Database(_))));
        assert!(matches!(
            db.commit(&[Write::delete(path)]).await,
            Err(AppError::Database(_))
        ));
        // Empty commits never touch the client.
        assert!(db.commit(&[]).await.is_ok());
    }
}
