// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Mirrors the Firestore semantics the jobs depend on (atomic multi-write
//! commits, `Update` requiring an existing document, dotted field paths) so
//! the reconciliation jobs can run locally and under test without an
//! emulator. Commit failures can be injected to exercise partial-batch
//! behavior.

use crate::db::document::{get_field, set_field};
use crate::db::{CollectionPath, DocPath, Document, DocumentStore, FieldFilter, Write};
use crate::error::AppError;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Mutex;

type Collections = BTreeMap<CollectionPath, BTreeMap<String, Map<String, Value>>>;

/// Commit failures to inject.
#[derive(Default)]
struct FailurePlan {
    /// Fail the commit with this 1-based sequence number.
    at_commit: Option<usize>,
    /// Fail any commit writing a document whose path starts with a prefix.
    path_prefixes: Vec<String>,
}

/// Thread-safe in-memory document store.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
    commits: Mutex<usize>,
    failures: Mutex<FailurePlan>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document directly, bypassing commit accounting.
    ///
    /// Meant for setting up fixtures in tests and local runs.
    ///
    /// # Panics
    ///
    /// Panics if `value` does not serialize to a JSON object.
    pub fn seed<T: Serialize>(&self, path: &DocPath, value: &T) {
        let data = match serde_json::to_value(value) {
            Ok(Value::Object(data)) => data,
            other => panic!("seed value for {path} must be an object, got {other:?}"),
        };
        self.lock_collections()
            .entry(path.collection_path().clone())
            .or_default()
            .insert(path.id().to_string(), data);
    }

    /// Current body of a document, if present.
    pub fn document(&self, path: &DocPath) -> Option<Map<String, Value>> {
        self.lock_collections()
            .get(path.collection_path())
            .and_then(|docs| docs.get(path.id()))
            .cloned()
    }

    /// Every document currently in a collection, ordered by id.
    pub fn documents(&self, collection: &CollectionPath) -> Vec<Document> {
        self.lock_collections()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document {
                        path: collection.doc(id.clone()),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every document in the store keyed by full path.
    pub fn snapshot(&self) -> BTreeMap<String, Map<String, Value>> {
        self.lock_collections()
            .iter()
            .flat_map(|(collection, docs)| {
                docs.iter()
                    .map(|(id, data)| (collection.doc(id.clone()).to_string(), data.clone()))
            })
            .collect()
    }

    /// Number of commits attempted so far (including failed ones).
    pub fn commit_count(&self) -> usize {
        *self.commits.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fail the `n`-th commit from now (1-based).
    pub fn fail_nth_commit_from_now(&self, n: usize) {
        let at = self.commit_count() + n;
        self.lock_failures().at_commit = Some(at);
    }

    /// Fail every commit that writes under `prefix` (e.g. `users/u1/`).
    pub fn fail_commits_touching(&self, prefix: &str) {
        self.lock_failures().path_prefixes.push(prefix.to_string());
    }

    fn next_commit(&self) -> usize {
        let mut commits = self.commits.lock().unwrap_or_else(|e| e.into_inner());
        *commits += 1;
        *commits
    }

    fn lock_collections(&self) -> std::sync::MutexGuard<'_, Collections> {
        self.collections.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_failures(&self) -> std::sync::MutexGuard<'_, FailurePlan> {
        self.failures.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_injected_failure(&self, sequence: usize, writes: &[Write]) -> Result<(), AppError> {
        let failures = self.lock_failures();
        if failures.at_commit == Some(sequence) {
            return Err(AppError::Database(format!(
                "Injected failure on commit {sequence}"
            )));
        }
        for write in writes {
            let path = write.path().to_string();
            if failures.path_prefixes.iter().any(|p| path.starts_with(p)) {
                return Err(AppError::Database(format!(
                    "Injected failure writing {path}"
                )));
            }
        }
        Ok(())
    }
}

/// Apply one write to a staging copy of the store.
fn apply_write(collections: &mut Collections, write: &Write) -> Result<(), AppError> {
    let path = write.path();
    let docs = collections
        .entry(path.collection_path().clone())
        .or_default();

    match write {
        Write::Set { data, .. } => {
            docs.insert(path.id().to_string(), data.clone());
        }
        Write::Merge { fields, .. } => {
            let doc = docs.entry(path.id().to_string()).or_default();
            for (field, value) in fields {
                set_field(doc, field, value.clone());
            }
        }
        Write::Update { fields, .. } => {
            let doc = docs
                .get_mut(path.id())
                .ok_or_else(|| AppError::NotFound(format!("No document to update: {path}")))?;
            for (field, value) in fields {
                set_field(doc, field, value.clone());
            }
        }
        Write::Delete { .. } => {
            docs.remove(path.id());
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, AppError> {
        Ok(self.document(path).map(|data| Document {
            path: path.clone(),
            data,
        }))
    }

    async fn query(
        &self,
        collection: &CollectionPath,
        filters: &[FieldFilter],
    ) -> Result<Vec<Document>, AppError> {
        Ok(self
            .documents(collection)
            .into_iter()
            .filter(|doc| filters.iter().all(|f| f.matches(&doc.data)))
            .collect())
    }

    async fn commit(&self, writes: &[Write]) -> Result<(), AppError> {
        let sequence = self.next_commit();
        self.check_injected_failure(sequence, writes)?;

        let mut collections = self.lock_collections();
        let mut staged = collections.clone();
        for write in writes {
            apply_write(&mut staged, write)?;
        }
        *collections = staged;
        Ok(())
    }

    async fn increment(&self, path: &DocPath, field: &str, by: i64) -> Result<(), AppError> {
        let mut collections = self.lock_collections();
        let doc = collections
            .entry(path.collection_path().clone())
            .or_default()
            .entry(path.id().to_string())
            .or_default();

        let current = match get_field(doc, field) {
            None | Some(Value::Null) => 0,
            Some(value) => value.as_i64().ok_or_else(|| {
                AppError::InvalidArgument(format!("Field {field} of {path} is not an integer"))
            })?,
        };
        set_field(doc, field, Value::from(current + by));
        Ok(())
    }

    async fn read_modify_write(
        &self,
        path: &DocPath,
        decide: &(dyn for<'d> Fn(Option<&'d Document>) -> Result<Vec<Write>, AppError> + Send + Sync),
    ) -> Result<Option<Document>, AppError> {
        // The collections lock is held from the read through the swap.
        let mut collections = self.lock_collections();
        let current = collections
            .get(path.collection_path())
            .and_then(|docs| docs.get(path.id()))
            .map(|data| Document {
                path: path.clone(),
                data: data.clone(),
            });

        let writes = decide(current.as_ref())?;
        if writes.is_empty() {
            return Ok(current);
        }

        let sequence = self.next_commit();
        self.check_injected_failure(sequence, &writes)?;
        let mut staged = collections.clone();
        for write in &writes {
            apply_write(&mut staged, write)?;
        }
        *collections = staged;
        Ok(current)
    }
}
