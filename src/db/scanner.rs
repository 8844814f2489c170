// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Collection scanner: one-shot enumeration of a (filtered) collection.

use crate::db::{CollectionPath, Document, DocumentStore, FieldFilter};
use crate::error::AppError;
use serde::de::DeserializeOwned;

/// Reads the full matching set of a collection in one fetch.
///
/// No pagination: callers get every match at once, which is fine while the
/// user collection stays small.
#[derive(Clone, Copy)]
pub struct CollectionScanner<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> CollectionScanner<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// All documents in `collection` matching every filter.
    pub async fn scan(
        &self,
        collection: &CollectionPath,
        filters: &[FieldFilter],
    ) -> Result<Vec<Document>, AppError> {
        let docs = self.store.query(collection, filters).await?;
        tracing::debug!(
            collection = %collection,
            filters = filters.len(),
            matched = docs.len(),
            "Scanned collection"
        );
        Ok(docs)
    }

    /// Like [`scan`](Self::scan) but decodes each document.
    ///
    /// Documents that don't decode are logged and skipped rather than failing
    /// the whole scan.
    pub async fn scan_as<T: DeserializeOwned>(
        &self,
        collection: &CollectionPath,
        filters: &[FieldFilter],
    ) -> Result<Vec<(Document, T)>, AppError> {
        let docs = self.scan(collection, filters).await?;
        let mut decoded = Vec::with_capacity(docs.len());
        for doc in docs {
            match doc.decode::<T>() {
                Ok(value) => decoded.push((doc, value)),
                Err(e) => {
                    tracing::warn!(path = %doc.path, error = %e, "Skipping undecodable document");
                }
            }
        }
        Ok(decoded)
    }
}
