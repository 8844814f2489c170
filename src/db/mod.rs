//! Database layer: document store abstraction and its backends.

pub mod batch;
pub mod document;
pub mod firestore;
pub mod memory;
pub mod scanner;

pub use batch::{BatchAccumulator, CommitSummary};
pub use document::{CollectionPath, DocPath, Document, FieldFilter, FilterOp, Write};
pub use firestore::FirestoreDb;
pub use memory::MemoryStore;
pub use scanner::CollectionScanner;

use crate::error::AppError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Usage limit records (keyed by account id)
    pub const USAGE_LIMITS: &str = "usage_limits";
    /// Legacy top-level upload rules, folded into `usage_limits` by migration
    pub const LEGACY_UPLOAD_RULES: &str = "upload_rules";
    /// Legacy top-level notifications, moved under each user by migration
    pub const LEGACY_NOTIFICATIONS: &str = "notifications";

    // Subcollections of `users/{id}`
    pub const MEALS: &str = "meals";
    pub const CALENDAR: &str = "calendar";
    pub const RECOMMENDATIONS: &str = "recommendations";
    pub const NOTIFICATIONS: &str = "notifications";
}

/// Generic CRUD plus atomic batch commit over a hosted document database.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document.
    async fn get(&self, path: &DocPath) -> Result<Option<Document>, AppError>;

    /// Fetch every document in a collection matching all filters.
    async fn query(
        &self,
        collection: &CollectionPath,
        filters: &[FieldFilter],
    ) -> Result<Vec<Document>, AppError>;

    /// Apply all writes atomically: either every write lands or none do.
    async fn commit(&self, writes: &[Write]) -> Result<(), AppError>;

    /// Atomically add `by` to a numeric field, creating it at `by` if absent.
    async fn increment(&self, path: &DocPath, field: &str, by: i64) -> Result<(), AppError>;

    /// Read one document and commit the writes `decide` derives from it in
    /// a single transaction, so no other writer can change the document in
    /// between. An error from `decide` aborts with nothing written. Returns
    /// the document as `decide` saw it.
    async fn read_modify_write(
        &self,
        path: &DocPath,
        decide: &(dyn for<'d> Fn(Option<&'d Document>) -> Result<Vec<Write>, AppError> + Send + Sync),
    ) -> Result<Option<Document>, AppError>;
}

/// Fetch one document and decode it.
pub async fn get_as<T: DeserializeOwned>(
    store: &dyn DocumentStore,
    path: &DocPath,
) -> Result<Option<T>, AppError> {
    store.get(path).await?.map(|doc| doc.decode()).transpose()
}

/// `users/{account_id}`
pub fn user_doc(account_id: &str) -> DocPath {
    CollectionPath::root(collections::USERS).doc(account_id)
}

/// `usage_limits/{account_id}`
pub fn usage_limit_doc(account_id: &str) -> DocPath {
    CollectionPath::root(collections::USAGE_LIMITS).doc(account_id)
}
