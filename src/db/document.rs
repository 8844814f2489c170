// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Schema-less document model shared by every store backend.
//!
//! Documents are JSON objects addressed by a collection path and an id.
//! Field paths use dots to reach into nested maps (`subscription.tier`).

use crate::error::AppError;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;

/// Path of a collection, either top level or nested under parent documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath {
    parents: Vec<(String, String)>,
    name: String,
}

impl CollectionPath {
    /// A top-level collection such as `users`.
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            parents: Vec::new(),
            name: name.into(),
        }
    }

    /// Collection name (last path segment).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent documents from outermost to innermost, as `(collection, id)`.
    pub fn parents(&self) -> &[(String, String)] {
        &self.parents
    }

    /// Address a document in this collection.
    pub fn doc(&self, id: impl Into<String>) -> DocPath {
        DocPath {
            collection: self.clone(),
            id: id.into(),
        }
    }

    /// Address a new document with a generated id.
    pub fn new_doc(&self) -> DocPath {
        self.doc(uuid::Uuid::new_v4().simple().to_string())
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (collection, id) in &self.parents {
            write!(f, "{collection}/{id}/")?;
        }
        f.write_str(&self.name)
    }
}

/// Full path of a single document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath {
    collection: CollectionPath,
    id: String,
}

impl DocPath {
    pub fn collection_path(&self) -> &CollectionPath {
        &self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// A subcollection under this document, e.g. `users/{id}/meals`.
    pub fn subcollection(&self, name: impl Into<String>) -> CollectionPath {
        let mut parents = self.collection.parents.clone();
        parents.push((self.collection.name.clone(), self.id.clone()));
        CollectionPath {
            parents,
            name: name.into(),
        }
    }

    /// Id of the outermost parent document, or this document's own id for
    /// top-level documents. Every document is owned by a user account, so
    /// for `users/{id}/...` and `usage_limits/{id}` this is the account id.
    pub fn root_id(&self) -> &str {
        self.collection
            .parents
            .first()
            .map(|(_, id)| id.as_str())
            .unwrap_or(&self.id)
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// A document read from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: DocPath,
    pub data: Map<String, Value>,
}

impl Document {
    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// Look up a (possibly dotted) field.
    pub fn field(&self, field: &str) -> Option<&Value> {
        get_field(&self.data, field)
    }

    /// Decode the document into a typed model.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_value(Value::Object(self.data.clone())).map_err(|e| {
            AppError::Database(format!("Failed to decode document {}: {}", self.path, e))
        })
    }
}

/// Comparison operator of a field filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Equal,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

/// A single `field <op> value` predicate. Filters in a query are ANDed.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl FieldFilter {
    fn new(field: &str, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Equal, value)
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::LessThan, value)
    }

    pub fn lte(field: &str, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::LessThanOrEqual, value)
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::GreaterThan, value)
    }

    pub fn gte(field: &str, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::GreaterThanOrEqual, value)
    }

    /// Evaluate against a document body.
    ///
    /// Missing fields and values of different types never match, the same
    /// way Firestore drops them from range queries.
    pub fn matches(&self, data: &Map<String, Value>) -> bool {
        let Some(actual) = get_field(data, &self.field) else {
            return false;
        };
        let Some(ordering) = compare_values(actual, &self.value) else {
            return false;
        };
        match self.op {
            FilterOp::Equal => ordering == Ordering::Equal,
            FilterOp::LessThan => ordering == Ordering::Less,
            FilterOp::LessThanOrEqual => ordering != Ordering::Greater,
            FilterOp::GreaterThan => ordering == Ordering::Greater,
            FilterOp::GreaterThanOrEqual => ordering != Ordering::Less,
        }
    }
}

/// Order two scalar values of the same type.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// A staged mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Replace the whole document, creating it if needed.
    Set {
        path: DocPath,
        data: Map<String, Value>,
    },
    /// Set the listed fields, creating the document if needed.
    Merge {
        path: DocPath,
        fields: Vec<(String, Value)>,
    },
    /// Set the listed fields of an existing document. Fails the whole
    /// commit if the document does not exist.
    Update {
        path: DocPath,
        fields: Vec<(String, Value)>,
    },
    Delete {
        path: DocPath,
    },
}

impl Write {
    /// Build a full-document `Set` from any serializable model.
    pub fn set<T: Serialize>(path: DocPath, value: &T) -> Result<Self, AppError> {
        match serde_json::to_value(value) {
            Ok(Value::Object(data)) => Ok(Write::Set { path, data }),
            Ok(_) => Err(AppError::InvalidArgument(format!(
                "Document {path} must serialize to an object"
            ))),
            Err(e) => Err(AppError::Internal(anyhow::anyhow!(
                "Failed to serialize document {}: {}",
                path,
                e
            ))),
        }
    }

    pub fn merge<'a>(path: DocPath, fields: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        Write::Merge {
            path,
            fields: owned_fields(fields),
        }
    }

    pub fn update<'a>(path: DocPath, fields: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        Write::Update {
            path,
            fields: owned_fields(fields),
        }
    }

    pub fn delete(path: DocPath) -> Self {
        Write::Delete { path }
    }

    pub fn path(&self) -> &DocPath {
        match self {
            Write::Set { path, .. }
            | Write::Merge { path, .. }
            | Write::Update { path, .. }
            | Write::Delete { path } => path,
        }
    }
}

fn owned_fields<'a>(fields: impl IntoIterator<Item = (&'a str, Value)>) -> Vec<(String, Value)> {
    fields
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Read a dotted field path out of a document body.
pub fn get_field<'a>(data: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    let mut segments = field.split('.');
    let mut current = data.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Write a dotted field path into a document body, creating (or replacing
/// non-map values with) intermediate maps as needed.
pub fn set_field(data: &mut Map<String, Value>, field: &str, value: Value) {
    match field.split_once('.') {
        None => {
            data.insert(field.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = data
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(child) = entry {
                set_field(child, rest, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_paths_display_and_ownership() {
        let user = CollectionPath::root("users").doc("u1");
        let meal = user.subcollection("meals").doc("m1");

        assert_eq!(user.to_string(), "users/u1");
        assert_eq!(meal.to_string(), "users/u1/meals/m1");
        assert_eq!(meal.root_id(), "u1");
        assert_eq!(user.root_id(), "u1");
    }

    #[test]
    fn test_new_doc_ids_are_unique() {
        let col = CollectionPath::root("notifications");
        assert_ne!(col.new_doc().id(), col.new_doc().id());
    }

    #[test]
    fn test_dotted_field_access() {
        let mut data = body(json!({"subscription": {"tier": "premium"}}));

        assert_eq!(get_field(&data, "subscription.tier"), Some(&json!("premium")));
        assert_eq!(get_field(&data, "subscription.endDate"), None);

        set_field(&mut data, "subscription.autoRenew", json!(false));
        set_field(&mut data, "features.maxMealPlans", json!(1));

        assert_eq!(data["subscription"]["tier"], json!("premium"));
        assert_eq!(data["subscription"]["autoRenew"], json!(false));
        assert_eq!(data["features"]["maxMealPlans"], json!(1));
    }

    #[test]
    fn test_filters_compare_like_the_store() {
        let data = body(json!({
            "count": 3,
            "timestamp": "2024-01-10T00:00:00Z",
            "subscription": {"tier": "free"}
        }));

        assert!(FieldFilter::eq("subscription.tier", "free").matches(&data));
        assert!(FieldFilter::lt("count", 4).matches(&data));
        assert!(FieldFilter::lte("count", 3).matches(&data));
        assert!(!FieldFilter::gt("count", 3).matches(&data));
        assert!(FieldFilter::gte("count", 3.0).matches(&data));
        assert!(FieldFilter::lt("timestamp", "2024-02-01T00:00:00Z").matches(&data));

        // Missing fields and mismatched types never match.
        assert!(!FieldFilter::eq("missing", 1).matches(&data));
        assert!(!FieldFilter::lt("count", "10").matches(&data));
    }

    #[test]
    fn test_set_rejects_non_objects() {
        let path = CollectionPath::root("users").doc("u1");
        assert!(Write::set(path.clone(), &json!({"a": 1})).is_ok());
        assert!(matches!(
            Write::set(path, &json!([1, 2])),
            Err(AppError::InvalidArgument(_))
        ));
    }
}
