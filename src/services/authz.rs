// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Role-based authorization.
//!
//! Admin status is the `role` field on the account document. Every admin
//! check in the crate (callable gating, job exemptions, onboarding) goes
//! through [`Authorizer`].

use crate::db::{collections, get_as, user_doc, CollectionPath, CollectionScanner, DocumentStore, FieldFilter};
use crate::error::{AppError, Result};
use crate::models::UserAccount;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct Authorizer {
    store: Arc<dyn DocumentStore>,
}

impl Authorizer {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Load the caller's account and require the admin role.
    pub async fn require_admin(&self, account_id: &str) -> Result<UserAccount> {
        let account: Option<UserAccount> = get_as(self.store.as_ref(), &user_doc(account_id)).await?;
        match account {
            Some(account) if account.is_admin() => Ok(account),
            _ => {
                tracing::warn!(account_id, "Rejected admin operation");
                Err(AppError::PermissionDenied(
                    "Only admin can perform this operation".to_string(),
                ))
            }
        }
    }

    /// Ids of every admin account. Maintenance jobs never touch these.
    pub async fn exempt_accounts(&self) -> Result<HashSet<String>> {
        let admins = CollectionScanner::new(self.store.as_ref())
            .scan(
                &CollectionPath::root(collections::USERS),
                &[FieldFilter::eq("role", "admin")],
            )
            .await?;
        Ok(admins.into_iter().map(|doc| doc.id().to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use serde_json::json;

    fn store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.seed(&user_doc("boss"), &json!({"role": "admin", "email": "boss@example.com"}));
        store.seed(&user_doc("u1"), &json!({"role": "user"}));
        store.seed(&user_doc("u2"), &json!({}));
        store
    }

    #[tokio::test]
    async fn test_require_admin() {
        let authz = Authorizer::new(store());

        assert!(authz.require_admin("boss").await.is_ok());
        assert!(matches!(
            authz.require_admin("u1").await,
            Err(AppError::PermissionDenied(_))
        ));
        assert!(matches!(
            authz.require_admin("nobody").await,
            Err(AppError::PermissionDenied(_))
        ));
    }

    #[tokio::test]
    async fn test_exempt_accounts_are_admins() {
        let authz = Authorizer::new(store());
        let exempt = authz.exempt_accounts().await.unwrap();

        assert_eq!(exempt, HashSet::from(["boss".to_string()]));
    }
}
