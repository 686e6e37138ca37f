//! # Auth-Method Resolver
//!
//! Maps auth backend names (mount paths such as `userpass` or `userpass/`) to
//! the mount accessors aliases must be created with.

use crate::identity::{AuthMount, IdentityStore};
use anyhow::Result;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Backend name → mount accessor, fetched once per run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthMethods {
    accessors: HashMap<String, String>,
}

impl AuthMethods {
    /// Fetch enabled auth methods from the store
    ///
    /// # Errors
    /// Returns the store error; callers treat it as fatal
    pub async fn resolve(store: &dyn IdentityStore) -> Result<Self> {
        let mounts = store.list_enabled_auth_methods().await?;
        let methods = Self::from_mounts(mounts);
        if methods.is_empty() {
            warn!("Vault reports no enabled auth methods, every alias bound by auth backend will fail");
        } else {
            info!("Resolved {} enabled auth methods", methods.len());
        }
        Ok(methods)
    }

    /// Index mounts by path, without the trailing `/`
    #[must_use]
    pub fn from_mounts(mounts: impl IntoIterator<Item = AuthMount>) -> Self {
        let accessors = mounts
            .into_iter()
            .map(|mount| {
                let name = normalize(&mount.path).to_string();
                debug!(
                    "Auth method {} ({}) has accessor {}",
                    name, mount.method_type, mount.accessor
                );
                (name, mount.accessor)
            })
            .collect();
        Self { accessors }
    }

    /// Accessor of the backend mounted at `backend`
    #[must_use]
    pub fn accessor_for(&self, backend: &str) -> Option<&str> {
        self.accessors.get(normalize(backend)).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.accessors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accessors.is_empty()
    }
}

fn normalize(path: &str) -> &str {
    path.trim().trim_matches('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount(path: &str, method_type: &str, accessor: &str) -> AuthMount {
        AuthMount {
            path: path.to_string(),
            method_type: method_type.to_string(),
            accessor: accessor.to_string(),
        }
    }

    #[test]
    fn test_lookup_with_and_without_trailing_slash() {
        let methods = AuthMethods::from_mounts(vec![
            mount("userpass/", "userpass", "auth_userpass_1"),
            mount("ci/approle/", "approle", "auth_approle_2"),
        ]);

        assert_eq!(methods.accessor_for("userpass"), Some("auth_userpass_1"));
        assert_eq!(methods.accessor_for("userpass/"), Some("auth_userpass_1"));
        assert_eq!(methods.accessor_for("ci/approle"), Some("auth_approle_2"));
        assert_eq!(methods.accessor_for("approle"), None);
        assert_eq!(methods.len(), 2);
        assert!(!methods.is_empty());
    }

    #[test]
    fn test_no_mounts_resolves_nothing() {
        let methods = AuthMethods::from_mounts(Vec::new());

        assert!(methods.is_empty());
        assert_eq!(methods.accessor_for("userpass"), None);
    }
}
