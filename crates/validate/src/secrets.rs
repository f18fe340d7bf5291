//! Secret resolution adapter.
//!
//! The backends that actually fetch secret material live outside this crate;
//! validation only needs to know whether a reference resolves. [`SnapshotSecrets`]
//! answers that from Secrets listed ahead of the pass.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Secret as KubeSecret;
use logop_core::secret::Secret;
use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SecretError {
    #[error("secret reference has neither value nor valueFrom/mountFrom set")]
    Unset,
    #[error("secret key reference without secret name (key {key})")]
    MissingName { key: String },
    #[error("failed to get kubernetes secret {namespace}:{name}")]
    NotFound { namespace: String, name: String },
    #[error("key {key} not found in secret {namespace}:{name}")]
    MissingKey { namespace: String, name: String, key: String },
    #[error("{0}")]
    Backend(String),
}

/// Loads secret values on behalf of one namespace.
pub trait SecretResolver: Send + Sync {
    fn load(&self, namespace: &str, secret: &Secret) -> Result<String, SecretError>;
}

/// A resolver bound to the namespace of the object owning the references.
#[derive(Clone, Copy)]
pub struct NamespacedSecrets<'a> {
    resolver: &'a dyn SecretResolver,
    namespace: &'a str,
}

impl<'a> NamespacedSecrets<'a> {
    pub fn new(resolver: &'a dyn SecretResolver, namespace: &'a str) -> Self {
        Self { resolver, namespace }
    }

    pub fn namespace(&self) -> &str {
        self.namespace
    }

    pub fn load(&self, secret: &Secret) -> Result<String, SecretError> {
        self.resolver.load(self.namespace, secret)
    }
}

/// Resolves references against Secrets fetched before the pass.
#[derive(Debug, Default, Clone)]
pub struct SnapshotSecrets {
    by_name: FxHashMap<(String, String), BTreeMap<String, String>>,
}

impl SnapshotSecrets {
    pub fn new(secrets: impl IntoIterator<Item = KubeSecret>) -> Self {
        let mut by_name = FxHashMap::default();
        for s in secrets {
            let ns = s.metadata.namespace.clone().unwrap_or_default();
            let Some(name) = s.metadata.name.clone() else { continue };
            let mut values = BTreeMap::new();
            for (k, v) in s.data.unwrap_or_default() {
                values.insert(k, String::from_utf8_lossy(&v.0).into_owned());
            }
            // stringData wins over data, as on the API server
            for (k, v) in s.string_data.unwrap_or_default() {
                values.insert(k, v);
            }
            by_name.insert((ns, name), values);
        }
        Self { by_name }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl SecretResolver for SnapshotSecrets {
    fn load(&self, namespace: &str, secret: &Secret) -> Result<String, SecretError> {
        // an empty inline value counts as unset
        if let Some(v) = secret.value.as_deref().filter(|v| !v.is_empty()) {
            return Ok(v.to_string());
        }
        let sel = secret.key_ref().ok_or(SecretError::Unset)?;
        let name = sel
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| SecretError::MissingName { key: sel.key.clone() })?;
        let values = self.by_name.get(&(namespace.to_string(), name.to_string())).ok_or_else(|| {
            SecretError::NotFound { namespace: namespace.to_string(), name: name.to_string() }
        })?;
        values.get(&sel.key).cloned().ok_or_else(|| SecretError::MissingKey {
            namespace: namespace.to_string(),
            name: name.to_string(),
            key: sel.key.clone(),
        })
    }
}
