//! Secret references embedded in output plugin configs.

use k8s_openapi::api::core::v1::SecretKeySelector;
use serde::{Deserialize, Serialize};

/// A value given inline or loaded from a Kubernetes Secret key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Secret {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<ValueFrom>,
    /// Mounted into the agent instead of being inlined in the config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mount_from: Option<ValueFrom>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueFrom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<SecretKeySelector>,
}

impl Secret {
    pub fn from_value(v: &str) -> Self {
        Self { value: Some(v.to_string()), ..Default::default() }
    }

    pub fn from_secret_key(name: &str, key: &str) -> Self {
        Self { value_from: Some(ValueFrom::secret_key(name, key)), ..Default::default() }
    }

    pub fn mounted_from(name: &str, key: &str) -> Self {
        Self { mount_from: Some(ValueFrom::secret_key(name, key)), ..Default::default() }
    }

    /// The referenced secret key, `valueFrom` taking precedence over `mountFrom`.
    pub fn key_ref(&self) -> Option<&SecretKeySelector> {
        self.value_from
            .as_ref()
            .and_then(|v| v.secret_key_ref.as_ref())
            .or_else(|| self.mount_from.as_ref().and_then(|v| v.secret_key_ref.as_ref()))
    }
}

impl ValueFrom {
    pub fn secret_key(name: &str, key: &str) -> Self {
        Self {
            secret_key_ref: Some(SecretKeySelector {
                name: Some(name.to_string()),
                key: key.to_string(),
                optional: None,
            }),
        }
    }
}
