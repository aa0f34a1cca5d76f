//! # Configuration Module
//!
//! URL generation settings, read from a config file and/or the environment.
//!
//! ## File
//!
//! YAML, JSON or TOML, picked by extension:
//!
//! ```yaml
//! app_url: https://example.com
//! asset_root: https://cdn.example.com
//! force_scheme: https
//! root_namespace: App
//! keys:
//!   - base64:c2VjcmV0
//!   - previous-key
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |---|---|
//! | `SIGNPOST_APP_URL` | `app_url` |
//! | `SIGNPOST_ASSET_URL` | `asset_root` |
//! | `SIGNPOST_APP_KEY` | first entry of `keys` |
//! | `SIGNPOST_PREVIOUS_KEYS` | remaining `keys`, comma-separated |
//! | `SIGNPOST_FORCE_SCHEME` | `force_scheme` |
//! | `SIGNPOST_ROOT_NAMESPACE` | `root_namespace` |
//!
//! [`UrlConfig::with_env_overrides`] lays these over a loaded file.

use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Root used when nothing is configured.
pub const DEFAULT_APP_URL: &str = "http://localhost";

/// Settings for [`crate::url::UrlGenerator::from_config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlConfig {
    #[serde(default = "default_app_url")]
    pub app_url: String,
    #[serde(default)]
    pub asset_root: Option<String>,
    #[serde(default)]
    pub force_scheme: Option<String>,
    /// Signing keys; the first signs, all verify.
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default)]
    pub root_namespace: Option<String>,
}

fn default_app_url() -> String {
    DEFAULT_APP_URL.to_string()
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            app_url: default_app_url(),
            asset_root: None,
            force_scheme: None,
            keys: Vec::new(),
            root_namespace: None,
        }
    }
}

impl UrlConfig {
    /// Load from a YAML, JSON or TOML file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        read_document(path.as_ref())
    }

    /// Build from `SIGNPOST_*` environment variables alone.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Overlay `SIGNPOST_*` environment variables.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Overlay values from `lookup`, keyed by environment variable name.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = lookup("SIGNPOST_APP_URL") {
            self.app_url = url;
        }
        if let Some(root) = lookup("SIGNPOST_ASSET_URL") {
            self.asset_root = Some(root);
        }
        if let Some(scheme) = lookup("SIGNPOST_FORCE_SCHEME") {
            self.force_scheme = Some(scheme);
        }
        if let Some(namespace) = lookup("SIGNPOST_ROOT_NAMESPACE") {
            self.root_namespace = Some(namespace);
        }

        let app_key = lookup("SIGNPOST_APP_KEY");
        let previous = lookup("SIGNPOST_PREVIOUS_KEYS");
        if app_key.is_some() || previous.is_some() {
            let mut keys: Vec<String> = app_key.into_iter().collect();
            keys.extend(
                previous
                    .iter()
                    .flat_map(|list| list.split(','))
                    .map(str::trim)
                    .filter(|k| !k.is_empty())
                    .map(str::to_string),
            );
            self.keys = keys;
        }
        self
    }
}

/// Deserialize a YAML, JSON or TOML file chosen by extension.
pub(crate) fn read_document<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let parsed = match extension.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(anyhow::Error::from),
        "json" => serde_json::from_str(&content).map_err(anyhow::Error::from),
        "toml" => toml::from_str(&content).map_err(anyhow::Error::from),
        other => bail!(
            "unsupported file extension `{other}` for {}",
            path.display()
        ),
    };
    parsed.with_context(|| format!("failed to parse {}", path.display()))
}
