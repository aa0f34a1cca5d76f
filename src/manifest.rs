//! # Manifest Module
//!
//! Declarative route lists loaded into a [`RouteTable`].
//!
//! ```yaml
//! routes:
//!   - method: GET
//!     uri: users/{id}
//!     name: users.show
//!     action: UserController@show
//!     wheres:
//!       id: "[0-9]+"
//!   - method: GET
//!     uri: "{any}"
//!     handler: not_found
//!     fallback: true
//! ```
//!
//! `action` names a controller (`Class@method`, or a bare invokable class);
//! `handler` names a function registered with the dispatcher. Exactly one
//! of the two must be present. JSON and TOML manifests use the same shape.

use anyhow::{anyhow, bail, Context};
use http::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::config::read_document;
use crate::route::{Action, RouteDefinition, Scheme};
use crate::table::{CompiledRoutes, RouteTable};

/// Top-level manifest document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteManifest {
    #[serde(default)]
    pub routes: Vec<RouteEntry>,
}

/// One route in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub method: String,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<Scheme>,
    #[serde(default)]
    pub wheres: BTreeMap<String, String>,
    #[serde(default)]
    pub defaults: BTreeMap<String, Option<String>>,
}

impl RouteEntry {
    /// Build the route definition this entry describes.
    pub fn to_definition(&self) -> anyhow::Result<RouteDefinition> {
        let uri = &self.uri;
        let method: Method = self
            .method
            .to_ascii_uppercase()
            .parse()
            .map_err(|_| anyhow!("invalid HTTP method `{}` for route `{uri}`", self.method))?;

        let action = match (&self.action, &self.handler) {
            (Some(action), None) => Action::controller(action),
            (None, Some(handler)) => Action::handler(handler.as_str()),
            (Some(_), Some(_)) => bail!("route `{}` sets both `action` and `handler`", self.uri),
            (None, None) => bail!("route `{}` needs an `action` or a `handler`", self.uri),
        };

        let mut route = RouteDefinition::new(method, &self.uri, action);
        if let Some(name) = &self.name {
            route = route.with_name(name.as_str());
        }
        if let Some(domain) = &self.domain {
            route = route.with_domain(domain.as_str());
        }
        if let Some(scheme) = self.scheme {
            route = route.with_scheme(scheme);
        }
        if self.fallback {
            route = route.as_fallback();
        }
        for (name, pattern) in &self.wheres {
            route = route.with_where(name.as_str(), pattern.as_str());
        }
        for (name, value) in &self.defaults {
            route = route.with_default(name.as_str(), value.clone());
        }
        Ok(route)
    }
}

impl RouteManifest {
    /// Load a YAML, JSON or TOML manifest.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        read_document(path.as_ref())
    }

    /// Register every entry, in order, in a fresh table.
    pub fn into_table(self) -> anyhow::Result<RouteTable> {
        let mut table = RouteTable::new();
        for (index, entry) in self.routes.iter().enumerate() {
            let route = entry
                .to_definition()
                .with_context(|| format!("route #{index} in manifest"))?;
            let (method, uri) = (&entry.method, &entry.uri);
            table
                .add(route)
                .with_context(|| format!("failed to register route `{method} {uri}`"))?;
        }
        Ok(table)
    }
}

/// Load a manifest straight into a table.
pub fn load_table(path: impl AsRef<Path>) -> anyhow::Result<RouteTable> {
    let path = path.as_ref();
    let table = RouteManifest::load(path)?.into_table()?;
    info!(
        manifest = %path.display(),
        routes_count = table.len(),
        "Route manifest loaded"
    );
    table.log_summary();
    Ok(table)
}

/// Load a table exported with [`RouteTable::export`] (JSON).
pub fn load_compiled(path: impl AsRef<Path>) -> anyhow::Result<RouteTable> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let compiled: CompiledRoutes = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse compiled routes {}", path.display()))?;
    Ok(RouteTable::from_compiled(compiled)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(method: &str, uri: &str) -> RouteEntry {
        RouteEntry {
            method: method.into(),
            uri: uri.into(),
            name: None,
            action: None,
            handler: Some("h".into()),
            domain: None,
            fallback: false,
            scheme: None,
            wheres: BTreeMap::new(),
            defaults: BTreeMap::new(),
        }
    }

    #[test]
    fn test_entry_to_definition() {
        let mut e = entry("get", "users/{id}");
        e.handler = None;
        e.action = Some("UserController@show".into());
        e.name = Some("users.show".into());
        e.wheres.insert("id".into(), "[0-9]+".into());
        e.defaults.insert("tab".into(), None);

        let route = e.to_definition().unwrap();
        assert_eq!(route.method(), &Method::GET);
        assert_eq!(route.name(), Some("users.show"));
        assert_eq!(
            route.action().controller_signature().as_deref(),
            Some("UserController@show")
        );
        assert_eq!(route.wheres().get("id").map(String::as_str), Some("[0-9]+"));
        assert!(route.defaults().contains_key("tab"));
    }

    #[test]
    fn test_action_and_handler_are_exclusive() {
        let mut both = entry("GET", "x");
        both.action = Some("C@m".into());
        assert!(both.to_definition().is_err());

        let mut neither = entry("GET", "x");
        neither.handler = None;
        assert!(neither.to_definition().is_err());
    }

    #[test]
    fn test_invalid_method() {
        assert!(entry("GE T", "x").to_definition().is_err());
    }

    #[test]
    fn test_into_table_reports_bad_pattern() {
        let manifest = RouteManifest {
            routes: vec![entry("GET", "ok"), entry("GET", "{id}/{id}")],
        };
        let err = manifest.into_table().unwrap_err();
        assert!(format!("{err:#}").contains("{id}/{id}"));
    }
}
