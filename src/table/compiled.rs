use http::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};

use super::core::RouteTable;
use crate::error::{Result, RouteError};
use crate::route::{Action, CompiledRoute, RouteDefinition, Scheme};

/// Prefix for names assigned to unnamed routes on export.
pub const GENERATED_NAME_PREFIX: &str = "generated::";

/// Serializable snapshot of a [`RouteTable`] that can be loaded without
/// running the pattern compiler again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledRoutes {
    /// Compiled patterns per route, in matching order.
    pub compiled_regex_data: Vec<CompiledEntry>,
    pub attributes_by_name: BTreeMap<String, RouteAttributes>,
}

/// Compiled path and host patterns for one exported route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledEntry {
    pub name: String,
    #[serde(flatten)]
    pub compiled: CompiledRoute,
}

/// Everything needed to rebuild a [`RouteDefinition`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteAttributes {
    pub methods: Vec<String>,
    pub uri: String,
    pub action: Action,
    #[serde(default)]
    pub fallback: bool,
    #[serde(default)]
    pub defaults: BTreeMap<String, Option<String>>,
    #[serde(default)]
    pub wheres: BTreeMap<String, String>,
    #[serde(default)]
    pub binding_fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<Scheme>,
}

impl RouteTable {
    /// Export the table for caching.
    ///
    /// Non-fallback routes come first. Unnamed routes are exported as
    /// `generated::<n>`; two routes sharing a name is a [`RouteError::Logic`].
    pub fn export(&self) -> Result<CompiledRoutes> {
        let ordered = self
            .routes()
            .iter()
            .filter(|r| !r.is_fallback())
            .chain(self.routes().iter().filter(|r| r.is_fallback()));

        let mut compiled_regex_data = Vec::with_capacity(self.len());
        let mut attributes_by_name = BTreeMap::new();
        let mut generated = 0usize;

        for route in ordered {
            let name = match route.name() {
                Some(name) => name.to_string(),
                None => {
                    generated += 1;
                    format!("{GENERATED_NAME_PREFIX}{generated}")
                }
            };

            if attributes_by_name.contains_key(&name) {
                error!(name = %name, uri = %route.uri(), "Duplicate route name on export");
                return Err(RouteError::Logic(format!(
                    "unable to prepare route [{}] for serialization. Another route has already been assigned name [{}]",
                    route.uri(),
                    name
                )));
            }

            compiled_regex_data.push(CompiledEntry {
                name: name.clone(),
                compiled: route.compiled()?.clone(),
            });
            attributes_by_name.insert(name, attributes(route));
        }

        Ok(CompiledRoutes {
            compiled_regex_data,
            attributes_by_name,
        })
    }

    /// Rebuild a table from [`RouteTable::export`] output.
    ///
    /// Routes keep their exported patterns. `generated::` names are dropped
    /// again.
    pub fn from_compiled(compiled: CompiledRoutes) -> Result<Self> {
        let CompiledRoutes {
            compiled_regex_data,
            mut attributes_by_name,
        } = compiled;

        let mut table = RouteTable::new();
        for entry in compiled_regex_data {
            let attrs = attributes_by_name.remove(&entry.name).ok_or_else(|| {
                RouteError::Logic(format!("no attributes exported for route [{}]", entry.name))
            })?;
            for route in rebuild(&entry.name, &attrs, &entry.compiled)? {
                table.insert(Arc::new(route));
            }
        }

        info!(
            routes_count = table.len(),
            "Routing table loaded from compiled routes"
        );
        Ok(table)
    }
}

fn attributes(route: &RouteDefinition) -> RouteAttributes {
    RouteAttributes {
        methods: vec![route.method().to_string()],
        uri: route.uri().to_string(),
        action: route.action().clone(),
        fallback: route.is_fallback(),
        defaults: route.defaults().clone(),
        wheres: route
            .wheres()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        binding_fields: route.binding_fields().clone(),
        domain: route.domain().map(str::to_string),
        scheme: route.scheme(),
    }
}

fn rebuild(
    name: &str,
    attrs: &RouteAttributes,
    compiled: &CompiledRoute,
) -> Result<Vec<RouteDefinition>> {
    let uri = with_binding_fields(&attrs.uri, &attrs.binding_fields);

    attrs
        .methods
        .iter()
        .map(|method| {
            let method = method.parse::<Method>().map_err(|_| {
                let message = format!("invalid HTTP method `{method}` for route [{name}]");
                RouteError::InvalidArgument(message)
            })?;
            let mut route = RouteDefinition::new(method, &uri, attrs.action.clone());
            if !name.starts_with(GENERATED_NAME_PREFIX) {
                route = route.with_name(name);
            }
            if let Some(domain) = &attrs.domain {
                route = route.with_domain(domain.as_str());
            }
            if let Some(scheme) = attrs.scheme {
                route = route.with_scheme(scheme);
            }
            if attrs.fallback {
                route = route.as_fallback();
            }
            for (key, pattern) in &attrs.wheres {
                route = route.with_where(key.as_str(), pattern.as_str());
            }
            for (key, value) in &attrs.defaults {
                route = route.with_default(key.as_str(), value.clone());
            }
            Ok(route.with_compiled(compiled.clone()))
        })
        .collect()
}

/// Put `{name:field}` back so the rebuilt route carries its binding fields.
fn with_binding_fields(uri: &str, fields: &BTreeMap<String, String>) -> String {
    let mut uri = uri.to_string();
    for (name, field) in fields {
        uri = uri
            .replace(&format!("{{{name}}}"), &format!("{{{name}:{field}}}"))
            .replace(&format!("{{{name}?}}"), &format!("{{{name}:{field}?}}"));
    }
    uri
}
