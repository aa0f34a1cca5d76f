use http::Method;
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use super::binder::ParameterBinder;
use super::bound::BoundRoute;
use crate::error::Result;
use crate::pattern::{CompiledPattern, PatternCompiler};
use crate::request::RouteRequest;

/// Method name used when a controller descriptor names only a class.
pub const INVOKE_METHOD: &str = "__invoke";

/// `{name:field}` placeholders declaring an implicit binding field.
static BINDING_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{(\w+):(\w+)(\?)?\}").expect("binding field regex is valid")
});

/// What a route dispatches to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// An opaque handler registered under a name.
    Handler { name: String },
    /// A controller class plus method, written `Class@method`.
    Controller { class: String, method: String },
}

impl Action {
    #[must_use]
    pub fn handler(name: impl Into<String>) -> Self {
        Action::Handler { name: name.into() }
    }

    /// Parse `Class@method`; a bare class dispatches to [`INVOKE_METHOD`].
    #[must_use]
    pub fn controller(descriptor: &str) -> Self {
        let descriptor = descriptor.trim().trim_start_matches("::");
        let (class, method) = descriptor
            .split_once('@')
            .unwrap_or((descriptor, INVOKE_METHOD));
        Action::Controller {
            class: class.to_string(),
            method: method.to_string(),
        }
    }

    /// `Class@method` for controller actions, used as the action index key.
    #[must_use]
    pub fn controller_signature(&self) -> Option<String> {
        match self {
            Action::Controller { class, method } => Some(format!("{class}@{method}")),
            Action::Handler { .. } => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Handler { name } => write!(f, "{name}"),
            Action::Controller { class, method } => write!(f, "{class}@{method}"),
        }
    }
}

/// Scheme a route is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    #[must_use]
    pub fn default_port(&self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// Compiled path pattern plus, for routes with a domain, the host pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompiledRoute {
    pub path: CompiledPattern,
    pub host: Option<CompiledPattern>,
}

impl CompiledRoute {
    /// Host variables followed by path variables, without duplicates.
    #[must_use]
    pub fn variables(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let host = self.host.iter().flat_map(|h| h.variables());
        for name in host.chain(self.path.variables()) {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

/// One registered endpoint.
///
/// A definition is immutable once it is in a [`crate::table::RouteTable`]
/// and is shared as `Arc<RouteDefinition>`. Per-request state lives in the
/// [`BoundRoute`] produced by [`RouteDefinition::bind`].
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    method: Method,
    uri: String,
    action: Action,
    name: Option<String>,
    domain: Option<String>,
    scheme: Option<Scheme>,
    fallback: bool,
    wheres: HashMap<String, String>,
    defaults: BTreeMap<String, Option<String>>,
    binding_fields: BTreeMap<String, String>,
    compiled: OnceCell<CompiledRoute>,
}

/// Trim whitespace and slashes; a lone `/` stays `/`.
#[must_use]
pub fn normalize(uri: &str) -> String {
    let trimmed = uri.trim().trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

impl RouteDefinition {
    pub fn new(method: Method, uri: &str, action: Action) -> Self {
        let (uri, binding_fields) = parse_binding_fields(&normalize(uri));
        Self {
            method,
            uri,
            action,
            name: None,
            domain: None,
            scheme: None,
            fallback: false,
            wheres: HashMap::new(),
            defaults: BTreeMap::new(),
            binding_fields,
            compiled: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        let domain = domain.into();
        let domain = domain
            .trim_start_matches("http://")
            .trim_start_matches("https://")
            .trim_end_matches('/')
            .to_string();
        self.domain = Some(domain);
        self.compiled = OnceCell::new();
        self
    }

    /// Narrow a variable with a regex constraint.
    #[must_use]
    pub fn with_where(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.wheres.insert(name.into(), pattern.into());
        self.compiled = OnceCell::new();
        self
    }

    /// Default used when the variable is absent after binding (`None` = null).
    #[must_use]
    pub fn with_default(mut self, name: impl Into<String>, value: Option<String>) -> Self {
        self.defaults.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = Some(scheme);
        self
    }

    /// Mark as a fallback route, tried only after every other route.
    #[must_use]
    pub fn as_fallback(mut self) -> Self {
        self.fallback = true;
        self
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn action(&self) -> &Action {
        &self.action
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    #[must_use]
    pub fn scheme(&self) -> Option<Scheme> {
        self.scheme
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    #[must_use]
    pub fn wheres(&self) -> &HashMap<String, String> {
        &self.wheres
    }

    #[must_use]
    pub fn defaults(&self) -> &BTreeMap<String, Option<String>> {
        &self.defaults
    }

    #[must_use]
    pub fn binding_fields(&self) -> &BTreeMap<String, String> {
        &self.binding_fields
    }

    /// Compile (once) and return the path and host patterns.
    pub fn compiled(&self) -> Result<&CompiledRoute> {
        self.compiled.get_or_try_init(|| {
            let path = PatternCompiler::new()
                .requirements(&self.wheres)
                .compile(&self.uri)?;
            let host = match &self.domain {
                Some(domain) => Some(
                    PatternCompiler::new()
                        .host()
                        .requirements(&self.wheres)
                        .compile(domain)?,
                ),
                None => None,
            };
            Ok(CompiledRoute { path, host })
        })
    }

    /// The compiled path pattern.
    pub fn compiled_pattern(&self) -> Result<&CompiledPattern> {
        Ok(&self.compiled()?.path)
    }

    /// Install an already compiled form, skipping the compiler.
    pub(crate) fn with_compiled(self, compiled: CompiledRoute) -> Self {
        Self {
            compiled: OnceCell::with_value(compiled),
            ..self
        }
    }

    /// All variable names (host then path).
    pub fn parameter_names(&self) -> Result<Vec<String>> {
        Ok(self.compiled()?.variables())
    }

    /// Whether the request's path, host and scheme satisfy this route.
    /// The verb is the table's concern and is not checked here.
    #[must_use]
    pub fn matches(&self, request: &RouteRequest) -> bool {
        let compiled = match self.compiled() {
            Ok(compiled) => compiled,
            Err(err) => {
                warn!(uri = %self.uri, error = %err, "Route pattern failed to compile");
                return false;
            }
        };

        if !compiled.path.is_match(&request.decoded_path()) {
            return false;
        }

        match self.scheme {
            Some(Scheme::Https) if !request.secure => return false,
            Some(Scheme::Http) if request.secure => return false,
            _ => {}
        }

        match &compiled.host {
            Some(host) => request
                .domain
                .as_deref()
                .is_some_and(|domain| host.is_match(domain)),
            None => true,
        }
    }

    /// Bind the route to `request`, producing request-scoped parameters.
    pub fn bind(self: &Arc<Self>, request: &RouteRequest) -> Result<BoundRoute> {
        let parameters = ParameterBinder::new(self).parameters(request)?;
        Ok(BoundRoute::with_parameters(Arc::clone(self), parameters))
    }
}

/// Rewrite `{post:slug}` to `{post}` and collect `post → slug`.
fn parse_binding_fields(uri: &str) -> (String, BTreeMap<String, String>) {
    let mut fields = BTreeMap::new();
    for caps in BINDING_FIELD.captures_iter(uri) {
        if let (Some(name), Some(field)) = (caps.get(1), caps.get(2)) {
            fields.insert(name.as_str().to_string(), field.as_str().to_string());
        }
    }
    let uri = BINDING_FIELD.replace_all(uri, "{$1$3}").into_owned();
    (uri, fields)
}
