use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::params::{ParamBag, ParamKey};
use super::route_url::RouteUrlGenerator;
use super::signature::{Expiration, SigningKeys, RESERVED_KEYS};
use crate::config::UrlConfig;
use crate::error::{Result, RouteError, RouteLookup};
use crate::request::RouteRequest;
use crate::route::RouteDefinition;
use crate::table::RouteTable;

/// Callback consulted when [`UrlGenerator::route`] cannot find a name.
pub type MissingRouteResolver = dyn Fn(&str, &ParamBag, bool) -> Option<String> + Send + Sync;

/// Prefixes of paths that are already complete URLs.
const URL_PREFIXES: [&str; 7] = ["#", "//", "http://", "https://", "mailto:", "tel:", "sms:"];

/// Reverse routing: URLs for named routes, controller actions and plain
/// paths, plus signed URLs.
#[derive(Clone)]
pub struct UrlGenerator {
    routes: Arc<RouteTable>,
    root: String,
    base_path: String,
    port: Option<u16>,
    forced_root: Option<String>,
    forced_scheme: Option<String>,
    asset_root: Option<String>,
    root_namespace: Option<String>,
    defaults: BTreeMap<String, String>,
    keys: SigningKeys,
    missing_named_route_resolver: Option<Arc<MissingRouteResolver>>,
}

impl fmt::Debug for UrlGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UrlGenerator")
            .field("routes", &self.routes.len())
            .field("root", &self.root)
            .field("forced_root", &self.forced_root)
            .field("forced_scheme", &self.forced_scheme)
            .field("root_namespace", &self.root_namespace)
            .field("defaults", &self.defaults)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

impl UrlGenerator {
    /// Generator rooted at `root` (`scheme://host[:port][/base]`).
    pub fn new(routes: Arc<RouteTable>, root: &str) -> Result<Self> {
        let parsed = url::Url::parse(root)
            .map_err(|e| RouteError::InvalidArgument(format!("invalid root URL `{root}`: {e}")))?;
        let host = parsed.host_str().ok_or_else(|| {
            RouteError::InvalidArgument(format!("root URL `{root}` has no host"))
        })?;

        let base = parsed.path().trim_matches('/');
        let base_path = if base.is_empty() {
            String::new()
        } else {
            format!("/{base}")
        };
        let port = parsed.port();
        let root = match port {
            Some(port) => format!("{}://{}:{}{}", parsed.scheme(), host, port, base_path),
            None => format!("{}://{}{}", parsed.scheme(), host, base_path),
        };

        Ok(Self {
            routes,
            root,
            base_path,
            port,
            forced_root: None,
            forced_scheme: None,
            asset_root: None,
            root_namespace: None,
            defaults: BTreeMap::new(),
            keys: SigningKeys::default(),
            missing_named_route_resolver: None,
        })
    }

    /// Generator rooted at the scheme, host and port of `request`.
    pub fn from_request(routes: Arc<RouteTable>, request: &RouteRequest) -> Result<Self> {
        Self::new(routes, &request.root())
    }

    /// Generator configured from a [`UrlConfig`].
    pub fn from_config(routes: Arc<RouteTable>, config: &UrlConfig) -> Result<Self> {
        let mut generator = Self::new(routes, &config.app_url)?
            .with_keys(SigningKeys::parse(&config.keys)?);
        if let Some(scheme) = &config.force_scheme {
            generator.force_scheme(Some(scheme.as_str()));
        }
        generator.asset_root = config
            .asset_root
            .as_deref()
            .map(|root| root.trim_end_matches('/').to_string());
        generator.root_namespace = config.root_namespace.clone();
        Ok(generator)
    }

    #[must_use]
    pub fn with_keys(mut self, keys: SigningKeys) -> Self {
        self.keys = keys;
        self
    }

    #[must_use]
    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    /// Point the generator at a new table (after a reload).
    pub fn set_routes(&mut self, routes: Arc<RouteTable>) {
        self.routes = routes;
    }

    /// Namespace prefixed to relative actions in [`UrlGenerator::action`].
    pub fn set_root_namespace(&mut self, namespace: Option<&str>) {
        self.root_namespace = namespace.map(str::to_string);
    }

    /// Global defaults for `{name}` placeholders; merged over earlier ones.
    pub fn defaults<I, K, V>(&mut self, defaults: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.defaults
            .extend(defaults.into_iter().map(|(k, v)| (k.into(), v.into())));
    }

    #[must_use]
    pub fn default_parameters(&self) -> &BTreeMap<String, String> {
        &self.defaults
    }

    /// Force every generated URL onto `scheme` (`http` or `https`).
    pub fn force_scheme(&mut self, scheme: Option<&str>) {
        self.forced_scheme = scheme
            .filter(|s| !s.is_empty())
            .map(|s| format!("{}://", s.trim_end_matches("://")));
    }

    /// Replace the root used for every generated URL.
    pub fn force_root_url(&mut self, root: Option<&str>) {
        self.forced_root = root
            .filter(|r| !r.is_empty())
            .map(|r| r.trim_end_matches('/').to_string());
    }

    /// Register a callback for names the table does not know.
    pub fn resolve_missing_named_routes_using<F>(&mut self, resolver: F)
    where
        F: Fn(&str, &ParamBag, bool) -> Option<String> + Send + Sync + 'static,
    {
        self.missing_named_route_resolver = Some(Arc::new(resolver));
    }

    /// Absolute URL for `path` with extra segments appended.
    ///
    /// Complete URLs are returned unchanged and a query string on `path`
    /// is kept at the end.
    #[must_use]
    pub fn to(&self, path: &str, extra: &[&str], secure: Option<bool>) -> String {
        if is_valid_url(path) {
            return path.to_string();
        }

        let tail = extra
            .iter()
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let root = self.format_root(&self.format_scheme(secure), None);
        let (path, query) = match path.find('?') {
            Some(pos) => path.split_at(pos),
            None => (path, ""),
        };
        let path = format!("{path}/{tail}");
        format!("{}{}", self.format(&root, path.trim_matches('/')), query)
    }

    /// [`UrlGenerator::to`] forced onto `https`.
    #[must_use]
    pub fn secure(&self, path: &str, extra: &[&str]) -> String {
        self.to(path, extra, Some(true))
    }

    /// URL for a static asset, rooted at the asset root when one is set.
    #[must_use]
    pub fn asset(&self, path: &str, secure: Option<bool>) -> String {
        if is_valid_url(path) {
            return path.to_string();
        }
        let root = match &self.asset_root {
            Some(root) => root.clone(),
            None => self.format_root(&self.format_scheme(secure), None),
        };
        format!("{}/{}", root.trim_end_matches('/'), path.trim_matches('/'))
    }

    /// URL for a named route.
    pub fn route(&self, name: &str, parameters: ParamBag, absolute: bool) -> Result<String> {
        if let Some(route) = self.routes.get_by_name(name) {
            return self.to_route(route, parameters, absolute);
        }

        if let Some(resolver) = &self.missing_named_route_resolver {
            if let Some(url) = resolver(name, &parameters, absolute) {
                debug!(name = %name, "Missing named route resolved by callback");
                return Ok(url);
            }
        }

        debug!(name = %name, "Named route not found");
        Err(RouteError::NotFound(RouteLookup::Name(name.to_string())))
    }

    /// URL for a `Class@method` controller action.
    pub fn action(&self, action: &str, parameters: ParamBag, absolute: bool) -> Result<String> {
        let action = match &self.root_namespace {
            Some(namespace) if !action.starts_with("::") => format!("{namespace}::{action}"),
            _ => action.trim_start_matches("::").to_string(),
        };

        match self.routes.get_by_action(&action) {
            Some(route) => self.to_route(route, parameters, absolute),
            None => Err(RouteError::NotFound(RouteLookup::Action(action))),
        }
    }

    /// URL for a specific route.
    pub fn to_route(
        &self,
        route: &RouteDefinition,
        parameters: ParamBag,
        absolute: bool,
    ) -> Result<String> {
        RouteUrlGenerator::new(self, &self.defaults).to(route, parameters, absolute)
    }

    /// URL for a named route carrying an HMAC `signature` (and `expires`
    /// when an expiration is given).
    pub fn signed_route(
        &self,
        name: &str,
        parameters: ParamBag,
        expiration: Option<Expiration>,
        absolute: bool,
    ) -> Result<String> {
        for reserved in RESERVED_KEYS {
            if parameters.contains(reserved) {
                return Err(RouteError::InvalidArgument(format!(
                    "\"{reserved}\" is a reserved parameter when generating signed routes. Please rename your route parameter."
                )));
            }
        }

        let mut parameters = parameters;
        if let Some(expiration) = expiration {
            let expires = expiration.timestamp(Utc::now());
            parameters.insert(ParamKey::Named("expires".to_string()), expires.to_string());
        }
        parameters.sort();

        let signature = self
            .keys
            .sign(&self.route(name, parameters.clone(), absolute)?)?;
        self.route(name, parameters.with("signature", signature), absolute)
    }

    /// [`UrlGenerator::signed_route`] with a mandatory expiration.
    pub fn temporary_signed_route(
        &self,
        name: &str,
        expiration: impl Into<Expiration>,
        parameters: ParamBag,
        absolute: bool,
    ) -> Result<String> {
        self.signed_route(name, parameters, Some(expiration.into()), absolute)
    }

    /// Signature correct and not expired.
    #[must_use]
    pub fn has_valid_signature(
        &self,
        request: &RouteRequest,
        absolute: bool,
        ignore_query: &[&str],
    ) -> bool {
        self.has_correct_signature(request, absolute, ignore_query)
            && self.signature_has_not_expired(request)
    }

    /// Recompute the signature over the request URL and its query string
    /// (minus `signature` and `ignore_query`, original order) and compare
    /// against every key.
    #[must_use]
    pub fn has_correct_signature(
        &self,
        request: &RouteRequest,
        absolute: bool,
        ignore_query: &[&str],
    ) -> bool {
        let url = if absolute {
            request.url()
        } else {
            // The root verifies as `/`, matching what a relative signed URL for
            // it carries, rather than `//`.
            format!("/{}", request.path.trim_matches('/'))
        };

        let query = request
            .query_string()
            .split('&')
            .filter(|pair| {
                let key = pair.split_once('=').map_or(*pair, |(k, _)| k);
                key != "signature" && !ignore_query.contains(&key)
            })
            .collect::<Vec<_>>()
            .join("&");
        let original = format!("{url}?{query}");
        let original = original.trim_end_matches('?');

        let signature = request.query_value("signature").unwrap_or_default();
        let valid = self.keys.verify(original, &signature);
        debug!(url = %original, valid, "Signature checked");
        valid
    }

    /// False only when `expires` is present and in the past.
    #[must_use]
    pub fn signature_has_not_expired(&self, request: &RouteRequest) -> bool {
        match request.query_value("expires").filter(|e| !e.is_empty()) {
            None => true,
            Some(expires) => match expires.parse::<i64>() {
                Ok(0) => true,
                Ok(expires) => Utc::now().timestamp() <= expires,
                Err(_) => false,
            },
        }
    }

    /// Scheme prefix (`https://`) for generated URLs.
    pub(crate) fn format_scheme(&self, secure: Option<bool>) -> String {
        match secure {
            Some(true) => "https://".to_string(),
            Some(false) => "http://".to_string(),
            None => match &self.forced_scheme {
                Some(scheme) => scheme.clone(),
                None => {
                    let scheme = self.root.split_once("://").map_or("http", |(s, _)| s);
                    format!("{scheme}://")
                }
            },
        }
    }

    /// `root` (or the generator root) with its scheme replaced by `scheme`.
    pub(crate) fn format_root(&self, scheme: &str, root: Option<&str>) -> String {
        let root = root
            .or(self.forced_root.as_deref())
            .unwrap_or(self.root.as_str());
        let start = if root.starts_with("http://") {
            "http://"
        } else {
            "https://"
        };
        root.replacen(start, scheme, 1)
    }

    /// Join root and path, trimming slashes at both ends.
    pub(crate) fn format(&self, root: &str, path: &str) -> String {
        let path = format!("/{}", path.trim_matches('/'));
        format!("{root}{path}").trim_matches('/').to_string()
    }

    /// Append the root's port to a route domain when it is not the default.
    pub(crate) fn with_port(&self, domain: &str) -> String {
        match self.port {
            Some(port) => format!("{domain}:{port}"),
            None => domain.to_string(),
        }
    }

    pub(crate) fn base_path(&self) -> &str {
        &self.base_path
    }
}

/// Whether `path` is already a complete URL.
#[must_use]
pub fn is_valid_url(path: &str) -> bool {
    if URL_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return true;
    }
    url::Url::parse(path).is_ok_and(|url| url.has_host())
}
