use http::Method;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{join_methods, Result, RouteError, RouteLookup};
use crate::request::RouteRequest;
use crate::route::{BoundRoute, RouteDefinition};

/// Verbs tried when a path matches under some other method.
pub const VERBS: [Method; 7] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Matches slower than this are logged as warnings.
const SLOW_MATCH: Duration = Duration::from_millis(1);

/// Outcome of a successful [`RouteTable::match_request`].
#[derive(Debug, Clone)]
pub enum Matched {
    /// A route matched and was bound to the request.
    Route(BoundRoute),
    /// An `OPTIONS` request for a path served under other verbs.
    Options { allow: Vec<Method> },
}

impl Matched {
    /// Value of the `Allow` header for an options outcome.
    #[must_use]
    pub fn allow_header(&self) -> Option<String> {
        match self {
            Matched::Options { allow } => Some(join_methods(allow, ",")),
            Matched::Route(_) => None,
        }
    }

    /// Bound route, if this outcome dispatches to one.
    #[must_use]
    pub fn into_route(self) -> Option<BoundRoute> {
        match self {
            Matched::Route(route) => Some(route),
            Matched::Options { .. } => None,
        }
    }
}

/// Registration-order list with a key index so re-registration replaces
/// in place.
#[derive(Debug, Clone, Default)]
struct Bucket {
    routes: Vec<Arc<RouteDefinition>>,
    index: HashMap<String, usize>,
}

impl Bucket {
    /// Insert or replace; returns the replaced route.
    fn put(&mut self, key: String, route: Arc<RouteDefinition>) -> Option<Arc<RouteDefinition>> {
        match self.index.get(&key) {
            Some(&slot) => Some(std::mem::replace(&mut self.routes[slot], route)),
            None => {
                self.index.insert(key, self.routes.len());
                self.routes.push(route);
                None
            }
        }
    }
}

/// The set of registered routes plus name and action indices.
///
/// A table is built once (registration phase) and then only read while
/// serving. Sharing it behind `Arc` across workers needs no locking; to
/// change routes at runtime build a new table and swap it in (see
/// [`crate::hot_reload`]).
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    by_method: HashMap<Method, Bucket>,
    all: Bucket,
    names: HashMap<String, Arc<RouteDefinition>>,
    actions: HashMap<String, Arc<RouteDefinition>>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route.
    ///
    /// The route is compiled here so a bad template fails registration
    /// instead of the first request. A route with the same method, domain
    /// and URI as an earlier one replaces it in place.
    pub fn add(&mut self, route: RouteDefinition) -> Result<Arc<RouteDefinition>> {
        route.compiled()?;
        Ok(self.insert(Arc::new(route)))
    }

    pub(crate) fn insert(&mut self, route: Arc<RouteDefinition>) -> Arc<RouteDefinition> {
        let domain_and_uri = format!("{}{}", route.domain().unwrap_or(""), route.uri());
        let method = route.method().clone();

        let replaced = self
            .by_method
            .entry(method.clone())
            .or_default()
            .put(domain_and_uri.clone(), Arc::clone(&route));
        self.all
            .put(format!("{method}{domain_and_uri}"), Arc::clone(&route));

        if let Some(old) = replaced {
            self.names.retain(|_, r| !Arc::ptr_eq(r, &old));
            self.actions.retain(|_, r| !Arc::ptr_eq(r, &old));
        }

        if let Some(name) = route.name() {
            self.names.insert(name.to_string(), Arc::clone(&route));
        }
        if let Some(signature) = route.action().controller_signature() {
            self.actions.insert(signature, Arc::clone(&route));
        }

        debug!(
            method = %method,
            uri = %route.uri(),
            name = route.name().unwrap_or(""),
            "Route registered"
        );
        route
    }

    /// Find the route for `request` and bind it.
    ///
    /// Non-fallback routes are tried before fallback routes. When nothing
    /// matches under the request verb, other verbs are tried: an `OPTIONS`
    /// request then yields [`Matched::Options`], anything else
    /// [`RouteError::MethodNotAllowed`]. A path no verb serves is
    /// [`RouteError::NotFound`].
    pub fn match_request(&self, request: &RouteRequest) -> Result<Matched> {
        debug!(
            method = %request.method,
            path = %request.path,
            "Route match attempt"
        );
        let match_start = Instant::now();

        if let Some(route) = self.match_against(&request.method, request) {
            let bound = route.bind(request)?;
            let match_duration = match_start.elapsed();
            if match_duration > SLOW_MATCH {
                warn!(
                    method = %request.method,
                    path = %request.path,
                    route_uri = %route.uri(),
                    duration_us = match_duration.as_micros(),
                    "Slow route matching detected"
                );
            } else {
                debug!(
                    method = %request.method,
                    path = %request.path,
                    route_uri = %route.uri(),
                    action = %route.action(),
                    path_params = ?bound.parameters().ok(),
                    duration_us = match_duration.as_micros(),
                    "Route matched"
                );
            }
            return Ok(Matched::Route(bound));
        }

        let others = self.alternate_verbs(request);
        if others.is_empty() {
            warn!(
                method = %request.method,
                path = %request.path,
                duration_us = match_start.elapsed().as_micros(),
                "No route matched"
            );
            return Err(RouteError::NotFound(RouteLookup::Path {
                method: request.method.clone(),
                path: request.path.clone(),
            }));
        }

        if request.method == Method::OPTIONS {
            debug!(
                path = %request.path,
                allow = %join_methods(&others, ","),
                "Answering OPTIONS from alternate verbs"
            );
            return Ok(Matched::Options { allow: others });
        }

        debug!(
            method = %request.method,
            path = %request.path,
            allowed = %join_methods(&others, ","),
            "Method not allowed"
        );
        Err(RouteError::MethodNotAllowed {
            method: request.method.clone(),
            path: request.decoded_path().trim_start_matches('/').to_string(),
            allowed: others,
        })
    }

    /// First route in the `method` bucket matching the request's path, host
    /// and scheme, fallbacks last.
    fn match_against(
        &self,
        method: &Method,
        request: &RouteRequest,
    ) -> Option<&Arc<RouteDefinition>> {
        let routes = &self.by_method.get(method)?.routes;
        routes
            .iter()
            .filter(|r| !r.is_fallback())
            .chain(routes.iter().filter(|r| r.is_fallback()))
            .find(|route| route.matches(request))
    }

    fn alternate_verbs(&self, request: &RouteRequest) -> Vec<Method> {
        VERBS
            .iter()
            .filter(|verb| **verb != request.method)
            .filter(|verb| self.match_against(verb, request).is_some())
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Arc<RouteDefinition>> {
        self.names.get(name)
    }

    /// Look up by `Class@method`; a leading `\` or `::` is ignored.
    #[must_use]
    pub fn get_by_action(&self, action: &str) -> Option<&Arc<RouteDefinition>> {
        let action = action.trim_start_matches('\\').trim_start_matches("::");
        self.actions.get(action)
    }

    #[must_use]
    pub fn has_named_route(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Every route in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Arc<RouteDefinition>] {
        &self.all.routes
    }

    /// Routes registered for `method`, in registration order.
    #[must_use]
    pub fn routes_by_method(&self, method: &Method) -> &[Arc<RouteDefinition>] {
        self.by_method
            .get(method)
            .map(|bucket| bucket.routes.as_slice())
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.all.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.all.routes.is_empty()
    }

    /// Log a summary of the loaded table.
    pub fn log_summary(&self) {
        let routes_summary: Vec<String> = self
            .routes()
            .iter()
            .take(10)
            .map(|r| format!("{} {}", r.method(), r.uri()))
            .collect();
        info!(
            routes_count = self.len(),
            named_count = self.names.len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );
    }
}

impl FromIterator<Arc<RouteDefinition>> for RouteTable {
    fn from_iter<I: IntoIterator<Item = Arc<RouteDefinition>>>(iter: I) -> Self {
        let mut table = RouteTable::new();
        for route in iter {
            table.insert(route);
        }
        table
    }
}
