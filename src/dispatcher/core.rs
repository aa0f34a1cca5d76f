use http::{header, HeaderValue, Method, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

use crate::error::RouteError;
use crate::request::RouteRequest;
use crate::route::{Action, BoundRoute, Parameters, RouteDefinition};
use crate::table::{Matched, RouteTable};

/// Maximum inline response headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 8;

/// Stack-allocated header storage for responses.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// What an action receives once its route has been matched and bound.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    pub method: Method,
    /// Request path as received.
    pub path: String,
    pub query: Option<String>,
    pub route: Arc<RouteDefinition>,
    /// Bound parameters with null entries removed.
    pub parameters: Parameters,
}

impl HandlerRequest {
    fn from_bound(request: &RouteRequest, bound: &BoundRoute) -> Result<Self, RouteError> {
        Ok(Self {
            method: request.method.clone(),
            path: request.path.clone(),
            query: request.query.clone(),
            route: Arc::clone(bound.route()),
            parameters: bound.parameters_without_nulls()?,
        })
    }

    #[inline]
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name)
    }
}

/// Response produced by an action.
#[derive(Debug, Clone, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON response with a content-type header.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut headers = HeaderVec::new();
        headers.push((Arc::from("content-type"), "application/json".to_string()));
        Self {
            status,
            headers,
            body,
        }
    }

    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// Empty response, used for synthesized `OPTIONS` answers.
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self::new(status, HeaderVec::new(), Value::Null)
    }

    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Add or replace a header.
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Convert to an `http::Response`; a null body becomes an empty string.
    #[must_use]
    pub fn into_http(self) -> Response<String> {
        let body = match &self.body {
            Value::Null => String::new(),
            other => other.to_string(),
        };
        let mut response = Response::new(body);
        *response.status_mut() =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        for (name, value) in &self.headers {
            match (
                header::HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    response.headers_mut().insert(name, value);
                }
                _ => warn!(header = %name, "Dropping invalid response header"),
            }
        }
        response
    }
}

/// A controller instance resolved from the [`Container`].
pub trait Controller: Send + Sync {
    /// Invoke `method`; `None` when the controller has no such method.
    fn call(&self, method: &str, request: &HandlerRequest) -> Option<HandlerResponse>;
}

/// Resolves controller classes named in `Class@method` actions.
pub trait Container: Send + Sync {
    fn make(&self, class: &str) -> Option<Arc<dyn Controller>>;
}

/// A [`Container`] backed by a map of pre-built controllers.
#[derive(Default, Clone)]
pub struct ControllerRegistry {
    controllers: HashMap<String, Arc<dyn Controller>>,
}

impl ControllerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, class: impl Into<String>, controller: Arc<dyn Controller>) {
        self.controllers.insert(class.into(), controller);
    }
}

impl Container for ControllerRegistry {
    fn make(&self, class: &str) -> Option<Arc<dyn Controller>> {
        self.controllers.get(class).map(Arc::clone)
    }
}

/// Function registered under an [`Action::Handler`] name.
pub type HandlerFn = Arc<dyn Fn(&HandlerRequest) -> HandlerResponse + Send + Sync>;

/// Matches requests against a [`RouteTable`] and invokes the route action.
#[derive(Clone)]
pub struct Dispatcher {
    container: Arc<dyn Container>,
    handlers: HashMap<String, HandlerFn>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Arc::new(ControllerRegistry::new()))
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(container: Arc<dyn Container>) -> Self {
        Self {
            container,
            handlers: HashMap::new(),
        }
    }

    /// Register a handler function; a handler with the same name is replaced.
    pub fn register_handler<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(&HandlerRequest) -> HandlerResponse + Send + Sync + 'static,
    {
        let name = name.into();
        if self.handlers.contains_key(&name) {
            warn!(handler_name = %name, "Replaced existing handler");
        }
        info!(
            handler_name = %name,
            total_handlers = self.handlers.len() + 1,
            "Handler registered"
        );
        self.handlers.insert(name, Arc::new(handler));
    }

    /// Match `request`, run the action and produce the HTTP response.
    ///
    /// Unknown paths answer `404`, known paths under the wrong verb `405`
    /// (with `Allow`), and `OPTIONS` for such paths an empty `200` with
    /// `Allow`.
    #[must_use]
    pub fn dispatch(&self, table: &RouteTable, request: &RouteRequest) -> Response<String> {
        self.dispatch_response(table, request).into_http()
    }

    /// [`Dispatcher::dispatch`] without the final HTTP conversion.
    #[must_use]
    pub fn dispatch_response(&self, table: &RouteTable, request: &RouteRequest) -> HandlerResponse {
        let bound = match table.match_request(request) {
            Ok(Matched::Route(bound)) => bound,
            Ok(matched @ Matched::Options { .. }) => {
                let mut response = HandlerResponse::empty(StatusCode::OK.as_u16());
                if let Some(allow) = matched.allow_header() {
                    response.set_header("allow", allow);
                }
                return response;
            }
            Err(err) => return error_response(&err),
        };

        let handler_request = match HandlerRequest::from_bound(request, &bound) {
            Ok(handler_request) => handler_request,
            Err(err) => return error_response(&err),
        };

        let start = Instant::now();
        let response = self.invoke(&handler_request);
        debug!(
            method = %handler_request.method,
            path = %handler_request.path,
            action = %handler_request.route.action(),
            status = response.status,
            latency_us = start.elapsed().as_micros(),
            "Handler returned response"
        );
        response
    }

    fn invoke(&self, request: &HandlerRequest) -> HandlerResponse {
        match request.route.action() {
            Action::Handler { name } => match self.handlers.get(name) {
                Some(handler) => handler(request),
                None => {
                    let available_handlers: Vec<&String> = self.handlers.keys().collect();
                    error!(
                        handler_name = %name,
                        available_handlers = ?available_handlers,
                        "Handler not found"
                    );
                    HandlerResponse::error(500, "handler not found")
                }
            },
            Action::Controller { class, method } => {
                let Some(controller) = self.container.make(class) else {
                    error!(class = %class, "Controller could not be resolved");
                    return HandlerResponse::error(500, "controller not found");
                };
                controller.call(method, request).unwrap_or_else(|| {
                    error!(class = %class, method = %method, "Controller method not found");
                    HandlerResponse::error(500, "controller method not found")
                })
            }
        }
    }
}

fn error_response(err: &RouteError) -> HandlerResponse {
    let mut response = HandlerResponse::error(err.status().as_u16(), &err.to_string());
    if let RouteError::MethodNotAllowed { allowed, .. } = err {
        response.set_header("allow", crate::error::join_methods(allowed, ", "));
    }
    response
}
