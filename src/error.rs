//! Error types shared by the compiler, the route table and the URL generator.
//!
//! Every failure the engine can report is a [`RouteError`]. The HTTP layer
//! turns the two "expected" outcomes ([`RouteError::NotFound`] for a path and
//! [`RouteError::MethodNotAllowed`]) into 404/405 responses via
//! [`RouteError::status`]; everything else is a configuration or programmer
//! error and surfaces as a 500.

use http::{Method, StatusCode};
use std::fmt;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = RouteError> = std::result::Result<T, E>;

/// Why a URI template was rejected by the pattern compiler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternIssue {
    /// Variable names are used as capture group names and may not start with a digit.
    #[error("variable name `{0}` cannot start with a digit")]
    LeadingDigit(String),
    /// A variable name appears more than once in a single template.
    #[error("variable name `{0}` is used more than once")]
    Duplicate(String),
    /// Variable names are capped at [`crate::pattern::VARIABLE_MAXIMUM_LENGTH`] bytes.
    #[error("variable name `{0}` exceeds the maximum length of 32 characters")]
    TooLong(String),
    /// A `where` constraint is empty once its anchors are stripped.
    #[error("routing requirement for `{0}` cannot be empty")]
    EmptyRequirement(String),
    /// The assembled regex (usually because of a `where` constraint) does not compile.
    #[error("generated regex is invalid: {0}")]
    Regex(String),
}

/// What was being looked up when a [`RouteError::NotFound`] was raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteLookup {
    /// An inbound request that no route matched under any verb.
    Path { method: Method, path: String },
    /// A named route requested for URL generation.
    Name(String),
    /// A `Class@method` controller action requested for URL generation.
    Action(String),
}

impl fmt::Display for RouteLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteLookup::Path { method, path } => {
                write!(f, "the route {path} could not be found for {method}")
            }
            RouteLookup::Name(name) => write!(f, "route [{name}] not defined"),
            RouteLookup::Action(action) => write!(f, "action {action} not defined"),
        }
    }
}

/// Errors raised by the route engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// The URI (or domain) template could not be compiled.
    #[error("invalid route pattern `{pattern}`: {issue}")]
    InvalidPattern {
        pattern: String,
        issue: PatternIssue,
    },

    /// The path exists, but not for the requested verb.
    #[error(
        "the {method} method is not supported for route {path}. Supported methods: {}",
        join_methods(allowed, ", ")
    )]
    MethodNotAllowed {
        method: Method,
        path: String,
        allowed: Vec<Method>,
    },

    /// No route (or named/action route) exists.
    #[error("{0}")]
    NotFound(RouteLookup),

    /// The generated URL still contains unresolved placeholders.
    #[error(
        "missing required parameter{} for [Route: {name}] [URI: {uri}] [Missing parameter{}: {}]",
        plural(missing),
        plural(missing),
        missing.join(", ")
    )]
    UrlGeneration {
        name: String,
        uri: String,
        missing: Vec<String>,
    },

    /// A caller passed an argument the engine refuses (e.g. reserved signed-route keys).
    #[error("{0}")]
    InvalidArgument(String),

    /// The table is in a state that cannot be exported.
    #[error("{0}")]
    Logic(String),

    /// Parameters were read from a route handle before it was bound to a request.
    #[error("route is not bound to a request")]
    NotBound,
}

impl RouteError {
    /// HTTP status the error maps to when it reaches the HTTP layer.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            RouteError::NotFound(_) => StatusCode::NOT_FOUND,
            RouteError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn invalid_pattern(pattern: &str, issue: PatternIssue) -> Self {
        RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            issue,
        }
    }
}

pub(crate) fn join_methods(methods: &[Method], sep: &str) -> String {
    methods
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(sep)
}

fn plural(items: &[String]) -> &'static str {
    if items.len() > 1 {
        "s"
    } else {
        ""
    }
}
