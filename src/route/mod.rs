//! # Route Module
//!
//! Route definitions and their per-request bindings.
//!
//! ## Overview
//!
//! A [`RouteDefinition`] is one registered endpoint: a verb, a normalized URI
//! template, an [`Action`] and optional name, domain, scheme, `where`
//! constraints and defaults. Its compiled form is produced lazily, once, and
//! then shared by every request that hits the route.
//!
//! Matching a request never mutates the definition. Instead the table hands
//! out a [`BoundRoute`], which pairs the shared definition with the
//! [`Parameters`] captured from that request.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use http::Method;
//! use signpost::request::RouteRequest;
//! use signpost::route::{Action, RouteDefinition};
//!
//! let route = Arc::new(RouteDefinition::new(
//!     Method::GET,
//!     "/users/{id}",
//!     Action::controller("UserController@show"),
//! ));
//! let request = RouteRequest::new(Method::GET, "/users/42");
//! assert!(route.matches(&request));
//!
//! let bound = route.bind(&request).unwrap();
//! assert_eq!(bound.parameter("id", None).unwrap(), Some("42"));
//! ```

mod binder;
mod bound;
mod definition;
mod parameters;
#[cfg(test)]
mod tests;

pub use binder::ParameterBinder;
pub use bound::BoundRoute;
pub use definition::{
    normalize, Action, CompiledRoute, RouteDefinition, Scheme, INVOKE_METHOD,
};
pub use parameters::{ParamVec, Parameters, MAX_INLINE_PARAMS};
