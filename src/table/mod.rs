//! # Table Module
//!
//! The route table: registration, request matching and the compiled export.
//!
//! ## Overview
//!
//! Routes are bucketed per HTTP method and keyed by `domain + uri` inside a
//! bucket, so registering the same endpoint twice replaces the first one.
//! Name and `Class@method` action indices serve the URL generator.
//!
//! Matching a request:
//!
//! 1. Take the bucket for the request verb.
//! 2. Try non-fallback routes in registration order, then fallback routes.
//! 3. Bind the first route that matches and return it.
//! 4. Otherwise try the other verbs. If any would match, answer `OPTIONS`
//!    with an `Allow` list and anything else with `405`; if none would,
//!    the result is `404`.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use signpost::request::RouteRequest;
//! use signpost::route::{Action, RouteDefinition};
//! use signpost::table::{Matched, RouteTable};
//!
//! let mut table = RouteTable::new();
//! table
//!     .add(RouteDefinition::new(Method::GET, "users/{id}", Action::handler("show_user")))
//!     .unwrap();
//!
//! let matched = table
//!     .match_request(&RouteRequest::new(Method::GET, "/users/7"))
//!     .unwrap();
//! let bound = matched.into_route().unwrap();
//! assert_eq!(bound.parameter("id", None).unwrap(), Some("7"));
//! ```

mod compiled;
mod core;

pub use compiled::{CompiledEntry, CompiledRoutes, RouteAttributes, GENERATED_NAME_PREFIX};
pub use core::{Matched, RouteTable, VERBS};
