//! # signpost
//!
//! **signpost** compiles route templates such as `users/{id}/{tab?}` into
//! anchored regexes, matches incoming requests against a table of routes,
//! and generates URLs back from route names or controller actions,
//! optionally signed with HMAC-SHA256.
//!
//! ## Architecture
//!
//! - **[`pattern`]** - Template compiler: regex, tokens, variable names
//! - **[`route`]** - Route definitions, parameter binding, request-scoped [`route::BoundRoute`]
//! - **[`table`]** - Route registration, matching with `404`/`405`/`OPTIONS` handling, compiled export
//! - **[`url`]** - Reverse routing, relative and absolute URLs, signed URLs
//! - **[`dispatcher`]** - Hands matched routes to handler functions or controllers
//! - **[`manifest`]** - Declarative YAML/JSON/TOML route lists
//! - **[`hot_reload`]** - Live manifest reloading
//! - **[`config`]** - URL generation settings from files and the environment
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`cli`]** - The `signpost` command line
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use signpost::request::RouteRequest;
//! use signpost::route::{Action, RouteDefinition};
//! use signpost::table::{Matched, RouteTable};
//! use signpost::url::{ParamBag, UrlGenerator};
//! use std::sync::Arc;
//!
//! let mut table = RouteTable::new();
//! table.add(
//!     RouteDefinition::new(Method::GET, "posts/{post}/{slug?}", Action::controller("PostController@show"))
//!         .with_name("posts.show")
//!         .with_where("post", "[0-9]+"),
//! )?;
//!
//! let matched = table.match_request(&RouteRequest::new(Method::GET, "/posts/42/hello"))?;
//! let Matched::Route(bound) = matched else { unreachable!() };
//! assert_eq!(bound.parameter("slug", None)?, Some("hello"));
//!
//! let urls = UrlGenerator::new(Arc::new(table), "https://example.com")?;
//! let url = urls.route("posts.show", ParamBag::new().with("post", "42"), true)?;
//! assert_eq!(url, "https://example.com/posts/42");
//! # Ok::<(), signpost::error::RouteError>(())
//! ```
//!
//! ## Concurrency
//!
//! Route definitions are immutable once registered and shared as
//! `Arc<RouteDefinition>`; compiled patterns are memoized per definition.
//! Binding produces a fresh [`route::BoundRoute`] per request, so one table
//! serves any number of threads. Swap whole tables with
//! [`hot_reload::watch_manifest`].

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod hot_reload;
pub mod logging;
pub mod manifest;
pub mod pattern;
pub mod request;
pub mod route;
pub mod table;
pub mod url;

pub use error::{Result, RouteError};
pub use request::RouteRequest;
pub use route::{Action, BoundRoute, RouteDefinition};
pub use table::{Matched, RouteTable};
pub use url::{ParamBag, UrlGenerator};
