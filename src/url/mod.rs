//! # URL Module
//!
//! Reverse routing: turning a route and a bag of parameters back into a URL,
//! and signing those URLs.
//!
//! ## Generation
//!
//! [`UrlGenerator::route`] looks a route up by name and hands it to the
//! [`RouteUrlGenerator`], which:
//!
//! 1. picks a root (the route's own domain and scheme, or the generator root),
//! 2. fills `{name}` placeholders from named parameters, falling back to
//!    global defaults,
//! 3. fills what is left from positional parameters in index order,
//! 4. drops optional placeholders nobody filled,
//! 5. appends unused parameters as a query string,
//! 6. percent-encodes the result, keeping URL delimiters literal.
//!
//! ## Signing
//!
//! [`UrlGenerator::signed_route`] appends an HMAC-SHA256 `signature` over the
//! full URL (and an `expires` timestamp when asked).
//! [`UrlGenerator::has_valid_signature`] recomputes it from an incoming
//! request, trying every configured key so keys can be rotated.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use http::Method;
//! use signpost::route::{Action, RouteDefinition};
//! use signpost::table::RouteTable;
//! use signpost::url::{ParamBag, UrlGenerator};
//!
//! let mut table = RouteTable::new();
//! table
//!     .add(RouteDefinition::new(Method::GET, "users/{id}", Action::handler("show")).with_name("users.show"))
//!     .unwrap();
//!
//! let urls = UrlGenerator::new(Arc::new(table), "https://example.com").unwrap();
//! let url = urls
//!     .route("users.show", ParamBag::new().with("id", "7").with("tab", "posts"), true)
//!     .unwrap();
//! assert_eq!(url, "https://example.com/users/7?tab=posts");
//! ```

mod generator;
mod params;
mod route_url;
mod signature;
#[cfg(test)]
mod tests;

pub use generator::{is_valid_url, MissingRouteResolver, UrlGenerator};
pub use params::{ParamBag, ParamKey};
pub use route_url::{encode_uri, RouteUrlGenerator, DONT_ENCODE};
pub use signature::{Expiration, SigningKeys, RESERVED_KEYS};
