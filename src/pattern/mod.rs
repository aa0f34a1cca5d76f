//! # Pattern Module
//!
//! Turns `{placeholder}` URI templates into anchored regular expressions with
//! named captures.
//!
//! ## Overview
//!
//! A template such as `/users/{id}/posts/{slug?}` is scanned left to right.
//! Literal text becomes escaped regex text; every `{name}` becomes a capture
//! group named after its position (`v0`, `v1`, ...) whose character class
//! stops at `/` and at the next static separator that follows the variable. Trailing optional variables
//! (`{name?}`) are wrapped in non-capturing optional groups:
//!
//! ```text
//! /posts/{id}/{slug?}   =>   ^/posts/(?P<v0>[^/]+)(?:/(?P<v1>[^/]+))?$
//! /{page}.{format}      =>   ^/(?P<v0>[^/.]+)\.(?P<v1>[^/]+)$
//! ```
//!
//! Domain templates (`{account}.example.com`) use the same compiler with `.`
//! as the default separator and a case-insensitive regex.
//!
//! ## Example
//!
//! ```rust
//! use signpost::pattern::PatternCompiler;
//!
//! let compiled = PatternCompiler::new().compile("users/{id}").unwrap();
//! assert_eq!(compiled.regex().as_str(), "^/users/(?P<v0>[^/]+)$");
//! assert_eq!(compiled.variables(), ["id"]);
//! assert_eq!(compiled.captures("/users/42"), Some(vec![("id", "42")]));
//! ```

mod compiler;

pub use compiler::{
    compile, CompiledPattern, PatternCompiler, Token, SEPARATORS, VARIABLE_MAXIMUM_LENGTH,
};
