use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use tracing::debug;

use super::generator::UrlGenerator;
use super::params::ParamBag;
use crate::error::{Result, RouteError};
use crate::route::{RouteDefinition, Scheme};

/// `{name}` or `{name?}`, capturing the name.
static NAMED_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(.*?)(\?)?\}").expect("named placeholder regex is valid"));

/// Any placeholder left after named substitution.
static ANY_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{.*?\}").expect("placeholder regex is valid"));

/// Optional placeholders nobody filled.
static UNFILLED_OPTIONAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{.*?\?\}").expect("optional placeholder regex is valid"));

/// Placeholders still present in a finished URI.
static MISSING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{(.*?)\}").expect("missing placeholder regex is valid"));

/// Scheme and host at the start of an absolute URI.
static ORIGIN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(//|[^/?])+").expect("origin regex is valid"));

/// Encoded characters put back after the whole URI is percent-encoded.
pub const DONT_ENCODE: [(&str, char); 14] = [
    ("%2F", '/'),
    ("%40", '@'),
    ("%3A", ':'),
    ("%3B", ';'),
    ("%2C", ','),
    ("%3D", '='),
    ("%2B", '+'),
    ("%21", '!'),
    ("%2A", '*'),
    ("%7C", '|'),
    ("%3F", '?'),
    ("%26", '&'),
    ("%23", '#'),
    ("%25", '%'),
];

/// Builds the URL for one route from a parameter bag.
pub struct RouteUrlGenerator<'a> {
    url: &'a UrlGenerator,
    defaults: &'a BTreeMap<String, String>,
}

impl<'a> RouteUrlGenerator<'a> {
    pub fn new(url: &'a UrlGenerator, defaults: &'a BTreeMap<String, String>) -> Self {
        Self { url, defaults }
    }

    /// Generate the URL for `route`.
    ///
    /// Named parameters are substituted first, then positional ones. What is
    /// left of the bag becomes the query string. A placeholder nobody filled
    /// is a [`RouteError::UrlGeneration`].
    pub fn to(
        &self,
        route: &RouteDefinition,
        parameters: ParamBag,
        absolute: bool,
    ) -> Result<String> {
        let mut parameters = parameters;

        let root = self.replace_root_parameters(route, &mut parameters);
        let path = self.replace_route_parameters(route.uri(), &mut parameters);
        let uri = add_query_string(&self.url.format(&root, &path), &parameters);

        let missing: Vec<String> = MISSING
            .captures_iter(&uri)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .collect();
        if !missing.is_empty() {
            debug!(
                route = route.name().unwrap_or(""),
                uri = %route.uri(),
                missing = ?missing,
                "URL generation failed"
            );
            return Err(RouteError::UrlGeneration {
                name: route.name().unwrap_or("").to_string(),
                uri: route.uri().to_string(),
                missing,
            });
        }

        let uri = encode_uri(&uri);
        if absolute {
            Ok(uri)
        } else {
            Ok(self.relative(&uri))
        }
    }

    /// Root for the route: its own domain when it has one, else the
    /// generator root, with the route's scheme applied.
    fn replace_root_parameters(
        &self,
        route: &RouteDefinition,
        parameters: &mut ParamBag,
    ) -> String {
        let scheme = self.route_scheme(route);
        let domain = route
            .domain()
            .map(|domain| self.url.with_port(&format!("{scheme}{domain}")));
        let root = self.url.format_root(&scheme, domain.as_deref());
        self.replace_route_parameters(&root, parameters)
    }

    fn route_scheme(&self, route: &RouteDefinition) -> String {
        match route.scheme() {
            Some(Scheme::Http) => "http://".to_string(),
            Some(Scheme::Https) => "https://".to_string(),
            None => self.url.format_scheme(None),
        }
    }

    fn replace_route_parameters(&self, path: &str, parameters: &mut ParamBag) -> String {
        let path = self.replace_named_parameters(path, parameters);

        let path = ANY_PLACEHOLDER.replace_all(&path, |caps: &Captures<'_>| {
            let placeholder = &caps[0];
            if !parameters.has_positional() && !placeholder.ends_with("?}") {
                placeholder.to_string()
            } else {
                parameters.pull_first_positional().unwrap_or_default()
            }
        });

        UNFILLED_OPTIONAL
            .replace_all(&path, "")
            .trim_matches('/')
            .to_string()
    }

    fn replace_named_parameters(&self, path: &str, parameters: &mut ParamBag) -> String {
        NAMED_PLACEHOLDER
            .replace_all(path, |caps: &Captures<'_>| {
                let name = &caps[1];
                match parameters.get(name) {
                    Some(value) if !value.is_empty() => {
                        return parameters.pull(name).unwrap_or_default();
                    }
                    Some(_) if !self.defaults.contains_key(name) => {
                        parameters.pull(name);
                    }
                    _ => {}
                }
                match self.defaults.get(name) {
                    Some(default) => default.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }

    fn relative(&self, uri: &str) -> String {
        let uri = ORIGIN.replace(uri, "");
        let base = self.url.base_path();
        let uri = match uri.get(..base.len()) {
            Some(prefix) if !base.is_empty() && prefix.eq_ignore_ascii_case(base) => {
                &uri[base.len()..]
            }
            _ => &uri[..],
        };
        format!("/{}", uri.trim_start_matches('/'))
    }
}

/// Append leftovers as a query string, keeping any `#fragment` last.
fn add_query_string(uri: &str, parameters: &ParamBag) -> String {
    let (uri, fragment) = match uri.split_once('#') {
        Some((uri, fragment)) => (uri, Some(fragment)),
        None => (uri, None),
    };
    let mut out = format!("{uri}{}", route_query_string(parameters));
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

fn route_query_string(parameters: &ParamBag) -> String {
    if parameters.is_empty() {
        return String::new();
    }
    let keyed: Vec<String> = parameters
        .named()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    let mut query = keyed.join("&");
    if keyed.len() < parameters.len() {
        query.push('&');
        query.push_str(&parameters.positional().collect::<Vec<_>>().join("&"));
    }
    let query = query.trim_matches('&');
    if query.is_empty() {
        String::new()
    } else {
        format!("?{query}")
    }
}

/// Percent-encode everything, then restore the [`DONT_ENCODE`] characters.
#[must_use]
pub fn encode_uri(uri: &str) -> String {
    let encoded = urlencoding::encode(uri);
    let mut out = String::with_capacity(encoded.len());
    let mut rest: &str = &encoded;
    while let Some(pos) = rest.find('%') {
        out.push_str(&rest[..pos]);
        let escape = rest.get(pos..pos + 3).unwrap_or(&rest[pos..]);
        match DONT_ENCODE
            .iter()
            .find(|(code, _)| code.eq_ignore_ascii_case(escape))
        {
            Some((_, literal)) => out.push(*literal),
            None => out.push_str(escape),
        }
        rest = &rest[pos + escape.len()..];
    }
    out.push_str(rest);
    out
}
