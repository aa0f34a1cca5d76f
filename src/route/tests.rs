use super::*;
use crate::error::RouteError;
use crate::request::RouteRequest;
use http::Method;
use std::sync::Arc;

fn get(uri: &str) -> RouteDefinition {
    RouteDefinition::new(Method::GET, uri, Action::handler("h"))
}

#[test]
fn test_normalize() {
    assert_eq!(normalize("/"), "/");
    assert_eq!(normalize(""), "/");
    assert_eq!(normalize("  /users/ "), "users");
    assert_eq!(normalize("//a/b//"), "a/b");
}

#[test]
fn test_action_controller_descriptor() {
    assert_eq!(
        Action::controller("PostController@show"),
        Action::Controller {
            class: "PostController".into(),
            method: "show".into(),
        }
    );
    let invokable = Action::controller("SingleAction");
    assert_eq!(
        invokable.controller_signature().as_deref(),
        Some("SingleAction@__invoke")
    );
    assert_eq!(Action::handler("list_users").controller_signature(), None);
    assert_eq!(Action::handler("list_users").to_string(), "list_users");
}

#[test]
fn test_binding_fields_are_stripped_from_uri() {
    let route = get("posts/{post:slug}/comments/{comment:id?}");
    assert_eq!(route.uri(), "posts/{post}/comments/{comment?}");
    let fields = route.binding_fields();
    assert_eq!(fields.get("post").map(String::as_str), Some("slug"));
    assert_eq!(fields.get("comment").map(String::as_str), Some("id"));
}

#[test]
fn test_matches_path_and_trailing_slash() {
    let route = get("users/{id}");
    assert!(route.matches(&RouteRequest::new(Method::GET, "/users/5")));
    assert!(route.matches(&RouteRequest::new(Method::GET, "/users/5/")));
    assert!(!route.matches(&RouteRequest::new(Method::GET, "/users")));
}

#[test]
fn test_matches_decoded_path() {
    let route = get("files/{name}");
    let bound = Arc::new(route)
        .bind(&RouteRequest::new(Method::GET, "/files/my%20doc"))
        .unwrap();
    assert_eq!(bound.parameter("name", None).unwrap(), Some("my doc"));
}

#[test]
fn test_scheme_constraint() {
    let route = get("secure").with_scheme(Scheme::Https);
    assert!(!route.matches(&RouteRequest::new(Method::GET, "/secure")));
    let secure_request = RouteRequest::new(Method::GET, "/secure").with_secure(true);
    assert!(route.matches(&secure_request));

    let plain = get("plain").with_scheme(Scheme::Http);
    let secure_request = RouteRequest::new(Method::GET, "/plain").with_secure(true);
    assert!(!plain.matches(&secure_request));
}

#[test]
fn test_host_constraint() {
    let route = get("dashboard").with_domain("{account}.example.com");
    let missing_host = RouteRequest::new(Method::GET, "/dashboard");
    assert!(!route.matches(&missing_host));

    let request = missing_host.clone().with_domain("acme.example.com");
    assert!(route.matches(&request));
    assert!(!route.matches(&missing_host.with_domain("acme.other.com")));
}

#[test]
fn test_domain_scheme_prefix_is_stripped() {
    let route = get("x").with_domain("https://api.example.com/");
    assert_eq!(route.domain(), Some("api.example.com"));
}

#[test]
fn test_bind_host_then_path_with_path_winning() {
    let route = Arc::new(
        get("{account}/profile/{section}").with_domain("{account}.example.com"),
    );
    let request = RouteRequest::new(Method::GET, "/acme-path/profile/billing")
        .with_domain("acme-host.example.com");
    let bound = route.bind(&request).unwrap();
    let params = bound.parameters().unwrap();
    assert_eq!(params.get("account"), Some("acme-path"));
    assert_eq!(params.names().collect::<Vec<_>>(), ["account", "section"]);
}

#[test]
fn test_bind_drops_unmatched_optionals_and_fills_defaults() {
    let route = Arc::new(
        get("posts/{id}/{slug?}/{page?}")
            .with_default("page", Some("1".into()))
            .with_default("slug", None),
    );
    let bound = route
        .bind(&RouteRequest::new(Method::GET, "/posts/9"))
        .unwrap();
    let params = bound.parameters().unwrap();
    assert_eq!(params.get("id"), Some("9"));
    assert_eq!(params.get("page"), Some("1"));
    assert!(params.contains("slug"));
    assert_eq!(params.get("slug"), None);

    let without_nulls = bound.parameters_without_nulls().unwrap();
    assert!(!without_nulls.contains("slug"));
    assert_eq!(without_nulls.len(), 2);
}

#[test]
fn test_bind_symbol_variable_names() {
    let route = get("prices/{amount€}/{a·b}").with_where("amount€", "[0-9]+");
    let route = Arc::new(route);
    let request = RouteRequest::new(Method::GET, "/prices/25/x");
    assert!(route.matches(&request));
    let bound = route.bind(&request).unwrap();
    assert_eq!(bound.parameter("amount€", None).unwrap(), Some("25"));
    assert_eq!(bound.parameter("a·b", None).unwrap(), Some("x"));
}

#[test]
fn test_where_constraint_participates_in_matching() {
    let route = get("users/{id}").with_where("id", "[0-9]+");
    assert!(route.matches(&RouteRequest::new(Method::GET, "/users/12")));
    let letters = RouteRequest::new(Method::GET, "/users/abc");
    assert!(!route.matches(&letters));
}

#[test]
fn test_invalid_pattern_reported_by_compiled() {
    let route = get("users/{1id}");
    let compiled = route.compiled();
    assert!(matches!(compiled, Err(RouteError::InvalidPattern { .. })));
    assert!(!route.matches(&RouteRequest::new(Method::GET, "/users/1")));
}

#[test]
fn test_parameter_names_host_first() {
    let route = get("{section}/{id}").with_domain("{account}.example.com");
    let names = route.parameter_names().unwrap();
    assert_eq!(names, ["account", "section", "id"]);
}

#[test]
fn test_unbound_route_rejects_parameter_access() {
    let mut bound = BoundRoute::unbound(Arc::new(get("users/{id}")));
    assert!(!bound.is_bound());
    assert_eq!(bound.parameters().unwrap_err(), RouteError::NotBound);
    assert_eq!(
        bound.original_parameters().unwrap_err(),
        RouteError::NotBound
    );
    assert_eq!(
        bound.parameter("id", None).unwrap_err(),
        RouteError::NotBound
    );
    assert_eq!(
        bound.set_parameter("id", Some("1".into())).unwrap_err(),
        RouteError::NotBound
    );
    assert!(!bound.has_parameter("id"));
}

#[test]
fn test_set_and_forget_keep_originals() {
    let route = Arc::new(get("users/{id}/{tab}"));
    let mut bound = route
        .bind(&RouteRequest::new(Method::GET, "/users/3/posts"))
        .unwrap();

    bound.set_parameter("id", Some("4".into())).unwrap();
    bound.forget_parameter("tab").unwrap();

    assert_eq!(bound.parameter("id", None).unwrap(), Some("4"));
    assert_eq!(bound.parameter("tab", Some("home")).unwrap(), Some("home"));
    assert!(!bound.has_parameter("tab"));

    let original = bound.original_parameters().unwrap();
    assert_eq!(original.get("id"), Some("3"));
    assert_eq!(original.get("tab"), Some("posts"));
}

#[test]
fn test_compiled_is_memoized() {
    let route = get("users/{id}");
    let first = route.compiled().unwrap() as *const CompiledRoute;
    let second = route.compiled().unwrap() as *const CompiledRoute;
    assert_eq!(first, second);
}
