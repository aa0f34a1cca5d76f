use super::*;
use crate::error::{RouteError, RouteLookup};
use crate::request::RouteRequest;
use crate::route::{Action, RouteDefinition, Scheme};
use crate::table::RouteTable;
use chrono::{Duration, Utc};
use http::Method;
use std::sync::Arc;

fn table() -> RouteTable {
    let mut table = RouteTable::new();
    let routes = [
        RouteDefinition::new(
            Method::GET,
            "users/{id}",
            Action::controller("UserController@show"),
        )
        .with_name("users.show"),
        RouteDefinition::new(Method::GET, "posts/{post}/{slug?}", Action::handler("post"))
            .with_name("posts.show"),
        RouteDefinition::new(
            Method::GET,
            "archive/{year?}/{month?}",
            Action::handler("archive"),
        )
        .with_name("archive"),
        RouteDefinition::new(Method::GET, "/", Action::handler("home")).with_name("home"),
        RouteDefinition::new(Method::GET, "dashboard", Action::handler("dashboard"))
            .with_domain("{account}.example.com")
            .with_name("tenant.dashboard"),
        RouteDefinition::new(Method::GET, "secure/area", Action::handler("area"))
            .with_scheme(Scheme::Https)
            .with_name("secure.area"),
        RouteDefinition::new(Method::GET, "{locale}/about", Action::handler("about"))
            .with_name("localized.about"),
        RouteDefinition::new(Method::GET, "files/{path}", Action::handler("file"))
            .with_name("files.show"),
        RouteDefinition::new(Method::GET, "help/{topic}#top", Action::handler("help"))
            .with_name("help"),
    ];
    for route in routes {
        table.add(route).unwrap();
    }
    table
}

fn urls(root: &str) -> UrlGenerator {
    UrlGenerator::new(Arc::new(table()), root)
        .unwrap()
        .with_keys(SigningKeys::new(["secret"]))
}

fn id(value: &str) -> ParamBag {
    ParamBag::new().with("id", value)
}

#[test]
fn test_named_route_absolute_and_relative() {
    let urls = urls("https://example.com");
    assert_eq!(
        urls.route("users.show", id("7"), true).unwrap(),
        "https://example.com/users/7"
    );
    assert_eq!(
        urls.route("users.show", id("7"), false).unwrap(),
        "/users/7"
    );
    assert_eq!(
        urls.route("home", ParamBag::new(), true).unwrap(),
        "https://example.com"
    );
    assert_eq!(urls.route("home", ParamBag::new(), false).unwrap(), "/");
}

#[test]
fn test_positional_parameters() {
    let urls = urls("https://example.com");
    assert_eq!(
        urls.route("users.show", ParamBag::new().push("7"), false)
            .unwrap(),
        "/users/7"
    );
    assert_eq!(
        urls.route("posts.show", ParamBag::new().push("5").push("hello"), false)
            .unwrap(),
        "/posts/5/hello"
    );
}

#[test]
fn test_leftovers_become_query_string() {
    let urls = urls("https://example.com");
    let params = id("7").with("tab", "posts").push("extra");
    assert_eq!(
        urls.route("users.show", params, false).unwrap(),
        "/users/7?tab=posts&extra"
    );
}

#[test]
fn test_unfilled_optionals_are_dropped() {
    let urls = urls("https://example.com");
    assert_eq!(
        urls.route("posts.show", ParamBag::new().with("post", "5"), true)
            .unwrap(),
        "https://example.com/posts/5"
    );
    assert_eq!(
        urls.route("archive", ParamBag::new(), false).unwrap(),
        "/archive"
    );
    assert_eq!(
        urls.route("archive", ParamBag::new().with("year", "2024"), false)
            .unwrap(),
        "/archive/2024"
    );
}

#[test]
fn test_missing_parameter_is_reported() {
    let urls = urls("https://example.com");
    let err = urls.route("users.show", ParamBag::new(), true).unwrap_err();
    assert_eq!(
        err,
        RouteError::UrlGeneration {
            name: "users.show".into(),
            uri: "users/{id}".into(),
            missing: vec!["id".into()],
        }
    );

    // An empty value is discarded rather than substituted or queried.
    let err = urls.route("users.show", id(""), true).unwrap_err();
    assert!(matches!(err, RouteError::UrlGeneration { .. }));
}

#[test]
fn test_global_defaults_fill_placeholders() {
    let mut urls = urls("https://example.com");
    urls.defaults([("locale", "en")]);
    assert_eq!(
        urls.route("localized.about", ParamBag::new(), false)
            .unwrap(),
        "/en/about"
    );
    let french = ParamBag::new().with("locale", "fr");
    assert_eq!(
        urls.route("localized.about", french, false).unwrap(),
        "/fr/about"
    );
    assert_eq!(
        urls.default_parameters().get("locale").map(String::as_str),
        Some("en")
    );
}

#[test]
fn test_encoding_keeps_delimiters() {
    let urls = urls("https://example.com");
    let path = ParamBag::new().with("path", "a b@c:d,e");
    assert_eq!(
        urls.route("files.show", path, true).unwrap(),
        "https://example.com/files/a%20b@c:d,e"
    );
    assert_eq!(
        urls.route("users.show", id("1").with("q", "a b"), false)
            .unwrap(),
        "/users/1?q=a%20b"
    );
}

#[test]
fn test_encode_uri_table() {
    assert_eq!(encode_uri("a b/c?d=e&f#g%"), "a%20b/c?d=e&f#g%");
    assert_eq!(encode_uri("x;y,z+!*|@:"), "x;y,z+!*|@:");
    assert_eq!(encode_uri("é\"<>"), "%C3%A9%22%3C%3E");
}

#[test]
fn test_route_domain_with_parameters() {
    let urls = urls("https://example.com");
    let params = ParamBag::new().with("account", "acme");
    assert_eq!(
        urls.route("tenant.dashboard", params.clone(), true)
            .unwrap(),
        "https://acme.example.com/dashboard"
    );
    assert_eq!(
        urls.route("tenant.dashboard", params, false).unwrap(),
        "/dashboard"
    );
}

#[test]
fn test_non_default_port_is_added_to_route_domain() {
    let urls = urls("http://localhost:8080");
    let acme = ParamBag::new().with("account", "acme");
    assert_eq!(
        urls.route("tenant.dashboard", acme, true).unwrap(),
        "http://acme.example.com:8080/dashboard"
    );
    assert_eq!(
        urls.route("users.show", id("1"), true).unwrap(),
        "http://localhost:8080/users/1"
    );
}

#[test]
fn test_route_scheme_is_forced() {
    let urls = urls("http://example.com");
    assert_eq!(
        urls.route("secure.area", ParamBag::new(), true).unwrap(),
        "https://example.com/secure/area"
    );
}

#[test]
fn test_base_path_is_stripped_from_relative_urls() {
    let urls = urls("https://example.com/app/");
    assert_eq!(
        urls.route("users.show", id("7"), true).unwrap(),
        "https://example.com/app/users/7"
    );
    assert_eq!(
        urls.route("users.show", id("7"), false).unwrap(),
        "/users/7"
    );
}

#[test]
fn test_fragment_stays_after_query() {
    let urls = urls("https://example.com");
    let params = ParamBag::new().with("topic", "faq").with("x", "1");
    assert_eq!(
        urls.route("help", params, true).unwrap(),
        "https://example.com/help/faq?x=1#top"
    );
}

#[test]
fn test_action_lookup_and_root_namespace() {
    let mut urls = urls("https://example.com");
    assert_eq!(
        urls.action("UserController@show", id("3"), false).unwrap(),
        "/users/3"
    );

    urls.set_root_namespace(Some("App"));
    assert_eq!(
        urls.action("UserController@show", id("3"), false)
            .unwrap_err(),
        RouteError::NotFound(RouteLookup::Action("App::UserController@show".into()))
    );
    assert_eq!(
        urls.action("::UserController@show", id("3"), false)
            .unwrap(),
        "/users/3"
    );
}

#[test]
fn test_missing_named_route_resolver() {
    let mut urls = urls("https://example.com");
    assert_eq!(
        urls.route("legacy", ParamBag::new(), true).unwrap_err(),
        RouteError::NotFound(RouteLookup::Name("legacy".into()))
    );

    urls.resolve_missing_named_routes_using(|name, _, _| {
        (name == "legacy").then(|| "https://legacy.example.com".to_string())
    });
    assert_eq!(
        urls.route("legacy", ParamBag::new(), true).unwrap(),
        "https://legacy.example.com"
    );
    assert!(urls.route("nope", ParamBag::new(), true).is_err());
}

#[test]
fn test_to_arbitrary_paths() {
    let urls = urls("https://example.com");
    assert_eq!(
        urls.to("users", &["a b", "c"], None),
        "https://example.com/users/a%20b/c"
    );
    assert_eq!(
        urls.to("/search?q=x", &[], None),
        "https://example.com/search?q=x"
    );
    assert_eq!(urls.to("/", &[], None), "https://example.com");
    assert_eq!(
        urls.to("https://other.com/x", &["y"], None),
        "https://other.com/x"
    );
    assert_eq!(
        urls.to("mailto:team@example.com", &[], None),
        "mailto:team@example.com"
    );
    assert_eq!(urls.to("#section", &[], None), "#section");
    assert_eq!(
        urls.to("login", &[], Some(false)),
        "http://example.com/login"
    );

    let plain = self::urls("http://example.com");
    assert_eq!(plain.secure("login", &[]), "https://example.com/login");
}

#[test]
fn test_force_scheme_and_root() {
    let mut urls = urls("https://example.com");
    urls.force_scheme(Some("http"));
    assert_eq!(
        urls.route("users.show", id("7"), true).unwrap(),
        "http://example.com/users/7"
    );

    urls.force_scheme(None);
    urls.force_root_url(Some("https://cdn.example.org/"));
    assert_eq!(
        urls.route("users.show", id("7"), true).unwrap(),
        "https://cdn.example.org/users/7"
    );
}

#[test]
fn test_asset_urls() {
    let urls = urls("https://example.com");
    assert_eq!(
        urls.asset("/css/app.css", None),
        "https://example.com/css/app.css"
    );
    assert_eq!(
        urls.asset("//cdn.example.com/a.js", None),
        "//cdn.example.com/a.js"
    );
}

#[test]
fn test_param_bag_keys() {
    let bag: ParamBag = [("0", "a"), ("name", "b"), ("1", "c")].into_iter().collect();
    assert_eq!(bag.positional().collect::<Vec<_>>(), ["a", "c"]);
    assert_eq!(bag.get("name"), Some("b"));

    let mut bag = ParamBag::new().with("b", "2").push("x").with("a", "1");
    bag.sort();
    let keys: Vec<String> = bag.iter().map(|(k, _)| k.to_string()).collect();
    assert_eq!(keys, ["0", "a", "b"]);
    assert_eq!(bag.pull_first_positional().as_deref(), Some("x"));
    assert!(!bag.has_positional());
}

#[test]
fn test_signed_route_rejects_reserved_keys() {
    let urls = urls("https://example.com");
    for reserved in RESERVED_KEYS {
        let err = urls
            .signed_route("users.show", id("1").with(reserved, "x"), None, true)
            .unwrap_err();
        assert!(matches!(err, RouteError::InvalidArgument(_)));
    }
}

#[test]
fn test_signed_route_round_trip() {
    let urls = urls("https://example.com");
    let signed = urls
        .signed_route("users.show", id("7"), None, true)
        .unwrap();
    assert!(signed.starts_with("https://example.com/users/7?signature="));

    let request = RouteRequest::from_url(Method::GET, &signed).unwrap();
    assert!(urls.has_valid_signature(&request, true, &[]));

    let tampered = RouteRequest::from_url(Method::GET, &signed.replace("/7?", "/8?")).unwrap();
    assert!(!urls.has_correct_signature(&tampered, true, &[]));
}

#[test]
fn test_temporary_signed_route_expiry() {
    let urls = urls("https://example.com");
    let signed = urls
        .temporary_signed_route("users.show", Duration::minutes(10), id("7"), true)
        .unwrap();
    assert!(signed.contains("?expires="));
    assert!(signed.contains("&signature="));
    let request = RouteRequest::from_url(Method::GET, &signed).unwrap();
    assert!(urls.has_valid_signature(&request, true, &[]));

    let past = Utc::now() - Duration::hours(1);
    let expired = urls
        .temporary_signed_route("users.show", past, id("7"), true)
        .unwrap();
    let request = RouteRequest::from_url(Method::GET, &expired).unwrap();
    assert!(urls.has_correct_signature(&request, true, &[]));
    assert!(!urls.signature_has_not_expired(&request));
    assert!(!urls.has_valid_signature(&request, true, &[]));
}

#[test]
fn test_relative_signature_and_ignored_query() {
    let urls = urls("https://example.com");
    let signed = urls
        .signed_route("users.show", id("7"), None, false)
        .unwrap();
    assert!(signed.starts_with("/users/7?signature="));

    let with_tracking = format!("{signed}&utm=mail");
    let request = RouteRequest::new(Method::GET, &with_tracking);
    assert!(!urls.has_valid_signature(&request, false, &[]));
    assert!(urls.has_valid_signature(&request, false, &["utm"]));
}

#[test]
fn test_rotated_keys_still_verify() {
    let old = urls("https://example.com").with_keys(SigningKeys::new(["old"]));
    let signed = old.signed_route("users.show", id("7"), None, true).unwrap();

    let rotated = urls("https://example.com").with_keys(SigningKeys::new(["new", "old"]));
    let request = RouteRequest::from_url(Method::GET, &signed).unwrap();
    assert!(rotated.has_valid_signature(&request, true, &[]));
}
