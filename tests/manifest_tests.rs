use arc_swap::ArcSwap;
use http::Method;
use signpost::hot_reload::watch_manifest;
use signpost::manifest::{load_compiled, load_table, RouteManifest};
use signpost::request::RouteRequest;
use signpost::table::{Matched, RouteTable};
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const YAML_V1: &str = r#"
routes:
  - method: GET
    uri: /users/{user}
    name: users.show
    action: UserController@show
    wheres:
      user: "[0-9]+"
  - method: GET
    uri: posts/{post}/{page?}
    name: posts.show
    handler: show_post
    defaults:
      page: "1"
  - method: GET
    uri: dashboard
    name: tenant.dashboard
    handler: dashboard
    domain: "{tenant}.example.com"
  - method: GET
    uri: billing
    handler: billing
    scheme: https
  - method: GET
    uri: "{page}"
    handler: pages
    fallback: true
"#;

const YAML_V2: &str = r#"
routes:
  - method: GET
    uri: users/{user}
    name: users.profile
    handler: profile
"#;

fn write_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

fn action_for(table: &RouteTable, request: &RouteRequest) -> String {
    match table.match_request(request).unwrap() {
        Matched::Route(bound) => bound.route().action().to_string(),
        Matched::Options { .. } => "OPTIONS".to_string(),
    }
}

#[test]
fn test_yaml_manifest_builds_table() {
    let file = write_file(".yaml", YAML_V1);
    let table = load_table(file.path()).unwrap();
    assert_eq!(table.len(), 5);

    let get = |path: &str| RouteRequest::new(Method::GET, path);
    assert_eq!(action_for(&table, &get("/users/7")), "UserController@show");
    assert_eq!(action_for(&table, &get("/users")), "pages");
    assert_eq!(
        action_for(&table, &get("/dashboard").with_domain("acme.example.com")),
        "dashboard"
    );
    assert_eq!(action_for(&table, &get("/billing")), "pages");
    let secure = get("/billing").with_secure(true);
    assert_eq!(action_for(&table, &secure), "billing");

    let Matched::Route(bound) = table.match_request(&get("/posts/hello")).unwrap() else {
        panic!("expected a route");
    };
    assert_eq!(bound.parameter("page", None).unwrap(), Some("1"));
}

#[test]
fn test_json_and_toml_manifests() {
    let json = write_file(
        ".json",
        r#"{"routes": [
            {"method": "post", "uri": "orders", "handler": "store", "name": "orders.store"}
        ]}"#,
    );
    let table = load_table(json.path()).unwrap();
    let store = table.get_by_name("orders.store").unwrap();
    assert_eq!(store.method(), &Method::POST);

    let toml = write_file(
        ".toml",
        r#"
[[routes]]
method = "GET"
uri = "orders/{order}"
action = "OrderController"
"#,
    );
    let table = load_table(toml.path()).unwrap();
    assert!(table.get_by_action("OrderController@__invoke").is_some());
}

#[test]
fn test_manifest_errors_name_the_route() {
    let file = write_file(
        ".yaml",
        "routes:\n  - method: GET\n    uri: \"users/{1st}\"\n    handler: x\n",
    );
    let err = load_table(file.path()).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("GET users/{1st}"), "{message}");
    assert!(message.contains("cannot start with a digit"), "{message}");

    let missing = load_table(Path::new("/definitely/not/here.yaml")).unwrap_err();
    assert!(format!("{missing:#}").contains("failed to read"));
}

#[test]
fn test_manifest_round_trips_through_serde() {
    let manifest: RouteManifest = serde_yaml::from_str(YAML_V1).unwrap();
    let yaml = serde_yaml::to_string(&manifest).unwrap();
    let again: RouteManifest = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(manifest, again);
}

#[test]
fn test_compiled_export_loads_back() {
    let file = write_file(".yaml", YAML_V1);
    let table = load_table(file.path()).unwrap();
    let exported = serde_json::to_string(&table.export().unwrap()).unwrap();
    let compiled = write_file(".json", &exported);

    let restored = load_compiled(compiled.path()).unwrap();
    assert_eq!(restored.len(), table.len());
    assert!(restored.has_named_route("tenant.dashboard"));
    // Fallbacks are exported last, so they register last.
    assert!(restored.routes().last().unwrap().is_fallback());
    assert_eq!(
        action_for(&restored, &RouteRequest::new(Method::GET, "/users/7")),
        "UserController@show"
    );
}

#[test]
fn test_watch_manifest_reload() {
    let file = write_file(".yaml", YAML_V1);
    let path = file.path().to_path_buf();
    let live = Arc::new(ArcSwap::from_pointee(load_table(&path).unwrap()));

    let reloads: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&reloads);
    let watcher = watch_manifest(&path, Arc::clone(&live), move |table| {
        seen.lock().unwrap().push(table.len());
    })
    .expect("watch_manifest");

    // allow watcher thread to start
    std::thread::sleep(Duration::from_millis(100));
    std::fs::write(&path, YAML_V2).unwrap();

    for _ in 0..100 {
        if live.load().has_named_route("users.profile") {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    let current = live.load();
    assert!(current.has_named_route("users.profile"));
    assert!(!current.has_named_route("users.show"));
    assert!(reloads.lock().unwrap().contains(&1));

    drop(watcher);
}

#[test]
fn test_broken_manifest_keeps_serving() {
    let file = write_file(".yaml", YAML_V1);
    let path = file.path().to_path_buf();
    let live = Arc::new(ArcSwap::from_pointee(load_table(&path).unwrap()));

    std::fs::write(&path, "routes: [ this is not yaml").unwrap();
    assert!(signpost::hot_reload::reload(&path, &live).is_none());
    assert_eq!(live.load().len(), 5);
}
