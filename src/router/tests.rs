use super::*;
use crate::handler::DispatchFn;
use crate::server::HandlerRequest;
use http::Method;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

fn item(name: &str) -> HandlerItem {
    let label = name.to_string();
    let dispatch: DispatchFn = Arc::new(move |req: &mut HandlerRequest| {
        req.write_json(200, json!({ "handler": label }));
        Ok(())
    });
    HandlerItem {
        name: name.to_string(),
        kind: HandlerKind::Handler,
        dispatch,
        middleware: Vec::new(),
        source: "tests".to_string(),
    }
}

#[test]
fn test_parse_defaults() {
    let p = parse_pattern("/user/").unwrap();
    assert_eq!(p.method, DEFAULT_METHOD);
    assert_eq!(p.path, "/user");
    assert_eq!(p.domain, DEFAULT_DOMAIN);
    assert_eq!(p.to_key(), "/user@default");
}

#[test]
fn test_parse_method_and_domain() {
    let p = parse_pattern(" post:/user@API.example.com ").unwrap();
    assert_eq!(p.method, "POST");
    assert_eq!(p.path, "/user");
    assert_eq!(p.domain, "api.example.com");
    assert_eq!(p.to_key(), "POST:/user@api.example.com");
}

#[test]
fn test_root_path_is_kept() {
    assert_eq!(parse_pattern("/").unwrap().path, "/");
    assert_eq!(parse_pattern("GET:///").unwrap().path, "/");
}

#[test]
fn test_parse_errors() {
    assert!(matches!(parse_pattern(""), Err(PatternError::EmptyPath { .. })));
    assert!(matches!(parse_pattern("@example.com"), Err(PatternError::EmptyPath { .. })));
    assert!(matches!(parse_pattern("user"), Err(PatternError::RelativePath { .. })));
    assert!(matches!(
        parse_pattern("FETCH:/user"),
        Err(PatternError::InvalidMethod { .. })
    ));
    assert!(matches!(
        parse_pattern("/user@bad domain"),
        Err(PatternError::InvalidDomain { .. })
    ));
    assert!(matches!(parse_pattern("/user@"), Err(PatternError::InvalidDomain { .. })));
}

#[test]
fn test_builtin_placeholder_detection() {
    assert!(has_builtin_placeholder("/{.struct}/{.method}"));
    assert!(!has_builtin_placeholder("/user/{id}"));
}

#[test]
fn test_malformed_key_leaves_table_untouched() {
    let router = Router::new();
    let mut items = HashMap::new();
    items.insert("/ok@default".to_string(), item("ok"));
    items.insert("relative".to_string(), item("bad"));
    assert!(router.bind_handler_by_map(items).is_err());
    assert!(router.is_empty());
}

#[test]
fn test_lookup_prefers_host_and_exact_verb() {
    let router = Router::new();
    let mut items = HashMap::new();
    items.insert("/user@default".to_string(), item("any-default"));
    items.insert("GET:/user@default".to_string(), item("get-default"));
    items.insert("/user@example.com".to_string(), item("any-host"));
    router.bind_handler_by_map(items).unwrap();

    let hit = |method: Method, host: &str| {
        router
            .lookup(&method, "/user/", host)
            .map(|i| i.name.clone())
    };
    assert_eq!(hit(Method::GET, "example.com:8080").as_deref(), Some("any-host"));
    assert_eq!(hit(Method::GET, "other.org").as_deref(), Some("get-default"));
    assert_eq!(hit(Method::POST, "").as_deref(), Some("any-default"));
    assert!(router.lookup(&Method::GET, "/missing", "").is_none());
}

#[test]
fn test_duplicate_key_last_registration_wins() {
    let router = Router::new();
    for name in ["first", "second"] {
        let mut items = HashMap::new();
        items.insert("/dup".to_string(), item(name));
        router.bind_handler_by_map(items).unwrap();
    }
    assert_eq!(router.len(), 1);
    let mut req = HandlerRequest::new(Method::GET, "/dup");
    let resp = router.handle(&mut req).unwrap();
    assert_eq!(resp.body, json!({ "handler": "second" }));
    assert_eq!(req.handler_name, "second");
}

#[test]
fn test_routes_are_sorted() {
    let router = Router::new();
    let mut items = HashMap::new();
    items.insert("/b".to_string(), item("b"));
    items.insert("/a".to_string(), item("a"));
    router.bind_handler_by_map(items).unwrap();
    let keys: Vec<String> = router.routes().iter().map(|r| r.key.to_string()).collect();
    assert_eq!(keys, vec!["ALL:/a@default", "ALL:/b@default"]);
}
