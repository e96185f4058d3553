#![allow(clippy::unwrap_used, clippy::expect_used)]

use http::Method;
use objroute::config::ServerConfig;
use objroute::handler::{InitHook, MethodTable, ServiceObject, ShutHook};
use objroute::server::{HandlerRequest, Server};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Init appends to a request-scoped log; handlers read it back.
#[derive(Clone, Default)]
struct Journal;

impl Journal {
    fn read(&mut self, req: &mut HandlerRequest) {
        req.push_param("log", "handler");
        let log = req.get_param("log").cloned().unwrap_or(Value::Null);
        req.write_json(200, json!({ "log": log }));
    }

    fn explode(&mut self, req: &mut HandlerRequest) {
        req.push_param("log", "handler");
        panic!("handler exploded");
    }
}

impl InitHook for Journal {
    fn init(&mut self, req: &mut HandlerRequest) {
        req.push_param("log", "init");
        if req.get_header("x-fail-init").is_some() {
            panic!("init exploded");
        }
    }
}

impl ShutHook for Journal {
    fn shut(&mut self, req: &mut HandlerRequest) {
        req.push_param("log", "shut");
    }
}

impl ServiceObject for Journal {
    fn methods(table: &mut MethodTable<Self>) {
        table
            .method("Read", Self::read)
            .method("Explode", Self::explode)
            .init_hook()
            .shut_hook();
    }
}

fn journal_type() -> &'static str {
    std::any::type_name::<Journal>()
}

#[test]
fn test_init_precedes_handler_once_per_request() {
    let server = Server::new();
    server.bind_object("/journal", Journal, None).unwrap();

    for _ in 0..2 {
        let mut req = HandlerRequest::new(Method::GET, "/journal/read");
        let resp = server.handle(&mut req);
        assert_eq!(resp.status, 200);
        assert_eq!(resp.body, json!({ "log": ["init", "handler"] }));
        assert_eq!(req.get_param("log"), Some(&json!(["init", "handler", "shut"])));
    }

    let stats = server.pools().metrics()[journal_type()];
    assert_eq!(stats.created, 1);
    assert_eq!(stats.borrowed, 2);
    assert_eq!(stats.in_use(), 0);
}

#[test]
fn test_panic_yields_500_and_route_stays_servable() {
    let server = Server::new();
    server.bind_object("/journal", Journal, None).unwrap();

    let mut req = HandlerRequest::new(Method::GET, "/journal/explode");
    let resp = server.handle(&mut req);
    assert_eq!(resp.status, 500);
    assert!(resp.body["error"].as_str().unwrap().contains("handler exploded"));
    // Shut still runs after a handler fault
    assert_eq!(req.get_param("log"), Some(&json!(["init", "handler", "shut"])));

    let mut req = HandlerRequest::new(Method::GET, "/journal/explode");
    assert_eq!(server.handle(&mut req).status, 500);

    let mut req = HandlerRequest::new(Method::GET, "/journal/read");
    assert_eq!(server.handle(&mut req).status, 200);

    // The faulted entry went back to the pool and was reused
    let stats = server.pools().metrics()[journal_type()];
    assert_eq!(stats.created, 1);
    assert_eq!(stats.returned, 3);
}

#[test]
fn test_init_fault_skips_handler_but_not_shut() {
    let server = Server::new();
    server.bind_object("/journal", Journal, None).unwrap();

    let mut req =
        HandlerRequest::new(Method::GET, "/journal/read").with_header("x-fail-init", "1");
    let resp = server.handle(&mut req);
    assert_eq!(resp.status, 500);
    assert!(resp.body["error"].as_str().unwrap().starts_with("init phase"));
    assert_eq!(req.get_param("log"), Some(&json!(["init", "shut"])));
}

#[test]
fn test_routes_of_one_type_share_a_pool() {
    let server = Server::new();
    server.bind_object("/a", Journal, Some("Read")).unwrap();
    server.bind_object_method("/b", Journal, "Read").unwrap();

    for target in ["/a/read", "/b", "/a/read"] {
        let mut req = HandlerRequest::new(Method::GET, target);
        assert_eq!(server.handle(&mut req).status, 200);
    }
    assert_eq!(server.pools().len(), 1);
    assert_eq!(server.pools().metrics()[journal_type()].created, 1);
}

#[test]
fn test_idle_instances_expire() {
    let config = ServerConfig {
        pool_idle_timeout_secs: 0,
        ..ServerConfig::default()
    };
    let server = Server::with_config(config);
    server.bind_object("/journal", Journal, None).unwrap();

    for _ in 0..2 {
        let mut req = HandlerRequest::new(Method::GET, "/journal/read");
        server.handle(&mut req);
    }
    let stats = server.pools().metrics()[journal_type()];
    assert_eq!(stats.created, 2);
    assert_eq!(stats.expired, 2);
    assert_eq!(stats.idle, 0);
}

/// Test double counting how many requests are inside one instance at once.
#[derive(Default)]
struct Guarded {
    inside: Arc<AtomicUsize>,
    overlaps: Arc<AtomicUsize>,
}

impl Clone for Guarded {
    fn clone(&self) -> Self {
        // Shared overlap counter, fresh per-instance reentrancy counter
        Self {
            inside: Arc::new(AtomicUsize::new(0)),
            overlaps: Arc::clone(&self.overlaps),
        }
    }
}

impl Guarded {
    fn work(&mut self, req: &mut HandlerRequest) {
        if self.inside.fetch_add(1, Ordering::SeqCst) != 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        std::thread::sleep(Duration::from_millis(2));
        self.inside.fetch_sub(1, Ordering::SeqCst);
        req.write_json(200, json!("ok"));
    }
}

impl ServiceObject for Guarded {
    fn methods(table: &mut MethodTable<Self>) {
        table.method("Work", Self::work);
    }
}

#[test]
fn test_concurrent_requests_never_share_an_instance() {
    let prototype = Guarded::default();
    let overlaps = Arc::clone(&prototype.overlaps);
    let server = Server::new();
    server.bind_object("/guarded", prototype, None).unwrap();

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..25 {
                    let mut req = HandlerRequest::new(Method::GET, "/guarded/work");
                    assert_eq!(server.handle(&mut req).status, 200);
                }
            });
        }
    });

    assert_eq!(overlaps.load(Ordering::SeqCst), 0);
    let stats = server.pools().metrics()[std::any::type_name::<Guarded>()];
    assert_eq!(stats.borrowed, 200);
    assert_eq!(stats.in_use(), 0);
    assert!(stats.created <= 8);
}

#[test]
fn test_shutdown_closes_pools() {
    let server = Server::new();
    server.bind_object("/journal", Journal, None).unwrap();
    let mut req = HandlerRequest::new(Method::GET, "/journal/read");
    server.handle(&mut req);

    assert!(server.is_sweeping());
    server.shutdown();
    assert!(!server.is_sweeping());
    assert_eq!(server.pools().metrics()[journal_type()].idle, 0);
}

#[test]
fn test_idle_instances_expire_without_traffic() {
    let config = ServerConfig {
        pool_idle_timeout_secs: 1,
        ..ServerConfig::default()
    };
    let server = Server::with_config(config);
    server.bind_object("/journal", Journal, None).unwrap();
    let mut req = HandlerRequest::new(Method::GET, "/journal/read");
    server.handle(&mut req);
    assert_eq!(server.pools().metrics()[journal_type()].idle, 1);

    std::thread::sleep(Duration::from_millis(2500));
    let stats = server.pools().metrics()[journal_type()];
    assert_eq!(stats.idle, 0);
    assert_eq!(stats.expired, 1);
}
