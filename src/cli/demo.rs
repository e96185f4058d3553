//! Service objects bound by the CLI.

use serde_json::json;

use crate::handler::{InitHook, MethodTable, ServiceObject, ShutHook};
use crate::middleware::TracingMiddleware;
use crate::server::{HandlerRequest, Server};
use std::sync::Arc;

#[derive(Clone)]
pub struct UserService {
    greeting: String,
    served: u64,
}

impl Default for UserService {
    fn default() -> Self {
        Self {
            greeting: "hello".to_string(),
            served: 0,
        }
    }
}

impl UserService {
    fn index(&mut self, req: &mut HandlerRequest) {
        req.write_json(
            200,
            json!({
                "users": ["ada", "grace", "linus"],
                "served_by_instance": self.served,
            }),
        );
    }

    fn show(&mut self, req: &mut HandlerRequest) {
        let name = req.get_query_param("name").unwrap_or("anonymous").to_string();
        req.write_json(200, json!({ "message": format!("{} {}", self.greeting, name) }));
    }

    fn count(&mut self, _req: &mut HandlerRequest) -> u64 {
        self.served
    }
}

impl InitHook for UserService {
    fn init(&mut self, req: &mut HandlerRequest) {
        self.served += 1;
        req.set_param("instance_requests", self.served);
    }
}

impl ShutHook for UserService {
    fn shut(&mut self, req: &mut HandlerRequest) {
        let id = req.request_id.to_string();
        req.response.set_header("x-request-id", id);
    }
}

impl ServiceObject for UserService {
    fn methods(table: &mut MethodTable<Self>) {
        table
            .method("Index", Self::index)
            .method("Show", Self::show)
            .method("Count", Self::count)
            .init_hook()
            .shut_hook();
    }
}

#[derive(Clone, Default)]
pub struct ArticleRest;

impl ArticleRest {
    fn get(&mut self, req: &mut HandlerRequest) {
        let id = req.get_query_param("id").unwrap_or("1").to_string();
        req.write_json(200, json!({ "id": id, "title": "Pooled handlers" }));
    }

    fn post(&mut self, req: &mut HandlerRequest) {
        let body = req.body.clone().unwrap_or_default();
        req.write_json(201, json!({ "created": body }));
    }

    fn delete(&mut self, req: &mut HandlerRequest) {
        req.write_json(204, serde_json::Value::Null);
    }

    fn archive(&mut self, req: &mut HandlerRequest) {
        req.write_json(200, json!({ "archived": true }));
    }
}

impl ServiceObject for ArticleRest {
    fn methods(table: &mut MethodTable<Self>) {
        table
            .method("Get", Self::get)
            .method("Post", Self::post)
            .method("Delete", Self::delete)
            .method("Archive", Self::archive);
    }
}

/// Bind the demo objects:
///
/// - `UserService` on `/user` (whole object, `Count` is skipped)
/// - `UserService::Show` on `/{.struct}/profile`
/// - `ArticleRest` on `/article` (REST verbs only)
pub fn bind_demo(server: &Server) -> anyhow::Result<()> {
    let binder = server
        .binder()
        .middleware(Arc::new(TracingMiddleware))
        .source("demo");
    binder.bind_object("/user", UserService::default(), None)?;
    binder.bind_object_method("/{.struct}/profile", UserService::default(), "Show")?;
    binder.bind_object_rest("/article", ArticleRest)?;
    Ok(())
}
