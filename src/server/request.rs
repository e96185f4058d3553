use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::Arc;

use super::response::HandlerResponse;
use crate::ids::RequestId;

/// Maximum number of query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Maximum number of headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Stack-allocated parameter storage for the request path.
///
/// Names are `Arc<str>` so repeated names clone in O(1); values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Stack-allocated header storage, same layout as [`ParamVec`].
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Request context handed to every handler method and lifecycle hook.
///
/// This is the single parameter of the handler signature. Handlers write
/// their output into [`HandlerRequest::response`]; request-scoped values that
/// must travel between the init hook, the handler and the shut hook go into
/// the custom parameter map ([`set_param`](Self::set_param)).
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// HTTP method (GET, POST, etc.)
    pub method: Method,
    /// Request path without the query string
    pub path: String,
    /// Host the request was addressed to (used for domain routing)
    pub host: String,
    /// Qualified name of the handler serving this request, set by the router
    pub handler_name: String,
    /// Query string parameters
    pub query_params: ParamVec,
    /// HTTP headers
    pub headers: HeaderVec,
    /// Request body parsed as JSON (if present)
    pub body: Option<Value>,
    /// Response under construction
    pub response: HandlerResponse,
    params: HashMap<String, Value>,
    exited: bool,
}

impl HandlerRequest {
    /// Build a request from a method and a request target (`/path?query`).
    #[must_use]
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };
        Self {
            request_id: RequestId::new(),
            method,
            path: path.to_string(),
            host: String::new(),
            handler_name: String::new(),
            query_params: query.map(parse_query).unwrap_or_default(),
            headers: HeaderVec::new(),
            body: None,
            response: HandlerResponse::default(),
            params: HashMap::new(),
            exited: false,
        }
    }

    #[must_use]
    pub fn with_host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    /// Add a header; an `x-request-id` header also becomes the request id.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if name.eq_ignore_ascii_case("x-request-id") {
            self.request_id = RequestId::from_header_or_new(Some(value));
        }
        self.headers.push((Arc::from(name), value.to_string()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Get a query parameter by name (last occurrence wins)
    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Store a request-scoped custom parameter.
    pub fn set_param(&mut self, name: &str, value: impl Into<Value>) {
        self.params.insert(name.to_string(), value.into());
    }

    #[must_use]
    pub fn get_param(&self, name: &str) -> Option<&Value> {
        self.params.get(name)
    }

    /// Append to an array-valued custom parameter, creating it when absent.
    pub fn push_param(&mut self, name: &str, value: impl Into<Value>) {
        let slot = self
            .params
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        match slot {
            Value::Array(items) => items.push(value.into()),
            other => {
                let previous = other.take();
                *other = Value::Array(vec![previous, value.into()]);
            }
        }
    }

    /// Write a JSON body with the given status.
    pub fn write_json(&mut self, status: u16, body: Value) {
        self.response = HandlerResponse::json(status, body);
    }

    /// Stop processing: when called from an init hook the handler method is
    /// skipped. The shut hook still runs.
    pub fn exit(&mut self) {
        self.exited = true;
    }

    #[must_use]
    pub fn is_exited(&self) -> bool {
        self.exited
    }
}

fn parse_query(query: &str) -> ParamVec {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (Arc::from(decode(name).as_str()), decode(value))
        })
        .collect()
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|cow| cow.into_owned())
        .unwrap_or(spaced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_target_is_split_into_path_and_query() {
        let req = HandlerRequest::new(Method::GET, "/user/list?page=2&q=a%20b&q=c+d");
        assert_eq!(req.path, "/user/list");
        assert_eq!(req.get_query_param("page"), Some("2"));
        assert_eq!(req.get_query_param("q"), Some("c d"));
    }

    #[test]
    fn test_push_param_promotes_scalar_to_array() {
        let mut req = HandlerRequest::new(Method::GET, "/");
        req.set_param("trace", "first");
        req.push_param("trace", "second");
        assert_eq!(req.get_param("trace"), Some(&json!(["first", "second"])));
    }

    #[test]
    fn test_request_id_header_is_honoured() {
        let id = RequestId::new();
        let req = HandlerRequest::new(Method::GET, "/").with_header("X-Request-Id", &id.to_string());
        assert_eq!(req.request_id, id);
        assert_eq!(req.get_header("x-request-id"), Some(id.to_string().as_str()));
    }
}
