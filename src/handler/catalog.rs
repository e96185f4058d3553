//! Per-type method tables and the scans that pick routable methods.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, error};

use super::signature::{is_handler_signature, HandlerFn, HookFn, IntoMethod, Signature};
use crate::router::is_http_method;
use crate::server::HandlerRequest;

/// Method names that are lifecycle hooks and never routable in a scan.
pub const RESERVED_METHODS: [&str; 2] = ["Init", "Shut"];

/// A service object: a value whose methods become route endpoints.
///
/// Every bound type gets its own instance pool; instances are produced by
/// cloning the object passed at bind time, so `Clone` must give an
/// independent value.
///
/// ```rust
/// use objroute::handler::{MethodTable, ServiceObject};
/// use objroute::server::HandlerRequest;
///
/// #[derive(Clone, Default)]
/// struct User;
///
/// impl User {
///     fn index(&mut self, req: &mut HandlerRequest) {
///         req.write_json(200, serde_json::json!({ "users": [] }));
///     }
/// }
///
/// impl ServiceObject for User {
///     fn methods(table: &mut MethodTable<Self>) {
///         table.method("Index", Self::index);
///     }
/// }
/// ```
pub trait ServiceObject: Clone + Send + Sync + 'static {
    /// Publish the methods of this type, in the order they should be scanned.
    fn methods(table: &mut MethodTable<Self>);

    /// Short type name used for `{.struct}` and in logs.
    #[must_use]
    fn type_name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }
}

/// Pre-handler lifecycle hook, attached with [`MethodTable::init_hook`].
pub trait InitHook {
    fn init(&mut self, req: &mut HandlerRequest);
}

/// Post-handler lifecycle hook, attached with [`MethodTable::shut_hook`].
pub trait ShutHook {
    fn shut(&mut self, req: &mut HandlerRequest);
}

/// `a::b::User<X>` → `User`
#[must_use]
pub fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Exact, case-sensitive match against [`RESERVED_METHODS`].
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED_METHODS.iter().any(|r| *r == name)
}

/// One published method.
pub struct MethodDescriptor<T> {
    name: Arc<str>,
    signature: Signature,
    call: Option<HandlerFn<T>>,
}

impl<T> MethodDescriptor<T> {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The callable, present only for handler-shaped methods.
    #[must_use]
    pub fn handler(&self) -> Option<&HandlerFn<T>> {
        self.call.as_ref()
    }

    #[must_use]
    pub fn is_handler(&self) -> bool {
        self.call.is_some() && is_handler_signature(&self.signature)
    }
}

/// Everything the binder and the dispatcher know about a type's methods.
pub struct MethodTable<T> {
    type_name: &'static str,
    methods: Vec<MethodDescriptor<T>>,
    index: HashMap<Arc<str>, usize>,
    init: Option<HookFn<T>>,
    shut: Option<HookFn<T>>,
}

impl<T: 'static> Default for MethodTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> MethodTable<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            methods: Vec::new(),
            index: HashMap::new(),
            init: None,
            shut: None,
        }
    }

    /// Build the table a service type publishes.
    #[must_use]
    pub fn for_type() -> Self
    where
        T: ServiceObject,
    {
        let mut table = Self::new();
        T::methods(&mut table);
        table
    }

    /// Publish a method under `name`. Any shape is accepted here; only the
    /// handler shape is routable. Re-publishing a name replaces it in place.
    pub fn method<M>(&mut self, name: &str, method: impl IntoMethod<T, M>) -> &mut Self {
        let shape = method.into_shape();
        let descriptor = MethodDescriptor {
            name: Arc::from(name),
            signature: shape.signature,
            call: shape.call,
        };
        match self.index.get(name) {
            Some(&pos) => self.methods[pos] = descriptor,
            None => {
                self.index.insert(Arc::clone(&descriptor.name), self.methods.len());
                self.methods.push(descriptor);
            }
        }
        self
    }

    /// Run [`InitHook::init`] before every handler call on this type.
    pub fn init_hook(&mut self) -> &mut Self
    where
        T: InitHook,
    {
        self.init = Some(Arc::new(|obj: &mut T, req: &mut HandlerRequest| obj.init(req)));
        self
    }

    /// Run [`ShutHook::shut`] after every handler call on this type.
    pub fn shut_hook(&mut self) -> &mut Self
    where
        T: ShutHook,
    {
        self.shut = Some(Arc::new(|obj: &mut T, req: &mut HandlerRequest| obj.shut(req)));
        self
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MethodDescriptor<T>> {
        self.index.get(name).map(|&pos| &self.methods[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodDescriptor<T>> {
        self.methods.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    #[must_use]
    pub fn init(&self) -> Option<&HookFn<T>> {
        self.init.as_ref()
    }

    #[must_use]
    pub fn shut(&self) -> Option<&HookFn<T>> {
        self.shut.as_ref()
    }

    /// Full Rust path of `T`.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Diagnostic name of a method: `crate::module::Type::Method`.
    #[must_use]
    pub fn qualified_name(&self, method: &str) -> String {
        format!("{}::{}", self.type_name, method)
    }
}

/// Caller-supplied restriction on which methods a whole-object bind picks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodFilter {
    names: HashSet<String>,
}

impl MethodFilter {
    /// Parse a comma-separated, case-sensitive list. Blank input means no filter.
    #[must_use]
    pub fn parse(list: &str) -> Option<Self> {
        let names: HashSet<String> = list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        if names.is_empty() {
            None
        } else {
            Some(Self { names })
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }
}

/// How loudly a skipped method was reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The caller asked for this method; it could not be bound.
    Error,
    /// Skipped during an unrestricted scan.
    Debug,
}

/// A method the scan refused to route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub method: String,
    pub qualified_name: String,
    pub signature: Signature,
    pub severity: Severity,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} defined as \"{}\", but \"{}\" is required",
            self.qualified_name,
            self.signature,
            Signature::handler()
        )
    }
}

/// Result of a scan: routable methods in table order plus rejections.
pub struct Scan<'a, T> {
    pub selected: Vec<&'a MethodDescriptor<T>>,
    pub rejected: Vec<Rejection>,
}

fn reject<T: 'static>(
    table: &MethodTable<T>,
    descriptor: &MethodDescriptor<T>,
    severity: Severity,
) -> Rejection {
    let rejection = Rejection {
        method: descriptor.name().to_string(),
        qualified_name: table.qualified_name(descriptor.name()),
        signature: descriptor.signature().clone(),
        severity,
    };
    match severity {
        Severity::Error => error!(
            handler_name = %rejection.qualified_name,
            signature = %rejection.signature,
            "Invalid route method for object registry"
        ),
        Severity::Debug => debug!(
            handler_name = %rejection.qualified_name,
            signature = %rejection.signature,
            "Ignoring non-handler method during object scan"
        ),
    }
    rejection
}

/// Whole-object scan: every published method except the lifecycle names,
/// optionally restricted by `filter`.
#[must_use]
pub fn scan_object<'a, T: 'static>(
    table: &'a MethodTable<T>,
    filter: Option<&MethodFilter>,
) -> Scan<'a, T> {
    let mut scan = Scan {
        selected: Vec::new(),
        rejected: Vec::new(),
    };
    for descriptor in table.iter() {
        if filter.is_some_and(|f| !f.contains(descriptor.name())) {
            continue;
        }
        if is_reserved(descriptor.name()) {
            continue;
        }
        if descriptor.is_handler() {
            scan.selected.push(descriptor);
        } else {
            let severity = if filter.is_some() {
                Severity::Error
            } else {
                Severity::Debug
            };
            scan.rejected.push(reject(table, descriptor, severity));
        }
    }
    scan
}

/// REST scan: only methods named after an HTTP verb.
#[must_use]
pub fn scan_rest<T: 'static>(table: &MethodTable<T>) -> Scan<'_, T> {
    let mut scan = Scan {
        selected: Vec::new(),
        rejected: Vec::new(),
    };
    for descriptor in table.iter().filter(|d| is_http_method(d.name())) {
        if descriptor.is_handler() {
            scan.selected.push(descriptor);
        } else {
            scan.rejected.push(reject(table, descriptor, Severity::Error));
        }
    }
    scan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone)]
    struct Catalogue;

    impl Catalogue {
        fn index(&mut self, _req: &mut HandlerRequest) {}
        fn show(&mut self, _req: &mut HandlerRequest) {}
        fn count(&mut self, _req: &mut HandlerRequest) -> usize {
            0
        }
        fn get(&mut self, _req: &mut HandlerRequest) {}
        fn init(&mut self, _req: &mut HandlerRequest) {}
    }

    impl ServiceObject for Catalogue {
        fn methods(table: &mut MethodTable<Self>) {
            table
                .method("Index", Self::index)
                .method("Show", Self::show)
                .method("Count", Self::count)
                .method("Get", Self::get)
                .method("Init", Self::init);
        }
    }

    fn names<T>(scan: &Scan<'_, T>) -> Vec<String> {
        scan.selected.iter().map(|d| d.name().to_string()).collect()
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("a::b::User"), "User");
        assert_eq!(short_type_name("a::Wrapper<a::b::Inner>"), "Wrapper");
        assert_eq!(short_type_name("User"), "User");
        assert_eq!(Catalogue::type_name(), "Catalogue");
    }

    #[test]
    fn test_unrestricted_scan_skips_reserved_and_non_handlers() {
        let table = MethodTable::<Catalogue>::for_type();
        let scan = scan_object(&table, None);
        assert_eq!(names(&scan), vec!["Index", "Show", "Get"]);
        assert_eq!(scan.rejected.len(), 1);
        assert_eq!(scan.rejected[0].method, "Count");
        assert_eq!(scan.rejected[0].severity, Severity::Debug);
    }

    #[test]
    fn test_filtered_scan_reports_requested_mismatch_as_error() {
        let table = MethodTable::<Catalogue>::for_type();
        let filter = MethodFilter::parse(" Show , Count ");
        let scan = scan_object(&table, filter.as_ref());
        assert_eq!(names(&scan), vec!["Show"]);
        assert_eq!(scan.rejected.len(), 1);
        assert_eq!(scan.rejected[0].severity, Severity::Error);
    }

    #[test]
    fn test_filter_is_case_sensitive_and_blank_means_none() {
        assert!(MethodFilter::parse(" , ").is_none());
        let filter = MethodFilter::parse("show").expect("filter");
        assert!(!filter.contains("Show"));
    }

    #[test]
    fn test_reserved_names_are_case_sensitive() {
        assert!(is_reserved("Init"));
        assert!(is_reserved("Shut"));
        assert!(!is_reserved("init"));
        assert!(!is_reserved("SHUT"));

        let mut table = MethodTable::<Catalogue>::new();
        table
            .method("Init", Catalogue::init)
            .method("init", Catalogue::show);
        let scan = scan_object(&table, None);
        assert_eq!(names(&scan), vec!["init"]);
    }

    #[test]
    fn test_rest_scan_only_picks_verbs() {
        let table = MethodTable::<Catalogue>::for_type();
        let scan = scan_rest(&table);
        assert_eq!(names(&scan), vec!["Get"]);
        assert!(scan.rejected.is_empty());
    }

    #[test]
    fn test_republishing_replaces_in_place() {
        let mut table = MethodTable::<Catalogue>::new();
        table
            .method("Show", Catalogue::count)
            .method("Index", Catalogue::index)
            .method("Show", Catalogue::show);
        assert_eq!(table.len(), 2);
        assert!(table.get("Show").is_some_and(MethodDescriptor::is_handler));
        assert_eq!(table.iter().next().map(MethodDescriptor::name), Some("Show"));
    }
}
