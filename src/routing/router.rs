//! Route registration and the routing step of the handler chain.
//!
//! # Responsibilities
//! - Keep one route tree per HTTP method and register paths into them
//! - Offer verb helpers and prefix groups with their own middleware
//! - Merge another router's routes into this one
//! - Act as the terminal element of the installed chain: look up the
//!   request, bind parameters, splice the matched handlers, or answer 404
//!
//! # Data Flow
//! ```text
//! build time:   router.get("/users/:id", show_user)
//!                   └─ trees[GET].insert(["users", ":id"], chain)
//! request time: chain = [global middleware…, router]
//!                   router.call: match → set_params → splice_chain
//!                   cursor keeps walking into the spliced handlers
//! ```
//!
//! # Design Decisions
//! - Methods never fall back to each other; a POST to a GET-only path is a
//!   routing miss
//! - A group snapshots its middleware list when a route is registered;
//!   middleware added to the group afterwards only affects later routes
//! - The built-in miss response is plain text so it stays distinct from
//!   the JSON error envelope handlers emit on purpose

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use tracing::debug;

use crate::context::Context;
use crate::handler::{chain, handler, Handler};
use crate::observability::metrics;
use crate::routing::tree::{RouteMatch, RouteTree};

pub struct Router {
    trees: HashMap<Method, RouteTree>,
    slash_insensitive: bool,
}

impl Router {
    /// A router that keeps `/foo` and `/foo/` distinct.
    pub fn new() -> Self {
        Self::with_slash_insensitive(false)
    }

    /// `slash_insensitive` folds empty segments away, so `/foo/` routes
    /// like `/foo`.
    pub fn with_slash_insensitive(slash_insensitive: bool) -> Self {
        Self {
            trees: HashMap::new(),
            slash_insensitive,
        }
    }

    fn tree_mut(&mut self, method: Method) -> &mut RouteTree {
        let slash_insensitive = self.slash_insensitive;
        self.trees
            .entry(method)
            .or_insert_with(|| RouteTree::new(slash_insensitive))
    }

    /// Register a full handler chain. Registering the same method and path
    /// again replaces the earlier chain.
    pub fn handle(&mut self, method: Method, path: &str, handlers: Vec<Arc<dyn Handler>>) {
        self.tree_mut(method).insert(path, chain(handlers));
    }

    pub fn get<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.handle(Method::GET, path, vec![handler(h)]);
    }

    pub fn post<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.handle(Method::POST, path, vec![handler(h)]);
    }

    pub fn put<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.handle(Method::PUT, path, vec![handler(h)]);
    }

    pub fn delete<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.handle(Method::DELETE, path, vec![handler(h)]);
    }

    pub fn patch<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.handle(Method::PATCH, path, vec![handler(h)]);
    }

    pub fn options<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.handle(Method::OPTIONS, path, vec![handler(h)]);
    }

    pub fn head<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.handle(Method::HEAD, path, vec![handler(h)]);
    }

    /// Open a prefix group. Routes registered through it get the prefix
    /// prepended and the group's middleware run before their handler.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        RouteGroup {
            router: self,
            prefix: prefix.to_string(),
            middleware: Vec::new(),
        }
    }

    /// Adopt every route of `other`. Where both routers registered the
    /// same method and path, `other`'s chain wins.
    pub fn merge(&mut self, other: Router) {
        for (method, tree) in other.trees {
            self.tree_mut(method).merge(tree);
        }
    }

    /// Look a request up without dispatching it.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.trees.get(method).and_then(|tree| tree.match_path(path))
    }

    pub fn route_count(&self) -> usize {
        self.trees.values().map(RouteTree::route_count).sum()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Handler for Router {
    fn call(&self, ctx: &mut Context) {
        let matched = self
            .trees
            .get(ctx.method())
            .and_then(|tree| tree.match_path(ctx.path()));
        match matched {
            Some(found) => {
                ctx.set_params(found.params);
                ctx.splice_chain(&found.chain);
            }
            None => {
                debug!(method = %ctx.method(), path = %ctx.path(), "No route matched");
                metrics::record_unmatched(ctx.method());
                ctx.send_string(StatusCode::NOT_FOUND, "404 Not Found");
                ctx.abort();
            }
        }
    }
}

/// A registration view over a router: shared prefix, shared middleware.
pub struct RouteGroup<'r> {
    router: &'r mut Router,
    prefix: String,
    middleware: Vec<Arc<dyn Handler>>,
}

impl<'r> RouteGroup<'r> {
    /// Append middleware for routes registered after this call.
    pub fn use_middleware<H: Handler + 'static>(&mut self, mw: H) -> &mut Self {
        self.middleware.push(handler(mw));
        self
    }

    /// A child group under this one. It inherits the middleware registered
    /// so far; later additions to the parent do not reach it.
    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        RouteGroup {
            prefix: join_paths(&self.prefix, prefix),
            middleware: self.middleware.clone(),
            router: self.router,
        }
    }

    pub fn handle<H: Handler + 'static>(&mut self, method: Method, path: &str, h: H) {
        let mut handlers = self.middleware.clone();
        handlers.push(handler(h));
        let full = join_paths(&self.prefix, path);
        self.router.handle(method, &full, handlers);
    }

    pub fn get<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.handle(Method::GET, path, h);
    }

    pub fn post<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.handle(Method::POST, path, h);
    }

    pub fn put<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.handle(Method::PUT, path, h);
    }

    pub fn delete<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.handle(Method::DELETE, path, h);
    }

    pub fn patch<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.handle(Method::PATCH, path, h);
    }

    pub fn options<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.handle(Method::OPTIONS, path, h);
    }

    pub fn head<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.handle(Method::HEAD, path, h);
    }
}

/// Join a group prefix and a route path with exactly one slash between
/// them, preserving a trailing slash on `path`.
fn join_paths(prefix: &str, path: &str) -> String {
    if path.is_empty() {
        return prefix.to_string();
    }
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::context::response::BufferSink;
    use crate::context::RequestParts;

    fn tagging(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> impl Handler {
        let log = Arc::clone(log);
        move |_ctx: &mut Context| {
            log.lock().unwrap().push(tag);
        }
    }

    fn dispatch(router: &Arc<Router>, method: Method, path: &str) -> (Context, BufferSink) {
        let sink = BufferSink::new();
        let mut ctx = Context::new();
        ctx.reset(RequestParts::new(method, path), Box::new(sink.clone()));
        ctx.install_chain(&chain(vec![Arc::clone(router) as Arc<dyn Handler>]));
        ctx.next();
        ctx.seal_response();
        (ctx, sink)
    }

    #[test]
    fn test_verb_registration_dispatches_matching_method_only() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = Router::new();
        router.get("/things", tagging(&log, "get"));
        router.post("/things", tagging(&log, "post"));
        let router = Arc::new(router);

        dispatch(&router, Method::POST, "/things");
        assert_eq!(*log.lock().unwrap(), vec!["post"]);

        let (_ctx, sink) = dispatch(&router, Method::DELETE, "/things");
        assert_eq!(sink.take_parts().status, Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_matched_params_are_bound_before_handler_runs() {
        let seen = Arc::new(Mutex::new(String::new()));
        let mut router = Router::new();
        {
            let seen = Arc::clone(&seen);
            router.get("/users/:id", move |ctx: &mut Context| {
                *seen.lock().unwrap() = ctx.param("id").unwrap_or("").to_string();
            });
        }
        dispatch(&Arc::new(router), Method::GET, "/users/42");
        assert_eq!(*seen.lock().unwrap(), "42");
    }

    #[test]
    fn test_routing_miss_answers_plain_text_404_and_aborts() {
        let router = Arc::new(Router::new());
        let (ctx, sink) = dispatch(&router, Method::GET, "/nowhere");

        assert!(ctx.is_aborted());
        let parts = sink.take_parts();
        assert_eq!(parts.status, Some(StatusCode::NOT_FOUND));
        assert_eq!(parts.headers.get("content-type").unwrap(), "text/plain");
        assert_eq!(parts.body, b"404 Not Found");
    }

    #[test]
    fn test_group_prefixes_and_middleware_wrap_routes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = Router::new();
        {
            let mut api = router.group("/api");
            api.use_middleware(tagging(&log, "api-mw"));
            api.get("/users", tagging(&log, "users"));
        }
        let router = Arc::new(router);

        dispatch(&router, Method::GET, "/api/users");
        assert_eq!(*log.lock().unwrap(), vec!["api-mw", "users"]);

        let (_ctx, sink) = dispatch(&router, Method::GET, "/users");
        assert_eq!(sink.take_parts().status, Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_nested_groups_stack_prefix_and_middleware() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = Router::new();
        {
            let mut api = router.group("/api");
            api.use_middleware(tagging(&log, "api-mw"));
            let mut v1 = api.group("/v1");
            v1.use_middleware(tagging(&log, "v1-mw"));
            v1.get("/users", tagging(&log, "users"));
        }
        dispatch(&Arc::new(router), Method::GET, "/api/v1/users");
        assert_eq!(*log.lock().unwrap(), vec!["api-mw", "v1-mw", "users"]);
    }

    #[test]
    fn test_middleware_added_after_registration_only_affects_later_routes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = Router::new();
        {
            let mut api = router.group("/api");
            api.get("/early", tagging(&log, "early"));
            api.use_middleware(tagging(&log, "late-mw"));
            api.get("/late", tagging(&log, "late"));
        }
        let router = Arc::new(router);

        dispatch(&router, Method::GET, "/api/early");
        assert_eq!(*log.lock().unwrap(), vec!["early"]);

        log.lock().unwrap().clear();
        dispatch(&router, Method::GET, "/api/late");
        assert_eq!(*log.lock().unwrap(), vec!["late-mw", "late"]);
    }

    #[test]
    fn test_same_prefix_groups_keep_separate_middleware() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = Router::new();
        {
            let mut first = router.group("/api");
            first.use_middleware(tagging(&log, "first-mw"));
            first.get("/a", tagging(&log, "a"));
        }
        {
            let mut second = router.group("/api");
            second.use_middleware(tagging(&log, "second-mw"));
            second.get("/b", tagging(&log, "b"));
        }
        let router = Arc::new(router);

        dispatch(&router, Method::GET, "/api/a");
        assert_eq!(*log.lock().unwrap(), vec!["first-mw", "a"]);

        log.lock().unwrap().clear();
        dispatch(&router, Method::GET, "/api/b");
        assert_eq!(*log.lock().unwrap(), vec!["second-mw", "b"]);
    }

    #[test]
    fn test_merge_adopts_routes_and_prefers_merged_in_conflicts() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut base = Router::new();
        base.get("/only-base", tagging(&log, "base"));
        base.get("/dup", tagging(&log, "base-dup"));

        let mut extra = Router::new();
        extra.get("/only-extra", tagging(&log, "extra"));
        extra.get("/dup", tagging(&log, "extra-dup"));
        extra.post("/created", tagging(&log, "created"));

        base.merge(extra);
        assert_eq!(base.route_count(), 4);
        let base = Arc::new(base);

        dispatch(&base, Method::GET, "/only-base");
        dispatch(&base, Method::GET, "/only-extra");
        dispatch(&base, Method::GET, "/dup");
        dispatch(&base, Method::POST, "/created");
        assert_eq!(
            *log.lock().unwrap(),
            vec!["base", "extra", "extra-dup", "created"]
        );
    }

    #[test]
    fn test_lookup_reports_chain_without_dispatching() {
        let mut router = Router::new();
        router.get("/users/:id", |_ctx: &mut Context| {});

        let found = router.lookup(&Method::GET, "/users/7").unwrap();
        assert_eq!(found.params.get("id"), Some("7"));
        assert!(router.lookup(&Method::POST, "/users/7").is_none());
    }

    #[test]
    fn test_join_paths_normalizes_separators() {
        assert_eq!(join_paths("/api", "/users"), "/api/users");
        assert_eq!(join_paths("/api/", "users"), "/api/users");
        assert_eq!(join_paths("/api", "users/"), "/api/users/");
        assert_eq!(join_paths("", "/users"), "/users");
        assert_eq!(join_paths("/api", ""), "/api");
    }

    #[test]
    fn test_slash_insensitive_router_folds_trailing_slash() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut router = Router::with_slash_insensitive(true);
        router.get("/things", tagging(&log, "things"));
        let router = Arc::new(router);

        dispatch(&router, Method::GET, "/things/");
        assert_eq!(*log.lock().unwrap(), vec!["things"]);
    }
}
