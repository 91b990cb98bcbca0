//! Application assembly: routes, middleware, configuration.
//!
//! # Responsibilities
//! - Collect global middleware in registration order
//! - Expose route registration (verbs, groups, merge) on the router
//! - Freeze into a [`Dispatcher`] once setup is done
//!
//! # Design Decisions
//! - `App::new` installs no middleware; the bundled request ID, access log
//!   and recovery handlers are opt-in

use std::sync::Arc;

use http::Method;

use crate::config::EngineConfig;
use crate::engine::dispatch::Dispatcher;
use crate::handler::{handler, Handler};
use crate::routing::{RouteGroup, Router};

pub struct App {
    router: Router,
    middleware: Vec<Arc<dyn Handler>>,
    config: EngineConfig,
}

impl App {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            router: Router::with_slash_insensitive(config.routing.slash_insensitive),
            middleware: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Append middleware that runs before routing on every request,
    /// including requests that end up matching no route.
    pub fn use_middleware<H: Handler + 'static>(&mut self, mw: H) -> &mut Self {
        self.middleware.push(handler(mw));
        self
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    pub fn group(&mut self, prefix: &str) -> RouteGroup<'_> {
        self.router.group(prefix)
    }

    /// Adopt every route of `other`; its registrations win on conflict.
    pub fn merge(&mut self, other: Router) {
        self.router.merge(other);
    }

    pub fn handle<H: Handler + 'static>(&mut self, method: Method, path: &str, h: H) {
        self.router.handle(method, path, vec![handler(h)]);
    }

    pub fn get<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.router.get(path, h);
    }

    pub fn post<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.router.post(path, h);
    }

    pub fn put<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.router.put(path, h);
    }

    pub fn delete<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.router.delete(path, h);
    }

    pub fn patch<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.router.patch(path, h);
    }

    pub fn options<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.router.options(path, h);
    }

    pub fn head<H: Handler + 'static>(&mut self, path: &str, h: H) {
        self.router.head(path, h);
    }

    pub fn route_count(&self) -> usize {
        self.router.route_count()
    }

    /// Freeze registration and produce the shared request-phase engine.
    pub fn into_dispatcher(self) -> Dispatcher {
        Dispatcher::new(self.router, self.middleware, self.config.pool.max_idle)
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}
