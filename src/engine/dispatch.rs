//! Request dispatch.
//!
//! # Responsibilities
//! - Run one request through the frozen chain: middleware, then router,
//!   then whatever the router spliced in
//! - Recycle contexts through the pool around each dispatch
//! - Seal the response lane so nothing writes after dispatch returns
//!
//! # Design Decisions
//! - The base chain ends with the router, so a routing miss still passes
//!   through every global middleware on the way in and out
//! - Dispatch takes any [`ResponseSink`]; the bundled server hands in a
//!   buffer, embedders can bring their own

use std::sync::Arc;

use crate::context::{ContextPool, RequestParts, ResponseSink};
use crate::handler::{chain, Handler, HandlerChain};
use crate::observability::metrics;
use crate::routing::Router;

pub struct Dispatcher {
    base_chain: HandlerChain,
    pool: ContextPool,
}

impl Dispatcher {
    pub fn new(router: Router, middleware: Vec<Arc<dyn Handler>>, pool_max_idle: usize) -> Self {
        let mut elements = middleware;
        elements.push(Arc::new(router) as Arc<dyn Handler>);
        Self {
            base_chain: chain(elements),
            pool: ContextPool::new(pool_max_idle),
        }
    }

    /// Run one request to completion and emit the response into `sink`.
    pub fn dispatch(&self, parts: RequestParts, sink: Box<dyn ResponseSink>) {
        let mut ctx = self.pool.acquire();
        ctx.reset(parts, sink);
        ctx.install_chain(&self.base_chain);
        ctx.next();
        ctx.seal_response();
        self.pool.release(ctx);
        metrics::record_pool_idle(self.pool.idle_count());
    }

    pub fn idle_contexts(&self) -> usize {
        self.pool.idle_count()
    }
}
