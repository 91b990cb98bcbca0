//! Context recycling between requests.
//!
//! # Responsibilities
//! - Hand out a context per request, reusing a retired one when available
//! - Cap how many idle contexts are kept so bursts do not pin memory
//! - Refuse to recycle contexts that finished in a suspect state
//!
//! # Design Decisions
//! - The caller resets the context it acquires; the pool never hands out
//!   request state, only the allocation behind it
//! - A released context whose response lane was never sealed is dropped
//!   instead of pooled. That only happens when dispatch was cut short, and
//!   a fresh allocation is cheaper than reasoning about the leftover

use std::sync::Mutex;

use tracing::debug;

use crate::context::context::Context;

pub struct ContextPool {
    idle: Mutex<Vec<Box<Context>>>,
    max_idle: usize,
}

impl ContextPool {
    pub fn new(max_idle: usize) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(max_idle)),
            max_idle,
        }
    }

    /// Pop an idle context or allocate a fresh one. The returned context
    /// still carries retired state; callers must `reset` it before use.
    pub fn acquire(&self) -> Box<Context> {
        let mut idle = self.idle.lock().unwrap_or_else(|p| p.into_inner());
        match idle.pop() {
            Some(ctx) => ctx,
            None => Box::new(Context::new()),
        }
    }

    /// Return a context after dispatch. Unsealed contexts are discarded.
    pub fn release(&self, ctx: Box<Context>) {
        if !ctx.response_sealed() {
            debug!("Discarding context released before its response was sealed");
            return;
        }
        let mut idle = self.idle.lock().unwrap_or_else(|p| p.into_inner());
        if idle.len() < self.max_idle {
            idle.push(ctx);
        }
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}
