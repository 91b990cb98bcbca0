//! Handler abstraction shared by middleware and route handlers.
//!
//! # Design Decisions
//! - One trait for everything invoked with a Context; a plain closure and a
//!   struct with state both qualify
//! - Handlers signal "continue" by returning and "stop" by calling
//!   `Context::abort` before returning
//! - Chains are `Arc` slices so trees and routers can hand them out without
//!   copying handler state

use std::sync::Arc;

use crate::context::Context;

/// Anything that can run as one step of a request's handler chain.
pub trait Handler: Send + Sync {
    /// Execute this handler against the current request.
    fn call(&self, ctx: &mut Context);
}

impl<F> Handler for F
where
    F: Fn(&mut Context) + Send + Sync,
{
    fn call(&self, ctx: &mut Context) {
        self(ctx)
    }
}

/// An ordered, immutable sequence of handlers attached to a route.
pub type HandlerChain = Arc<[Arc<dyn Handler>]>;

/// Wrap a closure or handler struct for registration.
pub fn handler<H>(h: H) -> Arc<dyn Handler>
where
    H: Handler + 'static,
{
    Arc::new(h)
}

/// Freeze an ordered handler list into a chain.
pub fn chain(handlers: Vec<Arc<dyn Handler>>) -> HandlerChain {
    handlers.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Tagger;

    impl Handler for Tagger {
        fn call(&self, ctx: &mut Context) {
            ctx.store().set("tag", "struct");
        }
    }

    #[test]
    fn test_closure_and_struct_both_satisfy_handler() {
        let from_closure = handler(|ctx: &mut Context| {
            ctx.store().set("tag", "closure");
        });
        let from_struct = handler(Tagger);

        let mut ctx = Context::for_testing();
        from_closure.call(&mut ctx);
        assert_eq!(ctx.store().get::<&str>("tag"), Some("closure"));

        from_struct.call(&mut ctx);
        assert_eq!(ctx.store().get::<&str>("tag"), Some("struct"));
    }

    #[test]
    fn test_chain_preserves_order() {
        let chain = chain(vec![
            handler(|ctx: &mut Context| ctx.store().set("first", true)),
            handler(|ctx: &mut Context| ctx.store().set("second", true)),
        ]);
        assert_eq!(chain.len(), 2);
    }
}
