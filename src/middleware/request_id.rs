//! Request ID propagation.
//!
//! Adopts an inbound `X-Request-ID` when the client sent one, otherwise
//! keeps the ID the context minted, and echoes it on the response so
//! callers can correlate logs.

use crate::context::Context;
use crate::handler::Handler;

pub struct RequestId;

impl Handler for RequestId {
    fn call(&self, ctx: &mut Context) {
        let inbound = ctx
            .header("x-request-id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string);
        if let Some(id) = inbound {
            ctx.set_request_id(id);
        }
        ctx.set_header("x-request-id", ctx.request_id());
        ctx.next();
    }
}
