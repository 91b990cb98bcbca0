//! Per-request access logging.
//!
//! Wraps the rest of the chain, then emits one structured log line and the
//! request metrics once the response is decided.

use std::time::Instant;

use tracing::info;

use crate::context::Context;
use crate::handler::Handler;
use crate::observability::metrics;

pub struct AccessLog;

impl Handler for AccessLog {
    fn call(&self, ctx: &mut Context) {
        let start = Instant::now();
        ctx.next();

        let elapsed = start.elapsed();
        let status = ctx.status();
        info!(
            request_id = %ctx.request_id(),
            method = %ctx.method(),
            path = %ctx.path(),
            status = status.as_u16(),
            elapsed_ms = elapsed.as_millis() as u64,
            bytes = ctx.response_bytes(),
            client_ip = %ctx.client_ip(),
            "Request completed"
        );
        metrics::record_request(ctx.method(), status, elapsed);
    }
}

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};

    use super::*;
    use crate::context::response::BufferSink;
    use crate::context::RequestParts;
    use crate::handler::{chain, handler};

    #[test]
    fn test_wrapped_handler_still_answers() {
        let sink = BufferSink::new();
        let mut ctx = Context::new();
        ctx.reset(
            RequestParts::new(Method::GET, "/ping"),
            Box::new(sink.clone()),
        );
        ctx.install_chain(&chain(vec![
            handler(AccessLog),
            handler(|ctx: &mut Context| ctx.send_string(StatusCode::OK, "pong")),
        ]));
        ctx.next();
        ctx.seal_response();

        let parts = sink.take_parts();
        assert_eq!(parts.status, Some(StatusCode::OK));
        assert_eq!(parts.body, b"pong");
    }
}
