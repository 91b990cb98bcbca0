//! Panic recovery.
//!
//! Catches panics from anything later in the chain, logs them with the
//! request ID, and answers a generic 500 so one bad handler does not take
//! the response (or the worker) down with it. The panic message never
//! reaches the client.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::error;

use crate::context::Context;
use crate::handler::Handler;
use crate::observability::metrics;

pub struct Recovery;

impl Handler for Recovery {
    fn call(&self, ctx: &mut Context) {
        let outcome = catch_unwind(AssertUnwindSafe(|| ctx.next()));
        if let Err(payload) = outcome {
            error!(
                request_id = %ctx.request_id(),
                method = %ctx.method(),
                path = %ctx.path(),
                panic = panic_text(&*payload),
                "Handler panicked"
            );
            metrics::record_panic();
            if ctx.response_flushed() {
                ctx.abort();
            } else {
                ctx.internal_server_error("");
            }
        }
    }
}

fn panic_text(payload: &(dyn Any + Send)) -> &str {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        text
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.as_str()
    } else {
        "non-string panic payload"
    }
}
