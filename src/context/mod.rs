//! Request-scoped state.
//!
//! Everything a handler touches during one request lives here: the context
//! itself, its route parameters, the typed store, cookie and body binding
//! helpers, the write-once response lane, and the pool that recycles
//! contexts between requests.

pub mod binding;
pub mod context;
pub mod cookie;
pub mod params;
pub mod pool;
pub mod response;
pub mod store;

pub use binding::BindError;
pub use context::{Context, RequestParts};
pub use cookie::Cookie;
pub use params::{Param, Params};
pub use pool::ContextPool;
pub use response::{BufferSink, BufferedResponse, ResponseHandle, ResponseSink};
pub use store::Store;
