//! Embeddable HTTP request-routing and dispatch engine.
//!
//! Routes requests through per-method path trees (static, `:param` and
//! `*catch-all` segments), then runs a middleware/handler chain against a
//! pooled per-request [`Context`] with a write-once response lane.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌────────────────────────────────────────────────┐
//!                 │                    ENGINE                       │
//!   Request       │  ┌─────────┐   ┌──────────┐   ┌─────────────┐  │
//!   ──────────────┼─▶│  http   │──▶│  engine  │──▶│   routing   │  │
//!                 │  │ server  │   │ dispatch │   │ tree/router │  │
//!                 │  └─────────┘   └────┬─────┘   └──────┬──────┘  │
//!                 │                     │                │         │
//!                 │                     ▼                ▼         │
//!   Response      │  ┌──────────────────────────────────────────┐  │
//!   ◀─────────────┼──│  context: params · store · response lane │  │
//!                 │  └──────────────────────────────────────────┘  │
//!                 │  ┌──────────────────────────────────────────┐  │
//!                 │  │ cross-cutting: config · middleware ·     │  │
//!                 │  │ lifecycle · observability                │  │
//!                 │  └──────────────────────────────────────────┘  │
//!                 └────────────────────────────────────────────────┘
//! ```
//!
//! The bundled `http::Server` is one possible host; the engine itself is
//! synchronous and host-agnostic. Embedders hand `RequestParts` and a
//! `ResponseSink` to a [`Dispatcher`] and read the buffered response back.

pub mod config;
pub mod context;
pub mod engine;
pub mod handler;
pub mod http;
pub mod lifecycle;
pub mod middleware;
pub mod observability;
pub mod routing;

pub use config::{EngineConfig, load_config};
pub use context::{
    BindError, BufferSink, BufferedResponse, Context, Cookie, Params, RequestParts,
    ResponseHandle, ResponseSink, Store,
};
pub use engine::{App, Dispatcher};
pub use handler::{chain, handler, Handler, HandlerChain};
pub use crate::http::Server;
pub use lifecycle::Shutdown;
pub use routing::{RouteGroup, Router};
