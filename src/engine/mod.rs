//! Engine assembly.
//!
//! # Data Flow
//! ```text
//! Build phase (app.rs):
//!     App::with_config → use_middleware / route registration → freeze
//!
//! Request phase (dispatch.rs):
//!     RequestParts + sink
//!     → pool.acquire → ctx.reset → install [middleware…, router]
//!     → ctx.next (router splices the matched chain)
//!     → seal → pool.release
//! ```
//!
//! # Design Decisions
//! - Freezing the app into a dispatcher separates the mutable build phase
//!   from the shared, immutable request phase
//! - Dispatch is synchronous; hosts decide how to schedule it

pub mod app;
pub mod dispatch;

pub use app::App;
pub use dispatch::Dispatcher;
