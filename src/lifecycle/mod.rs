//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, drain, close
//! - Draining has a grace deadline; connections past it are abandoned

pub mod shutdown;

pub use shutdown::{ConnectionGuard, ConnectionTracker, Shutdown};
