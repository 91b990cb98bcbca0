//! Bundled middleware.
//!
//! # Data Flow
//! ```text
//! request → request_id.rs (adopt or mint an ID, echo it back)
//!         → access_log.rs (time the rest of the chain, log + metrics)
//!         → recovery.rs  (catch panics below, answer 500)
//!         → application handlers
//! ```
//!
//! # Design Decisions
//! - Middleware are ordinary handlers; there is no separate middleware
//!   trait or registration path
//! - Everything here is optional; `App::new` installs none of it

pub mod access_log;
pub mod recovery;
pub mod request_id;

pub use access_log::AccessLog;
pub use recovery::Recovery;
pub use request_id::RequestId;
