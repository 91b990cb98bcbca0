//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (hyper, HTTP/1.1 and HTTP/2 auto-detected)
//!     → body collected under the configured cap
//!     → engine dispatch (blocking pool)
//!     → buffered response sent to client
//! ```

pub mod server;

pub use server::Server;
