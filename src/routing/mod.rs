//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (build phase):
//!     router.get("/users/:id", handler)
//!     → path.rs (split into segments, classify each)
//!     → tree.rs (descend/extend the method's tree, attach the chain)
//!
//! Lookup (request phase, read-only):
//!     method + path
//!     → tree.rs (segment walk: static, then param, then catch-all)
//!     → Return: matched chain + bound params, or no match
//! ```
//!
//! # Design Decisions
//! - One tree per HTTP method; methods never share or fall back
//! - Nodes live in a flat arena indexed by id, so lookup walks without
//!   pointer chasing or locks
//! - Deterministic: same method and path always match the same route

pub mod path;
pub mod router;
pub mod tree;

pub use router::{RouteGroup, Router};
pub use tree::{RouteMatch, RouteTree};
