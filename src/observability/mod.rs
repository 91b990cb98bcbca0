//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms via the metrics facade)
//!
//! Consumers:
//!     → Log aggregation (stdout, file, remote)
//!     → Whatever metrics recorder the embedding host installs
//! ```
//!
//! # Design Decisions
//! - No global logger is owned by the engine; logging goes through the
//!   `tracing` facade and the host picks the subscriber
//! - Metrics go through the `metrics` facade for the same reason; with no
//!   recorder installed the macros are no-ops
//! - Request ID flows through all subsystems as a log field

pub mod logging;
pub mod metrics;
