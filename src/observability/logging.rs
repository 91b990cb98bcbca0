//! Structured logging setup.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber for binaries that want one
//! - Respect `RUST_LOG` when set, fall back to the configured level
//!
//! # Design Decisions
//! - The engine itself only emits through the `tracing` macros; calling
//!   this is strictly optional and library embedders usually have their
//!   own subscriber already

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a stdout subscriber filtered at `log_level` for this crate.
///
/// Panics if a global subscriber is already set, so binaries call it once
/// at startup and libraries never call it.
pub fn init(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("switchback={log_level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
