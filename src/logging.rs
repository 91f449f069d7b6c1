// Copyright (c) 2026 layergraph contributors
// SPDX-License-Identifier: MIT

//! Thin `tracing-subscriber` init helper for embedders, following the
//! teacher's own logging setup in `bin/streamlib-mcp.rs` (`fmt()` +
//! `stderr` writer). The core itself never installs a subscriber — only
//! an embedder's `main` should call this, once, before building the graph.

use tracing_subscriber::EnvFilter;

/// Installs a `tracing_subscriber::fmt` subscriber honoring `RUST_LOG`
/// (defaulting to `info` when unset). Returns `Err` if a global subscriber
/// is already installed — safe to ignore in tests that may call this more
/// than once across the binary's lifetime.
pub fn init_tracing() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
}
