// Copyright (c) 2026 layergraph contributors
// SPDX-License-Identifier: MIT

//! Process execution host.
//!
//! A process-hosted layer runs in a child of the current executable, not a
//! thread of it. Rust can't pickle a closure the way `multiprocessing` does,
//! so the graph-construction closure that builds the child's sub-layers
//! must be registered ahead of time, by name, with [`register_process_entry`];
//! the parent spawns `current_exe()` with a marker env var naming the entry,
//! and [`run_child_if_requested`] — which the embedder calls at the very top
//! of `main`, before building the parent's own graph — looks the name up and
//! runs it instead of falling through. Ported from `streamlib`'s
//! `subprocess::process_handle::ProcessHandle` (spawn/is_running/wait/kill).
//! Edges that cross the boundary are carried over the child's stdin/stdout
//! pipes, framed per [`super::super::ipc`].

use std::collections::HashMap;
use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;

use parking_lot::Mutex;

use super::super::error::{LayerError, Result};

pub type ProcessEntryFn = fn();

/// Env var whose presence (set to an entry id) marks this process as a
/// process-host child rather than the top-level graph.
pub const PROCESS_MARKER_ENV: &str = "LAYERGRAPH_PROCESS_ENTRY";

fn registry() -> &'static Mutex<HashMap<String, ProcessEntryFn>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, ProcessEntryFn>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Register a graph-construction entry point under `id`. Call this before
/// [`LayerManager::start_all`](crate::core::manager::LayerManager::start_all)
/// for any layer hosted on a process — typically at the top of `main`,
/// alongside [`run_child_if_requested`].
pub fn register_process_entry(id: impl Into<String>, entry: ProcessEntryFn) {
    registry().lock().insert(id.into(), entry);
}

/// If [`PROCESS_MARKER_ENV`] names a registered entry, run it and exit the
/// process — this call never returns in that case. Returns `false` (and
/// does nothing) for the top-level parent process. Call this as the first
/// statement in `main`.
pub fn run_child_if_requested() -> bool {
    let Ok(id) = std::env::var(PROCESS_MARKER_ENV) else {
        return false;
    };
    let entry = registry().lock().get(&id).copied();
    match entry {
        Some(entry) => {
            tracing::info!(entry = %id, "process host child starting");
            entry();
            tracing::info!(entry = %id, "process host child exiting");
            std::process::exit(0);
        }
        None => {
            tracing::error!(entry = %id, "process host child: no such registered entry");
            std::process::exit(1);
        }
    }
}

/// A running process-hosted layer: a child re-exec of the current binary,
/// with its stdin/stdout piped for [`ipc`](super::super::ipc)-framed
/// item traffic.
pub struct ProcessHost {
    entry_id: String,
    child: Child,
}

impl ProcessHost {
    pub fn spawn(entry_id: impl Into<String>) -> Result<Self> {
        let entry_id = entry_id.into();
        let exe = std::env::current_exe()?;
        let child = Command::new(exe)
            .env(PROCESS_MARKER_ENV, &entry_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()?;
        tracing::info!(entry = %entry_id, pid = child.id(), "spawned process host");
        Ok(Self { entry_id, child })
    }

    /// Take the child's stdin/stdout for IPC bridging. Each may only be
    /// taken once; a second call returns `None`.
    pub fn stdin(&mut self) -> Option<std::process::ChildStdin> {
        self.child.stdin.take()
    }

    pub fn stdout(&mut self) -> Option<std::process::ChildStdout> {
        self.child.stdout.take()
    }

    pub fn is_running(&mut self) -> bool {
        self.child.try_wait().ok().flatten().is_none()
    }

    pub fn join(mut self) {
        match self.child.wait() {
            Ok(status) => {
                tracing::info!(entry = %self.entry_id, ?status, "process host exited");
            }
            Err(e) => {
                tracing::error!(entry = %self.entry_id, error = %e, "failed to wait on process host");
            }
        }
    }

    pub fn kill(&mut self) -> Result<()> {
        tracing::warn!(entry = %self.entry_id, "force killing process host");
        self.child.kill().map_err(LayerError::from)
    }
}

impl Drop for ProcessHost {
    fn drop(&mut self) {
        if self.is_running() {
            tracing::warn!(entry = %self.entry_id, "ProcessHost dropped while still running, killing");
            let _ = self.child.kill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_entry() {}

    #[test]
    fn register_and_lookup_roundtrip() {
        register_process_entry("test::noop", noop_entry);
        assert!(registry().lock().contains_key("test::noop"));
    }

    #[test]
    fn run_child_if_requested_is_false_without_marker() {
        std::env::remove_var(PROCESS_MARKER_ENV);
        assert!(!run_child_if_requested());
    }
}
