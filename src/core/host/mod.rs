//! Execution hosts: where a [`Layer`](super::layer::Layer)'s loop actually
//! runs. See §4.6 in `SPEC_FULL.md`.
//!
//! A thread host is the common case — `Layer::run` on a dedicated OS
//! thread, sharing the process's address space and ports directly. A
//! process host buys isolation (a crash or a GIL-bound dependency can't
//! take the rest of the graph down with it) at the cost of needing its
//! edges serialized across the boundary; see [`process`].

mod bridge;
mod process;
mod thread;

pub use bridge::ProcessBridge;
pub use process::{register_process_entry, run_child_if_requested, ProcessHost};
pub use thread::ThreadHost;

use super::layer::Layer;

/// What a [`LayerHandle`](super::layer::LayerHandle) holds to start, stop,
/// and join its layer, whichever host it runs on.
pub enum HostRunner {
    Thread(ThreadHost),
    Process(ProcessHost),
    ProcessBridge(ProcessBridge),
}

impl HostRunner {
    pub fn thread(name: impl Into<String>, layer: Layer) -> Self {
        HostRunner::Thread(ThreadHost::spawn(name, layer))
    }

    pub fn process(entry_id: impl Into<String>) -> super::error::Result<Self> {
        Ok(HostRunner::Process(ProcessHost::spawn(entry_id)?))
    }

    /// Block until the host's layer (or child process) has finished.
    pub fn join(self) {
        match self {
            HostRunner::Thread(host) => host.join(),
            HostRunner::Process(host) => host.join(),
            HostRunner::ProcessBridge(host) => host.join(),
        }
    }

    pub fn is_running(&mut self) -> bool {
        match self {
            HostRunner::Thread(host) => host.is_running(),
            HostRunner::Process(host) => host.is_running(),
            HostRunner::ProcessBridge(host) => host.is_running(),
        }
    }
}
