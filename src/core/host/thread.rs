// Copyright (c) 2026 layergraph contributors
// SPDX-License-Identifier: MIT

//! Thread execution host. Ported from `streamlib`'s
//! `execution::thread_runner::run_processor_loop` pattern: a named OS
//! thread, one per layer, running to completion and logging a teardown
//! message on the way out.

use std::any::Any;
use std::thread::JoinHandle;

use super::super::layer::Layer;

pub struct ThreadHost {
    name: String,
    handle: Option<JoinHandle<()>>,
}

impl ThreadHost {
    pub fn spawn(name: impl Into<String>, mut layer: Layer) -> Self {
        let name = name.into();
        let handle = std::thread::Builder::new()
            .name(name.clone())
            .spawn(move || layer.run())
            .expect("failed to spawn layer thread");
        Self {
            name,
            handle: Some(handle),
        }
    }

    /// Block until the layer's loop returns. A panicked layer is logged,
    /// not propagated — the rest of the graph's threads are left running;
    /// callers that need panic-is-fatal semantics should check
    /// [`HostRunner::is_running`](super::HostRunner::is_running) after stop.
    pub fn join(mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        if let Err(panic) = handle.join() {
            tracing::error!(
                layer = %self.name,
                panic = %panic_message(&panic),
                "layer thread panicked"
            );
        }
    }

    pub fn is_running(&mut self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
