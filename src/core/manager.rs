// Copyright (c) 2026 layergraph contributors
// SPDX-License-Identifier: MIT

//! Layer manager: the registry that starts, stops, and joins an entire
//! graph as one system. See §4.7 in `SPEC_FULL.md`.
//!
//! Graph construction (the `make_*` functions in [`super::builder`]) wires
//! ports and `Layer`s but doesn't start anything; each constructor hands
//! the manager a boxed "starter" closure instead of spawning a thread
//! directly. `start_all` allocates the one [`StopEvent`] every layer in the
//! graph shares, freezes every port against further subscription, then runs
//! the starters in registration order — mirroring the teacher's
//! register-then-start-all-at-once graph lifecycle.

use super::host::HostRunner;
use super::layer::{LayerOutput, StopEvent};

type Starter = Box<dyn FnOnce(StopEvent) -> HostRunner + Send>;

struct PendingLayer {
    name: String,
    output: LayerOutput,
    starter: Starter,
}

pub struct LayerManager {
    stop_event: StopEvent,
    pending: Vec<PendingLayer>,
    runners: Vec<HostRunner>,
    started: bool,
}

impl LayerManager {
    pub fn new() -> Self {
        Self {
            stop_event: StopEvent::new(),
            pending: Vec::new(),
            runners: Vec::new(),
            started: false,
        }
    }

    /// The stop event shared by every layer this manager will start. Graph
    /// builders clone this into each `Layer` they construct.
    pub fn stop_event(&self) -> StopEvent {
        self.stop_event.clone()
    }

    /// Register a not-yet-started layer. `starter` is called once, at
    /// `start_all`, with the manager's shared stop event, and must return
    /// the host actually running the layer's loop.
    pub(crate) fn add_layer(
        &mut self,
        name: impl Into<String>,
        output: LayerOutput,
        starter: Starter,
    ) {
        self.pending.push(PendingLayer {
            name: name.into(),
            output,
            starter,
        });
    }

    /// Freeze every registered layer's output ports, then start each layer
    /// in registration order. Panics if called twice.
    pub fn start_all(&mut self) {
        assert!(!self.started, "LayerManager::start_all called twice");
        self.started = true;

        for layer in &self.pending {
            layer.output.freeze();
        }

        for layer in self.pending.drain(..) {
            tracing::info!(layer = %layer.name, "starting");
            self.runners.push((layer.starter)(self.stop_event.clone()));
        }
    }

    /// Signal every layer to stop at the next opportunity. Does not block;
    /// call `join_all` afterward to wait for shutdown to complete.
    pub fn stop_all(&self) {
        tracing::info!("stopping all layers");
        self.stop_event.set();
    }

    /// Block until every started layer's host has finished.
    pub fn join_all(&mut self) {
        for runner in self.runners.drain(..) {
            runner.join();
        }
    }

    pub fn is_started(&self) -> bool {
        self.started
    }
}

impl Default for LayerManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::item::Item;
    use crate::core::layer::Layer;
    use crate::core::output::SinglePortSink;
    use crate::core::port::Port;
    use crate::core::producer::InputSource;
    use std::sync::atomic::AtomicU64;
    use std::sync::Arc;
    use std::time::Duration;

    struct FireThenStop(Option<i32>);
    impl InputSource for FireThenStop {
        fn get_input(&mut self) -> Item {
            match self.0.take() {
                Some(v) => Item::data(v),
                None => Item::Stop,
            }
        }
    }

    #[test]
    fn start_all_freezes_ports_and_runs_registered_layers() {
        let mut manager = LayerManager::new();
        let port = Arc::new(Port::new("out"));
        let rx = port.subscribe().unwrap();
        let output = LayerOutput::Single(port.clone());
        let counter = Arc::new(AtomicU64::new(0));
        let counter_for_layer = counter.clone();

        manager.add_layer(
            "producer",
            output,
            Box::new(move |stop_event| {
                let layer = Layer::new(
                    "producer",
                    Box::new(FireThenStop(Some(7))),
                    Box::new(|item: Item| item),
                    Box::new(SinglePortSink::new(port)),
                    Box::new(crate::core::layer::NoHooks),
                    None,
                    stop_event,
                    counter_for_layer,
                    Duration::from_secs(1),
                );
                HostRunner::thread("producer", layer)
            }),
        );

        manager.start_all();

        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2))
                .unwrap()
                .downcast_ref::<i32>(),
            Some(&7)
        );
        assert!(rx.recv_timeout(Duration::from_secs(2)).unwrap().is_stop());

        manager.join_all();
        assert_eq!(counter.load(std::sync::atomic::Ordering::Acquire), 1);
    }

    #[test]
    #[should_panic(expected = "start_all called twice")]
    fn start_all_twice_panics() {
        let mut manager = LayerManager::new();
        manager.start_all();
        manager.start_all();
    }
}
