// Copyright (c) 2026 layergraph contributors
// SPDX-License-Identifier: MIT

//! Fan-out queue hub.
//!
//! A [`Port`] owns an append-only set of subscriber queues. `emit` duplicates
//! every non-[`Item::None`] item to each subscriber; `subscribe` hands a
//! fresh downstream consumer its own receiver. Subscribing after the graph
//! has started returns [`LayerError::PortFrozen`] — see the "subscriber-set
//! freezing" design note in `SPEC_FULL.md`.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use super::error::{LayerError, Result};
use super::item::Item;

pub struct Port {
    name: String,
    subscribers: Mutex<Vec<Sender<Item>>>,
    frozen: AtomicBool,
}

impl Port {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subscribers: Mutex::new(Vec::new()),
            frozen: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a new subscriber. Must happen before the owning
    /// [`LayerManager`](super::manager::LayerManager) freezes the graph.
    pub fn subscribe(&self) -> Result<Receiver<Item>> {
        if self.frozen.load(Ordering::Acquire) {
            return Err(LayerError::PortFrozen(self.name.clone()));
        }
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers.lock().push(tx);
        Ok(rx)
    }

    /// Called by the layer manager once, at `start_all`, so that no further
    /// subscriptions can race with the first emission.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    /// `Item::None` is a no-op; everything else is duplicated to every
    /// subscriber in subscription order. Send failures (a subscriber that
    /// dropped its receiver) are logged and otherwise ignored — a detached
    /// consumer simply stops receiving.
    pub fn emit(&self, item: Item) {
        if item.is_none() {
            return;
        }
        let subscribers = self.subscribers.lock();
        for (idx, tx) in subscribers.iter().enumerate() {
            if tx.send(item.clone()).is_err() {
                tracing::debug!(port = %self.name, subscriber = idx, "subscriber dropped, skipping");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
