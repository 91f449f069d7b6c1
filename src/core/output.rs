//! Output side of a layer: where a transform result goes once produced.

use std::sync::Arc;

use super::item::Item;
use super::multi_output::MultiOutputPorts;
use super::port::Port;

pub trait OutputSink: Send {
    fn emit(&self, item: Item);
    fn freeze(&self);
}

/// The ordinary case: one layer, one output port.
pub struct SinglePortSink {
    port: Arc<Port>,
}

impl SinglePortSink {
    pub fn new(port: Arc<Port>) -> Self {
        Self { port }
    }

    pub fn port(&self) -> &Arc<Port> {
        &self.port
    }
}

impl OutputSink for SinglePortSink {
    fn emit(&self, item: Item) {
        self.port.emit(item);
    }

    fn freeze(&self) {
        self.port.freeze();
    }
}

/// Multi-output case: dispatches a `PortMap` to named ports and the default
/// port. Non-map items (shouldn't normally occur for a multi-output
/// transform, but `None`/`Stop` do pass through) go straight to the default
/// port.
pub struct MultiOutputSink {
    ports: Arc<MultiOutputPorts>,
}

impl MultiOutputSink {
    pub fn new(ports: Arc<MultiOutputPorts>) -> Self {
        Self { ports }
    }

    pub fn ports(&self) -> &Arc<MultiOutputPorts> {
        &self.ports
    }
}

impl OutputSink for MultiOutputSink {
    fn emit(&self, item: Item) {
        match item {
            Item::Data(payload) => match payload.downcast::<super::item::PortMap>() {
                Ok(map) => self
                    .ports
                    .emit(Arc::try_unwrap(map).unwrap_or_else(|shared| (*shared).clone())),
                Err(payload) => self.ports.default_port().emit(Item::Data(payload)),
            },
            other => self.ports.default_port().emit(other),
        }
    }

    fn freeze(&self) {
        self.ports.freeze();
    }
}
