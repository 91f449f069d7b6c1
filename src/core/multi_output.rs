//! Dynamic multi-output port set.
//!
//! A multi-output layer owns a declared table (ports registered up front)
//! and an auto table (ports created lazily the first time a downstream
//! consumer asks for a name nobody registered). Emitting a [`PortMap`]
//! fans each named sub-item out to its port, then forwards the whole map
//! on the layer's ordinary default output port — see §4.2 in `SPEC_FULL.md`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::error::{LayerError, Result};
use super::item::{Item, PortMap};
use super::port::Port;

pub struct MultiOutputPorts {
    declared: Mutex<HashMap<String, Arc<Port>>>,
    auto: Mutex<HashMap<String, Arc<Port>>>,
    default: Arc<Port>,
    frozen: AtomicBool,
}

impl MultiOutputPorts {
    pub fn new(default: Arc<Port>, declared_names: &[&str]) -> Result<Self> {
        let mut declared = HashMap::new();
        for name in declared_names {
            if declared
                .insert(name.to_string(), Arc::new(Port::new(*name)))
                .is_some()
            {
                return Err(LayerError::DuplicatePort(name.to_string()));
            }
        }
        Ok(Self {
            declared: Mutex::new(declared),
            auto: Mutex::new(HashMap::new()),
            default,
            frozen: AtomicBool::new(false),
        })
    }

    /// Explicitly register a port ahead of time. Errors if already present
    /// in either table.
    pub fn register_port(&self, name: &str) -> Result<()> {
        if self.declared.lock().contains_key(name) || self.auto.lock().contains_key(name) {
            return Err(LayerError::DuplicatePort(name.to_string()));
        }
        self.declared
            .lock()
            .insert(name.to_string(), Arc::new(Port::new(name)));
        Ok(())
    }

    /// Look up a port by name, auto-creating it on first request. A port
    /// created after [`freeze`](Self::freeze) has already run is frozen on
    /// construction, so a name discovered late never opens a window for a
    /// post-start subscription.
    pub fn get_port(&self, name: &str) -> Arc<Port> {
        if let Some(port) = self.declared.lock().get(name) {
            return port.clone();
        }
        let mut auto = self.auto.lock();
        auto.entry(name.to_string())
            .or_insert_with(|| {
                let port = Arc::new(Port::new(name));
                if self.frozen.load(Ordering::Acquire) {
                    port.freeze();
                }
                port
            })
            .clone()
    }

    pub fn default_port(&self) -> &Arc<Port> {
        &self.default
    }

    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
        self.default.freeze();
        for port in self.declared.lock().values() {
            port.freeze();
        }
        for port in self.auto.lock().values() {
            port.freeze();
        }
    }

    /// Forward each sub-item in `map` to its named port (declared ∪ auto),
    /// skipping keys that have no matching port, then forward the whole map
    /// on the default output. `None` sub-items present in the map are also
    /// forwarded as `Item::None`, i.e. silently dropped by that port.
    pub fn emit(&self, map: PortMap) {
        let declared = self.declared.lock();
        let auto = self.auto.lock();
        for (name, port) in declared.iter().chain(auto.iter()) {
            if let Some(sub_item) = map.get(name) {
                port.emit(Item::Data(sub_item.clone()));
            }
        }
        drop(declared);
        drop(auto);
        self.default.emit(Item::Data(Arc::new(map)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_payload(value: &str) -> Arc<dyn std::any::Any + Send + Sync> {
        Arc::new(value.to_string())
    }

    #[test]
    fn declared_port_receives_its_key_only() {
        let ports = MultiOutputPorts::new(Arc::new(Port::new("default")), &["a", "b"]).unwrap();
        let rx_a = ports.get_port("a").subscribe().unwrap();
        let rx_b = ports.get_port("b").subscribe().unwrap();

        let mut map = PortMap::new();
        map.insert("a".to_string(), string_payload("1"));
        ports.emit(map);

        assert_eq!(
            rx_a.recv().unwrap().downcast_ref::<String>(),
            Some(&"1".to_string())
        );
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn auto_port_created_lazily() {
        let ports = MultiOutputPorts::new(Arc::new(Port::new("default")), &[]).unwrap();
        let rx_c = ports.get_port("c").subscribe().unwrap();

        let mut map = PortMap::new();
        map.insert("c".to_string(), string_payload("auto"));
        ports.emit(map);

        assert_eq!(
            rx_c.recv().unwrap().downcast_ref::<String>(),
            Some(&"auto".to_string())
        );
    }

    #[test]
    fn default_port_receives_whole_map() {
        let default = Arc::new(Port::new("default"));
        let ports = MultiOutputPorts::new(default.clone(), &["a"]).unwrap();
        let rx_default = default.subscribe().unwrap();

        let mut map = PortMap::new();
        map.insert("a".to_string(), string_payload("1"));
        ports.emit(map);

        let item = rx_default.recv().unwrap();
        let recovered = item.downcast_ref::<PortMap>().unwrap();
        assert_eq!(
            recovered.get("a").unwrap().downcast_ref::<String>(),
            Some(&"1".to_string())
        );
    }

    #[test]
    fn auto_port_created_after_freeze_rejects_subscription() {
        let ports = MultiOutputPorts::new(Arc::new(Port::new("default")), &[]).unwrap();
        ports.freeze();

        let late_port = ports.get_port("late");
        match late_port.subscribe() {
            Err(LayerError::PortFrozen(name)) => assert_eq!(name, "late"),
            other => panic!("expected PortFrozen, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_register_fails() {
        let ports = MultiOutputPorts::new(Arc::new(Port::new("default")), &["a"]).unwrap();
        match ports.register_port("a") {
            Err(LayerError::DuplicatePort(name)) => assert_eq!(name, "a"),
            other => panic!("expected DuplicatePort, got {other:?}"),
        }
    }
}
