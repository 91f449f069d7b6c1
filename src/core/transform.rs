//! Trigger policies: deciding when a transform layer has a tick's worth of
//! input, and which samples to consume. See §4.5 in `SPEC_FULL.md`.

use std::collections::HashMap;
use std::time::Duration;

use crossbeam_channel::{Receiver, TryRecvError};
use serde::{Deserialize, Serialize};

use super::error::{LayerError, Result};
use super::item::{Item, Payload, PortMap};

/// Cap on `Fastest`'s exponential backoff. The original implementation
/// doubles unboundedly; we cap it to bound shutdown latency — a documented
/// deviation (see `SPEC_FULL.md` §4.5 and §9).
const FASTEST_BACKOFF_CAP: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Trigger {
    /// Block on every key, in order. Default.
    #[default]
    Slowest,
    /// Exponential backoff poll; first key with data wins the tick.
    Fastest,
    /// Block on the named key; other keys contribute only if immediately
    /// available.
    Layer { key: String },
    /// Sleep the given duration, then non-blockingly sample every key.
    Timer {
        #[serde(with = "duration_millis")]
        interval: Duration,
    },
}

mod duration_millis {
    use super::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

/// The input side of a transform layer: an ordered set of keyed receivers,
/// sampled according to a [`Trigger`] policy.
pub struct TransformSource {
    keys: Vec<String>,
    inputs: HashMap<String, Receiver<Item>>,
    trigger: Trigger,
    discard_old: bool,
}

impl TransformSource {
    pub fn new(trigger: Trigger, discard_old: bool) -> Result<Self> {
        if let Trigger::Layer { key } = &trigger {
            if key.is_empty() {
                return Err(LayerError::InvalidTrigger(
                    "Layer trigger key must not be empty".into(),
                ));
            }
        }
        Ok(Self {
            keys: Vec::new(),
            inputs: HashMap::new(),
            trigger,
            discard_old,
        })
    }

    /// Add a keyed input edge. `key` must not already be in use.
    pub fn add_input(&mut self, key: impl Into<String>, rx: Receiver<Item>) -> Result<()> {
        let key = key.into();
        if self.inputs.contains_key(&key) {
            return Err(LayerError::InputKeyCollision(key));
        }
        self.keys.push(key.clone());
        self.inputs.insert(key, rx);
        Ok(())
    }

    /// Validate that a `Layer` trigger's key names one of the registered
    /// inputs. Called once all inputs are wired, before the layer starts.
    pub fn validate(&self) -> Result<()> {
        if let Trigger::Layer { key } = &self.trigger {
            if !self.keys.contains(key) {
                return Err(LayerError::InvalidTrigger(format!(
                    "trigger key '{key}' is not one of the layer's inputs"
                )));
            }
        }
        Ok(())
    }

    /// Run one tick of the configured policy. Returns `Item::Stop` if any
    /// blocking receive observed the stop sentinel (propagated rather than
    /// embedded in the map), `Item::None` if the map ended up empty under
    /// `Fastest`'s terminal no-op case, or `Item::Data` wrapping either the
    /// raw single sub-item (when the only key is `"default"`) or the full
    /// [`PortMap`].
    pub fn get_input(&self) -> Item {
        let map = match &self.trigger {
            Trigger::Slowest => self.poll_slowest(),
            Trigger::Fastest => self.poll_fastest(),
            Trigger::Layer { key } => self.poll_layer(key),
            Trigger::Timer { interval } => self.poll_timer(*interval),
        };
        match map {
            PollOutcome::Stop => Item::Stop,
            PollOutcome::Map(map) => self.wrap(map),
        }
    }

    fn wrap(&self, map: PortMap) -> Item {
        if self.keys.len() == 1 && self.keys[0] == "default" {
            match map.into_iter().next() {
                Some((_, payload)) => Item::Data(payload),
                None => Item::None,
            }
        } else {
            Item::Data(std::sync::Arc::new(map))
        }
    }

    fn poll_slowest(&self) -> PollOutcome {
        let mut map = PortMap::new();
        for key in &self.keys {
            let rx = &self.inputs[key];
            let item = match rx.recv() {
                Ok(item) => item,
                Err(_) => return PollOutcome::Stop,
            };
            if item.is_stop() {
                return PollOutcome::Stop;
            }
            if let Item::Data(payload) = item {
                map.insert(key.clone(), payload);
            }
            if self.discard_old {
                drain_keep_last(rx, &mut map, key);
            }
        }
        PollOutcome::Map(map)
    }

    fn poll_fastest(&self) -> PollOutcome {
        let mut sleep = Duration::from_millis(1);
        loop {
            for key in &self.keys {
                let rx = &self.inputs[key];
                match rx.try_recv() {
                    Ok(item) => {
                        if item.is_stop() {
                            return PollOutcome::Stop;
                        }
                        if let Item::Data(payload) = item {
                            let mut map = PortMap::new();
                            map.insert(key.clone(), payload);
                            return PollOutcome::Map(map);
                        }
                    }
                    Err(TryRecvError::Empty) => {}
                    Err(TryRecvError::Disconnected) => return PollOutcome::Stop,
                }
            }
            std::thread::sleep(sleep);
            sleep = (sleep * 2).min(FASTEST_BACKOFF_CAP);
        }
    }

    fn poll_layer(&self, trigger_key: &str) -> PollOutcome {
        let rx = &self.inputs[trigger_key];
        let mut map = PortMap::new();
        match rx.recv() {
            Ok(item) => {
                if item.is_stop() {
                    return PollOutcome::Stop;
                }
                if let Item::Data(payload) = item {
                    map.insert(trigger_key.to_string(), payload);
                }
            }
            Err(_) => return PollOutcome::Stop,
        }

        for key in &self.keys {
            if key == trigger_key {
                continue;
            }
            let rx = &self.inputs[key];
            if self.discard_old {
                drain_keep_last(rx, &mut map, key);
            } else if let Ok(Item::Data(payload)) = rx.try_recv() {
                map.insert(key.clone(), payload);
            }
        }
        PollOutcome::Map(map)
    }

    fn poll_timer(&self, interval: Duration) -> PollOutcome {
        std::thread::sleep(interval);
        let mut map = PortMap::new();
        for key in &self.keys {
            let rx = &self.inputs[key];
            if self.discard_old {
                drain_keep_last(rx, &mut map, key);
            } else if let Ok(Item::Data(payload)) = rx.try_recv() {
                map.insert(key.clone(), payload);
            }
        }
        PollOutcome::Map(map)
    }
}

impl super::producer::InputSource for TransformSource {
    fn get_input(&mut self) -> Item {
        TransformSource::get_input(self)
    }
}

enum PollOutcome {
    Map(PortMap),
    Stop,
}

/// Drain every immediately-available item on `rx`, keeping only the last
/// one (the `discard_old` behavior). Leaves whatever was already in `map`
/// untouched if nothing was available.
fn drain_keep_last(rx: &Receiver<Item>, map: &mut PortMap, key: &str) {
    while let Ok(item) = rx.try_recv() {
        if let Item::Data(payload) = item {
            map.insert(key.to_string(), payload);
        }
    }
}

/// Helper for tests/producers that want to hand a plain value as a `Data`
/// payload without reaching into [`Item`] directly.
pub fn data_payload<T: std::any::Any + Send + Sync + 'static>(value: T) -> Payload {
    std::sync::Arc::new(value)
}
