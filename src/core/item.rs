//! Opaque payloads and the two sentinels the core recognizes.
//!
//! The core never inspects a [`Payload`]'s contents, only the [`Item`]
//! variant wrapping it. `None` means "no data this tick, skip"; `Stop`
//! means "shut the graph down". Everything else a producer emits, including
//! domain-level sentinels such as multi-shot's `-1`, is opaque data.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// An opaque, reference-counted payload. Downcast with [`Payload::downcast_ref`]
/// to recover the concrete type a producer or transform emitted.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// A multi-output transform's result: port name -> sub-item.
pub type PortMap = HashMap<String, Payload>;

/// The three outcomes a layer's processing loop ever sees.
#[derive(Clone)]
pub enum Item {
    /// Real data for this tick.
    Data(Payload),
    /// Skip this tick: no data was ready, nothing should be emitted.
    None,
    /// Graph-wide shutdown sentinel. Final item on any port it's emitted on.
    Stop,
}

impl Item {
    /// Wrap any `Send + Sync + 'static` value as a data item.
    pub fn data<T: Any + Send + Sync + 'static>(value: T) -> Self {
        Item::Data(Arc::new(value))
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Item::None)
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Item::Stop)
    }

    /// Downcast the payload to `T`, if this is a `Data` item carrying one.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Item::Data(payload) => payload.downcast_ref::<T>(),
            _ => None,
        }
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Data(_) => write!(f, "Item::Data(..)"),
            Item::None => write!(f, "Item::None"),
            Item::Stop => write!(f, "Item::Stop"),
        }
    }
}
