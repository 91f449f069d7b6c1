//! Out-of-band control messages.
//!
//! Small, user-defined control messages a layer can receive alongside its
//! normal data input. The core only plumbs these through; their meaning is
//! entirely up to `handle_signal`.

use std::any::Any;
use std::sync::Arc;

pub type Signal = Arc<dyn Any + Send + Sync>;

pub fn signal<T: Any + Send + Sync + 'static>(value: T) -> Signal {
    Arc::new(value)
}
