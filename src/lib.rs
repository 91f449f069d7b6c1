//! `layergraph` — a realtime dataflow runtime.
//!
//! A graph of [`core::layer::Layer`]s connected by [`core::port::Port`]s.
//! Each layer runs on its own thread or process, pulling input from
//! upstream layers according to a [`core::transform::Trigger`] policy and
//! pushing results to fan-out queues.
//!
//! See `SPEC_FULL.md` in the repository root for the full design.

pub mod core;
pub mod logging;

pub use crate::core::error::{LayerError, Result};
pub use crate::core::item::{Item, Payload, PortMap};
pub use crate::logging::init_tracing;

pub mod prelude {
    pub use crate::core::builder::{
        make_merge, make_multi_output, make_multi_shot, make_one_shot, make_process_producer,
        make_producer, make_producer_with_hooks, make_transform, make_transform_with_hooks,
    };
    pub use crate::core::error::{LayerError, Result};
    pub use crate::core::host::{register_process_entry, run_child_if_requested};
    pub use crate::core::item::{Item, Payload, PortMap};
    pub use crate::core::layer::{LayerHandle, LayerHooks, NoHooks};
    pub use crate::core::manager::LayerManager;
    pub use crate::core::signal::signal;
    pub use crate::core::transform::Trigger;
    pub use crate::logging::init_tracing;
}
