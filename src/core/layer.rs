//! Layer base: lifecycle, the processing loop, FPS accounting, and the
//! stop/signal protocol. See §4.3 in `SPEC_FULL.md`; ported from
//! `pyrealtime`'s `BaseLayer.process_loop`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use super::item::Item;
use super::multi_output::MultiOutputPorts;
use super::output::OutputSink;
use super::port::Port;
use super::producer::InputSource;
use super::signal::Signal;

/// Shared shutdown flag. Any layer (or the manager) can set it; every
/// layer's loop observes it between ticks.
#[derive(Clone, Default)]
pub struct StopEvent(Arc<AtomicBool>);

impl StopEvent {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Hooks a layer's role/user code can override. All have no-op defaults,
/// matching the teacher's `Processor` trait (`setup`/`teardown` default to
/// `Ok(())`).
pub trait LayerHooks: Send {
    fn initialize(&mut self) {}
    fn post_init(&mut self, _first_item: &Item) {}
    fn handle_signal(&mut self, _signal: Signal) {}
    fn shutdown(&mut self) {}
}

/// No-op hook set for layers that don't need any of the lifecycle callbacks.
pub struct NoHooks;
impl LayerHooks for NoHooks {}

struct FpsTracker {
    window: Duration,
    count: u64,
    start: Instant,
    last_fps: f64,
}

impl FpsTracker {
    fn new(window: Duration) -> Self {
        Self {
            window,
            count: 0,
            start: Instant::now(),
            last_fps: 0.0,
        }
    }

    fn tick(&mut self, name: &str) {
        self.count += 1;
        let elapsed = self.start.elapsed();
        if elapsed >= self.window {
            self.last_fps = self.count as f64 / elapsed.as_secs_f64();
            tracing::debug!(layer = name, fps = self.last_fps, "fps window closed");
            self.count = 0;
            self.start = Instant::now();
        }
    }
}

/// A running layer: one thread (or, inside a process host, one of several
/// threads) executing the loop described in `SPEC_FULL.md` §4.3.
pub struct Layer {
    name: String,
    source: Box<dyn InputSource>,
    transform: Box<dyn FnMut(Item) -> Item + Send>,
    sink: Box<dyn OutputSink>,
    hooks: Box<dyn LayerHooks>,
    signal_in: Option<Receiver<Signal>>,
    stop_event: StopEvent,
    counter: Arc<AtomicU64>,
    fps: Mutex<FpsTracker>,
}

impl Layer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        source: Box<dyn InputSource>,
        transform: Box<dyn FnMut(Item) -> Item + Send>,
        sink: Box<dyn OutputSink>,
        hooks: Box<dyn LayerHooks>,
        signal_in: Option<Receiver<Signal>>,
        stop_event: StopEvent,
        counter: Arc<AtomicU64>,
        time_window: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            transform,
            sink,
            hooks,
            signal_in,
            stop_event,
            counter,
            fps: Mutex::new(FpsTracker::new(time_window)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `initialize()` then the processing loop to completion. Blocking;
    /// callers spawn this on a dedicated thread (see `core::host`).
    pub fn run(&mut self) {
        tracing::info!(layer = %self.name, "initializing");
        self.hooks.initialize();

        let mut is_first = true;
        tracing::info!(layer = %self.name, "running");

        loop {
            if self.stop_event.is_set() {
                break;
            }

            let input = self.source.get_input();

            if input.is_stop() {
                tracing::debug!(layer = %self.name, "observed Stop, shutting down");
                self.stop_event.set();
                break;
            }

            if input.is_none() {
                continue;
            }

            self.drain_signals();

            if is_first {
                self.hooks.post_init(&input);
                is_first = false;
            }

            let result = (self.transform)(input);

            if result.is_none() {
                continue;
            }

            self.sink.emit(result);
            self.fps.lock().tick(&self.name);
            self.counter.fetch_add(1, Ordering::Release);
        }

        tracing::info!(layer = %self.name, "stopping: emitting terminal Stop");
        self.sink.emit(Item::Stop);
        self.hooks.shutdown();
        tracing::info!(layer = %self.name, "shutdown complete");
    }

    fn drain_signals(&mut self) {
        let Some(rx) = &self.signal_in else {
            return;
        };
        while let Ok(signal) = rx.try_recv() {
            self.hooks.handle_signal(signal);
        }
    }

    pub fn counter(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }
}

/// What a caller gets back from a `make_*` constructor: a way to subscribe
/// downstream, and (for multi-output layers) a way to look up named ports.
#[derive(Clone)]
pub enum LayerOutput {
    Single(Arc<Port>),
    Multi(Arc<MultiOutputPorts>),
}

impl LayerOutput {
    pub fn default_port(&self) -> &Arc<Port> {
        match self {
            LayerOutput::Single(port) => port,
            LayerOutput::Multi(ports) => ports.default_port(),
        }
    }

    pub fn get_port(&self, name: &str) -> Option<Arc<Port>> {
        match self {
            LayerOutput::Single(port) if name == "default" => Some(port.clone()),
            LayerOutput::Single(_) => None,
            LayerOutput::Multi(ports) => Some(ports.get_port(name)),
        }
    }

    pub fn freeze(&self) {
        match self {
            LayerOutput::Single(port) => port.freeze(),
            LayerOutput::Multi(ports) => ports.freeze(),
        }
    }
}

/// A handle a graph builder holds onto: names the layer and exposes its
/// output(s) for downstream `make_*` calls to subscribe to. The layer
/// itself isn't started until the owning
/// [`LayerManager`](super::manager::LayerManager) runs `start_all` — the
/// manager, not the handle, owns the host that actually runs it.
pub struct LayerHandle {
    pub(crate) name: String,
    pub(crate) output: LayerOutput,
    pub(crate) counter: Arc<AtomicU64>,
}

impl LayerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn output_port(&self) -> Arc<Port> {
        self.output.default_port().clone()
    }

    pub fn get_port(&self, name: &str) -> Option<Arc<Port>> {
        self.output.get_port(name)
    }

    pub fn counter(&self) -> u64 {
        self.counter.load(Ordering::Acquire)
    }
}
