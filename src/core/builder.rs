//! Graph construction API: the `make_*` functions an embedder calls to
//! build layers and wire them into a [`LayerManager`]. Every constructor
//! registers a pending layer with the manager rather than starting
//! anything — see `manager`'s module docs.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::Receiver;

use super::error::Result;
use super::host::{HostRunner, ProcessBridge};
use super::item::{Item, Payload};
use super::layer::{Layer, LayerHandle, LayerHooks, LayerOutput, NoHooks};
use super::manager::LayerManager;
use super::multi_output::MultiOutputPorts;
use super::output::{MultiOutputSink, SinglePortSink};
use super::port::Port;
use super::producer::{InputSource, MultiShotProducer, OneShotProducer, RateLimitedProducer};
use super::signal::Signal;
use super::transform::{TransformSource, Trigger};

/// FPS accounting window used by every layer the builder constructs.
/// `SPEC_FULL.md` calls this "configurable"; layers built through these
/// constructors share one default, matching `pyrealtime`'s 1-second window.
const DEFAULT_FPS_WINDOW: Duration = Duration::from_secs(1);

#[allow(clippy::too_many_arguments)]
fn register_thread_layer(
    manager: &mut LayerManager,
    name: String,
    source: Box<dyn InputSource>,
    transform: Box<dyn FnMut(Item) -> Item + Send>,
    sink_port: Arc<Port>,
    hooks: Box<dyn LayerHooks>,
    signal_in: Option<Receiver<Signal>>,
) -> Arc<LayerHandle> {
    let output = LayerOutput::Single(sink_port.clone());
    build_and_register(
        manager,
        name,
        source,
        transform,
        Box::new(SinglePortSink::new(sink_port)),
        output,
        hooks,
        signal_in,
    )
}

#[allow(clippy::too_many_arguments)]
fn build_and_register(
    manager: &mut LayerManager,
    name: String,
    source: Box<dyn InputSource>,
    transform: Box<dyn FnMut(Item) -> Item + Send>,
    sink: Box<dyn super::output::OutputSink>,
    output: LayerOutput,
    hooks: Box<dyn LayerHooks>,
    signal_in: Option<Receiver<Signal>>,
) -> Arc<LayerHandle> {
    let counter = Arc::new(AtomicU64::new(0));
    let handle_counter = counter.clone();
    let handle_name = name.clone();
    let starter_name = name.clone();

    manager.add_layer(
        name,
        output.clone(),
        Box::new(move |stop_event| {
            let layer = Layer::new(
                starter_name.clone(),
                source,
                transform,
                sink,
                hooks,
                signal_in,
                stop_event,
                counter,
                DEFAULT_FPS_WINDOW,
            );
            HostRunner::thread(starter_name, layer)
        }),
    );

    Arc::new(LayerHandle {
        name: handle_name,
        output,
        counter: handle_counter,
    })
}

/// Identity transform: producer-role layers don't transform their input.
fn identity() -> Box<dyn FnMut(Item) -> Item + Send> {
    Box::new(|item: Item| item)
}

/// Adapts a user transform over unwrapped payloads to the `Item`-level
/// closure a `Layer` expects. `None`/`Stop` never reach `f` — the
/// processing loop filters them before calling `transform`.
fn adapt<F>(mut f: F) -> Box<dyn FnMut(Item) -> Item + Send>
where
    F: FnMut(Payload) -> Item + Send + 'static,
{
    Box::new(move |item: Item| match item {
        Item::Data(payload) => f(payload),
        other => other,
    })
}

/// A rate-limited producer: calls `generate(counter)` at `rate` Hz.
pub fn make_producer(
    manager: &mut LayerManager,
    name: impl Into<String>,
    rate: f64,
    generate: impl FnMut(u64) -> Item + Send + 'static,
) -> Arc<LayerHandle> {
    make_producer_with_hooks(manager, name, rate, generate, Box::new(NoHooks), None)
}

/// Same as [`make_producer`], with an explicit [`LayerHooks`] impl and an
/// optional signal-in receiver wired to the layer — the way to reach
/// `post_init`/`handle_signal` from outside the crate. See §4.3 steps 4-5
/// in `SPEC_FULL.md`.
pub fn make_producer_with_hooks(
    manager: &mut LayerManager,
    name: impl Into<String>,
    rate: f64,
    generate: impl FnMut(u64) -> Item + Send + 'static,
    hooks: Box<dyn LayerHooks>,
    signal_in: Option<Receiver<Signal>>,
) -> Arc<LayerHandle> {
    let port = Arc::new(Port::new("default"));
    let source = Box::new(RateLimitedProducer::new(rate, Box::new(generate)));
    register_thread_layer(
        manager,
        name.into(),
        source,
        identity(),
        port,
        hooks,
        signal_in,
    )
}

/// Fires `value` once, then idles forever.
pub fn make_one_shot(
    manager: &mut LayerManager,
    name: impl Into<String>,
    value: Item,
) -> Arc<LayerHandle> {
    let port = Arc::new(Port::new("default"));
    let source = Box::new(OneShotProducer::new(value));
    register_thread_layer(
        manager,
        name.into(),
        source,
        identity(),
        port,
        Box::new(NoHooks),
        None,
    )
}

/// Fires `generate(counter)` `num_shots` times (or `num_shots + 1` with a
/// trailing `-1` sentinel when `finish` is set), calling
/// `completion_handler` once after the last real fire.
pub fn make_multi_shot(
    manager: &mut LayerManager,
    name: impl Into<String>,
    num_shots: u64,
    finish: bool,
    rate: f64,
    generate: impl FnMut(u64) -> Item + Send + 'static,
    completion_handler: impl FnMut() + Send + 'static,
) -> Arc<LayerHandle> {
    let port = Arc::new(Port::new("default"));
    let source = Box::new(MultiShotProducer::new(
        num_shots,
        finish,
        rate,
        Box::new(generate),
        Box::new(completion_handler),
    ));
    register_thread_layer(
        manager,
        name.into(),
        source,
        identity(),
        port,
        Box::new(NoHooks),
        None,
    )
}

/// A transform layer: consumes one or more keyed upstream ports under a
/// [`Trigger`] policy and emits whatever `transform` returns. `inputs` with
/// a single `"default"` key delivers `transform` the raw upstream payload;
/// more than one key delivers the assembled [`PortMap`](super::item::PortMap).
pub fn make_transform(
    manager: &mut LayerManager,
    name: impl Into<String>,
    inputs: &[(&str, &Arc<Port>)],
    trigger: Trigger,
    discard_old: bool,
    transform: impl FnMut(Payload) -> Item + Send + 'static,
) -> Result<Arc<LayerHandle>> {
    make_transform_with_hooks(
        manager,
        name,
        inputs,
        trigger,
        discard_old,
        transform,
        Box::new(NoHooks),
        None,
    )
}

/// Same as [`make_transform`], with an explicit [`LayerHooks`] impl and an
/// optional signal-in receiver wired to the layer.
#[allow(clippy::too_many_arguments)]
pub fn make_transform_with_hooks(
    manager: &mut LayerManager,
    name: impl Into<String>,
    inputs: &[(&str, &Arc<Port>)],
    trigger: Trigger,
    discard_old: bool,
    transform: impl FnMut(Payload) -> Item + Send + 'static,
    hooks: Box<dyn LayerHooks>,
    signal_in: Option<Receiver<Signal>>,
) -> Result<Arc<LayerHandle>> {
    let name = name.into();
    let mut source = TransformSource::new(trigger, discard_old)?;
    for (key, port) in inputs {
        source.add_input(*key, port.subscribe()?)?;
    }
    source.validate()?;

    let port = Arc::new(Port::new("default"));
    Ok(register_thread_layer(
        manager,
        name,
        Box::new(source),
        adapt(transform),
        port,
        hooks,
        signal_in,
    ))
}

/// A merge layer: a transform whose output is the raw assembled input
/// (identity transform), used to fan multiple upstreams into one downstream
/// edge without otherwise changing the data. Ported from `pyrealtime`'s
/// `MergeLayer`.
pub fn make_merge(
    manager: &mut LayerManager,
    name: impl Into<String>,
    inputs: &[(&str, &Arc<Port>)],
    trigger: Trigger,
    discard_old: bool,
) -> Result<Arc<LayerHandle>> {
    make_transform(manager, name, inputs, trigger, discard_old, Item::Data)
}

/// A multi-output transform: like [`make_transform`], but `decode` returns
/// a [`PortMap`](super::item::PortMap)-carrying item that is fanned out to
/// `declared_ports` (plus any port a downstream consumer asks for by name)
/// in addition to the layer's own default output. Ported from
/// `pyrealtime`'s `DecodeLayer` (`TransformMixin` + `MultiOutputMixin`).
pub fn make_multi_output(
    manager: &mut LayerManager,
    name: impl Into<String>,
    inputs: &[(&str, &Arc<Port>)],
    trigger: Trigger,
    discard_old: bool,
    declared_ports: &[&str],
    decode: impl FnMut(Payload) -> Item + Send + 'static,
) -> Result<Arc<LayerHandle>> {
    let name = name.into();
    let mut source = TransformSource::new(trigger, discard_old)?;
    for (key, port) in inputs {
        source.add_input(*key, port.subscribe()?)?;
    }
    source.validate()?;

    let default_port = Arc::new(Port::new("default"));
    let ports = Arc::new(MultiOutputPorts::new(default_port, declared_ports)?);
    let output = LayerOutput::Multi(ports.clone());
    let sink = Box::new(MultiOutputSink::new(ports));

    Ok(build_and_register(
        manager,
        name,
        Box::new(source),
        adapt(decode),
        sink,
        output,
        Box::new(NoHooks),
        None,
    ))
}

/// A process-hosted producer: `entry_id` must already be registered with
/// [`super::host::register_process_entry`] (typically at the top of
/// `main`, alongside [`super::host::run_child_if_requested`]) to build the
/// child's own graph on re-exec. The child's registered entry is expected
/// to write `T`-typed, `bincode`-framed [`super::ipc::WireItem`]s to its
/// stdout; this layer's output port carries whatever `T` values arrive,
/// same as a thread-hosted producer's.
pub fn make_process_producer<T>(
    manager: &mut LayerManager,
    name: impl Into<String>,
    entry_id: impl Into<String>,
) -> Arc<LayerHandle>
where
    T: for<'de> serde::Deserialize<'de> + Send + Sync + 'static,
{
    let name = name.into();
    let entry_id = entry_id.into();
    let port = Arc::new(Port::new("default"));
    let output = LayerOutput::Single(port.clone());
    let counter = Arc::new(AtomicU64::new(0));
    let handle_name = name.clone();

    manager.add_layer(
        name,
        output.clone(),
        Box::new(move |_stop_event| {
            let bridge = ProcessBridge::spawn_producer::<T>(entry_id, port)
                .expect("failed to spawn process host");
            HostRunner::ProcessBridge(bridge)
        }),
    );

    Arc::new(LayerHandle {
        name: handle_name,
        output,
        counter,
    })
}
