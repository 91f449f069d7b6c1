//! Integration tests for the six literal scenarios in `SPEC_FULL.md` §8.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use layergraph::prelude::*;

fn init_tracing() {
    let _ = layergraph::init_tracing();
}

#[test]
fn linear_identity_chain() {
    init_tracing();
    let mut manager = LayerManager::new();
    let counter = Arc::new(AtomicU64::new(0));
    let counter_clone = counter.clone();

    let producer = make_producer(&mut manager, "producer", 1_000.0, move |c| {
        if c < 10 {
            counter_clone.fetch_add(1, Ordering::SeqCst);
            Item::data(c as i64)
        } else {
            Item::Stop
        }
    });

    let identity = make_transform(
        &mut manager,
        "identity",
        &[("default", &producer.output_port())],
        Trigger::Slowest,
        false,
        Item::Data,
    )
    .unwrap();

    let rx = identity.output_port().subscribe().unwrap();
    manager.start_all();

    for expected in 0i64..10 {
        let item = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(item.downcast_ref::<i64>(), Some(&expected));
    }
    assert!(rx.recv_timeout(Duration::from_secs(2)).unwrap().is_stop());

    manager.join_all();
}

#[test]
fn comma_decoder_multi_output() {
    init_tracing();
    let mut manager = LayerManager::new();
    let lines = Arc::new(vec!["1,2,3", "4,5,6", "bad"]);
    let lines_clone = lines.clone();

    let producer = make_producer(
        &mut manager,
        "producer",
        1_000.0,
        move |c| match lines_clone.get(c as usize) {
            Some(line) => Item::data(line.to_string()),
            None => Item::Stop,
        },
    );

    let decoder = make_multi_output(
        &mut manager,
        "decoder",
        &[("default", &producer.output_port())],
        Trigger::Slowest,
        false,
        &["a", "b", "c"],
        |payload| {
            let line = payload.downcast_ref::<String>().unwrap();
            let parts: Vec<&str> = line.split(',').collect();
            let values: Option<Vec<i64>> = parts.iter().map(|p| p.parse().ok()).collect();
            match values {
                Some(values) if values.len() == 3 => {
                    let mut map = PortMap::new();
                    map.insert("a".to_string(), Arc::new(values[0]) as Payload);
                    map.insert("b".to_string(), Arc::new(values[1]) as Payload);
                    map.insert("c".to_string(), Arc::new(values[2]) as Payload);
                    Item::Data(Arc::new(map))
                }
                _ => Item::None,
            }
        },
    )
    .unwrap();

    let rx_a = decoder.get_port("a").unwrap().subscribe().unwrap();
    let rx_b = decoder.get_port("b").unwrap().subscribe().unwrap();
    let rx_c = decoder.get_port("c").unwrap().subscribe().unwrap();
    manager.start_all();

    assert_eq!(
        rx_a.recv_timeout(Duration::from_secs(2))
            .unwrap()
            .downcast_ref::<i64>(),
        Some(&1)
    );
    assert_eq!(
        rx_a.recv_timeout(Duration::from_secs(2))
            .unwrap()
            .downcast_ref::<i64>(),
        Some(&4)
    );
    assert_eq!(
        rx_b.recv_timeout(Duration::from_secs(2))
            .unwrap()
            .downcast_ref::<i64>(),
        Some(&2)
    );
    assert_eq!(
        rx_b.recv_timeout(Duration::from_secs(2))
            .unwrap()
            .downcast_ref::<i64>(),
        Some(&5)
    );
    assert_eq!(
        rx_c.recv_timeout(Duration::from_secs(2))
            .unwrap()
            .downcast_ref::<i64>(),
        Some(&3)
    );
    assert_eq!(
        rx_c.recv_timeout(Duration::from_secs(2))
            .unwrap()
            .downcast_ref::<i64>(),
        Some(&6)
    );

    // "bad" fails to parse, decoder returns NONE: nothing further arrives.
    assert!(rx_a.recv_timeout(Duration::from_millis(200)).is_err());

    manager.stop_all();
    manager.join_all();
}

#[test]
fn one_shot_timing() {
    init_tracing();
    let mut manager = LayerManager::new();
    let layer = make_one_shot(&mut manager, "one_shot", Item::data(42i64));
    let rx = layer.output_port().subscribe().unwrap();
    manager.start_all();

    assert_eq!(
        rx.recv_timeout(Duration::from_secs(1))
            .unwrap()
            .downcast_ref::<i64>(),
        Some(&42)
    );
    // No further items for at least 2s (the producer idles on Item::None,
    // which the output port never forwards).
    assert!(rx.recv_timeout(Duration::from_secs(2)).is_err());

    manager.stop_all();
    assert!(rx.recv_timeout(Duration::from_secs(2)).unwrap().is_stop());
    manager.join_all();
}

#[test]
fn multi_shot_with_finish() {
    init_tracing();
    let mut manager = LayerManager::new();
    let completions = Arc::new(AtomicU64::new(0));
    let completions_clone = completions.clone();

    let layer = make_multi_shot(
        &mut manager,
        "multi_shot",
        3,
        true,
        100.0,
        |c| Item::data(c as i64),
        move || {
            completions_clone.fetch_add(1, Ordering::SeqCst);
        },
    );
    let rx = layer.output_port().subscribe().unwrap();
    manager.start_all();

    for expected in [0i64, 1, 2, -1] {
        assert_eq!(
            rx.recv_timeout(Duration::from_secs(2))
                .unwrap()
                .downcast_ref::<i64>(),
            Some(&expected)
        );
    }
    assert_eq!(completions.load(Ordering::SeqCst), 1);

    manager.stop_all();
    manager.join_all();
}

#[test]
fn fastest_race_favors_the_faster_producer() {
    init_tracing();
    let mut manager = LayerManager::new();
    let deadline = Instant::now() + Duration::from_secs(1);

    let fast = make_producer(&mut manager, "fast", 100.0, move |c| {
        if Instant::now() < deadline {
            Item::data(c as i64)
        } else {
            Item::Stop
        }
    });
    let slow_deadline = deadline;
    let slow = make_producer(&mut manager, "slow", 10.0, move |c| {
        if Instant::now() < slow_deadline {
            Item::data(c as i64)
        } else {
            Item::Stop
        }
    });

    let x_count = Arc::new(AtomicU64::new(0));
    let y_count = Arc::new(AtomicU64::new(0));
    let x_count_clone = x_count.clone();
    let y_count_clone = y_count.clone();

    let race = make_transform(
        &mut manager,
        "race",
        &[("x", &fast.output_port()), ("y", &slow.output_port())],
        Trigger::Fastest,
        false,
        move |payload| {
            let map = payload.downcast_ref::<PortMap>();
            match map {
                Some(map) if map.contains_key("x") => {
                    x_count_clone.fetch_add(1, Ordering::SeqCst);
                }
                Some(map) if map.contains_key("y") => {
                    y_count_clone.fetch_add(1, Ordering::SeqCst);
                }
                _ => {}
            }
            Item::None
        },
    )
    .unwrap();
    let _rx = race.output_port().subscribe().unwrap();

    manager.start_all();
    std::thread::sleep(Duration::from_millis(1300));
    manager.stop_all();
    manager.join_all();

    let x = x_count.load(Ordering::SeqCst);
    let y = y_count.load(Ordering::SeqCst).max(1);
    let ratio = x as f64 / y as f64;
    assert!(
        ratio > 3.0,
        "expected the 100Hz producer to dominate ticks, got x={x} y={y} (ratio {ratio})"
    );
}

#[test]
fn layer_trigger_delivers_most_recent_aux_value() {
    init_tracing();
    let mut manager = LayerManager::new();
    let deadline = Instant::now() + Duration::from_millis(500);

    let main_deadline = deadline;
    let main = make_producer(&mut manager, "main", 10.0, move |c| {
        if Instant::now() < main_deadline {
            Item::data(c as i64)
        } else {
            Item::Stop
        }
    });
    let aux_deadline = deadline;
    let aux = make_producer(&mut manager, "aux", 100.0, move |c| {
        if Instant::now() < aux_deadline {
            Item::data(c as i64)
        } else {
            Item::Stop
        }
    });

    let ticks_with_main = Arc::new(AtomicU64::new(0));
    let ticks_with_main_clone = ticks_with_main.clone();

    let merged = make_transform(
        &mut manager,
        "merged",
        &[("main", &main.output_port()), ("aux", &aux.output_port())],
        Trigger::Layer {
            key: "main".to_string(),
        },
        true,
        move |payload| {
            if let Some(map) = payload.downcast_ref::<PortMap>() {
                if map.contains_key("main") {
                    ticks_with_main_clone.fetch_add(1, Ordering::SeqCst);
                }
            }
            Item::None
        },
    )
    .unwrap();
    let _rx = merged.output_port().subscribe().unwrap();

    manager.start_all();
    std::thread::sleep(Duration::from_millis(800));
    manager.stop_all();
    manager.join_all();

    // Every tick is gated on `main`'s arrival, so the tick count should
    // roughly track main's ~10Hz rate over the run.
    assert!(ticks_with_main.load(Ordering::SeqCst) >= 1);
}
