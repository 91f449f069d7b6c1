//! Producer role: `get_input` variants that synthesize data from nothing.
//! See §4.4 in `SPEC_FULL.md`; ported from `pyrealtime`'s `input_layers.py`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::item::Item;

/// Role-specific input source every layer's processing loop pulls from.
pub trait InputSource: Send {
    fn get_input(&mut self) -> Item;
}

/// Calls `generate(counter)` at a fixed rate. `rate` is in Hz.
pub struct RateLimitedProducer {
    rate: f64,
    counter: u64,
    generate: Box<dyn FnMut(u64) -> Item + Send>,
}

impl RateLimitedProducer {
    pub fn new(rate: f64, generate: Box<dyn FnMut(u64) -> Item + Send>) -> Self {
        Self {
            rate,
            counter: 0,
            generate,
        }
    }
}

impl InputSource for RateLimitedProducer {
    fn get_input(&mut self) -> Item {
        std::thread::sleep(Duration::from_secs_f64(1.0 / self.rate));
        let item = (self.generate)(self.counter);
        self.counter += 1;
        item
    }
}

/// Emits `value` exactly once, then `Item::None` forever (sleeping ~1s
/// between calls so the layer doesn't busy-loop).
pub struct OneShotProducer {
    value: Option<Item>,
}

impl OneShotProducer {
    pub fn new(value: Item) -> Self {
        Self { value: Some(value) }
    }
}

impl InputSource for OneShotProducer {
    fn get_input(&mut self) -> Item {
        match self.value.take() {
            Some(item) => item,
            None => {
                std::thread::sleep(Duration::from_secs(1));
                Item::None
            }
        }
    }
}

/// Fires exactly `num_shots` times (or `num_shots + 1` when `finish` is
/// set — the final fire carries the domain sentinel `-1`, which is opaque
/// to the core, distinct from `Item::None`/`Item::Stop`). After the last
/// fire, every call sleeps `1/rate` and returns `Item::None`; the first
/// such call flips `expired`.
pub struct MultiShotProducer {
    rate: f64,
    counter: u64,
    num_shots: u64,
    finish: bool,
    generate: Box<dyn FnMut(u64) -> Item + Send>,
    completion_handler: Box<dyn FnMut() + Send>,
    expired: AtomicBool,
}

impl MultiShotProducer {
    pub fn new(
        num_shots: u64,
        finish: bool,
        rate: f64,
        generate: Box<dyn FnMut(u64) -> Item + Send>,
        completion_handler: Box<dyn FnMut() + Send>,
    ) -> Self {
        let num_shots = if finish { num_shots + 1 } else { num_shots };
        Self {
            rate,
            counter: 0,
            num_shots,
            finish,
            generate,
            completion_handler,
            expired: AtomicBool::new(false),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::Acquire)
    }

    fn sleep_one_period(&self) {
        std::thread::sleep(Duration::from_secs_f64(1.0 / self.rate));
    }
}

impl InputSource for MultiShotProducer {
    fn get_input(&mut self) -> Item {
        if self.counter < self.num_shots - 1 {
            self.sleep_one_period();
            let item = (self.generate)(self.counter);
            self.counter += 1;
            item
        } else if self.counter == self.num_shots - 1 {
            self.sleep_one_period();
            self.counter += 1;
            (self.completion_handler)();
            if self.finish {
                Item::data(-1i64)
            } else {
                Item::None
            }
        } else {
            if !self.expired.load(Ordering::Acquire) {
                self.expired.store(true, Ordering::Release);
            }
            self.sleep_one_period();
            Item::None
        }
    }
}
