// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The tick loop that owns the event bus.

use std::time::{Duration, Instant};

use anyhow::Result;
use reverb_core::EventBus;

use crate::config::RuntimeConfig;

/// Timing information handed to the application every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickInfo {
    /// Zero-based index of the tick.
    pub index: u64,
    /// Time elapsed since the previous tick. The first tick reports the
    /// nominal tick interval.
    pub delta: Duration,
}

/// The outcome of one [`Runtime::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Index of the tick that just ran.
    pub index: u64,
    /// Number of queued events the bus processed during this tick, including
    /// ones no subscriber listened to.
    pub processed: usize,
}

/// User logic driven by the [`Runtime`].
pub trait Application {
    /// Called once before the first tick. Register subscribers here.
    fn setup(&mut self, bus: &mut EventBus) -> Result<()>;

    /// Called every tick, before the bus is drained.
    fn update(&mut self, bus: &mut EventBus, tick: TickInfo);

    /// Checked before every tick; returning `true` ends [`Runtime::run`].
    fn should_exit(&self) -> bool {
        false
    }

    /// Called once after the last tick.
    fn shutdown(&mut self, _bus: &mut EventBus) {}
}

/// Owns the single [`EventBus`] and drains it once per tick.
pub struct Runtime {
    config: RuntimeConfig,
    bus: EventBus,
    tick_index: u64,
    last_tick: Option<Instant>,
}

impl Runtime {
    /// Creates the runtime and its event bus.
    pub fn new(config: RuntimeConfig) -> Self {
        log::info!(
            "Runtime created ({} Hz, max ticks: {:?}).",
            config.tick_rate_hz,
            config.max_ticks
        );
        Self {
            config,
            bus: EventBus::new(),
            tick_index: 0,
            last_tick: None,
        }
    }

    /// Returns the configuration the runtime was built with.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Returns a shared reference to the bus.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Returns the bus, for producers and consumers living outside the application.
    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    /// Returns how many ticks have run so far.
    pub fn ticks(&self) -> u64 {
        self.tick_index
    }

    /// Runs a single tick: the application update, then the bus drain.
    pub fn tick<A: Application>(&mut self, app: &mut A) -> TickReport {
        let now = Instant::now();
        let delta = match self.last_tick {
            Some(last) => now.duration_since(last),
            None => self.config.tick_interval(),
        };
        self.last_tick = Some(now);

        let index = self.tick_index;
        app.update(&mut self.bus, TickInfo { index, delta });
        let processed = self.bus.update();
        self.tick_index += 1;

        if processed > 0 {
            log::trace!("Tick {index}: processed {processed} queued event(s).");
        }
        TickReport { index, processed }
    }

    /// Sets the application up, then ticks at the configured rate until
    /// `max_ticks` is reached or the application asks to exit.
    ///
    /// ## Returns
    /// The number of ticks run by this call.
    pub fn run<A: Application>(&mut self, app: &mut A) -> Result<u64> {
        app.setup(&mut self.bus)?;
        log::info!(
            "Application ready with {} subscriber(s). Entering tick loop.",
            self.bus.subscriber_count()
        );

        let interval = self.config.tick_interval();
        let first_tick = self.tick_index;

        loop {
            if self
                .config
                .max_ticks
                .is_some_and(|max| self.tick_index >= max)
            {
                log::info!("Reached the configured tick limit.");
                break;
            }
            if app.should_exit() {
                log::info!("Application requested exit.");
                break;
            }

            let started = Instant::now();
            self.tick(app);
            let elapsed = started.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }

        app.shutdown(&mut self.bus);
        let ran = self.tick_index - first_tick;
        log::info!("Tick loop finished after {ran} tick(s).");
        Ok(ran)
    }
}
