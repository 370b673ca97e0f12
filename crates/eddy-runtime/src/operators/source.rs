//! Built-in sources.
//!
//! All sources here emit with the blocking [`EmitContext::emit`], so a
//! full downstream queue stalls the source thread — that is the
//! backpressure mechanism working as intended. An emission refused by
//! every output (all closed) is recorded as backpressure and retried on
//! the next `generate` call.

use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use eddy_core::event::{Event, Payload};
use eddy_core::operator::{EmitContext, Source};

/// Configuration for [`SequenceSource`].
#[derive(Debug, Clone)]
pub struct SequenceConfig {
    /// First value emitted.
    pub start: i64,
    /// Increment between values.
    pub step: i64,
    /// Number of events to emit (`u64::MAX` = unbounded).
    pub count: u64,
    /// Optional sleep between events, for rate limiting.
    pub delay: Duration,
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            start: 0,
            step: 1,
            count: u64::MAX,
            delay: Duration::ZERO,
        }
    }
}

/// Emits an arithmetic sequence of integer events.
///
/// Each event carries the running emission index as its key.
pub struct SequenceSource {
    name: String,
    config: SequenceConfig,
    current: i64,
    generated: u64,
}

impl SequenceSource {
    /// Creates a sequence source from a full configuration.
    #[must_use]
    pub fn new(name: impl Into<String>, config: SequenceConfig) -> Self {
        Self {
            name: name.into(),
            current: config.start,
            config,
            generated: 0,
        }
    }

    /// Creates a step-1 sequence of `count` values starting at `start`.
    #[must_use]
    pub fn from_range(name: impl Into<String>, start: i64, count: u64) -> Self {
        Self::new(
            name,
            SequenceConfig {
                start,
                count,
                ..SequenceConfig::default()
            },
        )
    }

    /// Returns how many events have been emitted so far.
    #[must_use]
    pub fn generated(&self) -> u64 {
        self.generated
    }
}

impl Source for SequenceSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&mut self, ctx: &mut EmitContext) -> bool {
        if ctx.stop_requested() || self.generated >= self.config.count {
            return false;
        }

        let event = Event::with_key(self.current, self.generated);
        if ctx.emit(event) > 0 {
            self.current += self.config.step;
            self.generated += 1;
        } else {
            ctx.record_backpressure();
        }

        if !self.config.delay.is_zero() {
            std::thread::sleep(self.config.delay);
        }
        true
    }
}

/// Configuration for [`RandomSource`].
#[derive(Debug, Clone)]
pub struct RandomConfig {
    /// Inclusive lower bound.
    pub min_value: i64,
    /// Inclusive upper bound.
    pub max_value: i64,
    /// Number of events to emit (`u64::MAX` = unbounded).
    pub count: u64,
    /// Optional sleep between events.
    pub delay: Duration,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self {
            min_value: 0,
            max_value: 1000,
            count: u64::MAX,
            delay: Duration::ZERO,
        }
    }
}

/// Emits uniformly distributed random integer events.
pub struct RandomSource {
    name: String,
    config: RandomConfig,
    rng: SmallRng,
    generated: u64,
}

impl RandomSource {
    /// Creates a random source from a full configuration.
    #[must_use]
    pub fn new(name: impl Into<String>, config: RandomConfig) -> Self {
        Self {
            name: name.into(),
            config,
            rng: SmallRng::from_entropy(),
            generated: 0,
        }
    }
}

impl Source for RandomSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&mut self, ctx: &mut EmitContext) -> bool {
        if ctx.stop_requested() || self.generated >= self.config.count {
            return false;
        }

        let value = self
            .rng
            .gen_range(self.config.min_value..=self.config.max_value);
        let event = Event::with_key(value, self.generated);
        if ctx.emit(event) > 0 {
            self.generated += 1;
        } else {
            ctx.record_backpressure();
        }

        if !self.config.delay.is_zero() {
            std::thread::sleep(self.config.delay);
        }
        true
    }
}

/// Emits events produced by a user closure, up to `count` of them.
pub struct FnSource {
    name: String,
    generator: Box<dyn FnMut() -> Payload + Send>,
    count: u64,
    generated: u64,
}

impl FnSource {
    /// Creates a closure-backed source emitting at most `count` events.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        count: u64,
        generator: impl FnMut() -> Payload + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            generator: Box::new(generator),
            count,
            generated: 0,
        }
    }
}

impl Source for FnSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&mut self, ctx: &mut EmitContext) -> bool {
        if ctx.stop_requested() || self.generated >= self.count {
            return false;
        }

        let payload = (self.generator)();
        let event = Event::with_key(payload, self.generated);
        if ctx.emit(event) > 0 {
            self.generated += 1;
        } else {
            ctx.record_backpressure();
        }
        true
    }
}
