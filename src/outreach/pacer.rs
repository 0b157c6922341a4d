//! Send pacing: random per-send delays and periodic batch cooldowns

use std::time::{Duration, Instant};

use chrono::{Local, TimeDelta};
use rand::Rng;
use rand::rngs::ThreadRng;
use serde::Deserialize;
use tracing::info;

use crate::outreach::clock::Clock;
use crate::outreach::error::ConfigError;
use crate::outreach::ledger::TIMESTAMP_FORMAT;

/// Pacing limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Shortest wait after a successful send, in seconds
    pub min_delay_secs: u64,
    /// Longest wait after a successful send, in seconds
    pub max_delay_secs: u64,
    /// Successful sends per batch before a cooldown
    pub batch_size: u64,
    /// Cooldown length, in seconds
    pub cooldown_secs: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            min_delay_secs: 5,
            max_delay_secs: 13,
            batch_size: 40,
            cooldown_secs: 35 * 60,
        }
    }
}

impl PacingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::Invalid {
                key: "pacing.batch_size",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.min_delay_secs > self.max_delay_secs {
            return Err(ConfigError::Invalid {
                key: "pacing.min_delay_secs",
                reason: format!(
                    "{} is greater than max_delay_secs ({})",
                    self.min_delay_secs, self.max_delay_secs
                ),
            });
        }
        Ok(())
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }
}

/// Where the pacer is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Before the first contact or after the last one
    #[default]
    Idle,
    Sending,
    Cooling,
}

/// Batch bookkeeping for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacerState {
    sent: u64,
    batch_start: Option<Instant>,
    phase: Phase,
}

impl PacerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Successful sends counted so far
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// When the current batch started, if a cooldown has completed
    pub fn batch_start(&self) -> Option<Instant> {
        self.batch_start
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn begin(&mut self) {
        self.phase = Phase::Sending;
    }

    pub fn finish(&mut self) {
        self.phase = Phase::Idle;
    }
}

/// Waits applied after one successful send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    /// Send count including this send
    pub sent: u64,
    /// Cooldown waited before the delay, if this send closed a batch
    pub cooldown: Option<Duration>,
    pub delay: Duration,
}

/// Decides how long to wait after each successful send
#[derive(Debug, Clone)]
pub struct Pacer<R = ThreadRng> {
    config: PacingConfig,
    rng: R,
}

impl Pacer<ThreadRng> {
    pub fn new(config: PacingConfig) -> Result<Self, ConfigError> {
        Self::with_rng(config, rand::rng())
    }
}

impl<R: Rng> Pacer<R> {
    /// Fails if `config` has a zero batch size or inverted delay bounds
    pub fn with_rng(config: PacingConfig, rng: R) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// Record a successful send and block for the required pause.
    ///
    /// Every `batch_size`-th send first waits out the cooldown: the full
    /// cooldown on the first batch, afterwards only what is left of it
    /// since the previous cooldown ended. Every send then waits a random
    /// whole number of seconds between the configured bounds.
    pub fn after_success(&mut self, state: &mut PacerState, clock: &dyn Clock) -> Pacing {
        state.sent += 1;
        state.phase = Phase::Sending;

        let cooldown = (state.sent % self.config.batch_size == 0)
            .then(|| self.cool_down(state, clock));

        let secs = self
            .rng
            .random_range(self.config.min_delay_secs..=self.config.max_delay_secs);
        let delay = Duration::from_secs(secs);
        info!("Waiting {secs} seconds before next email...");
        clock.sleep(delay);

        Pacing {
            sent: state.sent,
            cooldown,
            delay,
        }
    }

    fn cool_down(&self, state: &mut PacerState, clock: &dyn Clock) -> Duration {
        state.phase = Phase::Cooling;

        let full = self.config.cooldown();
        info!(
            "Reached {} emails. Starting cooldown for {} minutes.",
            state.sent,
            full.as_secs() / 60
        );

        let wait = match state.batch_start {
            Some(start) => full.saturating_sub(clock.now().saturating_duration_since(start)),
            None => full,
        };

        if !wait.is_zero() {
            if let Ok(delta) = TimeDelta::from_std(wait) {
                info!(
                    "Cooldown will end at: {}",
                    (Local::now() + delta).format(TIMESTAMP_FORMAT)
                );
            }
            clock.sleep(wait);
        }

        state.batch_start = Some(clock.now());
        state.phase = Phase::Sending;
        wait
    }
}
