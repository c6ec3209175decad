use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Configuration for a [`Scheduler`](crate::Scheduler).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Fixed logic frames per second of simulated time.
    pub logic_hz: u32,
    /// Length of one physics step, in milliseconds.
    pub fixed_timestep_ms: u64,
    /// Window the FPS counter averages over, in milliseconds.
    pub fps_window_ms: u64,
    /// World events kept in history (0 = unlimited).
    pub event_history: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            logic_hz: 30,
            fixed_timestep_ms: 20,
            fps_window_ms: 1000,
            event_history: 256,
        }
    }
}

impl SchedulerConfig {
    /// Set the number of logic frames per second.
    pub fn with_logic_hz(mut self, hz: u32) -> Self {
        self.logic_hz = hz;
        self
    }

    /// Set the physics step length in milliseconds.
    pub fn with_fixed_timestep_ms(mut self, ms: u64) -> Self {
        self.fixed_timestep_ms = ms;
        self
    }

    /// Set the FPS averaging window in milliseconds.
    pub fn with_fps_window_ms(mut self, ms: u64) -> Self {
        self.fps_window_ms = ms;
        self
    }

    /// Set the world event history size (0 = unlimited).
    pub fn with_event_history(mut self, max: usize) -> Self {
        self.event_history = max;
        self
    }

    /// Reject zero rates and lengths.
    pub fn validate(&self) -> SimResult<()> {
        if self.logic_hz == 0 {
            return Err(SimError::InvalidConfig("logic_hz must be positive".into()));
        }
        if self.fixed_timestep_ms == 0 {
            return Err(SimError::InvalidConfig(
                "fixed_timestep_ms must be positive".into(),
            ));
        }
        if self.fps_window_ms == 0 {
            return Err(SimError::InvalidConfig(
                "fps_window_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// One logic frame: `1s / logic_hz`, truncated to whole nanoseconds.
    pub fn logic_frame(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / u64::from(self.logic_hz.max(1)))
    }

    /// One physics step.
    pub fn fixed_timestep(&self) -> Duration {
        Duration::from_millis(self.fixed_timestep_ms)
    }

    /// The FPS averaging window.
    pub fn fps_window(&self) -> Duration {
        Duration::from_millis(self.fps_window_ms)
    }
}
