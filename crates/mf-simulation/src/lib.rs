//! Fixed-rate logic scheduling for Mapforge worlds.
//!
//! A [`Scheduler`] owns a [`mf_core::World`] and is driven by the host's
//! render loop. Variable render deltas are banked by a [`LogicClock`] and
//! paid out as whole logic frames of a fixed length, so logic always
//! advances in identical quanta however uneven the frame rate is.

/// Fixed-step accumulator for logic frames.
pub mod clock;
/// Configuration types for the scheduler.
pub mod config;
/// Error types for the simulation crate.
pub mod error;
/// Render-rate counter.
pub mod fps;
/// Movement system: integrates velocity on the logic tick.
pub mod movement;
/// The dual-rate scheduler driving a world.
pub mod scheduler;

/// Re-export of [`clock::LogicClock`].
pub use clock::LogicClock;
/// Re-export of [`config::SchedulerConfig`].
pub use config::SchedulerConfig;
/// Re-exports of [`error::SimError`] and [`error::SimResult`].
pub use error::{SimError, SimResult};
/// Re-export of [`fps::FpsCounter`].
pub use fps::FpsCounter;
/// Re-export of [`movement::MovementSystem`].
pub use movement::MovementSystem;
/// Re-exports of [`scheduler::Scheduler`] and [`scheduler::FrameReport`].
pub use scheduler::{FrameReport, Scheduler};
