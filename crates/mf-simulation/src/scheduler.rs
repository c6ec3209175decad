use std::time::Duration;

use mf_core::World;
use tracing::{debug, info, trace, warn};

use crate::clock::LogicClock;
use crate::config::SchedulerConfig;
use crate::error::{SimError, SimResult};
use crate::fps::FpsCounter;

/// What one render frame did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Logic frames run during this render frame.
    pub logic_steps: u64,
    /// Logic frame counter after the frame.
    pub logic_frame: u64,
    /// Time left in the bank after the frame.
    pub bank: Duration,
}

/// Drives a [`World`] from the host's render and physics callbacks.
///
/// Each render frame feeds the FPS counter, runs as many fixed logic
/// frames as the banked time allows, then runs one render pass and one
/// late pass with the frame's own delta. Physics steps are driven
/// separately through [`Scheduler::physics_step`].
#[derive(Debug)]
pub struct Scheduler {
    world: World,
    clock: LogicClock,
    fps: FpsCounter,
    config: SchedulerConfig,
    render_frames: u64,
    physics_steps: u64,
    stopped: bool,
}

impl Scheduler {
    /// Take ownership of `world` and validate `config`.
    pub fn new(world: World, config: SchedulerConfig) -> SimResult<Self> {
        config.validate()?;
        let clock = LogicClock::new(config.logic_frame())?;
        let fps = FpsCounter::new(config.fps_window());
        info!(
            world = %world.id(),
            logic_hz = config.logic_hz,
            fixed_timestep_ms = config.fixed_timestep_ms,
            "scheduler started"
        );
        Ok(Self {
            world,
            clock,
            fps,
            config,
            render_frames: 0,
            physics_steps: 0,
            stopped: false,
        })
    }

    /// Run one render frame that took `delta`.
    ///
    /// Every pass of the frame runs even if an earlier one fails; the first
    /// failure is returned afterwards.
    pub fn frame(&mut self, delta: Duration) -> SimResult<FrameReport> {
        if self.stopped {
            return Err(SimError::Stopped);
        }
        self.render_frames += 1;
        if let Some(fps) = self.fps.tick(delta) {
            debug!(fps, "fps reading");
        }

        let mut first_err = None;
        let logic_steps = self.clock.bank(delta);
        let logic_dt = self.clock.frame().as_secs_f32();
        for _ in 0..logic_steps {
            if let Err(e) = self.world.logic_update(logic_dt) {
                first_err.get_or_insert(e);
            }
        }

        let dt = delta.as_secs_f32();
        if let Err(e) = self.world.update(dt) {
            first_err.get_or_insert(e);
        }
        if let Err(e) = self.world.late_update(dt) {
            first_err.get_or_insert(e);
        }

        let report = FrameReport {
            logic_steps,
            logic_frame: self.clock.logic_frame(),
            bank: self.clock.banked(),
        };
        trace!(frame = self.render_frames, ?report, "render frame done");
        match first_err {
            Some(e) => {
                warn!(frame = self.render_frames, error = %e, "render frame failed");
                Err(e.into())
            }
            None => Ok(report),
        }
    }

    /// Like [`Scheduler::frame`], with the delta in seconds. Negative,
    /// NaN, and infinite deltas are rejected before anything runs.
    pub fn frame_secs(&mut self, secs: f64) -> SimResult<FrameReport> {
        let delta = Duration::try_from_secs_f64(secs).map_err(|_| SimError::InvalidDelta(secs))?;
        self.frame(delta)
    }

    /// Run one physics step of the configured fixed timestep.
    pub fn physics_step(&mut self) -> SimResult<()> {
        if self.stopped {
            return Err(SimError::Stopped);
        }
        self.physics_steps += 1;
        let dt = self.config.fixed_timestep().as_secs_f32();
        self.world.fixed_update(dt)?;
        Ok(())
    }

    /// Shut the world down. Later frames fail with [`SimError::Stopped`].
    pub fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.world.shutdown();
        self.stopped = true;
        info!(
            world = %self.world.id(),
            render_frames = self.render_frames,
            logic_frames = self.clock.logic_frame(),
            physics_steps = self.physics_steps,
            "scheduler stopped"
        );
    }

    /// Whether [`Scheduler::stop`] has run.
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// The driven world.
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable access to the driven world.
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    /// The logic clock.
    pub fn clock(&self) -> &LogicClock {
        &self.clock
    }

    /// Latest FPS reading.
    pub fn fps(&self) -> u32 {
        self.fps.fps()
    }

    /// The validated configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Render frames run so far.
    pub fn render_frames(&self) -> u64 {
        self.render_frames
    }

    /// Physics steps run so far.
    pub fn physics_steps(&self) -> u64 {
        self.physics_steps
    }

    /// Extract the world, consuming the scheduler.
    pub fn into_world(self) -> World {
        self.world
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;

    use mf_core::{EcsResult, System, SystemContext};

    use super::*;

    #[derive(Debug, Default)]
    struct Phases {
        seen: Vec<&'static str>,
    }

    impl System for Phases {
        fn name(&self) -> &str {
            "phases"
        }

        fn pre_process(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> EcsResult<()> {
            self.seen.push("pre");
            Ok(())
        }

        fn post_process(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> EcsResult<()> {
            self.seen.push("post");
            Ok(())
        }

        fn logic_update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> EcsResult<()> {
            self.seen.push("logic");
            Ok(())
        }

        fn fixed_update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> EcsResult<()> {
            self.seen.push("fixed");
            Ok(())
        }

        fn late_update(&mut self, _ctx: &mut SystemContext<'_>, _dt: f32) -> EcsResult<()> {
            self.seen.push("late");
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn scheduler() -> Scheduler {
        let mut world = World::new("sched");
        world.create_system(Phases::default());
        Scheduler::new(world, SchedulerConfig::default()).unwrap()
    }

    fn seen(s: &Scheduler) -> Vec<&'static str> {
        s.world().system::<Phases>().unwrap().seen.clone()
    }

    #[test]
    fn frame_runs_logic_before_render_and_late() {
        let mut s = scheduler();
        let report = s.frame(Duration::from_millis(40)).unwrap();
        assert_eq!(report.logic_steps, 1);
        assert_eq!(seen(&s), ["logic", "pre", "post", "late"]);
    }

    #[test]
    fn short_frame_runs_no_logic() {
        let mut s = scheduler();
        let report = s.frame(Duration::from_millis(10)).unwrap();
        assert_eq!(report.logic_steps, 0);
        assert_eq!(report.bank, Duration::from_millis(10));
        assert_eq!(seen(&s), ["pre", "post", "late"]);
    }

    #[test]
    fn physics_step_runs_fixed_update_only() {
        let mut s = scheduler();
        s.physics_step().unwrap();
        assert_eq!(seen(&s), ["fixed"]);
        assert_eq!(s.physics_steps(), 1);
        assert_eq!(s.render_frames(), 0);
    }

    #[test]
    fn invalid_deltas_rejected() {
        let mut s = scheduler();
        for bad in [-0.1, f64::NAN, f64::INFINITY] {
            assert!(matches!(s.frame_secs(bad), Err(SimError::InvalidDelta(_))));
        }
        assert_eq!(s.render_frames(), 0);
    }

    #[test]
    fn invalid_config_rejected() {
        let err = Scheduler::new(World::new("bad"), SchedulerConfig::default().with_logic_hz(0))
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidConfig(_)));
    }

    #[test]
    fn stopped_scheduler_refuses_frames() {
        let mut s = scheduler();
        s.stop();
        assert!(s.is_stopped());
        assert_eq!(s.world().system_count(), 0);
        assert_eq!(s.frame(Duration::from_millis(16)), Err(SimError::Stopped));
        assert_eq!(s.physics_step(), Err(SimError::Stopped));
    }
}
