use std::time::Duration;

use crate::error::{SimError, SimResult};

/// Fixed-step accumulator turning variable render deltas into whole logic
/// frames.
///
/// Time is banked as an exact [`Duration`], so the step count for any
/// sequence of deltas is pure integer arithmetic on nanoseconds: banking
/// `delta` yields `(bank + delta) / frame` steps and leaves
/// `(bank + delta) % frame` behind.
#[derive(Debug, Clone)]
pub struct LogicClock {
    frame: Duration,
    bank: Duration,
    logic_frame: u64,
}

impl LogicClock {
    /// Create a clock with the given fixed frame length.
    pub fn new(frame: Duration) -> SimResult<Self> {
        if frame.is_zero() {
            return Err(SimError::InvalidConfig(
                "logic frame must be longer than zero".into(),
            ));
        }
        Ok(Self {
            frame,
            bank: Duration::ZERO,
            logic_frame: 0,
        })
    }

    /// Clock running at `hz` logic frames per second.
    pub fn from_hz(hz: u32) -> SimResult<Self> {
        if hz == 0 {
            return Err(SimError::InvalidConfig("logic_hz must be positive".into()));
        }
        Self::new(Duration::from_nanos(1_000_000_000 / u64::from(hz)))
    }

    /// Add `delta` to the bank and withdraw every whole frame it now holds.
    /// Returns the number of frames withdrawn; the logic frame counter
    /// advances by the same amount.
    pub fn bank(&mut self, delta: Duration) -> u64 {
        let total = self.bank.saturating_add(delta).as_nanos();
        let frame = self.frame.as_nanos();
        let steps = u64::try_from(total / frame).unwrap_or(u64::MAX);
        // The remainder is below one frame, which itself fits in a Duration.
        self.bank = Duration::from_nanos(u64::try_from(total % frame).unwrap_or(u64::MAX));
        self.logic_frame = self.logic_frame.saturating_add(steps);
        steps
    }

    /// Length of one logic frame.
    pub fn frame(&self) -> Duration {
        self.frame
    }

    /// Banked time not yet simulated. Always shorter than one frame.
    pub fn banked(&self) -> Duration {
        self.bank
    }

    /// [`LogicClock::banked`] in seconds.
    pub fn bank_secs(&self) -> f64 {
        self.bank.as_secs_f64()
    }

    /// Logic frames run since the clock was created.
    pub fn logic_frame(&self) -> u64 {
        self.logic_frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const L: Duration = Duration::from_nanos(33_333_333);

    #[test]
    fn clock_initial_state() {
        let clock = LogicClock::from_hz(30).unwrap();
        assert_eq!(clock.frame(), L);
        assert_eq!(clock.banked(), Duration::ZERO);
        assert_eq!(clock.logic_frame(), 0);
    }

    #[test]
    fn three_short_frames_make_one_step() {
        let mut clock = LogicClock::from_hz(30).unwrap();
        let steps: u64 = (0..3).map(|_| clock.bank(Duration::from_millis(20))).sum();
        assert_eq!(steps, 1);
        assert_eq!(clock.logic_frame(), 1);
        assert_eq!(clock.banked(), Duration::from_nanos(26_666_667));
        assert!((clock.bank_secs() - 0.026_666_667).abs() < 1e-9);
    }

    #[test]
    fn stall_catches_up_with_several_steps() {
        let mut clock = LogicClock::from_hz(30).unwrap();
        assert_eq!(clock.bank(Duration::from_millis(250)), 7);
        assert_eq!(clock.banked(), Duration::from_millis(250) - L * 7);
    }

    #[test]
    fn zero_rate_rejected() {
        assert!(matches!(
            LogicClock::from_hz(0),
            Err(SimError::InvalidConfig(_))
        ));
        assert!(LogicClock::new(Duration::ZERO).is_err());
    }

    proptest! {
        #[test]
        fn steps_and_bank_follow_floor_and_mod(
            start in 0u64..33_333_333,
            delta in 0u64..2_000_000_000,
        ) {
            let mut clock = LogicClock::new(L).unwrap();
            clock.bank(Duration::from_nanos(start));
            let before = clock.logic_frame();

            let steps = clock.bank(Duration::from_nanos(delta));
            let total = start + delta;
            prop_assert_eq!(steps, total / 33_333_333);
            prop_assert_eq!(clock.banked(), Duration::from_nanos(total % 33_333_333));
            prop_assert!(clock.banked() < L);
            prop_assert_eq!(clock.logic_frame(), before + steps);
        }
    }
}
