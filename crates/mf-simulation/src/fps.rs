use std::time::Duration;

/// Render-rate counter. Publishes a new reading each time a full window of
/// frame time has been observed.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window: Duration,
    elapsed: Duration,
    frames: u32,
    fps: u32,
    readings: u64,
}

impl FpsCounter {
    /// A counter publishing one reading per `window` of frame time.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            elapsed: Duration::ZERO,
            frames: 0,
            fps: 0,
            readings: 0,
        }
    }

    /// Record one rendered frame that took `delta`. Returns the new reading
    /// when this frame completed a window.
    pub fn tick(&mut self, delta: Duration) -> Option<u32> {
        self.frames = self.frames.saturating_add(1);
        self.elapsed = self.elapsed.saturating_add(delta);
        if self.elapsed < self.window || self.window.is_zero() {
            return None;
        }

        // Scale to frames per second for windows other than one second.
        let per_second = f64::from(self.frames) / self.window.as_secs_f64();
        self.fps = per_second.round() as u32;
        self.frames = 0;
        self.elapsed = Duration::ZERO;
        self.readings += 1;
        Some(self.fps)
    }

    /// Most recent reading; 0 until the first window completes.
    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Number of readings published so far.
    pub fn readings(&self) -> u64 {
        self.readings
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIXTIETH: Duration = Duration::from_nanos(16_666_667);

    #[test]
    fn no_reading_before_a_full_second() {
        let mut fps = FpsCounter::default();
        for _ in 0..59 {
            assert_eq!(fps.tick(SIXTIETH), None);
        }
        assert_eq!(fps.fps(), 0);
    }

    #[test]
    fn sixty_frames_read_sixty() {
        let mut fps = FpsCounter::default();
        let readings: Vec<u32> = (0..60).filter_map(|_| fps.tick(SIXTIETH)).collect();
        assert_eq!(readings, vec![60]);
        assert_eq!(fps.fps(), 60);
        assert_eq!(fps.readings(), 1);
    }

    #[test]
    fn window_resets_after_reading() {
        let mut fps = FpsCounter::default();
        for _ in 0..60 {
            fps.tick(SIXTIETH);
        }
        for _ in 0..30 {
            fps.tick(Duration::from_nanos(33_333_334));
        }
        assert_eq!(fps.fps(), 30);
        assert_eq!(fps.readings(), 2);
    }

    #[test]
    fn half_second_window_scales() {
        let mut fps = FpsCounter::new(Duration::from_millis(500));
        for _ in 0..10 {
            fps.tick(Duration::from_millis(50));
        }
        assert_eq!(fps.fps(), 20);
    }
}
