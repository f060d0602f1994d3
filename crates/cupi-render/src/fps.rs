use std::time::{Duration, Instant};

/// Lissage exponentiel du temps de frame.
const SMOOTHING: f64 = 0.1;

/// Compteur FPS lissé, alimenté une fois par tour de boucle.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use cupi_render::fps::FpsCounter;
/// let mut counter = FpsCounter::new();
/// counter.record(Duration::from_millis(20));
/// assert!((counter.fps() - 50.0).abs() < 1e-9);
/// ```
#[derive(Debug, Default)]
pub struct FpsCounter {
    last: Option<Instant>,
    frame_time_ms: f64,
}

impl FpsCounter {
    /// Counter with no samples.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample the wall clock. Call once per frame, after drawing.
    pub fn tick(&mut self) {
        let now = Instant::now();
        if let Some(last) = self.last.replace(now) {
            self.record(now.duration_since(last));
        }
    }

    /// Feed one frame duration.
    pub fn record(&mut self, dt: Duration) {
        let ms = dt.as_secs_f64() * 1000.0;
        self.frame_time_ms = if self.frame_time_ms <= 0.0 {
            ms
        } else {
            self.frame_time_ms + (ms - self.frame_time_ms) * SMOOTHING
        };
    }

    /// Smoothed frame time in milliseconds.
    #[must_use]
    pub fn frame_time_ms(&self) -> f64 {
        self.frame_time_ms
    }

    /// Frames per second, 0 before the first sample.
    #[must_use]
    pub fn fps(&self) -> f64 {
        if self.frame_time_ms > 0.0 {
            1000.0 / self.frame_time_ms
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_before_samples() {
        let mut counter = FpsCounter::new();
        assert!(counter.fps().abs() < f64::EPSILON);
        counter.tick();
        assert!(counter.fps().abs() < f64::EPSILON);
    }

    #[test]
    fn smoothing_moves_toward_new_samples() {
        let mut counter = FpsCounter::new();
        counter.record(Duration::from_millis(10));
        counter.record(Duration::from_millis(20));
        assert!((counter.frame_time_ms() - 11.0).abs() < 1e-9);
    }
}
