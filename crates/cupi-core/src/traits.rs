use crate::stage::{FrameId, Stage};

/// Composant piloté par les callbacks de frame du `Stage`.
///
/// Implémenté par : `CellularGridRenderer`, `AsciiText`.
///
/// The host drains [`FrameScheduler::take_due`] once per display refresh
/// and calls [`Animated::on_frame`] on every component whose pending request
/// is in the drained set. The component re-requests its own next frame.
///
/// [`FrameScheduler::take_due`]: crate::stage::FrameScheduler::take_due
///
/// # Example
/// ```
/// use cupi_core::stage::{FrameId, Stage, ViewportMetrics};
/// use cupi_core::traits::{dispatch_frame, Animated};
///
/// struct Counter { pending: Option<FrameId>, ticks: u32 }
/// impl Animated for Counter {
///     fn pending_frame(&self) -> Option<FrameId> { self.pending }
///     fn on_frame(&mut self, stage: &mut Stage, _now_secs: f64) {
///         self.ticks += 1;
///         self.pending = Some(stage.scheduler.request_frame());
///     }
/// }
///
/// let mut stage = Stage::new(ViewportMetrics::new(10, 10));
/// let mut c = Counter { pending: Some(stage.scheduler.request_frame()), ticks: 0 };
/// dispatch_frame(&mut stage, &mut [&mut c], 0.0);
/// dispatch_frame(&mut stage, &mut [&mut c], 0.016);
/// assert_eq!(c.ticks, 2);
/// ```
pub trait Animated {
    /// The frame request currently queued by this component, if any.
    fn pending_frame(&self) -> Option<FrameId>;

    /// Run one frame. `now_secs` is wall-clock time in seconds.
    fn on_frame(&mut self, stage: &mut Stage, now_secs: f64);
}

/// Drain the scheduler and run every component whose request is due.
///
/// Returns how many components ran.
pub fn dispatch_frame(
    stage: &mut Stage,
    components: &mut [&mut dyn Animated],
    now_secs: f64,
) -> usize {
    let due = stage.scheduler.take_due();
    let mut ran = 0;
    for component in components.iter_mut() {
        if component.pending_frame().is_some_and(|id| due.contains(&id)) {
            component.on_frame(stage, now_secs);
            ran += 1;
        }
    }
    ran
}
