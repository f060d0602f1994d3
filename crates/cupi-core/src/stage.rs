use std::collections::{BTreeMap, BTreeSet};

use crate::canvas::Canvas2d;

/// Handle d'une requête de frame (équivalent d'un id `requestAnimationFrame`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FrameId(u64);

/// Handle of an overlay layer mounted on the stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(u64);

/// Handle of an input listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(u64);

/// Handle of a size/visibility observer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

/// Ordonnanceur coopératif, une file de requêtes par frame.
///
/// Components request the next frame from inside their own frame callback;
/// the host drains the set once per display refresh with [`take_due`].
///
/// [`take_due`]: FrameScheduler::take_due
///
/// # Example
/// ```
/// use cupi_core::stage::FrameScheduler;
/// let mut s = FrameScheduler::default();
/// let id = s.request_frame();
/// assert_eq!(s.pending_count(), 1);
/// assert!(s.cancel_frame(id));
/// assert_eq!(s.pending_count(), 0);
/// ```
#[derive(Debug, Default)]
pub struct FrameScheduler {
    next_id: u64,
    pending: BTreeSet<FrameId>,
    frames: u64,
}

impl FrameScheduler {
    /// Queue a callback for the next frame.
    pub fn request_frame(&mut self) -> FrameId {
        self.next_id += 1;
        let id = FrameId(self.next_id);
        self.pending.insert(id);
        id
    }

    /// Cancel a queued request. Returns `false` if it already fired or never existed.
    pub fn cancel_frame(&mut self, id: FrameId) -> bool {
        self.pending.remove(&id)
    }

    /// `true` while `id` waits for the next frame.
    #[must_use]
    pub fn is_pending(&self, id: FrameId) -> bool {
        self.pending.contains(&id)
    }

    /// Number of queued requests.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drain the requests due this frame. Requests made while dispatching
    /// them land in the next frame.
    pub fn take_due(&mut self) -> Vec<FrameId> {
        self.frames += 1;
        std::mem::take(&mut self.pending).into_iter().collect()
    }

    /// Frames dispatched so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

/// Mode de fusion d'une couche overlay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BlendMode {
    /// Plain source-over.
    #[default]
    Normal,
    /// `mix-blend-mode: difference`.
    Difference,
}

/// A text overlay (the `<pre>` the ASCII pipeline writes into).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OverlayLayer {
    /// Rows joined by `\n`.
    pub text: String,
    /// Glyph size in CSS pixels.
    pub font_size: f32,
    /// Monospace family used to display the art.
    pub font_family: String,
    /// Text colour before filters.
    pub color: (u8, u8, u8),
    /// `hue-rotate` filter in degrees.
    pub hue_rotate_deg: f32,
    /// Blend mode against what is underneath.
    pub blend: BlendMode,
}

/// Where a listener is attached.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventTarget {
    /// The top-level window.
    Window,
    /// The whole document.
    Document,
    /// A component's own container box.
    Container,
}

/// Which input a listener consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Mouse motion.
    PointerMove,
    /// Touch motion.
    TouchMove,
    /// Window resize.
    Resize,
    /// Page scroll.
    Scroll,
}

/// What an observer watches.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ObserverKind {
    /// Fires once the container becomes visible past `threshold`.
    Intersection {
        /// Visible fraction needed.
        threshold: f32,
    },
    /// Container content-box size changes.
    ContainerResize,
    /// Document element size changes.
    DocumentResize,
}

/// Mesures du viewport telles que lues par les composants.
///
/// # Example
/// ```
/// use cupi_core::stage::ViewportMetrics;
/// let m = ViewportMetrics::new(1280, 720);
/// assert_eq!(m.canvas_height(), 720);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportMetrics {
    /// `window.innerWidth`.
    pub inner_width: u32,
    /// `window.innerHeight`.
    pub inner_height: u32,
    /// `documentElement.clientHeight`.
    pub client_height: u32,
    /// `documentElement.scrollHeight`.
    pub document_scroll_height: u32,
    /// `body.scrollHeight`.
    pub body_scroll_height: u32,
    /// Device pixel ratio applied to pointer coordinates.
    pub device_pixel_ratio: f32,
}

impl ViewportMetrics {
    /// Viewport whose document is exactly one screen tall.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            inner_width: width,
            inner_height: height,
            client_height: height,
            document_scroll_height: height,
            body_scroll_height: height,
            device_pixel_ratio: 1.0,
        }
    }

    /// Full scrollable height the background must cover.
    #[must_use]
    pub fn canvas_height(&self) -> u32 {
        self.document_scroll_height
            .max(self.body_scroll_height)
            .max(self.client_height)
            .max(self.inner_height)
    }
}

impl Default for ViewportMetrics {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

/// L'hôte des composants : remplace le navigateur.
///
/// Owns the frame scheduler, the overlay layers, and the registries of
/// listeners and observers, so that mounting and disposal are observable
/// and leak-checkable.
///
/// # Example
/// ```
/// use cupi_core::stage::{Stage, ViewportMetrics};
/// let mut stage = Stage::new(ViewportMetrics::new(800, 600));
/// let canvas = stage.acquire_canvas();
/// assert!(canvas.is_some());
/// assert_eq!(stage.live_canvases(), 1);
/// ```
#[derive(Debug)]
pub struct Stage {
    /// Frame callbacks.
    pub scheduler: FrameScheduler,
    viewport: ViewportMetrics,
    canvas_supported: bool,
    live_canvases: usize,
    next_id: u64,
    layers: BTreeMap<LayerId, OverlayLayer>,
    listeners: BTreeMap<ListenerId, (EventTarget, EventKind)>,
    observers: BTreeMap<ObserverId, ObserverKind>,
}

impl Stage {
    /// Create a stage with 2D canvas support.
    #[must_use]
    pub fn new(viewport: ViewportMetrics) -> Self {
        Self {
            scheduler: FrameScheduler::default(),
            viewport,
            canvas_supported: true,
            live_canvases: 0,
            next_id: 0,
            layers: BTreeMap::new(),
            listeners: BTreeMap::new(),
            observers: BTreeMap::new(),
        }
    }

    /// Create a stage whose canvas contexts are unavailable.
    #[must_use]
    pub fn without_canvas(viewport: ViewportMetrics) -> Self {
        Self {
            canvas_supported: false,
            ..Self::new(viewport)
        }
    }

    fn next(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Current viewport metrics.
    #[must_use]
    pub fn viewport(&self) -> ViewportMetrics {
        self.viewport
    }

    /// Update viewport metrics (window resize, content growth).
    pub fn set_viewport(&mut self, viewport: ViewportMetrics) {
        self.viewport = viewport;
    }

    // === Canvas ===

    /// Obtain a 2D context, or `None` when the host cannot provide one.
    pub fn acquire_canvas(&mut self) -> Option<Canvas2d> {
        if !self.canvas_supported {
            return None;
        }
        self.live_canvases += 1;
        Some(Canvas2d::new(0, 0))
    }

    /// Give a context back.
    pub fn release_canvas(&mut self, canvas: Canvas2d) {
        drop(canvas);
        self.live_canvases = self.live_canvases.saturating_sub(1);
    }

    /// Contexts handed out and not yet released.
    #[must_use]
    pub fn live_canvases(&self) -> usize {
        self.live_canvases
    }

    // === Overlays ===

    /// Mount an overlay layer.
    pub fn append_layer(&mut self, layer: OverlayLayer) -> LayerId {
        let id = LayerId(self.next());
        self.layers.insert(id, layer);
        id
    }

    /// Mutable access to a mounted layer.
    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut OverlayLayer> {
        self.layers.get_mut(&id)
    }

    /// Read access to a mounted layer.
    #[must_use]
    pub fn layer(&self, id: LayerId) -> Option<&OverlayLayer> {
        self.layers.get(&id)
    }

    /// Unmount a layer. Returns `false` if it was not mounted.
    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        self.layers.remove(&id).is_some()
    }

    /// Mounted layers in mount order.
    pub fn layers(&self) -> impl Iterator<Item = (LayerId, &OverlayLayer)> {
        self.layers.iter().map(|(id, layer)| (*id, layer))
    }

    // === Listeners ===

    /// Attach a listener.
    pub fn add_listener(&mut self, target: EventTarget, kind: EventKind) -> ListenerId {
        let id = ListenerId(self.next());
        self.listeners.insert(id, (target, kind));
        id
    }

    /// Detach a listener.
    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// `true` while the listener is attached.
    #[must_use]
    pub fn has_listener(&self, id: ListenerId) -> bool {
        self.listeners.contains_key(&id)
    }

    /// Attached listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    // === Observers ===

    /// Start observing.
    pub fn observe(&mut self, kind: ObserverKind) -> ObserverId {
        let id = ObserverId(self.next());
        self.observers.insert(id, kind);
        id
    }

    /// Stop observing.
    pub fn disconnect(&mut self, id: ObserverId) -> bool {
        self.observers.remove(&id).is_some()
    }

    /// `true` while the observer is connected.
    #[must_use]
    pub fn is_observing(&self, id: ObserverId) -> bool {
        self.observers.contains_key(&id)
    }

    /// Connected observers.
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_made_during_dispatch_wait_for_next_frame() {
        let mut s = FrameScheduler::default();
        let first = s.request_frame();
        let due = s.take_due();
        assert_eq!(due, vec![first]);
        let second = s.request_frame();
        assert!(s.is_pending(second));
        assert!(!s.is_pending(first));
        assert_eq!(s.frames(), 1);
    }

    #[test]
    fn cancel_after_fire_is_false() {
        let mut s = FrameScheduler::default();
        let id = s.request_frame();
        let _ = s.take_due();
        assert!(!s.cancel_frame(id));
    }

    #[test]
    fn canvas_height_takes_tallest_measure() {
        let mut m = ViewportMetrics::new(100, 300);
        m.document_scroll_height = 1200;
        m.body_scroll_height = 900;
        assert_eq!(m.canvas_height(), 1200);
    }

    #[test]
    fn unsupported_canvas_yields_none() {
        let mut stage = Stage::without_canvas(ViewportMetrics::new(10, 10));
        assert!(stage.acquire_canvas().is_none());
        assert_eq!(stage.live_canvases(), 0);
    }

    #[test]
    fn registries_track_attach_and_detach() {
        let mut stage = Stage::new(ViewportMetrics::new(10, 10));
        let l = stage.add_listener(EventTarget::Document, EventKind::PointerMove);
        let o = stage.observe(ObserverKind::ContainerResize);
        let layer = stage.append_layer(OverlayLayer::default());
        assert_eq!(stage.listener_count(), 1);
        assert!(stage.remove_listener(l));
        assert!(stage.disconnect(o));
        assert!(stage.remove_layer(layer));
        assert!(!stage.remove_layer(layer));
        assert_eq!(stage.observer_count(), 0);
    }
}
