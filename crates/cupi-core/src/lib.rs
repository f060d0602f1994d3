/// Configuration, types, and shared structures for cupiscii.
///
/// This crate contains the pieces shared by the Game-of-Life background,
/// the ASCII text pipeline, and the terminal front-end: configuration,
/// pixel buffers, the ASCII ramp, colour maths, and the `Stage` that stands
/// in for the browser host (frame scheduler, overlay layers, listeners).

pub mod canvas;
pub mod charset;
pub mod color;
pub mod config;
pub mod error;
pub mod frame;
pub mod presentation;
pub mod stage;
pub mod traits;

pub use canvas::Canvas2d;
pub use charset::AsciiRamp;
pub use config::{AppConfig, AsciiTextConfig, GridConfig};
pub use error::CoreError;
pub use frame::FrameBuffer;
pub use presentation::{PresentationEvent, PresentationState};
pub use stage::{FrameId, FrameScheduler, Stage, ViewportMetrics};
pub use traits::Animated;
