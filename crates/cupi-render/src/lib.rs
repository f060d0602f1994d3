/// Terminal rendition of the stage.
///
/// `sampler` shrinks the background canvas to one pixel per cell,
/// `canvas` composites background and overlays into a ratatui buffer,
/// `fps` measures the loop and `ui` lays out a whole frame.
pub mod canvas;
pub mod fps;
pub mod sampler;
pub mod ui;
