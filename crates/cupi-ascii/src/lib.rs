/// Texte rasterisé sur un plan 3D, rendu en perspective puis converti en ASCII.
///
/// Bottom-up: `font` and `text` produce the texture, `scene` and `raster`
/// project the plane, `filter` turns the raster into characters,
/// `pipeline` ties one frame together and `mount` owns its lifecycle.
pub mod filter;
pub mod font;
pub mod mount;
pub mod pipeline;
pub mod raster;
pub mod scene;
pub mod text;

pub use filter::{AsciiFilter, HueCycler, asciify, responsive_font_size};
pub use font::{BlockFont, GlyphSource, OutlineFont};
pub use mount::{AsciiText, ContainerRect, IntersectionEntry, MountState};
pub use pipeline::AsciiScenePipeline;
pub use scene::{PerspectiveCamera, PlaneFit, Uniforms, fit_plane};
pub use text::TextCanvas;
