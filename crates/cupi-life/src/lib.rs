/// Conway's Game of Life painted as the page background.
///
/// `grid` holds the double-buffered automaton, `renderer` the mountable
/// component that sizes, steps and paints it frame after frame.
pub mod grid;
pub mod renderer;

pub use grid::LifeGrid;
pub use renderer::CellularGridRenderer;
