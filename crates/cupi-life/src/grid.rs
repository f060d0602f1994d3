use rayon::prelude::*;

/// Grille torique de cellules binaires, double-bufferisée.
///
/// `cells` holds the current generation, `scratch` receives the next one;
/// [`step`](LifeGrid::step) swaps them so every step reads a complete
/// prior generation.
///
/// # Example
/// ```
/// use cupi_life::grid::LifeGrid;
/// let mut grid = LifeGrid::new(5, 5);
/// // Blinker.
/// grid.set(1, 2, true);
/// grid.set(2, 2, true);
/// grid.set(3, 2, true);
/// grid.step();
/// assert!(grid.get(2, 1) && grid.get(2, 2) && grid.get(2, 3));
/// assert!(!grid.get(1, 2) && !grid.get(3, 2));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LifeGrid {
    cells: Vec<bool>,
    scratch: Vec<bool>,
    cols: usize,
    rows: usize,
}

impl LifeGrid {
    /// All-dead grid of `cols × rows`.
    #[must_use]
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cells: vec![false; cols * rows],
            scratch: vec![false; cols * rows],
            cols,
            rows,
        }
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// `true` when either dimension is zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cols == 0 || self.rows == 0
    }

    /// State at (col, row). Out-of-range reads are dead.
    #[inline(always)]
    #[must_use]
    pub fn get(&self, col: usize, row: usize) -> bool {
        col < self.cols && row < self.rows && self.cells[row * self.cols + col]
    }

    /// Set the state at (col, row). Out-of-range writes are dropped.
    #[inline]
    pub fn set(&mut self, col: usize, row: usize, alive: bool) {
        if col < self.cols && row < self.rows {
            self.cells[row * self.cols + col] = alive;
        }
    }

    /// Kill every cell.
    pub fn clear(&mut self) {
        self.cells.fill(false);
    }

    /// Number of live cells.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    /// Each cell independently alive with probability `density`.
    pub fn seed(&mut self, rng: &mut fastrand::Rng, density: f64) {
        for cell in &mut self.cells {
            *cell = rng.f64() < density;
        }
    }

    /// Live neighbours among the 8 adjacent cells, wrapping at the edges.
    ///
    /// Offsets wrap independently, so on a 1-wide or 1-tall grid a cell can
    /// see itself (and the same neighbour) more than once.
    ///
    /// # Example
    /// ```
    /// use cupi_life::grid::LifeGrid;
    /// let mut grid = LifeGrid::new(4, 4);
    /// grid.set(0, 3, true); // bottom-left corner
    /// assert_eq!(grid.live_neighbors(0, 0), 1); // wraps to the top row
    /// assert_eq!(grid.live_neighbors(3, 0), 1); // and the right column
    /// ```
    #[must_use]
    pub fn live_neighbors(&self, col: usize, row: usize) -> u8 {
        if self.is_empty() {
            return 0;
        }
        count_neighbors(&self.cells, self.cols, self.rows, col, row)
    }

    /// Advance one generation.
    ///
    /// Dead with exactly 3 neighbours → born; live with fewer than 2 or more
    /// than 3 → dies; otherwise unchanged. No-op on an empty grid.
    pub fn step(&mut self) {
        if self.is_empty() {
            return;
        }
        let cols = self.cols;
        let rows = self.rows;
        let current = &self.cells;
        self.scratch
            .par_chunks_mut(cols)
            .enumerate()
            .for_each(|(row, out)| {
                for (col, next) in out.iter_mut().enumerate() {
                    let alive = current[row * cols + col];
                    let n = count_neighbors(current, cols, rows, col, row);
                    *next = matches!((alive, n), (false, 3) | (true, 2 | 3));
                }
            });
        std::mem::swap(&mut self.cells, &mut self.scratch);
    }

    /// Iterate over live cells as (col, row).
    pub fn live_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let cols = self.cols;
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, alive)| **alive)
            .map(move |(i, _)| (i % cols, i / cols))
    }
}

#[inline(always)]
fn count_neighbors(cells: &[bool], cols: usize, rows: usize, col: usize, row: usize) -> u8 {
    const OFFSETS: [isize; 3] = [-1, 0, 1];
    let mut count = 0u8;
    for dr in OFFSETS {
        for dc in OFFSETS {
            if dr == 0 && dc == 0 {
                continue;
            }
            let r = (row + rows).wrapping_add_signed(dr) % rows;
            let c = (col + cols).wrapping_add_signed(dc) % cols;
            count += u8::from(cells[r * cols + c]);
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blinker(grid: &mut LifeGrid, col: usize, row: usize) {
        grid.set(col - 1, row, true);
        grid.set(col, row, true);
        grid.set(col + 1, row, true);
    }

    #[test]
    fn blinker_oscillates_on_100_by_60() {
        let mut grid = LifeGrid::new(100, 60);
        blinker(&mut grid, 50, 30);
        let original = grid.clone();

        grid.step();
        assert_eq!(grid.live_count(), 3);
        assert!(grid.get(50, 29) && grid.get(50, 30) && grid.get(50, 31));
        assert!(!grid.get(49, 30), "end of the row must die (1 neighbour)");
        assert!(!grid.get(51, 30), "end of the row must die (1 neighbour)");

        grid.step();
        assert_eq!(grid.cells, original.cells);
    }

    #[test]
    fn birth_needs_exactly_three() {
        let mut grid = LifeGrid::new(6, 6);
        grid.set(1, 1, true);
        grid.set(2, 1, true);
        grid.set(3, 1, true);
        assert_eq!(grid.live_neighbors(2, 2), 3);
        grid.step();
        assert!(grid.get(2, 2));
    }

    #[test]
    fn overcrowded_cell_dies() {
        let mut grid = LifeGrid::new(6, 6);
        grid.set(2, 2, true);
        for (c, r) in [(1, 1), (2, 1), (3, 1), (1, 2)] {
            grid.set(c, r, true);
        }
        assert_eq!(grid.live_neighbors(2, 2), 4);
        grid.step();
        assert!(!grid.get(2, 2));
    }

    #[test]
    fn lonely_cell_dies() {
        let mut grid = LifeGrid::new(6, 6);
        grid.set(2, 2, true);
        grid.set(3, 2, true);
        grid.step();
        assert_eq!(grid.live_count(), 0);
    }

    #[test]
    fn row_zero_counts_last_row() {
        let mut grid = LifeGrid::new(8, 5);
        grid.set(3, 4, true);
        grid.set(4, 4, true);
        grid.set(5, 4, true);
        assert_eq!(grid.live_neighbors(4, 0), 3);
        grid.step();
        // Vertical blinker across the seam: rows 3, 4, 0.
        assert!(grid.get(4, 3) && grid.get(4, 4) && grid.get(4, 0));
    }

    #[test]
    fn single_row_wraps_onto_itself() {
        let mut grid = LifeGrid::new(5, 1);
        grid.set(2, 0, true);
        // Rows above and below are row 0 again.
        assert_eq!(grid.live_neighbors(2, 0), 2);
        assert_eq!(grid.live_neighbors(3, 0), 3);
        assert_eq!(grid.live_neighbors(0, 0), 0);
    }

    #[test]
    fn single_column_wraps_onto_itself() {
        let mut grid = LifeGrid::new(1, 5);
        grid.set(0, 2, true);
        assert_eq!(grid.live_neighbors(0, 2), 2);
        assert_eq!(grid.live_neighbors(0, 1), 3);
        assert_eq!(grid.live_neighbors(0, 4), 0);
        grid.step();
        // 2 neighbours keeps it; 3 around it is a birth.
        assert!(grid.get(0, 2) && grid.get(0, 1) && grid.get(0, 3));
    }

    #[test]
    fn block_is_still_life() {
        let mut grid = LifeGrid::new(10, 10);
        for (c, r) in [(4, 4), (5, 4), (4, 5), (5, 5)] {
            grid.set(c, r, true);
        }
        let before = grid.clone();
        grid.step();
        assert_eq!(grid.cells, before.cells);
    }

    #[test]
    fn seed_density_roughly_respected() {
        let mut grid = LifeGrid::new(200, 100);
        let mut rng = fastrand::Rng::with_seed(42);
        grid.seed(&mut rng, 0.3);
        let ratio = grid.live_count() as f64 / 20_000.0;
        assert!((0.27..0.33).contains(&ratio), "ratio {ratio}");
    }

    #[test]
    fn empty_grid_step_is_noop() {
        let mut grid = LifeGrid::new(0, 10);
        grid.step();
        assert!(grid.is_empty());
    }

    #[test]
    fn live_cells_reports_coordinates() {
        let mut grid = LifeGrid::new(3, 3);
        grid.set(2, 1, true);
        assert_eq!(grid.live_cells().collect::<Vec<_>>(), vec![(2, 1)]);
    }
}
