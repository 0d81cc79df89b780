//! Per-pixel occupancy grid

/// Dense boolean map of "something rests here", one byte per screen pixel,
/// indexed `y * width + x`.
///
/// A cell is set iff exactly one particle (mobile or resting) currently
/// claims it; claims are transferred within a single update step, so the
/// renderer never sees an intermediate state. The grid is touched only from
/// the one simulation update per frame, so there is no locking.
///
/// Bounds are the contract, not an exception: any out-of-range index is
/// rejected without effect.
pub struct OccupancyGrid {
    width: u32,
    height: u32,
    cells: Vec<u8>,
}

impl OccupancyGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![0; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Flat index for in-bounds pixel coordinates.
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn is_occupied(&self, index: usize) -> bool {
        self.cells.get(index).is_some_and(|&c| c != 0)
    }

    /// Claim a free cell. Returns false if the cell is already occupied or
    /// the index is out of range; the caller must not move there.
    pub fn try_claim(&mut self, index: usize) -> bool {
        match self.cells.get_mut(index) {
            Some(cell) if *cell == 0 => {
                *cell = 1;
                true
            }
            _ => false,
        }
    }

    /// Mark a cell occupied regardless of its previous state.
    pub fn claim(&mut self, index: usize) {
        if let Some(cell) = self.cells.get_mut(index) {
            *cell = 1;
        }
    }

    pub fn release(&mut self, index: usize) {
        if let Some(cell) = self.cells.get_mut(index) {
            *cell = 0;
        }
    }

    /// Number of set cells. Linear scan; diagnostics and tests only.
    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    /// Reset to a new size, dropping every claim. Callers holding cached
    /// indices must recompute them from (x, y) afterwards.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.cells.clear();
        self.cells.resize((width * height) as usize, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_release_roundtrip() {
        let mut grid = OccupancyGrid::new(4, 4);
        let idx = grid.index(2, 1).unwrap();
        assert!(!grid.is_occupied(idx));
        assert!(grid.try_claim(idx));
        assert!(grid.is_occupied(idx));
        grid.release(idx);
        assert!(!grid.is_occupied(idx));
    }

    #[test]
    fn test_try_claim_rejects_occupied() {
        let mut grid = OccupancyGrid::new(4, 4);
        let idx = grid.index(0, 0).unwrap();
        assert!(grid.try_claim(idx));
        assert!(!grid.try_claim(idx));
        assert_eq!(grid.occupied_count(), 1);
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let mut grid = OccupancyGrid::new(4, 4);
        assert!(grid.index(-1, 0).is_none());
        assert!(grid.index(0, 4).is_none());
        assert!(!grid.try_claim(usize::MAX));
        grid.claim(9999);
        grid.release(9999);
        assert_eq!(grid.occupied_count(), 0);
    }

    #[test]
    fn test_index_layout() {
        let grid = OccupancyGrid::new(10, 5);
        assert_eq!(grid.index(3, 2), Some(23));
        assert_eq!(grid.index(9, 4), Some(49));
    }

    #[test]
    fn test_resize_drops_claims() {
        let mut grid = OccupancyGrid::new(8, 8);
        let idx = grid.index(7, 7).unwrap();
        grid.claim(idx);
        grid.resize(16, 16);
        assert_eq!(grid.occupied_count(), 0);
        assert_eq!(grid.width(), 16);
        assert!(grid.index(15, 15).is_some());
    }
}
