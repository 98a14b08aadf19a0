//! Arena occupancy grid.
//!
//! Each cell is empty, a barrier, or holds the 1-based index of the agent
//! standing on it. The grid is only written by the serial phases of a step;
//! during the agent phase it is shared read-only.

use biosim_core::{Coord, Error, Result};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

pub const EMPTY: u32 = 0;
pub const BARRIER: u32 = u32::MAX;

/// Random probes tried before falling back to a full scan.
const RANDOM_PLACEMENT_ATTEMPTS: usize = 64;

#[derive(Debug, Clone)]
pub struct Grid {
    width: i16,
    height: i16,
    cells: Vec<u32>,
    barrier_locations: Vec<Coord>,
    barrier_centers: Vec<Coord>,
}

impl Grid {
    pub fn new(width: u16, height: u16) -> Self {
        let width = width.min(i16::MAX as u16) as i16;
        let height = height.min(i16::MAX as u16) as i16;
        Self {
            width,
            height,
            cells: vec![EMPTY; width as usize * height as usize],
            barrier_locations: Vec::new(),
            barrier_centers: Vec::new(),
        }
    }

    pub fn width(&self) -> i16 {
        self.width
    }

    pub fn height(&self) -> i16 {
        self.height
    }

    /// Clear every cell, barriers included.
    pub fn reset(&mut self) {
        self.cells.fill(EMPTY);
        self.barrier_locations.clear();
        self.barrier_centers.clear();
    }

    pub fn is_in_bounds(&self, loc: Coord) -> bool {
        loc.x >= 0 && loc.x < self.width && loc.y >= 0 && loc.y < self.height
    }

    fn idx(&self, loc: Coord) -> usize {
        debug_assert!(self.is_in_bounds(loc), "{loc} outside arena");
        loc.y as usize * self.width as usize + loc.x as usize
    }

    /// Raw cell value: [`EMPTY`], [`BARRIER`] or an agent index.
    pub fn at(&self, loc: Coord) -> u32 {
        self.cells[self.idx(loc)]
    }

    pub fn is_empty_at(&self, loc: Coord) -> bool {
        self.at(loc) == EMPTY
    }

    pub fn is_barrier_at(&self, loc: Coord) -> bool {
        self.at(loc) == BARRIER
    }

    /// True when an agent stands on `loc`.
    pub fn is_occupied_at(&self, loc: Coord) -> bool {
        let cell = self.at(loc);
        cell != EMPTY && cell != BARRIER
    }

    /// Index of the agent at `loc`, if any. Out-of-bounds cells are unoccupied.
    pub fn agent_at(&self, loc: Coord) -> Option<usize> {
        if !self.is_in_bounds(loc) {
            return None;
        }
        match self.at(loc) {
            EMPTY | BARRIER => None,
            index => Some(index as usize),
        }
    }

    /// Claim `loc` for agent `index`.
    pub fn set(&mut self, loc: Coord, index: usize) -> Result<()> {
        if !self.is_in_bounds(loc) {
            return Err(Error::InvalidState(format!("{loc} outside arena")));
        }
        debug_assert!(index != 0 && (index as u32) < BARRIER);
        let i = self.idx(loc);
        match self.cells[i] {
            EMPTY => {
                self.cells[i] = index as u32;
                Ok(())
            }
            cell if cell as usize == index => Ok(()),
            BARRIER => Err(Error::InvalidState(format!("{loc} is a barrier"))),
            other => Err(Error::InvalidState(format!(
                "{loc} already held by agent {other}"
            ))),
        }
    }

    /// Release `loc` if it holds an agent.
    pub fn clear(&mut self, loc: Coord) {
        let i = self.idx(loc);
        if self.cells[i] != BARRIER {
            self.cells[i] = EMPTY;
        }
    }

    /// Mark `loc` as a barrier; out-of-bounds cells are ignored.
    pub fn set_barrier(&mut self, loc: Coord) {
        if self.is_in_bounds(loc) {
            let i = self.idx(loc);
            if self.cells[i] != BARRIER {
                self.cells[i] = BARRIER;
                self.barrier_locations.push(loc);
            }
        }
    }

    pub fn add_barrier_center(&mut self, loc: Coord) {
        self.barrier_centers.push(loc);
    }

    pub fn barrier_locations(&self) -> &[Coord] {
        &self.barrier_locations
    }

    pub fn barrier_centers(&self) -> &[Coord] {
        &self.barrier_centers
    }

    /// A random empty cell, or `None` when the arena is full.
    pub fn find_empty_location(&self, rng: &mut ChaCha8Rng) -> Option<Coord> {
        for _ in 0..RANDOM_PLACEMENT_ATTEMPTS {
            let loc = Coord::new(rng.gen_range(0..self.width), rng.gen_range(0..self.height));
            if self.is_empty_at(loc) {
                return Some(loc);
            }
        }
        let empty = self.cells.iter().filter(|&&c| c == EMPTY).count();
        if empty == 0 {
            return None;
        }
        let nth = rng.gen_range(0..empty);
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == EMPTY)
            .nth(nth)
            .map(|(i, _)| self.coord_of(i))
    }

    fn coord_of(&self, index: usize) -> Coord {
        let w = self.width as usize;
        Coord::new((index % w) as i16, (index / w) as i16)
    }

    /// Call `f` for every in-bounds cell within `radius` of `center`,
    /// `center` included.
    pub fn visit_neighborhood<F>(&self, center: Coord, radius: f32, mut f: F)
    where
        F: FnMut(Coord),
    {
        let r = radius as i32;
        let (cx, cy) = (center.x as i32, center.y as i32);
        let (w, h) = (self.width as i32, self.height as i32);
        for dx in -r.min(cx)..=r.min(w - cx - 1) {
            let x = cx + dx;
            let extent = ((radius * radius) - (dx * dx) as f32).max(0.0).sqrt() as i32;
            for dy in -extent.min(cy)..=extent.min(h - cy - 1) {
                f(Coord::new(x as i16, (cy + dy) as i16));
            }
        }
    }

    /// Iterator over every cell and its raw value.
    pub fn iter(&self) -> impl Iterator<Item = (Coord, u32)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, &cell)| (self.coord_of(i), cell))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_grid_creation() {
        let grid = Grid::new(10, 8);
        assert_eq!(grid.width(), 10);
        assert_eq!(grid.height(), 8);
        assert_eq!(grid.iter().count(), 80);
        assert!(grid.iter().all(|(_, c)| c == EMPTY));
    }

    #[test]
    fn test_bounds() {
        let grid = Grid::new(4, 4);
        assert!(grid.is_in_bounds(Coord::new(0, 0)));
        assert!(grid.is_in_bounds(Coord::new(3, 3)));
        assert!(!grid.is_in_bounds(Coord::new(4, 0)));
        assert!(!grid.is_in_bounds(Coord::new(0, -1)));
        assert_eq!(grid.agent_at(Coord::new(-1, 0)), None);
    }

    #[test]
    fn test_set_and_clear() {
        let mut grid = Grid::new(4, 4);
        let loc = Coord::new(1, 2);
        grid.set(loc, 3).unwrap();
        assert!(grid.is_occupied_at(loc));
        assert_eq!(grid.agent_at(loc), Some(3));
        assert!(grid.set(loc, 3).is_ok());
        assert!(matches!(grid.set(loc, 4), Err(Error::InvalidState(_))));
        grid.clear(loc);
        assert!(grid.is_empty_at(loc));
        assert!(grid.set(Coord::new(9, 9), 1).is_err());
    }

    #[test]
    fn test_barriers_block_placement() {
        let mut grid = Grid::new(4, 4);
        let loc = Coord::new(2, 2);
        grid.set_barrier(loc);
        grid.set_barrier(loc);
        grid.set_barrier(Coord::new(10, 10));
        assert_eq!(grid.barrier_locations(), &[loc]);
        assert!(grid.is_barrier_at(loc));
        assert!(!grid.is_occupied_at(loc));
        assert!(grid.set(loc, 1).is_err());
        grid.clear(loc);
        assert!(grid.is_barrier_at(loc));

        grid.reset();
        assert!(grid.is_empty_at(loc));
        assert!(grid.barrier_locations().is_empty());
    }

    #[test]
    fn test_find_empty_location() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let mut grid = Grid::new(3, 3);
        for i in 1..=8 {
            let loc = grid.find_empty_location(&mut rng).unwrap();
            grid.set(loc, i).unwrap();
        }
        let last = grid.find_empty_location(&mut rng).unwrap();
        assert!(grid.is_empty_at(last));
        grid.set(last, 9).unwrap();
        assert_eq!(grid.find_empty_location(&mut rng), None);
    }

    #[test]
    fn test_visit_neighborhood() {
        let grid = Grid::new(10, 10);

        let mut count = 0;
        grid.visit_neighborhood(Coord::new(5, 5), 1.5, |_| count += 1);
        assert_eq!(count, 9);

        let mut count = 0;
        grid.visit_neighborhood(Coord::new(5, 5), 1.0, |_| count += 1);
        assert_eq!(count, 5);

        let mut cells = Vec::new();
        grid.visit_neighborhood(Coord::new(0, 0), 1.5, |c| cells.push(c));
        assert_eq!(cells.len(), 4);
        assert!(cells.iter().all(|&c| grid.is_in_bounds(c)));
    }
}
