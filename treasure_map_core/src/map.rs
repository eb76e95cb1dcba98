use std::collections::{HashMap, hash_map::Entry};

use crate::{Dimensions, Position};

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Coordinates ({x}, {y}) are out of bounds for grid size ({width}, {height})")]
    OutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },
}

/// A bounded 2D index holding values only for the cells that have one.
///
/// Memory grows with the number of entries, not with `width * height`, so a
/// map may be as large as `usize` allows. The simulation keeps one index each
/// for mountains, treasures and occupancy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SparseGrid<T> {
    dimensions: Dimensions,
    cells: HashMap<Position, T>,
}

impl<T> SparseGrid<T> {
    /// Creates an empty index covering `dimensions`.
    pub fn new(dimensions: Dimensions) -> Self {
        SparseGrid {
            dimensions,
            cells: HashMap::new(),
        }
    }

    /// Checks if the given position is within the grid boundaries.
    #[inline]
    pub fn is_valid(&self, position: Position) -> bool {
        self.dimensions.contains(position)
    }

    /// Gets the value stored at `position`, if any.
    pub fn get(&self, position: Position) -> Option<&T> {
        self.cells.get(&position)
    }

    pub fn contains(&self, position: Position) -> bool {
        self.cells.contains_key(&position)
    }

    /// Stores `value` at `position`, returning the value it replaced.
    ///
    /// Returns `Err(GridError::OutOfBounds)` if the position is invalid.
    pub fn set(&mut self, position: Position, value: T) -> Result<Option<T>, GridError> {
        if !self.is_valid(position) {
            return Err(GridError::OutOfBounds {
                x: position.x,
                y: position.y,
                width: self.dimensions.width,
                height: self.dimensions.height,
            });
        }
        Ok(self.cells.insert(position, value))
    }

    /// Removes the value at `position` if `remove` accepts it.
    pub fn remove_if(&mut self, position: Position, remove: impl FnOnce(&T) -> bool) -> Option<T> {
        if let Entry::Occupied(entry) = self.cells.entry(position) {
            if remove(entry.get()) {
                return Some(entry.remove());
            }
        }
        None
    }

    /// Iterates over the filled cells in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &T)> {
        self.cells.iter().map(|(position, value)| (*position, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_grid_is_empty() {
        let grid: SparseGrid<usize> = SparseGrid::new(Dimensions::new(3, 2));
        assert_eq!(grid.iter().count(), 0);
        assert_eq!(grid.get(Position::new(0, 0)), None);
        assert!(grid.is_valid(Position::new(2, 1)));
        assert!(!grid.is_valid(Position::new(3, 1)));
    }

    #[test]
    fn set_returns_replaced_value() {
        let mut grid = SparseGrid::new(Dimensions::new(3, 4));
        assert_eq!(grid.set(Position::new(2, 3), 'a'), Ok(None));
        assert_eq!(grid.set(Position::new(2, 3), 'b'), Ok(Some('a')));
        assert_eq!(grid.get(Position::new(2, 3)), Some(&'b'));
        assert!(grid.contains(Position::new(2, 3)));
        assert_eq!(grid.iter().count(), 1);
    }

    #[test]
    fn out_of_bounds_set_is_rejected() {
        let mut grid = SparseGrid::new(Dimensions::new(2, 2));
        assert_eq!(
            grid.set(Position::new(5, 1), ()),
            Err(GridError::OutOfBounds {
                x: 5,
                y: 1,
                width: 2,
                height: 2
            })
        );
        assert!(!grid.contains(Position::new(5, 1)));
    }

    #[test]
    fn remove_if_checks_the_stored_value() {
        let mut grid = SparseGrid::new(Dimensions::new(2, 2));
        grid.set(Position::new(1, 1), 7).unwrap();
        assert_eq!(grid.remove_if(Position::new(1, 1), |&v| v == 3), None);
        assert_eq!(grid.remove_if(Position::new(0, 0), |_| true), None);
        assert_eq!(grid.remove_if(Position::new(1, 1), |&v| v == 7), Some(7));
        assert!(!grid.contains(Position::new(1, 1)));
    }

    #[test]
    fn huge_dimensions_cost_nothing() {
        let mut grid = SparseGrid::new(Dimensions::new(usize::MAX, usize::MAX));
        let far = Position::new(usize::MAX - 1, usize::MAX - 1);
        grid.set(far, true).unwrap();
        assert_eq!(grid.iter().collect::<Vec<_>>(), vec![(far, &true)]);
    }
}
