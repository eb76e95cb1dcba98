use serde::{Deserialize, Serialize};

pub mod adventurer;
pub mod config;
pub mod map;
pub mod scenario;
pub mod simulation;

pub use adventurer::{Adventurer, Command, Orientation};
pub use config::{CommandPolicy, SimConfig};
pub use scenario::{Scenario, ScenarioError, Treasure, parse_scenario};
pub use simulation::{RoundOutcome, SimError, SimReport, SimResult, Simulation, simulate};

/// Index of an adventurer in its scenario's adventurer list.
pub type AdventurerId = usize;

/// Represents a 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Returns the position shifted by `(dx, dy)`, or `None` if either
    /// coordinate would go below zero.
    pub fn offset(self, dx: isize, dy: isize) -> Option<Position> {
        Some(Position {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }
}

/// Size of a treasure map. Valid coordinates are `[0, width) x [0, height)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
}

impl Dimensions {
    pub fn new(width: usize, height: usize) -> Self {
        Dimensions { width, height }
    }

    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        position.x < self.width && position.y < self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_stops_at_zero() {
        let origin = Position::new(0, 0);
        assert_eq!(origin.offset(-1, 0), None);
        assert_eq!(origin.offset(0, -1), None);
        assert_eq!(origin.offset(1, 0), Some(Position::new(1, 0)));
        assert_eq!(Position::new(2, 3).offset(0, -1), Some(Position::new(2, 2)));
    }

    #[test]
    fn dimensions_bounds_are_exclusive() {
        let dims = Dimensions::new(3, 4);
        assert!(dims.contains(Position::new(0, 0)));
        assert!(dims.contains(Position::new(2, 3)));
        assert!(!dims.contains(Position::new(3, 0)));
        assert!(!dims.contains(Position::new(0, 4)));
    }
}
