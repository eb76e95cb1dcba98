use std::{collections::VecDeque, fmt};

use serde::{Deserialize, Serialize};

use crate::Position;

/// Cardinal direction an adventurer is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    North,
    East,
    South,
    West,
}

impl Orientation {
    /// Counter-clockwise quarter turn.
    pub fn turn_left(self) -> Self {
        match self {
            Orientation::North => Orientation::West,
            Orientation::West => Orientation::South,
            Orientation::South => Orientation::East,
            Orientation::East => Orientation::North,
        }
    }

    /// Clockwise quarter turn.
    pub fn turn_right(self) -> Self {
        match self {
            Orientation::North => Orientation::East,
            Orientation::East => Orientation::South,
            Orientation::South => Orientation::West,
            Orientation::West => Orientation::North,
        }
    }

    /// Unit step `(dx, dy)` for moving forward. North is towards row 0.
    pub fn offset(self) -> (isize, isize) {
        match self {
            Orientation::North => (0, -1),
            Orientation::East => (1, 0),
            Orientation::South => (0, 1),
            Orientation::West => (-1, 0),
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'N' => Some(Orientation::North),
            'E' => Some(Orientation::East),
            'S' => Some(Orientation::South),
            'W' => Some(Orientation::West),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Orientation::North => 'N',
            Orientation::East => 'E',
            Orientation::South => 'S',
            Orientation::West => 'W',
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A single instruction from an adventurer's command string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// `A`: step one cell in the facing direction.
    Forward,
    /// `G`: quarter turn counter-clockwise.
    TurnLeft,
    /// `D`: quarter turn clockwise.
    TurnRight,
    /// Any other character. Handling depends on the command policy.
    Unknown(char),
}

impl Command {
    pub fn symbol(self) -> char {
        match self {
            Command::Forward => 'A',
            Command::TurnLeft => 'G',
            Command::TurnRight => 'D',
            Command::Unknown(symbol) => symbol,
        }
    }
}

impl From<char> for Command {
    fn from(symbol: char) -> Self {
        match symbol {
            'A' => Command::Forward,
            'G' => Command::TurnLeft,
            'D' => Command::TurnRight,
            other => Command::Unknown(other),
        }
    }
}

/// An adventurer walking the treasure map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adventurer {
    pub name: String,
    pub position: Position,
    pub orientation: Orientation,
    /// Pending commands, front first.
    pub commands: VecDeque<Command>,
    /// Number of treasures picked up so far.
    pub collected: usize,
}

impl Adventurer {
    pub fn new(name: impl Into<String>, position: Position, orientation: Orientation) -> Self {
        Adventurer {
            name: name.into(),
            position,
            orientation,
            commands: VecDeque::new(),
            collected: 0,
        }
    }

    /// Replaces the command queue with one command per character of `script`.
    pub fn with_commands(mut self, script: &str) -> Self {
        self.commands = script.chars().map(Command::from).collect();
        self
    }

    pub fn has_pending_commands(&self) -> bool {
        !self.commands.is_empty()
    }
}
