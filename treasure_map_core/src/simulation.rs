use std::{mem, ops::AddAssign};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    Adventurer, AdventurerId, Command, CommandPolicy, Dimensions, Orientation, Position, Scenario,
    SimConfig, map::SparseGrid,
};

/// Errors that prevent a simulation from running.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error("invalid scenario: map dimensions are not defined")]
    InvalidScenario,
    #[error("adventurer {adventurer} has unknown command '{command}'")]
    InvalidCommand { adventurer: String, command: char },
}

pub type SimResult<T> = Result<T, SimError>;

/// Why a forward move was absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Blocked {
    OutOfBounds,
    Mountain,
    Occupied,
}

/// What applying one command did to its adventurer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEffect {
    Moved {
        from: Position,
        to: Position,
        collected: bool,
    },
    Blocked(Blocked),
    Turned(Orientation),
    Ignored(char),
}

/// Tally of one round, or of a whole run when summed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub commands: usize,
    pub moves: usize,
    pub blocked: usize,
    pub collected: usize,
}

impl RoundOutcome {
    fn record(&mut self, effect: CommandEffect) {
        self.commands += 1;
        match effect {
            CommandEffect::Moved { collected, .. } => {
                self.moves += 1;
                if collected {
                    self.collected += 1;
                }
            }
            CommandEffect::Blocked(_) => self.blocked += 1,
            CommandEffect::Turned(_) | CommandEffect::Ignored(_) => {}
        }
    }
}

/// Totals for a simulation run so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimReport {
    pub rounds: usize,
    pub commands: usize,
    pub moves: usize,
    pub blocked: usize,
    pub collected: usize,
}

impl AddAssign<RoundOutcome> for SimReport {
    fn add_assign(&mut self, round: RoundOutcome) {
        self.rounds += 1;
        self.commands += round.commands;
        self.moves += round.moves;
        self.blocked += round.blocked;
        self.collected += round.collected;
    }
}

/// Round-based movement engine.
///
/// Owns the scenario for the duration of the run. Adventurers and treasures
/// stay in the scenario's vectors; the sparse indexes only map cells to
/// positions in those vectors.
#[derive(Debug)]
pub struct Simulation {
    scenario: Scenario,
    dimensions: Dimensions,
    mountains: SparseGrid<()>,
    treasures: SparseGrid<usize>,
    occupancy: SparseGrid<AdventurerId>,
    remaining: usize,
    report: SimReport,
}

impl Simulation {
    /// Checks the scenario against `config` and builds the lookup indexes.
    pub fn new(scenario: Scenario, config: &SimConfig) -> SimResult<Self> {
        let dimensions = preflight(&scenario, config)?;

        let mut mountains = SparseGrid::new(dimensions);
        for &position in &scenario.mountains {
            if let Err(err) = mountains.set(position, ()) {
                warn!(%err, "mountain outside the map ignored");
            }
        }

        let mut treasures = SparseGrid::new(dimensions);
        for (index, treasure) in scenario.treasures.iter().enumerate() {
            if let Err(err) = treasures.set(treasure.position, index) {
                warn!(%err, "treasure outside the map ignored");
            }
        }

        let mut occupancy = SparseGrid::new(dimensions);
        for (id, adventurer) in scenario.adventurers.iter().enumerate() {
            if let Err(err) = occupancy.set(adventurer.position, id) {
                warn!(adventurer = %adventurer.name, %err, "adventurer starts outside the map");
            }
        }

        let remaining: usize = scenario
            .adventurers
            .iter()
            .map(|adventurer| adventurer.commands.len())
            .sum();

        debug!(
            width = dimensions.width,
            height = dimensions.height,
            adventurers = scenario.adventurers.len(),
            remaining,
            "simulation ready"
        );

        Ok(Simulation {
            scenario,
            dimensions,
            mountains,
            treasures,
            occupancy,
            remaining,
            report: SimReport::default(),
        })
    }

    /// Runs one round: every adventurer with a pending command, in scenario
    /// order, pops and applies exactly one command before the next one acts.
    ///
    /// Returns an empty outcome once all queues are exhausted.
    pub fn step_round(&mut self) -> RoundOutcome {
        let mut outcome = RoundOutcome::default();
        if self.is_finished() {
            return outcome;
        }

        for id in 0..self.scenario.adventurers.len() {
            let Some(command) = self.scenario.adventurers[id].commands.pop_front() else {
                continue;
            };
            self.remaining -= 1;
            let effect = self.apply(id, command);
            trace!(
                adventurer = %self.scenario.adventurers[id].name,
                command = %command.symbol(),
                ?effect,
                "command applied"
            );
            outcome.record(effect);
        }

        self.report += outcome;
        debug!(
            round = self.report.rounds,
            ?outcome,
            remaining = self.remaining,
            "round complete"
        );
        outcome
    }

    /// Runs rounds until every command queue is empty.
    pub fn run(&mut self) -> SimReport {
        while !self.is_finished() {
            self.step_round();
        }
        self.report
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    /// Commands still queued across all adventurers.
    pub fn remaining_commands(&self) -> usize {
        self.remaining
    }

    /// Number of rounds played so far.
    pub fn round(&self) -> usize {
        self.report.rounds
    }

    pub fn report(&self) -> SimReport {
        self.report
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    /// Which adventurer, if any, stands on each cell.
    pub fn occupancy(&self) -> &SparseGrid<AdventurerId> {
        &self.occupancy
    }

    pub fn into_scenario(self) -> Scenario {
        self.scenario
    }

    fn apply(&mut self, id: AdventurerId, command: Command) -> CommandEffect {
        match command {
            Command::Forward => self.advance(id),
            Command::TurnLeft => self.turn(id, Orientation::turn_left),
            Command::TurnRight => self.turn(id, Orientation::turn_right),
            Command::Unknown(symbol) => CommandEffect::Ignored(symbol),
        }
    }

    fn turn(&mut self, id: AdventurerId, rotate: fn(Orientation) -> Orientation) -> CommandEffect {
        let adventurer = &mut self.scenario.adventurers[id];
        adventurer.orientation = rotate(adventurer.orientation);
        CommandEffect::Turned(adventurer.orientation)
    }

    fn advance(&mut self, id: AdventurerId) -> CommandEffect {
        let adventurer = &self.scenario.adventurers[id];
        let from = adventurer.position;
        let (dx, dy) = adventurer.orientation.offset();

        let Some(to) = from.offset(dx, dy).filter(|&to| self.dimensions.contains(to)) else {
            return CommandEffect::Blocked(Blocked::OutOfBounds);
        };
        if self.mountains.contains(to) {
            return CommandEffect::Blocked(Blocked::Mountain);
        }
        if self.occupancy.contains(to) {
            return CommandEffect::Blocked(Blocked::Occupied);
        }

        // Only clear the old cell if it is ours: an adventurer that started
        // outside the map or on a shared cell was never indexed there.
        self.occupancy.remove_if(from, |&owner| owner == id);
        if let Err(err) = self.occupancy.set(to, id) {
            warn!(%err, "occupancy index rejected an in-bounds move");
        }

        let adventurer = &mut self.scenario.adventurers[id];
        adventurer.position = to;

        let mut collected = false;
        if let Some(&index) = self.treasures.get(to) {
            let treasure = &mut self.scenario.treasures[index];
            if treasure.count > 0 {
                treasure.count -= 1;
                adventurer.collected += 1;
                collected = true;
            }
        }

        CommandEffect::Moved {
            from,
            to,
            collected,
        }
    }
}

/// Validates what the simulation cannot run without.
fn preflight(scenario: &Scenario, config: &SimConfig) -> SimResult<Dimensions> {
    let dimensions = scenario.dimensions.ok_or(SimError::InvalidScenario)?;

    if config.command_policy == CommandPolicy::Strict {
        for adventurer in &scenario.adventurers {
            if let Some(Command::Unknown(command)) = adventurer
                .commands
                .iter()
                .find(|command| matches!(command, Command::Unknown(_)))
            {
                return Err(SimError::InvalidCommand {
                    adventurer: adventurer.name.clone(),
                    command: *command,
                });
            }
        }
    }

    Ok(dimensions)
}

/// Plays every queued command of `scenario` to completion, mutating its
/// adventurers and treasure counts in place, and returns the adventurers.
///
/// On error the scenario is left untouched.
pub fn simulate<'s>(scenario: &'s mut Scenario, config: &SimConfig) -> SimResult<&'s [Adventurer]> {
    preflight(scenario, config)?;
    let mut simulation = Simulation::new(mem::take(scenario), config)?;
    simulation.run();
    *scenario = simulation.into_scenario();
    Ok(scenario.adventurers.as_slice())
}
