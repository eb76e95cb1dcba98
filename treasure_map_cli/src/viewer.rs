use std::{
    io::{self, Stdout},
    time::{Duration, Instant},
};

use anyhow::Result;
use ratatui::{
    crossterm::{
        self,
        event::{self, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use treasure_map_core::{Orientation, Position, RoundOutcome, Scenario, Simulation};

/// Replay state shown by the viewer.
struct Viewer<'a> {
    simulation: &'a mut Simulation,
    last_round: RoundOutcome,
    paused: bool,
    should_quit: bool,
}

impl Viewer<'_> {
    /// Advances the simulation by one round unless paused or done.
    fn tick(&mut self) {
        if self.paused || self.simulation.is_finished() {
            return;
        }
        self.last_round = self.simulation.step_round();
    }

    fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    fn quit(&mut self) {
        self.should_quit = true;
    }
}

/// Shows the simulation in the terminal, one round per `tick_rate`, until the
/// user quits. Rounds not played when quitting are left to the caller.
pub fn watch(simulation: &mut Simulation, tick_rate: Duration) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut viewer = Viewer {
        simulation,
        last_round: RoundOutcome::default(),
        paused: false,
        should_quit: false,
    };
    let result = run_viewer(&mut terminal, &mut viewer, tick_rate);
    restore_terminal(&mut terminal)?;
    result
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_viewer(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    viewer: &mut Viewer,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, viewer))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => viewer.quit(),
                    KeyCode::Char(' ') => viewer.toggle_pause(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            viewer.tick();
            last_tick = Instant::now();
        }

        if viewer.should_quit {
            break;
        }
    }
    Ok(())
}

fn ui(frame: &mut Frame, viewer: &Viewer) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(65),
            Constraint::Percentage(25),
            Constraint::Percentage(10),
        ])
        .split(frame.area());

    let scenario = viewer.simulation.scenario();
    render_map(frame, main_layout[0], scenario);
    render_adventurers(frame, main_layout[1], scenario);

    let state = if viewer.simulation.is_finished() {
        "finished"
    } else if viewer.paused {
        "paused"
    } else {
        "running"
    };
    let status = format!(
        "Round {} ({state}) | moves {}, blocked {}, treasures {} | {} commands left | space: pause, q: quit",
        viewer.simulation.round(),
        viewer.last_round.moves,
        viewer.last_round.blocked,
        viewer.last_round.collected,
        viewer.simulation.remaining_commands(),
    );
    let status_line = Paragraph::new(status)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status_line, main_layout[2]);
}

fn render_adventurers(frame: &mut Frame, area: Rect, scenario: &Scenario) {
    let items: Vec<ListItem> = scenario
        .adventurers
        .iter()
        .map(|adventurer| {
            ListItem::from(Line::from(vec![
                Span::styled(
                    format!("{:<12}", adventurer.name),
                    Style::default().fg(Color::Cyan).bold(),
                ),
                Span::raw(format!(
                    " ({}, {}) facing {}  treasures: {}  pending: {}",
                    adventurer.position.x,
                    adventurer.position.y,
                    adventurer.orientation,
                    adventurer.collected,
                    adventurer.commands.len()
                )),
            ]))
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title("Adventurers"));
    frame.render_widget(list, area);
}

fn render_map(frame: &mut Frame, area: Rect, scenario: &Scenario) {
    let Some(dimensions) = scenario.dimensions else {
        return;
    };
    // Only the top-left corner that fits inside the borders is drawn.
    let rows = dimensions.height.min(usize::from(area.height.saturating_sub(2)));
    let columns = dimensions.width.min(usize::from(area.width.saturating_sub(2)));
    let mut lines: Vec<Line> = Vec::with_capacity(rows);

    for y in 0..rows {
        let mut spans: Vec<Span> = Vec::with_capacity(columns);
        for x in 0..columns {
            let position = Position::new(x, y);
            let adventurer = scenario
                .adventurers
                .iter()
                .find(|adventurer| adventurer.position == position);
            let treasure = scenario
                .treasures
                .iter()
                .find(|treasure| treasure.position == position);

            let span = if let Some(adventurer) = adventurer {
                Span::styled(
                    arrow(adventurer.orientation),
                    Style::default().fg(Color::Cyan).bold(),
                )
            } else if scenario.mountains.contains(&position) {
                Span::styled("^", Style::default().fg(Color::DarkGray))
            } else if let Some(treasure) = treasure.filter(|treasure| treasure.count > 0) {
                let label = if treasure.count > 9 {
                    "*".to_string()
                } else {
                    treasure.count.to_string()
                };
                Span::styled(label, Style::default().fg(Color::Yellow))
            } else {
                Span::raw("·")
            };
            spans.push(span);
        }
        lines.push(Line::from(spans));
    }

    let map = Paragraph::new(lines)
        .block(Block::default().title("Treasure Map").borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(map, area);
}

fn arrow(orientation: Orientation) -> &'static str {
    match orientation {
        Orientation::North => "↑",
        Orientation::East => "→",
        Orientation::South => "↓",
        Orientation::West => "←",
    }
}
