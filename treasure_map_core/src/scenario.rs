use std::{
    fs, io,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Adventurer, Dimensions, Orientation, Position};

/// Errors raised while reading, parsing or writing a scenario file.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("failed to read scenario from {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write scenario to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: {reason} (`{content}`)")]
    MalformedLine {
        line: usize,
        content: String,
        reason: String,
    },
    #[error("scenario has no map dimensions ('C' line)")]
    MissingDimensions,
}

/// A treasure cell and the number of treasures still lying on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Treasure {
    pub position: Position,
    pub count: usize,
}

impl Treasure {
    pub fn new(position: Position, count: usize) -> Self {
        Treasure { position, count }
    }
}

/// Everything a simulation run needs, in file order.
///
/// `dimensions` is optional because a scenario file may omit its `C` line;
/// the simulation refuses to start without it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub dimensions: Option<Dimensions>,
    pub mountains: Vec<Position>,
    pub treasures: Vec<Treasure>,
    pub adventurers: Vec<Adventurer>,
}

impl Scenario {
    /// Reads and parses a scenario file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        parse_scenario(&content)
    }

    /// Renders the scenario and writes it to `path`, creating missing parent
    /// directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ScenarioError> {
        let path = path.as_ref();
        let content = self.render()?;
        let write_error = |source| ScenarioError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        fs::write(path, content).map_err(write_error)
    }

    /// Serializes the scenario back to the line format: map size, mountains,
    /// treasures with their current counts, then adventurers with their
    /// collected totals in place of the command string.
    pub fn render(&self) -> Result<String, ScenarioError> {
        let dimensions = self.dimensions.ok_or(ScenarioError::MissingDimensions)?;

        let mut lines = Vec::with_capacity(
            1 + self.mountains.len() + self.treasures.len() + self.adventurers.len(),
        );
        lines.push(format!("C - {} - {}", dimensions.width, dimensions.height));
        lines.extend(
            self.mountains
                .iter()
                .map(|mountain| format!("M - {} - {}", mountain.x, mountain.y)),
        );
        lines.extend(self.treasures.iter().map(|treasure| {
            format!(
                "T - {} - {} - {}",
                treasure.position.x, treasure.position.y, treasure.count
            )
        }));
        lines.extend(self.adventurers.iter().map(|adventurer| {
            format!(
                "A - {} - {} - {} - {} - {}",
                adventurer.name,
                adventurer.position.x,
                adventurer.position.y,
                adventurer.orientation,
                adventurer.collected
            )
        }));

        Ok(lines.join("\n"))
    }

    /// Sum of all treasure counts currently on the map.
    pub fn remaining_treasures(&self) -> usize {
        self.treasures.iter().map(|treasure| treasure.count).sum()
    }
}

impl FromStr for Scenario {
    type Err = ScenarioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_scenario(s)
    }
}

/// The ` - `-separated fields of one scenario line.
struct Fields<'a> {
    line: usize,
    content: &'a str,
    fields: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    fn split(line: usize, content: &'a str) -> Self {
        // A trailing separator leaves an empty last field, e.g. an adventurer
        // with no commands written as `A - Bob - 0 - 0 - N -`.
        let body = content.strip_suffix(" -").unwrap_or(content);
        Fields {
            line,
            content,
            fields: body.split(" - ").map(str::trim).collect(),
        }
    }

    fn kind(&self) -> &'a str {
        self.fields[0]
    }

    fn malformed(&self, reason: impl Into<String>) -> ScenarioError {
        ScenarioError::MalformedLine {
            line: self.line,
            content: self.content.to_string(),
            reason: reason.into(),
        }
    }

    fn text(&self, index: usize, what: &str) -> Result<&'a str, ScenarioError> {
        self.fields
            .get(index)
            .copied()
            .filter(|field| !field.is_empty())
            .ok_or_else(|| self.malformed(format!("missing {what}")))
    }

    fn number(&self, index: usize, what: &str) -> Result<usize, ScenarioError> {
        let field = self.text(index, what)?;
        field
            .parse()
            .map_err(|_| self.malformed(format!("{what} `{field}` is not a non-negative integer")))
    }

    fn position(&self, first: usize) -> Result<Position, ScenarioError> {
        Ok(Position::new(self.number(first, "x")?, self.number(first + 1, "y")?))
    }
}

/// Parses the textual scenario format, one entity per line:
///
/// ```text
/// C - width - height
/// M - x - y
/// T - x - y - count
/// A - name - x - y - orientation - commands
/// ```
///
/// Blank lines are ignored and `#` comments are skipped with a debug event.
/// Lines of an unknown type are skipped with a warning; known lines with bad
/// fields are an error.
pub fn parse_scenario(input: &str) -> Result<Scenario, ScenarioError> {
    let mut scenario = Scenario::default();

    for (index, raw) in input.lines().enumerate() {
        let content = raw.trim();
        if content.is_empty() {
            continue;
        }
        if content.starts_with('#') {
            debug!(line = index + 1, content, "comment line skipped");
            continue;
        }
        let fields = Fields::split(index + 1, content);

        match fields.kind() {
            "C" => {
                let width = fields.number(1, "width")?;
                let height = fields.number(2, "height")?;
                if width == 0 || height == 0 {
                    return Err(fields.malformed("map dimensions must be positive"));
                }
                if scenario.dimensions.is_some() {
                    warn!(line = fields.line, "map dimensions redefined, keeping the last ones");
                }
                scenario.dimensions = Some(Dimensions::new(width, height));
            }
            "M" => scenario.mountains.push(fields.position(1)?),
            "T" => {
                let position = fields.position(1)?;
                let count = fields.number(3, "treasure count")?;
                scenario.treasures.push(Treasure::new(position, count));
            }
            "A" => {
                let name = fields.text(1, "adventurer name")?;
                let position = fields.position(2)?;
                let letter = fields.text(4, "orientation")?;
                let orientation = single_char(letter)
                    .and_then(Orientation::from_letter)
                    .ok_or_else(|| {
                        fields.malformed(format!("orientation `{letter}` is not one of N, E, S, W"))
                    })?;
                let script = fields.fields.get(5).copied().unwrap_or_default();
                scenario
                    .adventurers
                    .push(Adventurer::new(name, position, orientation).with_commands(script));
            }
            _ => warn!(line = fields.line, content, "unrecognized line ignored"),
        }
    }

    debug!(
        mountains = scenario.mountains.len(),
        treasures = scenario.treasures.len(),
        adventurers = scenario.adventurers.len(),
        "scenario parsed"
    );
    Ok(scenario)
}

fn single_char(s: &str) -> Option<char> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::Command;

    /// Collects formatted tracing output for assertions.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn logs_while(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    const LARA: &str = "
        C - 3 - 4
        M - 1 - 1
        M - 2 - 2
        T - 0 - 3 - 2
        A - Lara - 1 - 1 - S - AADADAGGA
    ";

    #[test]
    fn parses_every_line_type() {
        let scenario = parse_scenario(LARA).unwrap();
        assert_eq!(scenario.dimensions, Some(Dimensions::new(3, 4)));
        assert_eq!(
            scenario.mountains,
            vec![Position::new(1, 1), Position::new(2, 2)]
        );
        assert_eq!(scenario.treasures, vec![Treasure::new(Position::new(0, 3), 2)]);

        let lara = &scenario.adventurers[0];
        assert_eq!(lara.name, "Lara");
        assert_eq!(lara.position, Position::new(1, 1));
        assert_eq!(lara.orientation, Orientation::South);
        assert_eq!(lara.commands.len(), 9);
        assert_eq!(lara.commands[2], Command::TurnRight);
        assert_eq!(lara.collected, 0);
    }

    #[test]
    fn unrecognized_and_blank_lines_are_skipped() {
        let scenario = parse_scenario("X - 1 - 2\n\n# comment\nC - 2 - 2\nM - 0 - 1\n").unwrap();
        assert_eq!(scenario.dimensions, Some(Dimensions::new(2, 2)));
        assert_eq!(scenario.mountains, vec![Position::new(0, 1)]);
    }

    #[test]
    fn last_map_line_wins() {
        let scenario: Scenario = "C - 2 - 2\nC - 5 - 6".parse().unwrap();
        assert_eq!(scenario.dimensions, Some(Dimensions::new(5, 6)));
    }

    #[test]
    fn missing_map_line_parses_without_dimensions() {
        let scenario = parse_scenario("M - 0 - 0").unwrap();
        assert_eq!(scenario.dimensions, None);
    }

    #[test]
    fn adventurer_without_commands_has_empty_queue() {
        let scenario = parse_scenario("C - 2 - 2\nA - Bob - 0 - 0 - N -\nA - Eve - 1 - 1 - E").unwrap();
        assert_eq!(scenario.adventurers.len(), 2);
        assert!(scenario.adventurers.iter().all(|a| a.commands.is_empty()));
    }

    #[test]
    fn hyphenated_names_survive() {
        let scenario = parse_scenario("A - Jean-Luc - 0 - 0 - W - A").unwrap();
        assert_eq!(scenario.adventurers[0].name, "Jean-Luc");
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        let err = parse_scenario("C - 3 - 4\nT - 0 - three - 1").unwrap_err();
        match err {
            ScenarioError::MalformedLine { line, reason, .. } => {
                assert_eq!(line, 2);
                assert!(reason.contains("three"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            parse_scenario("M - -1 - 0"),
            Err(ScenarioError::MalformedLine { .. })
        ));
        assert!(matches!(
            parse_scenario("T - 0 - 0"),
            Err(ScenarioError::MalformedLine { .. })
        ));
    }

    #[test]
    fn bad_orientation_and_empty_map_are_rejected() {
        assert!(matches!(
            parse_scenario("A - Lara - 0 - 0 - Q - A"),
            Err(ScenarioError::MalformedLine { .. })
        ));
        assert!(matches!(
            parse_scenario("C - 0 - 4"),
            Err(ScenarioError::MalformedLine { .. })
        ));
    }

    #[test]
    fn render_uses_fixed_section_order() {
        let mut scenario = parse_scenario(
            "A - Lara - 0 - 0 - E - AA\nT - 1 - 0 - 0\nM - 2 - 2\nC - 3 - 4",
        )
        .unwrap();
        scenario.adventurers[0].collected = 4;
        assert_eq!(
            scenario.render().unwrap(),
            "C - 3 - 4\nM - 2 - 2\nT - 1 - 0 - 0\nA - Lara - 0 - 0 - E - 4"
        );
    }

    #[test]
    fn render_without_dimensions_fails() {
        assert!(matches!(
            Scenario::default().render(),
            Err(ScenarioError::MissingDimensions)
        ));
    }

    #[test]
    fn skipped_lines_leave_a_diagnostic() {
        let logs = logs_while(|| {
            parse_scenario("# just a note\nX - 1 - 2\nC - 2 - 2").unwrap();
        });
        assert!(logs.contains("comment line skipped"), "{logs}");
        assert!(logs.contains("unrecognized line ignored"), "{logs}");
        assert!(logs.contains("DEBUG"), "{logs}");
        assert!(logs.contains("WARN"), "{logs}");
    }

    #[test]
    fn save_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/deeper/output.txt");
        let scenario = parse_scenario("C - 2 - 2\nM - 1 - 1").unwrap();
        scenario.save(&target).unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "C - 2 - 2\nM - 1 - 1");
    }

    #[test]
    fn save_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let target = blocker.join("output.txt");

        let err = parse_scenario("C - 1 - 1").unwrap().save(&target).unwrap_err();
        assert!(
            matches!(&err, ScenarioError::Write { path, .. } if *path == target),
            "{err:?}"
        );
        assert!(err.to_string().contains(&target.display().to_string()));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Scenario::load("/definitely/not/here.txt").unwrap_err();
        assert!(matches!(err, ScenarioError::Read { .. }));
        assert!(err.to_string().contains("/definitely/not/here.txt"));
    }

    #[test]
    fn remaining_treasures_sums_counts() {
        let scenario = parse_scenario("T - 0 - 0 - 2\nT - 1 - 0 - 3").unwrap();
        assert_eq!(scenario.remaining_treasures(), 5);
    }
}
