//! Line-oriented commands read from standard input.

use std::str::{FromStr, SplitWhitespace};

use glam::Vec2;
use thiserror::Error;
use tribe_war_core::{CellCode, CellCoord, TribeArchetype};
use tribe_war_rendering::PAN_STEP;
use tribe_war_sync::UserAction;

/// Summary printed by `help`.
pub(crate) const HELP: &str = "\
tool <grass|snow|desert|cemetery|empty|border|tree|rock|hill>
brush <size>            fill
paint <x> <y>           click <px> <py>
next [force]            back
assign <terrain> <Wanderers|Norsca|Nomads|Sylvania|none>
borders                 reset-builder
inspect <x> <y>         close
pause  faster  slower   war  reset
zoom <in|out>           pan <left|right|up|down>
view                    resize <width> <height>
help                    quit";

/// Parsed input line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum LineCommand {
    /// Forwards an action to the session.
    Action(UserAction),
    /// Prints the command summary.
    Help,
    /// Ends the session.
    Quit,
}

/// Reasons an input line was not understood.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub(crate) enum CommandError {
    /// The line was blank.
    #[error("empty command")]
    Empty,
    /// The first word names no command.
    #[error("unknown command `{0}`, try `help`")]
    Unknown(String),
    /// A required argument was absent.
    #[error("`{command}` expects {expected}")]
    MissingArgument {
        /// Command being parsed.
        command: String,
        /// Description of the missing argument.
        expected: &'static str,
    },
    /// An argument was not a valid number.
    #[error("`{0}` is not a number")]
    InvalidNumber(String),
    /// An argument named no paint tool.
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    /// An argument named no tribe archetype.
    #[error("unknown tribe `{0}`")]
    UnknownArchetype(String),
    /// An argument was not one of the accepted words.
    #[error("`{command}` does not accept `{value}`")]
    InvalidChoice {
        /// Command being parsed.
        command: String,
        /// Rejected word.
        value: String,
    },
}

impl FromStr for LineCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Err(CommandError::Empty);
        };
        let mut arguments = Arguments { command, words };

        let action = match command.to_ascii_lowercase().as_str() {
            "help" | "?" => return Ok(Self::Help),
            "quit" | "exit" => return Ok(Self::Quit),
            "tool" => UserAction::SelectTool(parse_tool(arguments.word("a tool name")?)?),
            "brush" => UserAction::SetBrushSize(arguments.number("a brush size")?),
            "fill" => UserAction::ToggleFillMode,
            "paint" => UserAction::PaintCell(arguments.cell()?),
            "click" => UserAction::PaintAt(arguments.point()?),
            "next" => UserAction::NextPhase {
                confirm_without_borders: match arguments.optional() {
                    None => false,
                    Some("force") => true,
                    Some(other) => return Err(arguments.invalid(other)),
                },
            },
            "back" => UserAction::PreviousPhase,
            "assign" => {
                let terrain = parse_tool(arguments.word("a terrain and a tribe")?)?;
                let tribe = arguments.word("a terrain and a tribe")?;
                let archetype = if tribe.eq_ignore_ascii_case("none") {
                    None
                } else {
                    Some(
                        TribeArchetype::from_name(tribe)
                            .ok_or_else(|| CommandError::UnknownArchetype(tribe.to_owned()))?,
                    )
                };
                UserAction::AssignTribe { terrain, archetype }
            }
            "borders" => UserAction::AutoBorders,
            "inspect" => UserAction::InspectCell(arguments.cell()?),
            "close" => UserAction::CloseInspector,
            "pause" => UserAction::TogglePause,
            "faster" => UserAction::ChangeSpeed(1),
            "slower" => UserAction::ChangeSpeed(-1),
            "war" => UserAction::StartWar,
            "reset" => UserAction::ResetWorld,
            "reset-builder" => UserAction::ResetBuilder,
            "zoom" => match arguments.word("`in` or `out`")? {
                "in" => UserAction::ZoomIn,
                "out" => UserAction::ZoomOut,
                other => return Err(arguments.invalid(other)),
            },
            "pan" => {
                let delta = match arguments.word("a direction")? {
                    "left" => Vec2::new(PAN_STEP, 0.0),
                    "right" => Vec2::new(-PAN_STEP, 0.0),
                    "up" => Vec2::new(0.0, PAN_STEP),
                    "down" => Vec2::new(0.0, -PAN_STEP),
                    other => return Err(arguments.invalid(other)),
                };
                UserAction::Pan(delta)
            }
            "view" => UserAction::ResetView,
            "resize" => UserAction::Resize(arguments.point()?),
            _ => return Err(CommandError::Unknown(command.to_owned())),
        };
        Ok(Self::Action(action))
    }
}

struct Arguments<'a> {
    command: &'a str,
    words: SplitWhitespace<'a>,
}

impl<'a> Arguments<'a> {
    fn optional(&mut self) -> Option<&'a str> {
        self.words.next()
    }

    fn word(&mut self, expected: &'static str) -> Result<&'a str, CommandError> {
        self.words
            .next()
            .ok_or_else(|| CommandError::MissingArgument {
                command: self.command.to_owned(),
                expected,
            })
    }

    fn number<T: FromStr>(&mut self, expected: &'static str) -> Result<T, CommandError> {
        let word = self.word(expected)?;
        word.parse()
            .map_err(|_| CommandError::InvalidNumber(word.to_owned()))
    }

    fn cell(&mut self) -> Result<CellCoord, CommandError> {
        Ok(CellCoord::new(
            self.number("a column and a row")?,
            self.number("a column and a row")?,
        ))
    }

    fn point(&mut self) -> Result<Vec2, CommandError> {
        Ok(Vec2::new(
            self.number("two pixel values")?,
            self.number("two pixel values")?,
        ))
    }

    fn invalid(&self, value: &str) -> CommandError {
        CommandError::InvalidChoice {
            command: self.command.to_owned(),
            value: value.to_owned(),
        }
    }
}

fn parse_tool(name: &str) -> Result<CellCode, CommandError> {
    let tool = match name.to_ascii_lowercase().as_str() {
        "empty" | "erase" => CellCode::Empty,
        "grass" => CellCode::Grass,
        "snow" => CellCode::Snow,
        "desert" => CellCode::Desert,
        "cemetery" => CellCode::Cemetery,
        "border" => CellCode::Border,
        "tree" => CellCode::Tree,
        "rock" => CellCode::Rock,
        "hill" => CellCode::Hill,
        _ => return Err(CommandError::UnknownTool(name.to_owned())),
    };
    Ok(tool)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(line: &str) -> UserAction {
        match line.parse::<LineCommand>() {
            Ok(LineCommand::Action(action)) => action,
            other => panic!("`{line}` parsed as {other:?}"),
        }
    }

    #[test]
    fn builder_commands_map_to_actions() {
        assert_eq!(action("tool Snow"), UserAction::SelectTool(CellCode::Snow));
        assert_eq!(action("brush 3"), UserAction::SetBrushSize(3));
        assert_eq!(
            action("paint 10 20"),
            UserAction::PaintCell(CellCoord::new(10, 20))
        );
        assert_eq!(
            action("next force"),
            UserAction::NextPhase {
                confirm_without_borders: true
            }
        );
        assert_eq!(
            action("assign desert nomads"),
            UserAction::AssignTribe {
                terrain: CellCode::Desert,
                archetype: Some(TribeArchetype::Nomads),
            }
        );
        assert_eq!(
            action("assign grass none"),
            UserAction::AssignTribe {
                terrain: CellCode::Grass,
                archetype: None,
            }
        );
    }

    #[test]
    fn viewport_commands_map_to_actions() {
        assert_eq!(action("zoom in"), UserAction::ZoomIn);
        assert_eq!(action("pan left"), UserAction::Pan(Vec2::new(PAN_STEP, 0.0)));
        assert_eq!(
            action("resize 1024 768"),
            UserAction::Resize(Vec2::new(1024.0, 768.0))
        );
    }

    #[test]
    fn control_words_are_recognised() {
        assert_eq!("help".parse(), Ok(LineCommand::Help));
        assert_eq!(" quit ".parse(), Ok(LineCommand::Quit));
    }

    #[test]
    fn malformed_lines_are_explained() {
        assert_eq!("   ".parse::<LineCommand>(), Err(CommandError::Empty));
        assert_eq!(
            "paint 4".parse::<LineCommand>(),
            Err(CommandError::MissingArgument {
                command: "paint".to_owned(),
                expected: "a column and a row",
            })
        );
        assert_eq!(
            "brush big".parse::<LineCommand>(),
            Err(CommandError::InvalidNumber("big".to_owned()))
        );
        assert_eq!(
            "tool lava".parse::<LineCommand>(),
            Err(CommandError::UnknownTool("lava".to_owned()))
        );
        assert_eq!(
            "assign grass elves".parse::<LineCommand>(),
            Err(CommandError::UnknownArchetype("elves".to_owned()))
        );
        assert!(matches!(
            "launch".parse::<LineCommand>(),
            Err(CommandError::Unknown(word)) if word == "launch"
        ));
    }
}
