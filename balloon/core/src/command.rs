//! Command Model
//!
//! A [`Command`] is what the control receiver queues: a name plus the
//! positional fields of one inbound request, untouched. The dispatcher turns
//! it into a typed [`BalloonCommand`] with [`BalloonCommand::parse`].
//!
//! Parsing never fails loudly: an unknown name, a wrong field count or an
//! unparsable number yields `None` and the command is dropped.

use std::str::FromStr;

/// Raw command as decoded from the control channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command name (the request's `Command` header)
    pub name: String,
    /// Positional fields in index order
    pub args: Vec<String>,
}

impl Command {
    /// Create a command
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Axis addressed by `SetCursorPosition`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Horizontal
    X,
    /// Vertical
    Y,
}

/// Unit of a `SetCursorPosition` value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorUnit {
    /// Pixels, truncated toward zero
    #[default]
    Px,
    /// Digit width horizontally, line height vertically
    Em,
    /// Digit width horizontally, line height plus spacing vertically
    Lh,
}

impl CursorUnit {
    fn from_token(token: &str) -> Self {
        match token {
            "em" => Self::Em,
            "lh" => Self::Lh,
            _ => Self::Px,
        }
    }
}

/// Typed dispatcher command
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub enum BalloonCommand {
    Create { side: i32 },
    Show { side: i32 },
    Hide { side: i32 },
    HideAll,
    ClearText { side: i32 },
    ClearTextAll,
    SetBalloonId { side: i32, id: i32 },
    /// `None` resets every side
    ResetBalloonId { side: Option<i32> },
    Position { side: i32, x: i32, y: i32 },
    Direction { side: i32, direction: i32 },
    AppendText { side: i32, text: String },
    AppendLinkBegin {
        side: i32,
        is_anchor: bool,
        event: String,
        args: Vec<String>,
    },
    AppendLinkEnd { side: i32 },
    SetCursorPosition {
        side: i32,
        axis: Axis,
        value: f64,
        absolute: bool,
        unit: CursorUnit,
    },
    NewLine { side: i32 },
    /// `(key, value)` pairs split at the first comma
    ConfigurationChanged { pairs: Vec<(String, String)> },
    OpenInputBox { id: String },
    OpenScriptInputBox,
    ScriptBegin,
    ScriptEnd,
}

fn num<T: FromStr>(field: &str) -> Option<T> {
    field.trim().parse().ok()
}

fn flag(field: &str) -> bool {
    field == "true"
}

impl BalloonCommand {
    /// Interpret a raw command
    ///
    /// Returns `None` for unknown names and malformed arguments.
    #[must_use]
    pub fn parse(command: &Command) -> Option<Self> {
        let a = command.args.as_slice();
        let parsed = match (command.name.as_str(), a) {
            ("Create", [side]) => Self::Create { side: num(side)? },
            ("Show", [side]) => Self::Show { side: num(side)? },
            ("Hide", [side]) => Self::Hide { side: num(side)? },
            ("HideAll", _) => Self::HideAll,
            ("ClearText", [side]) => Self::ClearText { side: num(side)? },
            ("ClearTextAll", _) => Self::ClearTextAll,
            ("SetBalloonID", [side, id]) => Self::SetBalloonId {
                side: num(side)?,
                id: num(id)?,
            },
            ("ResetBalloonID", []) => Self::ResetBalloonId { side: None },
            ("ResetBalloonID", [side]) => Self::ResetBalloonId {
                side: Some(num(side)?),
            },
            ("Position", [side, x, y]) => Self::Position {
                side: num(side)?,
                x: num(x)?,
                y: num(y)?,
            },
            ("Direction", [side, direction]) => Self::Direction {
                side: num(side)?,
                direction: num(direction)?,
            },
            ("AppendText", [side, text]) => Self::AppendText {
                side: num(side)?,
                text: text.clone(),
            },
            ("AppendLinkBegin", [side, is_anchor, event, rest @ ..]) => Self::AppendLinkBegin {
                side: num(side)?,
                is_anchor: flag(is_anchor),
                event: event.clone(),
                args: rest.to_vec(),
            },
            ("AppendLinkEnd", [side]) => Self::AppendLinkEnd { side: num(side)? },
            ("SetCursorPosition", [side, axis, value, absolute, unit]) => Self::SetCursorPosition {
                side: num(side)?,
                axis: match axis.as_str() {
                    "x" => Axis::X,
                    "y" => Axis::Y,
                    _ => return None,
                },
                value: num::<f64>(value).filter(|v| v.is_finite())?,
                absolute: flag(absolute),
                unit: CursorUnit::from_token(unit),
            },
            ("NewLine", [side]) => Self::NewLine { side: num(side)? },
            ("ConfigurationChanged", pairs) => Self::ConfigurationChanged {
                pairs: pairs
                    .iter()
                    .filter_map(|p| p.split_once(','))
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            },
            ("OpenInputBox", [id, ..]) => Self::OpenInputBox { id: id.clone() },
            ("OpenScriptInputBox", []) => Self::OpenScriptInputBox,
            ("ScriptBegin", _) => Self::ScriptBegin,
            ("ScriptEnd", _) => Self::ScriptEnd,
            _ => return None,
        };
        Some(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cmd(name: &str, args: &[&str]) -> Command {
        Command::new(name, args.iter().map(|s| (*s).to_string()).collect())
    }

    #[test]
    fn test_parse_positioning_commands() {
        assert_eq!(
            BalloonCommand::parse(&cmd("Position", &["1", "-20", "300"])),
            Some(BalloonCommand::Position { side: 1, x: -20, y: 300 })
        );
        assert_eq!(
            BalloonCommand::parse(&cmd("ResetBalloonID", &[])),
            Some(BalloonCommand::ResetBalloonId { side: None })
        );
        assert_eq!(
            BalloonCommand::parse(&cmd("ResetBalloonID", &["2"])),
            Some(BalloonCommand::ResetBalloonId { side: Some(2) })
        );
    }

    #[test]
    fn test_parse_link_begin_collects_trailing_args() {
        assert_eq!(
            BalloonCommand::parse(&cmd("AppendLinkBegin", &["0", "true", "OnPet", "head", "soft"])),
            Some(BalloonCommand::AppendLinkBegin {
                side: 0,
                is_anchor: true,
                event: "OnPet".into(),
                args: vec!["head".into(), "soft".into()],
            })
        );
        assert_eq!(
            BalloonCommand::parse(&cmd("AppendLinkBegin", &["0", "false", "choice"])),
            Some(BalloonCommand::AppendLinkBegin {
                side: 0,
                is_anchor: false,
                event: "choice".into(),
                args: vec![],
            })
        );
    }

    #[test]
    fn test_parse_cursor_position_units() {
        assert_eq!(
            BalloonCommand::parse(&cmd("SetCursorPosition", &["0", "y", "1.5", "false", "lh"])),
            Some(BalloonCommand::SetCursorPosition {
                side: 0,
                axis: Axis::Y,
                value: 1.5,
                absolute: false,
                unit: CursorUnit::Lh,
            })
        );
        let unknown_unit = BalloonCommand::parse(&cmd("SetCursorPosition", &["0", "x", "3", "true", "pt"]));
        assert!(matches!(
            unknown_unit,
            Some(BalloonCommand::SetCursorPosition { unit: CursorUnit::Px, .. })
        ));
    }

    #[test]
    fn test_configuration_pairs_split_at_first_comma() {
        assert_eq!(
            BalloonCommand::parse(&cmd("ConfigurationChanged", &["scale,150", "junk", "font,Noto Sans, Bold"])),
            Some(BalloonCommand::ConfigurationChanged {
                pairs: vec![
                    ("scale".into(), "150".into()),
                    ("font".into(), "Noto Sans, Bold".into()),
                ],
            })
        );
    }

    #[test]
    fn test_malformed_commands_are_dropped() {
        assert_eq!(BalloonCommand::parse(&cmd("Create", &[])), None);
        assert_eq!(BalloonCommand::parse(&cmd("Create", &["0", "1"])), None);
        assert_eq!(BalloonCommand::parse(&cmd("Create", &["zero"])), None);
        assert_eq!(BalloonCommand::parse(&cmd("AppendText", &["0"])), None);
        assert_eq!(BalloonCommand::parse(&cmd("SetCursorPosition", &["0", "z", "1", "true", "px"])), None);
        for value in ["inf", "-inf", "NaN"] {
            assert_eq!(BalloonCommand::parse(&cmd("SetCursorPosition", &["0", "x", value, "true", "px"])), None);
        }
        assert_eq!(BalloonCommand::parse(&cmd("OpenScriptInputBox", &["extra"])), None);
        assert_eq!(BalloonCommand::parse(&cmd("Explode", &["0"])), None);
        assert_eq!(BalloonCommand::parse(&cmd("", &[])), None);
    }
}
