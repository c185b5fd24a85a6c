//! User intents: parsed from the console or produced by chord callbacks

use std::io::BufRead;
use std::str::FromStr;
use std::thread;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::chord::KeyEvent;
use crate::constants::defaults;

/// Live-mirror field edit
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param {
    Sensitivity(f64),
    Times(u32),
    Rate(u32),
    ClickTimes(u32),
    ClickRate(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Script,
    Click,
    Tray,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddMainVariant(String),
    SelectMainVariant(u32),
    SelectSubVariant(u32),
    CommitSubVariant(u32),
    CommitActiveSubVariant,
    CommitClick,
    Set(Param),
    /// Add to the live sensitivity (negative to decrease)
    AdjustSensitivity(f64),
    Toggle(Toggle),
    Save,
    Load,
    MouseMove,
    MouseClick,
    /// Synthetic local keydown
    Key(KeyEvent),
    Status,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("empty command")]
    Empty,
    #[error("unknown command '{0}'")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(String),
    #[error("invalid number '{0}'")]
    InvalidNumber(String),
}

fn number<T: FromStr>(arg: Option<&str>, command: &str) -> Result<T, CommandError> {
    let arg = arg.ok_or_else(|| CommandError::MissingArgument(command.to_string()))?;
    arg.parse()
        .map_err(|_| CommandError::InvalidNumber(arg.to_string()))
}

/// Parse `Ctrl+Alt+4` style key descriptions
fn parse_key_event(text: &str) -> Result<KeyEvent, CommandError> {
    let mut parts: Vec<&str> = text.split('+').collect();
    // A trailing empty part means the key itself is '+'
    let key = match parts.pop() {
        Some("") if parts.last() == Some(&"") || parts.is_empty() => {
            parts.pop();
            "+"
        }
        Some("") => "+",
        Some(key) => key,
        None => return Err(CommandError::MissingArgument("key".to_string())),
    };

    let mut event = KeyEvent::new(key);
    for modifier in parts {
        match modifier.to_ascii_lowercase().as_str() {
            "alt" | "lalt" | "ralt" => event = event.with_alt(),
            "ctrl" | "lctrl" | "rctrl" | "control" | "lcontrol" | "rcontrol" => event = event.with_ctrl(),
            "shift" | "lshift" | "rshift" => event = event.with_shift(),
            "" => {}
            other => return Err(CommandError::Unknown(other.to_string())),
        }
    }
    Ok(event)
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let mut args = rest.split_whitespace();

        let command = match word {
            "" => return Err(CommandError::Empty),
            "add" if rest.is_empty() => return Err(CommandError::MissingArgument(word.to_string())),
            "add" => Command::AddMainVariant(rest.to_string()),
            "select" | "main" => Command::SelectMainVariant(number(args.next(), word)?),
            "sub" => Command::SelectSubVariant(number(args.next(), word)?),
            "commit" => match args.next() {
                Some(id) => Command::CommitSubVariant(number(Some(id), word)?),
                None => Command::CommitActiveSubVariant,
            },
            "commit-click" => Command::CommitClick,
            "set" => {
                let field = args
                    .next()
                    .ok_or_else(|| CommandError::MissingArgument(word.to_string()))?;
                let value = args.next();
                let param = match field {
                    "sensitivity" => Param::Sensitivity(number(value, field)?),
                    "times" => Param::Times(number(value, field)?),
                    "rate" => Param::Rate(number(value, field)?),
                    "click-times" => Param::ClickTimes(number(value, field)?),
                    "click-rate" => Param::ClickRate(number(value, field)?),
                    other => return Err(CommandError::Unknown(format!("set {other}"))),
                };
                Command::Set(param)
            }
            "sens+" => Command::AdjustSensitivity(defaults::SENSITIVITY_STEP),
            "sens-" => Command::AdjustSensitivity(-defaults::SENSITIVITY_STEP),
            "toggle" => match args.next() {
                Some("script") => Command::Toggle(Toggle::Script),
                Some("click") => Command::Toggle(Toggle::Click),
                Some("tray") => Command::Toggle(Toggle::Tray),
                Some(other) => return Err(CommandError::Unknown(format!("toggle {other}"))),
                None => return Err(CommandError::MissingArgument(word.to_string())),
            },
            "save" => Command::Save,
            "load" => Command::Load,
            "move" => Command::MouseMove,
            "click" => Command::MouseClick,
            "key" if rest.is_empty() => return Err(CommandError::MissingArgument(word.to_string())),
            "key" => Command::Key(parse_key_event(rest)?),
            "status" => Command::Status,
            "quit" | "exit" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(command)
    }
}

/// A chord and the command it triggers
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub chord: String,
    /// Hold bindings repeat while the key is down
    pub hold: bool,
    pub command: Command,
}

impl Binding {
    fn press(chord: impl Into<String>, command: Command) -> Self {
        Self {
            chord: chord.into(),
            hold: false,
            command,
        }
    }

    fn hold(chord: impl Into<String>, command: Command) -> Self {
        Self {
            chord: chord.into(),
            hold: true,
            command,
        }
    }
}

/// Default chord set
///
/// Every chord fires when its modifiers are held, extra modifiers included,
/// so no two chords here share a primary key unless their modifier sets are
/// disjoint. Otherwise one keypress would queue both commands.
pub fn default_bindings() -> Vec<Binding> {
    let mut bindings = vec![
        Binding::hold("Backquote", Command::MouseMove),
        Binding::hold("LeftButton", Command::MouseClick),
        Binding::press("LAlt_F11", Command::Toggle(Toggle::Script)),
        Binding::press("LAlt_F12", Command::Toggle(Toggle::Click)),
        Binding::press("Add", Command::AdjustSensitivity(defaults::SENSITIVITY_STEP)),
        Binding::press("Subtract", Command::AdjustSensitivity(-defaults::SENSITIVITY_STEP)),
    ];
    for id in 0..defaults::SUB_VARIANT_COUNT {
        bindings.push(Binding::press(format!("LAlt_Numpad{id}"), Command::SelectSubVariant(id)));
        bindings.push(Binding::press(format!("LControl_Numpad{id}"), Command::CommitSubVariant(id)));
    }
    bindings
}

/// Read commands from stdin on a background thread until EOF
pub fn spawn_console(sender: UnboundedSender<Command>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        info!("Console ready (type 'status', 'sub 3', 'set rate 20', 'save', 'quit' ...)");
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    warn!(error = %e, "Console read failed");
                    break;
                }
            };
            match line.parse::<Command>() {
                Ok(command) => {
                    if sender.send(command).is_err() {
                        break;
                    }
                }
                Err(CommandError::Empty) => {}
                Err(e) => warn!(error = %e, "Invalid console command"),
            }
        }
        info!("Console closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord::{Chord, Modifier};

    #[test]
    fn test_parse_selection_and_commits() {
        assert_eq!("select 2".parse::<Command>(), Ok(Command::SelectMainVariant(2)));
        assert_eq!("sub 9".parse::<Command>(), Ok(Command::SelectSubVariant(9)));
        assert_eq!("commit".parse::<Command>(), Ok(Command::CommitActiveSubVariant));
        assert_eq!("commit 4".parse::<Command>(), Ok(Command::CommitSubVariant(4)));
        assert_eq!("commit-click".parse::<Command>(), Ok(Command::CommitClick));
        assert_eq!("add Long Range".parse::<Command>(), Ok(Command::AddMainVariant("Long Range".to_string())));
    }

    #[test]
    fn test_parse_set_params() {
        assert_eq!("set rate 20".parse::<Command>(), Ok(Command::Set(Param::Rate(20))));
        assert_eq!("set sensitivity 2.5".parse::<Command>(), Ok(Command::Set(Param::Sensitivity(2.5))));
        assert_eq!("set click-times 3".parse::<Command>(), Ok(Command::Set(Param::ClickTimes(3))));
        assert_eq!(
            "set rate fast".parse::<Command>(),
            Err(CommandError::InvalidNumber("fast".to_string()))
        );
        assert_eq!(
            "set rate".parse::<Command>(),
            Err(CommandError::MissingArgument("rate".to_string()))
        );
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!("".parse::<Command>(), Err(CommandError::Empty));
        assert_eq!("   ".parse::<Command>(), Err(CommandError::Empty));
        assert_eq!("jump".parse::<Command>(), Err(CommandError::Unknown("jump".to_string())));
        assert!("sub".parse::<Command>().is_err());
        assert!("add".parse::<Command>().is_err());
        assert!("toggle lights".parse::<Command>().is_err());
    }

    #[test]
    fn test_parse_key_events() {
        assert_eq!("key 4".parse::<Command>(), Ok(Command::Key(KeyEvent::new("4"))));
        assert_eq!(
            "key Ctrl+Alt+`".parse::<Command>(),
            Ok(Command::Key(KeyEvent::new("`").with_ctrl().with_alt()))
        );
        assert_eq!("key +".parse::<Command>(), Ok(Command::Key(KeyEvent::new("+"))));
        assert_eq!("key Shift++".parse::<Command>(), Ok(Command::Key(KeyEvent::new("+").with_shift())));
        assert_eq!("key LAlt+1".parse::<Command>(), Ok(Command::Key(KeyEvent::new("1").with_alt())));
        assert!("key Hyper+1".parse::<Command>().is_err());
    }

    #[test]
    fn test_default_bindings_cover_every_slot() {
        let bindings = default_bindings();
        for id in 0..10 {
            assert!(bindings.contains(&Binding::press(format!("LAlt_Numpad{id}"), Command::SelectSubVariant(id))));
            assert!(bindings.contains(&Binding::press(
                format!("LControl_Numpad{id}"),
                Command::CommitSubVariant(id)
            )));
        }
        assert!(bindings.iter().any(|b| b.hold && b.command == Command::MouseMove));
        assert!(bindings.iter().any(|b| b.hold && b.command == Command::MouseClick));
    }

    #[test]
    fn test_default_chords_never_overlap() {
        let chords: Vec<Chord> = default_bindings()
            .iter()
            .map(|b| Chord::parse(&b.chord).unwrap())
            .collect();
        let modifiers = |chord: &Chord| -> Vec<Modifier> {
            chord.modifier_tokens().filter_map(Modifier::from_token).collect()
        };

        for (i, a) in chords.iter().enumerate() {
            for b in chords.iter().skip(i + 1) {
                if a.primary_token() != b.primary_token() {
                    continue;
                }
                let (ma, mb) = (modifiers(a), modifiers(b));
                let a_in_b = ma.iter().all(|m| mb.contains(m));
                let b_in_a = mb.iter().all(|m| ma.contains(m));
                assert!(!a_in_b && !b_in_a, "{} overlaps {}", a.name(), b.name());
            }
        }
    }

    #[test]
    fn test_default_bindings_parse_as_chords() {
        for binding in default_bindings() {
            assert!(crate::chord::Chord::parse(&binding.chord).is_ok(), "{}", binding.chord);
        }
    }
}
