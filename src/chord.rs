//! Keyboard chord parsing and local keydown matching
//!
//! A chord identifier is `[MOD2_][MOD3_]PRIMARY`, for example `Numpad4`,
//! `LControl_Numpad4` or `LAlt_LShift_Backquote`. The local matcher checks
//! DOM-style key events (a key string plus modifier flags); the native hook
//! resolves the same identifiers to device key codes on its own side.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::constants::chord::{DELIMITER, MAX_TOKENS};

/// Callback bound to a chord; receives either the local synthetic event or
/// a hook notification
pub type ChordCallback = Arc<dyn Fn(&ChordEvent) + Send + Sync>;

/// Errors that can occur while parsing a chord identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChordError {
    #[error("chord identifier cannot be empty")]
    Empty,
    #[error("chord '{0}' has more than three tokens")]
    TooManyTokens(String),
    #[error("chord '{0}' has an empty primary key")]
    EmptyPrimary(String),
    #[error("unknown modifier '{modifier}' in chord '{chord}'")]
    UnknownModifier { chord: String, modifier: String },
}

/// Live keyboard event as seen by the focused window
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyEvent {
    /// Produced character or key name ("4", "+", "ё", "F1")
    pub key: String,
    pub alt: bool,
    pub ctrl: bool,
    pub shift: bool,
}

impl KeyEvent {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }
}

/// Event delivered to chord callbacks
#[derive(Debug, Clone, PartialEq)]
pub struct ChordEvent {
    /// Chord identifier (local path) or hook channel (hook path)
    pub event: String,
    pub window_label: String,
    pub id: u32,
    /// `Null` for local echoes, the hook's payload verbatim otherwise
    pub payload: Value,
}

/// Modifier predicate for one of the two modifier slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    Alt,
    Control,
    Shift,
    /// Empty slot, always satisfied
    Any,
}

impl Modifier {
    /// Resolve a modifier token; `None` for names outside the three families
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "" => Some(Modifier::Any),
            "Alt" | "LAlt" | "RAlt" => Some(Modifier::Alt),
            "Control" | "LControl" | "RControl" => Some(Modifier::Control),
            "Shift" | "LShift" | "RShift" => Some(Modifier::Shift),
            _ => None,
        }
    }

    pub fn is_held(self, event: &KeyEvent) -> bool {
        match self {
            Modifier::Alt => event.alt,
            Modifier::Control => event.ctrl,
            Modifier::Shift => event.shift,
            Modifier::Any => true,
        }
    }
}

/// Primary-key predicate
#[derive(Debug, Clone, PartialEq, Eq)]
enum Primary {
    /// Numpad digit matches the plain digit character
    Digit(char),
    /// Arithmetic operator matches its symbol
    Symbol(char),
    /// `.` or `,` depending on locale
    Decimal,
    /// Backtick, apostrophe or Cyrillic ё (same physical key on common layouts)
    Backquote,
    /// Anything else matches the key name verbatim
    Named,
}

impl Primary {
    fn from_token(token: &str) -> Self {
        if let Some(c) = token.strip_prefix("Numpad").and_then(single_char) {
            if c.is_ascii_digit() {
                return Primary::Digit(c);
            }
        }
        match token {
            "Add" => Primary::Symbol('+'),
            "Subtract" => Primary::Symbol('-'),
            "Multiply" => Primary::Symbol('*'),
            "Divide" => Primary::Symbol('/'),
            "Decimal" => Primary::Decimal,
            "Backquote" => Primary::Backquote,
            _ => Primary::Named,
        }
    }
}

/// A parsed chord identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    name: String,
    primary_token: String,
    primary: Primary,
    modifier_tokens: [String; 2],
    modifiers: [Modifier; 2],
}

impl Chord {
    pub fn parse(name: &str) -> Result<Self, ChordError> {
        if name.is_empty() {
            return Err(ChordError::Empty);
        }

        let parts: Vec<&str> = name.split(DELIMITER).collect();
        if parts.len() > MAX_TOKENS {
            return Err(ChordError::TooManyTokens(name.to_string()));
        }

        // The primary key is always the last token
        let (primary_token, modifier_parts) = match parts.split_last() {
            Some((last, rest)) if !last.is_empty() => (*last, rest),
            _ => return Err(ChordError::EmptyPrimary(name.to_string())),
        };

        let mut modifier_tokens = [String::new(), String::new()];
        let mut modifiers = [Modifier::Any; 2];
        // Unknown modifier names are an error here, not a wildcard slot
        for (slot, token) in modifier_parts.iter().enumerate() {
            modifiers[slot] = Modifier::from_token(token).ok_or_else(|| ChordError::UnknownModifier {
                chord: name.to_string(),
                modifier: token.to_string(),
            })?;
            modifier_tokens[slot] = token.to_string();
        }

        Ok(Self {
            name: name.to_string(),
            primary_token: primary_token.to_string(),
            primary: Primary::from_token(primary_token),
            modifier_tokens,
            modifiers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_token(&self) -> &str {
        &self.primary_token
    }

    /// Non-empty modifier tokens, slot "second" first
    pub fn modifier_tokens(&self) -> impl Iterator<Item = &str> {
        self.modifier_tokens
            .iter()
            .map(String::as_str)
            .filter(|t| !t.is_empty())
    }

    fn primary_matches(&self, key: &str) -> bool {
        match self.primary {
            Primary::Digit(c) | Primary::Symbol(c) => single_char(key) == Some(c),
            Primary::Decimal => key == "." || key == ",",
            Primary::Backquote => key == "`" || key == "'" || key == "ё",
            Primary::Named => key == self.primary_token,
        }
    }

    /// True iff the primary key and both modifier slots hold for `event`
    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.primary_matches(&event.key) && self.modifiers.iter().all(|m| m.is_held(event))
    }
}

fn single_char(key: &str) -> Option<char> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

struct Registration {
    chord: Chord,
    echo: ChordEvent,
    callback: ChordCallback,
}

/// Local keydown matcher
///
/// Every registration whose chord matches fires, in registration order.
pub struct ChordMatcher {
    window_label: String,
    registrations: Vec<Registration>,
}

impl ChordMatcher {
    pub fn new(window_label: impl Into<String>) -> Self {
        Self {
            window_label: window_label.into(),
            registrations: Vec::new(),
        }
    }

    /// Parse `name` and bind `callback` to it
    pub fn register(&mut self, name: &str, callback: ChordCallback) -> Result<(), ChordError> {
        let chord = Chord::parse(name)?;
        let echo = ChordEvent {
            event: name.to_string(),
            window_label: self.window_label.clone(),
            id: 0,
            payload: Value::Null,
        };
        debug!(chord = name, "Registered local chord");
        self.registrations.push(Registration {
            chord,
            echo,
            callback,
        });
        Ok(())
    }

    /// Fire every matching registration; returns how many fired
    pub fn dispatch(&self, event: &KeyEvent) -> usize {
        let mut fired = 0;
        for registration in &self.registrations {
            if registration.chord.matches(event) {
                trace!(chord = registration.chord.name(), key = %event.key, "Local chord matched");
                (registration.callback)(&registration.echo);
                fired += 1;
            }
        }
        fired
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
