use crate::key::Chord;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// The lookup identity of a dispatchable occurrence.
///
/// The dispatcher does not care how the host models its events; it only needs
/// a stable identity to resolve against the binding tables. Key events carry
/// their chord, everything else (editor notifications, thread signals,
/// synthetic events) is identified by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Input {
    /// A key chord from the host's key events.
    Key(Chord),

    /// A named notification raised by a collaborator, e.g. "shell_activated".
    Named(SmolStr),
}

impl Input {
    pub fn named(name: impl Into<SmolStr>) -> Self {
        Input::Named(name.into())
    }

    pub fn key(&self) -> Option<&Chord> {
        match self {
            Input::Key(chord) => Some(chord),
            Input::Named(_) => None,
        }
    }
}

impl From<Chord> for Input {
    fn from(chord: Chord) -> Self {
        Input::Key(chord)
    }
}

impl From<char> for Input {
    fn from(ch: char) -> Self {
        Input::Key(Chord::from(ch))
    }
}

impl std::fmt::Display for Input {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Key(chord) => write!(f, "{chord}"),
            Input::Named(name) => write!(f, "{name}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;

    #[test]
    fn test_input_identity() {
        assert_eq!(Input::from('a'), Input::Key(Chord::from('a')));
        assert_ne!(Input::from('a'), Input::named("a"));
        assert_eq!(Input::named("shell_activated"), Input::named("shell_activated"));
    }

    #[test]
    fn test_input_serialization() {
        let input = Input::Key(Chord::ctrl(Key::Char('x')));
        let ron_str = ron::to_string(&input).expect("Failed to serialize key input");
        let parsed: Input = ron::from_str(&ron_str).expect("Failed to deserialize key input");
        assert_eq!(parsed, input);

        let parsed: Input = ron::from_str(r#"Named("interp_error")"#)
            .expect("Failed to deserialize named input");
        assert_eq!(parsed, Input::named("interp_error"));
    }
}
