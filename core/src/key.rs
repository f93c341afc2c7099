use serde::{Deserialize, Serialize};

/// A single key, before modifiers are applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Key {
    /// Single character
    Char(char),

    /// Special named keys
    Named(NamedKey),
}

/// Special keys that have names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum NamedKey {
    Esc,
    Enter,
    Tab,
    Space,
    Backspace,
    Delete,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
}

/// A key plus modifier flags. This is the unit of key lookup: two chords are
/// the same binding identity iff key and all flags match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Chord {
    pub key: Key,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
}

impl Chord {
    pub const fn plain(key: Key) -> Self {
        Self {
            key,
            ctrl: false,
            alt: false,
            shift: false,
        }
    }

    pub const fn ctrl(key: Key) -> Self {
        Self {
            ctrl: true,
            ..Self::plain(key)
        }
    }

    pub const fn alt(key: Key) -> Self {
        Self {
            alt: true,
            ..Self::plain(key)
        }
    }

    pub const fn shift(key: Key) -> Self {
        Self {
            shift: true,
            ..Self::plain(key)
        }
    }

    pub const fn esc() -> Self {
        Self::plain(Key::Named(NamedKey::Esc))
    }

    pub const fn is_plain(&self) -> bool {
        !self.ctrl && !self.alt && !self.shift
    }
}

impl From<char> for Chord {
    fn from(ch: char) -> Self {
        Chord::plain(Key::Char(ch))
    }
}

impl From<NamedKey> for Chord {
    fn from(named: NamedKey) -> Self {
        Chord::plain(Key::Named(named))
    }
}

impl std::fmt::Display for Chord {
    /// Renders in the notation `parse_keys` accepts: a bare character for an
    /// unmodified char key, `<C-M-S-key>` otherwise (modifiers in C-M-S order).
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_plain() {
            if let Key::Char(c) = self.key {
                return write!(f, "{c}");
            }
        }
        write!(f, "<")?;
        if self.ctrl {
            write!(f, "C-")?;
        }
        if self.alt {
            write!(f, "M-")?;
        }
        if self.shift {
            write!(f, "S-")?;
        }
        write!(f, "{}>", self.key)
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{c}"),
            Key::Named(named) => write!(f, "{named}"),
        }
    }
}

impl std::fmt::Display for NamedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NamedKey::Esc => write!(f, "Esc"),
            NamedKey::Enter => write!(f, "Enter"),
            NamedKey::Tab => write!(f, "Tab"),
            NamedKey::Space => write!(f, "Space"),
            NamedKey::Backspace => write!(f, "Backspace"),
            NamedKey::Delete => write!(f, "Delete"),
            NamedKey::Up => write!(f, "Up"),
            NamedKey::Down => write!(f, "Down"),
            NamedKey::Left => write!(f, "Left"),
            NamedKey::Right => write!(f, "Right"),
            NamedKey::Home => write!(f, "Home"),
            NamedKey::End => write!(f, "End"),
            NamedKey::PageUp => write!(f, "PgUp"),
            NamedKey::PageDown => write!(f, "PgDn"),
        }
    }
}
