use crate::key::{Chord, Key, NamedKey};

/// Parse compact key notation into chords.
/// Examples:
///   "abc" -> [Char('a'), Char('b'), Char('c')]
///   "<C-x>h" -> [ctrl-x, Char('h')]
///   "<Esc>" -> [Named(Esc)]
///   "<C-M-Enter>" -> [ctrl-alt-Enter]
pub fn parse_keys(notation: &str) -> Result<Vec<Chord>, NotationError> {
    let mut chords = Vec::new();
    let mut chars = notation.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '<' => {
                // Parse special key <...>
                let mut special = String::new();
                let mut found_closing = false;

                for ch in chars.by_ref() {
                    if ch == '>' {
                        found_closing = true;
                        break;
                    }
                    special.push(ch);
                }

                if !found_closing {
                    return Err(NotationError::Unclosed(special));
                }

                chords.push(parse_special(&special)?);
            },
            _ => chords.push(Chord::from(ch)),
        }
    }

    Ok(chords)
}

/// Parse a single chord. Accepts both bare (`a`, `x`) and bracketed
/// (`<C-x>`, `<Esc>`) forms; rejects anything that is not exactly one chord.
pub fn parse_key(notation: &str) -> Result<Chord, NotationError> {
    let mut chords = parse_keys(notation)?;
    match (chords.len(), chords.pop()) {
        (1, Some(chord)) => Ok(chord),
        (0, _) => Err(NotationError::Empty),
        _ => Err(NotationError::NotSingle(notation.to_string())),
    }
}

fn parse_special(s: &str) -> Result<Chord, NotationError> {
    if s.is_empty() {
        return Err(NotationError::Empty);
    }

    // Peel modifier prefixes, then the remainder is the key token
    let mut ctrl = false;
    let mut alt = false;
    let mut shift = false;
    let mut rest = s;

    loop {
        let Some((head, tail)) = rest.split_once('-') else {
            break;
        };
        match head {
            "C" | "Ctrl" => ctrl = true,
            "S" | "Shift" => shift = true,
            "A" | "Alt" | "M" | "Meta" => alt = true,
            _ => {
                // Not a modifier; `-` belongs to the key token (e.g. "<->")
                break;
            },
        }
        rest = tail;
    }

    let key = parse_key_token(rest)?;
    Ok(Chord {
        key,
        ctrl,
        alt,
        shift,
    })
}

fn parse_key_token(s: &str) -> Result<Key, NotationError> {
    let mut chars = s.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return Ok(Key::Char(ch));
    }

    // Named keys
    match s {
        "Esc" | "Escape" => Ok(Key::Named(NamedKey::Esc)),
        "Enter" | "Return" | "CR" => Ok(Key::Named(NamedKey::Enter)),
        "Tab" => Ok(Key::Named(NamedKey::Tab)),
        "Space" => Ok(Key::Named(NamedKey::Space)),
        "Backspace" | "BS" => Ok(Key::Named(NamedKey::Backspace)),
        "Delete" | "Del" => Ok(Key::Named(NamedKey::Delete)),
        "Up" => Ok(Key::Named(NamedKey::Up)),
        "Down" => Ok(Key::Named(NamedKey::Down)),
        "Left" => Ok(Key::Named(NamedKey::Left)),
        "Right" => Ok(Key::Named(NamedKey::Right)),
        "Home" => Ok(Key::Named(NamedKey::Home)),
        "End" => Ok(Key::Named(NamedKey::End)),
        "PageUp" | "PgUp" => Ok(Key::Named(NamedKey::PageUp)),
        "PageDown" | "PgDn" => Ok(Key::Named(NamedKey::PageDown)),
        _ => Err(NotationError::UnknownKey(s.to_string())),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotationError {
    #[error("unclosed special key notation at '<{0}'")]
    Unclosed(String),

    #[error("unknown special key: <{0}>")]
    UnknownKey(String),

    #[error("expected a single chord, got {0:?}")]
    NotSingle(String),

    #[error("empty key notation")]
    Empty,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_keys() {
        let keys = parse_keys("abc").expect("Failed to parse plain chars");
        assert_eq!(
            keys,
            vec![Chord::from('a'), Chord::from('b'), Chord::from('c')]
        );
    }

    #[test]
    fn test_parse_special_keys() {
        let keys = parse_keys("a<Esc>b<Enter>").expect("Failed to parse named keys");
        assert_eq!(
            keys,
            vec![
                Chord::from('a'),
                Chord::esc(),
                Chord::from('b'),
                Chord::from(NamedKey::Enter),
            ]
        );
    }

    #[test]
    fn test_parse_modified_keys() {
        let keys = parse_keys("<C-a><S-/><A-x>").expect("Failed to parse modified keys");
        assert_eq!(
            keys,
            vec![
                Chord::ctrl(Key::Char('a')),
                Chord::shift(Key::Char('/')),
                Chord::alt(Key::Char('x')),
            ]
        );
    }

    #[test]
    fn test_parse_stacked_modifiers() {
        let chord = parse_key("<C-M-Enter>").expect("Failed to parse stacked modifiers");
        assert!(chord.ctrl && chord.alt && !chord.shift);
        assert_eq!(chord.key, Key::Named(NamedKey::Enter));

        // Meta is an alias for Alt
        assert_eq!(parse_key("<M-f>"), parse_key("<Alt-f>"));
    }

    #[test]
    fn test_parse_prefix_sequence() {
        let keys = parse_keys("<C-x>h").expect("Failed to parse prefix sequence");
        assert_eq!(keys, vec![Chord::ctrl(Key::Char('x')), Chord::from('h')]);
    }

    #[test]
    fn test_display_round_trip() {
        for notation in ["a", "<C-x>", "<Esc>", "<C-M-S-Tab>", "<S-/>"] {
            let chord = parse_key(notation).expect("Failed to parse notation");
            assert_eq!(
                parse_key(&chord.to_string()),
                Ok(chord),
                "round trip failed for {notation}"
            );
        }
    }

    #[test]
    fn test_parse_single_rejects_sequences() {
        assert_eq!(
            parse_key("ab"),
            Err(NotationError::NotSingle("ab".to_string()))
        );
        assert_eq!(parse_key(""), Err(NotationError::Empty));
    }

    #[test]
    fn test_error_handling() {
        // Unclosed bracket
        assert!(parse_keys("a<Esc").is_err());

        // Unknown special key
        assert!(parse_keys("<Unknown>").is_err());

        // Unknown modifier is not silently accepted
        assert!(parse_keys("<X-a>").is_err());
    }
}
