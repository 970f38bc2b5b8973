//! Placeholder text codec for names and values coming out of IFC metadata.
//!
//! Upstream stores keep accented characters as STEP-style `\X2\HHHH\X0\`
//! placeholders and double single quotes. Data may arrive raw, encoded, or a
//! mix of both, so matching code compares both forms (see
//! [`crate::accessor::TextMatcher`]).

/// Characters that are escaped by [`encode`], with their UTF-16 code.
const ESCAPED_CHARS: &[(char, &str)] = &[
    ('²', "00B2"),
    ('³', "00B3"),
    ('°', "00B0"),
    ('À', "00C0"),
    ('à', "00E0"),
    ('Á', "00C1"),
    ('á', "00E1"),
    ('Â', "00C2"),
    ('â', "00E2"),
    ('Ã', "00C3"),
    ('ã', "00E3"),
    ('Ä', "00C4"),
    ('ä', "00E4"),
    ('Å', "00C5"),
    ('å', "00E5"),
    ('Æ', "00C6"),
    ('æ', "00E6"),
    ('Ç', "00C7"),
    ('ç', "00E7"),
    ('Ð', "00D0"),
    ('ð', "00F0"),
    ('È', "00C8"),
    ('è', "00E8"),
    ('É', "00C9"),
    ('é', "00E9"),
    ('Ê', "00CA"),
    ('ê', "00EA"),
    ('Ë', "00CB"),
    ('ë', "00EB"),
    ('Ì', "00CC"),
    ('ì', "00EC"),
    ('Í', "00CD"),
    ('í', "00ED"),
    ('Î', "00CE"),
    ('î', "00EE"),
    ('Ï', "00CF"),
    ('ï', "00EF"),
    ('Ñ', "00D1"),
    ('ñ', "00F1"),
    ('Ò', "00D2"),
    ('ò', "00F2"),
    ('Ó', "00D3"),
    ('ó', "00F3"),
    ('Ô', "00D4"),
    ('ô', "00F4"),
    ('Õ', "00D5"),
    ('õ', "00F5"),
    ('Ö', "00D6"),
    ('ö', "00F6"),
    ('œ', "0153"),
    ('Œ', "0152"),
    ('Ø', "00D8"),
    ('ø', "00F8"),
    ('ß', "00DF"),
    ('Ù', "00D9"),
    ('ù', "00F9"),
    ('Ú', "00DA"),
    ('ú', "00FA"),
    ('Û', "00DB"),
    ('û', "00FB"),
    ('Ü', "00DC"),
    ('ü', "00FC"),
    ('Ý', "00DD"),
    ('ý', "00FD"),
    ('Þ', "00DE"),
    ('þ', "00FE"),
    ('Ÿ', "0178"),
    ('ÿ', "00FF"),
];

// Double-backslash forms first: they contain the single-backslash forms.
const OPENERS: [&str; 2] = ["\\\\X2\\\\", "\\X2\\"];
const CLOSERS: [&str; 2] = ["\\\\X0\\\\", "\\X0\\"];

fn code_for_char(ch: char) -> Option<&'static str> {
    ESCAPED_CHARS
        .iter()
        .find(|(c, _)| *c == ch)
        .map(|(_, code)| *code)
}

fn char_for_code(code: &str) -> Option<char> {
    ESCAPED_CHARS
        .iter()
        .find(|(_, c)| c.eq_ignore_ascii_case(code))
        .map(|(ch, _)| *ch)
}

/// Escapes table characters into `\X2\HHHH\X0\` placeholders and doubles
/// single quotes. Characters outside the table pass through unchanged.
#[must_use]
pub fn encode(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match code_for_char(ch) {
            Some(code) => {
                result.push_str("\\X2\\");
                result.push_str(code);
                result.push_str("\\X0\\");
            }
            None if ch == '\'' => result.push_str("''"),
            None => result.push(ch),
        }
    }
    result
}

/// Reverses [`encode`].
///
/// Accepts both `\X2\…\X0\` and `\\X2\\…\\X0\\` delimiters. Placeholders
/// whose code is not in the table are kept (normalized to single
/// backslashes) rather than dropped; malformed ones are left as they are.
#[must_use]
pub fn decode(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = text.replace("''", "'");
    let mut result = String::with_capacity(text.len());
    let mut rest = text.as_str();

    while let Some(pos) = rest.find('\\') {
        result.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        match parse_placeholder(tail) {
            Some((consumed, decoded)) => {
                result.push_str(&decoded);
                rest = &tail[consumed..];
            }
            None => {
                result.push('\\');
                rest = &tail[1..];
            }
        }
    }
    result.push_str(rest);

    result
}

/// Parses one placeholder at the start of `tail`, returning the number of
/// bytes consumed and the replacement text.
fn parse_placeholder(tail: &str) -> Option<(usize, String)> {
    let opener = OPENERS.iter().find(|o| tail.starts_with(**o))?;
    let after_open = &tail[opener.len()..];

    let code = after_open.get(..4)?;
    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return None;
    }

    let after_code = &after_open[4..];
    let closer = CLOSERS.iter().find(|c| after_code.starts_with(**c))?;
    let consumed = opener.len() + 4 + closer.len();

    let decoded = match char_for_code(code) {
        Some(ch) => ch.to_string(),
        None => format!("\\X2\\{code}\\X0\\"),
    };
    Some((consumed, decoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn encodes_accented_characters() {
        assert_eq!(encode("Côtes"), "C\\X2\\00F4\\X0\\tes");
        assert_eq!(encode("Surface m²"), "Surface m\\X2\\00B2\\X0\\");
    }

    #[test]
    fn encode_doubles_every_quote() {
        assert_eq!(encode("l'étage d'en bas"), "l''\\X2\\00E9\\X0\\tage d''en bas");
    }

    #[test]
    fn encode_passes_plain_text_through() {
        assert_eq!(encode("Pset_WallCommon"), "Pset_WallCommon");
        assert_eq!(encode("日本"), "日本");
    }

    #[test]
    fn decode_round_trips_plain_text() {
        for text in ["Côtes", "Été 2024", "Œuvre à l'étage", "plain", "", "m³ / m²"] {
            assert_eq!(decode(&encode(text)), text);
        }
    }

    #[test]
    fn decode_leaves_unencoded_text_alone() {
        assert_eq!(decode("Pset_WallCommon"), "Pset_WallCommon");
        assert_eq!(decode("back\\slash"), "back\\slash");
    }

    #[test]
    fn decode_accepts_double_backslash_delimiters() {
        assert_eq!(decode("C\\\\X2\\\\00F4\\\\X0\\\\tes"), "Côtes");
    }

    #[test]
    fn decode_keeps_unknown_placeholders() {
        assert_eq!(decode("a\\X2\\4E2D\\X0\\b"), "a\\X2\\4E2D\\X0\\b");
        assert_eq!(decode("a\\\\X2\\\\4E2D\\\\X0\\\\b"), "a\\X2\\4E2D\\X0\\b");
    }

    #[test]
    fn decode_keeps_malformed_placeholders() {
        assert_eq!(decode("a\\X2\\00F\\X0\\"), "a\\X2\\00F\\X0\\");
        assert_eq!(decode("\\X2\\00F4"), "\\X2\\00F4");
    }

    #[test]
    fn decode_is_case_insensitive_on_hex() {
        assert_eq!(decode("C\\X2\\00f4\\X0\\tes"), "Côtes");
    }

    #[test]
    fn decode_empty_is_empty() {
        assert_eq!(decode(""), "");
    }
}
