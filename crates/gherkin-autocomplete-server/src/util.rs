//! UTF-16 position helpers.
//!
//! LSP positions count UTF-16 code units while Rust strings index bytes.
//! Completion needs both directions: the cursor arrives as a UTF-16 column
//! and the replacement range is sent back as one.

/// Calculate UTF-16 code units for a character.
///
/// BMP characters (code points ≤ 0xFFFF) use 1 UTF-16 code unit.
/// Non-BMP characters (code points > 0xFFFF) use 2 UTF-16 code units (surrogate pair).
///
/// # Examples
///
/// ```
/// use gherkin_autocomplete_server::util::utf16_code_units;
///
/// assert_eq!(utf16_code_units('a'), 1);
/// assert_eq!(utf16_code_units('я'), 1);
/// assert_eq!(utf16_code_units('😀'), 2);
/// ```
#[inline]
#[must_use]
pub fn utf16_code_units(ch: char) -> u32 {
    if u32::from(ch) <= 0xFFFF { 1 } else { 2 }
}

/// Convert a byte offset within `line` to a UTF-16 column.
///
/// Offsets past the end of the line clamp to the line's UTF-16 length.
///
/// # Examples
///
/// ```
/// use gherkin_autocomplete_server::util::byte_to_utf16_col;
///
/// // "Дано " is 9 bytes but 5 UTF-16 code units.
/// assert_eq!(byte_to_utf16_col("Дано шаг", 9), 5);
/// ```
#[must_use]
pub fn byte_to_utf16_col(line: &str, byte_col: usize) -> u32 {
    line.char_indices()
        .take_while(|(byte_pos, _)| *byte_pos < byte_col)
        .map(|(_, ch)| utf16_code_units(ch))
        .sum::<u32>()
}

/// Convert a UTF-16 column within `line` to a byte offset.
///
/// A column that falls inside a surrogate pair rounds down to the start of
/// the character. Columns past the end clamp to the line's byte length.
///
/// # Examples
///
/// ```
/// use gherkin_autocomplete_server::util::utf16_col_to_byte;
///
/// assert_eq!(utf16_col_to_byte("Дано шаг", 5), 9);
/// assert_eq!(utf16_col_to_byte("abc", 10), 3);
/// ```
#[must_use]
pub fn utf16_col_to_byte(line: &str, utf16_col: u32) -> usize {
    let mut units = 0u32;
    for (byte_pos, ch) in line.char_indices() {
        let next = units + utf16_code_units(ch);
        if next > utf16_col {
            return byte_pos;
        }
        units = next;
    }
    line.len()
}

/// Return line `line_0` (0-based) of `text`, without its line ending.
#[must_use]
pub fn line_at(text: &str, line_0: u32) -> Option<&str> {
    let index = usize::try_from(line_0).ok()?;
    text.lines().nth(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn utf16_code_units_boundary_cases() {
        assert_eq!(utf16_code_units('\u{FFFF}'), 1);
        assert_eq!(utf16_code_units('\u{10000}'), 2);
    }

    #[rstest]
    #[case("Given I start", 6, 6)]
    #[case("Дано шаг", 0, 0)]
    #[case("Дано шаг", 2, 1)]
    #[case("Дано шаг", 9, 5)]
    #[case("a😀b", 5, 3)]
    #[case("short", 100, 5)]
    fn byte_offsets_convert_to_utf16(#[case] line: &str, #[case] byte: usize, #[case] col: u32) {
        assert_eq!(byte_to_utf16_col(line, byte), col);
    }

    #[rstest]
    #[case("Given I start", 6, 6)]
    #[case("Дано шаг", 5, 9)]
    #[case("a😀b", 3, 5)]
    #[case("a😀b", 2, 1)]
    #[case("", 4, 0)]
    fn utf16_columns_convert_to_bytes(#[case] line: &str, #[case] col: u32, #[case] byte: usize) {
        assert_eq!(utf16_col_to_byte(line, col), byte);
    }

    #[test]
    fn line_at_strips_line_endings() {
        let text = "Feature: f\r\n  Scenario: s\n    Given x";
        assert_eq!(line_at(text, 0), Some("Feature: f"));
        assert_eq!(line_at(text, 2), Some("    Given x"));
        assert_eq!(line_at(text, 3), None);
    }
}
