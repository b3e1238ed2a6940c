//! Helpers for the two-digit numbers ("00".."99") that everything is keyed on.

/// True when `s` is exactly two ASCII digits.
pub fn is_two_digit(s: &str) -> bool {
    s.len() == 2 && s.bytes().all(|b| b.is_ascii_digit())
}

/// Last two characters of a prize number, if they are both digits.
///
/// "12345" → "45", "7" → None, "12a4" → None.
pub fn last_two_digits(s: &str) -> Option<&str> {
    let s = s.trim();
    let tail = s.get(s.len().checked_sub(2)?..)?;
    is_two_digit(tail).then_some(tail)
}
