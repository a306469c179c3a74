//! Numbered-list response protocol
//!
//! A batch response must contain one line per item:
//!
//! ```text
//! line := ws* INT ws* SEP ws* TEXT
//! SEP  := '.' | ')' | ':' | '-'
//! ```
//!
//! Blank lines and code fences are ignored, and free text before the first
//! numbered line is tolerated as a preamble. Anything else is rejected, so an
//! ambiguous response sends the whole batch to the single-item path instead of
//! being guessed at.

use thiserror::Error;

const SEPARATORS: [char; 4] = ['.', ')', ':', '-'];

/// Why a batch response was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchParseError {
    #[error("Response contains no numbered lines")]
    Empty,

    #[error("Expected {expected} numbered lines, found {found}")]
    CountMismatch { expected: usize, found: usize },

    #[error("Entry {0} appears more than once")]
    DuplicateEntry(usize),

    #[error("Entry {number} is outside 1..={expected}")]
    OutOfRange { number: usize, expected: usize },

    #[error("Unnumbered line after numbered entries: {0}")]
    UnnumberedLine(String),
}

/// Split one line into its number and text
fn parse_line(line: &str) -> Option<(usize, &str)> {
    let line = line.trim_start();
    let digits_end = line
        .char_indices()
        .find(|(_, c)| !c.is_ascii_digit())
        .map_or(line.len(), |(i, _)| i);
    if digits_end == 0 {
        return None;
    }

    let number = line[..digits_end].parse().ok()?;
    let rest = line[digits_end..].trim_start();
    let text = rest.strip_prefix(SEPARATORS)?;

    Some((number, text.trim()))
}

/// Parse a batch response into exactly `expected` texts, in item order
pub fn parse_numbered(response: &str, expected: usize) -> Result<Vec<String>, BatchParseError> {
    let mut entries: Vec<Option<String>> = vec![None; expected];
    let mut found = 0;

    for line in response.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("```") {
            continue;
        }

        let Some((number, text)) = parse_line(trimmed) else {
            if found == 0 {
                continue;
            }
            return Err(BatchParseError::UnnumberedLine(trimmed.to_string()));
        };

        if number == 0 || number > expected {
            return Err(BatchParseError::OutOfRange { number, expected });
        }
        let slot = &mut entries[number - 1];
        if slot.is_some() {
            return Err(BatchParseError::DuplicateEntry(number));
        }
        *slot = Some(text.to_string());
        found += 1;
    }

    if found == 0 {
        return Err(BatchParseError::Empty);
    }
    if found != expected {
        return Err(BatchParseError::CountMismatch { expected, found });
    }

    Ok(entries.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_exact_response() {
        let parsed = parse_numbered("1. Сохранить\n2. Отмена\n3. Привет, {name}!", 3).unwrap();
        assert_eq!(parsed, vec!["Сохранить", "Отмена", "Привет, {name}!"]);
    }

    #[test]
    fn test_separators_and_spacing() {
        let parsed = parse_numbered("  1) Uno\n2 : Dos\n3 -Tres\n4.Cuatro", 4).unwrap();
        assert_eq!(parsed, vec!["Uno", "Dos", "Tres", "Cuatro"]);
    }

    #[test]
    fn test_out_of_order_lines_map_by_number() {
        let parsed = parse_numbered("2. B\n1. A", 2).unwrap();
        assert_eq!(parsed, vec!["A", "B"]);
    }

    #[test]
    fn test_preamble_fences_and_blank_lines() {
        let response = "Here are the translations:\n```\n1. Hallo\n\n2. Welt\n```\n";
        assert_eq!(parse_numbered(response, 2).unwrap(), vec!["Hallo", "Welt"]);
    }

    #[test]
    fn test_truncated_response_is_count_mismatch() {
        assert_eq!(
            parse_numbered("1. A\n2. B", 3),
            Err(BatchParseError::CountMismatch {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn test_rejects_ambiguous_responses() {
        assert_eq!(parse_numbered("", 1), Err(BatchParseError::Empty));
        assert_eq!(parse_numbered("Sorry, I cannot", 1), Err(BatchParseError::Empty));
        assert_eq!(
            parse_numbered("1. A\n1. A again", 2),
            Err(BatchParseError::DuplicateEntry(1))
        );
        assert_eq!(
            parse_numbered("1. A\n3. C", 2),
            Err(BatchParseError::OutOfRange {
                number: 3,
                expected: 2
            })
        );
        assert_eq!(
            parse_numbered("1. A\ncontinued\n2. B", 2),
            Err(BatchParseError::UnnumberedLine("continued".to_string()))
        );
    }

    #[test]
    fn test_number_without_separator_is_not_an_entry() {
        assert_eq!(
            parse_numbered("2024 was great\n1. A", 1).unwrap(),
            vec!["A"]
        );
    }
}
