//! Diagram Text Recovery
//!
//! Diagrams are persisted as text of the form
//!
//! ```text
//! [(2, (0.41, 0.43)), (1, (0.3, 0.52)), (0, (0.0, inf)), (0, (0.0, 0.12))]
//! ```
//!
//! Long diagrams are sometimes cut short in storage and lose their closing
//! `]`. Recovery walks backward to the last entry boundary that starts a
//! zero-birth H0 entry (`, (0, (0`), drops everything from there on and
//! closes the list, leaving a prefix of the original entries. Higher
//! dimensions are written first, so a recovered prefix keeps every loop and
//! cavity; a cut that lands before the H0 block has no boundary to fall back
//! to and is rejected.
//!
//! Parsing uses a strict grammar; anything else is rejected.

use crate::error::{Result, TdaError};
use crate::topology::{PersistenceDiagram, PersistenceInterval};
use std::borrow::Cow;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure to repair or parse diagram text
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiagramTextError {
    #[error("truncated text has no zero-birth H0 entry to cut back to")]
    NoRecoveryPoint,

    #[error("expected {expected} at byte {position}")]
    Unexpected { expected: &'static str, position: usize },

    #[error("invalid number '{token}' at byte {position}")]
    InvalidNumber { token: String, position: usize },

    #[error("interval ({birth}, {death}) violates 0 <= birth <= death")]
    InvalidInterval { birth: f64, death: f64 },
}

/// Close a truncated diagram text.
///
/// Text that already ends with `]` is returned untouched.
pub fn repair_truncated(text: &str) -> std::result::Result<Cow<'_, str>, DiagramTextError> {
    let trimmed = text.trim_end();
    if trimmed.ends_with(']') {
        return Ok(Cow::Borrowed(text));
    }

    let cut = last_zero_entry_boundary(trimmed.as_bytes()).ok_or(DiagramTextError::NoRecoveryPoint)?;
    let mut repaired = trimmed[..cut].trim_end().to_string();
    repaired.push(']');
    Ok(Cow::Owned(repaired))
}

/// Position of the last `,` that introduces a `(0, (0...` entry.
///
/// The scan is bounded by the start of the text.
fn last_zero_entry_boundary(bytes: &[u8]) -> Option<usize> {
    (0..bytes.len())
        .rev()
        .find(|&i| bytes[i] == b',' && starts_zero_entry(bytes, i + 1))
}

fn starts_zero_entry(bytes: &[u8], mut i: usize) -> bool {
    for expected in [b'(', b'0', b',', b'(', b'0'] {
        i = skip_ws(bytes, i);
        if bytes.get(i) != Some(&expected) {
            return false;
        }
        i += 1;
    }
    // Birth must be exactly zero (0, 0.0, 0.00...), possibly cut mid-token
    if bytes.get(i) == Some(&b'.') {
        i += 1;
        while bytes.get(i) == Some(&b'0') {
            i += 1;
        }
    }
    match bytes.get(i) {
        None | Some(b',') | Some(b')') => true,
        Some(c) => c.is_ascii_whitespace(),
    }
}

fn skip_ws(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).is_some_and(|c| c.is_ascii_whitespace()) {
        i += 1;
    }
    i
}

/// Remove every `(0, (0.0, inf))` entry from a diagram text.
///
/// Text without an outer `[...]` is returned unchanged for the parser to
/// reject.
pub fn strip_infinite_placeholders(text: &str) -> String {
    let trimmed = text.trim();
    let Some(inner) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) else {
        return text.to_string();
    };

    let kept: Vec<&str> = split_top_level(inner)
        .into_iter()
        .map(str::trim)
        .filter(|entry| !entry.is_empty() && !is_infinite_placeholder(entry))
        .collect();

    format!("[{}]", kept.join(", "))
}

fn is_infinite_placeholder(entry: &str) -> bool {
    let compact: String = entry.chars().filter(|c| !c.is_whitespace()).collect();
    matches!(compact.as_str(), "(0,(0.0,inf))" | "(0,(0,inf))" | "(0,(0.,inf))")
}

/// Split on commas at parenthesis depth zero
fn split_top_level(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, c) in inner.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&inner[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}

/// Parse diagram text with the strict list-of-entries grammar:
///
/// ```text
/// diagram := '[' [ entry { ',' entry } [ ',' ] ] ']'
/// entry   := '(' uint ',' '(' real ',' real ')' ')'
/// real    := decimal | 'inf'
/// ```
pub fn parse_diagram(text: &str) -> std::result::Result<PersistenceDiagram, DiagramTextError> {
    let mut parser = Parser { bytes: text.as_bytes(), pos: 0 };
    let intervals = parser.diagram()?;
    Ok(PersistenceDiagram::from_intervals(intervals))
}

struct Parser<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Parser<'_> {
    fn diagram(&mut self) -> std::result::Result<Vec<PersistenceInterval>, DiagramTextError> {
        self.expect(b'[', "'['")?;
        let mut intervals = Vec::new();
        loop {
            self.ws();
            if self.peek() == Some(b']') {
                self.pos += 1;
                break;
            }
            intervals.push(self.entry()?);
            self.ws();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }
        self.ws();
        if self.pos != self.bytes.len() {
            return Err(self.unexpected("end of text"));
        }
        Ok(intervals)
    }

    fn entry(&mut self) -> std::result::Result<PersistenceInterval, DiagramTextError> {
        self.expect(b'(', "'('")?;
        let betti = self.unsigned()?;
        self.expect(b',', "','")?;
        self.expect(b'(', "'('")?;
        let birth = self.real()?;
        self.expect(b',', "','")?;
        let death = self.real()?;
        self.expect(b')', "')'")?;
        self.expect(b')', "')'")?;

        if !(birth >= 0.0 && death >= birth) {
            return Err(DiagramTextError::InvalidInterval { birth, death });
        }
        Ok(PersistenceInterval::new(betti, birth, death))
    }

    fn unsigned(&mut self) -> std::result::Result<usize, DiagramTextError> {
        self.ws();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let token = self.token(start);
        token.parse().map_err(|_| DiagramTextError::InvalidNumber {
            token: token.to_string(),
            position: start,
        })
    }

    fn real(&mut self) -> std::result::Result<f64, DiagramTextError> {
        self.ws();
        let start = self.pos;
        if self.bytes[self.pos..].starts_with(b"inf") {
            self.pos += 3;
            return Ok(f64::INFINITY);
        }
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_digit() || matches!(c, b'.' | b'e' | b'E' | b'+' | b'-'))
        {
            self.pos += 1;
        }
        let token = self.token(start);
        token
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| DiagramTextError::InvalidNumber {
                token: token.to_string(),
                position: start,
            })
    }

    fn token(&self, start: usize) -> &str {
        std::str::from_utf8(&self.bytes[start..self.pos]).unwrap_or_default()
    }

    fn expect(&mut self, byte: u8, expected: &'static str) -> std::result::Result<(), DiagramTextError> {
        self.ws();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &'static str) -> DiagramTextError {
        DiagramTextError::Unexpected {
            expected,
            position: self.pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn ws(&mut self) {
        self.pos = skip_ws(self.bytes, self.pos);
    }
}

/// Repair, strip placeholders and parse one stored diagram.
///
/// Every failure is reported as `MalformedDiagram` against `id`.
pub fn recover_diagram(id: &str, text: &str) -> Result<PersistenceDiagram> {
    let repaired = repair_truncated(text).map_err(|e| TdaError::malformed(id, e.to_string()))?;
    if matches!(repaired, Cow::Owned(_)) {
        warn!(id = %id, "diagram text was truncated; recovered {} of {} bytes", repaired.len(), text.len());
    }

    let stripped = strip_infinite_placeholders(&repaired);
    let mut parser = Parser { bytes: stripped.as_bytes(), pos: 0 };
    let intervals = parser.diagram().map_err(|e| TdaError::malformed(id, e.to_string()))?;

    let stored_descending = intervals.windows(2).all(|w| w[0].betti >= w[1].betti);
    let (diagram, reordered) = PersistenceDiagram::canonicalize(intervals);
    if reordered && stored_descending {
        debug!(id = %id, "diagram text in descending Betti order; regrouped");
    } else if reordered {
        warn!(id = %id, "diagram entries were not grouped by Betti number; re-sorted");
    }
    Ok(diagram)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "[(2, (0.41, 0.43)), (1, (0.3, 0.52)), (0, (0.0, inf)), (0, (0.0, 0.12)), (0, (0.0, 0.1))]";

    #[test]
    fn test_complete_text_untouched() {
        let repaired = repair_truncated(FULL).unwrap();
        assert!(matches!(repaired, Cow::Borrowed(_)));
        assert_eq!(repaired, FULL);
    }

    #[test]
    fn test_truncated_text_recovers_prefix() {
        let full = parse_diagram(FULL).unwrap();
        let truncated = &FULL[..FULL.len() - 9]; // "... (0, (0."
        let repaired = repair_truncated(truncated).unwrap();
        assert_eq!(
            repaired,
            "[(2, (0.41, 0.43)), (1, (0.3, 0.52)), (0, (0.0, inf)), (0, (0.0, 0.12))]"
        );

        let recovered = parse_diagram(&repaired).unwrap();
        assert_eq!(recovered.len(), 4);
        // Same entries as the full diagram, less the lost tail
        for interval in recovered.intervals() {
            assert!(full.intervals().contains(interval));
        }
    }

    #[test]
    fn test_no_recovery_point() {
        assert_eq!(
            repair_truncated("[(2, (0.41, 0.43)), (1, (0.3, 0.5").unwrap_err(),
            DiagramTextError::NoRecoveryPoint
        );
        // The very first entry has no preceding boundary
        assert!(repair_truncated("[(0, (0.0, 0.1").is_err());
        assert!(repair_truncated("").is_err());
    }

    #[test]
    fn test_nonzero_birth_is_not_a_boundary() {
        let text = "[(1, (0.3, 0.52)), (0, (0.05, 0.1)), (0, (0.07, 0.";
        assert!(repair_truncated(text).is_err());
    }

    #[test]
    fn test_strip_infinite_placeholders() {
        let stripped = strip_infinite_placeholders("[(1, (0.3, 0.5)), (0, (0.0, inf)), (0, (0.0, 0.1))]");
        assert_eq!(stripped, "[(1, (0.3, 0.5)), (0, (0.0, 0.1))]");

        assert_eq!(strip_infinite_placeholders("[(0, (0.0, inf))]"), "[]");
        // Other essential classes are kept
        assert_eq!(
            strip_infinite_placeholders("[(1, (0.2, inf))]"),
            "[(1, (0.2, inf))]"
        );
    }

    #[test]
    fn test_parser_rejects_garbage() {
        assert!(parse_diagram("[(1, (0.3, 0.5)]").is_err());
        assert!(parse_diagram("[(1, (0.3, 0.5))] trailing").is_err());
        assert!(parse_diagram("[(1, (abc, 0.5))]").is_err());
        assert!(parse_diagram("__import__('os')").is_err());
        assert!(matches!(
            parse_diagram("[(1, (0.5, 0.3))]"),
            Err(DiagramTextError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn test_parser_accepts_python_floats() {
        let pd = parse_diagram("[(1, (1e-05, 0.5)), (2, (0.25, inf)),]").unwrap();
        assert_eq!(pd.len(), 2);
        assert_eq!(pd.intervals()[0].birth, 1e-5);
        assert!(pd.intervals()[1].death.is_infinite());
    }

    #[test]
    fn test_recover_regroups_descending_diagram() {
        let pd = recover_diagram("CAGE01", FULL).unwrap();
        // Placeholder removed, remaining entries grouped ascending
        assert_eq!(pd.len(), 4);
        assert_eq!(pd.intervals()[0].betti, 0);
        assert_eq!(pd.max_betti(), Some(2));
    }

    #[test]
    fn test_recover_reports_malformed() {
        let err = recover_diagram("CAGE02", "[(1, (0.3, 0.5").unwrap_err();
        assert!(matches!(err, TdaError::MalformedDiagram { ref id, .. } if id == "CAGE02"));
    }

    #[test]
    fn test_serialised_cut_keeps_cavities_or_fails() {
        let full = PersistenceDiagram::from_intervals(vec![
            PersistenceInterval::new(0, 0.0, f64::INFINITY),
            PersistenceInterval::new(0, 0.0, 0.12),
            PersistenceInterval::new(0, 0.0, 0.1),
            PersistenceInterval::new(0, 0.0, 0.08),
            PersistenceInterval::new(1, 0.3, 0.52),
            PersistenceInterval::new(2, 0.41, 0.43),
            PersistenceInterval::new(2, 0.42, 0.47),
        ]);
        let text = full.to_string();
        let dropped = &text[..text.len() - 4];

        let recovered = recover_diagram("CAGE03", dropped).unwrap();
        assert!(recovered.has_betti_dimension(2));
        assert_eq!(recovered.extract_by_dimension(2), full.extract_by_dimension(2));
        assert_eq!(recovered.extract_by_dimension(1), full.extract_by_dimension(1));
        assert!(recovered.len() < full.len());

        // Cut inside the cavity entries: nothing safe to keep
        let early = &text[..text.find("(1,").unwrap()];
        assert!(matches!(
            recover_diagram("CAGE03", early),
            Err(TdaError::MalformedDiagram { .. })
        ));
    }
}
