use std::error::Error;
use std::fmt;

/// Failures raised while parsing a play descriptor or ingesting a game.
///
/// Unknown play shapes are not errors; they classify as
/// [`PlayCategory::Unclassified`](crate::types::PlayCategory::Unclassified).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetrosheetError {
    /// A `)` without a matching `(`, or a `(` that is never closed.
    UnbalancedBrackets { input: String },
    /// The play descriptor has no event before its modifiers/advances.
    EmptyEvent { input: String },
    /// Segmentation produced no sub-events for the event.
    EmptySubevents { event: String },
    /// The first record of a game is not an `id` line.
    MissingGameId { line: String },
    /// A record has fewer fields than its type requires.
    MalformedRecord { line: String, expected_fields: usize },
}

impl fmt::Display for RetrosheetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnbalancedBrackets { input } => {
                write!(f, "Syntax error: unbalanced brackets in '{input}'")
            }
            Self::EmptyEvent { input } => write!(f, "Syntax error: empty event in '{input}'"),
            Self::EmptySubevents { event } => {
                write!(f, "Value error: empty subevent list for event '{event}'")
            }
            Self::MissingGameId { line } => {
                write!(f, "Format error: missing or misplaced game id (first line '{line}')")
            }
            Self::MalformedRecord {
                line,
                expected_fields,
            } => write!(
                f,
                "Format error: expected {expected_fields} fields in record '{line}'"
            ),
        }
    }
}

impl Error for RetrosheetError {}

#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator(Option<String>);

impl ErrorAccumulator {
    pub fn push(&mut self, msg: &str) {
        match &mut self.0 {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(msg);
            }
            None => {
                self.0 = Some(msg.to_string());
            }
        }
    }

    pub fn take(&mut self) -> Option<String> {
        self.0.take()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}
