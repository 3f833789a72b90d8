//! Manual override dispositions

use std::collections::BTreeMap;
use std::fmt;

/// Prefix marking a persisted override as a discard rather than a summary
pub const DISCARD_MARKER: &str = "[discard] ";

/// Persisted override document: tool-call id -> encoded disposition
pub type OverrideMap = BTreeMap<String, String>;

/// Stable index document: 1-based index -> tool-call id
pub type IndexMap = BTreeMap<usize, String>;

/// What the agent asked to happen to a tool call's output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// Output replaced with the agent's own summary
    Extracted(String),
    /// Output dropped, with the stated reason
    Discarded(String),
}

impl Disposition {
    /// Decode a persisted override value
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(DISCARD_MARKER) {
            Some(reason) => Disposition::Discarded(reason.to_string()),
            None => Disposition::Extracted(raw.to_string()),
        }
    }

    /// Encode for persistence
    pub fn encode(&self) -> String {
        match self {
            Disposition::Extracted(summary) => summary.clone(),
            Disposition::Discarded(reason) => format!("{}{}", DISCARD_MARKER, reason),
        }
    }

    /// History map annotation
    pub fn label(&self) -> &'static str {
        match self {
            Disposition::Extracted(_) => "[Extracted]",
            Disposition::Discarded(_) => "[Discarded]",
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Disposition::Extracted(text) | Disposition::Discarded(text) => text,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Extracted(summary) => write!(f, "Extracted: {}", summary),
            Disposition::Discarded(reason) => write!(f, "Discarded: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_distinguishes_discard() {
        let discard = Disposition::Discarded("noise".to_string());
        let encoded = discard.encode();
        assert!(encoded.starts_with(DISCARD_MARKER));
        assert_eq!(Disposition::parse(&encoded), discard);
        assert_eq!(
            Disposition::parse("found fn main in src/main.rs"),
            Disposition::Extracted("found fn main in src/main.rs".to_string())
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(Disposition::Extracted("s".into()).label(), "[Extracted]");
        assert_eq!(Disposition::Discarded("r".into()).label(), "[Discarded]");
        assert_eq!(Disposition::Extracted("S".into()).to_string(), "Extracted: S");
    }
}
