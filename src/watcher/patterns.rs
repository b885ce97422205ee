//! Line matching
//!
//! The node has no structured event API, so identity and liveness are read
//! off its free-text log. Matching sits behind [`LineMatcher`] so a
//! structured source can replace the regexes without touching the watcher.

use regex::{Regex, RegexBuilder};

/// Burner announcement carrying the burner address in a JSON fragment
pub const BURNER_PATTERN: &str =
    r#"Using burner wallet.*\{"address":\s*"(0x[0-9a-fA-F]{40})"\s*\}"#;

/// Liveness lines, strongest evidence first
pub const HEARTBEAT_PATTERNS: [&str; 3] = [
    "delegation offer accepted",
    "successfully submitted heartbeat",
    "sending heartbeat",
];

/// A hit on a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch {
    /// Index of the winning pattern in declaration order
    pub pattern_index: usize,
    /// Capture groups of the winning pattern (group 0 excluded)
    pub captures: Vec<Option<String>>,
}

pub trait LineMatcher: Send + Sync {
    fn match_line(&self, line: &str) -> Option<LineMatch>;
}

/// Ordered regex set; the first pattern that matches a line wins
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    pub fn new<I, S>(patterns: I, case_insensitive: bool) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|p| {
                RegexBuilder::new(p.as_ref())
                    .case_insensitive(case_insensitive)
                    .build()
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn burner_announcement() -> Result<Self, regex::Error> {
        Self::new([BURNER_PATTERN], false)
    }

    pub fn heartbeat() -> Result<Self, regex::Error> {
        Self::new(HEARTBEAT_PATTERNS, true)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl LineMatcher for PatternSet {
    fn match_line(&self, line: &str) -> Option<LineMatch> {
        self.patterns
            .iter()
            .enumerate()
            .find_map(|(pattern_index, re)| {
                re.captures(line).map(|caps| LineMatch {
                    pattern_index,
                    captures: caps
                        .iter()
                        .skip(1)
                        .map(|m| m.map(|m| m.as_str().to_string()))
                        .collect(),
                })
            })
    }
}
