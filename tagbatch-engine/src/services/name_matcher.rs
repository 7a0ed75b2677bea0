//! File name → record key matching
//!
//! A file's base name is reduced before matching:
//! 1. Every match of the ignore patterns (combined as alternatives) is removed.
//! 2. Optionally, a two-digit page number is cut from the end. This is a
//!    fixed-width strip: `Name123` becomes `Name1`.
//!
//! The reduced name is then used as a case-sensitive glob prefix (an implicit
//! `*` follows it). Among matching keys the shortest wins and equal lengths
//! fall back to lexicographic order, so the result never depends on the order
//! records were loaded in.

use crate::config::MatchSettings;
use regex::Regex;
use tagbatch_common::{Error, Result};
use tracing::warn;

/// Compiled matching rules
#[derive(Debug, Clone)]
pub struct NameMatcher {
    discard: Option<Regex>,
    ignore_trailing_digits: bool,
}

impl NameMatcher {
    /// Compile matching rules
    ///
    /// Fails with `Error::Config` naming the first malformed pattern. Blank
    /// patterns are ignored.
    pub fn new(ignore_patterns: &[String], ignore_trailing_digits: bool) -> Result<Self> {
        let mut alternatives = Vec::new();

        for pattern in ignore_patterns.iter().filter(|p| !p.trim().is_empty()) {
            Regex::new(pattern).map_err(|e| {
                Error::Config(format!("Invalid ignore pattern '{}': {}", pattern, e))
            })?;
            alternatives.push(format!("(?:{})", pattern));
        }

        let discard = if alternatives.is_empty() {
            None
        } else {
            let combined = alternatives.join("|");
            Some(Regex::new(&combined).map_err(|e| {
                Error::Config(format!("Invalid combined ignore pattern: {}", e))
            })?)
        };

        Ok(Self {
            discard,
            ignore_trailing_digits,
        })
    }

    pub fn from_settings(settings: &MatchSettings) -> Result<Self> {
        Self::new(&settings.ignore_patterns, settings.ignore_trailing_digits)
    }

    /// Reduce a base name to its match prefix
    pub fn strip(&self, base_name: &str) -> String {
        let mut name = match &self.discard {
            Some(re) => re.replace_all(base_name, "").into_owned(),
            None => base_name.to_string(),
        };

        if self.ignore_trailing_digits {
            let len = name.len();
            let bytes = name.as_bytes();
            if len >= 2 && bytes[len - 1].is_ascii_digit() && bytes[len - 2].is_ascii_digit() {
                name.truncate(len - 2);
            }
        }

        name
    }

    /// Best matching candidate for a base name
    pub fn find_match<'a, I>(&self, base_name: &str, candidates: I) -> Option<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let prefix = self.strip(base_name);
        if prefix.is_empty() {
            return None;
        }

        let glob = GlobPrefix::new(&prefix)?;

        candidates
            .into_iter()
            .filter(|key| glob.matches(key))
            .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
    }
}

/// Stripped name used as a glob with an implicit trailing `*`
enum GlobPrefix<'p> {
    Literal(&'p str),
    Pattern(Regex),
}

impl<'p> GlobPrefix<'p> {
    fn new(prefix: &'p str) -> Option<Self> {
        if !prefix.contains(['*', '?']) {
            return Some(GlobPrefix::Literal(prefix));
        }

        let mut pattern = String::from("^");
        for c in prefix.chars() {
            match c {
                '*' => pattern.push_str(".*"),
                '?' => pattern.push('.'),
                other => pattern.push_str(&regex::escape(other.encode_utf8(&mut [0u8; 4]))),
            }
        }

        match Regex::new(&pattern) {
            Ok(re) => Some(GlobPrefix::Pattern(re)),
            Err(e) => {
                warn!(prefix, "Could not build glob for file name: {}", e);
                None
            }
        }
    }

    fn matches(&self, key: &str) -> bool {
        match self {
            GlobPrefix::Literal(prefix) => key.starts_with(prefix),
            GlobPrefix::Pattern(re) => re.is_match(key),
        }
    }
}

/// One-shot form of [`NameMatcher::find_match`]
pub fn match_name<'a, I>(
    file_base_name: &str,
    candidate_keys: I,
    ignore_patterns: &[String],
    ignore_trailing_digits: bool,
) -> Result<Option<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let matcher = NameMatcher::new(ignore_patterns, ignore_trailing_digits)?;
    Ok(matcher
        .find_match(file_base_name, candidate_keys)
        .map(str::to_string))
}
