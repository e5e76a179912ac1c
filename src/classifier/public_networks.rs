//! Public hotspot name detection
//!
//! A pattern list file holds one `kind:pattern` pair per line, where kind is
//! `simple` (case-insensitive substring) or `regex` (case-insensitive regular
//! expression). Blank lines and `#` comments are ignored.
//!
//! The matcher is built once and then shared read-only; there is no process
//! global. When the list cannot be loaded the built-in defaults are used.

use crate::error::{ScanError, ScanResult};
use log::{debug, error, info};
use regex::{Regex, RegexBuilder};
use std::fs;
use std::path::Path;

/// Built-in patterns used when the pattern list is unavailable
const DEFAULT_PATTERNS: &[(&str, &str)] = &[
    ("simple", "eduroam"),
    ("simple", "citywifi"),
    ("regex", r"(?i)(public|free)[\s_-]?wifi"),
];

/// One compiled matching rule
#[derive(Debug, Clone)]
pub enum NamePattern {
    /// Case-insensitive substring, stored lowercased
    Simple(String),
    /// Case-insensitive regular expression
    Regex(Regex),
}

impl NamePattern {
    /// Parse a `kind:pattern` line
    pub fn parse(line: &str) -> ScanResult<Self> {
        let (kind, pattern) = line.split_once(':').ok_or_else(|| {
            ScanError::PatternLoad(format!("missing pattern kind in line '{}'", line))
        })?;

        match kind {
            "simple" => Ok(NamePattern::Simple(pattern.to_lowercase())),
            "regex" => {
                let compiled = RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ScanError::PatternLoad(format!("bad regex '{}': {}", pattern, e)))?;
                Ok(NamePattern::Regex(compiled))
            }
            other => Err(ScanError::PatternLoad(format!("invalid pattern type: {}", other))),
        }
    }

    pub fn matches(&self, ssid: &str) -> bool {
        match self {
            NamePattern::Simple(needle) => ssid.to_lowercase().contains(needle.as_str()),
            NamePattern::Regex(re) => re.is_match(ssid),
        }
    }
}

/// Flags identifiers that follow known public/open hotspot naming conventions
#[derive(Debug, Clone)]
pub struct PublicNetworkMatcher {
    patterns: Vec<NamePattern>,
    from_defaults: bool,
}

impl PublicNetworkMatcher {
    /// Parse a pattern list. Any malformed line fails the whole load.
    pub fn from_str_list(content: &str) -> ScanResult<Self> {
        let patterns = content
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
            .map(NamePattern::parse)
            .collect::<ScanResult<Vec<_>>>()?;

        Ok(Self {
            patterns,
            from_defaults: false,
        })
    }

    /// Load a pattern list from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> ScanResult<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ScanError::PatternLoad(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_str_list(&content)
    }

    /// The built-in pattern set
    pub fn defaults() -> Self {
        let patterns = DEFAULT_PATTERNS
            .iter()
            .filter_map(|(kind, pattern)| NamePattern::parse(&format!("{}:{}", kind, pattern)).ok())
            .collect();

        Self {
            patterns,
            from_defaults: true,
        }
    }

    /// Load from `path`, falling back to the built-in set on any failure
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_file(path.as_ref()) {
            Ok(matcher) => {
                info!(
                    "Loaded {} public network patterns from {}",
                    matcher.len(),
                    path.as_ref().display()
                );
                matcher
            }
            Err(e) => {
                error!("Error loading public network patterns, using defaults: {}", e);
                Self::defaults()
            }
        }
    }

    /// True when any pattern matches the identifier
    pub fn is_public(&self, ssid: &str) -> bool {
        let hit = self.patterns.iter().any(|p| p.matches(ssid));
        if hit {
            debug!("'{}' looks like a public network", ssid);
        }
        hit
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn uses_defaults(&self) -> bool {
        self.from_defaults
    }
}

impl Default for PublicNetworkMatcher {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_patterns() {
        let matcher = PublicNetworkMatcher::defaults();
        assert!(matcher.uses_defaults());
        assert_eq!(matcher.len(), 3);
        assert!(matcher.is_public("eduroam"));
        assert!(matcher.is_public("CityWiFi-Downtown"));
        assert!(matcher.is_public("Free WiFi"));
        assert!(matcher.is_public("PUBLIC_WIFI"));
        assert!(matcher.is_public("free-wifi"));
        assert!(!matcher.is_public("HomeNetwork"));
    }

    #[test]
    fn test_simple_match_ignores_case() {
        let matcher = PublicNetworkMatcher::from_str_list("simple:Guest\n").unwrap();
        assert!(matcher.is_public("HOTEL-GUEST"));
        assert!(!matcher.is_public("Hotel"));
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let list = "# hotspot names\n\nsimple:hotspot\n   # indented comment\nregex:^airport.*\n";
        let matcher = PublicNetworkMatcher::from_str_list(list).unwrap();
        assert_eq!(matcher.len(), 2);
        assert!(matcher.is_public("Airport_Free"));
        assert!(matcher.is_public("MyHotspot"));
    }

    #[test]
    fn test_unknown_kind_is_load_error() {
        let err = PublicNetworkMatcher::from_str_list("glob:*wifi*\n").unwrap_err();
        assert!(matches!(err, ScanError::PatternLoad(_)));
    }

    #[test]
    fn test_bad_regex_is_load_error() {
        assert!(PublicNetworkMatcher::from_str_list("regex:([unclosed\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "simple:municipal").unwrap();
        let matcher = PublicNetworkMatcher::load_or_default(file.path());
        assert!(!matcher.uses_defaults());
        assert!(matcher.is_public("Municipal Net"));
        assert!(!matcher.is_public("eduroam"));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let matcher = PublicNetworkMatcher::load_or_default("/nonexistent/patterns.txt");
        assert!(matcher.uses_defaults());
        assert!(matcher.is_public("eduroam"));
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "simple:ok").unwrap();
        writeln!(file, "bogus:line").unwrap();
        let matcher = PublicNetworkMatcher::load_or_default(file.path());
        assert!(matcher.uses_defaults());
    }
}
