//! Include/exclude path admission filter (spec §4.3, §8 "Include/exclude").
use regex::RegexBuilder;

/// One include or exclude pattern: a literal path prefix, or — when marked
/// with `regexp:`/`regexpIgnoreCase:` — a compiled regular expression
/// evaluated single-line, so embedded CR/LF/CRLF/NEL/LS/PS bytes in a path
/// never split it across an anchor boundary (spec §4.3, §8 "Line
/// separators in paths").
enum Pattern {
    Prefix(String),
    Regex(regex::Regex),
}

impl Pattern {
    fn parse(raw: &str) -> Result<Self, regex::Error> {
        if let Some(pattern) = raw.strip_prefix("regexpIgnoreCase:") {
            return Ok(Self::Regex(compile(pattern, true)?));
        }
        if let Some(pattern) = raw.strip_prefix("regexp:") {
            return Ok(Self::Regex(compile(pattern, false)?));
        }
        Ok(Self::Prefix(raw.to_string()))
    }

    fn is_match(&self, path: &str) -> bool {
        match self {
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()),
            Self::Regex(re) => re.is_match(path),
        }
    }
}

/// `multi_line(false)` (the default) keeps `^`/`$` anchored to the whole
/// string rather than per embedded-newline segment; `dot_matches_new_line(true)`
/// makes `.` span one too, so a pattern like `^/root/.*$` still matches a
/// path with an embedded CR/LF/CRLF in it instead of stopping dead at the
/// first one. Together these are the "single line" requirement from spec
/// §4.3 — callers never need to worry about NEL/LS/PS either, since the
/// regex crate has no multi-line concept of them in the first place.
fn compile(pattern: &str, case_insensitive: bool) -> Result<regex::Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .multi_line(false)
        .dot_matches_new_line(true)
        .build()
}

/// Constructed from two ordered lists of patterns (spec §4.3). A path is
/// accepted iff at least one include pattern matches and no exclude
/// pattern matches.
pub struct Matcher {
    includes: Vec<Pattern>,
    excludes: Vec<Pattern>,
}

#[derive(Debug, thiserror::Error)]
#[error("invalid include/exclude pattern: {0}")]
pub struct MatcherError(#[from] regex::Error);

impl Matcher {
    pub fn new(includes: &[String], excludes: &[String]) -> Result<Self, MatcherError> {
        Ok(Self {
            includes: includes
                .iter()
                .map(|p| Pattern::parse(p))
                .collect::<Result<_, _>>()?,
            excludes: excludes
                .iter()
                .map(|p| Pattern::parse(p))
                .collect::<Result<_, _>>()?,
        })
    }

    #[must_use]
    pub fn is_accepted(&self, path: &str) -> bool {
        self.includes.iter().any(|p| p.is_match(path))
            && !self.excludes.iter().any(|p| p.is_match(path))
    }
}
