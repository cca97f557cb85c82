//! Compiled log matchers

use crate::config::{PatternKind, PatternSpec};
use crate::error::ValidationError;
use regex::{Regex, RegexBuilder};
use std::collections::BTreeMap;

/// How a pattern matches a line
#[derive(Debug, Clone)]
pub enum Matcher {
    Substring { needle: String, case_insensitive: bool },
    Regex(Regex),
}

impl Matcher {
    pub fn is_match(&self, line: &str) -> bool {
        match self {
            Matcher::Substring {
                needle,
                case_insensitive: false,
            } => line.contains(needle.as_str()),
            Matcher::Substring {
                needle,
                case_insensitive: true,
            } => contains_ignore_ascii_case(line, needle),
            Matcher::Regex(re) => re.is_match(line),
        }
    }
}

/// Case-insensitive containment without allocating a lowered copy of the line
fn contains_ignore_ascii_case(haystack: &str, needle: &str) -> bool {
    let needle = needle.as_bytes();
    if needle.is_empty() {
        return true;
    }
    haystack
        .as_bytes()
        .windows(needle.len())
        .any(|window| window.eq_ignore_ascii_case(needle))
}

/// A named, compiled log pattern
#[derive(Debug, Clone)]
pub struct LogPattern {
    pub name: String,
    pub kind: PatternKind,
    pub matcher: Matcher,
}

impl LogPattern {
    pub fn substring(name: impl Into<String>, needle: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: PatternKind::Error,
            matcher: Matcher::Substring {
                needle: needle.into(),
                case_insensitive: false,
            },
        }
    }

    pub fn regex(name: impl Into<String>, pattern: &str) -> Result<Self, ValidationError> {
        let name = name.into();
        let re = Regex::new(pattern).map_err(|e| ValidationError::InvalidPattern {
            name: name.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            name,
            kind: PatternKind::Error,
            matcher: Matcher::Regex(re),
        })
    }

    pub fn with_kind(mut self, kind: PatternKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_error(&self) -> bool {
        self.kind == PatternKind::Error
    }

    /// Compile one configured pattern
    pub fn compile(name: &str, spec: &PatternSpec) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidPattern {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let matcher = match (&spec.substring, &spec.regex) {
            (Some(needle), None) => {
                if needle.is_empty() {
                    return Err(invalid("substring must not be empty"));
                }
                Matcher::Substring {
                    needle: needle.clone(),
                    case_insensitive: spec.case_insensitive,
                }
            }
            (None, Some(pattern)) => {
                let re = RegexBuilder::new(pattern)
                    .size_limit(1 << 20)
                    .build()
                    .map_err(|e| invalid(&e.to_string()))?;
                Matcher::Regex(re)
            }
            (Some(_), Some(_)) => return Err(invalid("set either substring or regex, not both")),
            (None, None) => return Err(invalid("one of substring or regex is required")),
        };

        Ok(Self {
            name: name.to_string(),
            kind: spec.kind,
            matcher,
        })
    }

    /// Compile a configured pattern map, ordered by name
    pub fn compile_all(specs: &BTreeMap<String, PatternSpec>) -> Result<Vec<Self>, ValidationError> {
        specs
            .iter()
            .map(|(name, spec)| Self::compile(name, spec))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::default_log_patterns;

    #[test]
    fn test_substring_matching() {
        let p = LogPattern::substring("OutOfMemory", "OutOfMemory");
        assert!(p.matcher.is_match("ERROR OutOfMemory: heap"));
        assert!(!p.matcher.is_match("error outofmemory"));
    }

    #[test]
    fn test_case_insensitive_substring() {
        let spec = PatternSpec::substring("Exception").ignore_case();
        let p = LogPattern::compile("Exception", &spec).unwrap();
        assert!(p.matcher.is_match("java.lang.NullPointerEXCEPTION at"));
        assert!(!p.matcher.is_match("all good"));
    }

    #[test]
    fn test_regex_matching() {
        let p = LogPattern::regex("Timeout", r"(?i)timed? ?out").unwrap();
        assert!(p.matcher.is_match("upstream request TIMED OUT"));
        assert!(p.matcher.is_match("ConnectionTimeout"));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let err = LogPattern::compile("Broken", &PatternSpec::regex("(unclosed")).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPattern { ref name, .. } if name == "Broken"));
    }

    #[test]
    fn test_spec_requires_exactly_one_matcher() {
        assert!(LogPattern::compile("none", &PatternSpec::default()).is_err());
        let both = PatternSpec {
            substring: Some("a".into()),
            regex: Some("b".into()),
            ..Default::default()
        };
        assert!(LogPattern::compile("both", &both).is_err());
        assert!(LogPattern::compile("empty", &PatternSpec::substring("")).is_err());
    }

    #[test]
    fn test_default_patterns_compile() {
        let patterns = LogPattern::compile_all(&default_log_patterns()).unwrap();
        assert_eq!(patterns.len(), default_log_patterns().len());
        let warning = patterns.iter().find(|p| p.name == "Warning").unwrap();
        assert!(!warning.is_error());
    }
}
