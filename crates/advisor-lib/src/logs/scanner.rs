//! Single-pass log scanning
//!
//! Lines are consumed one at a time from any iterator; only per-pattern
//! counters are retained, so memory does not grow with the input.

use super::LogPattern;
use crate::config::{AnalysisConfig, DEFAULT_TOP_SIGNATURES};
use crate::error::ValidationError;
use crate::models::{ErrorSignature, LogSummary};

/// Reusable scanner over a compiled pattern set
#[derive(Debug, Clone)]
pub struct LogScanner {
    patterns: Vec<LogPattern>,
    top_limit: usize,
}

impl LogScanner {
    pub fn new(patterns: Vec<LogPattern>) -> Self {
        Self {
            patterns,
            top_limit: DEFAULT_TOP_SIGNATURES,
        }
    }

    pub fn with_top_limit(mut self, top_limit: usize) -> Self {
        self.top_limit = top_limit;
        self
    }

    /// Compile the configured patterns
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, ValidationError> {
        let patterns = LogPattern::compile_all(&config.log_error_patterns)?;
        Ok(Self::new(patterns).with_top_limit(config.top_signatures_limit))
    }

    pub fn scan<I, S>(&self, lines: I) -> LogSummary
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        scan_lines(lines, &self.patterns, self.top_limit)
    }
}

fn scan_lines<I, S>(lines: I, patterns: &[LogPattern], top_limit: usize) -> LogSummary
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts = vec![0u64; patterns.len()];
    let mut summary = LogSummary::default();

    for line in lines {
        let line = line.as_ref();
        summary.total_count += 1;

        let mut error_line = false;
        let mut warning_line = false;
        for (pattern, count) in patterns.iter().zip(counts.iter_mut()) {
            if pattern.matcher.is_match(line) {
                *count += 1;
                if pattern.is_error() {
                    error_line = true;
                } else {
                    warning_line = true;
                }
            }
        }

        if error_line {
            summary.error_count += 1;
        }
        if warning_line {
            summary.warning_count += 1;
        }
    }

    let mut signatures: Vec<ErrorSignature> = patterns
        .iter()
        .zip(counts)
        .filter(|(pattern, count)| pattern.is_error() && *count > 0)
        .map(|(pattern, count)| ErrorSignature::new(pattern.name.clone(), count))
        .collect();
    signatures.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.pattern.cmp(&b.pattern)));
    signatures.truncate(top_limit);
    summary.top_error_signatures = signatures;

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PatternKind;

    fn scenario_patterns() -> Vec<LogPattern> {
        vec![
            LogPattern::substring("OutOfMemory", "OutOfMemory"),
            LogPattern::substring("ConnectionTimeout", "ConnectionTimeout"),
        ]
    }

    #[test]
    fn test_scenario_tie_broken_alphabetically() {
        let lines = ["INFO ok", "ERROR OutOfMemory: heap", "ERROR ConnectionTimeout"];
        let summary = LogScanner::new(scenario_patterns()).scan(lines);

        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.error_count, 2);
        assert_eq!(
            summary.top_error_signatures,
            vec![
                ErrorSignature::new("ConnectionTimeout", 1),
                ErrorSignature::new("OutOfMemory", 1),
            ]
        );
    }

    #[test]
    fn test_empty_input() {
        let summary = LogScanner::new(scenario_patterns()).scan(Vec::<String>::new());
        assert_eq!(summary, LogSummary::default());
    }

    #[test]
    fn test_line_matching_several_patterns_counts_once() {
        let patterns = vec![
            LogPattern::substring("OutOfMemory", "OutOfMemory"),
            LogPattern::substring("Heap", "heap"),
        ];
        let summary = LogScanner::new(patterns).scan(["OutOfMemory: heap exhausted"]);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.top_error_signatures.len(), 2);
    }

    #[test]
    fn test_descending_order_and_cap() {
        let patterns = vec![
            LogPattern::substring("a", "a"),
            LogPattern::substring("b", "b"),
            LogPattern::substring("c", "c"),
        ];
        let lines = ["b", "b", "c", "a", "c", "c"];
        let summary = LogScanner::new(patterns).with_top_limit(2).scan(lines);
        assert_eq!(
            summary.top_error_signatures,
            vec![ErrorSignature::new("c", 3), ErrorSignature::new("b", 2)]
        );
    }

    #[test]
    fn test_warning_patterns_are_not_error_signatures() {
        let patterns = vec![
            LogPattern::substring("Error", "ERROR"),
            LogPattern::substring("Warn", "WARN").with_kind(PatternKind::Warning),
        ];
        let summary = LogScanner::new(patterns).scan(["WARN slow", "ERROR boom", "WARN again"]);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.warning_count, 2);
        assert_eq!(summary.top_error_signatures, vec![ErrorSignature::new("Error", 1)]);
    }

    #[test]
    fn test_lazy_iterator_input() {
        let lines = (0..10_000).map(|i| {
            if i % 100 == 0 {
                format!("{} ERROR OutOfMemory", i)
            } else {
                format!("{} INFO request served", i)
            }
        });
        let summary = LogScanner::new(scenario_patterns()).scan(lines);
        assert_eq!(summary.total_count, 10_000);
        assert_eq!(summary.error_count, 100);
        assert_eq!(summary.top_error_signatures, vec![ErrorSignature::new("OutOfMemory", 100)]);
    }

    #[test]
    fn test_from_default_config() {
        let scanner = LogScanner::from_config(&AnalysisConfig::default()).unwrap();
        let summary = scanner.scan([
            "2024-05-08 ERROR java.lang.OutOfMemoryError: Java heap space",
            "WARNING pool nearly exhausted",
            "GET /health 200",
        ]);
        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.warning_count, 1);
        assert!(summary
            .top_error_signatures
            .iter()
            .any(|s| s.pattern == "OutOfMemory"));
    }
}
