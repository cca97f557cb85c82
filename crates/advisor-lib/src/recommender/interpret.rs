//! Interpretation of free-text model output
//!
//! The first balanced `{...}` span is decoded as JSON and validated against
//! the response schema. Anything that does not survive decoding and
//! validation is routed to the rule-based classifier, so interpretation
//! always yields a well-formed record.

use super::classify::{Classification, Classifier, Finding};
use crate::error::InterpretationFallback;
use crate::models::{
    LogSummary, MetricsSummary, Priority, RecommendationRecord, RecommendationSource,
    ScalingAction, ServiceHealth, ServiceKey, SuggestedCapacity,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

/// Identity and side information for one interpretation
#[derive(Debug, Clone)]
pub struct InterpretContext {
    pub key: ServiceKey,
    /// Log summary used to enrich fallback recommendations
    pub logs: Option<LogSummary>,
    /// Timestamp stamped on the record; supplied by the caller so output is reproducible
    pub generated_at: DateTime<Utc>,
}

impl InterpretContext {
    pub fn new(key: ServiceKey, generated_at: DateTime<Utc>) -> Self {
        Self {
            key,
            logs: None,
            generated_at,
        }
    }

    pub fn with_logs(mut self, logs: LogSummary) -> Self {
        self.logs = Some(logs);
        self
    }
}

/// A validated model answer
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRecommendation {
    pub service_health: ServiceHealth,
    pub scaling_action: ScalingAction,
    pub priority: Priority,
    pub reason: String,
    pub recommendations: Vec<String>,
    pub suggested_capacity: Option<SuggestedCapacity>,
}

/// Record plus how it was obtained
#[derive(Debug, Clone)]
pub struct Interpretation {
    pub record: RecommendationRecord,
    /// Set when the fallback path produced the record
    pub fallback: Option<InterpretationFallback>,
    /// Whether the record's triple matches the rule-based classification
    pub agrees_with_rules: bool,
}

/// Locate the first balanced brace span, ignoring braces inside string literals
pub fn extract_first_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn invalid(message: impl Into<String>) -> InterpretationFallback {
    InterpretationFallback::Invalid(message.into())
}

fn required_enum<T>(obj: &Map<String, Value>, field: &str) -> Result<T, InterpretationFallback>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match obj.get(field) {
        Some(Value::String(s)) => s.parse::<T>().map_err(|e| invalid(e.to_string())),
        Some(other) => Err(invalid(format!("{} must be a string, got {}", field, other))),
        None => Err(invalid(format!("missing required field {}", field))),
    }
}

fn string_list(obj: &Map<String, Value>, field: &str) -> Result<Vec<String>, InterpretationFallback> {
    match obj.get(field) {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(invalid(format!("{} must contain only strings, got {}", field, other))),
            })
            .collect(),
        Some(other) => Err(invalid(format!("{} must be an array, got {}", field, other))),
        None => Err(invalid(format!("missing required field {}", field))),
    }
}

fn non_negative(field: &str, value: &Value) -> Result<Option<f64>, InterpretationFallback> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v.is_finite() && v >= 0.0 => Ok(Some(v)),
            _ => Err(invalid(format!(
                "suggested_capacity.{} must be non-negative, got {}",
                field, n
            ))),
        },
        other => Err(invalid(format!(
            "suggested_capacity.{} must be a number, got {}",
            field, other
        ))),
    }
}

/// First of `names` present in `obj`; "cpu"/"memory" are the legacy spellings
fn member<'a>(
    obj: &'a Map<String, Value>,
    names: &[&'static str],
) -> Option<(&'static str, &'a Value)> {
    names.iter().find_map(|n| obj.get(*n).map(|v| (*n, v)))
}

fn capacity(value: Option<&Value>) -> Result<Option<SuggestedCapacity>, InterpretationFallback> {
    let obj = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Object(obj)) => obj,
        Some(other) => {
            return Err(invalid(format!(
                "suggested_capacity must be an object, got {}",
                other
            )))
        }
    };

    let desired_count = match member(obj, &["desired_count"]) {
        Some((name, v)) => match non_negative(name, v)? {
            Some(count) if count.fract() == 0.0 && count <= f64::from(u32::MAX) => {
                Some(count as u32)
            }
            Some(count) => {
                return Err(invalid(format!(
                    "suggested_capacity.desired_count must be a whole number, got {}",
                    count
                )))
            }
            None => None,
        },
        None => None,
    };
    let cpu_units = match member(obj, &["cpu_units", "cpu"]) {
        Some((name, v)) => non_negative(name, v)?,
        None => None,
    };
    let memory_mb = match member(obj, &["memory_mb", "memory"]) {
        Some((name, v)) => non_negative(name, v)?,
        None => None,
    };

    Ok(Some(SuggestedCapacity {
        desired_count,
        cpu_units,
        memory_mb,
    }))
}

/// Decode and validate one model answer
///
/// `service_health: "error"` is rejected: that value marks missing metrics
/// and only the rule-based path produces it.
pub fn decode_response(raw_text: &str) -> Result<ModelRecommendation, InterpretationFallback> {
    let span = extract_first_object(raw_text).ok_or(InterpretationFallback::NoStructuredObject)?;
    let value: Value =
        serde_json::from_str(span).map_err(|e| InterpretationFallback::Decode(e.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| InterpretationFallback::Decode("top-level value is not an object".into()))?;

    let reason = match obj.get("reason") {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => return Err(invalid(format!("reason must be a string, got {}", other))),
    };

    let service_health: ServiceHealth = required_enum(obj, "service_health")?;
    if service_health == ServiceHealth::Error {
        return Err(invalid(
            "service_health 'error' is reserved for rule-based analysis",
        ));
    }

    Ok(ModelRecommendation {
        service_health,
        scaling_action: required_enum(obj, "scaling_action")?,
        priority: required_enum(obj, "priority")?,
        reason,
        recommendations: string_list(obj, "recommendations")?,
        suggested_capacity: capacity(obj.get("suggested_capacity"))?,
    })
}

/// Turns model text into records, falling back to the classifier
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    classifier: Classifier,
}

impl Interpreter {
    pub fn new(classifier: Classifier) -> Self {
        Self { classifier }
    }

    /// Never fails: malformed text yields a fallback record
    pub fn interpret(
        &self,
        raw_text: &str,
        summary: &MetricsSummary,
        ctx: &InterpretContext,
    ) -> RecommendationRecord {
        self.interpret_detailed(raw_text, summary, ctx).record
    }

    pub fn interpret_detailed(
        &self,
        raw_text: &str,
        summary: &MetricsSummary,
        ctx: &InterpretContext,
    ) -> Interpretation {
        let classification = self.classifier.classify(summary);

        match decode_response(raw_text) {
            Ok(answer) => {
                let agrees = answer_matches(&answer, &classification);
                if !agrees {
                    debug!(
                        service = %ctx.key,
                        model_health = %answer.service_health,
                        rule_health = %classification.service_health,
                        model_action = %answer.scaling_action,
                        rule_action = %classification.scaling_action,
                        "Model recommendation differs from rule-based classification"
                    );
                }
                Interpretation {
                    record: RecommendationRecord {
                        key: ctx.key.clone(),
                        service_health: answer.service_health,
                        scaling_action: answer.scaling_action,
                        priority: answer.priority,
                        reason: answer.reason,
                        recommendations: answer.recommendations,
                        suggested_capacity: answer.suggested_capacity,
                        generated_at: ctx.generated_at,
                        source: RecommendationSource::Ai,
                    },
                    fallback: None,
                    agrees_with_rules: agrees,
                }
            }
            Err(cause) => {
                debug!(service = %ctx.key, cause = %cause, "Falling back to rule-based classification");
                Interpretation {
                    record: self.build_fallback(summary, ctx, &cause, classification),
                    fallback: Some(cause),
                    agrees_with_rules: true,
                }
            }
        }
    }

    /// Rule-based record for when the model output is unusable or the call failed
    pub fn fallback(
        &self,
        summary: &MetricsSummary,
        ctx: &InterpretContext,
        cause: &InterpretationFallback,
    ) -> RecommendationRecord {
        let classification = self.classifier.classify(summary);
        self.build_fallback(summary, ctx, cause, classification)
    }

    fn build_fallback(
        &self,
        summary: &MetricsSummary,
        ctx: &InterpretContext,
        cause: &InterpretationFallback,
        classification: Classification,
    ) -> RecommendationRecord {
        let findings = self.classifier.findings(summary);

        let mut reason = classification.rule.describe().to_string();
        if !findings.is_empty() {
            let observed: Vec<String> = findings.iter().map(Finding::to_string).collect();
            reason.push_str(": ");
            reason.push_str(&observed.join("; "));
        }
        reason.push_str(&format!(". Rule-based analysis was used because {}.", cause));

        let mut recommendations: Vec<String> = Vec::new();
        for finding in &findings {
            let item = finding.recommendation();
            if !recommendations.contains(&item) {
                recommendations.push(item);
            }
        }
        if let Some(logs) = &ctx.logs {
            for signature in &logs.top_error_signatures {
                recommendations.push(format!(
                    "Investigate {} log lines matching {}",
                    signature.count, signature.pattern
                ));
            }
        }
        if recommendations.is_empty() {
            recommendations.push("Service appears healthy - no action needed".to_string());
        }

        RecommendationRecord {
            key: ctx.key.clone(),
            service_health: classification.service_health,
            scaling_action: classification.scaling_action,
            priority: classification.priority,
            reason,
            recommendations,
            suggested_capacity: mechanical_capacity(summary, classification.scaling_action),
            generated_at: ctx.generated_at,
            source: RecommendationSource::Fallback,
        }
    }
}

fn answer_matches(answer: &ModelRecommendation, classification: &Classification) -> bool {
    (answer.service_health, answer.scaling_action, answer.priority) == classification.triple()
}

/// One task up or down from the current desired count
fn mechanical_capacity(summary: &MetricsSummary, action: ScalingAction) -> Option<SuggestedCapacity> {
    let desired = summary.desired_count?;
    let target = match action {
        ScalingAction::ScaleUp => desired.saturating_add(1),
        ScalingAction::ScaleDown if desired > 1 => desired - 1,
        _ => return None,
    };
    Some(SuggestedCapacity {
        desired_count: Some(target),
        cpu_units: None,
        memory_mb: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ErrorSignature;
    use chrono::TimeZone;

    fn ctx() -> InterpretContext {
        InterpretContext::new(
            ServiceKey::new("111122223333", "prod", "checkout"),
            Utc.with_ymd_and_hms(2024, 5, 8, 12, 0, 0).unwrap(),
        )
    }

    fn busy_summary() -> MetricsSummary {
        MetricsSummary {
            cpu_avg: Some(85.0),
            cpu_max: Some(92.0),
            memory_avg: Some(60.0),
            desired_count: Some(2),
            running_count: Some(2),
            ..Default::default()
        }
    }

    const VALID: &str = r#"Here is my analysis:
```json
{
  "service_health": "warning",
  "scaling_action": "scale_up",
  "priority": "high",
  "reason": "CPU is {consistently} above 80% \"under load\".",
  "recommendations": ["Add two tasks", "Raise CPU to 1024 units"],
  "suggested_capacity": {"desired_count": 4, "cpu": 1024, "memory_mb": 2048}
}
```
Let me know if you need more."#;

    #[test]
    fn test_extract_skips_braces_in_strings() {
        let span = extract_first_object(r#"x {"a": "}{", "b": {"c": 1}} trailing }"#).unwrap();
        assert_eq!(span, r#"{"a": "}{", "b": {"c": 1}}"#);
    }

    #[test]
    fn test_extract_handles_escaped_quotes() {
        let span = extract_first_object(r#"{"a": "say \"}\" now"} {"b": 2}"#).unwrap();
        assert_eq!(span, r#"{"a": "say \"}\" now"}"#);
    }

    #[test]
    fn test_extract_unbalanced() {
        assert_eq!(extract_first_object(r#"{"a": {"b": 1}"#), None);
        assert_eq!(extract_first_object("no braces here"), None);
        assert_eq!(extract_first_object(""), None);
    }

    #[test]
    fn test_valid_response_is_ai_sourced() {
        let record = Interpreter::default().interpret(VALID, &busy_summary(), &ctx());
        assert_eq!(record.source, RecommendationSource::Ai);
        assert_eq!(record.reason, "CPU is {consistently} above 80% \"under load\".");
        assert_eq!(record.recommendations.len(), 2);
        assert_eq!(
            record.suggested_capacity,
            Some(SuggestedCapacity {
                desired_count: Some(4),
                cpu_units: Some(1024.0),
                memory_mb: Some(2048.0),
            })
        );
        assert_eq!(record.key.service_name, "checkout");
    }

    #[test]
    fn test_ai_disagreement_is_reported_not_overridden() {
        let text = r#"{"service_health":"good","scaling_action":"no_change","priority":"low","reason":"fine","recommendations":[]}"#;
        let out = Interpreter::default().interpret_detailed(text, &busy_summary(), &ctx());
        assert!(!out.agrees_with_rules);
        assert_eq!(out.record.service_health, ServiceHealth::Good);
        assert_eq!(out.record.source, RecommendationSource::Ai);
    }

    #[test]
    fn test_missing_reason_passes_as_empty() {
        let text = r#"{"service_health":"warning","scaling_action":"scale_up","priority":"medium","recommendations":["a"]}"#;
        let record = Interpreter::default().interpret(text, &busy_summary(), &ctx());
        assert_eq!(record.source, RecommendationSource::Ai);
        assert_eq!(record.reason, "");
    }

    #[test]
    fn test_prose_falls_back() {
        let out = Interpreter::default().interpret_detailed(
            "The service looks busy, scale it up.",
            &busy_summary(),
            &ctx(),
        );
        assert_eq!(out.fallback, Some(InterpretationFallback::NoStructuredObject));
        assert_eq!(out.record.source, RecommendationSource::Fallback);
        assert_eq!(
            out.record.triple(),
            (ServiceHealth::Warning, ScalingAction::ScaleUp, Priority::Medium)
        );
        assert!(out.record.reason.contains("CPU averaged 85.0%"));
        assert!(out.record.reason.contains("no structured object"));
        assert_eq!(
            out.record.suggested_capacity.and_then(|c| c.desired_count),
            Some(3)
        );
    }

    #[test]
    fn test_truncated_json_falls_back() {
        let out = Interpreter::default().interpret_detailed(
            r#"{"service_health": "warning", "scaling_action": "scale_"#,
            &busy_summary(),
            &ctx(),
        );
        assert_eq!(out.record.source, RecommendationSource::Fallback);
        assert!(out.fallback.is_some());
    }

    #[test]
    fn test_invalid_json_inside_braces_is_decode_error() {
        let out = Interpreter::default().interpret_detailed(
            "{service_health: warning}",
            &busy_summary(),
            &ctx(),
        );
        assert!(matches!(out.fallback, Some(InterpretationFallback::Decode(_))));
    }

    #[test]
    fn test_enum_outside_vocabulary_falls_back() {
        let text = r#"{"service_health":"degraded","scaling_action":"scale_up","priority":"high","reason":"x","recommendations":[]}"#;
        let out = Interpreter::default().interpret_detailed(text, &busy_summary(), &ctx());
        match out.fallback {
            Some(InterpretationFallback::Invalid(msg)) => assert!(msg.contains("degraded")),
            other => panic!("unexpected fallback {:?}", other),
        }
    }

    #[test]
    fn test_error_health_from_model_falls_back() {
        let text = r#"{"service_health":"error","scaling_action":"no_change","priority":"low","reason":"no data","recommendations":[]}"#;
        let out = Interpreter::default().interpret_detailed(text, &busy_summary(), &ctx());
        match out.fallback {
            Some(InterpretationFallback::Invalid(msg)) => assert!(msg.contains("reserved")),
            other => panic!("unexpected fallback {:?}", other),
        }
        assert_eq!(out.record.source, RecommendationSource::Fallback);
        assert_eq!(out.record.service_health, ServiceHealth::Warning);
    }

    #[test]
    fn test_capacity_prefers_canonical_keys_over_legacy() {
        let text = r#"{"service_health":"good","scaling_action":"no_change","priority":"low","reason":"x","recommendations":[],"suggested_capacity":{"cpu":256,"cpu_units":512,"memory":1024}}"#;
        let answer = decode_response(text).unwrap();
        assert_eq!(
            answer.suggested_capacity,
            Some(SuggestedCapacity {
                desired_count: None,
                cpu_units: Some(512.0),
                memory_mb: Some(1024.0),
            })
        );
    }

    #[test]
    fn test_non_string_recommendations_fall_back() {
        let text = r#"{"service_health":"good","scaling_action":"no_change","priority":"low","reason":"x","recommendations":[1,2]}"#;
        let out = Interpreter::default().interpret_detailed(text, &busy_summary(), &ctx());
        assert!(matches!(out.fallback, Some(InterpretationFallback::Invalid(_))));
    }

    #[test]
    fn test_negative_capacity_falls_back() {
        let text = r#"{"service_health":"good","scaling_action":"no_change","priority":"low","reason":"x","recommendations":[],"suggested_capacity":{"desired_count":-1}}"#;
        let out = Interpreter::default().interpret_detailed(text, &busy_summary(), &ctx());
        assert!(matches!(out.fallback, Some(InterpretationFallback::Invalid(_))));
    }

    #[test]
    fn test_textual_capacity_falls_back() {
        let text = r#"{"service_health":"good","scaling_action":"no_change","priority":"low","reason":"x","recommendations":[],"suggested_capacity":{"desired_count":"increase by 1-2 tasks"}}"#;
        let out = Interpreter::default().interpret_detailed(text, &busy_summary(), &ctx());
        assert!(matches!(out.fallback, Some(InterpretationFallback::Invalid(_))));
    }

    #[test]
    fn test_fallback_includes_log_signatures() {
        let logs = LogSummary {
            total_count: 50,
            error_count: 7,
            warning_count: 0,
            top_error_signatures: vec![ErrorSignature::new("OutOfMemory", 7)],
        };
        let record = Interpreter::default().interpret("", &busy_summary(), &ctx().with_logs(logs));
        assert!(record
            .recommendations
            .contains(&"Investigate 7 log lines matching OutOfMemory".to_string()));
    }

    #[test]
    fn test_fallback_for_healthy_service() {
        let summary = MetricsSummary {
            cpu_avg: Some(50.0),
            memory_avg: Some(50.0),
            ..Default::default()
        };
        let record = Interpreter::default().interpret("", &summary, &ctx());
        assert_eq!(record.service_health, ServiceHealth::Good);
        assert_eq!(
            record.recommendations,
            vec!["Service appears healthy - no action needed".to_string()]
        );
        assert_eq!(record.suggested_capacity, None);
    }

    #[test]
    fn test_explicit_fallback_for_external_failure() {
        let record = Interpreter::default().fallback(
            &MetricsSummary::default(),
            &ctx(),
            &InterpretationFallback::ModelUnavailable,
        );
        assert_eq!(record.service_health, ServiceHealth::Error);
        assert_eq!(record.source, RecommendationSource::Fallback);
        assert!(record.reason.contains("no text-generation model is configured"));
    }

    #[test]
    fn test_fallback_is_reproducible() {
        let interpreter = Interpreter::default();
        let a = interpreter.interpret("garbage", &busy_summary(), &ctx());
        let b = interpreter.interpret("garbage", &busy_summary(), &ctx());
        assert_eq!(a, b);
    }
}
