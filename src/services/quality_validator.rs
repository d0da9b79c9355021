//! Quality Validator: a pure heuristic gate over agent output, wrapping
//! issue detection around [`ValidationResult::from_issues`]'s scoring.

use crate::domain::models::validation::{Severity, ValidationIssue, ValidationResult};

const GENERIC_PHRASES: &[&str] = &[
    "it depends",
    "in conclusion",
    "it is important to note",
    "there are many factors",
    "further research is needed",
    "various aspects",
    "a variety of",
    "in today's world",
    "at the end of the day",
];
const SHALLOW_PHRASE_THRESHOLD: usize = 3;

const RESEARCH_SECTION_MARKERS: &[&str] = &["finding", "source", "method"];
const ANALYSIS_SECTION_MARKERS: &[&str] = &["conclusion", "evidence", "implication"];
const SYNTHESIS_SECTION_MARKERS: &[&str] = &["summary", "recommendation"];

fn min_word_count(task_type: &str) -> usize {
    match task_type {
        "research" => 150,
        "analysis" => 100,
        "synthesis" => 80,
        "coding" => 30,
        "review" => 40,
        _ => 50,
    }
}

fn structural_markers(task_type: &str) -> Option<&'static [&'static str]> {
    match task_type {
        "research" => Some(RESEARCH_SECTION_MARKERS),
        "analysis" => Some(ANALYSIS_SECTION_MARKERS),
        "synthesis" => Some(SYNTHESIS_SECTION_MARKERS),
        _ => None,
    }
}

fn ends_truncated(content: &str) -> bool {
    let trimmed = content.trim_end();
    if trimmed.is_empty() {
        return false;
    }
    trimmed.ends_with("...") || trimmed.ends_with('\u{2026}') || !trimmed.ends_with(['.', '!', '?', '"', '\'', ')'])
}

/// Heuristic content validation. Stateless: every call depends only on
/// its arguments.
pub fn validate(content: &str, task_type: &str, sources_provided: bool) -> ValidationResult {
    let mut issues = Vec::new();
    let lowered = content.to_lowercase();
    let word_count = content.split_whitespace().count();

    let minimum = min_word_count(task_type);
    if word_count < minimum {
        issues.push(ValidationIssue {
            kind: "too_short".to_string(),
            severity: Severity::High,
            detail: format!("{word_count} words, below the {minimum}-word minimum for {task_type} output"),
        });
    }

    if sources_provided && !["http://", "https://", "[1]", "(source", "according to"].iter().any(|marker| lowered.contains(marker)) {
        issues.push(ValidationIssue {
            kind: "insufficient_citations".to_string(),
            severity: Severity::Medium,
            detail: "sources were provided but the output contains no citation markers".to_string(),
        });
    }

    if ends_truncated(content) {
        issues.push(ValidationIssue {
            kind: "truncation".to_string(),
            severity: Severity::Medium,
            detail: "output ends with an ellipsis or without terminating punctuation".to_string(),
        });
    }

    let generic_hits = GENERIC_PHRASES.iter().filter(|phrase| lowered.contains(*phrase)).count();
    if generic_hits >= SHALLOW_PHRASE_THRESHOLD {
        issues.push(ValidationIssue {
            kind: "shallow".to_string(),
            severity: Severity::Low,
            detail: format!("{generic_hits} generic filler phrases detected"),
        });
    }

    if let Some(markers) = structural_markers(task_type) {
        let missing: Vec<&str> = markers.iter().filter(|m| !lowered.contains(**m)).copied().collect();
        if missing.len() == markers.len() {
            issues.push(ValidationIssue {
                kind: "missing_structure".to_string(),
                severity: Severity::Medium,
                detail: format!("no expected section markers found for {task_type} output ({})", markers.join(", ")),
            });
        }
    }

    let mut result = ValidationResult::from_issues(issues);
    result.summary = if result.issues.is_empty() {
        "no issues detected".to_string()
    } else {
        format!("{} issue(s) detected: {}", result.issues.len(), result.issues.iter().map(|i| i.kind.as_str()).collect::<Vec<_>>().join(", "))
    };
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adequate_research_output_passes() {
        let content = format!(
            "{} This section covers our findings and methods in detail, drawing on several sources (source: internal).",
            "word ".repeat(160)
        );
        let result = validate(&content, "research", true);
        assert!(result.passed);
    }

    #[test]
    fn short_output_is_high_severity_too_short() {
        let result = validate("too short", "research", false);
        assert!(result.issues.iter().any(|i| i.kind == "too_short" && i.severity == Severity::High));
        assert!(!result.passed);
    }

    #[test]
    fn missing_citations_when_sources_provided() {
        let content = "word ".repeat(200);
        let result = validate(&content, "analysis", true);
        assert!(result.issues.iter().any(|i| i.kind == "insufficient_citations"));
    }

    #[test]
    fn truncated_ending_is_flagged() {
        let content = format!("{}and then it just trails off...", "word ".repeat(120));
        let result = validate(&content, "synthesis", false);
        assert!(result.issues.iter().any(|i| i.kind == "truncation"));
    }

    #[test]
    fn many_generic_phrases_trigger_shallow() {
        let content = format!(
            "{} It depends on many factors. In conclusion, there are many factors. Various aspects matter. A variety of things happen.",
            "word ".repeat(120)
        );
        let result = validate(&content, "coding", false);
        assert!(result.issues.iter().any(|i| i.kind == "shallow"));
    }

    #[test]
    fn missing_all_structural_markers_for_research() {
        let content = "word ".repeat(160);
        let result = validate(&content, "research", false);
        assert!(result.issues.iter().any(|i| i.kind == "missing_structure"));
    }
}
