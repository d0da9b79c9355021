//! Quality validation models.

use serde::{Deserialize, Serialize};

/// Issue severity, driving the score deduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Score deduction for this severity.
    pub fn deduction(self) -> i32 {
        match self {
            Self::High => 30,
            Self::Medium => 15,
            Self::Low => 5,
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub kind: String,
    pub severity: Severity,
    pub detail: String,
}

/// The result of `QualityValidator::validate`, and the aggregate attached
/// to a task at the orchestrator's validate step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub score: i32,
    pub passed: bool,
    pub issues: Vec<ValidationIssue>,
    pub critiques: Vec<serde_json::Value>,
    pub scores: Vec<f32>,
    pub summary: String,
    pub validator: String,
    pub supervisor_id: Option<String>,
}

impl ValidationResult {
    /// Score starts at 100; passes iff no high-severity issue and
    /// `score >= 50`.
    pub fn from_issues(issues: Vec<ValidationIssue>) -> Self {
        let mut score: i32 = 100;
        for issue in &issues {
            score -= issue.severity.deduction();
        }
        score = score.max(0);
        let has_high = issues.iter().any(|i| i.severity == Severity::High);
        let passed = !has_high && score >= 50;
        Self {
            score,
            passed,
            issues,
            critiques: Vec::new(),
            scores: Vec::new(),
            summary: String::new(),
            validator: "quality_validator".to_string(),
            supervisor_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_issues_passes_with_full_score() {
        let result = ValidationResult::from_issues(vec![]);
        assert_eq!(result.score, 100);
        assert!(result.passed);
    }

    #[test]
    fn single_high_severity_fails_regardless_of_score() {
        let result = ValidationResult::from_issues(vec![ValidationIssue {
            kind: "too_short".into(),
            severity: Severity::High,
            detail: "below minimum word count".into(),
        }]);
        assert_eq!(result.score, 70);
        assert!(!result.passed);
    }

    #[test]
    fn accumulated_low_severity_can_fail_on_score_alone() {
        let issues = (0..11)
            .map(|_| ValidationIssue {
                kind: "shallow".into(),
                severity: Severity::Low,
                detail: "generic phrase".into(),
            })
            .collect();
        let result = ValidationResult::from_issues(issues);
        assert!(result.score < 50);
        assert!(!result.passed);
    }
}
