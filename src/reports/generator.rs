use super::formatters::{JsonFormatter, MarkdownFormatter, ReportFormatter, TextFormatter};
use crate::error::{Result, ValidationError};
use crate::types::{AgentResult, AggregateReport, ReportSummary};
use chrono::Utc;
use uuid::Uuid;

/// Builds the aggregate report and renders it in the supported output formats
pub struct ReportGenerator;

impl ReportGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Combine every agent's result into the single aggregate.
    ///
    /// `total_agents` is the number of configured descriptors, which may exceed the number
    /// of agents that produced turns.
    pub fn aggregate(&self, total_agents: usize, all_results: Vec<AgentResult>) -> AggregateReport {
        let summary = Self::summarize(&all_results);

        AggregateReport {
            run_id: Uuid::new_v4(),
            total_agents,
            completion_time: Utc::now(),
            all_results,
            summary,
        }
    }

    pub fn summarize(results: &[AgentResult]) -> ReportSummary {
        ReportSummary {
            total_analyses: results.iter().map(|r| r.turns.len()).sum(),
            agents_completed: results.iter().filter(|r| r.is_completed()).count(),
            critical_issues: results.iter().map(|r| r.critical_turns()).sum(),
            failed_turns: results.iter().map(|r| r.failed_turns()).sum(),
        }
    }

    /// Render the report in the specified format
    pub fn generate(&self, report: &AggregateReport, format: &str) -> Result<String> {
        match format.to_lowercase().as_str() {
            "json" => JsonFormatter.format(report),
            "markdown" | "md" => MarkdownFormatter.format(report),
            "text" => TextFormatter.format(report),
            _ => Err(ValidationError::Config(format!(
                "unsupported format: {}",
                format
            ))),
        }
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AgentDescriptor, ConversationTurn};

    fn result_with(id: u32, responses: &[Option<&str>]) -> AgentResult {
        let descriptor = AgentDescriptor::new(id, format!("Task {}", id), "focus");
        let turns = responses
            .iter()
            .map(|response| match response {
                Some(text) => ConversationTurn::success("prompt", text.to_string()),
                None => ConversationTurn::failure(
                    "prompt",
                    &ValidationError::Transport("down".to_string()),
                ),
            })
            .collect();
        AgentResult::new(&descriptor, turns)
    }

    #[test]
    fn test_summary_counts() {
        let results = vec![
            result_with(1, &[Some("ok"), Some("ok"), Some("ok")]),
            result_with(2, &[Some("ok"), None, Some("CRITICAL: missing auth")]),
            result_with(3, &[]),
        ];

        let summary = ReportGenerator::summarize(&results);
        assert_eq!(summary.total_analyses, 6);
        assert_eq!(summary.agents_completed, 2);
        assert_eq!(summary.critical_issues, 1);
        assert_eq!(summary.failed_turns, 1);
    }

    #[test]
    fn test_lowercase_critical_is_not_counted() {
        let results = vec![result_with(
            1,
            &[Some("a critical gap"), Some("Critical path"), Some("fine")],
        )];
        assert_eq!(ReportGenerator::summarize(&results).critical_issues, 0);
    }

    #[test]
    fn test_critical_counted_per_turn_not_per_occurrence() {
        let results = vec![result_with(1, &[Some("CRITICAL: a\nCRITICAL: b")])];
        assert_eq!(ReportGenerator::summarize(&results).critical_issues, 1);
    }

    #[test]
    fn test_total_agents_is_independent_of_completion() {
        let generator = ReportGenerator::new();
        let report = generator.aggregate(3, vec![result_with(1, &[Some("ok")])]);

        assert_eq!(report.total_agents, 3);
        assert_eq!(report.summary.agents_completed, 1);
    }

    #[test]
    fn test_generate_formats() {
        let generator = ReportGenerator::new();
        let report = generator.aggregate(1, vec![result_with(7, &[Some("CRITICAL: x")])]);

        let json = generator.generate(&report, "json").unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["criticalIssues"], 1);

        let markdown = generator.generate(&report, "Markdown").unwrap();
        assert!(markdown.contains("**Critical Issues**: 1"));
        assert!(markdown.contains("| 7 | Task 7 | 1 | 0 | 1 |"));

        let text = generator.generate(&report, "text").unwrap();
        assert!(text.contains("- agent 7 (Task 7): 1 turns, 0 failed, 1 critical"));

        assert!(generator.generate(&report, "xml").is_err());
    }
}
