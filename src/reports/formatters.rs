use crate::error::Result;
use crate::types::AggregateReport;

/// Trait for aggregate report formatters
pub trait ReportFormatter {
    fn format(&self, report: &AggregateReport) -> Result<String>;
}

/// JSON formatter
pub struct JsonFormatter;

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &AggregateReport) -> Result<String> {
        Ok(serde_json::to_string_pretty(report)?)
    }
}

/// Markdown formatter
pub struct MarkdownFormatter;

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &AggregateReport) -> Result<String> {
        let mut agents = String::new();
        for result in &report.all_results {
            agents.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                result.agent_id,
                result.task,
                result.turns.len(),
                result.failed_turns(),
                result.critical_turns()
            ));
        }

        Ok(format!(
            r#"# Validation Report

**Run**: {}
**Agents**: {}
**Completed at**: {}

## Summary
- **Total Analyses**: {}
- **Agents Completed**: {}
- **Critical Issues**: {}
- **Failed Turns**: {}

## Agents
| ID | Task | Turns | Failed | Critical |
|----|------|-------|--------|----------|
{}"#,
            report.run_id,
            report.total_agents,
            report.completion_time.format("%Y-%m-%d %H:%M:%S UTC"),
            report.summary.total_analyses,
            report.summary.agents_completed,
            report.summary.critical_issues,
            report.summary.failed_turns,
            agents
        ))
    }
}

/// Plain text formatter
pub struct TextFormatter;

impl ReportFormatter for TextFormatter {
    fn format(&self, report: &AggregateReport) -> Result<String> {
        let agents = report
            .all_results
            .iter()
            .map(|result| {
                format!(
                    "- agent {} ({}): {} turns, {} failed, {} critical",
                    result.agent_id,
                    result.task,
                    result.turns.len(),
                    result.failed_turns(),
                    result.critical_turns()
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(format!(
            r#"Validation Report
=================

Run: {}
Agents: {}
Total Analyses: {}
Agents Completed: {}
Critical Issues: {}
Failed Turns: {}

{}

Completed at: {}
"#,
            report.run_id,
            report.total_agents,
            report.summary.total_analyses,
            report.summary.agents_completed,
            report.summary.critical_issues,
            report.summary.failed_turns,
            agents,
            report.completion_time.format("%Y-%m-%d %H:%M:%S UTC")
        ))
    }
}
