use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Core types for the multi-agent validation run

/// Substring that marks a reviewer response as reporting a critical issue.
/// Case-sensitive; this is a heuristic, not a parser.
pub const CRITICAL_MARKER: &str = "CRITICAL";

const PROMPT_SUMMARY_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: u32,
    pub task: String,
    pub focus: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    pub prompt_summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    pub agent_id: u32,
    pub task: String,
    pub turns: Vec<ConversationTurn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_analyses: usize,
    pub agents_completed: usize,
    pub critical_issues: usize,
    pub failed_turns: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    pub run_id: Uuid,
    pub total_agents: usize,
    pub completion_time: DateTime<Utc>,
    pub all_results: Vec<AgentResult>,
    pub summary: ReportSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    AgentStarted,
    TurnCompleted,
    TurnFailed,
    AgentFinished,
    ReportPersistFailed,
}

/// Progress notification published on the communication bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub agent_id: u32,
    pub task: String,
    pub kind: EventKind,
    pub detail: String,
}

impl AgentDescriptor {
    pub fn new(id: u32, task: impl Into<String>, focus: impl Into<String>) -> Self {
        Self {
            id,
            task: task.into(),
            focus: focus.into(),
        }
    }
}

/// Lowercase text with every run of non-alphanumerics collapsed to `_`
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('_') {
            slug.push('_');
        }
    }
    while slug.ends_with('_') {
        slug.pop();
    }
    if slug.is_empty() {
        slug.push_str("agent");
    }
    slug
}

impl ConversationTurn {
    pub fn success(prompt: &str, response: String) -> Self {
        Self {
            prompt_summary: summarize_prompt(prompt),
            response: Some(response),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(prompt: &str, error: &ValidationError) -> Self {
        Self {
            prompt_summary: summarize_prompt(prompt),
            response: None,
            error: Some(error.to_string()),
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.response.is_some()
    }

    pub fn is_critical(&self) -> bool {
        self.response
            .as_deref()
            .map_or(false, |text| text.contains(CRITICAL_MARKER))
    }
}

impl AgentResult {
    pub fn new(descriptor: &AgentDescriptor, turns: Vec<ConversationTurn>) -> Self {
        Self {
            agent_id: descriptor.id,
            task: descriptor.task.clone(),
            turns,
        }
    }

    /// Result recorded for an agent that failed before producing any turn
    pub fn empty(descriptor: &AgentDescriptor) -> Self {
        Self::new(descriptor, Vec::new())
    }

    pub fn is_completed(&self) -> bool {
        !self.turns.is_empty()
    }

    pub fn failed_turns(&self) -> usize {
        self.turns.iter().filter(|turn| !turn.is_success()).count()
    }

    pub fn critical_turns(&self) -> usize {
        self.turns.iter().filter(|turn| turn.is_critical()).count()
    }
}

impl AggregateReport {
    pub fn has_critical_issues(&self) -> bool {
        self.summary.critical_issues > 0
    }
}

impl AgentEvent {
    pub fn new(descriptor: &AgentDescriptor, kind: EventKind, detail: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            agent_id: descriptor.id,
            task: descriptor.task.clone(),
            kind,
            detail: detail.into(),
        }
    }

    /// Human-readable line for the console progress stream
    pub fn progress_line(&self) -> String {
        let label = match self.kind {
            EventKind::AgentStarted => "started",
            EventKind::TurnCompleted => "turn ok",
            EventKind::TurnFailed => "turn failed",
            EventKind::AgentFinished => "finished",
            EventKind::ReportPersistFailed => "report not saved",
        };
        if self.detail.is_empty() {
            format!("[agent {}] {} - {}", self.agent_id, self.task, label)
        } else {
            format!(
                "[agent {}] {} - {}: {}",
                self.agent_id, self.task, label, self.detail
            )
        }
    }
}

fn summarize_prompt(prompt: &str) -> String {
    let trimmed = prompt.trim();
    match trimmed.char_indices().nth(PROMPT_SUMMARY_CHARS) {
        Some((cut, _)) => format!("{}...", &trimmed[..cut]),
        None => trimmed.to_string(),
    }
}
