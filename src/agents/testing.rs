//! Scripted review service shared by the agent and orchestrator tests.

use crate::error::{Result, ValidationError};
use crate::llm::ReviewService;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub(crate) enum Reply {
    Text(String),
    Fail(ValidationError),
    Panic,
    Hang,
}

type Script = dyn Fn(u32, usize) -> Reply + Send + Sync;

/// Answers each prompt according to `(agent_id, call_number)`, call numbers starting at 1
pub(crate) struct ScriptedReviewService {
    script: Box<Script>,
    calls: Mutex<HashMap<u32, usize>>,
    total_calls: AtomicUsize,
}

impl ScriptedReviewService {
    pub(crate) fn new<F>(script: F) -> Self
    where
        F: Fn(u32, usize) -> Reply + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            calls: Mutex::new(HashMap::new()),
            total_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls_for(&self, agent_id: u32) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(&agent_id)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }
}

/// Every rendered prompt names its agent as `agent #<id>`; a prompt without it is a broken template
fn agent_id_from(prompt: &str) -> u32 {
    prompt
        .split("agent #")
        .nth(1)
        .map(|rest| {
            rest.chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
        })
        .and_then(|digits| digits.parse().ok())
        .unwrap_or_else(|| panic!("prompt does not name its agent: {:?}", prompt))
}

#[async_trait]
impl ReviewService for ScriptedReviewService {
    async fn review(&self, prompt: &str) -> Result<String> {
        let agent_id = agent_id_from(prompt);
        let call = {
            let mut calls = self.calls.lock().unwrap();
            let counter = calls.entry(agent_id).or_insert(0);
            *counter += 1;
            *counter
        };
        self.total_calls.fetch_add(1, Ordering::SeqCst);

        match (self.script)(agent_id, call) {
            Reply::Text(text) => Ok(text),
            Reply::Fail(err) => Err(err),
            Reply::Panic => panic!("scripted panic for agent {}", agent_id),
            Reply::Hang => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::AgentPrompts;
    use crate::types::AgentDescriptor;

    #[test]
    fn test_every_rendered_prompt_names_its_agent() {
        let prompts = AgentPrompts::new("checkout service");
        let descriptor = AgentDescriptor::new(42, "Security Review", "auth");
        for template in prompts.sequence() {
            let prompt = prompts.build_prompt(template, &descriptor);
            assert_eq!(agent_id_from(&prompt), 42);
        }
    }

    #[test]
    #[should_panic(expected = "does not name its agent")]
    fn test_prompt_without_agent_marker_panics() {
        agent_id_from("review the deployment manifests");
    }
}
