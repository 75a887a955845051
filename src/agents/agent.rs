use crate::agents::communication::AgentCommunicationBus;
use crate::llm::{call_with_deadline, AgentPrompts, ReviewService};
use crate::reports::ReportWriter;
use crate::types::*;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Everything an agent borrows from the run it belongs to
#[derive(Clone)]
pub struct AgentContext {
    pub service: Arc<dyn ReviewService>,
    pub prompts: Arc<AgentPrompts>,
    pub writer: Arc<ReportWriter>,
    pub communication_bus: Arc<AgentCommunicationBus>,
    pub call_timeout: Duration,
    pub cancellation: CancellationToken,
}

/// Validation agent - drives the fixed prompt sequence for one descriptor
pub struct ValidationAgent {
    descriptor: AgentDescriptor,
    context: AgentContext,
}

impl ValidationAgent {
    pub fn new(descriptor: AgentDescriptor, context: AgentContext) -> Self {
        Self {
            descriptor,
            context,
        }
    }

    pub fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    /// Run every prompt in order, recording one turn per prompt whatever the outcome,
    /// then persist this agent's report.
    #[instrument(skip(self), fields(agent_id = self.descriptor.id, task = %self.descriptor.task))]
    pub async fn execute(&self) -> AgentResult {
        info!(
            "Agent {} starting: {}",
            self.descriptor.id, self.descriptor.task
        );
        self.publish(EventKind::AgentStarted, String::new()).await;

        let sequence = self.context.prompts.sequence();
        let mut turns = Vec::with_capacity(sequence.len());

        for (index, template) in sequence.iter().enumerate() {
            let prompt = self.context.prompts.build_prompt(template, &self.descriptor);

            let outcome = call_with_deadline(
                self.context.service.as_ref(),
                &prompt,
                self.context.call_timeout,
                &self.context.cancellation,
            )
            .await;

            let turn = match outcome {
                Ok(response) => {
                    counter!("validator_turns_total", 1, "outcome" => "success");
                    self.publish(
                        EventKind::TurnCompleted,
                        format!("{}/{} {:?}", index + 1, sequence.len(), template.kind),
                    )
                    .await;
                    ConversationTurn::success(&prompt, response)
                }
                Err(e) => {
                    counter!("validator_turns_total", 1, "outcome" => "failure");
                    warn!(
                        "Agent {} turn {} failed ({}): {}",
                        self.descriptor.id,
                        index + 1,
                        e.kind(),
                        e
                    );
                    self.publish(
                        EventKind::TurnFailed,
                        format!("{}/{} {}", index + 1, sequence.len(), e),
                    )
                    .await;
                    ConversationTurn::failure(&prompt, &e)
                }
            };

            turns.push(turn);
        }

        let result = AgentResult::new(&self.descriptor, turns);

        // A failed write stays local to this agent; the result still reaches the aggregate
        if let Err(e) = self.context.writer.write_agent_report(&result).await {
            warn!(
                "Agent {} could not persist its report: {}",
                self.descriptor.id, e
            );
            self.publish(EventKind::ReportPersistFailed, e.to_string()).await;
        }

        counter!("validator_agents_finished_total", 1);
        info!(
            "Agent {} finished: {} turns, {} failed",
            self.descriptor.id,
            result.turns.len(),
            result.failed_turns()
        );
        self.publish(
            EventKind::AgentFinished,
            format!("{} turns, {} failed", result.turns.len(), result.failed_turns()),
        )
        .await;

        result
    }

    async fn publish(&self, kind: EventKind, detail: String) {
        self.context
            .communication_bus
            .publish(AgentEvent::new(&self.descriptor, kind, detail))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{Reply, ScriptedReviewService};
    use crate::error::ValidationError;
    use tempfile::TempDir;

    fn context_for(service: Arc<dyn ReviewService>, temp_dir: &TempDir) -> AgentContext {
        AgentContext {
            service,
            prompts: Arc::new(AgentPrompts::new("the fleet app")),
            writer: Arc::new(ReportWriter::new(temp_dir.path(), "aggregate.json")),
            communication_bus: Arc::new(AgentCommunicationBus::new()),
            call_timeout: Duration::from_secs(5),
            cancellation: CancellationToken::new(),
        }
    }

    #[tokio::test]
    async fn test_execute_records_three_turns_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let service = Arc::new(ScriptedReviewService::new(|_, call| {
            Reply::Text(format!("answer {}", call))
        }));
        let context = context_for(service.clone(), &temp_dir);
        let descriptor = AgentDescriptor::new(1, "API Contract", "status codes");
        let agent = ValidationAgent::new(descriptor, context);

        let result = agent.execute().await;

        assert_eq!(result.agent_id, 1);
        assert_eq!(result.turns.len(), 3);
        let responses: Vec<_> = result
            .turns
            .iter()
            .map(|t| t.response.clone().unwrap())
            .collect();
        assert_eq!(responses, vec!["answer 1", "answer 2", "answer 3"]);
        assert!(result
            .turns
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
        assert_eq!(service.calls_for(1), 3);
    }

    #[tokio::test]
    async fn test_failed_turn_does_not_abort_remaining_prompts() {
        let temp_dir = TempDir::new().unwrap();
        let service = Arc::new(ScriptedReviewService::new(|_, call| {
            if call == 2 {
                Reply::Fail(ValidationError::Transport("connection reset".to_string()))
            } else {
                Reply::Text("ok".to_string())
            }
        }));
        let agent = ValidationAgent::new(
            AgentDescriptor::new(2, "Security Review", "auth"),
            context_for(service, &temp_dir),
        );

        let result = agent.execute().await;

        assert_eq!(result.turns.len(), 3);
        assert!(result.turns[0].is_success());
        assert!(!result.turns[1].is_success());
        assert!(result.turns[2].is_success());
        assert_eq!(
            result.turns[1].error.as_deref(),
            Some("transport error: connection reset")
        );
    }

    #[tokio::test]
    async fn test_execute_persists_own_report() {
        let temp_dir = TempDir::new().unwrap();
        let service = Arc::new(ScriptedReviewService::new(|_, _| Reply::Text("ok".to_string())));
        let context = context_for(service, &temp_dir);
        let writer = context.writer.clone();
        let agent = ValidationAgent::new(AgentDescriptor::new(5, "Data Integrity", "fk"), context);

        let result = agent.execute().await;

        let path = writer.agent_report_path(5, "Data Integrity");
        let saved: AgentResult =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(saved, result);
    }

    #[tokio::test]
    async fn test_persistence_failure_still_returns_result() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();

        let service = Arc::new(ScriptedReviewService::new(|_, _| Reply::Text("ok".to_string())));
        let mut context = context_for(service, &temp_dir);
        context.writer = Arc::new(ReportWriter::new(blocker.join("out"), "aggregate.json"));
        let bus = context.communication_bus.clone();
        let agent = ValidationAgent::new(AgentDescriptor::new(3, "UX", "forms"), context);

        let result = agent.execute().await;

        assert_eq!(result.turns.len(), 3);
        let failures = bus
            .get_event_history(Some(3), Some(EventKind::ReportPersistFailed))
            .await;
        assert_eq!(failures.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_run_records_transport_failures() {
        let temp_dir = TempDir::new().unwrap();
        let service = Arc::new(ScriptedReviewService::new(|_, _| Reply::Text("ok".to_string())));
        let context = context_for(service.clone(), &temp_dir);
        context.cancellation.cancel();
        let agent = ValidationAgent::new(AgentDescriptor::new(4, "Deploy", "scripts"), context);

        let result = agent.execute().await;

        assert_eq!(result.turns.len(), 3);
        assert!(result.turns.iter().all(|t| t
            .error
            .as_deref()
            .map_or(false, |e| e.starts_with("transport error"))));
        assert_eq!(service.calls_for(4), 0);
    }

    #[tokio::test]
    async fn test_hung_call_times_out_as_failed_turn() {
        let temp_dir = TempDir::new().unwrap();
        let service = Arc::new(ScriptedReviewService::new(|_, call| {
            if call == 1 {
                Reply::Hang
            } else {
                Reply::Text("ok".to_string())
            }
        }));
        let mut context = context_for(service, &temp_dir);
        context.call_timeout = Duration::from_millis(50);
        let agent = ValidationAgent::new(AgentDescriptor::new(6, "API", "x"), context);

        let result = agent.execute().await;

        assert_eq!(result.turns.len(), 3);
        assert!(result.turns[0].error.as_deref().unwrap().contains("timed out"));
        assert!(result.turns[1].is_success());
        assert!(result.turns[2].is_success());
    }

    #[tokio::test]
    async fn test_progress_events_published() {
        let temp_dir = TempDir::new().unwrap();
        let service = Arc::new(ScriptedReviewService::new(|_, _| Reply::Text("ok".to_string())));
        let context = context_for(service, &temp_dir);
        let bus = context.communication_bus.clone();
        let agent = ValidationAgent::new(AgentDescriptor::new(8, "API", "x"), context);

        agent.execute().await;

        let kinds: Vec<_> = bus
            .get_event_history(Some(8), None)
            .await
            .into_iter()
            .map(|e| e.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::AgentStarted,
                EventKind::TurnCompleted,
                EventKind::TurnCompleted,
                EventKind::TurnCompleted,
                EventKind::AgentFinished,
            ]
        );
    }
}
