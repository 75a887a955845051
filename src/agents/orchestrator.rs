use crate::agents::agent::{AgentContext, ValidationAgent};
use crate::agents::communication::AgentCommunicationBus;
use crate::config::Config;
use crate::error::{Result, ValidationError};
use crate::llm::{AgentPrompts, ReviewService};
use crate::reports::{ReportGenerator, ReportWriter};
use crate::types::*;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Fans out one agent per descriptor and joins on all of them
pub struct ValidationOrchestrator {
    service: Arc<dyn ReviewService>,
    prompts: Arc<AgentPrompts>,
    writer: Arc<ReportWriter>,
    communication_bus: Arc<AgentCommunicationBus>,
    generator: ReportGenerator,
    cancellation: CancellationToken,
    config: OrchestratorConfig,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub call_timeout: Duration,
    pub run_deadline: Option<Duration>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(120),
            run_deadline: Some(Duration::from_secs(900)),
        }
    }
}

impl OrchestratorConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            call_timeout: config.review_service.request_timeout(),
            run_deadline: config.run.run_deadline(),
        }
    }
}

/// Terminal state of one agent: its result, or the failure that stopped it
#[derive(Debug)]
pub struct AgentOutcome {
    pub descriptor: AgentDescriptor,
    pub result: Result<AgentResult>,
}

impl AgentOutcome {
    /// Degrade a failed agent to an empty result so it still counts toward the aggregate
    pub fn into_agent_result(self) -> AgentResult {
        match self.result {
            Ok(result) => result,
            Err(_) => AgentResult::empty(&self.descriptor),
        }
    }
}

impl ValidationOrchestrator {
    pub fn new(
        service: Arc<dyn ReviewService>,
        prompts: AgentPrompts,
        writer: ReportWriter,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            service,
            prompts: Arc::new(prompts),
            writer: Arc::new(writer),
            communication_bus: Arc::new(AgentCommunicationBus::new()),
            generator: ReportGenerator::new(),
            cancellation: CancellationToken::new(),
            config,
        }
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn communication_bus(&self) -> Arc<AgentCommunicationBus> {
        self.communication_bus.clone()
    }

    /// Run every agent, aggregate their results and persist the aggregate exactly once.
    ///
    /// Individual agent failures never fail the run; only writing the aggregate can.
    #[instrument(skip_all, fields(agents = descriptors.len()))]
    pub async fn run(&self, descriptors: &[AgentDescriptor]) -> Result<AggregateReport> {
        info!("Starting validation run with {} agents", descriptors.len());
        let run_start = Instant::now();

        let outcomes = self.run_agents(descriptors).await;
        let results = outcomes
            .into_iter()
            .map(AgentOutcome::into_agent_result)
            .collect();

        let report = self.generator.aggregate(descriptors.len(), results);
        self.writer.write_aggregate_report(&report).await?;

        info!(
            "Validation run completed in {:.2}s: {} analyses, {} agents completed, \
             {} critical issues",
            run_start.elapsed().as_secs_f64(),
            report.summary.total_analyses,
            report.summary.agents_completed,
            report.summary.critical_issues
        );

        Ok(report)
    }

    /// Launch all agents concurrently and wait for every one of them.
    ///
    /// Returns one outcome per descriptor, in registry order. A panicking agent is
    /// captured as `AgentPanicked` and does not disturb its siblings.
    pub async fn run_agents(&self, descriptors: &[AgentDescriptor]) -> Vec<AgentOutcome> {
        let run_token = self.cancellation.child_token();
        // Cancelled on return, which also stops the deadline watcher
        let _run_guard = run_token.clone().drop_guard();
        self.spawn_deadline(&run_token);

        let context = AgentContext {
            service: self.service.clone(),
            prompts: self.prompts.clone(),
            writer: self.writer.clone(),
            communication_bus: self.communication_bus.clone(),
            call_timeout: self.config.call_timeout,
            cancellation: run_token.clone(),
        };

        let mut join_set = JoinSet::new();

        for (index, descriptor) in descriptors.iter().cloned().enumerate() {
            let agent = ValidationAgent::new(descriptor, context.clone());

            join_set.spawn(async move {
                let agent_id = agent.descriptor().id;
                let outcome = AssertUnwindSafe(agent.execute())
                    .catch_unwind()
                    .await
                    .map_err(|panic| ValidationError::AgentPanicked {
                        agent_id,
                        message: panic_message(panic.as_ref()),
                    });
                (index, outcome)
            });
        }

        let mut slots: Vec<Option<Result<AgentResult>>> =
            descriptors.iter().map(|_| None).collect();

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, Ok(result))) => {
                    info!(
                        "Agent {} completed with {} turns",
                        result.agent_id,
                        result.turns.len()
                    );
                    slots[index] = Some(Ok(result));
                }
                Ok((index, Err(e))) => {
                    warn!("Agent failed: {}", e);
                    slots[index] = Some(Err(e));
                }
                Err(e) => {
                    warn!("Agent task join error: {}", e);
                }
            }
        }

        descriptors
            .iter()
            .cloned()
            .zip(slots)
            .map(|(descriptor, slot)| {
                let result = slot.unwrap_or_else(|| {
                    Err(ValidationError::AgentPanicked {
                        agent_id: descriptor.id,
                        message: "agent task did not complete".to_string(),
                    })
                });
                AgentOutcome { descriptor, result }
            })
            .collect()
    }

    fn spawn_deadline(&self, run_token: &CancellationToken) {
        let Some(deadline) = self.config.run_deadline else {
            return;
        };
        let token = run_token.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(deadline) => {
                    warn!("Run deadline of {:?} reached, cancelling outstanding calls", deadline);
                    token.cancel();
                }
                _ = token.cancelled() => {}
            }
        });
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
