pub mod agent;
pub mod communication;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{AgentContext, ValidationAgent};
pub use communication::AgentCommunicationBus;
pub use orchestrator::{AgentOutcome, OrchestratorConfig, ValidationOrchestrator};
