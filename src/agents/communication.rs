use crate::types::{AgentEvent, EventKind};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

const CHANNEL_CAPACITY: usize = 1000;
const MAX_HISTORY: usize = 10_000;

/// Communication bus carrying agent progress events to whoever is listening
pub struct AgentCommunicationBus {
    /// Broadcast channel for real-time events
    event_sender: broadcast::Sender<AgentEvent>,

    /// Event history storage
    event_history: Arc<RwLock<Vec<AgentEvent>>>,
}

impl AgentCommunicationBus {
    pub fn new() -> Self {
        let (event_sender, _) = broadcast::channel(CHANNEL_CAPACITY);

        Self {
            event_sender,
            event_history: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Publish an event to all subscribers
    pub async fn publish(&self, event: AgentEvent) {
        debug!(
            "Publishing {:?} from agent {}",
            event.kind, event.agent_id
        );

        {
            let mut history = self.event_history.write().await;
            history.push(event.clone());

            if history.len() > MAX_HISTORY {
                history.drain(0..CHANNEL_CAPACITY);
            }
        }

        // Nobody listening is fine; progress output is informational only
        if self.event_sender.send(event).is_err() {
            debug!("No active subscribers for event");
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.event_sender.subscribe()
    }

    /// Get event history filtered by agent and kind
    pub async fn get_event_history(
        &self,
        agent_id: Option<u32>,
        kind: Option<EventKind>,
    ) -> Vec<AgentEvent> {
        let history = self.event_history.read().await;

        history
            .iter()
            .filter(|event| agent_id.map_or(true, |id| event.agent_id == id))
            .filter(|event| kind.map_or(true, |k| event.kind == k))
            .cloned()
            .collect()
    }

    /// Count events per kind
    pub async fn get_statistics(&self) -> CommunicationStatistics {
        let history = self.event_history.read().await;

        let mut events_by_agent: HashMap<u32, usize> = HashMap::new();
        let mut events_by_kind: HashMap<EventKind, usize> = HashMap::new();

        for event in history.iter() {
            *events_by_agent.entry(event.agent_id).or_insert(0) += 1;
            *events_by_kind.entry(event.kind).or_insert(0) += 1;
        }

        CommunicationStatistics {
            total_events: history.len(),
            events_by_agent,
            events_by_kind,
        }
    }
}

impl Default for AgentCommunicationBus {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct CommunicationStatistics {
    pub total_events: usize,
    pub events_by_agent: HashMap<u32, usize>,
    pub events_by_kind: HashMap<EventKind, usize>,
}
