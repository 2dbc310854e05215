//! Typed application event bus.
//!
//! Listeners (for example a list view that needs refreshing) subscribe to the bus and receive
//! every event published after they subscribed. The bus is cheap to clone; all clones share
//! the same channel.

use crate::constants::FOLLOWUP_ACTION_LIST_MODIFICATION;
use crate::model::FollowupAction;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq)]
pub enum PromsEvent {
    /// A followup action was saved; carries the record returned by the update operation.
    FollowupActionListModification(FollowupAction),
}

impl PromsEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PromsEvent::FollowupActionListModification(_) => FOLLOWUP_ACTION_LIST_MODIFICATION,
        }
    }

    pub fn content(&self) -> &FollowupAction {
        match self {
            PromsEvent::FollowupActionListModification(action) => action,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PromsEvent>,
}

impl EventBus {
    /// `capacity` bounds how far a slow subscriber may lag before it misses events.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PromsEvent> {
        self.tx.subscribe()
    }

    /// Publishes `event` and returns how many subscribers will see it.
    ///
    /// Publishing with nobody listening is not an error.
    pub fn publish(&self, event: PromsEvent) -> usize {
        let name = event.name();
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::debug!(event = name, receivers, "published event");
                receivers
            }
            Err(_) => {
                tracing::debug!(event = name, "published event with no subscribers");
                0
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_EVENT_CAPACITY)
    }
}
