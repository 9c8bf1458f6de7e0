//! Broadcast bus for permit events.
//!
//! Observers (audit logging, indexing) subscribe for [`PermitEvent`]s.
//! Delivery is best-effort: publishing with no subscribers succeeds, and a
//! lagging receiver may miss events without affecting the engine.

use permit_types::PermitEvent;
use tokio::sync::broadcast;

/// Default buffer size for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// Event bus for engine-to-observer communication.
#[derive(Clone)]
pub struct EventBus {
	sender: broadcast::Sender<PermitEvent>,
}

impl EventBus {
	/// Creates a new event bus with the given buffer capacity.
	pub fn new(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Creates a new receiver subscribed to all future events.
	pub fn subscribe(&self) -> broadcast::Receiver<PermitEvent> {
		self.sender.subscribe()
	}

	/// Publishes an event to all current subscribers.
	///
	/// Having no subscribers is not an error.
	pub fn publish(&self, event: PermitEvent) {
		let _ = self.sender.send(event);
	}
}

impl Default for EventBus {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}
