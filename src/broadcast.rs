use rocket::response::stream::Event;
use rocket::tokio::sync::broadcast::{channel, Receiver, Sender};

use crate::model::db::VotingStatus;

/// A state change that connected dashboards should hear about.
///
/// The SSE event names produced by [`DashboardEvent::into_sse`] are the wire
/// contract with the frontend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardEvent {
    /// Generic "something changed, re-fetch" signal. No payload.
    Update,
    /// Voting was opened or closed; carries the new state.
    StatusChanged(VotingStatus),
    /// Position quotas changed. No payload.
    ConfigurationUpdated,
}

impl DashboardEvent {
    /// The SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Update => "ReceiveUpdate",
            Self::StatusChanged(_) => "VotingStatusChanged",
            Self::ConfigurationUpdated => "ConfigurationUpdated",
        }
    }

    /// Convert into a server-sent event.
    pub fn into_sse(self) -> Event {
        let name = self.name();
        match self {
            Self::StatusChanged(status) => Event::data(status.to_string()).event(name),
            Self::Update | Self::ConfigurationUpdated => Event::data("").event(name),
        }
    }
}

/// Fan-out of dashboard events to all currently-connected observers.
///
/// Delivery is strictly best-effort: sends never fail the triggering request,
/// a send with no subscribers is a no-op, and a subscriber that falls more
/// than the channel capacity behind loses the overwritten events rather than
/// blocking anyone else. Events reach each subscriber in send order.
pub struct DashboardBroadcaster {
    sender: Sender<DashboardEvent>,
}

impl DashboardBroadcaster {
    /// Create a broadcaster whose per-subscriber buffer holds `capacity` events.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = channel(capacity);
        Self { sender }
    }

    /// Register a new observer. The receiver sees only events sent after this call.
    pub fn subscribe(&self) -> Receiver<DashboardEvent> {
        self.sender.subscribe()
    }

    /// Tell all dashboards to re-fetch.
    pub fn notify_update(&self) {
        self.send(DashboardEvent::Update);
    }

    /// Tell all dashboards voting was opened or closed.
    pub fn notify_status_change(&self, status: VotingStatus) {
        self.send(DashboardEvent::StatusChanged(status));
    }

    /// Tell all dashboards the quota configuration changed.
    pub fn notify_config_update(&self) {
        self.send(DashboardEvent::ConfigurationUpdated);
    }

    fn send(&self, event: DashboardEvent) {
        match self.sender.send(event.clone()) {
            Ok(subscribers) => {
                trace!("Broadcast {} to {subscribers} dashboard(s)", event.name())
            }
            // Sending only fails when nobody is listening.
            Err(_) => debug!("No dashboards connected to receive {}", event.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_are_the_wire_contract() {
        assert_eq!(DashboardEvent::Update.name(), "ReceiveUpdate");
        assert_eq!(
            DashboardEvent::StatusChanged(VotingStatus::Open).name(),
            "VotingStatusChanged"
        );
        assert_eq!(
            DashboardEvent::ConfigurationUpdated.name(),
            "ConfigurationUpdated"
        );
    }

    #[rocket::async_test]
    async fn all_subscribers_receive_every_event() {
        let broadcaster = DashboardBroadcaster::new(16);
        let mut rx1 = broadcaster.subscribe();
        let mut rx2 = broadcaster.subscribe();

        broadcaster.notify_update();
        broadcaster.notify_status_change(VotingStatus::Open);

        for rx in [&mut rx1, &mut rx2] {
            assert_eq!(rx.recv().await.unwrap(), DashboardEvent::Update);
            assert_eq!(
                rx.recv().await.unwrap(),
                DashboardEvent::StatusChanged(VotingStatus::Open)
            );
        }
    }

    #[rocket::async_test]
    async fn events_arrive_in_send_order() {
        let broadcaster = DashboardBroadcaster::new(16);
        let mut rx = broadcaster.subscribe();

        broadcaster.notify_update();
        broadcaster.notify_config_update();
        broadcaster.notify_status_change(VotingStatus::Closed);

        assert_eq!(rx.recv().await.unwrap(), DashboardEvent::Update);
        assert_eq!(rx.recv().await.unwrap(), DashboardEvent::ConfigurationUpdated);
        assert_eq!(
            rx.recv().await.unwrap(),
            DashboardEvent::StatusChanged(VotingStatus::Closed)
        );
    }

    #[rocket::async_test]
    async fn dropped_subscriber_does_not_affect_others() {
        let broadcaster = DashboardBroadcaster::new(16);
        let rx1 = broadcaster.subscribe();
        let mut rx2 = broadcaster.subscribe();

        drop(rx1);
        broadcaster.notify_update();

        assert_eq!(rx2.recv().await.unwrap(), DashboardEvent::Update);
    }

    #[rocket::async_test]
    async fn send_without_subscribers_is_swallowed() {
        let broadcaster = DashboardBroadcaster::new(16);
        // Must not panic or error.
        broadcaster.notify_update();
        broadcaster.notify_status_change(VotingStatus::Open);
        broadcaster.notify_config_update();
    }
}
