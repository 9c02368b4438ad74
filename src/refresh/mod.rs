use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Presentation views whose data can go stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    Employees,
    Expenses,
    Leads,
    Calendar,
}

impl View {
    /// UI path of the view
    pub fn path(&self) -> &'static str {
        match self {
            View::Employees => "/employees",
            View::Expenses => "/expenses",
            View::Leads => "/leads",
            View::Calendar => "/calendar",
        }
    }
}

/// One-way notification that a view must refetch its data
pub trait RefreshSignal: Send + Sync {
    fn mark_stale(&self, view: View);

    /// Live feed of stale notifications, when the signal supports one
    fn subscribe(&self) -> Option<broadcast::Receiver<View>> {
        None
    }
}

/// Fans stale notifications out to every live subscriber.
/// Slow subscribers lose the oldest notifications rather than blocking senders.
#[derive(Clone)]
pub struct BroadcastRefresh {
    sender: broadcast::Sender<View>,
}

impl BroadcastRefresh {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }
}

impl Default for BroadcastRefresh {
    fn default() -> Self {
        Self::new(64)
    }
}

impl RefreshSignal for BroadcastRefresh {
    fn mark_stale(&self, view: View) {
        // send only fails when nobody is listening
        match self.sender.send(view) {
            Ok(receivers) => tracing::debug!("Marked {} stale for {} subscriber(s)", view.path(), receivers),
            Err(_) => tracing::trace!("Marked {} stale with no subscribers", view.path()),
        }
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<View>> {
        Some(self.sender.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_stale_views() {
        let refresh = BroadcastRefresh::new(8);
        let mut rx = refresh.subscribe().expect("broadcast feed");

        refresh.mark_stale(View::Expenses);
        refresh.mark_stale(View::Leads);

        assert_eq!(rx.recv().await.unwrap(), View::Expenses);
        assert_eq!(rx.recv().await.unwrap(), View::Leads);
    }

    #[test]
    fn marking_without_subscribers_is_a_no_op() {
        BroadcastRefresh::default().mark_stale(View::Employees);
    }

    #[test]
    fn views_map_to_ui_paths() {
        assert_eq!(View::Employees.path(), "/employees");
        assert_eq!(View::Calendar.path(), "/calendar");
    }
}
