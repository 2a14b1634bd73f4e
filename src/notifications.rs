//! Toast notifications and blocking alerts.
//!
//! Toasts expire on their own after a fixed display time; alerts stay queued
//! until the shell drains and shows them.

use std::time::{Duration, Instant};

use serde::Serialize;
use uuid::Uuid;

pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_millis(4000);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    #[default]
    Success,
    Info,
}

#[derive(Clone, Debug, Serialize)]
pub struct Notification {
    pub id: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(skip)]
    expires_at: Instant,
}

impl Notification {
    pub fn is_expired(&self, now: Instant) -> bool { now >= self.expires_at }
}

/// Insertion-ordered toasts. No coalescing of repeated messages.
#[derive(Debug)]
pub struct NotificationQueue {
    entries: Vec<Notification>,
    ttl: Duration,
}

impl NotificationQueue {
    pub fn new(ttl: Duration) -> Self { Self { entries: vec![], ttl } }

    pub fn push(&mut self, message: impl Into<String>, kind: NotificationKind) -> String {
        self.push_at(Instant::now(), message, kind)
    }

    pub fn push_at(&mut self, now: Instant, message: impl Into<String>, kind: NotificationKind) -> String {
        self.purge_expired(now);
        let id = Uuid::new_v4().simple().to_string();
        self.entries.push(Notification { id: id.clone(), message: message.into(), kind, expires_at: now + self.ttl });
        id
    }

    /// Idempotent.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|n| n.id != id);
        self.entries.len() != before
    }

    pub fn purge_expired(&mut self, now: Instant) { self.entries.retain(|n| !n.is_expired(now)); }

    pub fn visible(&mut self, now: Instant) -> &[Notification] {
        self.purge_expired(now);
        &self.entries
    }

    pub fn next_expiry(&self) -> Option<Instant> { self.entries.iter().map(|n| n.expires_at).min() }
    pub fn len(&self) -> usize { self.entries.len() }
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

impl Default for NotificationQueue {
    fn default() -> Self { Self::new(DEFAULT_NOTIFICATION_TTL) }
}

/// A message the shell must show and have dismissed before continuing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub message: String,
}

impl Alert {
    pub fn new(message: impl Into<String>) -> Self { Self { message: message.into() } }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_entry_expires_on_its_own() {
        let start = Instant::now();
        let mut queue = NotificationQueue::default();
        queue.push_at(start, "primero", NotificationKind::Success);
        queue.push_at(start + Duration::from_millis(1500), "segundo", NotificationKind::Info);

        assert_eq!(queue.visible(start + Duration::from_millis(3999)).len(), 2);
        let left = queue.visible(start + Duration::from_millis(4000));
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].message, "segundo");
        assert!(queue.visible(start + Duration::from_millis(5500)).is_empty());
    }

    #[test]
    fn test_remove_is_idempotent_and_order_is_insertion() {
        let now = Instant::now();
        let mut queue = NotificationQueue::default();
        let a = queue.push_at(now, "a", NotificationKind::Success);
        queue.push_at(now, "b", NotificationKind::Info);
        queue.push_at(now, "b", NotificationKind::Info);
        assert!(queue.remove(&a));
        assert!(!queue.remove(&a));
        let messages: Vec<&str> = queue.visible(now).iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages, vec!["b", "b"]);
    }

    #[test]
    fn test_push_drops_expired_entries() {
        let start = Instant::now();
        let mut queue = NotificationQueue::default();
        for _ in 0..10 { queue.push_at(start, "agregado", NotificationKind::Success); }
        queue.push_at(start + Duration::from_secs(5), "nuevo", NotificationKind::Info);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_next_expiry_tracks_oldest() {
        let now = Instant::now();
        let mut queue = NotificationQueue::new(Duration::from_secs(1));
        assert!(queue.next_expiry().is_none());
        queue.push_at(now, "x", NotificationKind::Success);
        queue.push_at(now + Duration::from_millis(200), "y", NotificationKind::Success);
        assert_eq!(queue.next_expiry(), Some(now + Duration::from_secs(1)));
    }

    #[test]
    fn test_serialized_shape() {
        let mut queue = NotificationQueue::default();
        queue.push("hola", NotificationKind::Info);
        let json = serde_json::to_value(&queue.visible(Instant::now())[0]).unwrap();
        assert_eq!(json["type"], "info");
        assert!(json.get("expires_at").is_none());
    }
}
