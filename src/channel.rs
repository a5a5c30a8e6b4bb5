//! Per-room broadcast groups.
//!
//! A group is the set of live connections bound to one room. Publishing
//! delivers to every member (the publisher included); excluding the sender
//! is the session layer's responsibility, expressed via `publish_except`.
//! Ordering is FIFO per group within this process; nothing is guaranteed
//! across processes.

use crate::protocol::ServerEvent;
use dashmap::DashMap;
use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// Deterministic group key for a room code. Any instance derives the same
/// key for the same room.
pub fn group_id(room_code: &str) -> String {
    format!("room_{}", room_code.to_uppercase())
}

/// In-process broadcast fabric: group key -> member senders.
pub struct RoomChannel {
    groups: DashMap<String, HashMap<Uuid, UnboundedSender<ServerEvent>>>,
}

impl RoomChannel {
    pub fn new() -> Self {
        Self {
            groups: DashMap::new(),
        }
    }

    pub fn join(&self, group: &str, session_id: Uuid, sender: UnboundedSender<ServerEvent>) {
        self.groups
            .entry(group.to_string())
            .or_default()
            .insert(session_id, sender);
    }

    /// Remove a connection from its group; empty groups are dropped.
    pub fn leave(&self, group: &str, session_id: Uuid) {
        if let Some(mut members) = self.groups.get_mut(group) {
            members.remove(&session_id);
            let empty = members.is_empty();
            drop(members);
            if empty {
                self.groups.remove_if(group, |_, m| m.is_empty());
            }
        }
    }

    /// Deliver an event to every member of the group, publisher included.
    pub fn publish(&self, group: &str, event: ServerEvent) {
        if let Some(members) = self.groups.get(group) {
            for sender in members.values() {
                let _ = sender.send(event.clone());
            }
        }
    }

    /// Deliver an event to every member except one (the sender).
    pub fn publish_except(&self, group: &str, except: Uuid, event: ServerEvent) {
        if let Some(members) = self.groups.get(group) {
            for (id, sender) in members.iter() {
                if *id != except {
                    let _ = sender.send(event.clone());
                }
            }
        }
    }

    pub fn member_count(&self, group: &str) -> usize {
        self.groups.get(group).map(|m| m.len()).unwrap_or(0)
    }
}

impl Default for RoomChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn member() -> (
        Uuid,
        UnboundedSender<ServerEvent>,
        mpsc::UnboundedReceiver<ServerEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Uuid::new_v4(), tx, rx)
    }

    fn typing(username: &str) -> ServerEvent {
        ServerEvent::UserTyping {
            username: username.to_string(),
            is_typing: true,
        }
    }

    #[test]
    fn group_id_is_deterministic_and_case_insensitive() {
        assert_eq!(group_id("abc123"), "room_ABC123");
        assert_eq!(group_id("ABC123"), group_id("abc123"));
    }

    #[tokio::test]
    async fn publish_reaches_all_members_including_publisher() {
        let channel = RoomChannel::new();
        let group = group_id("ROOM1");
        let (a, tx_a, mut rx_a) = member();
        let (b, tx_b, mut rx_b) = member();
        channel.join(&group, a, tx_a);
        channel.join(&group, b, tx_b);

        channel.publish(&group, typing("alice"));
        assert!(rx_a.recv().await.is_some());
        assert!(rx_b.recv().await.is_some());
    }

    #[tokio::test]
    async fn publish_except_skips_the_sender() {
        let channel = RoomChannel::new();
        let group = group_id("ROOM1");
        let (a, tx_a, mut rx_a) = member();
        let (b, tx_b, mut rx_b) = member();
        channel.join(&group, a, tx_a);
        channel.join(&group, b, tx_b);

        channel.publish_except(&group, a, typing("alice"));
        assert!(rx_b.recv().await.is_some());
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn delivery_is_fifo_per_group() {
        let channel = RoomChannel::new();
        let group = group_id("ROOM1");
        let (a, tx_a, mut rx_a) = member();
        channel.join(&group, a, tx_a);

        for i in 0..5 {
            channel.publish(
                &group,
                ServerEvent::Timer {
                    action: format!("tick-{i}"),
                    username: "alice".to_string(),
                },
            );
        }
        for i in 0..5 {
            match rx_a.recv().await {
                Some(ServerEvent::Timer { action, .. }) => {
                    assert_eq!(action, format!("tick-{i}"));
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn leave_stops_delivery_and_drops_empty_group() {
        let channel = RoomChannel::new();
        let group = group_id("ROOM1");
        let (a, tx_a, mut rx_a) = member();
        channel.join(&group, a, tx_a);
        assert_eq!(channel.member_count(&group), 1);

        channel.leave(&group, a);
        assert_eq!(channel.member_count(&group), 0);
        channel.publish(&group, typing("alice"));
        assert!(rx_a.try_recv().is_err());
    }
}
