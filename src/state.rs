//! Shared application state.

use crate::channel::RoomChannel;
use crate::config::Config;
use crate::error::RoomError;
use crate::membership::{Membership, MembershipManager};
use crate::notify::{LogNotifier, Notifier};
use crate::registry::{Room, RoomRegistry};
use std::sync::Arc;
use std::time::Instant;

/// Global application state shared by every connection and the cleanup
/// scheduler.
pub struct AppState {
    pub registry: RoomRegistry,
    pub memberships: MembershipManager,
    pub channel: RoomChannel,
    pub notifier: Arc<dyn Notifier>,
    pub config: Arc<Config>,
    /// Guards cleanup sweeps: at most one run in flight, overlapping
    /// invocations are dropped.
    pub sweep_lock: tokio::sync::Mutex<()>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_notifier(config, Arc::new(LogNotifier))
    }

    pub fn with_notifier(config: Config, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            registry: RoomRegistry::new(config.room.code_length, config.room.max_code_attempts),
            memberships: MembershipManager::new(),
            channel: RoomChannel::new(),
            notifier,
            config: Arc::new(config),
            sweep_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Room codes exempt from cleanup sweeps.
    pub fn is_protected(&self, room_code: &str) -> bool {
        let code = room_code.to_uppercase();
        self.config.room.protected_codes.iter().any(|c| *c == code)
    }

    /// Register a user as present in a room: reactivate-or-create the
    /// membership, notify the owner of a first-time member, refresh room
    /// activity. Reactivations and repeat connects do not re-notify.
    /// Notification failures are logged, never propagated.
    pub fn join_room_member(&self, room: &Room, user_id: i64, username: &str) -> Membership {
        let (membership, created) = self.memberships.join(user_id, username, &room.code);

        if created && room.owner_id != user_id {
            if let Err(e) = self.notifier.notify_new_member(room.owner_id, username, room) {
                tracing::warn!(
                    room_code = %room.code,
                    error = %e,
                    "Failed to dispatch new-member notification"
                );
            }
        }

        self.registry.touch_activity(&room.code, Instant::now());
        membership
    }

    /// Enforce the room capacity ceiling for a join. An existing active
    /// member re-entering a full room is allowed. Every join path (HTTP
    /// and WebSocket) goes through this check.
    pub fn ensure_capacity(&self, room: &Room, user_id: i64) -> Result<(), RoomError> {
        let max_size = self.config.room.max_size;
        if self.memberships.count_active(&room.code) >= max_size
            && !self.memberships.is_active_member(user_id, &room.code)
        {
            return Err(RoomError::RoomFull(room.code.clone()));
        }
        Ok(())
    }

    /// Delete a room and cascade its memberships.
    pub fn delete_room(&self, room_code: &str) -> Option<Room> {
        let room = self.registry.delete(room_code)?;
        let cascaded = self.memberships.remove_for_room(&room.code);
        tracing::info!(
            room_code = %room.code,
            memberships = cascaded,
            "Room deleted"
        );
        Some(room)
    }

    /// True iff no active memberships reference the room.
    pub fn room_is_empty(&self, room_code: &str) -> bool {
        self.memberships.count_active(room_code) == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::{FailingNotifier, RecordingNotifier};
    use crate::registry::Visibility;

    fn make_room(state: &AppState) -> Room {
        state
            .registry
            .create(
                "StudyHall".to_string(),
                String::new(),
                Visibility::Public,
                1,
                "alice".to_string(),
                None,
            )
            .unwrap()
    }

    #[tokio::test]
    async fn joining_anothers_room_notifies_the_owner() {
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::with_notifier(Config::for_tests(), notifier.clone());
        let room = make_room(&state);

        state.join_room_member(&room, 2, "bob");
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], (1, "bob".to_string(), room.code.clone()));
    }

    #[tokio::test]
    async fn only_first_join_notifies_never_reactivations_or_reconnects() {
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::with_notifier(Config::for_tests(), notifier.clone());
        let room = make_room(&state);

        state.join_room_member(&room, 2, "bob");
        state.memberships.leave(2, &room.code);
        state.join_room_member(&room, 2, "bob");
        state.join_room_member(&room, 2, "bob");

        assert_eq!(notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn owner_joining_own_room_sends_no_notification() {
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::with_notifier(Config::for_tests(), notifier.clone());
        let room = make_room(&state);

        state.join_room_member(&room, 1, "alice");
        assert!(notifier.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn notification_failure_does_not_fail_the_join() {
        let state = AppState::with_notifier(Config::for_tests(), Arc::new(FailingNotifier));
        let room = make_room(&state);

        let membership = state.join_room_member(&room, 2, "bob");
        assert!(membership.is_active);
        assert_eq!(state.memberships.count_active(&room.code), 1);
    }

    #[tokio::test]
    async fn delete_room_cascades_memberships() {
        let state = AppState::new(Config::for_tests());
        let room = make_room(&state);
        state.join_room_member(&room, 1, "alice");
        state.join_room_member(&room, 2, "bob");

        state.delete_room(&room.code).unwrap();
        assert_eq!(state.memberships.row_count(), 0);
        assert!(state.registry.find_by_code(&room.code).is_err());
    }

    #[tokio::test]
    async fn capacity_check_caps_joins_but_readmits_active_members() {
        let state = AppState::new(Config::for_tests());
        let room = make_room(&state);

        // Test capacity is 4.
        for (id, name) in [(1, "alice"), (2, "bob"), (3, "carol"), (4, "dave")] {
            state.ensure_capacity(&room, id).unwrap();
            state.join_room_member(&room, id, name);
        }

        assert!(matches!(
            state.ensure_capacity(&room, 5),
            Err(RoomError::RoomFull(_))
        ));
        state.ensure_capacity(&room, 2).unwrap();

        state.memberships.leave(4, &room.code);
        state.ensure_capacity(&room, 5).unwrap();
    }

    #[test]
    fn protected_codes_match_case_insensitively() {
        let state = AppState::new(Config::for_tests());
        assert!(state.is_protected("global"));
        assert!(state.is_protected("GLOBAL"));
        assert!(!state.is_protected("OTHER"));
    }
}
