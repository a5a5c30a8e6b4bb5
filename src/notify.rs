//! Notification collaborator seam.
//!
//! Delivery is fire-and-forget: a failed notification is logged and never
//! fails the join that triggered it.

use crate::registry::Room;

/// External notification sink for membership events.
pub trait Notifier: Send + Sync {
    fn notify_new_member(
        &self,
        room_owner_id: i64,
        new_member: &str,
        room: &Room,
    ) -> anyhow::Result<()>;
}

/// Default notifier: logs the event for the main application to pick up.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_new_member(
        &self,
        room_owner_id: i64,
        new_member: &str,
        room: &Room,
    ) -> anyhow::Result<()> {
        tracing::info!(
            owner_id = room_owner_id,
            new_member = %new_member,
            room_code = %room.code,
            "New member notification"
        );
        Ok(())
    }
}
