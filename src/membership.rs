//! Room membership tracking.
//!
//! One row per (user, room) pair. Rejoining reactivates the existing row;
//! leaving flips it inactive but keeps the row for history.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
pub struct Membership {
    pub user_id: i64,
    pub username: String,
    pub room_code: String,
    pub is_active: bool,
    pub joined_at: u64,
}

/// In-process membership store keyed by (user, room).
pub struct MembershipManager {
    members: DashMap<(i64, String), Membership>,
}

impl MembershipManager {
    pub fn new() -> Self {
        Self {
            members: DashMap::new(),
        }
    }

    /// Join a room: reactivate the existing row if there is one, otherwise
    /// create a new active membership. `joined_at` is refreshed only when
    /// reactivating from inactive, so an already-active member's original
    /// join time is preserved. Returns the membership and whether the row
    /// was newly created (a reactivation or repeat join reports false).
    pub fn join(&self, user_id: i64, username: &str, room_code: &str) -> (Membership, bool) {
        let key = (user_id, room_code.to_uppercase());
        match self.members.entry(key) {
            Entry::Occupied(mut e) => {
                let m = e.get_mut();
                if !m.is_active {
                    m.is_active = true;
                    m.joined_at = unix_now();
                }
                (m.clone(), false)
            }
            Entry::Vacant(e) => {
                let m = Membership {
                    user_id,
                    username: username.to_string(),
                    room_code: e.key().1.clone(),
                    is_active: true,
                    joined_at: unix_now(),
                };
                e.insert(m.clone());
                (m, true)
            }
        }
    }

    /// Mark a membership inactive. The row is never deleted here. Returns
    /// false when no membership exists for the pair.
    pub fn leave(&self, user_id: i64, room_code: &str) -> bool {
        let key = (user_id, room_code.to_uppercase());
        match self.members.get_mut(&key) {
            Some(mut m) => {
                m.is_active = false;
                true
            }
            None => false,
        }
    }

    pub fn active_members(&self, room_code: &str) -> Vec<Membership> {
        let code = room_code.to_uppercase();
        self.members
            .iter()
            .filter(|m| m.room_code == code && m.is_active)
            .map(|m| m.clone())
            .collect()
    }

    pub fn count_active(&self, room_code: &str) -> usize {
        let code = room_code.to_uppercase();
        self.members
            .iter()
            .filter(|m| m.room_code == code && m.is_active)
            .count()
    }

    pub fn is_active_member(&self, user_id: i64, room_code: &str) -> bool {
        let key = (user_id, room_code.to_uppercase());
        self.members.get(&key).map(|m| m.is_active).unwrap_or(false)
    }

    /// Cascade delete when a room is removed.
    pub fn remove_for_room(&self, room_code: &str) -> usize {
        let code = room_code.to_uppercase();
        let before = self.members.len();
        self.members.retain(|_, m| m.room_code != code);
        before - self.members.len()
    }

    pub fn row_count(&self) -> usize {
        self.members.len()
    }
}

impl Default for MembershipManager {
    fn default() -> Self {
        Self::new()
    }
}
