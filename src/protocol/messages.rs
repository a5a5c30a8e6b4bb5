//! Client-server message protocol for the room socket.
//!
//! Messages are flat JSON objects tagged by `type`. WebRTC payloads
//! (SDP blobs, ICE candidates) are relayed as opaque JSON values and
//! never interpreted by the server.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Client → server events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Chat {
        message: String,
    },
    Typing {
        is_typing: bool,
    },

    // WebRTC signaling
    WebrtcOffer {
        offer: Value,
    },
    WebrtcAnswer {
        answer: Value,
    },
    WebrtcIce {
        candidate: Value,
    },

    // Shared Pomodoro timer
    Timer {
        action: String,
    },
}

/// Server → client events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    // Private to one connection
    ConnectionEstablished {
        room_code: String,
        session_id: String,
    },
    Error {
        code: String,
        message: String,
    },

    // Room events
    Chat {
        message: String,
        username: String,
        user_id: i64,
        timestamp: u64,
    },
    UserJoin {
        username: String,
    },
    UserLeave {
        username: String,
    },
    UserTyping {
        username: String,
        is_typing: bool,
    },

    // WebRTC signaling
    WebrtcOffer {
        offer: Value,
        username: String,
    },
    WebrtcAnswer {
        answer: Value,
        username: String,
    },
    WebrtcIce {
        candidate: Value,
        username: String,
    },

    // Shared Pomodoro timer
    Timer {
        action: String,
        username: String,
    },
}
