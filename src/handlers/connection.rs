//! Connection session lifecycle: CONNECTING -> OPEN -> CLOSED.
//!
//! Each live socket owns exactly one `ConnectionSession`, bound to one
//! room's broadcast group for its whole lifetime. There is no reconnect or
//! resume: a dropped socket tears the session down and a fresh socket runs
//! the full handshake again.

use crate::channel::group_id;
use crate::handlers::{chat, signaling};
use crate::identity::Identity;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::registry::Room;
use crate::state::AppState;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// Per-connection state record.
pub struct ConnectionSession {
    pub id: Uuid,
    pub room_code: String,
    pub group: String,
    pub identity: Identity,
    pub sender: UnboundedSender<ServerEvent>,
}

impl ConnectionSession {
    /// Reply to this connection only, never broadcast.
    pub fn send_private(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

/// Socket accepted: join the room's broadcast group, register membership
/// for authenticated users, announce the join, and acknowledge privately.
pub async fn handle_connect(
    state: &AppState,
    room: &Room,
    identity: Identity,
    sender: UnboundedSender<ServerEvent>,
) -> ConnectionSession {
    let session = ConnectionSession {
        id: Uuid::new_v4(),
        room_code: room.code.clone(),
        group: group_id(&room.code),
        identity,
        sender,
    };

    state.channel.join(&session.group, session.id, session.sender.clone());

    if let (Some(user_id), Some(username)) =
        (session.identity.id, session.identity.username.clone())
    {
        state.join_room_member(room, user_id, &username);
        state
            .channel
            .publish(&session.group, ServerEvent::UserJoin { username });
    }

    session.send_private(ServerEvent::ConnectionEstablished {
        room_code: session.room_code.clone(),
        session_id: session.id.to_string(),
    });

    tracing::info!(
        session_id = %session.id,
        room_code = %session.room_code,
        user = %session.identity.display_name(),
        "Connection established"
    );
    session
}

/// Route a decoded inbound event to its handler.
pub async fn dispatch_event(state: &AppState, session: &ConnectionSession, event: ClientEvent) {
    match event {
        ClientEvent::Chat { message } => chat::handle_chat(state, session, message).await,
        ClientEvent::Typing { is_typing } => chat::handle_typing(state, session, is_typing).await,
        ClientEvent::Timer { action } => chat::handle_timer(state, session, action).await,
        ClientEvent::WebrtcOffer { offer } => {
            signaling::handle_offer(state, session, offer).await
        }
        ClientEvent::WebrtcAnswer { answer } => {
            signaling::handle_answer(state, session, answer).await
        }
        ClientEvent::WebrtcIce { candidate } => {
            signaling::handle_ice_candidate(state, session, candidate).await
        }
    }
}

/// Socket closed: announce the leave, deactivate membership, and leave the
/// broadcast group as the terminal step.
pub async fn handle_disconnect(state: &AppState, session: &ConnectionSession) {
    if let (Some(user_id), Some(username)) =
        (session.identity.id, session.identity.username.clone())
    {
        state
            .channel
            .publish(&session.group, ServerEvent::UserLeave { username });
        state.memberships.leave(user_id, &session.room_code);
    }
    state.channel.leave(&session.group, session.id);

    tracing::info!(
        session_id = %session.id,
        room_code = %session.room_code,
        user = %session.identity.display_name(),
        "Connection closed"
    );
}
