//! WebRTC signaling relay.
//!
//! Offer/answer/ICE payloads are relayed verbatim to the other members of
//! the room, never back to the sender, and never interpreted. Signaling
//! does not require authentication; anonymous senders are relayed as
//! "Anonymous".

use crate::handlers::connection::ConnectionSession;
use crate::protocol::ServerEvent;
use crate::state::AppState;
use serde_json::Value;

pub async fn handle_offer(state: &AppState, session: &ConnectionSession, offer: Value) {
    state.channel.publish_except(
        &session.group,
        session.id,
        ServerEvent::WebrtcOffer {
            offer,
            username: session.identity.display_name().to_string(),
        },
    );
    tracing::debug!(room_code = %session.room_code, "Relayed offer");
}

pub async fn handle_answer(state: &AppState, session: &ConnectionSession, answer: Value) {
    state.channel.publish_except(
        &session.group,
        session.id,
        ServerEvent::WebrtcAnswer {
            answer,
            username: session.identity.display_name().to_string(),
        },
    );
    tracing::debug!(room_code = %session.room_code, "Relayed answer");
}

pub async fn handle_ice_candidate(state: &AppState, session: &ConnectionSession, candidate: Value) {
    state.channel.publish_except(
        &session.group,
        session.id,
        ServerEvent::WebrtcIce {
            candidate,
            username: session.identity.display_name().to_string(),
        },
    );
    tracing::debug!(room_code = %session.room_code, "Relayed ICE candidate");
}
