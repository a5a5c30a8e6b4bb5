//! Chat, typing-indicator and shared-timer event handlers.

use crate::handlers::connection::ConnectionSession;
use crate::membership::unix_now;
use crate::protocol::ServerEvent;
use crate::state::AppState;

/// Chat requires authentication and a non-empty message. The event is
/// echoed to all group members, sender included, so the sender sees the
/// server-authoritative timestamp; clients tell their own messages apart
/// by `user_id`.
pub async fn handle_chat(state: &AppState, session: &ConnectionSession, message: String) {
    let message = message.trim();
    if message.is_empty() {
        return;
    }

    let (user_id, username) = match (session.identity.id, session.identity.username.as_deref()) {
        (Some(id), Some(name)) => (id, name.to_string()),
        _ => {
            session.send_private(ServerEvent::Error {
                code: "unauthorized".to_string(),
                message: "You must be signed in to send chat messages".to_string(),
            });
            return;
        }
    };

    state.channel.publish(
        &session.group,
        ServerEvent::Chat {
            message: message.to_string(),
            username,
            user_id,
            timestamp: unix_now(),
        },
    );

    tracing::debug!(
        room_code = %session.room_code,
        user_id,
        "Chat message published"
    );
}

/// Typing indicators are a silent no-op for anonymous connections and are
/// never echoed back to the sender.
pub async fn handle_typing(state: &AppState, session: &ConnectionSession, is_typing: bool) {
    if !session.identity.is_authenticated() {
        return;
    }
    let username = session.identity.display_name().to_string();

    state.channel.publish_except(
        &session.group,
        session.id,
        ServerEvent::UserTyping { username, is_typing },
    );
}

/// Shared Pomodoro timer controls: silent no-op for anonymous connections,
/// not echoed back to the sender.
pub async fn handle_timer(state: &AppState, session: &ConnectionSession, action: String) {
    if !session.identity.is_authenticated() {
        return;
    }
    let username = session.identity.display_name().to_string();

    state.channel.publish_except(
        &session.group,
        session.id,
        ServerEvent::Timer { action, username },
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::connection::testing::*;
    use crate::identity::Identity;

    #[tokio::test]
    async fn chat_is_echoed_to_all_with_verbatim_message_and_timestamp() {
        let state = make_state();
        let room = make_room(&state);
        let (session_a, mut rx_a) = open_session(&state, &room, authed(1, "alice")).await;
        let (_session_b, mut rx_b) = open_session(&state, &room, authed(2, "bob")).await;
        while rx_a.try_recv().is_ok() {}

        handle_chat(&state, &session_a, "  hello world  ".to_string()).await;

        for rx in [&mut rx_a, &mut rx_b] {
            match rx.recv().await {
                Some(ServerEvent::Chat {
                    message,
                    username,
                    user_id,
                    timestamp,
                }) => {
                    assert_eq!(message, "hello world");
                    assert_eq!(username, "alice");
                    assert_eq!(user_id, 1);
                    assert!(timestamp > 0);
                }
                other => panic!("expected chat, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn empty_chat_is_silently_dropped() {
        let state = make_state();
        let room = make_room(&state);
        let (session, mut rx) = open_session(&state, &room, authed(1, "alice")).await;

        handle_chat(&state, &session, "   ".to_string()).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unauthenticated_chat_gets_private_error_and_no_broadcast() {
        let state = make_state();
        let room = make_room(&state);
        let (anon, mut rx_anon) = open_session(&state, &room, Identity::anonymous()).await;
        let (_member, mut rx_member) = open_session(&state, &room, authed(2, "bob")).await;
        while rx_anon.try_recv().is_ok() {}

        handle_chat(&state, &anon, "hi".to_string()).await;

        match rx_anon.recv().await {
            Some(ServerEvent::Error { code, .. }) => assert_eq!(code, "unauthorized"),
            other => panic!("expected error, got {other:?}"),
        }
        assert!(rx_member.try_recv().is_err());
    }

    #[tokio::test]
    async fn typing_reaches_others_but_never_the_sender() {
        let state = make_state();
        let room = make_room(&state);
        let (session_a, mut rx_a) = open_session(&state, &room, authed(1, "alice")).await;
        let (_session_b, mut rx_b) = open_session(&state, &room, authed(2, "bob")).await;
        while rx_a.try_recv().is_ok() {}

        handle_typing(&state, &session_a, true).await;

        match rx_b.recv().await {
            Some(ServerEvent::UserTyping { username, is_typing }) => {
                assert_eq!(username, "alice");
                assert!(is_typing);
            }
            other => panic!("expected user_typing, got {other:?}"),
        }
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn anonymous_typing_and_timer_are_silent_noops() {
        let state = make_state();
        let room = make_room(&state);
        let (anon, mut rx_anon) = open_session(&state, &room, Identity::anonymous()).await;
        let (_member, mut rx_member) = open_session(&state, &room, authed(2, "bob")).await;
        while rx_anon.try_recv().is_ok() {}

        handle_typing(&state, &anon, true).await;
        handle_timer(&state, &anon, "start".to_string()).await;

        assert!(rx_anon.try_recv().is_err());
        assert!(rx_member.try_recv().is_err());
    }

    #[tokio::test]
    async fn timer_action_is_relayed_with_actor() {
        let state = make_state();
        let room = make_room(&state);
        let (session_a, mut rx_a) = open_session(&state, &room, authed(1, "alice")).await;
        let (_session_b, mut rx_b) = open_session(&state, &room, authed(2, "bob")).await;
        while rx_a.try_recv().is_ok() {}

        handle_timer(&state, &session_a, "pause".to_string()).await;

        match rx_b.recv().await {
            Some(ServerEvent::Timer { action, username }) => {
                assert_eq!(action, "pause");
                assert_eq!(username, "alice");
            }
            other => panic!("expected timer, got {other:?}"),
        }
        assert!(rx_a.try_recv().is_err());
    }
}
