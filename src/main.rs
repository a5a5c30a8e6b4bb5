//! Virtual Cafe real-time room server.

mod channel;
mod cleanup;
mod config;
mod error;
mod handlers;
mod identity;
mod membership;
mod notify;
mod protocol;
mod registry;
mod state;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::{Html, IntoResponse, Json},
    routing::{get, post},
    Router,
};
use config::Config;
use error::RoomError;
use futures::{SinkExt, StreamExt};
use identity::{Identity, IdentityParams};
use protocol::{ClientEvent, ServerEvent};
use registry::Room;
use state::AppState;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.log_level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = Arc::new(AppState::new(config.clone()));

    let scheduler = cleanup::CleanupScheduler::new(state.clone());
    scheduler.start();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route(
            "/api/rooms",
            get(handlers::rooms::list_rooms).post(handlers::rooms::create_room),
        )
        .route("/api/rooms/:room_code", get(handlers::rooms::room_detail))
        .route(
            "/api/rooms/:room_code/leave",
            post(handlers::rooms::leave_room),
        )
        .route("/api/admin/cleanup", post(handlers::rooms::run_cleanup))
        .route("/ws/rooms/:room_code", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Virtual Cafe rooms server started");
    tracing::info!("Address: {}", addr);
    tracing::info!("WebSocket: ws://{}/ws/rooms/{{room_code}}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutdown signal received");
}

async fn index_handler() -> Html<&'static str> {
    Html("<h1>Virtual Cafe Rooms Server</h1><p>WebSocket endpoint: /ws/rooms/{room_code}</p>")
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "server": "studycafe-rooms-rs",
        "timestamp": membership::unix_now(),
    }))
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_code): Path<String>,
    Query(params): Query<IdentityParams>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, RoomError> {
    let room = state.registry.find_by_code(&room_code)?;
    if !state.is_protected(&room.code) && room.is_expired(Instant::now()) {
        state.delete_room(&room.code);
        return Err(RoomError::Expired(room.code));
    }

    let identity: Identity = params.into();
    if let Some(user_id) = identity.id {
        state.ensure_capacity(&room, user_id)?;
    }

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room, identity)))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, room: Room, identity: Identity) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let session = handlers::handle_connect(&state, &room, identity, tx).await;

    // Outbound pump: one task per socket serializes and writes events.
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&event) {
                if ws_sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => handlers::dispatch_event(&state, &session, event).await,
                Err(e) => {
                    tracing::debug!(
                        session_id = %session.id,
                        error = %e,
                        "Malformed inbound message"
                    );
                    session.send_private(ServerEvent::Error {
                        code: "malformed".to_string(),
                        message: "unrecognized message".to_string(),
                    });
                }
            },
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    handlers::handle_disconnect(&state, &session).await;
    send_task.abort();
}
