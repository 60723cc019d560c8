use crate::error::AppError;
use crate::middleware::auth::authenticate;
use crate::services::notification::NotificationService;
use crate::websocket::hub::NotificationHub;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, WebSocketUpgrade,
    },
    response::IntoResponse,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};

#[derive(Deserialize)]
pub struct WsQuery {
    pub token: String,
}

/// First frame on every socket so the client can render its badge without a
/// separate request.
#[derive(Serialize)]
struct UnreadSnapshot {
    count: u64,
}

/// Browsers cannot set headers on websocket upgrades, so the access token
/// travels in the query string and is checked like any bearer token.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    Extension(db): Extension<DatabaseConnection>,
    Extension(hub): Extension<NotificationHub>,
) -> Result<impl IntoResponse, AppError> {
    let auth_user = authenticate(&db, &query.token).await?;
    let unread = NotificationService::new(db, hub.clone())
        .unread_count(auth_user.user_id)
        .await?;

    Ok(ws.on_upgrade(move |socket| run_session(socket, auth_user.user_id, unread, hub)))
}

async fn run_session(socket: WebSocket, user_id: i32, unread: u64, hub: NotificationHub) {
    let (mut sink, mut stream) = socket.split();
    let (conn_id, mut rx) =
        hub.subscribe_with(user_id, "unread_count", &UnreadSnapshot { count: unread });

    tracing::debug!(user_id, conn_id, "notification socket opened");

    let mut outbound = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(Message::Text(msg.as_ref().into())).await.is_err() {
                break;
            }
        }
    });

    // Clients never send anything meaningful; drain until close.
    let mut inbound = tokio::spawn(async move {
        while let Some(Ok(msg)) = stream.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut outbound => inbound.abort(),
        _ = &mut inbound => outbound.abort(),
    }

    hub.unsubscribe(user_id, conn_id);
    tracing::debug!(user_id, conn_id, "notification socket closed");
}
