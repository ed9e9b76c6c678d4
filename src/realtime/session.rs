use actix_web::{get, rt, web, HttpRequest, HttpResponse};
use actix_ws::{Message, MessageStream, Session};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::events::{ClientMessage, ServerMessage};
use super::hub::{Connection, NotificationHub};
use crate::services::AuthService;

/// Upgrades to a websocket and attaches the connection to the hub.
#[get("/ws")]
pub async fn realtime(
    req: HttpRequest,
    body: web::Payload,
    hub: web::Data<NotificationHub>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, actix_web::Error> {
    let (response, session, incoming) = actix_ws::handle(&req, body)?;
    let (connection, outbound) = hub.into_inner().connect();
    rt::spawn(run_session(
        connection,
        outbound,
        session,
        incoming,
        auth.into_inner(),
    ));
    Ok(response)
}

async fn run_session(
    connection: Connection,
    mut outbound: mpsc::Receiver<String>,
    mut session: Session,
    mut incoming: MessageStream,
    auth: Arc<AuthService>,
) {
    let close_reason = loop {
        tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if session.text(frame).await.is_err() {
                        break None;
                    }
                }
                None => break None,
            },
            message = incoming.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if let Some(reply) = handle_client_frame(&connection, &auth, &text) {
                        connection.send(&reply);
                    }
                }
                Some(Ok(Message::Ping(bytes))) => {
                    if session.pong(&bytes).await.is_err() {
                        break None;
                    }
                }
                Some(Ok(Message::Close(reason))) => break reason,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    log::debug!("Realtime connection {} protocol error: {}", connection.id(), e);
                    break None;
                }
                None => break None,
            },
        }
    };

    let _ = session.close(close_reason).await;
    log::debug!("Realtime connection {} closed", connection.id());
}

/// Applies one client frame and returns the reply to send back, if any.
pub(crate) fn handle_client_frame(
    connection: &Connection,
    auth: &AuthService,
    text: &str,
) -> Option<ServerMessage> {
    match serde_json::from_str::<ClientMessage>(text) {
        Ok(ClientMessage::Join(user_id)) => {
            connection.join(user_id);
            None
        }
        Ok(ClientMessage::Authenticate(token)) => match auth.validate_token(&token) {
            Ok(identity) => {
                connection.join(identity.id);
                Some(ServerMessage::Authenticated {
                    user_id: identity.id,
                })
            }
            Err(_) => Some(ServerMessage::AuthError {
                message: "Invalid token".to_string(),
            }),
        },
        Err(e) => {
            log::debug!("Realtime connection {} sent a bad frame: {}", connection.id(), e);
            Some(ServerMessage::Error {
                message: "Invalid message".to_string(),
            })
        }
    }
}
