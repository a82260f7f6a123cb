//! Per-connection handler
//!
//! Each accepted socket gets one `Connection`. It upgrades the socket to a
//! WebSocket, then splits it:
//!
//! - the reader (this task) decodes text frames and dispatches them one at
//!   a time, so a client's events run in the order it sent them;
//! - the writer (a spawned task) drains the client's [`ChannelSink`] queue
//!   and serializes outbound frames.
//!
//! Both halves watch the sink's close signal. Once the hub closes the
//! client, the writer sends a close frame within `write_timeout` and the
//! reader stops without waiting for the peer to answer it. When the reader
//! ends, the client is removed from its room before the connection is
//! dropped.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::client::{ChannelSink, ClientInfo, SinkReceiver};
use crate::error::Result;
use crate::protocol::message::{CloseReason, Outgoing};
use crate::protocol::EventRegistry;
use crate::registry::Rooms;
use crate::server::config::ServerConfig;
use crate::server::handler::{AuthResult, SignalHandler};

type WsWriter = futures::stream::SplitSink<WebSocketStream<TcpStream>, Message>;

/// A single client connection
pub struct Connection<H: SignalHandler> {
    socket: TcpStream,
    peer_addr: SocketAddr,
    config: ServerConfig,
    handler: Arc<H>,
    rooms: Arc<Rooms>,
    events: Arc<EventRegistry>,
}

impl<H: SignalHandler> Connection<H> {
    pub fn new(
        socket: TcpStream,
        peer_addr: SocketAddr,
        config: ServerConfig,
        handler: Arc<H>,
        rooms: Arc<Rooms>,
        events: Arc<EventRegistry>,
    ) -> Self {
        Self {
            socket,
            peer_addr,
            config,
            handler,
            rooms,
            events,
        }
    }

    /// Run the connection until the peer goes away
    pub async fn run(self) -> Result<()> {
        let Connection {
            socket,
            peer_addr,
            config,
            handler,
            rooms,
            events,
        } = self;

        let mut auth = AuthResult::Anonymous;
        let callback = |request: &Request, response: Response| {
            auth = handler.on_connection(peer_addr, request);
            match &auth {
                AuthResult::Reject(reason) => {
                    let mut error = ErrorResponse::new(Some(reason.clone()));
                    *error.status_mut() = StatusCode::FORBIDDEN;
                    Err(error)
                }
                _ => Ok(response),
            }
        };

        let handshake = tokio::time::timeout(
            config.handshake_timeout,
            tokio_tungstenite::accept_hdr_async(socket, callback),
        )
        .await;

        let ws = match handshake {
            Ok(Ok(ws)) => ws,
            Ok(Err(e)) => {
                if let AuthResult::Reject(reason) = &auth {
                    tracing::info!(peer = %peer_addr, reason = %reason, "Connection rejected by handler");
                    return Ok(());
                }
                return Err(e.into());
            }
            Err(_) => {
                tracing::warn!(peer = %peer_addr, "WebSocket handshake timed out");
                return Ok(());
            }
        };

        let (ws_tx, mut ws_rx) = ws.split();
        let (sink, receiver) = ChannelSink::new(config.send_queue_capacity);
        let mut close_signal = receiver.close_signal();

        let mut client = ClientInfo::new(peer_addr, Arc::new(sink));
        if let AuthResult::Authenticated(user) = auth {
            client = client.authenticated(user);
        }

        rooms.metrics().connection_opened();
        tracing::info!(
            client = %client.id,
            peer = %peer_addr,
            user = ?client.authenticated_user,
            "Client connected"
        );

        let write_timeout = rooms.config().write_timeout;
        let mut writer = tokio::spawn(write_loop(ws_tx, receiver, write_timeout));

        let result = loop {
            let next = tokio::select! {
                biased;
                reason = close_signal.closed() => {
                    tracing::info!(client = %client.id, reason = ?reason, "Closing connection");
                    None
                }
                next = ws_rx.next() => next,
            };

            let message = match next {
                Some(Ok(message)) => message,
                Some(Err(e)) => break Err(e.into()),
                None => break Ok(()),
            };

            match message {
                Message::Text(text) => {
                    let Err(e) = events.dispatch(&rooms, &mut client, text.as_str()).await else {
                        continue;
                    };
                    tracing::debug!(client = %client.id, kind = e.kind(), error = %e, "Event failed");

                    let reply = client.sink.write(Outgoing::error(&e));
                    if !matches!(tokio::time::timeout(write_timeout, reply).await, Ok(Ok(()))) {
                        break Ok(());
                    }
                }
                Message::Binary(_) => {
                    tracing::debug!(client = %client.id, "Ignoring binary frame");
                }
                Message::Close(_) => break Ok(()),
                _ => {}
            }
        };

        rooms.disconnect(&client.id).await;
        handler.on_disconnect(&client);

        // Writer stops once the last sink handle is gone
        let client_id = client.id;
        drop(client);
        if tokio::time::timeout(write_timeout, &mut writer).await.is_err() {
            writer.abort();
        }

        rooms.metrics().connection_closed();
        tracing::info!(client = %client_id, peer = %peer_addr, "Client disconnected");

        result
    }
}

async fn write_loop(mut ws_tx: WsWriter, receiver: SinkReceiver, close_timeout: Duration) {
    let (mut frames, mut signal) = receiver.into_parts();

    let forward = async {
        while let Some(frame) = frames.recv().await {
            if !send_frame(&mut ws_tx, frame).await {
                break;
            }
        }
    };

    // A close cancels a send stuck on a peer that stopped reading
    let reason = tokio::select! {
        biased;
        reason = signal.closed() => reason,
        _ = forward => None,
    };

    let flush = async {
        while let Ok(frame) = frames.try_recv() {
            if !send_frame(&mut ws_tx, frame).await {
                break;
            }
        }
        if let Some(reason) = reason {
            let frame = CloseFrame {
                code: close_code(reason),
                reason: reason.to_string().into(),
            };
            let _ = ws_tx.send(Message::Close(Some(frame))).await;
        }
        let _ = ws_tx.close().await;
    };

    if tokio::time::timeout(close_timeout, flush).await.is_err() {
        tracing::debug!("Gave up flushing a closed connection");
    }
}

/// Encode and send one frame, `false` once the socket is gone
async fn send_frame(ws_tx: &mut WsWriter, frame: Outgoing) -> bool {
    match frame.to_json() {
        Ok(text) => ws_tx.send(Message::text(text)).await.is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode frame");
            true
        }
    }
}

fn close_code(reason: CloseReason) -> CloseCode {
    match reason {
        CloseReason::RoomClosed => CloseCode::Normal,
        CloseReason::Unresponsive => CloseCode::Policy,
        CloseReason::Shutdown => CloseCode::Away,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_close_codes() {
        assert_eq!(close_code(CloseReason::RoomClosed), CloseCode::Normal);
        assert_eq!(close_code(CloseReason::Unresponsive), CloseCode::Policy);
        assert_eq!(close_code(CloseReason::Shutdown), CloseCode::Away);
    }
}
