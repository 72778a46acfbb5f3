//! WebSocket transport backed by tokio-tungstenite.

use std::collections::HashMap;

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::{Transport, TransportCommand, TransportEvent, TransportHandle};
use crate::error::Result;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// WebSocket transport.
///
/// `open` spawns the connection task and returns immediately; connect
/// success or failure arrives as the first event.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    /// Create a WebSocket transport.
    pub fn new() -> Self {
        Self
    }
}

impl Transport for WebSocketTransport {
    fn open(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<TransportHandle> {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let url = url.to_string();
        let headers = headers.clone();

        tokio::spawn(async move {
            let request = match build_request(&url, &headers) {
                Ok(request) => request,
                Err(e) => {
                    let _ = events.send(TransportEvent::ConnectFailed(e));
                    return;
                }
            };

            tracing::info!("opening websocket connection to {url}");
            match connect_async(request).await {
                Ok((stream, _response)) => {
                    let _ = events.send(TransportEvent::Connected);
                    run_connection(stream, command_rx, events).await;
                }
                Err(e) => {
                    let _ = events.send(TransportEvent::ConnectFailed(e.to_string()));
                }
            }
        });

        Ok(TransportHandle::new(command_tx))
    }

    fn name(&self) -> &'static str {
        "websocket"
    }
}

fn build_request(
    url: &str,
    headers: &HashMap<String, String>,
) -> std::result::Result<tokio_tungstenite::tungstenite::handshake::client::Request, String> {
    let mut request = url
        .into_client_request()
        .map_err(|e| format!("invalid url {url}: {e}"))?;

    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("invalid header name {name}: {e}"))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| format!("invalid header value: {e}"))?;
        request.headers_mut().insert(name, value);
    }

    Ok(request)
}

/// Pump the connection: commands out, frames in, until either side ends.
async fn run_connection(
    stream: WsStream,
    mut commands: mpsc::UnboundedReceiver<TransportCommand>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    let (mut sink, mut source) = stream.split();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(TransportCommand::Text(text)) => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        let _ = events.send(TransportEvent::WriteError(e.to_string()));
                    }
                }
                Some(TransportCommand::Ping(payload)) => {
                    if let Err(e) = sink.send(Message::Ping(payload)).await {
                        let _ = events.send(TransportEvent::WriteError(e.to_string()));
                    }
                }
                Some(TransportCommand::Close) | None => {
                    // Requested locally: the session already knows, so no
                    // Disconnected event is reported back.
                    tracing::debug!("closing websocket connection");
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            },
            frame = source.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Text(text));
                }
                Some(Ok(Message::Binary(data))) => {
                    let _ = events.send(TransportEvent::Binary(data));
                }
                Some(Ok(Message::Ping(payload))) => {
                    // tungstenite queues the pong reply itself.
                    let _ = events.send(TransportEvent::Ping(payload));
                }
                Some(Ok(Message::Pong(payload))) => {
                    let _ = events.send(TransportEvent::Pong(payload));
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame.map(|f| f.reason.to_string());
                    let _ = events.send(TransportEvent::Disconnected(reason));
                    break;
                }
                Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => {
                    let _ = events.send(TransportEvent::Disconnected(Some(e.to_string())));
                    break;
                }
                None => {
                    let _ = events.send(TransportEvent::Disconnected(None));
                    break;
                }
            },
        }
    }
}
