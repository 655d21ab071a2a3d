// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for WebSocket communication.
//!
//! Provides a trait-based transport layer that enables:
//! - Real WebSocket connections for production
//! - Mock transports for unit testing
//!
//! A [`Connector`] hands out one fresh transport per connect attempt; a
//! transport is never reused after it closes.

use std::future::Future;
use std::pin::Pin;

use chansync_core::close::ABNORMAL_CLOSE_CODE;
use chansync_core::{CloseEvent, SubscribeFrame};

/// Close code used when a close frame carried no status.
const NO_STATUS_CLOSE_CODE: u16 = 1005;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Boxed future returned by transport methods.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Everything needed to open a connection.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub url: String,
    pub protocols: Vec<String>,
    /// Session credential, sent as a bearer token.
    pub token: String,
}

impl std::fmt::Debug for ConnectRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectRequest")
            .field("url", &self.url)
            .field("protocols", &self.protocols)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Something received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A text frame (not yet parsed).
    Frame(String),
    /// The connection ended.
    Closed(CloseEvent),
}

/// Transport trait for WebSocket-like communication.
///
/// This trait abstracts over the actual transport mechanism, allowing
/// for easy testing with mock implementations.
pub trait Transport: Send {
    /// Connect to a remote server.
    fn connect(&mut self, request: ConnectRequest) -> TransportFuture<'_, TransportResult<()>>;

    /// Send a frame to the server.
    fn send(&mut self, frame: SubscribeFrame) -> TransportFuture<'_, TransportResult<()>>;

    /// Receive the next event from the server.
    fn recv(&mut self) -> TransportFuture<'_, TransportResult<TransportEvent>>;

    /// Close the connection with the given code and reason. Never fails.
    fn close(&mut self, close: CloseEvent) -> TransportFuture<'_, ()>;

    /// Check if connected.
    fn is_connected(&self) -> bool;
}

/// Creates transports, one per connect attempt.
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport + 'static;

    fn transport(&self) -> Self::Transport;
}

/// Connector for [`WebSocketTransport`].
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    fn transport(&self) -> WebSocketTransport {
        WebSocketTransport::new()
    }
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// WebSocket transport implementation using tokio-tungstenite.
pub struct WebSocketTransport {
    /// The WebSocket connection, if connected.
    ws: Option<WebSocketConnection>,
}

/// Internal WebSocket connection wrapper.
struct WebSocketConnection {
    sink: futures_util::stream::SplitSink<WsStream, tokio_tungstenite::tungstenite::Message>,
    stream: futures_util::stream::SplitStream<WsStream>,
}

impl WebSocketTransport {
    /// Create a new WebSocket transport.
    pub fn new() -> Self {
        WebSocketTransport { ws: None }
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

pub(super) fn handshake_request(
    request: &ConnectRequest,
) -> TransportResult<tokio_tungstenite::tungstenite::handshake::client::Request> {
    use tokio_tungstenite::tungstenite::client::IntoClientRequest;
    use tokio_tungstenite::tungstenite::http::{header, HeaderValue};

    let mut req = request
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

    let bearer = HeaderValue::from_str(&format!("Bearer {}", request.token))
        .map_err(|e| TransportError::ConnectionFailed(format!("invalid credential: {}", e)))?;
    req.headers_mut().insert(header::AUTHORIZATION, bearer);

    if !request.protocols.is_empty() {
        let protocols = HeaderValue::from_str(&request.protocols.join(", "))
            .map_err(|e| TransportError::ConnectionFailed(format!("invalid protocol: {}", e)))?;
        req.headers_mut().insert(header::SEC_WEBSOCKET_PROTOCOL, protocols);
    }

    Ok(req)
}

/// Selects the process-wide TLS crypto backend used for `wss://` endpoints.
///
/// The first call wins; later calls find a provider already installed.
fn install_tls_provider() {
    let _ = rustls::crypto::ring::default_provider().install_default();
}

impl Transport for WebSocketTransport {
    fn connect(&mut self, request: ConnectRequest) -> TransportFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            use futures_util::StreamExt;

            let req = handshake_request(&request)?;
            if req.uri().scheme_str() == Some("wss") {
                install_tls_provider();
            }
            let (ws_stream, _) = tokio_tungstenite::connect_async(req)
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

            let (sink, stream) = ws_stream.split();
            self.ws = Some(WebSocketConnection { sink, stream });
            Ok(())
        })
    }

    fn send(&mut self, frame: SubscribeFrame) -> TransportFuture<'_, TransportResult<()>> {
        Box::pin(async move {
            use futures_util::SinkExt;
            use tokio_tungstenite::tungstenite::Message;

            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

            let json = frame
                .to_json()
                .map_err(|e| TransportError::SerializationError(e.to_string()))?;

            if let Err(e) = ws.sink.send(Message::Text(json.into())).await {
                // Connection is broken, clear it
                self.ws = None;
                return Err(TransportError::SendFailed(e.to_string()));
            }

            Ok(())
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, TransportResult<TransportEvent>> {
        Box::pin(async move {
            use futures_util::StreamExt;
            use tokio_tungstenite::tungstenite::Message;

            let ws = self.ws.as_mut().ok_or(TransportError::ConnectionClosed)?;

            loop {
                match ws.stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return Ok(TransportEvent::Frame(text.to_string()));
                    }
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                        Ok(text) => return Ok(TransportEvent::Frame(text)),
                        Err(_) => {
                            tracing::debug!("ignoring non-UTF-8 binary frame");
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        self.ws = None;
                        let close = match frame {
                            Some(frame) => {
                                CloseEvent::frame(u16::from(frame.code), frame.reason.to_string())
                            }
                            None => CloseEvent::frame(NO_STATUS_CLOSE_CODE, ""),
                        };
                        return Ok(TransportEvent::Closed(close));
                    }
                    Some(Ok(_)) => {
                        // Ping/pong are answered by tungstenite on the next read
                        continue;
                    }
                    Some(Err(e)) => {
                        // Connection is broken, clear it
                        self.ws = None;
                        return Err(TransportError::ReceiveFailed(e.to_string()));
                    }
                    None => {
                        // Stream ended without a close handshake
                        self.ws = None;
                        return Ok(TransportEvent::Closed(CloseEvent::frame(
                            ABNORMAL_CLOSE_CODE,
                            "stream ended",
                        )));
                    }
                }
            }
        })
    }

    fn close(&mut self, close: CloseEvent) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            use futures_util::SinkExt;
            use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
            use tokio_tungstenite::tungstenite::protocol::CloseFrame;
            use tokio_tungstenite::tungstenite::Message;

            if let Some(mut ws) = self.ws.take() {
                let frame = CloseFrame {
                    code: CloseCode::from(close.code.unwrap_or(1000)),
                    reason: close.reason.into(),
                };
                if let Err(e) = ws.sink.send(Message::Close(Some(frame))).await {
                    tracing::debug!(error = %e, "close frame not delivered");
                }
                let _ = ws.sink.close().await;
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.ws.is_some()
    }
}
