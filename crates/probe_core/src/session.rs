//! Single-use WebSocket session against the relay service.

use crate::endpoints::websocket_url;
use crate::error::{ProbeError, Result};
use crate::http::error_chain;
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::io::ErrorKind;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::error::ProtocolError;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{client_async_tls, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Lifecycle of a [`RelaySession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// Created, no connection attempted.
    Idle,
    /// Handshake in progress.
    Connecting,
    /// Usable for send and receive.
    Open,
    /// Closed by us or by the peer.
    Closed,
    /// Handshake or transport failure.
    Faulted,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// One WebSocket connection to `{relay}/ws?token=...`.
///
/// A session is created per connection attempt and never reused: once it
/// leaves `Idle` it cannot connect again, and once it is `Closed` or
/// `Faulted` every operation except [`RelaySession::disconnect`] fails with
/// [`ProbeError::NotConnected`]. Dropping the session cancels its token and
/// releases the socket.
pub struct RelaySession {
    base_url: String,
    state: SessionState,
    stream: Option<WsStream>,
    cancel: CancellationToken,
    connect_timeout: Duration,
    close_timeout: Duration,
}

impl RelaySession {
    /// Creates an idle session for the relay at `base_url` (http, https, ws or wss).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            state: SessionState::Idle,
            stream: None,
            cancel: CancellationToken::new(),
            connect_timeout: Duration::from_secs(10),
            close_timeout: Duration::from_secs(2),
        }
    }

    /// Bounds the handshake.
    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Bounds the close handshake in [`Self::disconnect`].
    pub fn with_close_timeout(mut self, close_timeout: Duration) -> Self {
        self.close_timeout = close_timeout;
        self
    }

    /// Uses `token` as the session token, typically a child of a run-level token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True when the session is `Open`.
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open
    }

    /// Handle that cancels any in-flight connect, receive or send on this session.
    pub fn cancel_handle(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// URL the session connects to for `token`.
    pub fn url_for(&self, token: &str) -> String {
        websocket_url(&self.base_url, token)
    }

    /// Performs the handshake with `token` in the query string.
    ///
    /// On failure the session is `Faulted`. Failing to open the TCP
    /// connection is [`ProbeError::Transport`]. Once the relay has accepted
    /// the socket, any failure (a reset included) is a refused upgrade,
    /// [`ProbeError::Handshake`]. An unanswered handshake is
    /// [`ProbeError::RequestTimeout`].
    pub async fn connect(&mut self, token: &str) -> Result<()> {
        self.set_state(SessionState::Connecting)?;
        let url = self.url_for(token);
        let display_url = websocket_url(&self.base_url, "***TOKEN***");
        debug!(url = %display_url, "connecting");

        let cancel = self.cancel.clone();
        let timeout_url = display_url.clone();
        let attempt = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            result = timeout(self.connect_timeout, open_upgrade(&url, &display_url)) => {
                result.unwrap_or(Err(ProbeError::RequestTimeout { url: timeout_url }))
            }
        };

        match attempt {
            Ok(stream) => {
                self.stream = Some(stream);
                self.set_state(SessionState::Open)
            }
            Err(e) => {
                self.set_state(SessionState::Faulted)?;
                Err(e)
            }
        }
    }

    /// Waits at most `wait` for one text message and returns it.
    ///
    /// Ping and pong frames are handled by the transport and skipped without
    /// extending the deadline. Outcomes other than text:
    /// - deadline passed: [`ProbeError::ReceiveTimeout`], session stays `Open`
    /// - close frame or end of stream: [`ProbeError::ClosedByPeer`], session `Closed`
    /// - binary frame: [`ProbeError::UnexpectedFrame`], session stays `Open`
    /// - transport error: [`ProbeError::WebSocket`], session `Faulted`
    /// - cancellation: [`ProbeError::Cancelled`], session `Faulted`
    pub async fn receive_one_message(&mut self, wait: Duration) -> Result<String> {
        self.require_open()?;
        let deadline = Instant::now() + wait;
        let cancel = self.cancel.clone();

        loop {
            let stream = self.open_stream()?;
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                frame = timeout_at(deadline, stream.next()) => Some(frame),
            };

            let Some(next) = next else {
                self.abandon();
                return Err(ProbeError::Cancelled);
            };

            match next {
                Err(_) => {
                    return Err(ProbeError::ReceiveTimeout {
                        timeout_ms: millis(wait),
                    })
                }
                Ok(None) => {
                    self.release_after_peer_close().await;
                    return Err(ProbeError::ClosedByPeer {
                        reason: Some("connection dropped".to_string()),
                    });
                }
                Ok(Some(Ok(Message::Text(text)))) => {
                    debug!(bytes = text.len(), "text frame");
                    return Ok(text);
                }
                Ok(Some(Ok(Message::Close(frame)))) => {
                    let reason = frame
                        .map(|f| f.reason.into_owned())
                        .filter(|reason| !reason.is_empty());
                    self.release_after_peer_close().await;
                    return Err(ProbeError::ClosedByPeer { reason });
                }
                Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
                Ok(Some(Ok(Message::Binary(data)))) => {
                    return Err(ProbeError::UnexpectedFrame {
                        kind: format!("Binary ({} bytes)", data.len()),
                    })
                }
                Ok(Some(Ok(Message::Frame(_)))) => {
                    return Err(ProbeError::UnexpectedFrame {
                        kind: "raw frame".to_string(),
                    })
                }
                Ok(Some(Err(e))) => {
                    self.abandon();
                    return Err(ProbeError::WebSocket(error_chain(&e)));
                }
            }
        }
    }

    /// Sends one complete text frame.
    pub async fn send_text(&mut self, message: &str) -> Result<()> {
        self.require_open()?;
        let cancel = self.cancel.clone();
        let stream = self.open_stream()?;

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            sent = stream.send(Message::Text(message.to_owned())) => {
                sent.map_err(|e| ProbeError::WebSocket(error_chain(&e)))
            }
        };

        if result.is_err() {
            self.abandon();
        }
        result
    }

    /// Closes the connection with a normal close handshake.
    ///
    /// No-op unless the session is `Open`, so calling it twice is fine.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.state != SessionState::Open {
            return Ok(());
        }
        self.set_state(SessionState::Closed)?;
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };

        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "Client closing connection".into(),
        };
        match timeout(self.close_timeout, close_handshake(&mut stream, frame)).await {
            Ok(Ok(())) => {
                debug!("closed gracefully");
                Ok(())
            }
            Ok(Err(e)) => Err(ProbeError::WebSocket(error_chain(&e))),
            Err(_) => {
                warn!(
                    timeout_ms = millis(self.close_timeout),
                    "peer did not acknowledge close; dropping connection"
                );
                Ok(())
            }
        }
    }

    fn require_open(&self) -> Result<()> {
        if self.state == SessionState::Open {
            Ok(())
        } else {
            Err(ProbeError::NotConnected {
                state: self.state.to_string(),
            })
        }
    }

    fn open_stream(&mut self) -> Result<&mut WsStream> {
        let state = self.state;
        self.stream.as_mut().ok_or_else(|| ProbeError::NotConnected {
            state: state.to_string(),
        })
    }

    /// Drops the socket after a failure or cancellation.
    fn abandon(&mut self) {
        self.stream = None;
        if self.state == SessionState::Open {
            self.state = SessionState::Faulted;
        }
    }

    /// Flushes our close reply (best effort) and drops the socket.
    async fn release_after_peer_close(&mut self) {
        self.state = SessionState::Closed;
        if let Some(mut stream) = self.stream.take() {
            let _ = timeout(self.close_timeout, stream.close(None)).await;
        }
    }

    fn set_state(&mut self, new_state: SessionState) -> Result<()> {
        if !self.is_valid_transition(new_state) {
            return Err(ProbeError::InvalidStateTransition {
                from: self.state.to_string(),
                to: new_state.to_string(),
            });
        }
        debug!(from = %self.state, to = %new_state, "session state");
        self.state = new_state;
        Ok(())
    }

    fn is_valid_transition(&self, new_state: SessionState) -> bool {
        use SessionState::*;

        matches!(
            (self.state, new_state),
            (Idle, Connecting)
                | (Connecting, Open)
                | (Connecting, Faulted)
                | (Open, Closed)
                | (Open, Faulted)
        )
    }
}

impl Drop for RelaySession {
    fn drop(&mut self) {
        self.cancel.cancel();
        if self.stream.take().is_some() {
            debug!(state = %self.state, "session dropped; connection released");
        }
    }
}

// Manual Debug implementation to skip the stream
impl std::fmt::Debug for RelaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelaySession")
            .field("base_url", &self.base_url)
            .field("state", &self.state)
            .field("connect_timeout", &self.connect_timeout)
            .field("close_timeout", &self.close_timeout)
            .finish()
    }
}

/// Opens the TCP connection, then runs the upgrade over it.
async fn open_upgrade(url: &str, display_url: &str) -> Result<WsStream> {
    let request = url
        .into_client_request()
        .map_err(|e| ProbeError::Handshake(error_chain(&e)))?;
    let addr = {
        let uri = request.uri();
        let host = uri
            .host()
            .ok_or_else(|| ProbeError::Handshake(format!("no host in {display_url}")))?;
        let port = uri
            .port_u16()
            .unwrap_or(if uri.scheme_str() == Some("wss") { 443 } else { 80 });
        format!("{host}:{port}")
    };

    let socket = TcpStream::connect(addr.as_str())
        .await
        .map_err(|e| ProbeError::Transport {
            url: display_url.to_string(),
            message: error_chain(&e),
        })?;

    let (stream, response) = client_async_tls(request, socket)
        .await
        .map_err(|e| ProbeError::Handshake(error_chain(&e)))?;
    debug!(status = %response.status(), "handshake complete");
    Ok(stream)
}

async fn close_handshake(
    stream: &mut WsStream,
    frame: CloseFrame<'static>,
) -> std::result::Result<(), WsError> {
    if let Err(e) = stream.close(Some(frame)).await {
        return settle_teardown(e);
    }
    // Drain until the peer's close reply ends the stream.
    while let Some(next) = stream.next().await {
        match next {
            Ok(_) => continue,
            Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => break,
            Err(e) => return settle_teardown(e),
        }
    }
    Ok(())
}

/// Once our close frame is out, a peer that drops the socket has finished the close.
fn settle_teardown(e: WsError) -> std::result::Result<(), WsError> {
    let dropped = match &e {
        WsError::Protocol(ProtocolError::ResetWithoutClosingHandshake) => true,
        WsError::Io(io) => matches!(
            io.kind(),
            ErrorKind::ConnectionReset
                | ErrorKind::ConnectionAborted
                | ErrorKind::BrokenPipe
                | ErrorKind::UnexpectedEof
        ),
        _ => false,
    };
    if dropped {
        debug!(error = %e, "peer dropped the connection without a close reply");
        Ok(())
    } else {
        Err(e)
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
