//! WebSocket test client.
//!
//! Wraps a tokio-tungstenite stream and speaks the lane protocol: requests
//! go out as JSON text frames, events come back decoded into
//! [`ServerEvent`]s. Every receive is bounded by a timeout so a missing
//! event fails the test instead of hanging it.

use crate::server_harness::TestLaneServer;
use futures_util::{SinkExt, StreamExt};
use lane_protocol::{decode_event, ClientRequest, ServerEvent};
use serde_json::Value;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// How long [`TestWsClient::recv_event`] waits before giving up.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// A connected `/ws` or `/tracker` socket.
pub struct TestWsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestWsClient {
    /// Open a socket to `url` without consuming any greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails.
    pub async fn connect(url: &str) -> Result<Self, anyhow::Error> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| anyhow::anyhow!("WebSocket connect to {url} failed: {e}"))?;
        Ok(Self { stream })
    }

    /// Open a client socket and consume its `connected` greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails or the first event is not
    /// the greeting.
    pub async fn client(server: &TestLaneServer) -> Result<Self, anyhow::Error> {
        let mut client = Self::connect(&server.ws_url()).await?;
        let greeting = client.recv_event().await?;
        if greeting != ServerEvent::connected() {
            anyhow::bail!("Expected connected greeting, got {greeting:?}");
        }
        Ok(client)
    }

    /// Open a tracker socket. Trackers receive no greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake fails.
    pub async fn tracker(server: &TestLaneServer) -> Result<Self, anyhow::Error> {
        Self::connect(&server.tracker_url()).await
    }

    /// Send a raw text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket is closed.
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), anyhow::Error> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| anyhow::anyhow!("WebSocket send failed: {e}"))
    }

    /// Send a raw binary frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket is closed.
    pub async fn send_binary(&mut self, bytes: Vec<u8>) -> Result<(), anyhow::Error> {
        self.stream
            .send(Message::Binary(bytes))
            .await
            .map_err(|e| anyhow::anyhow!("WebSocket send failed: {e}"))
    }

    /// Send an arbitrary JSON value (tracker payloads, hand-built frames).
    ///
    /// # Errors
    ///
    /// Returns an error if the socket is closed.
    pub async fn send_json(&mut self, value: &Value) -> Result<(), anyhow::Error> {
        self.send_text(value.to_string()).await
    }

    /// Send a typed client request.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or the socket is closed.
    pub async fn send_request(&mut self, request: &ClientRequest) -> Result<(), anyhow::Error> {
        let text = serde_json::to_string(request)
            .map_err(|e| anyhow::anyhow!("Failed to encode {}: {e}", request.name()))?;
        self.send_text(text).await
    }

    /// Wait for the next event.
    ///
    /// # Errors
    ///
    /// Returns an error on timeout, close, or an undecodable frame.
    pub async fn recv_event(&mut self) -> Result<ServerEvent, anyhow::Error> {
        self.recv_within(RECV_TIMEOUT)
            .await?
            .ok_or_else(|| anyhow::anyhow!("No event within {RECV_TIMEOUT:?}"))
    }

    /// Skip events until one with the given wire name arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket times out or closes first.
    pub async fn recv_named(&mut self, name: &str) -> Result<ServerEvent, anyhow::Error> {
        loop {
            let event = self.recv_event().await?;
            if event.name() == name {
                return Ok(event);
            }
        }
    }

    /// Assert that nothing arrives for `wait`.
    ///
    /// # Errors
    ///
    /// Returns an error naming the event if one does arrive.
    pub async fn expect_silence(&mut self, wait: Duration) -> Result<(), anyhow::Error> {
        match self.recv_within(wait).await? {
            None => Ok(()),
            Some(event) => anyhow::bail!("Expected no event, got {event:?}"),
        }
    }

    /// Wait until the server closes the socket.
    ///
    /// # Errors
    ///
    /// Returns an error if an event arrives or the socket stays open.
    pub async fn expect_closed(&mut self) -> Result<(), anyhow::Error> {
        loop {
            match tokio::time::timeout(RECV_TIMEOUT, self.stream.next()).await {
                Err(_) => anyhow::bail!("Socket still open after {RECV_TIMEOUT:?}"),
                Ok(None | Some(Ok(Message::Close(_)) | Err(_))) => return Ok(()),
                Ok(Some(Ok(Message::Text(text)))) => {
                    anyhow::bail!("Expected close, got frame {text}")
                }
                Ok(Some(Ok(_))) => {}
            }
        }
    }

    /// Close the socket from the client side.
    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }

    /// `Ok(None)` means the wait elapsed with nothing received.
    async fn recv_within(&mut self, wait: Duration) -> Result<Option<ServerEvent>, anyhow::Error> {
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            let frame = match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Err(_) => return Ok(None),
                Ok(None) => anyhow::bail!("Socket closed by server"),
                Ok(Some(Err(e))) => anyhow::bail!("WebSocket read failed: {e}"),
                Ok(Some(Ok(frame))) => frame,
            };

            match frame {
                Message::Text(text) => {
                    return decode_event(&text)
                        .map(Some)
                        .map_err(|e| anyhow::anyhow!("Undecodable event {text}: {e}"));
                }
                Message::Close(_) => anyhow::bail!("Socket closed by server"),
                _ => {}
            }
        }
    }
}
