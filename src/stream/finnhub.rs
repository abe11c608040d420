//! Finnhub WebSocket transport.
//!
//! Thin client over the Finnhub trade stream: connect, send one subscribe
//! frame per instrument, surface raw text frames upward. Protocol pings
//! are answered here; everything else (parsing, routing, reconnects) is
//! the coordinator's business.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use super::transport::{Transport, TransportError};

const FINNHUB_WS_URL: &str = "wss://ws.finnhub.io";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Subscription request frame, e.g. `{"type":"subscribe","symbol":"..."}`.
#[derive(Debug, Serialize)]
struct SubscribeRequest<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    symbol: &'a str,
}

pub struct FinnhubTransport {
    url: String,
    write: Option<SplitSink<WsStream, Message>>,
    read: Option<SplitStream<WsStream>>,
}

impl FinnhubTransport {
    pub fn new(api_key: &str) -> Self {
        Self::with_url(format!("{}?token={}", FINNHUB_WS_URL, api_key))
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_url(url: String) -> Self {
        Self {
            url,
            write: None,
            read: None,
        }
    }
}

#[async_trait]
impl Transport for FinnhubTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        let (stream, _response) = timeout(CONNECT_TIMEOUT, connect_async(self.url.as_str()))
            .await
            .map_err(|_| TransportError::Timeout)?
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        let (write, read) = stream.split();
        self.write = Some(write);
        self.read = Some(read);
        log::debug!("websocket established");
        Ok(())
    }

    async fn subscribe(&mut self, symbol: &str) -> Result<(), TransportError> {
        let write = self
            .write
            .as_mut()
            .ok_or_else(|| TransportError::Connection("subscribe before connect".to_string()))?;
        let request = SubscribeRequest {
            kind: "subscribe",
            symbol,
        };
        let frame = serde_json::to_string(&request)
            .map_err(|e| TransportError::Stream(e.to_string()))?;
        write
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| TransportError::Stream(e.to_string()))?;
        Ok(())
    }

    async fn next_message(&mut self) -> Result<Option<String>, TransportError> {
        loop {
            let read = self
                .read
                .as_mut()
                .ok_or_else(|| TransportError::Connection("stream before connect".to_string()))?;
            match read.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.to_string())),
                Some(Ok(Message::Ping(payload))) => {
                    // Keepalive; a failed pong will surface as a read error.
                    if let Some(write) = self.write.as_mut() {
                        let _ = write.send(Message::Pong(payload)).await;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    return Err(TransportError::Stream(format!(
                        "server closed the stream: {:?}",
                        frame
                    )));
                }
                // Binary and pong frames carry no trades.
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(TransportError::Stream(e.to_string())),
                None => return Ok(None),
            }
        }
    }
}
