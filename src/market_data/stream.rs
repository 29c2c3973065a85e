// =============================================================================
// Market-data WebSocket stream — index and execution tick feeds
// =============================================================================
//
// Thin wrapper over the gateway websocket: connect, subscribe to a single
// topic, and yield parsed ticks. The stream returns `None` on disconnect so
// the caller owns the decision between reconnect and shutdown. Welcome/ack
// frames and unrelated topics are skipped silently; protocol pings are
// answered by tungstenite itself.
// =============================================================================

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::tick_buffer::Tick;

/// The two tick feeds the agents subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic<'a> {
    /// Index-price updates: `/contract/instrument:{symbol}`.
    Instrument(&'a str),
    /// Trade executions: `/contractMarket/execution:{symbol}`.
    Execution(&'a str),
}

impl Topic<'_> {
    pub fn as_string(&self) -> String {
        match self {
            Self::Instrument(symbol) => format!("/contract/instrument:{symbol}"),
            Self::Execution(symbol) => format!("/contractMarket/execution:{symbol}"),
        }
    }
}

/// A subscribed tick stream over one websocket connection.
pub struct TickStream {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    topic: String,
}

impl TickStream {
    /// Connect to `ws_url` and subscribe to `topic`.
    pub async fn connect(ws_url: &str, topic: Topic<'_>) -> Result<Self> {
        let topic = topic.as_string();
        info!(url = %ws_url, topic = %topic, "connecting to market-data WebSocket");

        let (mut ws, _response) = connect_async(ws_url)
            .await
            .context("failed to connect to market-data WebSocket")?;

        let subscribe = serde_json::json!({
            "id": chrono::Utc::now().timestamp_millis(),
            "type": "subscribe",
            "topic": topic,
            "response": true,
        });
        ws.send(Message::Text(subscribe.to_string()))
            .await
            .context("failed to send subscribe request")?;

        info!(topic = %topic, "subscribed");
        Ok(Self { ws, topic })
    }

    /// Next tick on the subscribed topic, or `None` once the stream ends.
    /// A transport error also ends the stream after logging.
    pub async fn next_tick(&mut self) -> Option<Tick> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => match parse_tick_message(&text, &self.topic) {
                    Ok(Some(tick)) => return Some(tick),
                    Ok(None) => continue, // ack / welcome / other topic
                    Err(e) => {
                        warn!(error = %e, "failed to parse stream message");
                        continue;
                    }
                },
                Some(Ok(_)) => continue, // ping / pong / binary frames
                Some(Err(e)) => {
                    warn!(topic = %self.topic, error = %e, "WebSocket read error");
                    return None;
                }
                None => {
                    warn!(topic = %self.topic, "WebSocket stream ended");
                    return None;
                }
            }
        }
    }

    /// Unsubscribe and close the transport. Part of the shutdown sequence.
    pub async fn close(mut self) {
        let unsubscribe = serde_json::json!({
            "id": chrono::Utc::now().timestamp_millis(),
            "type": "unsubscribe",
            "topic": self.topic,
        });
        if let Err(e) = self.ws.send(Message::Text(unsubscribe.to_string())).await {
            warn!(error = %e, "failed to send unsubscribe before close");
        }
        if let Err(e) = self.ws.close(None).await {
            warn!(error = %e, "failed to close WebSocket cleanly");
        }
        debug!(topic = %self.topic, "WebSocket closed");
    }
}

/// Parse one stream message into a tick.
///
/// Index updates carry `data.indexPrice` with a millisecond `timestamp`;
/// execution fills carry a string `price`, a `size` in lots and a nanosecond
/// `ts`. Anything else — welcome, ack, another topic — yields `Ok(None)`.
fn parse_tick_message(text: &str, topic: &str) -> Result<Option<Tick>> {
    let root: serde_json::Value =
        serde_json::from_str(text).context("failed to parse stream JSON")?;

    match root["topic"].as_str() {
        Some(t) if t == topic => {}
        _ => return Ok(None),
    }

    let data = &root["data"];

    if let Some(index_price) = value_f64(&data["indexPrice"]) {
        let ts = data["timestamp"]
            .as_i64()
            .or_else(|| data["ts"].as_i64().map(|ns| ns / 1_000_000))
            .context("index tick missing timestamp")?;
        return Ok(Some(Tick {
            timestamp_ms: ts,
            price: index_price,
            size: None,
        }));
    }

    if let Some(price) = value_f64(&data["price"]) {
        let ts_ns = data["ts"].as_i64().context("execution tick missing ts")?;
        return Ok(Some(Tick {
            timestamp_ms: ts_ns / 1_000_000,
            price,
            size: data["size"].as_f64(),
        }));
    }

    // Instrument messages also publish mark price / funding updates without
    // an index price; those are not ticks.
    Ok(None)
}

fn value_f64(val: &serde_json::Value) -> Option<f64> {
    match val {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTRUMENT_TOPIC: &str = "/contract/instrument:BTCUSDTPERP";
    const EXECUTION_TOPIC: &str = "/contractMarket/execution:BTCUSDTPERP";

    #[test]
    fn topic_strings() {
        assert_eq!(
            Topic::Instrument("BTCUSDTPERP").as_string(),
            INSTRUMENT_TOPIC
        );
        assert_eq!(Topic::Execution("BTCUSDTPERP").as_string(), EXECUTION_TOPIC);
    }

    #[test]
    fn parses_index_tick() {
        let msg = r#"{
            "topic": "/contract/instrument:BTCUSDTPERP",
            "subject": "mark.index.price",
            "data": { "indexPrice": 37020.5, "timestamp": 1700000000000 }
        }"#;
        let tick = parse_tick_message(msg, INSTRUMENT_TOPIC).unwrap().unwrap();
        assert_eq!(tick.timestamp_ms, 1_700_000_000_000);
        assert!((tick.price - 37_020.5).abs() < f64::EPSILON);
        assert!(tick.size.is_none());
    }

    #[test]
    fn parses_execution_tick_with_nanosecond_ts() {
        let msg = r#"{
            "topic": "/contractMarket/execution:BTCUSDTPERP",
            "data": { "price": "37020.5", "size": 3, "ts": 1700000000000000000 }
        }"#;
        let tick = parse_tick_message(msg, EXECUTION_TOPIC).unwrap().unwrap();
        assert_eq!(tick.timestamp_ms, 1_700_000_000_000);
        assert_eq!(tick.size, Some(3.0));
    }

    #[test]
    fn other_topics_are_skipped() {
        let msg = r#"{
            "topic": "/contract/instrument:ETHUSDTPERP",
            "data": { "indexPrice": 2000.0, "timestamp": 1 }
        }"#;
        assert!(parse_tick_message(msg, INSTRUMENT_TOPIC).unwrap().is_none());
    }

    #[test]
    fn ack_frames_are_skipped() {
        let msg = r#"{ "id": "1", "type": "ack" }"#;
        assert!(parse_tick_message(msg, INSTRUMENT_TOPIC).unwrap().is_none());
    }

    #[test]
    fn funding_updates_without_index_price_are_skipped() {
        let msg = r#"{
            "topic": "/contract/instrument:BTCUSDTPERP",
            "subject": "funding.rate",
            "data": { "fundingRate": 0.0001, "timestamp": 1 }
        }"#;
        assert!(parse_tick_message(msg, INSTRUMENT_TOPIC).unwrap().is_none());
    }
}
