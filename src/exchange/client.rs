// =============================================================================
// Futures gateway REST client — HMAC-SHA256 signed requests
// =============================================================================
//
// SECURITY: the secret and passphrase are never logged or serialized. Signed
// requests carry PF-API-KEY / PF-API-TIMESTAMP / PF-API-PASSPHRASE headers
// plus a PF-API-SIGN signature over `timestamp + method + path + body`.
//
// Every call has a 10 s client-level timeout so a hung gateway cannot stall
// a reconciliation pass indefinitely; the run loop treats a timeout as a
// transient failure and skips to the next event.
// =============================================================================

use anyhow::{Context, Result};
use hmac::{Hmac, Mac};
use reqwest::header::{HeaderMap, HeaderValue};
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument, warn};

use crate::market_data::Tick;
use crate::types::{LiveOrder, Position, Side};

type HmacSha256 = Hmac<Sha256>;

const DEFAULT_BASE_URL: &str = "https://futures.poloniex.com";

/// Parameters for a new limit order.
#[derive(Debug, Clone)]
pub struct LimitOrderRequest {
    pub symbol: String,
    pub side: Side,
    pub leverage: u32,
    pub size: u64,
    /// Gateway expects price as a string.
    pub price: String,
    pub post_only: bool,
    pub client_oid: Option<String>,
}

/// Signed REST client for the perpetual-futures gateway.
#[derive(Clone)]
pub struct FuturesClient {
    secret: String,
    passphrase: String,
    base_url: String,
    client: reqwest::Client,
}

impl FuturesClient {
    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    /// Create a new client. `base_url` falls back to the production gateway
    /// when `None` (tests point it at a local server).
    pub fn new(
        api_key: impl Into<String>,
        secret: impl Into<String>,
        passphrase: impl Into<String>,
        base_url: Option<String>,
    ) -> Self {
        // The API key rides along on every request as a default header.
        let api_key: String = api_key.into();
        let mut default_headers = HeaderMap::new();
        if let Ok(val) = HeaderValue::from_str(&api_key) {
            default_headers.insert("PF-API-KEY", val);
        }

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .timeout(Duration::from_secs(10))
            .build()
            .expect("failed to build reqwest client");

        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        debug!(base_url = %base_url, "FuturesClient initialised");

        Self {
            secret: secret.into(),
            passphrase: passphrase.into(),
            base_url,
            client,
        }
    }

    // -------------------------------------------------------------------------
    // Signing helpers
    // -------------------------------------------------------------------------

    /// Produce an HMAC-SHA256 hex signature of `payload`.
    pub fn sign(&self, payload: &str) -> String {
        let mut mac =
            HmacSha256::new_from_slice(self.secret.as_bytes()).expect("HMAC accepts any key size");
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Current UNIX timestamp in milliseconds.
    pub fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before UNIX epoch")
            .as_millis() as u64
    }

    /// Build the auth headers for one signed request. The signature covers
    /// `timestamp + method + path_with_query + body`.
    fn auth_headers(&self, method: &str, path: &str, body: &str) -> HeaderMap {
        let ts = Self::timestamp_ms().to_string();
        let sig = self.sign(&format!("{ts}{method}{path}{body}"));

        let mut headers = HeaderMap::new();
        for (name, value) in [
            ("PF-API-SIGN", sig.as_str()),
            ("PF-API-TIMESTAMP", ts.as_str()),
            ("PF-API-PASSPHRASE", self.passphrase.as_str()),
        ] {
            if let Ok(val) = HeaderValue::from_str(value) {
                headers.insert(name, val);
            }
        }
        headers
    }

    /// Send a signed request and unwrap the gateway's `{code, data}` envelope.
    async fn signed_request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let body_str = body.as_ref().map(|b| b.to_string()).unwrap_or_default();
        let headers = self.auth_headers(method.as_str(), path, &body_str);
        let url = format!("{}{}", self.base_url, path);

        let mut req = self.client.request(method.clone(), &url).headers(headers);
        if let Some(b) = body {
            req = req.json(&b);
        }

        let resp = req
            .send()
            .await
            .with_context(|| format!("{method} {path} request failed"))?;

        let status = resp.status();
        let payload: serde_json::Value = resp
            .json()
            .await
            .with_context(|| format!("failed to parse {path} response"))?;

        if !status.is_success() {
            anyhow::bail!("gateway {method} {path} returned {status}: {payload}");
        }

        Ok(payload["data"].clone())
    }

    // -------------------------------------------------------------------------
    // Positions
    // -------------------------------------------------------------------------

    /// GET /api/v1/position (signed) — current position snapshot.
    #[instrument(skip(self), name = "gateway::get_position")]
    pub async fn get_position(&self, symbol: &str) -> Result<Position> {
        let path = format!("/api/v1/position?symbol={symbol}");
        let data = self
            .signed_request(reqwest::Method::GET, &path, None)
            .await?;

        let position = Position {
            current_qty: data["currentQty"].as_i64().unwrap_or(0),
            avg_entry_price: parse_f64_lenient(&data["avgEntryPrice"]),
            liquidation_price: parse_f64_lenient(&data["liquidationPrice"]),
            unrealized_pnl_pct: parse_f64_lenient(&data["unrealisedRoePcnt"]),
        };
        debug!(symbol, qty = position.current_qty, "position retrieved");
        Ok(position)
    }

    // -------------------------------------------------------------------------
    // Orders
    // -------------------------------------------------------------------------

    /// GET /api/v1/orders?status=active (signed) — live open orders.
    #[instrument(skip(self), name = "gateway::get_open_orders")]
    pub async fn get_open_orders(&self, symbol: &str) -> Result<Vec<LiveOrder>> {
        let path = format!("/api/v1/orders?status=active&symbol={symbol}");
        let data = self
            .signed_request(reqwest::Method::GET, &path, None)
            .await?;

        let items = data["items"].as_array().cloned().unwrap_or_default();
        let mut orders = Vec::with_capacity(items.len());

        for item in &items {
            match parse_live_order(item) {
                Ok(order) => orders.push(order),
                Err(e) => warn!(error = %e, "skipping malformed open order"),
            }
        }

        debug!(symbol, count = orders.len(), "open orders retrieved");
        Ok(orders)
    }

    /// POST /api/v1/orders (signed) — submit a limit order.
    ///
    /// Returns the server-assigned order ID. A rejected order (bad price or
    /// size, post-only cross) surfaces as an error with the gateway body.
    #[instrument(skip(self, req), name = "gateway::create_limit_order")]
    pub async fn create_limit_order(&self, req: &LimitOrderRequest) -> Result<String> {
        let mut body = serde_json::json!({
            "symbol": req.symbol,
            "side": req.side.as_str(),
            "type": "limit",
            "leverage": req.leverage.to_string(),
            "size": req.size,
            "price": req.price,
            "postOnly": req.post_only,
        });
        if let Some(oid) = &req.client_oid {
            body["clientOid"] = serde_json::json!(oid);
        }

        debug!(
            symbol = %req.symbol,
            side = %req.side,
            size = req.size,
            price = %req.price,
            post_only = req.post_only,
            "placing limit order"
        );

        let data = self
            .signed_request(reqwest::Method::POST, "/api/v1/orders", Some(body))
            .await?;

        data["orderId"]
            .as_str()
            .map(str::to_string)
            .context("order response missing orderId")
    }

    /// DELETE /api/v1/orders/{id} (signed) — cancel one order.
    #[instrument(skip(self), name = "gateway::cancel_order")]
    pub async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let path = format!("/api/v1/orders/{order_id}");
        self.signed_request(reqwest::Method::DELETE, &path, None)
            .await?;
        debug!(order_id, "order cancelled");
        Ok(())
    }

    /// DELETE /api/v1/orders?symbol= (signed) — cancel every resting limit
    /// order for the symbol. Part of the shutdown sequence.
    #[instrument(skip(self), name = "gateway::cancel_all_limit_orders")]
    pub async fn cancel_all_limit_orders(&self, symbol: &str) -> Result<()> {
        let path = format!("/api/v1/orders?symbol={symbol}");
        self.signed_request(reqwest::Method::DELETE, &path, None)
            .await?;
        debug!(symbol, "all limit orders cancelled");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Public market data (warm-up)
    // -------------------------------------------------------------------------

    /// GET /api/v1/index/query — recent index-price points for warm-up,
    /// oldest first.
    #[instrument(skip(self), name = "gateway::get_index_history")]
    pub async fn get_index_history(&self, index_symbol: &str, max_count: u32) -> Result<Vec<Tick>> {
        let path = format!("/api/v1/index/query?indexSymbol={index_symbol}&maxCount={max_count}");
        let data = self
            .signed_request(reqwest::Method::GET, &path, None)
            .await?;

        let points = data["dataList"].as_array().cloned().unwrap_or_default();
        let mut ticks: Vec<Tick> = points
            .iter()
            .filter_map(|p| {
                let ts = p["timePoint"].as_i64()?;
                let price = parse_f64_value(&p["value"])?;
                Some(Tick {
                    timestamp_ms: ts,
                    price,
                    size: None,
                })
            })
            .collect();
        ticks.sort_by_key(|t| t.timestamp_ms);

        debug!(index_symbol, count = ticks.len(), "index history fetched");
        Ok(ticks)
    }

    /// GET /api/v1/trade/history — most recent fills for warm-up, oldest
    /// first. Trade timestamps arrive in nanoseconds.
    #[instrument(skip(self), name = "gateway::get_trade_history")]
    pub async fn get_trade_history(&self, symbol: &str) -> Result<Vec<Tick>> {
        let path = format!("/api/v1/trade/history?symbol={symbol}");
        let data = self
            .signed_request(reqwest::Method::GET, &path, None)
            .await?;

        let fills = data.as_array().cloned().unwrap_or_default();
        let mut ticks: Vec<Tick> = fills
            .iter()
            .filter_map(|f| {
                let ts_ns = f["ts"].as_i64()?;
                let price = parse_f64_value(&f["price"])?;
                let size = f["size"].as_f64();
                Some(Tick {
                    timestamp_ms: ts_ns / 1_000_000,
                    price,
                    size,
                })
            })
            .collect();
        ticks.sort_by_key(|t| t.timestamp_ms);

        debug!(symbol, count = ticks.len(), "trade history fetched");
        Ok(ticks)
    }

    /// GET /api/v1/mark-price/{symbol}/current — current index price, used
    /// to seed the market maker before the stream delivers its first tick.
    #[instrument(skip(self), name = "gateway::get_index_price")]
    pub async fn get_index_price(&self, symbol: &str) -> Result<f64> {
        let path = format!("/api/v1/mark-price/{symbol}/current");
        let data = self
            .signed_request(reqwest::Method::GET, &path, None)
            .await?;

        parse_f64_value(&data["indexPrice"]).context("mark-price response missing indexPrice")
    }
}

// -----------------------------------------------------------------------------
// Parsing helpers — the gateway mixes JSON numbers and numeric strings
// -----------------------------------------------------------------------------

fn parse_f64_value(val: &serde_json::Value) -> Option<f64> {
    match val {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

fn parse_f64_lenient(val: &serde_json::Value) -> f64 {
    parse_f64_value(val).unwrap_or(0.0)
}

fn parse_live_order(item: &serde_json::Value) -> Result<LiveOrder> {
    let id = item["id"]
        .as_str()
        .context("open order missing id")?
        .to_string();
    let side = match item["side"].as_str() {
        Some("buy") => Side::Buy,
        Some("sell") => Side::Sell,
        other => anyhow::bail!("open order has unexpected side: {other:?}"),
    };
    let price = parse_f64_value(&item["price"]).context("open order missing price")?;
    let size = item["size"].as_u64().context("open order missing size")?;

    Ok(LiveOrder {
        id,
        client_id: item["clientOid"].as_str().unwrap_or_default().to_string(),
        side,
        price,
        size,
        status: item["status"].as_str().unwrap_or("active").to_string(),
    })
}

impl std::fmt::Debug for FuturesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuturesClient")
            .field("secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> FuturesClient {
        FuturesClient::new("key", "secret", "pass", None)
    }

    #[test]
    fn signature_is_hex_and_deterministic() {
        let c = client();
        let a = c.sign("1700000000000GET/api/v1/position?symbol=BTCUSDTPERP");
        let b = c.sign("1700000000000GET/api/v1/position?symbol=BTCUSDTPERP");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }

    #[test]
    fn debug_redacts_credentials() {
        let c = FuturesClient::new("key-123", "hunter2-secret", "passphrase-xyz", None);
        let rendered = format!("{c:?}");
        assert!(!rendered.contains("hunter2-secret"));
        assert!(!rendered.contains("passphrase-xyz"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn parse_live_order_ok() {
        let item = serde_json::json!({
            "id": "5e8c8c2f1a2b3c",
            "clientOid": "POLO_MM-s25at10050ts1700000000",
            "side": "sell",
            "price": "10050",
            "size": 25,
            "status": "active"
        });
        let order = parse_live_order(&item).unwrap();
        assert_eq!(order.side, Side::Sell);
        assert!((order.price - 10_050.0).abs() < f64::EPSILON);
        assert_eq!(order.size, 25);
    }

    #[test]
    fn parse_live_order_rejects_bad_side() {
        let item = serde_json::json!({
            "id": "x", "side": "short", "price": "1", "size": 1
        });
        assert!(parse_live_order(&item).is_err());
    }

    #[test]
    fn lenient_parse_handles_strings_and_numbers() {
        assert_eq!(parse_f64_lenient(&serde_json::json!("10.5")), 10.5);
        assert_eq!(parse_f64_lenient(&serde_json::json!(10.5)), 10.5);
        assert_eq!(parse_f64_lenient(&serde_json::json!(null)), 0.0);
    }
}
