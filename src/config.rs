// =============================================================================
// Configuration — environment-supplied secrets and numeric parameters
// =============================================================================
//
// Secrets come from the environment (PF_API_KEY / PF_SECRET / PF_PASS);
// numeric parameters come from the environment with documented defaults.
// Every parameter is validated at startup so that a placeholder or nonsense
// value fails fast instead of surfacing mid-loop as a rejected order.
//
// There is no CLI surface and no persisted config file.
// =============================================================================

use crate::error::AgentError;
use crate::risk::RiskLimits;

// =============================================================================
// Environment helpers
// =============================================================================

fn env_string(name: &str) -> Result<String, AgentError> {
    std::env::var(name)
        .map_err(|_| AgentError::config(format!("{name} is not set")))
        .and_then(|v| {
            if v.trim().is_empty() {
                Err(AgentError::config(format!("{name} is empty")))
            } else {
                Ok(v)
            }
        })
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_f64_or(name: &str, default: f64) -> Result<f64, AgentError> {
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse::<f64>()
            .map_err(|_| AgentError::config(format!("{name} is not a number: {v:?}"))),
        Err(_) => Ok(default),
    }
}

fn env_u64_or(name: &str, default: u64) -> Result<u64, AgentError> {
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse::<u64>()
            .map_err(|_| AgentError::config(format!("{name} is not an integer: {v:?}"))),
        Err(_) => Ok(default),
    }
}

fn env_i64_or(name: &str, default: i64) -> Result<i64, AgentError> {
    match std::env::var(name) {
        Ok(v) => v
            .trim()
            .parse::<i64>()
            .map_err(|_| AgentError::config(format!("{name} is not an integer: {v:?}"))),
        Err(_) => Ok(default),
    }
}

/// REST base URL override, for pointing the agents at a staging gateway.
/// `None` selects the client's production default.
pub fn base_url_override() -> Option<String> {
    std::env::var("PF_BASE_URL").ok()
}

/// Market-data websocket endpoint.
pub fn ws_url() -> String {
    env_or("PF_WS_URL", "wss://futures.poloniex.com/endpoint")
}

// =============================================================================
// Credentials
// =============================================================================

/// Exchange API credentials. The secret and passphrase are never logged.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub secret: String,
    pub passphrase: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self, AgentError> {
        Ok(Self {
            api_key: env_string("PF_API_KEY")?,
            secret: env_string("PF_SECRET")?,
            passphrase: env_string("PF_PASS")?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

// =============================================================================
// Per-agent configuration
// =============================================================================

/// Parameters shared by the two directional (signal-driven) agents.
#[derive(Debug, Clone)]
pub struct DirectionalConfig {
    pub symbol: String,
    /// Client-order-ID prefix for operator traceability.
    pub prefix: String,
    pub leverage: u32,
    /// Fixed order size in lots for every actioned signal.
    pub trade_size: u64,
    /// Slippage fraction applied to the reference close (0.025 = 2.5 %).
    pub max_slippage: f64,
    /// Candle bucket width in milliseconds.
    pub interval_ms: i64,
    /// Tick-buffer cap; oldest ticks dropped beyond this.
    pub max_rows: usize,
    pub risk: RiskLimits,
}

impl DirectionalConfig {
    fn validate(&self) -> Result<(), AgentError> {
        if self.symbol.is_empty() {
            return Err(AgentError::config("SYMBOL is empty"));
        }
        if self.trade_size == 0 {
            return Err(AgentError::config("TRADE_SIZE must be positive"));
        }
        if !(self.max_slippage > 0.0 && self.max_slippage < 1.0) {
            return Err(AgentError::config(format!(
                "MAX_SLIPPAGE must be in (0, 1), got {}",
                self.max_slippage
            )));
        }
        if self.interval_ms <= 0 {
            return Err(AgentError::config("CANDLE_INTERVAL_MS must be positive"));
        }
        if self.max_rows < 2 {
            return Err(AgentError::config("MAX_ROWS must be at least 2"));
        }
        self.risk.validate()
    }
}

/// Dual-momentum agent configuration.
#[derive(Debug, Clone)]
pub struct MomentumConfig {
    pub base: DirectionalConfig,
    /// Index-price symbol for REST warm-up history (e.g. ".PXBTUSDT").
    pub index_symbol: String,
    pub slow_span: usize,
    pub fast_span: usize,
}

impl MomentumConfig {
    /// Defaults mirror the operator notes: 15 s candles, slow 16 / fast 4.
    pub fn from_env() -> Result<Self, AgentError> {
        let cfg = Self {
            base: DirectionalConfig {
                symbol: env_or("SYMBOL", "BTCUSDTPERP"),
                prefix: env_or("PREFIX", "POLO_MOM"),
                leverage: env_u64_or("LEVERAGE", 25)? as u32,
                trade_size: env_u64_or("TRADE_SIZE", 5)?,
                max_slippage: env_f64_or("MAX_SLIPPAGE", 0.025)?,
                interval_ms: env_i64_or("CANDLE_INTERVAL_MS", 15_000)?,
                max_rows: env_u64_or("MAX_ROWS", 500)? as usize,
                risk: RiskLimits {
                    long: env_i64_or("RISK_LIMIT_LONG", 500)?,
                    short: env_i64_or("RISK_LIMIT_SHORT", -500)?,
                },
            },
            index_symbol: env_or("INDEX_SYMBOL", ".PXBTUSDT"),
            slow_span: env_u64_or("SLOW_SIG", 16)? as usize,
            fast_span: env_u64_or("FAST_SIG", 4)? as usize,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), AgentError> {
        self.base.validate()?;
        if self.fast_span == 0 || self.slow_span == 0 {
            return Err(AgentError::config("momentum spans must be positive"));
        }
        if self.fast_span >= self.slow_span {
            return Err(AgentError::config(format!(
                "FAST_SIG ({}) must be smaller than SLOW_SIG ({})",
                self.fast_span, self.slow_span
            )));
        }
        Ok(())
    }
}

/// RSI / Bollinger %B agent configuration.
#[derive(Debug, Clone)]
pub struct RsiBbConfig {
    pub base: DirectionalConfig,
    pub rsi_span: usize,
    pub bb_span: usize,
}

impl RsiBbConfig {
    /// Defaults mirror the operator notes: 1 m candles, RSI 12 / BB 20.
    pub fn from_env() -> Result<Self, AgentError> {
        let cfg = Self {
            base: DirectionalConfig {
                symbol: env_or("SYMBOL", "BTCUSDTPERP"),
                prefix: env_or("PREFIX", "POLO_RSI"),
                leverage: env_u64_or("LEVERAGE", 25)? as u32,
                trade_size: env_u64_or("TRADE_SIZE", 50)?,
                max_slippage: env_f64_or("MAX_SLIPPAGE", 0.025)?,
                interval_ms: env_i64_or("CANDLE_INTERVAL_MS", 60_000)?,
                max_rows: env_u64_or("MAX_ROWS", 500)? as usize,
                risk: RiskLimits {
                    long: env_i64_or("RISK_LIMIT_LONG", 500)?,
                    short: env_i64_or("RISK_LIMIT_SHORT", -500)?,
                },
            },
            rsi_span: env_u64_or("RSI_SPAN", 12)? as usize,
            bb_span: env_u64_or("BB_SPAN", 20)? as usize,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), AgentError> {
        self.base.validate()?;
        if self.rsi_span == 0 || self.bb_span < 2 {
            return Err(AgentError::config(
                "RSI_SPAN must be positive and BB_SPAN at least 2",
            ));
        }
        Ok(())
    }
}

/// Ladder market-maker configuration.
#[derive(Debug, Clone)]
pub struct MarketMakerConfig {
    pub symbol: String,
    /// Client-order-ID prefix for operator traceability.
    pub prefix: String,
    pub leverage: u32,
    /// Seconds between quoting passes.
    pub loop_interval_secs: u64,
    /// Number of buy/sell pairs; 5 pairs = 10 resting orders.
    pub order_pairs: u64,
    /// Innermost spread as a fraction (0.001 = 0.1 %).
    pub min_spread: f64,
    /// Replacement sensitivity: live orders are repriced once their spread
    /// drifts beyond min_spread * (1 + spread_adjust).
    pub spread_adjust: f64,
    /// Lots added per ladder level (level k carries k * step_size lots).
    pub step_size: u64,
    pub risk: RiskLimits,
}

impl MarketMakerConfig {
    pub fn from_env() -> Result<Self, AgentError> {
        let cfg = Self {
            symbol: env_or("SYMBOL", "BTCUSDTPERP"),
            prefix: env_or("PREFIX", "POLO_MM"),
            leverage: env_u64_or("LEVERAGE", 25)? as u32,
            loop_interval_secs: env_u64_or("LOOP_INTERVAL_SECS", 15)?,
            order_pairs: env_u64_or("ORDER_PAIRS", 5)?,
            min_spread: env_f64_or("MIN_SPREAD", 0.001)?,
            spread_adjust: env_f64_or("SPREAD_ADJUST", 0.002)?,
            step_size: env_u64_or("STEP_SIZE", 5)?,
            risk: RiskLimits {
                long: env_i64_or("RISK_LIMIT_LONG", 2000)?,
                short: env_i64_or("RISK_LIMIT_SHORT", -2000)?,
            },
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        if self.symbol.is_empty() {
            return Err(AgentError::config("SYMBOL is empty"));
        }
        if self.order_pairs == 0 {
            return Err(AgentError::config("ORDER_PAIRS must be positive"));
        }
        if !(self.min_spread > 0.0 && self.min_spread < 1.0) {
            return Err(AgentError::config(format!(
                "MIN_SPREAD must be in (0, 1), got {}",
                self.min_spread
            )));
        }
        if self.spread_adjust < 0.0 {
            return Err(AgentError::config("SPREAD_ADJUST must be non-negative"));
        }
        if self.step_size == 0 {
            return Err(AgentError::config("STEP_SIZE must be positive"));
        }
        if self.loop_interval_secs == 0 {
            return Err(AgentError::config("LOOP_INTERVAL_SECS must be positive"));
        }
        self.risk.validate()
    }
}
