// =============================================================================
// Error taxonomy
// =============================================================================
//
// Three failure classes with very different handling:
//   Config  — invalid or placeholder parameter. Detected before trading
//             starts; the process refuses to run.
//   Gateway — transient REST/WS failure. The current pass is skipped and
//             logged; the loop continues on the next event.
//   Stream  — the market-data subscription died irrecoverably. Triggers the
//             shutdown sequence (cancel-all, disconnect, exit).
//
// A breached risk limit is deliberately NOT an error: it is a gating decision
// (see risk.rs) that suppresses one order and logs.
// =============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Bad or unset parameter. Must surface at startup, never mid-loop.
    #[error("config error: {0}")]
    Config(String),

    /// Transient trading-gateway failure; skip the pass and retry next event.
    #[error("gateway error: {0}")]
    Gateway(String),

    /// Market-data stream lost irrecoverably; run the shutdown sequence.
    #[error("stream error: {0}")]
    Stream(String),
}

impl AgentError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn gateway(msg: impl Into<String>) -> Self {
        Self::Gateway(msg.into())
    }

    /// True when one bad pass should be swallowed rather than crash the loop.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Gateway(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_is_recoverable() {
        assert!(AgentError::gateway("timeout").is_recoverable());
        assert!(!AgentError::config("unset spread").is_recoverable());
        assert!(!AgentError::Stream("ws closed".into()).is_recoverable());
    }

    #[test]
    fn display_includes_class() {
        let e = AgentError::config("MIN_SPREAD not set");
        assert!(e.to_string().starts_with("config error:"));
    }
}
