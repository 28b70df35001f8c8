//! Reconnection policy.
//!
//! ```text
//! Idle -> Connecting -> Open -> Erroring -> ReconnectWait -> Connecting ...
//!                 \__________________/
//!                  (connect failure)
//! any non-terminal state -> Closed           (disable / drop)
//! Erroring -> Exhausted                      (max_attempts reached)
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

/// Delay growth between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReconnectStrategy {
    /// Same delay every time
    #[default]
    Fixed,
    /// Delay multiplies after each consecutive failure, up to `max_delay_ms`
    Exponential,
}

impl FromStr for ReconnectStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fixed" => Ok(ReconnectStrategy::Fixed),
            "exponential" => Ok(ReconnectStrategy::Exponential),
            _ => Err(format!("Invalid reconnect strategy: {}", s)),
        }
    }
}

/// Configuration for stream reconnection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    pub strategy: ReconnectStrategy,
    /// Delay before the first reconnect (and every reconnect when fixed)
    pub delay_ms: u64,
    /// Upper bound for exponential delays
    pub max_delay_ms: u64,
    /// Growth factor for exponential delays
    pub multiplier: f64,
    /// Consecutive failures before giving up; unbounded when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            strategy: ReconnectStrategy::Fixed,
            delay_ms: 5000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
            max_attempts: None,
        }
    }
}

impl ReconnectConfig {
    /// Fixed delay, unbounded retries.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            delay_ms: delay.as_millis() as u64,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.delay_ms == 0 {
            return Err(ConfigError::Validation {
                field: "stream.reconnect.delay_ms".to_string(),
                message: "delay must be non-zero".to_string(),
            });
        }
        if self.strategy == ReconnectStrategy::Exponential {
            if self.multiplier < 1.0 || !self.multiplier.is_finite() {
                return Err(ConfigError::Validation {
                    field: "stream.reconnect.multiplier".to_string(),
                    message: "multiplier must be a finite value >= 1.0".to_string(),
                });
            }
            if self.max_delay_ms < self.delay_ms {
                return Err(ConfigError::Validation {
                    field: "stream.reconnect.max_delay_ms".to_string(),
                    message: "max delay must be >= delay".to_string(),
                });
            }
        }
        if self.max_attempts == Some(0) {
            return Err(ConfigError::Validation {
                field: "stream.reconnect.max_attempts".to_string(),
                message: "max attempts must be at least 1 when set".to_string(),
            });
        }
        Ok(())
    }
}

/// Connection lifecycle of one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    Idle,
    Connecting,
    Open,
    Erroring,
    ReconnectWait,
    /// Disabled or dropped by the consumer
    Closed,
    /// Retry budget used up
    Exhausted,
}

impl LinkState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LinkState::Closed | LinkState::Exhausted)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LinkState::Idle => "idle",
            LinkState::Connecting => "connecting",
            LinkState::Open => "open",
            LinkState::Erroring => "erroring",
            LinkState::ReconnectWait => "reconnect-wait",
            LinkState::Closed => "closed",
            LinkState::Exhausted => "exhausted",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid link transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: LinkState,
    pub to: LinkState,
}

/// What to do after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait this long, then connect again
    RetryAfter(Duration),
    /// Stop; the link is exhausted
    GiveUp,
}

/// Drives [`LinkState`] and computes retry delays.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    state: LinkState,
    consecutive_failures: u32,
    total_attempts: u64,
}

impl ReconnectPolicy {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            state: LinkState::Idle,
            consecutive_failures: 0,
            total_attempts: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Connection attempts started since creation.
    pub fn total_attempts(&self) -> u64 {
        self.total_attempts
    }

    fn transition(&mut self, to: LinkState) -> Result<(), InvalidTransition> {
        use LinkState::*;
        let allowed = match (self.state, to) {
            (Idle | ReconnectWait, Connecting) => true,
            (Connecting, Open) => true,
            (Connecting | Open, Erroring) => true,
            (Erroring, ReconnectWait | Exhausted) => true,
            (from, Closed) => !from.is_terminal(),
            _ => false,
        };
        if !allowed {
            return Err(InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        Ok(())
    }

    /// A new transport is about to be constructed.
    pub fn begin_connect(&mut self) -> Result<(), InvalidTransition> {
        self.transition(LinkState::Connecting)?;
        self.total_attempts += 1;
        Ok(())
    }

    /// The transport is established. The failure streak is kept until an
    /// event arrives, so a server that accepts and hangs up at once still
    /// counts against `max_attempts`.
    pub fn opened(&mut self) -> Result<(), InvalidTransition> {
        self.transition(LinkState::Open)
    }

    /// An event arrived on the open transport; the failure streak resets.
    pub fn received(&mut self) {
        if self.state == LinkState::Open {
            self.consecutive_failures = 0;
        }
    }

    /// The transport failed (before or after opening). The failed transport
    /// must already be dropped by the caller.
    pub fn failed(&mut self) -> Result<RetryDecision, InvalidTransition> {
        self.transition(LinkState::Erroring)?;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        if let Some(max) = self.config.max_attempts {
            if self.consecutive_failures >= max {
                self.transition(LinkState::Exhausted)?;
                return Ok(RetryDecision::GiveUp);
            }
        }

        self.transition(LinkState::ReconnectWait)?;
        Ok(RetryDecision::RetryAfter(self.delay_for(self.consecutive_failures)))
    }

    /// Consumer disabled or dropped the subscription. Idempotent.
    pub fn close(&mut self) {
        if !self.state.is_terminal() {
            self.state = LinkState::Closed;
        }
    }

    /// Delay to wait after the `failures`-th consecutive failure (1-based).
    pub fn delay_for(&self, failures: u32) -> Duration {
        let base = self.config.delay_ms;
        let ms = match self.config.strategy {
            ReconnectStrategy::Fixed => base,
            ReconnectStrategy::Exponential => {
                let exp = failures.saturating_sub(1).min(63) as i32;
                let scaled = base as f64 * self.config.multiplier.powi(exp);
                if scaled.is_finite() {
                    (scaled as u64).min(self.config.max_delay_ms)
                } else {
                    self.config.max_delay_ms
                }
            }
        };
        Duration::from_millis(ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exponential(delay_ms: u64, max_delay_ms: u64) -> ReconnectConfig {
        ReconnectConfig {
            strategy: ReconnectStrategy::Exponential,
            delay_ms,
            max_delay_ms,
            multiplier: 2.0,
            max_attempts: None,
        }
    }

    #[test]
    fn test_default_is_fixed_five_seconds_unbounded() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
        for _ in 0..20 {
            policy.begin_connect().unwrap();
            assert_eq!(
                policy.failed().unwrap(),
                RetryDecision::RetryAfter(Duration::from_secs(5))
            );
            assert_eq!(policy.state(), LinkState::ReconnectWait);
        }
        assert_eq!(policy.total_attempts(), 20);
    }

    #[test]
    fn test_full_cycle_states() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
        assert_eq!(policy.state(), LinkState::Idle);
        policy.begin_connect().unwrap();
        assert_eq!(policy.state(), LinkState::Connecting);
        policy.opened().unwrap();
        assert_eq!(policy.state(), LinkState::Open);
        policy.failed().unwrap();
        assert_eq!(policy.state(), LinkState::ReconnectWait);
        policy.begin_connect().unwrap();
        assert_eq!(policy.state(), LinkState::Connecting);
    }

    #[test]
    fn test_first_event_resets_failure_streak() {
        let mut policy = ReconnectPolicy::new(exponential(100, 10_000));
        policy.begin_connect().unwrap();
        policy.failed().unwrap();
        policy.begin_connect().unwrap();
        policy.failed().unwrap();
        assert_eq!(policy.consecutive_failures(), 2);

        policy.begin_connect().unwrap();
        policy.opened().unwrap();
        assert_eq!(policy.consecutive_failures(), 2);
        policy.received();
        assert_eq!(policy.consecutive_failures(), 0);
        assert_eq!(
            policy.failed().unwrap(),
            RetryDecision::RetryAfter(Duration::from_millis(100))
        );
    }

    #[test]
    fn test_open_then_immediate_close_counts_toward_max_attempts() {
        let mut config = ReconnectConfig::fixed(Duration::from_millis(10));
        config.max_attempts = Some(2);
        let mut policy = ReconnectPolicy::new(config);

        policy.begin_connect().unwrap();
        policy.opened().unwrap();
        assert!(matches!(policy.failed().unwrap(), RetryDecision::RetryAfter(_)));
        policy.begin_connect().unwrap();
        policy.opened().unwrap();
        assert_eq!(policy.failed().unwrap(), RetryDecision::GiveUp);
        assert_eq!(policy.state(), LinkState::Exhausted);
    }

    #[test]
    fn test_received_outside_open_is_ignored() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
        policy.begin_connect().unwrap();
        policy.failed().unwrap();
        policy.received();
        assert_eq!(policy.consecutive_failures(), 1);
    }

    #[test]
    fn test_exponential_doubles_up_to_cap() {
        let policy = ReconnectPolicy::new(exponential(100, 1000));
        let delays: Vec<u64> = (1..=6)
            .map(|n| policy.delay_for(n).as_millis() as u64)
            .collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1000, 1000]);
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(1000));
    }

    #[test]
    fn test_max_attempts_exhausts() {
        let mut config = ReconnectConfig::fixed(Duration::from_millis(10));
        config.max_attempts = Some(2);
        let mut policy = ReconnectPolicy::new(config);

        policy.begin_connect().unwrap();
        assert!(matches!(
            policy.failed().unwrap(),
            RetryDecision::RetryAfter(_)
        ));
        policy.begin_connect().unwrap();
        assert_eq!(policy.failed().unwrap(), RetryDecision::GiveUp);
        assert_eq!(policy.state(), LinkState::Exhausted);
        assert!(policy.begin_connect().is_err());
    }

    #[test]
    fn test_close_is_terminal_and_idempotent() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
        policy.begin_connect().unwrap();
        policy.failed().unwrap();
        policy.close();
        assert_eq!(policy.state(), LinkState::Closed);
        policy.close();
        assert_eq!(policy.state(), LinkState::Closed);

        let err = policy.begin_connect().unwrap_err();
        assert_eq!(err.from, LinkState::Closed);
        assert_eq!(err.to, LinkState::Connecting);
    }

    #[test]
    fn test_invalid_transition_open_without_connect() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig::default());
        assert!(policy.opened().is_err());
        assert!(policy.failed().is_err());
        assert_eq!(policy.state(), LinkState::Idle);
    }

    #[test]
    fn test_validate_rejects_bad_exponential() {
        let mut config = exponential(500, 100);
        assert!(config.validate().is_err());
        config.max_delay_ms = 1000;
        config.multiplier = 0.5;
        assert!(config.validate().is_err());
        config.multiplier = 1.5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(
            "Exponential".parse::<ReconnectStrategy>().unwrap(),
            ReconnectStrategy::Exponential
        );
        assert!("linear".parse::<ReconnectStrategy>().is_err());
    }

    #[test]
    fn test_link_state_display() {
        assert_eq!(LinkState::ReconnectWait.to_string(), "reconnect-wait");
    }
}
