//! Per-provider circuit breaker.
//!
//! Grounded on the teacher's `services/circuit_breaker.rs` state machine and
//! `RwLock<HashMap<_, _>>` registry idiom, cut down to a simpler three-state
//! policy: breakers are scoped per LLM provider (not per DAG node), and
//! recovery is unconditional rather than restructure-driven.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

/// Tunable thresholds, mirrored from [`crate::domain::models::config::CircuitBreakerSettings`].
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            half_open_max_calls: 3,
        }
    }
}

#[derive(Debug)]
struct ProviderCircuit {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    half_open_calls: u32,
}

impl ProviderCircuit {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            half_open_calls: 0,
        }
    }
}

/// Whether a call against a provider may proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitCheckResult {
    Allowed,
    Rejected,
}

/// Per-provider breaker registry. One instance is shared (behind an `Arc`)
/// across the [`crate::services::llm_router::LlmRouter`] and all its
/// concurrent callers.
#[derive(Debug)]
pub struct CircuitBreakerService {
    config: CircuitBreakerConfig,
    circuits: RwLock<HashMap<String, ProviderCircuit>>,
}

impl CircuitBreakerService {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            circuits: RwLock::new(HashMap::new()),
        }
    }

    /// Whether a call against `provider` is currently allowed. Transitions
    /// `Open -> HalfOpen` once `recovery_timeout` has elapsed.
    pub fn check(&self, provider: &str) -> CircuitCheckResult {
        let mut circuits = self.circuits.write().expect("circuit breaker lock poisoned");
        let circuit = circuits.entry(provider.to_string()).or_insert_with(ProviderCircuit::new);

        match circuit.state {
            CircuitState::Closed => CircuitCheckResult::Allowed,
            CircuitState::HalfOpen => {
                if circuit.half_open_calls < self.config.half_open_max_calls {
                    circuit.half_open_calls += 1;
                    CircuitCheckResult::Allowed
                } else {
                    CircuitCheckResult::Rejected
                }
            }
            CircuitState::Open => {
                let elapsed = circuit.opened_at.map_or(Duration::ZERO, |at| at.elapsed());
                if elapsed >= self.config.recovery_timeout {
                    circuit.state = CircuitState::HalfOpen;
                    circuit.half_open_calls = 1;
                    CircuitCheckResult::Allowed
                } else {
                    CircuitCheckResult::Rejected
                }
            }
        }
    }

    /// Record a successful call. Any success while half-open closes the
    /// circuit.
    pub fn record_success(&self, provider: &str) {
        let mut circuits = self.circuits.write().expect("circuit breaker lock poisoned");
        let circuit = circuits.entry(provider.to_string()).or_insert_with(ProviderCircuit::new);
        circuit.consecutive_failures = 0;
        circuit.state = CircuitState::Closed;
        circuit.opened_at = None;
        circuit.half_open_calls = 0;
    }

    /// Record a failed call. Any failure while half-open reopens the
    /// circuit immediately; while
    /// closed, the circuit opens once `failure_threshold` is reached.
    pub fn record_failure(&self, provider: &str) {
        let mut circuits = self.circuits.write().expect("circuit breaker lock poisoned");
        let circuit = circuits.entry(provider.to_string()).or_insert_with(ProviderCircuit::new);

        match circuit.state {
            CircuitState::HalfOpen => {
                circuit.state = CircuitState::Open;
                circuit.opened_at = Some(Instant::now());
                circuit.half_open_calls = 0;
            }
            CircuitState::Closed => {
                circuit.consecutive_failures += 1;
                if circuit.consecutive_failures >= self.config.failure_threshold {
                    circuit.state = CircuitState::Open;
                    circuit.opened_at = Some(Instant::now());
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn state(&self, provider: &str) -> CircuitState {
        self.circuits
            .read()
            .expect("circuit breaker lock poisoned")
            .get(provider)
            .map_or(CircuitState::Closed, |c| c.state)
    }
}

impl Default for CircuitBreakerService {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_allows_calls_by_default() {
        let breaker = CircuitBreakerService::default();
        assert_eq!(breaker.check("anthropic"), CircuitCheckResult::Allowed);
        assert_eq!(breaker.state("anthropic"), CircuitState::Closed);
    }

    #[test]
    fn trips_open_after_threshold_failures() {
        let breaker = CircuitBreakerService::new(CircuitBreakerConfig {
            failure_threshold: 3,
            ..CircuitBreakerConfig::default()
        });
        for _ in 0..3 {
            breaker.record_failure("openai");
        }
        assert_eq!(breaker.state("openai"), CircuitState::Open);
        assert_eq!(breaker.check("openai"), CircuitCheckResult::Rejected);
    }

    #[test]
    fn half_open_success_closes_circuit() {
        let breaker = CircuitBreakerService::new(CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::from_secs(0),
            half_open_max_calls: 3,
        });
        breaker.record_failure("google");
        assert_eq!(breaker.check("google"), CircuitCheckResult::Allowed);
        assert_eq!(breaker.state("google"), CircuitState::HalfOpen);
        breaker.record_success("google");
        assert_eq!(breaker.state("google"), CircuitState::Closed);
    }

    #[test]
    fn half_open_failure_reopens_circuit() {
        let breaker = CircuitBreakerService::new(CircuitBreakerConfig {
            failure_threshold: 1,
            recovery_timeout: Duration::from_secs(0),
            half_open_max_calls: 3,
        });
        breaker.record_failure("google");
        assert_eq!(breaker.check("google"), CircuitCheckResult::Allowed);
        breaker.record_failure("google");
        assert_eq!(breaker.state("google"), CircuitState::Open);
    }

    #[test]
    fn providers_are_scoped_independently() {
        let breaker = CircuitBreakerService::new(CircuitBreakerConfig {
            failure_threshold: 1,
            ..CircuitBreakerConfig::default()
        });
        breaker.record_failure("anthropic");
        assert_eq!(breaker.state("anthropic"), CircuitState::Open);
        assert_eq!(breaker.state("openai"), CircuitState::Closed);
    }
}
