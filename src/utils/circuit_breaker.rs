use std::sync::Mutex;
use std::time::{Duration, Instant};

// ============================================================================
// Circuit Breaker
// ============================================================================
//
// Guards a flaky downstream (the message broker) so a dead dependency fails
// fast instead of tying up every caller for a full delivery timeout.
//
//   Closed { failures }  --failure_threshold consecutive failures-->  Open
//   Open { since }       --cooldown elapsed, next call admitted-->    HalfOpen
//   HalfOpen { ok }      --success_threshold successes-->             Closed
//   HalfOpen             --any failure-->                             Open
//
// Admission and outcome are recorded separately: a Kafka send is admitted
// when it is enqueued, and its outcome is only known once the broker acks.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that trip the breaker
    pub failure_threshold: u32,
    /// How long the breaker stays open before probing again
    pub cooldown: Duration,
    /// Successful half-open calls needed to close again
    pub success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
            success_threshold: 3,
        }
    }
}

#[derive(Debug)]
enum Phase {
    Closed { failures: u32 },
    Open { since: Instant },
    HalfOpen { successes: u32 },
}

pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    phase: Mutex<Phase>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            phase: Mutex::new(Phase::Closed { failures: 0 }),
        }
    }

    pub fn state(&self) -> CircuitState {
        match *self.lock() {
            Phase::Closed { .. } => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    // The lock is never held across an await, so a poisoned mutex can only
    // come from a panic inside these short sections; the phase is still usable.
    fn lock(&self) -> std::sync::MutexGuard<'_, Phase> {
        self.phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether a call may go through now. An open breaker whose cooldown
    /// has elapsed moves to half-open and admits the call as a trial.
    pub fn allow(&self) -> bool {
        let mut phase = self.lock();
        match *phase {
            Phase::Open { since } if since.elapsed() >= self.config.cooldown => {
                tracing::info!(breaker = %self.name, "Circuit breaker half-open, admitting trial calls");
                *phase = Phase::HalfOpen { successes: 0 };
                true
            }
            Phase::Open { .. } => false,
            Phase::Closed { .. } | Phase::HalfOpen { .. } => true,
        }
    }

    pub fn record_success(&self) {
        let mut phase = self.lock();
        match *phase {
            Phase::HalfOpen { successes } if successes + 1 >= self.config.success_threshold => {
                tracing::info!(breaker = %self.name, "Circuit breaker closed");
                *phase = Phase::Closed { failures: 0 };
            }
            Phase::HalfOpen { successes } => *phase = Phase::HalfOpen { successes: successes + 1 },
            Phase::Closed { .. } => *phase = Phase::Closed { failures: 0 },
            Phase::Open { .. } => {}
        }
    }

    pub fn record_failure(&self) {
        let mut phase = self.lock();
        match *phase {
            Phase::Closed { failures } if failures + 1 >= self.config.failure_threshold => {
                tracing::warn!(
                    breaker = %self.name,
                    failures = failures + 1,
                    "Circuit breaker opened"
                );
                *phase = Phase::Open { since: Instant::now() };
            }
            Phase::Closed { failures } => *phase = Phase::Closed { failures: failures + 1 },
            Phase::HalfOpen { .. } => {
                tracing::warn!(breaker = %self.name, "Half-open call failed, circuit breaker reopened");
                *phase = Phase::Open { since: Instant::now() };
            }
            Phase::Open { .. } => {}
        }
    }
}
