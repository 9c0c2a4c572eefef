// ── Link lifecycle state machine ──
//
// Pure, I/O-free transitions for the controller link. The WebSocket loop
// drives a `SessionMachine` and publishes its state; tests drive it directly.

use std::fmt;
use std::time::Duration;

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Exponential backoff configuration for link reconnection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt. Default: 1s.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 5s.
    pub max_delay: Duration,

    /// Maximum reconnection attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            max_retries: Some(100_000),
        }
    }
}

// ── Backoff calculation ──────────────────────────────────────────────

/// Exponential backoff with jitter for the 1-indexed `attempt`.
///
/// `delay = min(min(initial * 2^(attempt-1), max) * jitter, max)`
///
/// Jitter is +-25% to spread out reconnection storms from multiple clients,
/// and never pushes the delay past `max_delay`.
pub fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
    let max = config.max_delay.as_secs_f64();
    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(max);

    // Deterministic "jitter" seeded from the attempt number.
    // Not cryptographically random, but good enough for backoff spread.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).clamp(0.0, max);

    Duration::from_secs_f64(with_jitter)
}

// ── LinkState ────────────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    /// Retry budget exhausted. Terminal until the session is restarted.
    GivenUp,
}

impl LinkState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::GivenUp)
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            Self::GivenUp => write!(f, "connection lost"),
        }
    }
}

// ── SessionMachine ───────────────────────────────────────────────────

/// What the driver should do after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Sleep for `delay`, then try connecting again.
    Retry { attempt: u32, delay: Duration },
    /// Stop. The state is now [`LinkState::GivenUp`].
    GiveUp { attempts: u32 },
}

/// Reconnect state machine:
/// `Disconnected -> Connecting -> Connected -> Reconnecting -> ... -> Connected | GivenUp`.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    config: ReconnectConfig,
    state: LinkState,
    attempt: u32,
}

impl SessionMachine {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            state: LinkState::Disconnected,
            attempt: 0,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Number of consecutive failed attempts since the last success.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn config(&self) -> &ReconnectConfig {
        &self.config
    }

    /// A connection attempt is starting.
    ///
    /// Only moves `Disconnected` to `Connecting`; a retry keeps its
    /// `Reconnecting` state so consumers still see the attempt number.
    pub fn begin(&mut self) -> LinkState {
        if self.state == LinkState::Disconnected {
            self.state = LinkState::Connecting;
        }
        self.state
    }

    /// Transport-level handshake succeeded. Resets the retry counter.
    pub fn connected(&mut self) -> LinkState {
        self.state = LinkState::Connected;
        self.attempt = 0;
        self.state
    }

    /// The connection failed, dropped, or was closed by the remote end.
    pub fn failed(&mut self) -> Step {
        if self.state == LinkState::GivenUp {
            return Step::GiveUp {
                attempts: self.attempt,
            };
        }

        let next = self.attempt.saturating_add(1);
        if let Some(max) = self.config.max_retries {
            if next > max {
                self.state = LinkState::GivenUp;
                return Step::GiveUp {
                    attempts: self.attempt,
                };
            }
        }

        self.attempt = next;
        self.state = LinkState::Reconnecting { attempt: next };
        Step::Retry {
            attempt: next,
            delay: calculate_backoff(next, &self.config),
        }
    }

    /// Explicit local shutdown.
    pub fn reset(&mut self) -> LinkState {
        self.state = LinkState::Disconnected;
        self.attempt = 0;
        self.state
    }
}

impl Default for SessionMachine {
    fn default() -> Self {
        Self::new(ReconnectConfig::default())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
