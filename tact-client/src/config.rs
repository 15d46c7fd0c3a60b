use std::time::Duration;
use tact_core::id::AccountId;

/// Client-wide defaults, fixed at construction
#[derive(Debug, Clone, PartialEq)]
pub struct ClientDefaults {
    /// Account charged for operations that do not name a payer
    pub payer: AccountId,
    /// Submission attempts per operation, counting the first
    pub max_attempts: u32,
    /// Pause between retry attempts
    pub retry_delay: Duration,
}

impl ClientDefaults {
    pub fn new(payer: AccountId) -> Self {
        Self {
            payer,
            max_attempts: 3,
            retry_delay: Duration::from_millis(250),
        }
    }
}

/// Per-call overrides; `None` fields fall back to the client defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallConfig {
    pub payer: Option<AccountId>,
    pub max_attempts: Option<u32>,
    pub retry_delay: Option<Duration>,
}

impl CallConfig {
    pub fn with_payer(mut self, payer: AccountId) -> Self {
        self.payer = Some(payer);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = Some(retry_delay);
        self
    }

    /// Resolve this call's settings against the defaults. Pure; neither
    /// side is modified.
    pub fn merged(&self, defaults: &ClientDefaults) -> ResolvedConfig {
        ResolvedConfig {
            payer: self.payer.unwrap_or(defaults.payer),
            max_attempts: self.max_attempts.unwrap_or(defaults.max_attempts),
            retry_delay: self.retry_delay.unwrap_or(defaults.retry_delay),
        }
    }
}

/// Effective settings for one call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedConfig {
    pub payer: AccountId,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}
