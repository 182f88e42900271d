//! # Bridge Configuration
//!
//! Timeouts, the custom scheme name and the source-validation policy.
//! Every field has a default, so an empty JSON object is a valid config.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use frameproto::protocol::DEFAULT_ASSETS_SCHEME;
use frameproto::zome_call::DEFAULT_NONCE_LIFETIME;

#[derive(Debug)]
pub enum Error {
    Parse(serde_json::Error),
    Invalid(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "Config parse error: {}", e),
            Self::Invalid(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// How much the router trusts the sender of a message.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourcePolicy {
    /// Dispatch only messages posted by the mounted app frame whose origin
    /// names the session's app.
    #[default]
    MountedFrame,
    /// Trust whatever app id the message origin parses to.
    OriginOnly,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub probe_timeout_ms: u64,
    pub setup_poll_interval_ms: u64,
    pub setup_timeout_ms: u64,
    pub nonce_lifetime_ms: u64,
    pub assets_scheme: String,
    pub source_policy: SourcePolicy,
    /// Wait for the launcher environment before doing anything else.
    pub wait_for_setup: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 1_000,
            setup_poll_interval_ms: 100,
            setup_timeout_ms: 60_000,
            nonce_lifetime_ms: saturating_millis(DEFAULT_NONCE_LIFETIME),
            assets_scheme: DEFAULT_ASSETS_SCHEME.to_string(),
            source_policy: SourcePolicy::MountedFrame,
            wait_for_setup: true,
        }
    }
}

/// Milliseconds in `d`, clamped to `u64::MAX`.
fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl BridgeConfig {
    /// Parses and validates a JSON config.
    pub fn from_json(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.probe_timeout_ms == 0 {
            return Err(Error::Invalid("probe_timeout_ms must be positive".into()));
        }
        if self.setup_poll_interval_ms == 0 {
            return Err(Error::Invalid("setup_poll_interval_ms must be positive".into()));
        }
        if self.setup_timeout_ms < self.setup_poll_interval_ms {
            return Err(Error::Invalid(
                "setup_timeout_ms must not be shorter than setup_poll_interval_ms".into(),
            ));
        }
        if self.nonce_lifetime_ms == 0 {
            return Err(Error::Invalid("nonce_lifetime_ms must be positive".into()));
        }
        let scheme_ok = self
            .assets_scheme
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic())
            && self
                .assets_scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !scheme_ok {
            return Err(Error::Invalid(format!(
                "assets_scheme {:?} is not a valid URL scheme",
                self.assets_scheme
            )));
        }
        Ok(())
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn setup_poll_interval(&self) -> Duration {
        Duration::from_millis(self.setup_poll_interval_ms)
    }

    pub fn setup_timeout(&self) -> Duration {
        Duration::from_millis(self.setup_timeout_ms)
    }

    pub fn nonce_lifetime(&self) -> Duration {
        Duration::from_millis(self.nonce_lifetime_ms)
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout_ms = saturating_millis(timeout);
        self
    }

    pub fn with_setup_timeout(mut self, timeout: Duration) -> Self {
        self.setup_timeout_ms = saturating_millis(timeout);
        self
    }

    pub fn with_nonce_lifetime(mut self, lifetime: Duration) -> Self {
        self.nonce_lifetime_ms = saturating_millis(lifetime);
        self
    }

    pub fn with_assets_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.assets_scheme = scheme.into();
        self
    }

    pub fn with_source_policy(mut self, policy: SourcePolicy) -> Self {
        self.source_policy = policy;
        self
    }

    pub fn with_wait_for_setup(mut self, wait: bool) -> Self {
        self.wait_for_setup = wait;
        self
    }
}
