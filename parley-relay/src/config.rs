//! Relay and chat configuration

use std::time::Duration;

/// Default capacity of the downstream fragment channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// Default maximum title length, in characters
pub const DEFAULT_TITLE_MAX_CHARS: usize = 50;

/// What happens to already-forwarded text when a relay is cancelled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PartialPolicy {
    /// Drop the partial reply; no assistant message is stored
    #[default]
    Discard,
    /// Store the partial reply as an assistant message flagged `interrupted`
    PersistInterrupted,
}

/// Settings for the relay coordinator
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Handling of partial replies on cancel
    pub partial_policy: PartialPolicy,
    /// Longest wait for the next upstream item before the relay fails.
    /// `None` waits indefinitely.
    pub idle_timeout: Option<Duration>,
    /// Fragments buffered between the relay task and a slow client
    pub channel_capacity: usize,
    /// Model requested from the backend; the backend default when `None`
    pub model: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            partial_policy: PartialPolicy::default(),
            idle_timeout: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            model: None,
        }
    }
}

impl RelayConfig {
    /// Create a new configuration builder
    pub fn builder() -> RelayConfigBuilder {
        RelayConfigBuilder::default()
    }
}

/// Builder for relay configuration
#[derive(Debug, Default)]
pub struct RelayConfigBuilder {
    config: RelayConfig,
}

impl RelayConfigBuilder {
    /// Set the partial-reply policy
    pub fn partial_policy(mut self, policy: PartialPolicy) -> Self {
        self.config.partial_policy = policy;
        self
    }

    /// Fail a relay whose upstream stays silent for `timeout`
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout = Some(timeout);
        self
    }

    /// Set the downstream channel capacity (at least 1)
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity.max(1);
        self
    }

    /// Request a specific model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> RelayConfig {
        self.config
    }
}

/// Settings for the chat control surface
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Titles longer than this many characters are truncated
    pub title_max_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            title_max_chars: DEFAULT_TITLE_MAX_CHARS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RelayConfig::default();
        assert_eq!(config.partial_policy, PartialPolicy::Discard);
        assert!(config.idle_timeout.is_none());
        assert_eq!(config.channel_capacity, DEFAULT_CHANNEL_CAPACITY);
    }

    #[test]
    fn test_builder() {
        let config = RelayConfig::builder()
            .partial_policy(PartialPolicy::PersistInterrupted)
            .idle_timeout(Duration::from_secs(30))
            .channel_capacity(0)
            .model("llama3.2")
            .build();

        assert_eq!(config.partial_policy, PartialPolicy::PersistInterrupted);
        assert_eq!(config.idle_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.channel_capacity, 1);
        assert_eq!(config.model.as_deref(), Some("llama3.2"));
    }
}
