use roadlore_context::DEFAULT_HIGHLIGHT_PREFIX;
use roadlore_geo::LocationOptions;

/// Tunables for an [`Explorer`](crate::Explorer) and its [`Session`](crate::Session).
#[derive(Debug, Clone, PartialEq)]
pub struct ExplorerConfig {
    /// Line prefix marking an embedded highlight in narrative text.
    pub highlight_prefix: String,
    /// Used when neither tracking nor driving is active.
    pub one_shot: LocationOptions,
    /// Used for the continuous subscription.
    pub watch: LocationOptions,
    /// Capacity of the session command queue.
    pub command_buffer: usize,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            highlight_prefix: DEFAULT_HIGHLIGHT_PREFIX.to_string(),
            one_shot: LocationOptions::one_shot(),
            watch: LocationOptions::tracking(),
            command_buffer: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_defaults() {
        let config = ExplorerConfig::default();
        assert_eq!(config.highlight_prefix, "DESTAQUE:");
        assert!(config.watch.high_accuracy);
        assert_eq!(config.watch.timeout, Duration::from_secs(10));
        assert_eq!(config.watch.maximum_age, Duration::from_secs(5));
        assert_eq!(config.one_shot.maximum_age, Duration::ZERO);
    }
}
