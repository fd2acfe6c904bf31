//! Configuration for the answer pipeline.

use std::time::Duration;

use crate::error::{RagError, Result};
use crate::prompt::SelectionPolicy;

/// Number of exchanges retrieved per message unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 1;

/// Configuration parameters for [`RagOrchestrator`](crate::RagOrchestrator).
#[derive(Debug, Clone, PartialEq)]
pub struct RagConfig {
    /// Number of nearest exchanges to retrieve.
    pub top_k: usize,
    /// Which retrieved exchanges go into the prompt.
    pub selection: SelectionPolicy,
    /// Upper bound for the embedding call.
    pub embed_timeout: Option<Duration>,
    /// Upper bound for the generation call.
    pub generation_timeout: Option<Duration>,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            selection: SelectionPolicy::Closest,
            embed_timeout: None,
            generation_timeout: None,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are usable.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if:
    /// - `top_k == 0`
    /// - the selection policy is `Top(0)`
    /// - a timeout is zero
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(RagError::ConfigError("top_k must be greater than zero".to_string()));
        }
        if self.selection == SelectionPolicy::Top(0) {
            return Err(RagError::ConfigError(
                "selection must include at least one exchange".to_string(),
            ));
        }
        for (name, limit) in [
            ("embed_timeout", self.embed_timeout),
            ("generation_timeout", self.generation_timeout),
        ] {
            if limit.is_some_and(|d| d.is_zero()) {
                return Err(RagError::ConfigError(format!("{name} must be greater than zero")));
            }
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the number of nearest exchanges to retrieve.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set which retrieved exchanges are placed in the prompt.
    pub fn selection(mut self, selection: SelectionPolicy) -> Self {
        self.config.selection = selection;
        self
    }

    /// Bound the embedding call.
    pub fn embed_timeout(mut self, limit: Duration) -> Self {
        self.config.embed_timeout = Some(limit);
        self
    }

    /// Bound the generation call.
    pub fn generation_timeout(mut self, limit: Duration) -> Self {
        self.config.generation_timeout = Some(limit);
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
