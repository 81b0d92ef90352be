use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, variable expansion
    /// fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let expanded =
            crate::env::expand_env(&raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if no providers are configured, a cost tier is
    /// out of range, a duration string fails to parse, or a threshold
    /// exceeds the 0-100 score scale
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.providers.is_empty() {
            anyhow::bail!("at least one provider must be configured");
        }

        for (name, provider) in &self.providers {
            if !(1..=5).contains(&provider.cost_tier) {
                anyhow::bail!(
                    "provider '{name}' has cost_tier {}, expected 1-5",
                    provider.cost_tier
                );
            }
            if let Some(ref timeout) = provider.timeout {
                duration_str::parse(timeout)
                    .map_err(|e| anyhow::anyhow!("provider '{name}' has invalid timeout '{timeout}': {e}"))?;
            }
        }

        duration_str::parse(&self.cache.ttl)
            .map_err(|e| anyhow::anyhow!("invalid cache ttl '{}': {e}", self.cache.ttl))?;

        if self.cache.max_entries == 0 {
            anyhow::bail!("cache.max_entries must be greater than 0");
        }
        if self.cache.min_score > 100 {
            anyhow::bail!("cache.min_score must be at most 100");
        }
        if self.validation.pass_threshold > 100 {
            anyhow::bail!("validation.pass_threshold must be at most 100");
        }
        if self.context.max_chars == 0 {
            anyhow::bail!("context.max_chars must be greater than 0");
        }

        Ok(())
    }
}
