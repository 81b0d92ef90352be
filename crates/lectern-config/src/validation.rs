use serde::Deserialize;

/// Structural validation configuration
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationConfig {
    /// Score (0-100) at or above which generated content passes
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: u8,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            pass_threshold: default_pass_threshold(),
        }
    }
}

const fn default_pass_threshold() -> u8 {
    70
}
