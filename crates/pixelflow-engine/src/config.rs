//! Engine configuration.

use pixelflow_compute::BlockOptions;
use serde::{Deserialize, Serialize};

/// Default bound on nested local-function calls.
pub const DEFAULT_MAX_CALL_DEPTH: u32 = 16;

/// Settings shared by every evaluation pass.
///
/// Deserializes from partial JSON; missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size classification thresholds used by `blob-hierarchy` nodes
    /// with blob filtering enabled.
    pub block_options: BlockOptions,
    /// Local functions calling deeper than this produce no outputs.
    pub max_call_depth: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_options: BlockOptions::default(),
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"max_call_depth": 3}"#).unwrap();
        assert_eq!(config.max_call_depth, 3);
        assert_eq!(config.block_options, BlockOptions::default());
    }

    #[test]
    fn nested_block_options_override() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"block_options": {"max_noise_size": 2}}"#).unwrap();
        assert_eq!(config.block_options.max_noise_size, 2);
        assert_eq!(config.max_call_depth, DEFAULT_MAX_CALL_DEPTH);
    }
}
