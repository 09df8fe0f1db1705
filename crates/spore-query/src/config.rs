//! # Spore Query Configuration
//!
//! Endpoints, the Spore script identity and paging knobs.

use serde::{Deserialize, Serialize};
use std::env;

use crate::domain::{
    parse_h256, HashType, RecordError, ScriptId, DEFAULT_SUPPORTED_CONTENT_TYPES, H256,
};

/// Spore type script `code_hash` on the Aggron4 testnet.
const AGGRON4_SPORE_CODE_HASH: [u8; 32] = [
    0xbb, 0xad, 0x12, 0x63, 0x77, 0xd4, 0x5f, 0x90, 0xa8, 0xee, 0x12, 0x0d, 0xa9, 0x88, 0xa2, 0xd7,
    0x33, 0x2c, 0x78, 0xba, 0x8f, 0xd6, 0x79, 0xaa, 0xb4, 0x78, 0xa1, 0x9d, 0x6c, 0x13, 0x34, 0x94,
];

/// Spore query configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SporeConfig {
    /// Indexer JSON-RPC endpoint.
    pub indexer_url: String,

    /// Node JSON-RPC endpoint.
    pub node_url: String,

    /// Identity of the Spore type script (args ignored).
    pub spore_script: ScriptId,

    /// Content types listings accept as records.
    pub supported_content_types: Vec<String>,

    /// Cells requested per indexer page.
    pub page_size: u32,

    /// Concurrent detail/live-cell lookups per recent-scan batch.
    pub max_concurrent_lookups: usize,

    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for SporeConfig {
    fn default() -> Self {
        Self::aggron4()
    }
}

impl SporeConfig {
    /// Public Aggron4 testnet endpoints and script.
    pub fn aggron4() -> Self {
        Self {
            indexer_url: "https://testnet.ckb.dev/indexer".to_string(),
            node_url: "https://testnet.ckb.dev/rpc".to_string(),
            spore_script: ScriptId::new(H256(AGGRON4_SPORE_CODE_HASH), HashType::Data1),
            supported_content_types: DEFAULT_SUPPORTED_CONTENT_TYPES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            page_size: 100,
            max_concurrent_lookups: 16,
            request_timeout_ms: 10_000,
        }
    }

    /// Create a config for testing (smaller values).
    pub fn for_testing() -> Self {
        Self {
            indexer_url: "http://127.0.0.1:8116".to_string(),
            node_url: "http://127.0.0.1:8114".to_string(),
            page_size: 2,
            max_concurrent_lookups: 4,
            request_timeout_ms: 1_000,
            ..Self::aggron4()
        }
    }

    /// Apply environment overrides on top of the defaults.
    ///
    /// # Environment Variables
    ///
    /// - `SPORE_INDEXER_URL`: indexer endpoint
    /// - `SPORE_NODE_URL`: node endpoint
    /// - `SPORE_CODE_HASH`: Spore script code hash (`0x`-prefixed)
    /// - `SPORE_HASH_TYPE`: `type`, `data`, `data1` or `data2`
    /// - `SPORE_PAGE_SIZE`: cells per indexer page
    /// - `SPORE_MAX_CONCURRENCY`: recent-scan fan-out
    /// - `SPORE_TIMEOUT_MS`: request timeout
    pub fn from_env() -> Result<Self, RecordError> {
        let mut config = Self::default();

        if let Ok(url) = env::var("SPORE_INDEXER_URL") {
            config.indexer_url = url;
        }
        if let Ok(url) = env::var("SPORE_NODE_URL") {
            config.node_url = url;
        }
        if let Ok(code_hash) = env::var("SPORE_CODE_HASH") {
            config.spore_script.code_hash = parse_h256(&code_hash)
                .map_err(|e| RecordError::InvalidConfig(format!("SPORE_CODE_HASH: {e}")))?;
        }
        if let Ok(hash_type) = env::var("SPORE_HASH_TYPE") {
            config.spore_script.hash_type = hash_type.parse()?;
        }
        if let Some(page_size) = parse_var("SPORE_PAGE_SIZE")? {
            config.page_size = page_size;
        }
        if let Some(fan_out) = parse_var("SPORE_MAX_CONCURRENCY")? {
            config.max_concurrent_lookups = fan_out;
        }
        if let Some(timeout) = parse_var("SPORE_TIMEOUT_MS")? {
            config.request_timeout_ms = timeout;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<(), RecordError> {
        for (name, url) in [("indexer_url", &self.indexer_url), ("node_url", &self.node_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(RecordError::InvalidConfig(format!(
                    "{name} must be an http(s) URL, got {url}"
                )));
            }
        }
        if self.page_size == 0 {
            return Err(RecordError::InvalidConfig("page_size must be positive".to_string()));
        }
        if self.max_concurrent_lookups == 0 {
            return Err(RecordError::InvalidConfig(
                "max_concurrent_lookups must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Is `content_type` one of the supported record types?
    pub fn is_supported_content_type(&self, content_type: &str) -> bool {
        self.supported_content_types.iter().any(|t| t == content_type)
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Result<Option<T>, RecordError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| RecordError::InvalidConfig(format!("{name}: {e}"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SporeConfig::default();
        assert_eq!(config.spore_script.hash_type, HashType::Data1);
        assert!(config.is_supported_content_type("image/png"));
        assert!(!config.is_supported_content_type("unknown/x"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_testing_config() {
        let config = SporeConfig::for_testing();
        assert_eq!(config.page_size, 2);
        assert_eq!(config.spore_script, SporeConfig::aggron4().spore_script);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SporeConfig::for_testing();
        config.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = SporeConfig::for_testing();
        config.node_url = "ftp://node".to_string();
        assert!(matches!(config.validate(), Err(RecordError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_serde() {
        let config = SporeConfig::for_testing();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"data1\""));
        let back: SporeConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
