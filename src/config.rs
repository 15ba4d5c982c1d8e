use std::collections::HashMap;
use thiserror::Error;

/// Largest supported sale-token decimals; 10^19 no longer fits in a u64.
pub const MAX_TOKEN_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Decimals of the sale token; prices are quoted per whole token.
    pub token_decimals: u8,
    /// Upper bound on the number of tiers in a ladder.
    pub max_tiers: usize,
    /// `tracing_subscriber::EnvFilter` directive string.
    pub log_filter: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            token_decimals: 6,
            max_tiers: 7,
            log_filter: "info".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let token_decimals = env_map
            .get("PRESALE_TOKEN_DECIMALS")
            .map(|s| s.as_str())
            .unwrap_or("6")
            .parse::<u8>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "PRESALE_TOKEN_DECIMALS".to_string(),
                    "must be a valid u8".to_string(),
                )
            })?;
        if token_decimals > MAX_TOKEN_DECIMALS {
            return Err(ConfigError::InvalidValue(
                "PRESALE_TOKEN_DECIMALS".to_string(),
                format!("must be at most {}, got {}", MAX_TOKEN_DECIMALS, token_decimals),
            ));
        }

        let max_tiers = env_map
            .get("PRESALE_MAX_TIERS")
            .map(|s| s.as_str())
            .unwrap_or("7")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "PRESALE_MAX_TIERS".to_string(),
                    "must be a valid usize".to_string(),
                )
            })?;
        if max_tiers == 0 {
            return Err(ConfigError::InvalidValue(
                "PRESALE_MAX_TIERS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let log_filter = env_map
            .get("PRESALE_LOG")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "info".to_string());

        Ok(EngineConfig {
            token_decimals,
            max_tiers,
            log_filter,
        })
    }

    /// Base units per whole sale token.
    pub fn price_scale(&self) -> u64 {
        10u64.saturating_pow(u32::from(self.token_decimals))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_env_empty() {
        let config = EngineConfig::from_env_map(HashMap::new()).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.price_scale(), 1_000_000);
    }

    #[test]
    fn test_reads_all_values() {
        let mut env_map = HashMap::new();
        env_map.insert("PRESALE_TOKEN_DECIMALS".to_string(), "9".to_string());
        env_map.insert("PRESALE_MAX_TIERS".to_string(), "3".to_string());
        env_map.insert("PRESALE_LOG".to_string(), "debug".to_string());
        let config = EngineConfig::from_env_map(env_map).unwrap();
        assert_eq!(config.token_decimals, 9);
        assert_eq!(config.price_scale(), 1_000_000_000);
        assert_eq!(config.max_tiers, 3);
        assert_eq!(config.log_filter, "debug");
    }

    #[test]
    fn test_invalid_token_decimals() {
        let mut env_map = HashMap::new();
        env_map.insert("PRESALE_TOKEN_DECIMALS".to_string(), "abc".to_string());
        match EngineConfig::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PRESALE_TOKEN_DECIMALS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_token_decimals_above_max() {
        let mut env_map = HashMap::new();
        env_map.insert("PRESALE_TOKEN_DECIMALS".to_string(), "19".to_string());
        match EngineConfig::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PRESALE_TOKEN_DECIMALS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_zero_max_tiers() {
        let mut env_map = HashMap::new();
        env_map.insert("PRESALE_MAX_TIERS".to_string(), "0".to_string());
        match EngineConfig::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PRESALE_MAX_TIERS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_zero_decimals_gives_unit_scale() {
        let config = EngineConfig {
            token_decimals: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.price_scale(), 1);
    }
}
