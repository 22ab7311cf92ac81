use std::fs;

use hedge_core::{EngineConfig, KeeperId};
use hedge_simulation::SimulationConfig;
use serde::{Deserialize, Serialize};

use crate::error::{KeeperError, KeeperResult};

/// Keeper configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KeeperConfig {
    /// Wall-clock seconds between ticks
    pub tick_interval_secs: u64,

    /// Simulated seconds that pass per tick
    pub simulated_step_secs: i64,

    /// Largest per-tick move of each leg price (basis points)
    pub price_volatility_bps: u32,

    /// Seed of the simulated price walk
    pub seed: u64,

    /// Retry configuration
    pub retry: RetryConfig,

    /// Engine configuration, including the keeper identity
    pub engine: EngineConfig,

    /// Initial state of the simulated market
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Retry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Consecutive deferrals logged before the keeper escalates to an error
    pub max_retries: u32,

    /// Base delay between retries in milliseconds
    pub base_delay_ms: u64,

    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,

    /// Exponential backoff multiplier
    pub backoff_multiplier: f64,
}

impl KeeperConfig {
    /// Load configuration from TOML file
    pub fn load(path: &str) -> KeeperResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            KeeperError::Io(format!("Failed to read config file {}: {}", path, e))
        })?;

        let config: KeeperConfig = toml::from_str(&content).map_err(|e| {
            KeeperError::SerializationError(format!("Failed to parse config file {}: {}", path, e))
        })?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: &str) -> KeeperResult<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| {
            KeeperError::Io(format!("Failed to write config file {}: {}", path, e))
        })?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> KeeperResult<()> {
        if self.tick_interval_secs == 0 {
            return Err(KeeperError::InvalidConfig(
                "tick_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.simulated_step_secs <= 0 {
            return Err(KeeperError::InvalidConfig(format!(
                "simulated_step_secs must be greater than 0, got {}",
                self.simulated_step_secs
            )));
        }

        if self.price_volatility_bps >= 10_000 {
            return Err(KeeperError::InvalidConfig(format!(
                "price_volatility_bps must be below 10000, got {}",
                self.price_volatility_bps
            )));
        }

        self.engine.validate()?;
        self.simulation.validate()?;
        self.retry.validate()?;

        Ok(())
    }
}

impl RetryConfig {
    /// Validate retry configuration
    fn validate(&self) -> KeeperResult<()> {
        if self.max_retries == 0 {
            return Err(KeeperError::InvalidConfig(
                "max_retries must be greater than 0".to_string(),
            ));
        }

        if self.base_delay_ms == 0 {
            return Err(KeeperError::InvalidConfig(
                "base_delay_ms must be greater than 0".to_string(),
            ));
        }

        if self.max_delay_ms < self.base_delay_ms {
            return Err(KeeperError::InvalidConfig(format!(
                "max_delay_ms ({}) must be at least base_delay_ms ({})",
                self.max_delay_ms, self.base_delay_ms
            )));
        }

        if self.backoff_multiplier <= 1.0 {
            return Err(KeeperError::InvalidConfig(format!(
                "backoff_multiplier must be greater than 1.0, got {}",
                self.backoff_multiplier
            )));
        }

        Ok(())
    }

    /// Calculate delay for retry attempt
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        if attempt == 0 {
            return self.base_delay_ms;
        }

        let exponential_delay =
            self.base_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        (exponential_delay as u64).min(self.max_delay_ms)
    }
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 10,
            simulated_step_secs: 60 * 60,
            price_volatility_bps: 100,
            seed: 7,
            retry: RetryConfig::default(),
            engine: EngineConfig::new(KeeperId::new("keeper")),
            simulation: SimulationConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Create example configuration file
pub fn create_example_config(path: &str) -> KeeperResult<()> {
    let mut example_config = KeeperConfig {
        tick_interval_secs: 5,
        simulated_step_secs: 30 * 60,
        price_volatility_bps: 150,
        seed: 2024,
        ..KeeperConfig::default()
    };
    example_config.engine.keeper = KeeperId::new("basket-vault-keeper");
    example_config.engine.thresholds.min_rebalance_interval_secs = 6 * 60 * 60;
    example_config.simulation.vault_basket = 10_000.0;

    example_config.save(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation() {
        let mut config = KeeperConfig::default();
        assert!(config.validate().is_ok());

        config.tick_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = KeeperConfig::default();
        config.engine.thresholds.target_health_factor_bps = 9_000;
        assert!(matches!(config.validate(), Err(KeeperError::Engine(_))));

        let mut config = KeeperConfig::default();
        config.simulation.prices.btc = -1.0;
        assert!(matches!(config.validate(), Err(KeeperError::Simulation(_))));
    }

    #[test]
    fn test_retry_delay_calculation() {
        let retry_config = RetryConfig::default();

        assert_eq!(retry_config.delay_for_attempt(0), 1000);
        assert_eq!(retry_config.delay_for_attempt(1), 2000);
        assert_eq!(retry_config.delay_for_attempt(2), 4000);

        // Should cap at max_delay_ms
        assert_eq!(retry_config.delay_for_attempt(10), 30_000);
    }

    #[test]
    fn test_example_config_round_trip() {
        let path = std::env::temp_dir().join(format!("hedge-keeper-{}.toml", std::process::id()));
        let path = path.to_string_lossy().to_string();

        create_example_config(&path).unwrap();
        let loaded = KeeperConfig::load(&path).unwrap();
        assert_eq!(loaded.engine.keeper, KeeperId::new("basket-vault-keeper"));
        assert_eq!(loaded.engine.thresholds.min_rebalance_interval_secs, 6 * 60 * 60);
        assert_eq!(loaded.simulation.vault_basket, 10_000.0);
        assert_eq!(loaded.engine.routes, hedge_core::quoter::RouteConfig::default());
        assert_eq!(
            loaded.engine.thresholds,
            hedge_core::Thresholds {
                min_rebalance_interval_secs: 6 * 60 * 60,
                ..hedge_core::Thresholds::default()
            }
        );

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_dust_thresholds_survive_toml() {
        let mut config = KeeperConfig::default();
        config.engine.thresholds.basket_dust_threshold = 5 * 10u128.pow(17);
        let content = toml::to_string_pretty(&config).unwrap();

        let parsed: KeeperConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed.engine.thresholds.basket_dust_threshold, 5 * 10u128.pow(17));
        assert_eq!(parsed.engine.thresholds.dust_threshold, hedge_core::DEFAULT_DUST_THRESHOLD);

        // Beyond what a TOML integer can hold
        config.engine.thresholds.dust_threshold = u128::from(u64::MAX) + 1;
        assert!(toml::to_string_pretty(&config).is_err());
    }
}
