// 9.0 config.rs: human-unit settings in one place. pool parameters are written as
// plain decimals (1.5 ratio, 100 stablecoin floor) and converted to fixed point once.
// 9.1 PoolConfig is per collateral type, 9.2 ProtocolConfig wraps pools and engine settings.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::engine::EngineConfig;
use crate::math::{MathError, Rad, Ray};
use crate::pool::{LiquidationStrategy, PoolError, PoolParams};
use crate::types::{Address, PoolId};

/** 9.1: one collateral pool. amounts in stablecoin units, ratios as fractions */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    // Collateral symbol (e.g. "WXDC")
    pub name: String,
    pub pool_id: PoolId,
    // Pool-wide debt cap
    pub debt_ceiling: Decimal,
    // Per-position debt cap
    pub position_debt_ceiling: Decimal,
    // Smallest non-zero debt a position may carry
    pub debt_floor: Decimal,
    // Share of collateral value that may be borrowed (0.7 = 70%). liquidation ratio is 1 / this
    pub collateral_factor: Decimal,
    // Per-second fee factor, e.g. 1.000000000627937192491029810 is ~2% a year
    pub stability_fee_rate: Decimal,
    pub close_factor_bps: u32,
    pub liquidator_incentive_bps: u32,
    pub treasury_fee_bps: u32,
    pub strategy: Option<LiquidationStrategy>,
    // Oldest price a liquidation accepts
    pub price_max_age_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::wxdc()
    }
}

impl PoolConfig {
    pub fn wxdc() -> Self {
        Self {
            name: "WXDC".to_string(),
            pool_id: PoolId(1),
            debt_ceiling: dec!(10_000_000),
            position_debt_ceiling: dec!(1_000_000),
            debt_floor: dec!(100),
            collateral_factor: dec!(0.7),
            stability_fee_rate: dec!(1.000000000627937192491029810), // 2% APY
            close_factor_bps: 5_000,
            liquidator_incentive_bps: 10_500,
            treasury_fee_bps: 5_000,
            strategy: Some(LiquidationStrategy::FixedSpread),
            price_max_age_secs: 3_600,
        }
    }

    // Tighter ratios, larger floor, slower liquidations
    pub fn conservative() -> Self {
        Self {
            name: "WXDC-C".to_string(),
            debt_ceiling: dec!(1_000_000),
            position_debt_ceiling: dec!(100_000),
            debt_floor: dec!(500),
            collateral_factor: dec!(0.5),
            stability_fee_rate: dec!(1.000000001547125957863212448), // 5% APY
            close_factor_bps: 2_500,
            liquidator_incentive_bps: 11_000,
            treasury_fee_bps: 2_000,
            price_max_age_secs: 900,
            ..Self::wxdc()
        }
    }

    pub fn liquidation_ratio(&self) -> Result<Ray, ConfigError> {
        if self.collateral_factor <= Decimal::ZERO || self.collateral_factor > Decimal::ONE {
            return Err(ConfigError::InvalidPool {
                pool: self.name.clone(),
                reason: format!("collateral factor {} outside (0, 1]", self.collateral_factor),
            });
        }
        Ok(Ray::ONE.rdiv(Ray::from_decimal(self.collateral_factor)?)?)
    }

    /// Fixed-point parameters as the pool registry stores them.
    pub fn to_params(&self) -> Result<PoolParams, ConfigError> {
        Ok(PoolParams {
            debt_ceiling: Rad::from_decimal(self.debt_ceiling)?,
            position_debt_ceiling: Rad::from_decimal(self.position_debt_ceiling)?,
            debt_floor: Rad::from_decimal(self.debt_floor)?,
            liquidation_ratio: self.liquidation_ratio()?,
            stability_fee_rate: Ray::from_decimal(self.stability_fee_rate)?,
            close_factor_bps: self.close_factor_bps,
            liquidator_incentive_bps: self.liquidator_incentive_bps,
            treasury_fee_bps: self.treasury_fee_bps,
            strategy: self.strategy,
            price_max_age: self.price_max_age_secs,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.to_params()?
            .validate()
            .map_err(|e: PoolError| ConfigError::InvalidPool {
                pool: self.name.clone(),
                reason: e.to_string(),
            })
    }
}

/** 9.2: protocol-wide settings plus every pool to initialize */
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub total_debt_ceiling: Decimal,
    // Stablecoin kept back on surplus withdrawals
    pub surplus_buffer: Decimal,
    // Stablecoin target price in the price sources' unit
    pub reference_price: Decimal,
    pub max_events: usize,
    pub pools: Vec<PoolConfig>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            total_debt_ceiling: dec!(100_000_000),
            surplus_buffer: dec!(10_000),
            reference_price: Decimal::ONE,
            max_events: 100_000,
            pools: vec![PoolConfig::wxdc()],
        }
    }
}

impl ProtocolConfig {
    pub fn testnet() -> Self {
        let mut config = Self::default();
        config.total_debt_ceiling = dec!(1_000_000);
        config.surplus_buffer = Decimal::ZERO;
        config.pools[0].debt_ceiling = dec!(1_000_000);
        config.pools[0].position_debt_ceiling = dec!(100_000);
        config.pools[0].price_max_age_secs = 86_400; // testnet keepers are slow
        config
    }

    pub fn mainnet_conservative() -> Self {
        Self {
            total_debt_ceiling: dec!(10_000_000),
            surplus_buffer: dec!(50_000),
            pools: vec![PoolConfig::conservative()],
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reference_price <= Decimal::ZERO {
            return Err(ConfigError::InvalidProtocol {
                reason: "Reference price must be positive".to_string(),
            });
        }
        if self.max_events == 0 {
            return Err(ConfigError::InvalidProtocol {
                reason: "Need room for at least one event".to_string(),
            });
        }
        let mut seen = std::collections::BTreeSet::new();
        for pool in &self.pools {
            if !seen.insert(pool.pool_id) {
                return Err(ConfigError::InvalidPool {
                    pool: pool.name.clone(),
                    reason: format!("duplicate pool id {}", pool.pool_id),
                });
            }
            pool.validate()?;
        }
        Ok(())
    }

    /// Engine settings owned by `owner`. Pools are initialized separately.
    pub fn engine_config(&self, owner: Address) -> Result<EngineConfig, ConfigError> {
        self.validate()?;
        Ok(EngineConfig {
            max_events: self.max_events,
            owner,
            surplus_engine: Address::SYSTEM_DEBT_ENGINE,
            surplus_buffer: Rad::from_decimal(self.surplus_buffer)?,
            reference_price: Ray::from_decimal(self.reference_price)?,
            total_debt_ceiling: Rad::from_decimal(self.total_debt_ceiling)?,
            ..EngineConfig::default()
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid pool {pool}: {reason}")]
    InvalidPool { pool: String, reason: String },

    #[error("Invalid protocol config: {reason}")]
    InvalidProtocol { reason: String },

    #[error("Value out of fixed point range: {0}")]
    OutOfRange(#[from] MathError),
}

// Environment presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Development,
    Testnet,
    Mainnet,
}

impl Environment {
    pub fn config(&self) -> ProtocolConfig {
        match self {
            Environment::Development => ProtocolConfig::default(),
            Environment::Testnet => ProtocolConfig::testnet(),
            Environment::Mainnet => ProtocolConfig::mainnet_conservative(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_valid() {
        assert!(PoolConfig::wxdc().validate().is_ok());
        assert!(PoolConfig::conservative().validate().is_ok());
        assert!(ProtocolConfig::default().validate().is_ok());
    }

    #[test]
    fn test_liquidation_ratio_from_collateral_factor() {
        let ratio = PoolConfig::wxdc().liquidation_ratio().unwrap();
        assert_eq!(ratio, Ray::from_fraction(10, 7).unwrap());
        assert_eq!(PoolConfig::conservative().liquidation_ratio().unwrap(), Ray::from_integer(2));
    }

    #[test]
    fn test_fixed_point_conversion() {
        let params = PoolConfig::wxdc().to_params().unwrap();
        assert_eq!(params.debt_floor, Rad::from_integer(100));
        assert_eq!(params.debt_ceiling, Rad::from_integer(10_000_000));
        assert_eq!(
            params.stability_fee_rate.raw().to_string(),
            "1000000000627937192491029810"
        );
    }

    #[test]
    fn test_invalid_collateral_factor() {
        let mut config = PoolConfig::wxdc();
        config.collateral_factor = dec!(1.2);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPool { .. })));

        config.collateral_factor = Decimal::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_bounds() {
        let mut config = PoolConfig::wxdc();
        config.debt_floor = dec!(2_000_000);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("debt bounds"), "{}", err);
    }

    #[test]
    fn test_duplicate_pool_ids_rejected() {
        let mut config = ProtocolConfig::default();
        config.pools.push(PoolConfig::conservative());
        assert!(matches!(config.validate(), Err(ConfigError::InvalidPool { .. })));

        config.pools[1].pool_id = PoolId(2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_presets() {
        assert!(Environment::Development.config().validate().is_ok());
        assert!(Environment::Testnet.config().validate().is_ok());
        assert!(Environment::Mainnet.config().validate().is_ok());

        let engine = Environment::Mainnet.config().engine_config(Address(1)).unwrap();
        assert_eq!(engine.surplus_buffer, Rad::from_integer(50_000));
        assert_eq!(engine.reference_price, Ray::ONE);
    }

    #[test]
    fn test_config_serialization() {
        let config = ProtocolConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: ProtocolConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
