//! Collateral pool configuration and accumulators.
//!
//! A pool is one collateral type with its own ceilings, price, stability fee
//! and liquidation parameters. The registry owns every pool record; the ledger
//! and the fee engine only touch the accumulator fields through it.

use crate::math::{MathError, Rad, Ray, Wad, BPS_DENOMINATOR};
use crate::types::{PoolId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_LIQUIDATION_RATIO: u128 = 100;
pub const MIN_LIQUIDATOR_INCENTIVE_BPS: u32 = 10_000;
pub const MAX_LIQUIDATOR_INCENTIVE_BPS: u32 = 20_000;
pub const MAX_TREASURY_FEE_BPS: u32 = 9_000;

/// Liquidation algorithm a pool delegates to. Only one exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidationStrategy {
    FixedSpread,
}

/// Governance-set parameters, the part of a pool supplied at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParams {
    pub debt_ceiling: Rad,
    pub position_debt_ceiling: Rad,
    pub debt_floor: Rad,
    pub liquidation_ratio: Ray,
    /// Per-second multiplicative factor.
    pub stability_fee_rate: Ray,
    pub close_factor_bps: u32,
    pub liquidator_incentive_bps: u32,
    pub treasury_fee_bps: u32,
    pub strategy: Option<LiquidationStrategy>,
    /// Oldest price (seconds) a liquidation will accept.
    pub price_max_age: u64,
}

impl PoolParams {
    pub fn validate(&self) -> Result<(), PoolError> {
        validate_liquidation_ratio(self.liquidation_ratio)?;
        validate_stability_fee_rate(self.stability_fee_rate)?;
        validate_close_factor(self.close_factor_bps)?;
        validate_liquidator_incentive(self.liquidator_incentive_bps)?;
        validate_treasury_fee(self.treasury_fee_bps)?;
        validate_debt_bounds(self.debt_ceiling, self.position_debt_ceiling, self.debt_floor)
    }
}

// 4.0: field validators, shared by init and the setters

pub fn validate_liquidation_ratio(ratio: Ray) -> Result<(), PoolError> {
    if ratio < Ray::ONE || ratio > Ray::from_integer(MAX_LIQUIDATION_RATIO) {
        return Err(PoolError::InvalidLiquidationRatio(ratio));
    }
    Ok(())
}

pub fn validate_stability_fee_rate(rate: Ray) -> Result<(), PoolError> {
    if rate < Ray::ONE {
        return Err(PoolError::InvalidStabilityFeeRate(rate));
    }
    Ok(())
}

pub fn validate_close_factor(bps: u32) -> Result<(), PoolError> {
    if bps == 0 || bps > BPS_DENOMINATOR {
        return Err(PoolError::InvalidCloseFactor(bps));
    }
    Ok(())
}

pub fn validate_liquidator_incentive(bps: u32) -> Result<(), PoolError> {
    if !(MIN_LIQUIDATOR_INCENTIVE_BPS..=MAX_LIQUIDATOR_INCENTIVE_BPS).contains(&bps) {
        return Err(PoolError::InvalidLiquidatorIncentive(bps));
    }
    Ok(())
}

pub fn validate_treasury_fee(bps: u32) -> Result<(), PoolError> {
    if bps > MAX_TREASURY_FEE_BPS {
        return Err(PoolError::InvalidTreasuryFee(bps));
    }
    Ok(())
}

/// `debt_ceiling > debt_floor` and `debt_floor < position_debt_ceiling <= debt_ceiling`.
pub fn validate_debt_bounds(
    debt_ceiling: Rad,
    position_debt_ceiling: Rad,
    debt_floor: Rad,
) -> Result<(), PoolError> {
    if debt_ceiling <= debt_floor
        || position_debt_ceiling <= debt_floor
        || position_debt_ceiling > debt_ceiling
    {
        return Err(PoolError::InvalidDebtBounds {
            debt_ceiling,
            position_debt_ceiling,
            debt_floor,
        });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralPool {
    pub id: PoolId,
    pub debt_ceiling: Rad,
    pub position_debt_ceiling: Rad,
    pub debt_floor: Rad,
    /// Raw price already discounted by the liquidation ratio. Zero disables new debt.
    pub price_with_safety_margin: Ray,
    pub liquidation_ratio: Ray,
    pub stability_fee_rate: Ray,
    /// Converts debt share into debt value. Starts at one, never decreases.
    pub debt_accumulated_rate: Ray,
    pub total_debt_share: Wad,
    pub last_accrual_time: Timestamp,
    pub close_factor_bps: u32,
    pub liquidator_incentive_bps: u32,
    pub treasury_fee_bps: u32,
    pub strategy: Option<LiquidationStrategy>,
    pub price_max_age: u64,
}

impl CollateralPool {
    pub fn new(id: PoolId, params: PoolParams, price_with_safety_margin: Ray, now: Timestamp) -> Self {
        Self {
            id,
            debt_ceiling: params.debt_ceiling,
            position_debt_ceiling: params.position_debt_ceiling,
            debt_floor: params.debt_floor,
            price_with_safety_margin,
            liquidation_ratio: params.liquidation_ratio,
            stability_fee_rate: params.stability_fee_rate,
            debt_accumulated_rate: Ray::ONE,
            total_debt_share: Wad::zero(),
            last_accrual_time: now,
            close_factor_bps: params.close_factor_bps,
            liquidator_incentive_bps: params.liquidator_incentive_bps,
            treasury_fee_bps: params.treasury_fee_bps,
            strategy: params.strategy,
            price_max_age: params.price_max_age,
        }
    }

    pub fn params(&self) -> PoolParams {
        PoolParams {
            debt_ceiling: self.debt_ceiling,
            position_debt_ceiling: self.position_debt_ceiling,
            debt_floor: self.debt_floor,
            liquidation_ratio: self.liquidation_ratio,
            stability_fee_rate: self.stability_fee_rate,
            close_factor_bps: self.close_factor_bps,
            liquidator_incentive_bps: self.liquidator_incentive_bps,
            treasury_fee_bps: self.treasury_fee_bps,
            strategy: self.strategy,
            price_max_age: self.price_max_age,
        }
    }

    /// `debt_share * debt_accumulated_rate`
    pub fn debt_value(&self, debt_share: Wad) -> Result<Rad, MathError> {
        debt_share.mul_ray(self.debt_accumulated_rate)
    }

    pub fn total_debt_value(&self) -> Result<Rad, MathError> {
        self.debt_value(self.total_debt_share)
    }

    /// `locked_collateral * price_with_safety_margin >= debt_share * debt_accumulated_rate`
    pub fn is_safe(&self, locked_collateral: Wad, debt_share: Wad) -> Result<bool, MathError> {
        let capacity = locked_collateral.mul_ray(self.price_with_safety_margin)?;
        Ok(capacity >= self.debt_value(debt_share)?)
    }
}

/// One record per initialized pool. Records are never removed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollateralPoolRegistry {
    pools: BTreeMap<PoolId, CollateralPool>,
}

impl CollateralPoolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self, id: PoolId) -> bool {
        self.pools.contains_key(&id)
    }

    pub fn get(&self, id: PoolId) -> Result<&CollateralPool, PoolError> {
        self.pools.get(&id).ok_or(PoolError::NotInitialized(id))
    }

    pub(crate) fn get_mut(&mut self, id: PoolId) -> Result<&mut CollateralPool, PoolError> {
        self.pools.get_mut(&id).ok_or(PoolError::NotInitialized(id))
    }

    pub fn pools(&self) -> impl Iterator<Item = &CollateralPool> {
        self.pools.values()
    }

    pub fn pool_ids(&self) -> Vec<PoolId> {
        self.pools.keys().copied().collect()
    }

    /// One-time. The caller has already read a healthy price for this pool.
    pub fn init_pool(
        &mut self,
        id: PoolId,
        params: PoolParams,
        price_with_safety_margin: Ray,
        now: Timestamp,
    ) -> Result<&CollateralPool, PoolError> {
        if self.pools.contains_key(&id) {
            return Err(PoolError::AlreadyInitialized(id));
        }
        params.validate()?;
        let pool = CollateralPool::new(id, params, price_with_safety_margin, now);
        Ok(self.pools.entry(id).or_insert(pool))
    }

    // 4.1: setters. each validates before writing and returns the previous value.

    pub fn set_debt_ceiling(&mut self, id: PoolId, value: Rad) -> Result<Rad, PoolError> {
        let pool = self.get_mut(id)?;
        validate_debt_bounds(value, pool.position_debt_ceiling, pool.debt_floor)?;
        Ok(std::mem::replace(&mut pool.debt_ceiling, value))
    }

    pub fn set_position_debt_ceiling(&mut self, id: PoolId, value: Rad) -> Result<Rad, PoolError> {
        let pool = self.get_mut(id)?;
        validate_debt_bounds(pool.debt_ceiling, value, pool.debt_floor)?;
        Ok(std::mem::replace(&mut pool.position_debt_ceiling, value))
    }

    pub fn set_debt_floor(&mut self, id: PoolId, value: Rad) -> Result<Rad, PoolError> {
        let pool = self.get_mut(id)?;
        validate_debt_bounds(pool.debt_ceiling, pool.position_debt_ceiling, value)?;
        Ok(std::mem::replace(&mut pool.debt_floor, value))
    }

    pub fn set_price_with_safety_margin(&mut self, id: PoolId, value: Ray) -> Result<Ray, PoolError> {
        let pool = self.get_mut(id)?;
        Ok(std::mem::replace(&mut pool.price_with_safety_margin, value))
    }

    pub fn set_liquidation_ratio(&mut self, id: PoolId, value: Ray) -> Result<Ray, PoolError> {
        validate_liquidation_ratio(value)?;
        let pool = self.get_mut(id)?;
        Ok(std::mem::replace(&mut pool.liquidation_ratio, value))
    }

    /// Pending fees must already be collected at the old rate.
    pub fn set_stability_fee_rate(&mut self, id: PoolId, value: Ray) -> Result<Ray, PoolError> {
        validate_stability_fee_rate(value)?;
        let pool = self.get_mut(id)?;
        Ok(std::mem::replace(&mut pool.stability_fee_rate, value))
    }

    pub fn set_close_factor_bps(&mut self, id: PoolId, value: u32) -> Result<u32, PoolError> {
        validate_close_factor(value)?;
        let pool = self.get_mut(id)?;
        Ok(std::mem::replace(&mut pool.close_factor_bps, value))
    }

    pub fn set_liquidator_incentive_bps(&mut self, id: PoolId, value: u32) -> Result<u32, PoolError> {
        validate_liquidator_incentive(value)?;
        let pool = self.get_mut(id)?;
        Ok(std::mem::replace(&mut pool.liquidator_incentive_bps, value))
    }

    pub fn set_treasury_fee_bps(&mut self, id: PoolId, value: u32) -> Result<u32, PoolError> {
        validate_treasury_fee(value)?;
        let pool = self.get_mut(id)?;
        Ok(std::mem::replace(&mut pool.treasury_fee_bps, value))
    }

    pub fn set_strategy(
        &mut self,
        id: PoolId,
        value: Option<LiquidationStrategy>,
    ) -> Result<Option<LiquidationStrategy>, PoolError> {
        let pool = self.get_mut(id)?;
        Ok(std::mem::replace(&mut pool.strategy, value))
    }

    pub fn set_price_max_age(&mut self, id: PoolId, seconds: u64) -> Result<u64, PoolError> {
        let pool = self.get_mut(id)?;
        Ok(std::mem::replace(&mut pool.price_max_age, seconds))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PoolError {
    #[error("Pool {0} already initialized")]
    AlreadyInitialized(PoolId),

    #[error("Pool {0} not initialized")]
    NotInitialized(PoolId),

    #[error("Liquidation ratio {0} outside [1, 100]")]
    InvalidLiquidationRatio(Ray),

    #[error("Stability fee rate {0} below 1")]
    InvalidStabilityFeeRate(Ray),

    #[error("Close factor {0} bps outside (0, 10000]")]
    InvalidCloseFactor(u32),

    #[error("Liquidator incentive {0} bps outside [10000, 20000]")]
    InvalidLiquidatorIncentive(u32),

    #[error("Treasury fee {0} bps above 9000")]
    InvalidTreasuryFee(u32),

    #[error("Invalid debt bounds: ceiling {debt_ceiling}, position ceiling {position_debt_ceiling}, floor {debt_floor}")]
    InvalidDebtBounds {
        debt_ceiling: Rad,
        position_debt_ceiling: Rad,
        debt_floor: Rad,
    },
}
