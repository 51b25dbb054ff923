//! Collateral pool initialization and parameter governance.

use super::core::Engine;
use super::results::EngineError;
use crate::access::Role;
use crate::events::{EventPayload, PoolInitializedEvent, PoolParam, PoolParamUpdatedEvent};
use crate::math::{Rad, Ray};
use crate::pool::{validate_stability_fee_rate, CollateralPool, LiquidationStrategy, PoolParams};
use crate::price_feed::{price_with_safety_margin, PriceSource};
use crate::types::{Address, PoolId};

impl Engine {
    /// One-time pool setup. The source must be wired to `pool` and report a
    /// healthy price, which seeds `price_with_safety_margin`.
    pub fn init_collateral_pool(
        &mut self,
        caller: Address,
        pool: PoolId,
        params: PoolParams,
        source: &impl PriceSource,
    ) -> Result<&CollateralPool, EngineError> {
        self.require_live()?;
        self.require_role(caller, Role::Owner)?;
        if source.pool_id() != pool {
            return Err(EngineError::PriceSourceMismatch {
                pool,
                source_pool: source.pool_id(),
            });
        }
        let quote = source.get_price();
        if !quote.ok {
            return Err(EngineError::PriceUnhealthy(pool));
        }
        params.validate()?;
        let raw = quote.raw_price(self.reference_price)?;
        let margined = price_with_safety_margin(raw, params.liquidation_ratio)?;

        self.pools.init_pool(pool, params, margined, self.current_time)?;
        tracing::info!(%pool, price_with_safety_margin = %margined, "collateral pool initialized");
        self.emit_event(
            caller,
            EventPayload::PoolInitialized(PoolInitializedEvent {
                pool,
                params,
                price_with_safety_margin: margined,
            }),
        );
        Ok(self.pools.get(pool)?)
    }

    fn record_param(&mut self, caller: Address, pool: PoolId, param: PoolParam) {
        tracing::debug!(%pool, ?param, "pool parameter updated");
        self.emit_event(caller, EventPayload::PoolParamUpdated(PoolParamUpdatedEvent { pool, param }));
    }

    pub fn set_debt_ceiling(&mut self, caller: Address, pool: PoolId, value: Rad) -> Result<Rad, EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::Owner)?;
        let old = self.pools.set_debt_ceiling(pool, value)?;
        self.record_param(caller, pool, PoolParam::DebtCeiling(value));
        Ok(old)
    }

    pub fn set_position_debt_ceiling(&mut self, caller: Address, pool: PoolId, value: Rad) -> Result<Rad, EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::Owner)?;
        let old = self.pools.set_position_debt_ceiling(pool, value)?;
        self.record_param(caller, pool, PoolParam::PositionDebtCeiling(value));
        Ok(old)
    }

    pub fn set_debt_floor(&mut self, caller: Address, pool: PoolId, value: Rad) -> Result<Rad, EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::Owner)?;
        let old = self.pools.set_debt_floor(pool, value)?;
        self.record_param(caller, pool, PoolParam::DebtFloor(value));
        Ok(old)
    }

    /// Direct write by a price oracle. Zero disables new debt in the pool.
    pub fn set_price_with_safety_margin(
        &mut self,
        caller: Address,
        pool: PoolId,
        value: Ray,
    ) -> Result<Ray, EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::PriceOracle)?;
        let old = self.pools.set_price_with_safety_margin(pool, value)?;
        self.record_param(caller, pool, PoolParam::PriceWithSafetyMargin(value));
        Ok(old)
    }

    /// Takes effect for safety checks at the next price poke.
    pub fn set_liquidation_ratio(&mut self, caller: Address, pool: PoolId, value: Ray) -> Result<Ray, EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::Owner)?;
        let old = self.pools.set_liquidation_ratio(pool, value)?;
        self.record_param(caller, pool, PoolParam::LiquidationRatio(value));
        Ok(old)
    }

    /// Collects pending fees at the old rate before switching.
    pub fn set_stability_fee_rate(&mut self, caller: Address, pool: PoolId, value: Ray) -> Result<Ray, EngineError> {
        self.require_live()?;
        self.require_role(caller, Role::Owner)?;
        validate_stability_fee_rate(value)?;
        self.pools.get(pool)?;

        self.collect(pool)?;
        let old = self.pools.set_stability_fee_rate(pool, value)?;
        self.record_param(caller, pool, PoolParam::StabilityFeeRate(value));
        Ok(old)
    }

    pub fn set_close_factor_bps(&mut self, caller: Address, pool: PoolId, value: u32) -> Result<u32, EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::Owner)?;
        let old = self.pools.set_close_factor_bps(pool, value)?;
        self.record_param(caller, pool, PoolParam::CloseFactorBps(value));
        Ok(old)
    }

    pub fn set_liquidator_incentive_bps(
        &mut self,
        caller: Address,
        pool: PoolId,
        value: u32,
    ) -> Result<u32, EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::Owner)?;
        let old = self.pools.set_liquidator_incentive_bps(pool, value)?;
        self.record_param(caller, pool, PoolParam::LiquidatorIncentiveBps(value));
        Ok(old)
    }

    pub fn set_treasury_fees_bps(&mut self, caller: Address, pool: PoolId, value: u32) -> Result<u32, EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::Owner)?;
        let old = self.pools.set_treasury_fee_bps(pool, value)?;
        self.record_param(caller, pool, PoolParam::TreasuryFeeBps(value));
        Ok(old)
    }

    pub fn set_strategy(
        &mut self,
        caller: Address,
        pool: PoolId,
        value: Option<LiquidationStrategy>,
    ) -> Result<Option<LiquidationStrategy>, EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::Owner)?;
        let old = self.pools.set_strategy(pool, value)?;
        self.record_param(caller, pool, PoolParam::Strategy(value));
        Ok(old)
    }

    /// Zero falls back to the engine's default staleness bound.
    pub fn set_price_max_age(&mut self, caller: Address, pool: PoolId, seconds: u64) -> Result<u64, EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::Owner)?;
        let old = self.pools.set_price_max_age(pool, seconds)?;
        self.record_param(caller, pool, PoolParam::PriceMaxAge(seconds));
        Ok(old)
    }

    /// Staleness bound applied to `pool`'s price quotes.
    pub fn effective_price_max_age(&self, pool: &CollateralPool) -> u64 {
        match pool.price_max_age {
            0 => self.config.default_price_max_age,
            age => age,
        }
    }
}
