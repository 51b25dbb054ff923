//! Liquidation detection and execution.

use super::core::Engine;
use super::results::{EngineError, LiquidationResult};
use crate::access::Role;
use crate::events::{BadDebtEvent, EventPayload, LiquidationEvent};
use crate::liquidation::{FixedSpreadParams, FixedSpreadStrategy};
use crate::math::{Rad, Wad};
use crate::pool::LiquidationStrategy;
use crate::price_feed::PriceSource;
use crate::types::{Address, PoolId};

/// Arguments of [`Engine::liquidate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationRequest {
    pub pool: PoolId,
    pub position: Address,
    /// Upper bound on debt share to close. The strategy may close less, or all of it.
    pub debt_share_to_repay: Wad,
    /// Slippage guard on the stablecoin the liquidator pays.
    pub max_repay_value: Rad,
    /// Receives the liquidator's share of seized collateral.
    pub recipient: Address,
    /// Opaque, echoed in the result and event.
    pub data: Vec<u8>,
}

impl Engine {
    /// Positions in `pool` that fail the safety check at the stored margined
    /// price and current rate, in address order.
    pub fn unsafe_positions(&self, pool: PoolId) -> Result<Vec<Address>, EngineError> {
        let record = self.pools.get(pool)?;
        let mut found = Vec::new();
        for (address, position) in self.ledger.pool_positions(pool) {
            if position.debt_share.is_zero() {
                continue;
            }
            if !record.is_safe(position.locked_collateral, position.debt_share)? {
                found.push(address);
            }
        }
        Ok(found)
    }

    /// Liquidates an unsafe position. The caller pays the repaid stablecoin
    /// and `request.recipient` receives collateral net of the treasury fee.
    pub fn liquidate(
        &mut self,
        caller: Address,
        request: LiquidationRequest,
        source: &impl PriceSource,
    ) -> Result<LiquidationResult, EngineError> {
        match self.try_liquidate(caller, request, source) {
            Ok(result) => Ok(result),
            Err(err) => {
                tracing::debug!(%caller, error = %err, "liquidation rejected");
                Err(err)
            }
        }
    }

    fn try_liquidate(
        &mut self,
        caller: Address,
        request: LiquidationRequest,
        source: &impl PriceSource,
    ) -> Result<LiquidationResult, EngineError> {
        self.require_live()?;
        self.require_role(caller, Role::Liquidator)?;
        if request.debt_share_to_repay.is_zero() {
            return Err(EngineError::ZeroRepay);
        }

        let pool_id = request.pool;
        let pool = self.pools.get(pool_id)?;
        let Some(LiquidationStrategy::FixedSpread) = pool.strategy else {
            return Err(EngineError::NoStrategy(pool_id));
        };

        // 8.10: price checks. the source must serve this pool and be healthy and fresh
        if source.pool_id() != pool_id {
            return Err(EngineError::PriceSourceMismatch {
                pool: pool_id,
                source_pool: source.pool_id(),
            });
        }
        let quote = source.get_price();
        if !quote.ok {
            return Err(EngineError::PriceUnhealthy(pool_id));
        }
        let max_age = self.effective_price_max_age(pool);
        if !quote.is_fresh(self.current_time, max_age) {
            return Err(EngineError::PriceStale {
                pool: pool_id,
                published: quote.timestamp,
                max_age,
                now: self.current_time,
            });
        }

        let position = self.ledger.position(pool_id, request.position);
        if pool.is_safe(position.locked_collateral, position.debt_share)? {
            return Err(EngineError::PositionSafe {
                pool: pool_id,
                position: request.position,
            });
        }

        // 8.11: the strategy runs on the unmargined price
        let raw_price = quote.raw_price(self.reference_price)?;
        let params = FixedSpreadParams::from(pool);
        let outcome = FixedSpreadStrategy.execute(&params, &position, request.debt_share_to_repay, raw_price)?;
        if outcome.is_empty() || outcome.actual_debt_value_repaid.is_zero() {
            return Err(EngineError::NothingLiquidated);
        }
        if outcome.actual_debt_value_repaid > request.max_repay_value {
            return Err(EngineError::SlippageExceeded {
                repaid: outcome.actual_debt_value_repaid,
                max: request.max_repay_value,
            });
        }

        let surplus_address = self.surplus.address;
        let position_after = self.ledger.apply_liquidation(
            &mut self.pools,
            pool_id,
            request.position,
            caller,
            request.recipient,
            surplus_address,
            &outcome,
        )?;

        tracing::info!(
            pool = %pool_id,
            position = %request.position,
            liquidator = %caller,
            debt_share = %outcome.debt_share_liquidated,
            repaid = %outcome.actual_debt_value_repaid,
            seized = %outcome.collateral_seized,
            full_closure = outcome.full_closure,
            "position liquidated"
        );

        self.emit_event(
            caller,
            EventPayload::Liquidation(LiquidationEvent {
                pool: pool_id,
                position: request.position,
                liquidator: caller,
                recipient: request.recipient,
                debt_share_requested: request.debt_share_to_repay,
                raw_price,
                outcome,
                data: request.data.clone(),
            }),
        );

        if !outcome.bad_debt.is_zero() {
            let total_bad_debt = self.surplus.bad_debt(&self.ledger);
            tracing::warn!(
                pool = %pool_id,
                position = %request.position,
                amount = %outcome.bad_debt,
                total = %total_bad_debt,
                "liquidation left bad debt"
            );
            self.emit_event(
                caller,
                EventPayload::BadDebt(BadDebtEvent {
                    pool: pool_id,
                    position: request.position,
                    amount: outcome.bad_debt,
                    total_bad_debt,
                }),
            );
        }

        Ok(LiquidationResult {
            pool: pool_id,
            position: request.position,
            liquidator: caller,
            recipient: request.recipient,
            raw_price,
            outcome,
            position_after,
            data: request.data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::LiquidationRequest;
    use crate::access::Role;
    use crate::engine::{Engine, EngineConfig, EngineError, ErrorKind};
    use crate::ledger::PositionAdjustment;
    use crate::math::{Rad, Ray, SignedWad, Wad};
    use crate::pool::{LiquidationStrategy, PoolParams};
    use crate::price_feed::MockPriceSource;
    use crate::types::{Address, PoolId, Timestamp};

    const OWNER: Address = Address(1);
    const KEEPER: Address = Address(5);
    const BORROWER: Address = Address(10);
    const POOL: PoolId = PoolId(1);

    // ratio 2, price 100: 10 collateral backs 500 debt
    fn setup() -> (Engine, MockPriceSource) {
        let mut engine = Engine::new(EngineConfig {
            owner: OWNER,
            ..EngineConfig::default()
        });
        let source = MockPriceSource::new(POOL, Wad::from_integer(100), Timestamp::from_secs(0));
        let params = PoolParams {
            debt_ceiling: Rad::from_integer(1_000_000),
            position_debt_ceiling: Rad::from_integer(100_000),
            debt_floor: Rad::from_integer(10),
            liquidation_ratio: Ray::from_integer(2),
            stability_fee_rate: Ray::ONE,
            close_factor_bps: 5_000,
            liquidator_incentive_bps: 10_500,
            treasury_fee_bps: 5_000,
            strategy: Some(LiquidationStrategy::FixedSpread),
            price_max_age: 600,
        };
        engine.init_collateral_pool(OWNER, POOL, params, &source).unwrap();
        engine.grant_role(OWNER, Role::Liquidator, KEEPER).unwrap();

        for (who, collateral, debt) in [(BORROWER, 10, 500), (KEEPER, 1_000, 1_000)] {
            engine.add_collateral(OWNER, POOL, who, SignedWad::from_integer(collateral)).unwrap();
            engine
                .adjust_position(
                    who,
                    &PositionAdjustment::by_owner(
                        POOL,
                        who,
                        SignedWad::from_integer(collateral),
                        SignedWad::from_integer(debt),
                    ),
                )
                .unwrap();
        }
        (engine, source)
    }

    fn request(debt_share: u128) -> LiquidationRequest {
        LiquidationRequest {
            pool: POOL,
            position: BORROWER,
            debt_share_to_repay: Wad::from_integer(debt_share),
            max_repay_value: Rad::from_integer(1_000_000),
            recipient: KEEPER,
            data: vec![0xAB],
        }
    }

    fn crash(engine: &mut Engine, source: &mut MockPriceSource, price: u128) {
        source.set_price(Wad::from_integer(price), engine.time());
        engine.poke_price(KEEPER, POOL, source).unwrap();
    }

    #[test]
    fn test_safe_position_rejected() {
        let (mut engine, source) = setup();
        assert!(matches!(
            engine.liquidate(KEEPER, request(100), &source),
            Err(EngineError::PositionSafe { .. })
        ));
        assert!(engine.unsafe_positions(POOL).unwrap().is_empty());
    }

    #[test]
    fn test_liquidator_role_required() {
        let (mut engine, mut source) = setup();
        crash(&mut engine, &mut source, 80);
        let err = engine.liquidate(BORROWER, request(100), &source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[test]
    fn test_zero_repay_rejected() {
        let (mut engine, mut source) = setup();
        crash(&mut engine, &mut source, 80);
        assert!(matches!(
            engine.liquidate(KEEPER, request(0), &source),
            Err(EngineError::ZeroRepay)
        ));
    }

    #[test]
    fn test_price_checks() {
        let (mut engine, mut source) = setup();
        crash(&mut engine, &mut source, 80);

        engine.advance_time(601);
        assert!(matches!(
            engine.liquidate(KEEPER, request(100), &source),
            Err(EngineError::PriceStale { max_age: 600, .. })
        ));

        source.set_price(Wad::from_integer(80), engine.time());
        source.set_healthy(false);
        assert!(matches!(
            engine.liquidate(KEEPER, request(100), &source),
            Err(EngineError::PriceUnhealthy(_))
        ));

        source.set_healthy(true);
        source.rewire(PoolId(7));
        assert!(matches!(
            engine.liquidate(KEEPER, request(100), &source),
            Err(EngineError::PriceSourceMismatch { .. })
        ));
    }

    #[test]
    fn test_slippage_guard() {
        let (mut engine, mut source) = setup();
        crash(&mut engine, &mut source, 80);
        let mut req = request(100);
        req.max_repay_value = Rad::from_integer(99);
        assert!(matches!(
            engine.liquidate(KEEPER, req, &source),
            Err(EngineError::SlippageExceeded { .. })
        ));
    }

    #[test]
    fn test_missing_strategy() {
        let (mut engine, mut source) = setup();
        crash(&mut engine, &mut source, 80);
        engine.set_strategy(OWNER, POOL, None).unwrap();
        assert!(matches!(
            engine.liquidate(KEEPER, request(100), &source),
            Err(EngineError::NoStrategy(_))
        ));
    }

    #[test]
    fn test_partial_liquidation_moves_value() {
        let (mut engine, mut source) = setup();
        crash(&mut engine, &mut source, 80);
        assert_eq!(engine.unsafe_positions(POOL).unwrap(), vec![BORROWER]);

        let keeper_before = engine.stablecoin(KEEPER);
        let result = engine.liquidate(KEEPER, request(100), &source).unwrap();

        // 100 × 1.05 / 80
        assert_eq!(result.outcome.collateral_seized, Wad::from_raw_u128(1_312_500_000_000_000_000));
        assert_eq!(result.position_after.debt_share, Wad::from_integer(400));
        assert_eq!(result.data, vec![0xAB]);
        assert_eq!(
            engine.stablecoin(KEEPER),
            keeper_before.checked_sub(Rad::from_integer(100)).unwrap()
        );
        let surplus = engine.surplus_engine().address;
        assert_eq!(engine.collateral(POOL, surplus), result.outcome.treasury_fee);
        assert_eq!(
            engine.collateral(POOL, KEEPER),
            result.outcome.collateral_to_liquidator
        );
        assert!(engine.system_bad_debt(surplus).is_zero());
        engine.check_invariants().unwrap();
    }

    #[test]
    fn test_rejection_leaves_state_untouched() {
        let (mut engine, mut source) = setup();
        crash(&mut engine, &mut source, 80);
        let ledger = engine.ledger().clone();
        let events = engine.events().len();

        let mut req = request(100);
        req.max_repay_value = Rad::zero();
        assert!(engine.liquidate(KEEPER, req, &source).is_err());
        assert_eq!(engine.ledger(), &ledger);
        assert_eq!(engine.events().len(), events);
    }
}
