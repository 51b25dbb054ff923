//! Bad debt settlement, surplus withdrawal and unbacked issuance.

use super::core::Engine;
use super::results::{EngineError, SettlementResult};
use crate::access::Role;
use crate::events::{
    BadDebtSettledEvent, CollateralSurplusWithdrawnEvent, EventPayload, StablecoinSurplusWithdrawnEvent,
    UnbackedMintedEvent,
};
use crate::math::{Rad, Wad};
use crate::types::{Address, PoolId};

impl Engine {
    /// Burns `amount` of surplus against the same amount of bad debt. Open to anyone.
    pub fn settle_system_bad_debt(&mut self, caller: Address, amount: Rad) -> Result<SettlementResult, EngineError> {
        self.require_unpaused()?;
        self.surplus.settle_system_bad_debt(&mut self.ledger, amount)?;
        Ok(self.record_settlement(caller, amount))
    }

    /// Settles `min(surplus, bad debt)`.
    pub fn settle_max_bad_debt(&mut self, caller: Address) -> Result<SettlementResult, EngineError> {
        self.require_unpaused()?;
        let amount = self.surplus.settle_max(&mut self.ledger)?;
        Ok(self.record_settlement(caller, amount))
    }

    fn record_settlement(&mut self, caller: Address, amount: Rad) -> SettlementResult {
        let result = SettlementResult {
            amount,
            remaining_bad_debt: self.surplus.bad_debt(&self.ledger),
            remaining_surplus: self.surplus.surplus(&self.ledger),
        };
        if amount.is_zero() {
            return result;
        }
        tracing::info!(
            amount = %result.amount,
            remaining_bad_debt = %result.remaining_bad_debt,
            "bad debt settled"
        );
        self.emit_event(
            caller,
            EventPayload::BadDebtSettled(BadDebtSettledEvent {
                amount: result.amount,
                remaining_bad_debt: result.remaining_bad_debt,
                remaining_surplus: result.remaining_surplus,
            }),
        );
        result
    }

    pub fn withdraw_stablecoin_surplus(&mut self, caller: Address, to: Address, amount: Rad) -> Result<Rad, EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::Owner)?;
        self.surplus.withdraw_stablecoin_surplus(&mut self.ledger, to, amount)?;
        let remaining_surplus = self.surplus.surplus(&self.ledger);
        self.emit_event(
            caller,
            EventPayload::StablecoinSurplusWithdrawn(StablecoinSurplusWithdrawnEvent {
                to,
                amount,
                remaining_surplus,
            }),
        );
        Ok(remaining_surplus)
    }

    pub fn withdraw_collateral_surplus(
        &mut self,
        caller: Address,
        pool: PoolId,
        to: Address,
        amount: Wad,
    ) -> Result<(), EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::Owner)?;
        self.surplus.withdraw_collateral_surplus(&mut self.ledger, pool, to, amount)?;
        self.emit_event(
            caller,
            EventPayload::CollateralSurplusWithdrawn(CollateralSurplusWithdrawnEvent { pool, to, amount }),
        );
        Ok(())
    }

    pub fn set_surplus_buffer(&mut self, caller: Address, value: Rad) -> Result<Rad, EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::Owner)?;
        let old = std::mem::replace(&mut self.surplus.surplus_buffer, value);
        self.emit_event(caller, EventPayload::SurplusBufferUpdated { old, new: value });
        Ok(old)
    }

    /// Issues stablecoin to `to` against bad debt booked on `debt_holder`.
    pub fn mint_unbacked_stablecoin(
        &mut self,
        caller: Address,
        debt_holder: Address,
        to: Address,
        amount: Rad,
    ) -> Result<(), EngineError> {
        self.require_unpaused()?;
        self.require_role(caller, Role::Mintable)?;
        self.ledger.mint_unbacked_stablecoin(debt_holder, to, amount)?;
        tracing::warn!(%debt_holder, %to, %amount, "unbacked stablecoin minted");
        self.emit_event(
            caller,
            EventPayload::UnbackedMinted(UnbackedMintedEvent {
                debt_holder,
                to,
                amount,
            }),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::access::Role;
    use crate::engine::{Engine, EngineConfig, EngineError, ErrorKind};
    use crate::math::{Rad, Ray, SignedWad, Wad};
    use crate::pool::{LiquidationStrategy, PoolParams};
    use crate::price_feed::MockPriceSource;
    use crate::surplus::SurplusError;
    use crate::types::{Address, PoolId, Timestamp};

    const OWNER: Address = Address(1);
    const ANYONE: Address = Address(42);
    const TREASURY: Address = Address(77);

    fn engine() -> Engine {
        Engine::new(EngineConfig {
            owner: OWNER,
            surplus_buffer: Rad::from_integer(10),
            ..EngineConfig::default()
        })
    }

    /// Surplus via unbacked mint from a scratch holder, then bad debt on the surplus engine.
    fn fund(engine: &mut Engine, surplus: u128, bad_debt: u128) {
        let address = engine.surplus_engine().address;
        engine
            .mint_unbacked_stablecoin(OWNER, Address(900), address, Rad::from_integer(surplus))
            .unwrap();
        if bad_debt > 0 {
            engine
                .mint_unbacked_stablecoin(OWNER, address, Address(901), Rad::from_integer(bad_debt))
                .unwrap();
        }
    }

    #[test]
    fn test_settlement_open_to_anyone() {
        let mut engine = engine();
        fund(&mut engine, 100, 40);
        let result = engine.settle_system_bad_debt(ANYONE, Rad::from_integer(40)).unwrap();
        assert!(result.remaining_bad_debt.is_zero());
        assert_eq!(result.remaining_surplus, Rad::from_integer(60));
        engine.check_invariants().unwrap();
    }

    #[test]
    fn test_settle_max() {
        let mut engine = engine();
        fund(&mut engine, 30, 50);
        let result = engine.settle_max_bad_debt(ANYONE).unwrap();
        assert_eq!(result.amount, Rad::from_integer(30));
        assert_eq!(result.remaining_bad_debt, Rad::from_integer(20));
    }

    #[test]
    fn test_settle_max_without_bad_debt_is_silent() {
        let mut engine = engine();
        fund(&mut engine, 30, 0);
        let events = engine.events().len();
        let result = engine.settle_max_bad_debt(ANYONE).unwrap();
        assert!(result.amount.is_zero());
        assert_eq!(result.remaining_surplus, Rad::from_integer(30));
        assert_eq!(engine.events().len(), events);

        let address = engine.surplus_engine().address;
        engine
            .mint_unbacked_stablecoin(OWNER, address, Address(901), Rad::from_integer(5))
            .unwrap();
        let result = engine.settle_max_bad_debt(ANYONE).unwrap();
        assert_eq!(result.amount, Rad::from_integer(5));
        assert_eq!(engine.events().len(), events + 2);
    }

    #[test]
    fn test_withdrawal_gated_by_bad_debt_and_buffer() {
        let mut engine = engine();
        fund(&mut engine, 100, 1);
        let err = engine
            .withdraw_stablecoin_surplus(OWNER, TREASURY, Rad::from_integer(10))
            .unwrap_err();
        assert!(matches!(err, EngineError::Surplus(SurplusError::OutstandingBadDebt(_))));

        engine.settle_system_bad_debt(ANYONE, Rad::from_integer(1)).unwrap();
        assert!(engine
            .withdraw_stablecoin_surplus(OWNER, TREASURY, Rad::from_integer(90))
            .is_err());
        let remaining = engine
            .withdraw_stablecoin_surplus(OWNER, TREASURY, Rad::from_integer(89))
            .unwrap();
        assert_eq!(remaining, Rad::from_integer(10));
        assert_eq!(engine.stablecoin(TREASURY), Rad::from_integer(89));

        let err = engine
            .withdraw_stablecoin_surplus(ANYONE, ANYONE, Rad::from_integer(1))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[test]
    fn test_buffer_update() {
        let mut engine = engine();
        let old = engine.set_surplus_buffer(OWNER, Rad::from_integer(500)).unwrap();
        assert_eq!(old, Rad::from_integer(10));
        assert_eq!(engine.surplus_engine().surplus_buffer, Rad::from_integer(500));
    }

    #[test]
    fn test_mint_requires_mintable_role() {
        let mut engine = engine();
        assert!(matches!(
            engine.mint_unbacked_stablecoin(ANYONE, ANYONE, ANYONE, Rad::from_integer(1)),
            Err(EngineError::MissingRole { role: Role::Mintable, .. })
        ));
    }

    #[test]
    fn test_collateral_surplus_withdrawal() {
        let mut engine = engine();
        let pool = PoolId(1);
        let source = MockPriceSource::new(pool, Wad::from_integer(1), Timestamp::from_secs(0));
        let params = PoolParams {
            debt_ceiling: Rad::from_integer(1_000),
            position_debt_ceiling: Rad::from_integer(1_000),
            debt_floor: Rad::zero(),
            liquidation_ratio: Ray::ONE,
            stability_fee_rate: Ray::ONE,
            close_factor_bps: 10_000,
            liquidator_incentive_bps: 10_000,
            treasury_fee_bps: 0,
            strategy: Some(LiquidationStrategy::FixedSpread),
            price_max_age: 0,
        };
        engine.init_collateral_pool(OWNER, pool, params, &source).unwrap();
        let address = engine.surplus_engine().address;
        engine.add_collateral(OWNER, pool, address, SignedWad::from_integer(5)).unwrap();

        assert!(engine
            .withdraw_collateral_surplus(OWNER, pool, TREASURY, Wad::from_integer(6))
            .is_err());
        engine
            .withdraw_collateral_surplus(OWNER, pool, TREASURY, Wad::from_integer(5))
            .unwrap();
        assert_eq!(engine.collateral(pool, TREASURY), Wad::from_integer(5));
    }
}
