//! Stress tests
//!
//! These tests push the engine through crashes, long accrual horizons and
//! many positions to verify it stays solvent and keeps its accounting exact.

use cdp_core::*;
use rust_decimal_macros::dec;

const OWNER: Address = Address(1);
const KEEPER: Address = Address(2);
const POOL: PoolId = PoolId(1);

fn engine_with_pool(price: u128) -> (Engine, MockPriceSource) {
    let protocol = ProtocolConfig::testnet();
    let mut engine = Engine::new(protocol.engine_config(OWNER).unwrap());
    let source = MockPriceSource::new(POOL, Wad::from_integer(price), engine.time());
    engine
        .init_collateral_pool(OWNER, POOL, protocol.pools[0].to_params().unwrap(), &source)
        .unwrap();
    engine.grant_role(OWNER, Role::Liquidator, KEEPER).unwrap();
    (engine, source)
}

fn borrow(engine: &mut Engine, who: Address, collateral: i64, debt: i64) {
    engine
        .add_collateral(OWNER, POOL, who, SignedWad::from_integer(collateral))
        .unwrap();
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

fn liquidate_fully(engine: &mut Engine, source: &MockPriceSource, who: Address) -> Vec<LiquidationResult> {
    let mut results = Vec::new();
    while !engine.position(POOL, who).debt_share.is_zero() {
        let request = LiquidationRequest {
            pool: POOL,
            position: who,
            debt_share_to_repay: Wad::from_integer(1_000_000),
            max_repay_value: Rad::from_integer(10_000_000),
            recipient: KEEPER,
            data: Vec::new(),
        };
        match engine.liquidate(KEEPER, request, source) {
            Ok(result) => results.push(result),
            Err(EngineError::PositionSafe { .. }) => break,
            Err(err) => panic!("liquidation failed: {}", err),
        }
    }
    results
}

/// Many positions, one crash.
mod cascade_tests {
    use super::*;

    #[test]
    fn crash_liquidates_every_unsafe_position() {
        let (mut engine, mut source) = engine_with_pool(100);
        borrow(&mut engine, KEEPER, 100_000, 50_000);

        // borrowers from 40% to 67% utilization of the 70 per collateral capacity
        let borrowers: Vec<Address> = (0..20).map(|i| Address(1_000 + i)).collect();
        for (i, who) in borrowers.iter().enumerate() {
            borrow(&mut engine, *who, 100, 2_800 + 100 * i as i64);
        }
        assert!(engine.unsafe_positions(POOL).unwrap().is_empty());

        source.set_price(Wad::from_integer(60), engine.time());
        engine.poke_price(KEEPER, POOL, &source).unwrap();
        let unsafe_positions = engine.unsafe_positions(POOL).unwrap();
        assert!(!unsafe_positions.is_empty());
        assert!(!unsafe_positions.contains(&KEEPER));

        for who in &unsafe_positions {
            let results = liquidate_fully(&mut engine, &source, *who);
            assert!(!results.is_empty());
            engine.check_invariants().unwrap();
        }

        // half of each debt is enough to restore safety at 60
        assert!(engine.unsafe_positions(POOL).unwrap().is_empty());
    }

    #[test]
    fn bad_debt_events_sum_to_recorded_bad_debt() {
        let (mut engine, mut source) = engine_with_pool(100);
        borrow(&mut engine, KEEPER, 1_000_000, 90_000);
        let borrowers: Vec<Address> = (0..10).map(|i| Address(2_000 + i)).collect();
        for who in &borrowers {
            borrow(&mut engine, *who, 100, 6_900);
        }

        // a 50% crash exhausts every borrower's collateral
        source.set_price(Wad::from_integer(50), engine.time());
        engine.poke_price(KEEPER, POOL, &source).unwrap();
        for who in &borrowers {
            liquidate_fully(&mut engine, &source, *who);
            assert!(engine.position(POOL, *who).is_empty());
        }

        let from_events = engine
            .events()
            .iter()
            .filter_map(|e| match &e.payload {
                EventPayload::BadDebt(event) => Some(event.amount),
                _ => None,
            })
            .try_fold(Rad::zero(), |acc, amount| acc.checked_add(amount))
            .unwrap();
        let surplus = engine.surplus_engine().address;
        assert_eq!(engine.system_bad_debt(surplus), from_events);
        assert!(!from_events.is_zero());
        engine.check_invariants().unwrap();
    }

    #[test]
    fn liquidator_without_funds_is_rejected_atomically() {
        let (mut engine, mut source) = engine_with_pool(100);
        borrow(&mut engine, Address(50), 100, 6_000);

        source.set_price(Wad::from_integer(60), engine.time());
        engine.poke_price(KEEPER, POOL, &source).unwrap();

        let ledger = engine.ledger().clone();
        let request = LiquidationRequest {
            pool: POOL,
            position: Address(50),
            debt_share_to_repay: Wad::from_integer(1_000),
            max_repay_value: Rad::from_integer(1_000_000),
            recipient: KEEPER,
            data: Vec::new(),
        };
        let err = engine.liquidate(KEEPER, request, &source).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientFunds);
        assert_eq!(engine.ledger(), &ledger);
    }
}

/// Long horizons and boundary values.
mod boundary_tests {
    use super::*;

    #[test]
    fn decade_of_accrual_does_not_overflow() {
        let (mut engine, _) = engine_with_pool(100);
        borrow(&mut engine, Address(7), 1_000, 10_000);
        let high_fee = Ray::from_decimal(dec!(1.000000021979553151239153027)).unwrap(); // ~100% APY
        engine.set_stability_fee_rate(OWNER, POOL, high_fee).unwrap();

        let mut last_rate = Ray::ONE;
        for _ in 0..10 {
            engine.advance_time(SECONDS_PER_YEAR);
            engine.collect(POOL).unwrap();
            let rate = engine.pool(POOL).unwrap().debt_accumulated_rate;
            assert!(rate > last_rate);
            last_rate = rate;
        }
        // doubling each year for ten years
        assert!(last_rate > Ray::from_integer(1_000));
        assert!(last_rate < Ray::from_integer(1_100));
        engine.check_invariants().unwrap();
    }

    #[test]
    fn position_at_exact_capacity_is_safe() {
        let (mut engine, mut source) = engine_with_pool(100);
        // truncation in the ratio leaves capacity a hair above 700
        borrow(&mut engine, Address(8), 10, 700);
        assert!(engine.unsafe_positions(POOL).unwrap().is_empty());

        source.set_price(Wad::from_integer(99), engine.time());
        engine.poke_price(KEEPER, POOL, &source).unwrap();
        assert_eq!(engine.unsafe_positions(POOL).unwrap(), vec![Address(8)]);
    }

    #[test]
    fn close_and_reopen_many_times() {
        let (mut engine, _) = engine_with_pool(100);
        let who = Address(9);
        engine
            .add_collateral(OWNER, POOL, who, SignedWad::from_integer(1_000))
            .unwrap();
        for _ in 0..100 {
            engine
                .adjust_position(
                    who,
                    &PositionAdjustment::by_owner(POOL, who, SignedWad::from_integer(500), SignedWad::from_integer(1_000)),
                )
                .unwrap();
            engine
                .adjust_position(
                    who,
                    &PositionAdjustment::by_owner(POOL, who, SignedWad::from_integer(-500), SignedWad::from_integer(-1_000)),
                )
                .unwrap();
        }
        assert!(engine.position(POOL, who).is_empty());
        assert_eq!(engine.collateral(POOL, who), Wad::from_integer(1_000));
        assert!(engine.stablecoin(who).is_zero());
        assert!(engine.ledger().total_stablecoin_issued().is_zero());
    }

    #[test]
    fn event_log_stays_bounded() {
        let protocol = ProtocolConfig {
            max_events: 50,
            ..ProtocolConfig::testnet()
        };
        let mut engine = Engine::new(protocol.engine_config(OWNER).unwrap());
        let source = MockPriceSource::new(POOL, Wad::from_integer(100), engine.time());
        engine
            .init_collateral_pool(OWNER, POOL, protocol.pools[0].to_params().unwrap(), &source)
            .unwrap();
        for i in 0..200 {
            engine
                .add_collateral(OWNER, POOL, Address(100 + i), SignedWad::from_integer(1))
                .unwrap();
        }
        assert_eq!(engine.events().len(), 50);
        assert_eq!(engine.events().last().unwrap().id, EventId(201));
    }

    #[test]
    fn caged_engine_still_settles() {
        let (mut engine, mut source) = engine_with_pool(100);
        borrow(&mut engine, KEEPER, 100_000, 50_000);
        borrow(&mut engine, Address(60), 100, 6_900);
        source.set_price(Wad::from_integer(50), engine.time());
        engine.poke_price(KEEPER, POOL, &source).unwrap();
        liquidate_fully(&mut engine, &source, Address(60));
        engine.advance_time(SECONDS_PER_YEAR);
        engine.collect(POOL).unwrap();

        engine.cage(OWNER).unwrap();
        assert!(matches!(engine.collect(POOL), Err(EngineError::NotLive)));
        assert!(matches!(
            engine.adjust_position(
                KEEPER,
                &PositionAdjustment::by_owner(POOL, KEEPER, SignedWad::zero(), SignedWad::from_integer(1)),
            ),
            Err(EngineError::NotLive)
        ));

        let settled = engine.settle_max_bad_debt(KEEPER).unwrap();
        assert!(!settled.amount.is_zero());
        engine.move_stablecoin(KEEPER, KEEPER, Address(61), Rad::from_integer(1)).unwrap();
        engine.check_invariants().unwrap();
    }
}
