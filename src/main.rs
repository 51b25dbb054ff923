//! CDP Core Simulation.
//!
//! Walks the engine through the reference liquidation scenarios, stability fee
//! accrual and bad debt settlement. Set `RUST_LOG=debug` to see every event.

use cdp_core::*;
use rust_decimal_macros::dec;
use std::error::Error;
use tracing_subscriber::EnvFilter;

const OWNER: Address = Address(1);
const KEEPER: Address = Address(2);
const BORROWER: Address = Address(100);

type SimResult<T> = Result<T, Box<dyn Error>>;

fn main() -> SimResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("CDP Core Engine Simulation");
    println!("Single Pool, Fixed Spread Liquidation\n");

    scenario_a_partial_liquidation()?;
    scenario_b_collateral_exhausted()?;
    scenario_c_debt_floor_override()?;
    scenario_d_fee_accrual()?;
    scenario_e_settle_bad_debt()?;

    println!("\nAll simulations completed successfully.");
    Ok(())
}

/// Engine with the development preset on a wall-clock start time, one WXDC pool priced at 420, a keeper
/// with a large safe position and a borrower at 10 collateral / 2000 debt.
fn setup() -> SimResult<(Engine, MockPriceSource)> {
    let protocol = Environment::Development.config();
    let mut engine = Engine::new(protocol.engine_config(OWNER)?);
    engine.set_time(Timestamp::now());
    let pool = &protocol.pools[0];

    let source = MockPriceSource::new(pool.pool_id, Wad::from_integer(420), engine.time());
    engine.init_collateral_pool(OWNER, pool.pool_id, pool.to_params()?, &source)?;
    engine.grant_role(OWNER, Role::Liquidator, KEEPER)?;

    for (who, collateral, debt) in [(KEEPER, 1_000, 10_000), (BORROWER, 10, 2_000)] {
        engine.add_collateral(OWNER, pool.pool_id, who, SignedWad::from_integer(collateral))?;
        engine.adjust_position(
            who,
            &PositionAdjustment::by_owner(
                pool.pool_id,
                who,
                SignedWad::from_integer(collateral),
                SignedWad::from_integer(debt),
            ),
        )?;
    }
    Ok((engine, source))
}

fn crash_and_liquidate(
    engine: &mut Engine,
    source: &mut MockPriceSource,
    price: u128,
) -> SimResult<LiquidationResult> {
    let pool = source.pool_id();
    source.set_price(Wad::from_integer(price), engine.time());
    engine.poke_price(KEEPER, pool, source)?;
    println!("  Price drops to {}, borrower unsafe: {}", price, engine.unsafe_positions(pool)?.contains(&BORROWER));

    let result = engine.liquidate(
        KEEPER,
        LiquidationRequest {
            pool,
            position: BORROWER,
            debt_share_to_repay: Wad::from_integer(1_000),
            max_repay_value: Rad::from_integer(2_000),
            recipient: KEEPER,
            data: Vec::new(),
        },
        source,
    )?;
    print_outcome(&result);
    engine.check_invariants()?;
    Ok(result)
}

fn print_outcome(result: &LiquidationResult) {
    let outcome = &result.outcome;
    println!("    Debt share closed: {}", outcome.debt_share_liquidated);
    println!("    Repaid: {}", outcome.actual_debt_value_repaid);
    println!("    Collateral seized: {} (treasury {})", outcome.collateral_seized, outcome.treasury_fee);
    println!("    Remaining debt share: {}", result.position_after.debt_share);
    println!("    Bad debt: {}\n", outcome.bad_debt);
}

fn scenario_a_partial_liquidation() -> SimResult<()> {
    println!("Scenario A: Partial Liquidation\n");
    let (mut engine, mut source) = setup()?;
    crash_and_liquidate(&mut engine, &mut source, 285)?;
    Ok(())
}

fn scenario_b_collateral_exhausted() -> SimResult<()> {
    println!("Scenario B: Collateral Exhausted\n");
    let (mut engine, mut source) = setup()?;
    let result = crash_and_liquidate(&mut engine, &mut source, 200)?;
    println!("    Full closure: {}, surplus engine bad debt: {}\n",
        result.outcome.full_closure,
        engine.surplus_engine().bad_debt(engine.ledger()),
    );
    Ok(())
}

fn scenario_c_debt_floor_override() -> SimResult<()> {
    println!("Scenario C: Debt Floor Override\n");
    let (mut engine, mut source) = setup()?;
    let pool = source.pool_id();
    engine.set_debt_floor(OWNER, pool, Rad::from_integer(1_500))?;
    println!("  Debt floor raised to 1500");
    crash_and_liquidate(&mut engine, &mut source, 250)?;
    Ok(())
}

fn scenario_d_fee_accrual() -> SimResult<()> {
    println!("Scenario D: Stability Fee Accrual\n");
    let (mut engine, source) = setup()?;
    let pool = source.pool_id();
    let fee = Ray::from_decimal(dec!(1.000000005781378656804591713))?;
    engine.set_stability_fee_rate(OWNER, pool, fee)?;

    engine.advance_time(15_768_000);
    let result = engine.collect(pool)?;
    let rate = engine.pool(pool).map(|p| p.debt_accumulated_rate).unwrap_or_default();
    println!("  Six months at {} APY", annualized(fee)?);
    println!("  Accumulated rate: {}", rate);
    println!("  Fees credited to surplus: {}", result.accrued());
    println!("  Borrower debt: {}\n", engine.position(pool, BORROWER).debt_value(rate)?);
    engine.check_invariants()?;
    Ok(())
}

fn scenario_e_settle_bad_debt() -> SimResult<()> {
    println!("Scenario E: Bad Debt Settlement\n");
    let (mut engine, mut source) = setup()?;
    let pool = source.pool_id();
    crash_and_liquidate(&mut engine, &mut source, 200)?;
    let open = engine.ledger().positions().filter(|(_, p)| !p.is_closed()).count();
    println!("  Open positions after liquidation: {}", open);

    engine.advance_time(SECONDS_PER_YEAR);
    engine.collect(pool)?;
    let surplus = engine.surplus_engine();
    println!("  After one year of fees: surplus {}, bad debt {}",
        surplus.surplus(engine.ledger()),
        surplus.bad_debt(engine.ledger()),
    );

    let settled = engine.settle_max_bad_debt(KEEPER)?;
    println!("  Settled {}, remaining bad debt {}, remaining surplus {}",
        settled.amount, settled.remaining_bad_debt, settled.remaining_surplus,
    );
    engine.check_invariants()?;
    println!("  Events generated: {}\n", engine.events().len());
    Ok(())
}
