// 8.7 engine/fees.rs: stability fee collection. accrual math lives in fee.rs,
// this applies it through the ledger and credits the surplus engine.

use super::core::Engine;
use super::results::{CollectResult, EngineError};
use crate::events::EventPayload;
use crate::fee::compute_accrual;
use crate::types::PoolId;

impl Engine {
    /// Compounds `pool`'s fee up to now. Anyone may call. No-op when no time passed.
    pub fn collect(&mut self, pool: PoolId) -> Result<CollectResult, EngineError> {
        self.require_live()?;
        let record = self.pools.get(pool)?;
        let Some(accrual) = compute_accrual(record, self.current_time)? else {
            return Ok(CollectResult { pool, accrual: None });
        };

        self.ledger.accrue_stability_fee(
            &mut self.pools,
            pool,
            self.surplus.address,
            accrual.new_rate,
            self.current_time,
        )?;

        tracing::debug!(
            %pool,
            elapsed = accrual.elapsed,
            rate = %accrual.new_rate,
            accrued = %accrual.accrued,
            "stability fee collected"
        );
        let actor = self.surplus.address;
        self.emit_event(actor, EventPayload::StabilityFeeCollected(accrual));
        Ok(CollectResult {
            pool,
            accrual: Some(accrual),
        })
    }

    /// Collects every initialized pool in id order.
    pub fn collect_all(&mut self) -> Result<Vec<CollectResult>, EngineError> {
        self.require_live()?;
        let mut results = Vec::new();
        for pool in self.pools.pool_ids() {
            results.push(self.collect(pool)?);
        }
        Ok(results)
    }
}
