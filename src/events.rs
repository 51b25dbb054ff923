// 11.0: every successful mutating call produces an event. these are the records
// downstream indexers consume. the EventPayload enum lists all event types.

use crate::access::Role;
use crate::fee::FeeAccrual;
use crate::ledger::PositionChange;
use crate::liquidation::LiquidationOutcome;
use crate::math::{Rad, Ray, SignedWad, Wad};
use crate::pool::{LiquidationStrategy, PoolParams};
use crate::types::{Address, PoolId, PositionId, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub timestamp: Timestamp,
    /// Caller of the operation that produced the event.
    pub actor: Address,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(id: EventId, timestamp: Timestamp, actor: Address, payload: EventPayload) -> Self {
        Self {
            id,
            timestamp,
            actor,
            payload,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPayload {
    // Pool configuration
    PoolInitialized(PoolInitializedEvent),
    PoolParamUpdated(PoolParamUpdatedEvent),
    PriceUpdated(PriceUpdatedEvent),
    StabilityFeeCollected(FeeAccrual),

    // Positions and balances
    PositionOpened(PositionOpenedEvent),
    PositionAdjusted(PositionChange),
    PositionMoved(PositionMovedEvent),
    CollateralAdded(CollateralAddedEvent),
    CollateralMoved(CollateralMovedEvent),
    StablecoinMoved(StablecoinMovedEvent),

    // Liquidation and bad debt
    Liquidation(LiquidationEvent),
    BadDebt(BadDebtEvent),
    BadDebtSettled(BadDebtSettledEvent),
    UnbackedMinted(UnbackedMintedEvent),

    // Surplus
    StablecoinSurplusWithdrawn(StablecoinSurplusWithdrawnEvent),
    CollateralSurplusWithdrawn(CollateralSurplusWithdrawnEvent),
    SurplusBufferUpdated { old: Rad, new: Rad },

    // Administration
    TotalDebtCeilingUpdated { old: Rad, new: Rad },
    ReferencePriceUpdated { old: Ray, new: Ray },
    RoleGranted { role: Role, account: Address },
    RoleRevoked { role: Role, account: Address },
    ConsentGranted { owner: Address, usr: Address },
    ConsentRevoked { owner: Address, usr: Address },
    Paused,
    Unpaused,
    Caged,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInitializedEvent {
    pub pool: PoolId,
    pub params: PoolParams,
    pub price_with_safety_margin: Ray,
}

/// New value of a single pool field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolParam {
    DebtCeiling(Rad),
    PositionDebtCeiling(Rad),
    DebtFloor(Rad),
    PriceWithSafetyMargin(Ray),
    LiquidationRatio(Ray),
    StabilityFeeRate(Ray),
    CloseFactorBps(u32),
    LiquidatorIncentiveBps(u32),
    TreasuryFeeBps(u32),
    Strategy(Option<LiquidationStrategy>),
    PriceMaxAge(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolParamUpdatedEvent {
    pub pool: PoolId,
    pub param: PoolParam,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdatedEvent {
    pub pool: PoolId,
    pub source_price: Wad,
    pub source_ok: bool,
    pub price_with_safety_margin: Ray,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionOpenedEvent {
    pub id: PositionId,
    pub pool: PoolId,
    pub owner: Address,
    pub position: Address,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionMovedEvent {
    pub pool: PoolId,
    pub src: Address,
    pub dst: Address,
    pub collateral_delta: SignedWad,
    pub debt_share_delta: SignedWad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralAddedEvent {
    pub pool: PoolId,
    pub owner: Address,
    pub delta: SignedWad,
    pub new_balance: Wad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralMovedEvent {
    pub pool: PoolId,
    pub src: Address,
    pub dst: Address,
    pub amount: Wad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StablecoinMovedEvent {
    pub src: Address,
    pub dst: Address,
    pub amount: Rad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationEvent {
    pub pool: PoolId,
    pub position: Address,
    pub liquidator: Address,
    pub recipient: Address,
    pub debt_share_requested: Wad,
    pub raw_price: Ray,
    pub outcome: LiquidationOutcome,
    /// Opaque caller data, echoed back unchanged.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadDebtEvent {
    pub pool: PoolId,
    pub position: Address,
    pub amount: Rad,
    pub total_bad_debt: Rad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadDebtSettledEvent {
    pub amount: Rad,
    pub remaining_bad_debt: Rad,
    pub remaining_surplus: Rad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbackedMintedEvent {
    pub debt_holder: Address,
    pub to: Address,
    pub amount: Rad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StablecoinSurplusWithdrawnEvent {
    pub to: Address,
    pub amount: Rad,
    pub remaining_surplus: Rad,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralSurplusWithdrawnEvent {
    pub pool: PoolId,
    pub to: Address,
    pub amount: Wad,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_for_indexers() {
        let event = Event::new(
            EventId(7),
            Timestamp(1_000),
            Address(1),
            EventPayload::CollateralMoved(CollateralMovedEvent {
                pool: PoolId(1),
                src: Address(1),
                dst: Address(2),
                amount: Wad::from_integer(3),
            }),
        );

        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn param_updates_carry_typed_values() {
        let update = PoolParamUpdatedEvent {
            pool: PoolId(2),
            param: PoolParam::CloseFactorBps(2_500),
        };
        assert!(matches!(update.param, PoolParam::CloseFactorBps(2_500)));
    }
}
