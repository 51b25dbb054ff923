// 8.0.2: result types and errors for engine operations.

use crate::access::Role;
use crate::fee::FeeAccrual;
use crate::ledger::LedgerError;
use crate::liquidation::LiquidationOutcome;
use crate::math::{MathError, Rad, Ray, Wad};
use crate::pool::PoolError;
use crate::position::Position;
use crate::registry::RegistryError;
use crate::surplus::SurplusError;
use crate::types::{Address, PoolId, PositionId, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectResult {
    pub pool: PoolId,
    /// None when no time passed since the last collection.
    pub accrual: Option<FeeAccrual>,
}

impl CollectResult {
    pub fn accrued(&self) -> Rad {
        self.accrual.map(|a| a.accrued).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PokeResult {
    pub pool: PoolId,
    pub source_price: Wad,
    pub source_ok: bool,
    pub price_with_safety_margin: Ray,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiquidationResult {
    pub pool: PoolId,
    pub position: Address,
    pub liquidator: Address,
    pub recipient: Address,
    pub raw_price: Ray,
    pub outcome: LiquidationOutcome,
    pub position_after: Position,
    /// Caller data, echoed back.
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementResult {
    pub amount: Rad,
    pub remaining_bad_debt: Rad,
    pub remaining_surplus: Rad,
}

/// Broad error classes callers can branch on without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Parameter or amount out of the allowed range.
    Validation,
    /// Missing role or not owner/approved.
    Permission,
    /// Position is safe, or price is unhealthy or stale.
    Safety,
    /// Wrong lifecycle state: paused, caged, (not) initialized.
    State,
    /// Fixed point overflow, underflow or division by zero.
    Arithmetic,
    /// Balances too small for the request.
    InsufficientFunds,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Engine is paused")]
    Paused,

    #[error("Engine is caged")]
    NotLive,

    #[error("{caller} lacks {role}")]
    MissingRole { caller: Address, role: Role },

    #[error("{caller} is not authorized for position {id:?}")]
    NotPositionOwner { caller: Address, id: PositionId },

    #[error("Position {0:?} not found")]
    PositionNotFound(PositionId),

    #[error("Debt share to repay must be positive")]
    ZeroRepay,

    #[error("Pool {0} has no liquidation strategy")]
    NoStrategy(PoolId),

    #[error("Price source is wired to {source_pool}, not {pool}")]
    PriceSourceMismatch { pool: PoolId, source_pool: PoolId },

    #[error("Price source for {0} is unhealthy")]
    PriceUnhealthy(PoolId),

    #[error("Price for {pool} is stale: published {published}, max age {max_age}s at {now}")]
    PriceStale {
        pool: PoolId,
        published: Timestamp,
        max_age: u64,
        now: Timestamp,
    },

    #[error("Position {position} in {pool} is safe")]
    PositionSafe { pool: PoolId, position: Address },

    #[error("Repay value {repaid} exceeds max {max}")]
    SlippageExceeded { repaid: Rad, max: Rad },

    #[error("Nothing was liquidated")]
    NothingLiquidated,

    #[error("Reference price must be positive")]
    InvalidReferencePrice,

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Surplus error: {0}")]
    Surplus(#[from] SurplusError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Math error: {0}")]
    Math(#[from] MathError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Paused | EngineError::NotLive => ErrorKind::State,
            EngineError::MissingRole { .. } | EngineError::NotPositionOwner { .. } => ErrorKind::Permission,
            EngineError::PositionNotFound(_)
            | EngineError::ZeroRepay
            | EngineError::SlippageExceeded { .. }
            | EngineError::InvalidReferencePrice => ErrorKind::Validation,
            EngineError::NoStrategy(_) => ErrorKind::State,
            EngineError::PriceSourceMismatch { .. }
            | EngineError::PriceUnhealthy(_)
            | EngineError::PriceStale { .. }
            | EngineError::PositionSafe { .. } => ErrorKind::Safety,
            EngineError::NothingLiquidated => ErrorKind::InsufficientFunds,
            EngineError::Pool(e) => pool_kind(e),
            EngineError::Ledger(e) => ledger_kind(e),
            EngineError::Surplus(e) => match e {
                SurplusError::Ledger(inner) => ledger_kind(inner),
                _ => ErrorKind::InsufficientFunds,
            },
            EngineError::Registry(e) => match e {
                RegistryError::UnknownPosition(_) => ErrorKind::Validation,
                RegistryError::NotOwner { .. } => ErrorKind::Permission,
            },
            EngineError::Math(_) => ErrorKind::Arithmetic,
        }
    }
}

fn pool_kind(error: &PoolError) -> ErrorKind {
    match error {
        PoolError::AlreadyInitialized(_) | PoolError::NotInitialized(_) => ErrorKind::State,
        _ => ErrorKind::Validation,
    }
}

fn ledger_kind(error: &LedgerError) -> ErrorKind {
    match error {
        LedgerError::Pool(e) => pool_kind(e),
        LedgerError::Math(_) | LedgerError::RateDecrease { .. } | LedgerError::UnbalancedSeizure { .. } => {
            ErrorKind::Arithmetic
        }
        LedgerError::NotAllowed { .. } => ErrorKind::Permission,
        LedgerError::NotSafe { .. } => ErrorKind::Safety,
        LedgerError::PoolCeilingExceeded { .. }
        | LedgerError::GlobalCeilingExceeded { .. }
        | LedgerError::PositionCeilingExceeded { .. }
        | LedgerError::BelowDebtFloor { .. }
        | LedgerError::PositionUnderflow { .. } => ErrorKind::Validation,
        LedgerError::InsufficientCollateral { .. }
        | LedgerError::InsufficientStablecoin { .. }
        | LedgerError::InsufficientBadDebt { .. } => ErrorKind::InsufficientFunds,
    }
}
