// 8.0: the engine. one explicit handle that owns the ledger, pool registry,
// roles, surplus engine and position registry, and routes every public call
// through its guards before touching state. deterministic, no external I/O:
// prices come in through PriceSource arguments and time through set_time.

mod config;
mod core;
mod fees;
mod liquidations;
mod pools;
mod positions;
mod pricing;
mod results;
mod surplus;

pub use config::EngineConfig;
pub use core::Engine;
pub use liquidations::LiquidationRequest;
pub use results::{CollectResult, EngineError, ErrorKind, LiquidationResult, PokeResult, SettlementResult};
