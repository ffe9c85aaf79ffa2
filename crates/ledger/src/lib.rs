//! Ledger engine for a shared group treasury.
//!
//! A pool holds the group's money; each member has a signed balance against
//! the pool (negative = owes the pool). Every movement updates the pool
//! balance and at most one member balance in a single database transaction,
//! guarded by compare-and-swap on the balances themselves, and leaves a
//! ledger entry plus an audit entry behind.

pub use audit::{AuditAction, AuditEntry};
pub use commands::{
    Actor, GroupFeeReceipt, TransferCmd, TransferPlan, TransferReceipt, WaivePlan, WaiveReceipt,
};
pub use error::EngineError;
pub use ledger_entries::{EntryStatus, LedgerEntry};
pub use members::Member;
pub use money::MoneyCents;
pub use movement::{BalanceDelta, MAX_AMOUNT_MINOR, MovementType};
pub use ops::{Engine, EngineBuilder, EntryFilter};
pub use pools::Pool;

mod audit;
mod commands;
mod error;
mod ledger_entries;
mod members;
mod money;
mod movement;
mod ops;
mod pools;
mod store;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
