//! `tally-core`: ledger foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, the money type, the event contract and the error taxonomy.

pub mod aggregate;
pub mod error;
pub mod event;
pub mod id;
pub mod money;

pub use aggregate::{Aggregate, replay};
pub use error::{DomainError, DomainResult};
pub use event::Event;
pub use id::{AccountId, EventId};
pub use money::{Amount, MONEY_INTEGER_DIGITS, MONEY_SCALE, ensure_money, money_limit};
