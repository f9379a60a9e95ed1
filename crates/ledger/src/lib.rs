//! Ledger module (accounts and transfer events, event-sourced).
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns. Balances
//! are never stored as a source of truth; they are replayed from the transfer
//! events recorded against each account.

pub mod account;
pub mod replay;
pub mod transfer;

pub use account::{Account, validate_opening_balance};
pub use replay::{AccountBalance, check_debit, fold_balance};
pub use transfer::{NewTransferEvent, TransferEvent, TransferRequest};
