use std::str::FromStr;

use serde::{Deserialize, Serialize};

use tally_core::{AccountId, Amount};
use tally_ledger::{Account, TransferRequest};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateAccountRequest {
    pub balance: Amount,
}

/// `POST /transfers` body; the field names match the recorded events.
pub type CreateTransferRequest = TransferRequest;

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: AccountId,
    pub balance: Amount,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            balance: account.balance,
        }
    }
}

// -------------------------
// Helpers
// -------------------------

pub fn parse_account_id(raw: &str) -> Result<AccountId, axum::response::Response> {
    AccountId::from_str(raw).map_err(|_| errors::invalid_input(format!("invalid account id: {raw}")))
}
