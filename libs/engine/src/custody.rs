//! Token custody collaborator
//!
//! The engine never moves tokens itself. Once an operation's math has passed
//! every check it hands a batch of transfers to a [`TokenCustody`]
//! implementation; the staged pool and ledger values are written back only if
//! that batch settles.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Account that owns positions and token balances
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Owner(String);

impl Owner {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Owner {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two assets every pool trades
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Token {
    Risky,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferDirection {
    /// Owner pays the engine
    In,
    /// Engine pays the owner
    Out,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transfer {
    pub direction: TransferDirection,
    pub token: Token,
    pub account: Owner,
    pub amount: Decimal,
}

impl Transfer {
    pub fn inbound(token: Token, from: &Owner, amount: Decimal) -> Self {
        Self {
            direction: TransferDirection::In,
            token,
            account: from.clone(),
            amount,
        }
    }

    pub fn outbound(token: Token, to: &Owner, amount: Decimal) -> Self {
        Self {
            direction: TransferDirection::Out,
            token,
            account: to.clone(),
            amount,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CustodyError {
    #[error("{owner} holds {available} {token:?}, transfer needs {required}")]
    InsufficientBalance {
        owner: Owner,
        token: Token,
        required: Decimal,
        available: Decimal,
    },

    #[error("Engine holds {available} {token:?}, transfer needs {required}")]
    InsufficientHoldings {
        token: Token,
        required: Decimal,
        available: Decimal,
    },

    #[error("Transfer amount must not be negative: {0}")]
    NegativeAmount(Decimal),
}

pub trait TokenCustody {
    /// Pull `amount` of `token` from `from` into engine custody
    fn transfer_in(&mut self, token: Token, from: &Owner, amount: Decimal)
        -> Result<(), CustodyError>;

    /// Pay `amount` of `token` out of engine custody to `to`
    fn transfer_out(&mut self, token: Token, to: &Owner, amount: Decimal)
        -> Result<(), CustodyError>;

    /// Apply a batch, inbound transfers first
    ///
    /// Implementations must leave balances untouched when any transfer fails.
    fn settle(&mut self, batch: &[Transfer]) -> Result<(), CustodyError> {
        for transfer in batch.iter().filter(|t| t.direction == TransferDirection::In) {
            self.transfer_in(transfer.token, &transfer.account, transfer.amount)?;
        }
        for transfer in batch.iter().filter(|t| t.direction == TransferDirection::Out) {
            self.transfer_out(transfer.token, &transfer.account, transfer.amount)?;
        }
        Ok(())
    }
}

/// Balance-tracking custody backed by hash maps
#[derive(Debug, Clone, Default)]
pub struct InMemoryCustody {
    balances: HashMap<(Owner, Token), Decimal>,
    holdings: HashMap<Token, Decimal>,
}

impl InMemoryCustody {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an owner with tokens from outside the system
    pub fn mint(&mut self, owner: &Owner, token: Token, amount: Decimal) {
        *self
            .balances
            .entry((owner.clone(), token))
            .or_insert(Decimal::ZERO) += amount;
    }

    pub fn balance_of(&self, owner: &Owner, token: Token) -> Decimal {
        self.balances
            .get(&(owner.clone(), token))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Tokens currently held by the engine
    pub fn holdings(&self, token: Token) -> Decimal {
        self.holdings.get(&token).copied().unwrap_or(Decimal::ZERO)
    }
}

fn check_amount(amount: Decimal) -> Result<(), CustodyError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(CustodyError::NegativeAmount(amount));
    }
    Ok(())
}

impl TokenCustody for InMemoryCustody {
    fn transfer_in(
        &mut self,
        token: Token,
        from: &Owner,
        amount: Decimal,
    ) -> Result<(), CustodyError> {
        check_amount(amount)?;
        let available = self.balance_of(from, token);
        if available < amount {
            return Err(CustodyError::InsufficientBalance {
                owner: from.clone(),
                token,
                required: amount,
                available,
            });
        }
        self.balances.insert((from.clone(), token), available - amount);
        *self.holdings.entry(token).or_insert(Decimal::ZERO) += amount;
        Ok(())
    }

    fn transfer_out(
        &mut self,
        token: Token,
        to: &Owner,
        amount: Decimal,
    ) -> Result<(), CustodyError> {
        check_amount(amount)?;
        let available = self.holdings(token);
        if available < amount {
            return Err(CustodyError::InsufficientHoldings {
                token,
                required: amount,
                available,
            });
        }
        self.holdings.insert(token, available - amount);
        self.mint(to, token, amount);
        Ok(())
    }

    fn settle(&mut self, batch: &[Transfer]) -> Result<(), CustodyError> {
        let mut staged = self.clone();
        for transfer in batch.iter().filter(|t| t.direction == TransferDirection::In) {
            staged.transfer_in(transfer.token, &transfer.account, transfer.amount)?;
        }
        for transfer in batch.iter().filter(|t| t.direction == TransferDirection::Out) {
            staged.transfer_out(transfer.token, &transfer.account, transfer.amount)?;
        }
        *self = staged;
        Ok(())
    }
}
