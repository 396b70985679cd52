//! Currency collaborator charged by tower placement and upgrades.

use std::{cell::RefCell, rc::Rc};

use critter_defence_core::{Amount, Error, Result};

/// Source of funds for purchases and sink for rewards and refunds.
pub trait Economy {
    /// Currency currently available.
    fn balance(&self) -> Amount;

    /// Withdraws `amount`, failing with [`Error::InsufficientResources`]
    /// without changing the balance when it cannot be covered.
    fn debit(&mut self, amount: Amount) -> Result<()>;

    /// Deposits `amount`.
    fn credit(&mut self, amount: Amount);
}

/// Shared handle to the economy used by managers and logic controllers.
pub type SharedEconomy = Rc<RefCell<dyn Economy>>;

/// In-memory wallet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Purse {
    balance: Amount,
}

impl Purse {
    /// Creates a purse holding `balance`.
    #[must_use]
    pub const fn new(balance: Amount) -> Self {
        Self { balance }
    }

    /// Wraps the purse in a shared handle.
    #[must_use]
    pub fn shared(balance: Amount) -> Rc<RefCell<Purse>> {
        Rc::new(RefCell::new(Self::new(balance)))
    }
}

impl Economy for Purse {
    fn balance(&self) -> Amount {
        self.balance
    }

    fn debit(&mut self, amount: Amount) -> Result<()> {
        if amount > self.balance {
            return Err(Error::InsufficientResources {
                required: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        Ok(())
    }

    fn credit(&mut self, amount: Amount) {
        self.balance = self.balance.saturating_add(amount);
    }
}
