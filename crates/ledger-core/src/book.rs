//! Transfers: staging new ones into the ledger and replaying sealed ones
//! into balances.

use crate::{identity_for, Block, Ledger, LedgerError, Sender, Transaction};
use tracing::debug;

/// Net amount received minus sent by `identity` across `blocks`.
pub fn tally(blocks: &[Block], identity: &str) -> i64 {
    blocks
        .iter()
        .flat_map(|block| block.transactions.iter())
        .fold(0i64, |mut balance, tx| {
            if tx.to == identity {
                balance = balance.saturating_add(tx.amount);
            }
            if tx.from.is_identity(identity) {
                balance = balance.saturating_sub(tx.amount);
            }
            balance
        })
}

fn ensure_address(raw: &str, role: &str) -> Result<(), LedgerError> {
    if raw.trim().is_empty() {
        return Err(LedgerError::InvalidTransaction(format!(
            "{role} address is empty"
        )));
    }
    Ok(())
}

impl Ledger {
    /// Stage a transfer of `amount` to `to_raw`. A `None` sender records a
    /// system (coinbase/reward) transfer. Addresses are stored hashed.
    pub fn add_transaction(
        &mut self,
        to_raw: &str,
        amount: i64,
        from_raw: Option<&str>,
    ) -> Result<Transaction, LedgerError> {
        if amount < 0 {
            return Err(LedgerError::InvalidTransaction(format!(
                "amount must be non-negative, got {amount}"
            )));
        }
        ensure_address(to_raw, "recipient")?;
        if let Some(from) = from_raw {
            ensure_address(from, "sender")?;
        }

        let tx = Transaction::new(Sender::from_raw(from_raw), identity_for(to_raw), amount);
        debug!(to = %tx.to, amount, coinbase = tx.is_coinbase(), "staged transaction");
        self.pending.push(tx.clone());
        Ok(tx)
    }

    /// Stage the configured mining reward for `to_raw`.
    pub fn add_reward(&mut self, to_raw: &str) -> Result<Transaction, LedgerError> {
        let reward = self.config().reward;
        self.add_transaction(to_raw, reward, None)
    }

    /// Replay every sealed transfer for `address_raw`. Pending transfers do
    /// not count until sealed.
    pub fn balance_of(&self, address_raw: &str) -> i64 {
        tally(self.chain(), &identity_for(address_raw))
    }
}
