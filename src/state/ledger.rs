use async_trait::async_trait;
use ethers::types::{Address, U256};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::types::LedgerError;

/// The fungible-token ledger that holds channel custody.
///
/// Implementations must not call back into the channel that invoked them.
#[async_trait]
pub trait TokenLedger: Send + Sync + 'static {
    /// Moves `amount` from `owner` to `recipient` on the owner's behalf.
    async fn transfer_from(
        &self,
        owner: Address,
        recipient: Address,
        amount: U256,
    ) -> Result<(), LedgerError>;

    async fn transfer(&self, from: Address, to: Address, amount: U256) -> Result<(), LedgerError>;

    async fn balance_of(&self, account: Address) -> Result<U256, LedgerError>;
}

/// Balances kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    balances: RwLock<HashMap<Address, U256>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` to `account` out of thin air.
    pub async fn mint(&self, account: Address, amount: U256) {
        let mut balances = self.balances.write().await;
        let balance = balances.entry(account).or_default();
        *balance = balance.saturating_add(amount);
    }

    async fn move_funds(&self, from: Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        let mut balances = self.balances.write().await;

        let available = balances.get(&from).copied().unwrap_or_default();
        if available < amount {
            return Err(LedgerError::InsufficientFunds {
                account: from,
                available,
                requested: amount,
            });
        }

        balances.insert(from, available - amount);
        let credited = balances.entry(to).or_default();
        *credited = credited.saturating_add(amount);
        Ok(())
    }
}

#[async_trait]
impl TokenLedger for InMemoryLedger {
    async fn transfer_from(
        &self,
        owner: Address,
        recipient: Address,
        amount: U256,
    ) -> Result<(), LedgerError> {
        self.move_funds(owner, recipient, amount).await
    }

    async fn transfer(&self, from: Address, to: Address, amount: U256) -> Result<(), LedgerError> {
        self.move_funds(from, to, amount).await
    }

    async fn balance_of(&self, account: Address) -> Result<U256, LedgerError> {
        Ok(self
            .balances
            .read()
            .await
            .get(&account)
            .copied()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_transfer_moves_balance() {
        let ledger = InMemoryLedger::new();
        let alice = Address::repeat_byte(0x01);
        let bob = Address::repeat_byte(0x02);
        ledger.mint(alice, U256::from(100)).await;

        ledger.transfer(alice, bob, U256::from(40)).await.unwrap();

        assert_eq!(ledger.balance_of(alice).await.unwrap(), U256::from(60));
        assert_eq!(ledger.balance_of(bob).await.unwrap(), U256::from(40));
    }

    #[tokio::test]
    async fn test_transfer_from_rejects_overdraft() {
        let ledger = InMemoryLedger::new();
        let alice = Address::repeat_byte(0x01);
        let bob = Address::repeat_byte(0x02);
        ledger.mint(alice, U256::from(10)).await;

        let err = ledger
            .transfer_from(alice, bob, U256::from(11))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                account: alice,
                available: U256::from(10),
                requested: U256::from(11),
            }
        );
        assert_eq!(ledger.balance_of(alice).await.unwrap(), U256::from(10));
        assert_eq!(ledger.balance_of(bob).await.unwrap(), U256::zero());
    }
}
