//! Account balance operations.

use common::{Money, UserId};
use store::{AccountRepository, Store, Transaction};

use crate::access;
use crate::error::DomainError;

/// Smallest amount accepted by [`Ledger::deposit`].
pub const MIN_DEPOSIT: Money = Money::from_units(10);

/// Checks that `balance` covers `amount` and returns the balance after the debit.
pub fn debit(balance: Money, amount: Money) -> Result<Money, DomainError> {
    balance
        .checked_sub(amount)
        .ok_or(DomainError::InsufficientFunds {
            balance,
            required: amount,
        })
}

/// Deposits, resets and balance reads.
///
/// Debits are not exposed here; they only happen inside a checkout.
#[derive(Clone)]
pub struct Ledger<S: Store> {
    store: S,
}

impl<S: Store> Ledger<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Credits the user's balance and returns the new balance.
    #[tracing::instrument(skip(self))]
    pub async fn deposit(&self, user_id: UserId, amount: Money) -> Result<Money, DomainError> {
        if amount < MIN_DEPOSIT {
            return Err(DomainError::InvalidDeposit {
                minimum: MIN_DEPOSIT,
            });
        }

        let mut tx = self.store.begin().await?;
        let account = tx
            .lock_account(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("account", user_id))?;
        if account.balance.checked_add(amount).is_none() {
            return Err(DomainError::OutOfRange(format!(
                "balance {} cannot take a deposit of {amount}",
                account.balance
            )));
        }
        let balance = tx.credit_balance(user_id, amount).await?;
        tx.commit().await?;

        tracing::info!(%balance, "deposit recorded");
        Ok(balance)
    }

    /// Sets the target's balance to zero. Only admins may do this.
    #[tracing::instrument(skip(self))]
    pub async fn reset_balance(&self, caller: UserId, target: UserId) -> Result<(), DomainError> {
        let mut tx = self.store.begin().await?;

        if !access::is_admin(&mut tx, caller).await? {
            return Err(DomainError::Unauthorized(
                "only admins can reset balances".to_string(),
            ));
        }

        if tx.lock_account(target).await?.is_none() {
            return Err(DomainError::not_found("account", target));
        }
        tx.set_balance(target, Money::zero()).await?;
        tx.commit().await?;

        tracing::info!("balance reset");
        Ok(())
    }

    /// Reads the user's current balance.
    #[tracing::instrument(skip(self))]
    pub async fn balance(&self, user_id: UserId) -> Result<Money, DomainError> {
        let mut tx = self.store.begin().await?;
        let account = tx
            .find_account(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("account", user_id))?;
        tx.rollback().await?;

        Ok(account.balance)
    }
}
