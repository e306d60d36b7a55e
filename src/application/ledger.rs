use crate::domain::address::{Address, TxId};
use crate::domain::amount::{Amount, Balance};
use crate::domain::ports::{ChainHandle, YieldLedgerHandle, YieldOutcome};
use crate::domain::wallet::SigningKey;
use crate::error::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Gas limit of a plain native transfer, used to bound residual sweeps.
pub const SWEEP_GAS_LIMIT: Decimal = dec!(21_000);

/// Reads native and yield balances and moves funds between them.
///
/// The yield position sits behind the `YieldLedger` port so the chain-backed
/// vault and the in-memory simulation are interchangeable here.
pub struct BalanceLedger {
    chain: ChainHandle,
    vault: YieldLedgerHandle,
}

impl BalanceLedger {
    pub fn new(chain: ChainHandle, vault: YieldLedgerHandle) -> Self {
        Self { chain, vault }
    }

    pub async fn native_balance(&self, address: &Address) -> Result<Balance> {
        self.chain.native_balance(address).await
    }

    /// The yield-position balance. A query failure degrades to zero rather
    /// than aborting the caller, matching the vault's read-only contract.
    pub async fn yield_balance(&self, owner: &Address) -> Balance {
        match self.vault.balance_with_yield(owner).await {
            Ok(balance) => balance,
            Err(e) => {
                tracing::warn!(error = %e, "yield balance query failed");
                Balance::ZERO
            }
        }
    }

    /// Deposits native balance into the yield position. Either the deposit
    /// confirms and is reflected in subsequent reads, or the outcome reports
    /// failure with no position mutation.
    pub async fn deposit_to_yield(&self, key: &SigningKey, amount: Amount) -> YieldOutcome {
        match self.vault.deposit(key, amount).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!(error = %e, "yield deposit failed");
                YieldOutcome {
                    success: false,
                    amount: amount.into(),
                    tx_id: None,
                }
            }
        }
    }

    /// Flash-withdraw: sweeps the entire yield position to `main_wallet` in
    /// one operation. A zero position is a success no-op.
    pub async fn withdraw_from_yield(
        &self,
        key: &SigningKey,
        main_wallet: &Address,
    ) -> Result<YieldOutcome> {
        let position = self.vault.balance_with_yield(&key.address()).await?;
        if position <= Balance::ZERO {
            tracing::debug!("yield position empty, withdraw skipped");
            return Ok(YieldOutcome::noop());
        }
        self.vault.withdraw_all(key, main_wallet).await
    }

    /// Sweeps the wallet's residual balance to `to`.
    ///
    /// `residual = balance - gas_price * SWEEP_GAS_LIMIT`; when that is not
    /// positive the sweep is skipped (`None`), which is a success, not an
    /// error. Otherwise exactly the residual is transferred and confirmed.
    pub async fn sweep_residual(&self, key: &SigningKey, to: &Address) -> Result<Option<TxId>> {
        let from = key.address();
        let balance = self.chain.native_balance(&from).await?;
        if balance.is_zero() {
            tracing::debug!("balance zero, sweep skipped");
            return Ok(None);
        }

        let gas_price = self.chain.gas_price().await?;
        let gas_cost = Balance::new(gas_price.value() * SWEEP_GAS_LIMIT);
        if balance <= gas_cost {
            tracing::debug!(%balance, %gas_cost, "balance below gas cost, sweep skipped");
            return Ok(None);
        }

        let residual = Amount::new((balance - gas_cost).value())?;
        let tx = self.chain.send_transfer(key, to, residual).await?;
        tracing::info!(amount = %residual, to = %to.short(), tx = %tx, "residual swept");
        Ok(Some(tx))
    }
}
