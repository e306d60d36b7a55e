use crate::domain::address::{Address, TxId};
use crate::domain::amount::{Amount, Balance};
use crate::domain::quote::RateTable;
use crate::domain::wallet::SigningKey;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Persistent secure storage for string-keyed secrets.
///
/// Absence of a key is a valid, distinguishable state (wallet not yet
/// created, main wallet not yet bound), never an error.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// Chain RPC surface: native reads, signed native transfers, and calls
/// against the pre-deployed yield-vault contract.
///
/// Implementations sign with the provided key, submit, and wait for one
/// confirmation before returning a transaction id.
#[async_trait]
pub trait ChainRpc: Send + Sync {
    async fn native_balance(&self, address: &Address) -> Result<Balance>;
    /// Current gas price, in native units per gas unit.
    async fn gas_price(&self) -> Result<Balance>;
    /// Signs and submits a native transfer, then waits for one confirmation.
    async fn send_transfer(&self, key: &SigningKey, to: &Address, amount: Amount) -> Result<TxId>;
    /// Read-only contract call; returns the raw return data.
    async fn call(&self, contract: &Address, data: &[u8]) -> Result<Vec<u8>>;
    /// Signed contract write with an optional attached value; waits for one
    /// confirmation.
    async fn transact(
        &self,
        key: &SigningKey,
        contract: &Address,
        data: &[u8],
        value: Balance,
    ) -> Result<TxId>;
}

/// Outcome of a yield-position mutation, mirroring the vault's contract.
#[derive(Debug, Clone, PartialEq)]
pub struct YieldOutcome {
    pub success: bool,
    pub amount: Balance,
    pub tx_id: Option<TxId>,
}

impl YieldOutcome {
    pub fn noop() -> Self {
        Self {
            success: true,
            amount: Balance::ZERO,
            tx_id: None,
        }
    }
}

/// The secondary yield-bearing position.
///
/// Two interchangeable backends exist: a chain-backed one speaking to the
/// vault contract and an in-memory simulation for degraded mode. Call sites
/// never branch on which one they hold.
#[async_trait]
pub trait YieldLedger: Send + Sync {
    async fn balance_with_yield(&self, owner: &Address) -> Result<Balance>;
    /// Moves native balance into the position. Atomic from the caller's
    /// perspective.
    async fn deposit(&self, key: &SigningKey, amount: Amount) -> Result<YieldOutcome>;
    /// Sweeps the *entire* position to `main_wallet` in one operation
    /// (flash-withdraw mid-payment, or clearing the position afterwards).
    async fn withdraw_all(&self, key: &SigningKey, main_wallet: &Address) -> Result<YieldOutcome>;
    /// Pays `amount` from the position straight to `target` via the vault's
    /// `executePayment` entry point.
    async fn execute_payment(
        &self,
        key: &SigningKey,
        target: &Address,
        amount: Amount,
    ) -> Result<YieldOutcome>;
}

/// A remote source of native/fiat exchange rates.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_rates(&self) -> Result<RateTable>;
}

/// The proximity discovery channel (near-field record exchange).
#[async_trait]
pub trait ProximityReader: Send + Sync {
    /// One read attempt. `Ok(None)` means nothing was read within the
    /// channel's own timeout; the session may poll again.
    async fn read_payload(&self) -> Result<Option<String>>;
    /// Stops the channel. Must be safe to call more than once.
    fn cancel(&self);
}

/// The optical discovery channel (per-frame code scanning).
#[async_trait]
pub trait OpticalScanner: Send + Sync {
    /// The next recognized frame payload. `Ok(None)` means the scanner shut
    /// down and no further frames will arrive.
    async fn next_frame(&self) -> Result<Option<String>>;
    /// Stops the channel. Must be safe to call more than once.
    fn cancel(&self);
}

pub type SecretStoreBox = Box<dyn SecretStore>;
pub type PriceSourceBox = Box<dyn PriceSource>;
pub type ChainHandle = Arc<dyn ChainRpc>;
pub type YieldLedgerHandle = Arc<dyn YieldLedger>;
pub type ProximityHandle = Arc<dyn ProximityReader>;
pub type OpticalHandle = Arc<dyn OpticalScanner>;
