use crate::domain::address::{Address, TxId};
use crate::domain::amount::{Amount, Balance};
use crate::domain::ports::{
    ChainRpc, OpticalScanner, ProximityReader, SecretStore, YieldLedger, YieldOutcome,
};
use crate::domain::wallet::SigningKey;
use crate::error::{PaymentError, Result};
use crate::infrastructure::contract::{VAULT_ADDRESS, abi};
use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

/// A thread-safe in-memory secret store.
///
/// Uses `Arc<RwLock<HashMap>>` to allow shared concurrent access. Ideal for
/// tests and the simulated CLI session where no device keystore exists.
#[derive(Default, Clone)]
pub struct InMemorySecretStore {
    secrets: Arc<RwLock<HashMap<String, String>>>,
    unavailable: Arc<AtomicBool>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the device keystore becoming unavailable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(PaymentError::Storage("secure store unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.check_available()?;
        let secrets = self.secrets.read().await;
        Ok(secrets.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.check_available()?;
        let mut secrets = self.secrets.write().await;
        secrets.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check_available()?;
        let mut secrets = self.secrets.write().await;
        secrets.remove(key);
        Ok(())
    }
}

/// Gas limit charged for every simulated transaction.
const TX_GAS_LIMIT: Decimal = dec!(21_000);

struct ChainState {
    balances: HashMap<Address, Decimal>,
    nonce: u64,
    /// Positions held by the built-in vault contract at `VAULT_ADDRESS`.
    vault_deposits: HashMap<Address, Decimal>,
}

/// A simulated chain backing the `ChainRpc` port.
///
/// Tracks native balances, charges gas on every write, and hosts the yield
/// vault as a built-in contract so `ContractYieldLedger` can be exercised
/// without a live network. Confirmation waits are modelled as a fixed delay.
#[derive(Clone)]
pub struct InMemoryChain {
    state: Arc<RwLock<ChainState>>,
    fail_transfers: Arc<AtomicBool>,
    gas_price: Decimal,
    confirmation_delay: Duration,
    vault_address: Address,
}

impl Default for InMemoryChain {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ChainState {
                balances: HashMap::new(),
                nonce: 0,
                vault_deposits: HashMap::new(),
            })),
            fail_transfers: Arc::new(AtomicBool::new(false)),
            gas_price: Decimal::ZERO,
            confirmation_delay: Duration::ZERO,
            vault_address: Address::parse(VAULT_ADDRESS).expect("vault address constant is valid"),
        }
    }

    pub fn with_gas_price(mut self, gas_price: Decimal) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    pub fn vault_address(&self) -> Address {
        self.vault_address.clone()
    }

    pub async fn credit(&self, address: &Address, amount: Decimal) {
        let mut state = self.state.write().await;
        *state.balances.entry(address.clone()).or_default() += amount;
    }

    /// Makes every subsequent write revert, simulating an on-chain failure.
    pub fn set_fail_transfers(&self, fail: bool) {
        self.fail_transfers.store(fail, Ordering::SeqCst);
    }

    /// Vault position as seen by the built-in contract, for assertions.
    pub async fn vault_position(&self, owner: &Address) -> Decimal {
        let state = self.state.read().await;
        state.vault_deposits.get(owner).copied().unwrap_or_default()
    }

    fn confirm(state: &mut ChainState, parts: &[&[u8]]) -> TxId {
        state.nonce += 1;
        let mut hasher = Sha256::new();
        hasher.update(state.nonce.to_be_bytes());
        for part in parts {
            hasher.update(part);
        }
        TxId(format!("0x{}", hex::encode(hasher.finalize())))
    }

    fn debit(
        state: &mut ChainState,
        from: &Address,
        amount: Decimal,
        gas_cost: Decimal,
    ) -> Result<()> {
        let balance = state.balances.get(from).copied().unwrap_or_default();
        let total = amount + gas_cost;
        if balance < total {
            return Err(PaymentError::Rpc(format!(
                "insufficient funds: balance {balance}, need {total}"
            )));
        }
        *state.balances.entry(from.clone()).or_default() -= total;
        Ok(())
    }
}

#[async_trait]
impl ChainRpc for InMemoryChain {
    async fn native_balance(&self, address: &Address) -> Result<Balance> {
        let state = self.state.read().await;
        Ok(Balance::new(
            state.balances.get(address).copied().unwrap_or_default(),
        ))
    }

    async fn gas_price(&self) -> Result<Balance> {
        Ok(Balance::new(self.gas_price))
    }

    async fn send_transfer(&self, key: &SigningKey, to: &Address, amount: Amount) -> Result<TxId> {
        if self.fail_transfers.load(Ordering::SeqCst) {
            return Err(PaymentError::Rpc("transaction reverted".to_string()));
        }

        let tx = {
            let mut state = self.state.write().await;
            let from = key.address();
            let gas_cost = self.gas_price * TX_GAS_LIMIT;
            Self::debit(&mut state, &from, amount.value(), gas_cost)?;
            *state.balances.entry(to.clone()).or_default() += amount.value();
            Self::confirm(&mut state, &[from.as_str().as_bytes(), to.as_str().as_bytes()])
        };

        tokio::time::sleep(self.confirmation_delay).await;
        Ok(tx)
    }

    async fn call(&self, contract: &Address, data: &[u8]) -> Result<Vec<u8>> {
        if *contract != self.vault_address {
            return Err(PaymentError::Rpc(format!(
                "no contract at {}",
                contract.short()
            )));
        }

        let state = self.state.read().await;
        match abi::selector(data) {
            Some(abi::SEL_GET_BALANCE_WITH_YIELD) => {
                let owner = abi::decode_address(data, 0)?;
                let position = state.vault_deposits.get(&owner).copied().unwrap_or_default();
                abi::encode_return_amount(position)
            }
            _ => Err(PaymentError::Rpc("not a view function".to_string())),
        }
    }

    async fn transact(
        &self,
        key: &SigningKey,
        contract: &Address,
        data: &[u8],
        value: Balance,
    ) -> Result<TxId> {
        if *contract != self.vault_address {
            return Err(PaymentError::Rpc(format!(
                "no contract at {}",
                contract.short()
            )));
        }
        if self.fail_transfers.load(Ordering::SeqCst) {
            return Err(PaymentError::Rpc("transaction reverted".to_string()));
        }

        let tx = {
            let mut state = self.state.write().await;
            let sender = key.address();
            let gas_cost = self.gas_price * TX_GAS_LIMIT;

            match abi::selector(data) {
                Some(abi::SEL_DEPOSIT) => {
                    if value.value() <= Decimal::ZERO {
                        return Err(PaymentError::Rpc("deposit requires a value".to_string()));
                    }
                    Self::debit(&mut state, &sender, value.value(), gas_cost)?;
                    *state.vault_deposits.entry(sender.clone()).or_default() += value.value();
                }
                Some(abi::SEL_EXECUTE_PAYMENT) => {
                    let target = abi::decode_address(data, 0)?;
                    let amount = abi::decode_amount(data, 1)?;
                    let position = state.vault_deposits.get(&sender).copied().unwrap_or_default();
                    if position < amount {
                        return Err(PaymentError::Rpc("insufficient vault position".to_string()));
                    }
                    Self::debit(&mut state, &sender, Decimal::ZERO, gas_cost)?;
                    *state.vault_deposits.entry(sender.clone()).or_default() -= amount;
                    *state.balances.entry(target).or_default() += amount;
                }
                Some(abi::SEL_SWEEP) => {
                    let main_wallet = abi::decode_address(data, 0)?;
                    Self::debit(&mut state, &sender, Decimal::ZERO, gas_cost)?;
                    let position = state.vault_deposits.remove(&sender).unwrap_or_default();
                    *state.balances.entry(main_wallet).or_default() += position;
                }
                _ => return Err(PaymentError::Rpc("unknown function selector".to_string())),
            }

            Self::confirm(&mut state, &[sender.as_str().as_bytes(), data])
        };

        tokio::time::sleep(self.confirmation_delay).await;
        Ok(tx)
    }
}

/// In-memory yield ledger for degraded mode: positions are plain values, no
/// chain involved. Fund routing on withdraw happens outside the simulation,
/// exactly like the UI-state-only pool the degraded mode replaces.
#[derive(Default, Clone)]
pub struct InMemoryYieldLedger {
    positions: Arc<RwLock<HashMap<Address, Decimal>>>,
    fail: Arc<AtomicBool>,
}

impl InMemoryYieldLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_position(&self, owner: &Address, amount: Decimal) {
        let mut positions = self.positions.write().await;
        positions.insert(owner.clone(), amount);
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            Err(PaymentError::Rpc("vault rejected the call".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl YieldLedger for InMemoryYieldLedger {
    async fn balance_with_yield(&self, owner: &Address) -> Result<Balance> {
        self.check()?;
        let positions = self.positions.read().await;
        Ok(Balance::new(
            positions.get(owner).copied().unwrap_or_default(),
        ))
    }

    async fn deposit(&self, key: &SigningKey, amount: Amount) -> Result<YieldOutcome> {
        self.check()?;
        let mut positions = self.positions.write().await;
        *positions.entry(key.address()).or_default() += amount.value();
        Ok(YieldOutcome {
            success: true,
            amount: amount.into(),
            tx_id: None,
        })
    }

    async fn withdraw_all(&self, key: &SigningKey, _main_wallet: &Address) -> Result<YieldOutcome> {
        self.check()?;
        let mut positions = self.positions.write().await;
        let position = positions.remove(&key.address()).unwrap_or_default();
        if position == Decimal::ZERO {
            return Ok(YieldOutcome::noop());
        }
        Ok(YieldOutcome {
            success: true,
            amount: Balance::new(position),
            tx_id: None,
        })
    }

    async fn execute_payment(
        &self,
        key: &SigningKey,
        _target: &Address,
        amount: Amount,
    ) -> Result<YieldOutcome> {
        self.check()?;
        let mut positions = self.positions.write().await;
        let position = positions.entry(key.address()).or_default();
        if *position < amount.value() {
            return Err(PaymentError::Rpc("insufficient vault position".to_string()));
        }
        *position -= amount.value();
        Ok(YieldOutcome {
            success: true,
            amount: amount.into(),
            tx_id: None,
        })
    }
}

/// A scripted proximity channel for tests and the demo session.
#[derive(Clone)]
pub struct ScriptedProximity {
    payload: Option<String>,
    delay: Duration,
    cancelled: Arc<AtomicBool>,
}

impl ScriptedProximity {
    /// Yields `payload` once, after `delay`.
    pub fn with_payload(payload: String, delay: Duration) -> Self {
        Self {
            payload: Some(payload),
            delay,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Never yields anything.
    pub fn silent() -> Self {
        Self {
            payload: None,
            delay: Duration::from_millis(25),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProximityReader for ScriptedProximity {
    async fn read_payload(&self) -> Result<Option<String>> {
        tokio::time::sleep(self.delay).await;
        if self.cancelled.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self.payload.clone())
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

/// A scripted optical channel replaying timed frames.
#[derive(Clone)]
pub struct ScriptedScanner {
    frames: Arc<Mutex<VecDeque<(Duration, String)>>>,
    cancelled: Arc<AtomicBool>,
}

impl ScriptedScanner {
    pub fn with_frames(frames: Vec<(Duration, String)>) -> Self {
        Self {
            frames: Arc::new(Mutex::new(frames.into_iter().collect())),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Never yields a frame.
    pub fn silent() -> Self {
        Self::with_frames(Vec::new())
    }

    pub fn was_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OpticalScanner for ScriptedScanner {
    async fn next_frame(&self) -> Result<Option<String>> {
        let next = {
            let mut frames = self.frames.lock().await;
            frames.pop_front()
        };
        match next {
            Some((delay, frame)) => {
                tokio::time::sleep(delay).await;
                if self.cancelled.load(Ordering::SeqCst) {
                    return Ok(None);
                }
                Ok(Some(frame))
            }
            None => {
                // Out of scripted frames; hold the channel open until the
                // session tears it down.
                std::future::pending::<()>().await;
                Ok(None)
            }
        }
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}
