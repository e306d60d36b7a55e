// Not every test binary uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use burnpay::application::custodian::KeyCustodian;
use burnpay::application::ledger::BalanceLedger;
use burnpay::application::oracle::PriceOracle;
use burnpay::application::pipeline::PaymentPipeline;
use burnpay::application::transfer::TransferEngine;
use burnpay::domain::address::Address;
use burnpay::domain::payment::{PaymentStep, StepLog};
use burnpay::domain::ports::{PriceSource, SecretStore, YieldLedgerHandle};
use burnpay::domain::quote::RateTable;
use burnpay::domain::wallet::{BurnerWallet, SigningKey};
use burnpay::error::{PaymentError, Result};
use burnpay::infrastructure::in_memory::{InMemoryChain, InMemorySecretStore, InMemoryYieldLedger};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Gas price used across pipeline scenarios: cost of one transfer is
/// 0.0001 * 21_000 = 2.1 native.
pub const GAS_PRICE: Decimal = dec!(0.0001);

/// A price source returning a fixed rate table.
pub struct FixedSource(pub RateTable);

#[async_trait]
impl PriceSource for FixedSource {
    async fn fetch_rates(&self) -> Result<RateTable> {
        Ok(self.0.clone())
    }
}

/// A price source that always fails, forcing the oracle's fallback branch.
pub struct FailingSource;

#[async_trait]
impl PriceSource for FailingSource {
    async fn fetch_rates(&self) -> Result<RateTable> {
        Err(PaymentError::Rpc("connection refused".to_string()))
    }
}

/// Rates that quote 50 fiat as exactly 2 native.
pub fn rates_two_native_per_fifty() -> RateTable {
    RateTable {
        native_usd: Some(dec!(1)),
        native_fiat: Some(dec!(25)),
        usd_fiat: Some(dec!(25)),
    }
}

/// A secret store whose deletes fail, simulating a burn failure after the
/// transfer already confirmed.
#[derive(Clone)]
pub struct DeleteFailsStore(pub InMemorySecretStore);

#[async_trait]
impl SecretStore for DeleteFailsStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.0.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.0.set(key, value).await
    }

    async fn delete(&self, _key: &str) -> Result<()> {
        Err(PaymentError::Storage("keystore refused delete".to_string()))
    }
}

pub struct Harness {
    pub chain: InMemoryChain,
    pub vault: InMemoryYieldLedger,
    pub custodian: Arc<KeyCustodian>,
    pub wallet: BurnerWallet,
    pub main_wallet: Address,
    pub target: Address,
    pub pipeline: PaymentPipeline,
    steps: mpsc::UnboundedReceiver<PaymentStep>,
}

impl Harness {
    /// Folds every step emitted so far into a `StepLog`.
    pub fn drain_steps(&mut self) -> StepLog {
        let mut log = StepLog::new();
        while let Ok(step) = self.steps.try_recv() {
            log.push(step);
        }
        log
    }
}

/// Builds a complete pipeline over the simulated chain with an in-memory
/// yield ledger and the given price source.
pub async fn harness(
    balance: Decimal,
    yield_balance: Decimal,
    source: Box<dyn PriceSource>,
) -> Harness {
    let store = InMemorySecretStore::new();
    build_harness(balance, yield_balance, source, Box::new(store)).await
}

pub async fn build_harness(
    balance: Decimal,
    yield_balance: Decimal,
    source: Box<dyn PriceSource>,
    store: Box<dyn SecretStore>,
) -> Harness {
    let custodian = Arc::new(KeyCustodian::new(store));
    let wallet = custodian.get_or_create().await.unwrap();
    let main_wallet = SigningKey::generate().address();
    custodian.connect_main_wallet(&main_wallet).await.unwrap();

    let chain = InMemoryChain::new().with_gas_price(GAS_PRICE);
    if balance > Decimal::ZERO {
        chain.credit(&wallet.address, balance).await;
    }

    let vault = InMemoryYieldLedger::new();
    if yield_balance > Decimal::ZERO {
        vault.with_position(&wallet.address, yield_balance).await;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let pipeline = PaymentPipeline::new(
        Arc::clone(&custodian),
        PriceOracle::new(source),
        BalanceLedger::new(
            Arc::new(chain.clone()),
            Arc::new(vault.clone()) as YieldLedgerHandle,
        ),
        TransferEngine::new(Arc::new(chain.clone())),
        tx,
    );

    Harness {
        chain,
        vault,
        custodian,
        wallet,
        main_wallet,
        target: SigningKey::generate().address(),
        pipeline,
        steps: rx,
    }
}
