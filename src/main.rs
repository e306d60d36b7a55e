use burnpay::application::custodian::KeyCustodian;
use burnpay::application::discovery::DiscoverySession;
use burnpay::application::ledger::BalanceLedger;
use burnpay::application::oracle::PriceOracle;
use burnpay::application::pipeline::PaymentPipeline;
use burnpay::application::transfer::TransferEngine;
use burnpay::domain::address::Address;
use burnpay::domain::amount::Amount;
use burnpay::domain::payment::PaymentStep;
use burnpay::domain::ports::{SecretStoreBox, YieldLedger, YieldLedgerHandle};
use burnpay::domain::wallet::SigningKey;
use burnpay::infrastructure::contract::ContractYieldLedger;
use burnpay::infrastructure::http_price::HttpPriceSource;
use burnpay::infrastructure::in_memory::{
    InMemoryChain, InMemorySecretStore, InMemoryYieldLedger, ScriptedProximity, ScriptedScanner,
};
use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result, miette};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Runs one simulated burner-wallet payment session end to end: discovery,
/// quote, optional flash-withdraw, transfer, sweep, burn.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Counterparty address. When omitted, a scripted discovery race
    /// resolves a generated address over the optical channel.
    #[arg(long)]
    target: Option<String>,

    /// Payment amount in fiat.
    #[arg(long, default_value = "50")]
    fiat_amount: Decimal,

    /// Initial native balance of the burner wallet.
    #[arg(long, default_value = "10")]
    balance: Decimal,

    /// Initial yield-position balance.
    #[arg(long, default_value = "0")]
    yield_balance: Decimal,

    /// Main wallet address receiving sweeps. Generated when omitted.
    #[arg(long)]
    main_wallet: Option<String>,

    /// Simulated gas price in native units per gas unit.
    #[arg(long, default_value = "0.0001")]
    gas_price: Decimal,

    /// Yield ledger backend.
    #[arg(long, value_enum, default_value_t = VaultMode::Memory)]
    vault_mode: VaultMode,

    /// Path to persistent secret storage (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum VaultMode {
    /// In-memory yield position (degraded mode).
    Memory,
    /// Vault contract on the simulated chain.
    Contract,
}

fn secret_store(db_path: Option<PathBuf>) -> Result<SecretStoreBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            let store = burnpay::infrastructure::rocksdb::RocksDbSecretStore::open(path)
                .into_diagnostic()?;
            Ok(Box::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemorySecretStore::new()))
        }
        None => Ok(Box::new(InMemorySecretStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let custodian = Arc::new(KeyCustodian::new(secret_store(cli.db_path)?));
    let wallet = custodian.get_or_create().await.into_diagnostic()?;
    println!("burner wallet: {}", wallet.address);

    let main_wallet = match &cli.main_wallet {
        Some(s) => Address::parse(s).into_diagnostic()?,
        None => SigningKey::generate().address(),
    };
    custodian
        .connect_main_wallet(&main_wallet)
        .await
        .into_diagnostic()?;
    println!("main wallet:   {main_wallet}");

    let chain = InMemoryChain::new()
        .with_gas_price(cli.gas_price)
        .with_confirmation_delay(Duration::from_millis(300));
    chain.credit(&wallet.address, cli.balance).await;

    let vault: YieldLedgerHandle = match cli.vault_mode {
        VaultMode::Memory => {
            let vault = InMemoryYieldLedger::new();
            if cli.yield_balance > Decimal::ZERO {
                vault.with_position(&wallet.address, cli.yield_balance).await;
            }
            Arc::new(vault)
        }
        VaultMode::Contract => {
            let vault = Arc::new(ContractYieldLedger::new(
                Arc::new(chain.clone()),
                chain.vault_address(),
            ));
            if cli.yield_balance > Decimal::ZERO {
                // Seed the position through the contract itself.
                chain.credit(&wallet.address, cli.yield_balance).await;
                let amount = Amount::new(cli.yield_balance).into_diagnostic()?;
                vault
                    .deposit(&wallet.signing_key, amount)
                    .await
                    .into_diagnostic()?;
            }
            vault
        }
    };

    let target = match &cli.target {
        Some(s) => Address::parse(s).into_diagnostic()?,
        None => {
            println!("looking for counterparty...");
            let counterparty = SigningKey::generate().address();
            let session = DiscoverySession::new(
                Arc::new(ScriptedProximity::silent()),
                Arc::new(ScriptedScanner::with_frames(vec![(
                    Duration::from_millis(400),
                    format!("ethereum:{counterparty}@10143"),
                )])),
            );
            let result = session
                .resolve(Duration::from_secs(10))
                .await
                .into_diagnostic()?;
            println!("resolved {} via {:?}", result.address, result.channel);
            result.address
        }
    };

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<PaymentStep>();
    let printer = tokio::spawn(async move {
        while let Some(step) = progress_rx.recv().await {
            match &step.detail {
                Some(detail) => println!("[{}] {} ({detail})", step.phase, step.message),
                None => println!("[{}] {}", step.phase, step.message),
            }
        }
    });

    let pipeline = PaymentPipeline::new(
        Arc::clone(&custodian),
        PriceOracle::new(Box::new(HttpPriceSource::default())),
        BalanceLedger::new(Arc::new(chain.clone()), vault),
        TransferEngine::new(Arc::new(chain)),
        progress_tx,
    );

    let fiat = Amount::new(cli.fiat_amount).into_diagnostic()?;
    let result = pipeline.execute(&target, fiat).await;
    // Close the progress channel so the printer drains and exits.
    drop(pipeline);
    printer.await.into_diagnostic()?;

    if result.success {
        if let (Some(tx), Some(amount)) = (&result.transfer_tx, result.native_amount) {
            println!("paid {amount:.4} native, tx {tx}");
        }
        Ok(())
    } else {
        Err(miette!(
            "payment failed: {}",
            result.error.unwrap_or_else(|| "unknown error".to_string())
        ))
    }
}
