use crate::application::custodian::KeyCustodian;
use crate::application::ledger::BalanceLedger;
use crate::application::oracle::PriceOracle;
use crate::application::transfer::TransferEngine;
use crate::domain::address::Address;
use crate::domain::amount::{Amount, Balance};
use crate::domain::payment::{PaymentPhase, PaymentResult, PaymentStep};
use crate::error::{PaymentError, Result};
use std::sync::Arc;
use tokio::sync::mpsc;

/// The payment orchestrator.
///
/// Runs the fixed sequence `oracle → (withdraw)? → transfer → sweep → burn →
/// done`, emitting a `PaymentStep` into the progress sink on entering each
/// phase and again on its completion. Any fault is caught at the pipeline
/// boundary and converted into a single `error` step plus a failed
/// `PaymentResult`; on-chain effects already committed are never rolled
/// back. Once started, a run always reaches a terminal state.
pub struct PaymentPipeline {
    custodian: Arc<KeyCustodian>,
    oracle: PriceOracle,
    ledger: BalanceLedger,
    engine: TransferEngine,
    progress: mpsc::UnboundedSender<PaymentStep>,
}

impl PaymentPipeline {
    pub fn new(
        custodian: Arc<KeyCustodian>,
        oracle: PriceOracle,
        ledger: BalanceLedger,
        engine: TransferEngine,
        progress: mpsc::UnboundedSender<PaymentStep>,
    ) -> Self {
        Self {
            custodian,
            oracle,
            ledger,
            engine,
            progress,
        }
    }

    /// Executes one payment of `fiat_amount` to `target`. Produces exactly
    /// one terminal `PaymentResult`.
    pub async fn execute(&self, target: &Address, fiat_amount: Amount) -> PaymentResult {
        match self.run(target, fiat_amount).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "payment pipeline failed");
                self.emit(
                    PaymentStep::new(PaymentPhase::Error, "Payment failed")
                        .with_detail(e.to_string()),
                );
                PaymentResult::failure(e.to_string())
            }
        }
    }

    fn emit(&self, step: PaymentStep) {
        // A detached progress consumer is not a pipeline fault.
        let _ = self.progress.send(step);
    }

    async fn run(&self, target: &Address, fiat_amount: Amount) -> Result<PaymentResult> {
        let wallet = self.custodian.get_or_create().await?;
        let main_wallet = self
            .custodian
            .main_wallet()
            .await?
            .ok_or_else(|| PaymentError::Validation("main wallet not bound".to_string()))?;

        // oracle
        self.emit(
            PaymentStep::new(PaymentPhase::Oracle, "Quoting price")
                .with_detail(format!("{fiat_amount} fiat to native")),
        );
        let (native_amount, quote) = self.oracle.quote(fiat_amount).await;
        let amount = Amount::new(native_amount)?;
        self.emit(
            PaymentStep::new(PaymentPhase::Oracle, format!("{amount} native quoted")).with_detail(
                format!(
                    "1 native = {:.2} fiat ({})",
                    quote.native_fiat,
                    if quote.is_fallback { "estimated" } else { "live" }
                ),
            ),
        );

        // withdraw (conditional)
        let balance = self.ledger.native_balance(&wallet.address).await?;
        if balance.value() < native_amount {
            let position = self.ledger.yield_balance(&wallet.address).await;
            if position > Balance::ZERO {
                self.emit(
                    PaymentStep::new(PaymentPhase::Withdraw, "Flash-withdrawing yield position")
                        .with_detail(format!("{position} native")),
                );
                let outcome = self
                    .ledger
                    .withdraw_from_yield(&wallet.signing_key, &main_wallet)
                    .await?;
                if !outcome.success {
                    return Err(PaymentError::Rpc("yield withdrawal failed".to_string()));
                }
                self.emit(
                    PaymentStep::new(PaymentPhase::Withdraw, "Yield position withdrawn")
                        .with_detail(format!("{} native", outcome.amount)),
                );
            } else {
                // Short with no position: the transfer is allowed to fail
                // naturally rather than being pre-empted here.
                tracing::warn!(%balance, required = %amount, "insufficient balance, no yield position");
            }
        }

        // transfer
        self.emit(
            PaymentStep::new(PaymentPhase::Transfer, "Sending payment")
                .with_detail(format!("{amount} native to {}", target.short())),
        );
        let transfer_tx = self.engine.send(&wallet.signing_key, target, amount).await?;
        self.emit(
            PaymentStep::new(PaymentPhase::Transfer, "Transfer confirmed")
                .with_detail(format!("tx {}", transfer_tx.short())),
        );

        // sweep
        self.emit(
            PaymentStep::new(PaymentPhase::Sweep, "Sweeping residual balance")
                .with_detail(format!("to {}", main_wallet.short())),
        );
        let sweep_tx = self
            .ledger
            .sweep_residual(&wallet.signing_key, &main_wallet)
            .await?;
        match &sweep_tx {
            Some(tx) => self.emit(
                PaymentStep::new(PaymentPhase::Sweep, "Residual swept")
                    .with_detail(format!("tx {}", tx.short())),
            ),
            None => self.emit(
                PaymentStep::new(PaymentPhase::Sweep, "Sweep skipped")
                    .with_detail("balance below gas cost"),
            ),
        }

        // burn
        self.emit(PaymentStep::new(
            PaymentPhase::Burn,
            "Destroying burner wallet",
        ));
        self.custodian.destroy().await?;

        self.emit(PaymentStep::new(
            PaymentPhase::Done,
            "Payment complete, wallet destroyed",
        ));
        Ok(PaymentResult {
            success: true,
            transfer_tx: Some(transfer_tx),
            sweep_tx,
            native_amount: Some(native_amount),
            error: None,
        })
    }
}
