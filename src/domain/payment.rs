use crate::domain::address::TxId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The pipeline phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentPhase {
    Oracle,
    Withdraw,
    Transfer,
    Sweep,
    Burn,
    Done,
    Error,
}

impl PaymentPhase {
    /// `Done` and `Error` are absorbing: nothing follows them and they are
    /// never replaced in a step log.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl fmt::Display for PaymentPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Oracle => "oracle",
            Self::Withdraw => "withdraw",
            Self::Transfer => "transfer",
            Self::Sweep => "sweep",
            Self::Burn => "burn",
            Self::Done => "done",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// An immutable progress event emitted by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentStep {
    pub phase: PaymentPhase,
    pub message: String,
    pub detail: Option<String>,
}

impl PaymentStep {
    pub fn new(phase: PaymentPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// An ordered step log with replace-by-phase semantics.
///
/// A later event for a phase replaces the most recent event of that phase
/// in place rather than appending, so consumers see one line per phase.
/// Terminal events (`done`, `error`) are always appended and unique.
#[derive(Debug, Clone, Default)]
pub struct StepLog {
    steps: Vec<PaymentStep>,
}

impl StepLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: PaymentStep) {
        if !step.phase.is_terminal()
            && let Some(existing) = self.steps.iter_mut().rfind(|s| s.phase == step.phase)
        {
            *existing = step;
            return;
        }
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[PaymentStep] {
        &self.steps
    }

    pub fn phases(&self) -> Vec<PaymentPhase> {
        self.steps.iter().map(|s| s.phase).collect()
    }
}

/// The terminal outcome of one pipeline run. Produced exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub success: bool,
    pub transfer_tx: Option<TxId>,
    pub sweep_tx: Option<TxId>,
    pub native_amount: Option<Decimal>,
    pub error: Option<String>,
}

impl PaymentResult {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            transfer_tx: None,
            sweep_tx: None,
            native_amount: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_log_replaces_same_phase() {
        let mut log = StepLog::new();
        log.push(PaymentStep::new(PaymentPhase::Oracle, "quoting"));
        log.push(PaymentStep::new(PaymentPhase::Oracle, "quoted").with_detail("2.0000"));
        log.push(PaymentStep::new(PaymentPhase::Transfer, "sending"));

        assert_eq!(log.steps().len(), 2);
        assert_eq!(log.steps()[0].message, "quoted");
        assert_eq!(log.steps()[0].detail.as_deref(), Some("2.0000"));
        assert_eq!(
            log.phases(),
            vec![PaymentPhase::Oracle, PaymentPhase::Transfer]
        );
    }

    #[test]
    fn test_step_log_terminal_always_appended() {
        let mut log = StepLog::new();
        log.push(PaymentStep::new(PaymentPhase::Transfer, "sending"));
        log.push(PaymentStep::new(PaymentPhase::Error, "transfer failed"));

        assert_eq!(log.steps().len(), 2);
        assert_eq!(log.steps()[1].phase, PaymentPhase::Error);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(PaymentPhase::Done.is_terminal());
        assert!(PaymentPhase::Error.is_terminal());
        assert!(!PaymentPhase::Sweep.is_terminal());
    }
}
