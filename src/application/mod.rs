//! Application layer containing the payment use-cases.
//!
//! Each service owns the ports it needs and exposes a small async API; the
//! `PaymentPipeline` composes them into the ordered, partially-irreversible
//! payment sequence.

pub mod custodian;
pub mod discovery;
pub mod ledger;
pub mod oracle;
pub mod pipeline;
pub mod transfer;
