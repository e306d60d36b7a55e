use crate::domain::address::{Address, TxId};
use crate::domain::amount::Amount;
use crate::domain::ports::ChainHandle;
use crate::domain::wallet::SigningKey;
use crate::error::{PaymentError, Result};

/// Signs and submits native-currency transfers and waits for confirmation.
///
/// There is no retry: a submission error, confirmation timeout, or on-chain
/// revert surfaces immediately as `PaymentError::Transfer`.
pub struct TransferEngine {
    chain: ChainHandle,
}

impl TransferEngine {
    pub fn new(chain: ChainHandle) -> Self {
        Self { chain }
    }

    pub async fn send(&self, key: &SigningKey, to: &Address, amount: Amount) -> Result<TxId> {
        tracing::info!(amount = %amount, to = %to.short(), "submitting transfer");
        let tx = self
            .chain
            .send_transfer(key, to, amount)
            .await
            .map_err(|e| PaymentError::Transfer(e.to_string()))?;
        tracing::info!(tx = %tx, "transfer confirmed");
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::amount::Balance;
    use crate::domain::ports::ChainRpc;
    use crate::infrastructure::in_memory::InMemoryChain;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_send_moves_funds_and_charges_gas() {
        let key = SigningKey::generate();
        let to = SigningKey::generate().address();

        let chain = InMemoryChain::new().with_gas_price(dec!(0.0001));
        chain.credit(&key.address(), dec!(10)).await;

        let engine = TransferEngine::new(Arc::new(chain.clone()));
        engine
            .send(&key, &to, Amount::new(dec!(2)).unwrap())
            .await
            .unwrap();

        assert_eq!(
            chain.native_balance(&to).await.unwrap(),
            Balance::new(dec!(2))
        );
        // 10 - 2 - 0.0001 * 21_000
        assert_eq!(
            chain.native_balance(&key.address()).await.unwrap(),
            Balance::new(dec!(5.9))
        );
    }

    #[tokio::test]
    async fn test_insufficient_funds_surfaces_as_transfer_failure() {
        let key = SigningKey::generate();
        let to = SigningKey::generate().address();

        let chain = InMemoryChain::new();
        chain.credit(&key.address(), dec!(1)).await;

        let engine = TransferEngine::new(Arc::new(chain));
        let err = engine
            .send(&key, &to, Amount::new(dec!(5)).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Transfer(_)));
    }

    #[tokio::test]
    async fn test_simulated_revert_surfaces_as_transfer_failure() {
        let key = SigningKey::generate();
        let to = SigningKey::generate().address();

        let chain = InMemoryChain::new();
        chain.credit(&key.address(), dec!(10)).await;
        chain.set_fail_transfers(true);

        let engine = TransferEngine::new(Arc::new(chain));
        let err = engine
            .send(&key, &to, Amount::new(dec!(2)).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Transfer(_)));
    }
}
