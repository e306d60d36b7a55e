use crate::domain::address::Address;
use crate::domain::amount::{Amount, Balance};
use crate::domain::ports::{ChainHandle, YieldLedger, YieldOutcome};
use crate::domain::wallet::SigningKey;
use crate::error::Result;
use async_trait::async_trait;

/// Address of the pre-deployed yield-vault contract.
pub const VAULT_ADDRESS: &str = "0x36509f86a748b413a82e510afc580974cc3f5151";

/// Minimal ABI encoding for the vault's four external functions.
///
/// Calldata is the 4-byte function selector followed by 32-byte words;
/// addresses are left-padded to a word, amounts are big-endian wei in the
/// low 16 bytes of a word.
pub mod abi {
    use crate::domain::address::Address;
    use crate::error::{PaymentError, Result};
    use rust_decimal::Decimal;
    use rust_decimal::prelude::ToPrimitive;

    /// Function selectors of the deployed vault.
    pub const SEL_DEPOSIT: [u8; 4] = [0xd0, 0xe3, 0x0d, 0xb0];
    pub const SEL_GET_BALANCE_WITH_YIELD: [u8; 4] = [0x8e, 0x9c, 0xb7, 0x34];
    pub const SEL_EXECUTE_PAYMENT: [u8; 4] = [0x2c, 0xb4, 0x0a, 0x7b];
    pub const SEL_SWEEP: [u8; 4] = [0x01, 0x68, 0x1a, 0x62];

    const WEI_SCALE: u32 = 18;

    pub fn encode_call(selector: [u8; 4], args: &[[u8; 32]]) -> Vec<u8> {
        let mut data = Vec::with_capacity(4 + args.len() * 32);
        data.extend_from_slice(&selector);
        for arg in args {
            data.extend_from_slice(arg);
        }
        data
    }

    pub fn selector(data: &[u8]) -> Option<[u8; 4]> {
        data.get(..4)?.try_into().ok()
    }

    pub fn address_word(address: &Address) -> [u8; 32] {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&address.to_bytes());
        word
    }

    pub fn amount_word(amount: Decimal) -> Result<[u8; 32]> {
        let wei = to_wei(amount)?;
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&wei.to_be_bytes());
        Ok(word)
    }

    pub fn decode_address(data: &[u8], word_index: usize) -> Result<Address> {
        let word = word_at(data, word_index)?;
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[12..]);
        Ok(Address::from_bytes(&bytes))
    }

    pub fn decode_amount(data: &[u8], word_index: usize) -> Result<Decimal> {
        let word = word_at(data, word_index)?;
        if word[..16].iter().any(|&b| b != 0) {
            return Err(PaymentError::Rpc("amount word overflows".to_string()));
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&word[16..]);
        Ok(from_wei(u128::from_be_bytes(low)))
    }

    pub fn to_wei(amount: Decimal) -> Result<u128> {
        let scaled = amount * Decimal::from(10u64.pow(WEI_SCALE));
        scaled
            .trunc()
            .to_u128()
            .ok_or_else(|| PaymentError::Rpc(format!("amount not representable in wei: {amount}")))
    }

    pub fn from_wei(wei: u128) -> Decimal {
        Decimal::from_i128_with_scale(wei as i128, WEI_SCALE).normalize()
    }

    fn word_at(data: &[u8], word_index: usize) -> Result<&[u8]> {
        let start = 4 + word_index * 32;
        data.get(start..start + 32)
            .ok_or_else(|| PaymentError::Rpc("calldata truncated".to_string()))
    }

    /// Return data is bare words without a selector.
    pub fn decode_return_amount(data: &[u8]) -> Result<Decimal> {
        let word = data
            .get(..32)
            .ok_or_else(|| PaymentError::Rpc("return data truncated".to_string()))?;
        if word[..16].iter().any(|&b| b != 0) {
            return Err(PaymentError::Rpc("amount word overflows".to_string()));
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&word[16..]);
        Ok(from_wei(u128::from_be_bytes(low)))
    }

    pub fn encode_return_amount(amount: Decimal) -> Result<Vec<u8>> {
        let wei = to_wei(amount)?;
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&wei.to_be_bytes());
        Ok(word.to_vec())
    }
}

/// Yield ledger backed by the pre-deployed vault contract through the
/// `ChainRpc` port.
pub struct ContractYieldLedger {
    chain: ChainHandle,
    vault: Address,
}

impl ContractYieldLedger {
    pub fn new(chain: ChainHandle, vault: Address) -> Self {
        Self { chain, vault }
    }
}

#[async_trait]
impl YieldLedger for ContractYieldLedger {
    async fn balance_with_yield(&self, owner: &Address) -> Result<Balance> {
        let data = abi::encode_call(abi::SEL_GET_BALANCE_WITH_YIELD, &[abi::address_word(owner)]);
        let ret = self.chain.call(&self.vault, &data).await?;
        Ok(Balance::new(abi::decode_return_amount(&ret)?))
    }

    async fn deposit(&self, key: &SigningKey, amount: Amount) -> Result<YieldOutcome> {
        let data = abi::encode_call(abi::SEL_DEPOSIT, &[]);
        let tx = self
            .chain
            .transact(key, &self.vault, &data, amount.into())
            .await?;
        tracing::info!(amount = %amount, tx = %tx, "deposited into yield vault");
        Ok(YieldOutcome {
            success: true,
            amount: amount.into(),
            tx_id: Some(tx),
        })
    }

    async fn withdraw_all(&self, key: &SigningKey, main_wallet: &Address) -> Result<YieldOutcome> {
        let position = self.balance_with_yield(&key.address()).await?;
        if position.is_zero() {
            return Ok(YieldOutcome::noop());
        }

        let data = abi::encode_call(abi::SEL_SWEEP, &[abi::address_word(main_wallet)]);
        let tx = self
            .chain
            .transact(key, &self.vault, &data, Balance::ZERO)
            .await?;
        tracing::info!(amount = %position, to = %main_wallet.short(), tx = %tx, "yield vault swept");
        Ok(YieldOutcome {
            success: true,
            amount: position,
            tx_id: Some(tx),
        })
    }

    async fn execute_payment(
        &self,
        key: &SigningKey,
        target: &Address,
        amount: Amount,
    ) -> Result<YieldOutcome> {
        let data = abi::encode_call(
            abi::SEL_EXECUTE_PAYMENT,
            &[
                abi::address_word(target),
                abi::amount_word(amount.value())?,
            ],
        );
        let tx = self
            .chain
            .transact(key, &self.vault, &data, Balance::ZERO)
            .await?;
        Ok(YieldOutcome {
            success: true,
            amount: amount.into(),
            tx_id: Some(tx),
        })
    }
}
