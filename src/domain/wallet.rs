use crate::domain::address::Address;
use crate::error::PaymentError;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroizing;

/// The burner wallet's signing key.
///
/// The raw bytes are zeroized on drop and never appear in `Debug` output.
/// The key leaves this type only through `to_hex` (persistence) and
/// `as_bytes` (signing inside a chain adapter).
#[derive(Clone)]
pub struct SigningKey(Zeroizing<[u8; 32]>);

impl SigningKey {
    pub fn generate() -> Self {
        let mut bytes = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(&mut *bytes);
        Self(bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, PaymentError> {
        let body = s.strip_prefix("0x").unwrap_or(s);
        let decoded = hex::decode(body)
            .map_err(|e| PaymentError::Validation(format!("bad signing key encoding: {e}")))?;
        let bytes: [u8; 32] = decoded
            .try_into()
            .map_err(|_| PaymentError::Validation("signing key must be 32 bytes".to_string()))?;
        Ok(Self(Zeroizing::new(bytes)))
    }

    /// `0x`-prefixed hex form used for secure-store persistence.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(*self.0))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Derives the wallet address for this key.
    ///
    /// Deterministic digest-based derivation: the chain adapters only require
    /// that a key maps to a stable, unique address.
    pub fn address(&self) -> Address {
        let digest = Sha256::digest(*self.0);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..32]);
        Address::from_bytes(&bytes)
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// A disposable key pair used for exactly one payment session.
#[derive(Debug, Clone)]
pub struct BurnerWallet {
    pub signing_key: SigningKey,
    pub address: Address,
}

impl BurnerWallet {
    pub fn from_key(signing_key: SigningKey) -> Self {
        let address = signing_key.address();
        Self {
            signing_key,
            address,
        }
    }
}
