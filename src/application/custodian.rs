use crate::domain::address::Address;
use crate::domain::ports::SecretStoreBox;
use crate::domain::wallet::{BurnerWallet, SigningKey};
use crate::error::{PaymentError, Result};
use tokio::sync::Mutex;

/// Secret-store key holding the burner signing key.
const BURNER_KEY_SECRET: &str = "burner.signing-key";
/// Secret-store key holding the user's main wallet address.
const MAIN_WALLET_SECRET: &str = "main.wallet-address";

/// Creates, persists, loads, and destroys the burner wallet's key material.
///
/// The custodian is the sole owner of the signing key: at most one live
/// burner wallet exists per device, and the key is erased exactly once, at
/// pipeline completion. It also binds the user's main wallet address in the
/// same secure store.
pub struct KeyCustodian {
    store: SecretStoreBox,
    cached: Mutex<Option<BurnerWallet>>,
}

impl KeyCustodian {
    pub fn new(store: SecretStoreBox) -> Self {
        Self {
            store,
            cached: Mutex::new(None),
        }
    }

    /// Loads the persisted burner wallet, or generates and persists a new
    /// one. Idempotent within a session: repeated calls return the same
    /// wallet until it is destroyed.
    pub async fn get_or_create(&self) -> Result<BurnerWallet> {
        let mut cached = self.cached.lock().await;
        if let Some(wallet) = cached.as_ref() {
            return Ok(wallet.clone());
        }

        let wallet = match self.store.get(BURNER_KEY_SECRET).await? {
            Some(hex) => {
                let wallet = BurnerWallet::from_key(SigningKey::from_hex(&hex)?);
                tracing::info!(address = %wallet.address, "loaded persisted burner wallet");
                wallet
            }
            None => {
                let wallet = BurnerWallet::from_key(SigningKey::generate());
                self.store
                    .set(BURNER_KEY_SECRET, &wallet.signing_key.to_hex())
                    .await?;
                tracing::info!(address = %wallet.address, "created new burner wallet");
                wallet
            }
        };

        *cached = Some(wallet.clone());
        Ok(wallet)
    }

    /// Irreversibly erases the burner key from storage and memory.
    ///
    /// Callers must not invoke this while a transfer is still pending: if
    /// the transfer later fails and is retried, the funds would be
    /// unrecoverable. Destroying twice, or with no live wallet, is an error.
    pub async fn destroy(&self) -> Result<()> {
        let mut cached = self.cached.lock().await;
        let live = cached.is_some() || self.store.get(BURNER_KEY_SECRET).await?.is_some();
        if !live {
            return Err(PaymentError::Burn("no live burner wallet".to_string()));
        }

        self.store
            .delete(BURNER_KEY_SECRET)
            .await
            .map_err(|e| PaymentError::Burn(e.to_string()))?;
        *cached = None;
        tracing::info!("burner wallet destroyed");
        Ok(())
    }

    /// The bound main wallet address, if any. Absence means the user has
    /// not connected a main wallet yet.
    pub async fn main_wallet(&self) -> Result<Option<Address>> {
        match self.store.get(MAIN_WALLET_SECRET).await? {
            Some(s) => Ok(Some(Address::parse(&s)?)),
            None => Ok(None),
        }
    }

    pub async fn connect_main_wallet(&self, address: &Address) -> Result<()> {
        self.store.set(MAIN_WALLET_SECRET, address.as_str()).await?;
        tracing::info!(address = %address, "main wallet connected");
        Ok(())
    }

    pub async fn disconnect_main_wallet(&self) -> Result<()> {
        self.store.delete(MAIN_WALLET_SECRET).await?;
        tracing::info!("main wallet disconnected");
        Ok(())
    }
}
