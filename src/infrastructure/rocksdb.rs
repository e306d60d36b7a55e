use crate::domain::ports::SecretStore;
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use std::path::Path;
use std::sync::Arc;

/// Column family holding the string-keyed secrets.
pub const CF_SECRETS: &str = "secrets";

/// A persistent secret store backed by RocksDB.
///
/// Stands in for a device keystore on platforms that have none. This struct
/// is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDbSecretStore {
    db: Arc<DB>,
}

impl RocksDbSecretStore {
    /// Opens or creates a RocksDB instance at the specified path, ensuring
    /// the secrets column family exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_secrets = ColumnFamilyDescriptor::new(CF_SECRETS, Options::default());
        let db = DB::open_cf_descriptors(&opts, path, vec![cf_secrets])
            .map_err(|e| PaymentError::Storage(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }

    fn cf(&self) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(CF_SECRETS)
            .ok_or_else(|| PaymentError::Storage("secrets column family not found".to_string()))
    }
}

#[async_trait]
impl SecretStore for RocksDbSecretStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let cf = self.cf()?;
        let value = self
            .db
            .get_cf(cf, key.as_bytes())
            .map_err(|e| PaymentError::Storage(e.to_string()))?;
        match value {
            Some(bytes) => {
                let s = String::from_utf8(bytes)
                    .map_err(|e| PaymentError::Storage(format!("corrupt secret: {e}")))?;
                Ok(Some(s))
            }
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let cf = self.cf()?;
        self.db
            .put_cf(cf, key.as_bytes(), value.as_bytes())
            .map_err(|e| PaymentError::Storage(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let cf = self.cf()?;
        self.db
            .delete_cf(cf, key.as_bytes())
            .map_err(|e| PaymentError::Storage(e.to_string()))
    }
}
