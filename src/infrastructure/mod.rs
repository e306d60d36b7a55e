pub mod contract;
pub mod http_price;
pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
