pub mod address;
pub mod amount;
pub mod payment;
pub mod ports;
pub mod quote;
pub mod wallet;
