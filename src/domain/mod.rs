pub mod error;
pub mod id;
pub mod job;
pub mod money;
pub mod notify;
pub mod payment;
pub mod provider;
pub mod refund;
pub mod store;
