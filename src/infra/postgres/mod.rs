pub mod job_repo;
pub mod payment_repo;

pub use {job_repo::PgJobStore, payment_repo::PgStore};
