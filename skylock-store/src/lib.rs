pub mod app_config;
pub mod database;
pub mod events;
pub mod memory;
pub mod pg_ledger;
pub mod redis_lock;

pub use database::DbClient;
pub use events::EventProducer;
pub use memory::{MemoryLedger, MemoryLockStore};
pub use pg_ledger::PostgresLedger;
pub use redis_lock::RedisLockStore;
