pub mod connection_pool;
pub mod offline_store;
pub mod rows;

pub use connection_pool::ConnectionPool;
pub use offline_store::SqliteOfflineStore;
