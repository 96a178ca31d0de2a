//! 连接池模块
//!
//! 每个数据源对应一个独立的有界连接池。驱动相关的建连、校验和关闭由
//! [`ConnectionManager`] 完成，连接池只负责名额、等待、校验时机和空闲回收

pub mod connection;
pub mod manager;
pub mod memory;
pub mod pool;
pub mod stats;
mod eviction;
#[cfg(any(
    feature = "sqlite-support",
    feature = "postgres-support",
    feature = "mysql-support"
))]
pub mod sqlx_manager;

// 重新导出主要的公共类型和结构体
pub use connection::PooledConnection;
pub use manager::{ConnectionManager, ConnectionManagerFactory};
pub use memory::{MemoryConnection, MemoryConnectionManager};
pub use pool::ConnectionPool;
pub use stats::PoolStats;
#[cfg(any(
    feature = "sqlite-support",
    feature = "postgres-support",
    feature = "mysql-support"
))]
pub use sqlx_manager::SqlxConnectionManager;
#[cfg(feature = "sqlite-support")]
pub use sqlx_manager::SqliteConnectionManager;
#[cfg(feature = "postgres-support")]
pub use sqlx_manager::PostgresConnectionManager;
#[cfg(feature = "mysql-support")]
pub use sqlx_manager::MySqlConnectionManager;
