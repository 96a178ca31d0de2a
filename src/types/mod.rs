//! 数据源类型定义和配置
//!
//! 定义数据源键、连接配置和连接池配置

pub mod database_config;
pub mod datasource_key;
pub mod pool_config;

// 重新导出所有公共类型
pub use database_config::{ConnectionConfig, DataSourceConfig, DatabaseType};
pub use datasource_key::DataSourceKey;
pub use pool_config::PoolConfig;
