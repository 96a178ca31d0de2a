//! rat_datasource - 读写分离动态数据源路由库
//!
//! 应用持有多个独立配置的连接池（主库负责写，从库/副本负责读），在执行一次逻辑操作前
//! 把数据源键写入任务本地上下文，路由数据源在获取连接时读取该键并从对应连接池借出连接。
//! 未设置键时使用默认数据源。

// 导出所有公共模块
pub mod config;
pub mod context;
pub mod error;
pub mod i18n;
pub mod pool;
pub mod registry;
pub mod router;
pub mod types;

// 重新导出常用类型和函数
pub use config::{
    DataSourceConfigBuilder, LogLevel, LoggingConfig, LoggingConfigBuilder, PoolConfigBuilder,
    RouterConfig, RouterConfigBuilder, init_logging, mysql_datasource, postgres_datasource,
    sqlite_datasource,
};
pub use context::{
    ContextScope, DataSourceGuard, clear_data_source, current_data_source, set_data_source,
    with_data_source, with_data_source_sync,
};
pub use error::{DataSourceError, DataSourceResult};
pub use pool::{
    ConnectionManager, ConnectionManagerFactory, ConnectionPool, MemoryConnection,
    MemoryConnectionManager, PoolStats, PooledConnection,
};
#[cfg(any(
    feature = "sqlite-support",
    feature = "postgres-support",
    feature = "mysql-support"
))]
pub use pool::SqlxConnectionManager;
#[cfg(feature = "sqlite-support")]
pub use pool::SqliteConnectionManager;
#[cfg(feature = "postgres-support")]
pub use pool::PostgresConnectionManager;
#[cfg(feature = "mysql-support")]
pub use pool::MySqlConnectionManager;
pub use registry::PoolRegistry;
pub use router::{ConnectionSource, RoutingDataSource};
pub use types::{ConnectionConfig, DataSourceConfig, DataSourceKey, DatabaseType, PoolConfig};

// 条件编译调试宏 - 只有在 debug 模式下才输出调试信息
#[cfg(debug_assertions)]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        rat_logger::debug!($($arg)*);
    };
}

#[cfg(not(debug_assertions))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        // 在 release 模式下不输出调试信息
    };
}

/// 初始化rat_datasource库
///
/// 注册多语言错误消息并按环境变量选择语言。
/// 日志系统由调用者自行初始化，或者显式调用 [`init_logging`]
pub fn init() {
    i18n::ErrorMessageI18n::init();
}

/// 库版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库名称
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// 获取库信息
pub fn get_info() -> String {
    format!("{} v{}", NAME, VERSION)
}
