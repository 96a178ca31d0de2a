//! # 配置构建器模块
//!
//! 提供所有配置类型的构建器实现，支持链式调用和严格验证

pub mod datasource_builder;
pub mod logging_builder;
pub mod pool_builder;
pub mod router_builder;

pub use datasource_builder::DataSourceConfigBuilder;
pub use logging_builder::LoggingConfigBuilder;
pub use pool_builder::PoolConfigBuilder;
pub use router_builder::RouterConfigBuilder;
