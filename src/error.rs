//! 错误类型模块
//!
//! 统一的数据源错误定义。路由层只负责"未知数据源"这一类配置错误，
//! 连接池产生的错误原样向上传递，调用方据此区分瞬时错误与致命错误。

use thiserror::Error;

use crate::types::DataSourceKey;

/// 数据源操作结果
pub type DataSourceResult<T> = Result<T, DataSourceError>;

/// 数据源错误
#[derive(Error, Debug)]
pub enum DataSourceError {
    /// 配置错误（参数非法、缺少默认数据源等）
    #[error("{}", crate::i18n::tf("error.config", &[("message", .message.as_str())]))]
    ConfigError { message: String },

    /// 请求了未配置的数据源
    #[error("{}", crate::i18n::tf("error.unknown_datasource", &[("key", &.key.to_string())]))]
    UnknownDataSource { key: DataSourceKey },

    /// 在最大等待时间内没有可用连接
    #[error("{}", crate::i18n::tf("error.pool_exhausted", &[("key", &.key.to_string()), ("waited_ms", &.waited_ms.to_string())]))]
    PoolExhausted { key: DataSourceKey, waited_ms: u64 },

    /// 底层数据库连接失败
    #[error("{}", crate::i18n::tf("error.connection", &[("message", .message.as_str())]))]
    ConnectionError { message: String },

    /// 校验查询失败
    #[error("{}", crate::i18n::tf("error.validation", &[("key", &.key.to_string()), ("message", .message.as_str())]))]
    ValidationError { key: DataSourceKey, message: String },

    /// 连接池已关闭
    #[error("{}", crate::i18n::tf("error.pool_closed", &[("key", &.key.to_string())]))]
    PoolClosed { key: DataSourceKey },

    /// 关闭连接池时出现的错误汇总
    #[error("{}", crate::i18n::tf("error.shutdown", &[("count", &.failures.len().to_string()), ("details", &format_failures(.failures))]))]
    ShutdownError { failures: Vec<(DataSourceKey, String)> },

    /// IO 错误
    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 序列化错误
    #[error("{}", crate::i18n::tf("error.serialization", &[("message", .message.as_str())]))]
    SerializationError { message: String },
}

fn format_failures(failures: &[(DataSourceKey, String)]) -> String {
    failures
        .iter()
        .map(|(key, message)| format!("{}: {}", key, message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl DataSourceError {
    /// 是否为瞬时错误（调用方可以自行退避重试）
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataSourceError::PoolExhausted { .. }
                | DataSourceError::ConnectionError { .. }
                | DataSourceError::ValidationError { .. }
        )
    }

    /// 是否为致命错误（配置问题，重试无意义）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DataSourceError::ConfigError { .. }
                | DataSourceError::UnknownDataSource { .. }
                | DataSourceError::PoolClosed { .. }
        )
    }
}

impl From<serde_json::Error> for DataSourceError {
    fn from(err: serde_json::Error) -> Self {
        DataSourceError::SerializationError {
            message: err.to_string(),
        }
    }
}

/// 快速构建常用错误
#[macro_export]
macro_rules! ds_error {
    (config, $msg:expr) => {
        $crate::error::DataSourceError::ConfigError {
            message: ($msg).to_string(),
        }
    };
    (connection, $msg:expr) => {
        $crate::error::DataSourceError::ConnectionError {
            message: ($msg).to_string(),
        }
    };
    (unknown, $key:expr) => {
        $crate::error::DataSourceError::UnknownDataSource { key: $key }
    };
    (closed, $key:expr) => {
        $crate::error::DataSourceError::PoolClosed { key: $key }
    };
    (exhausted, $key:expr, $waited_ms:expr) => {
        $crate::error::DataSourceError::PoolExhausted {
            key: $key,
            waited_ms: $waited_ms,
        }
    };
    (validation, $key:expr, $msg:expr) => {
        $crate::error::DataSourceError::ValidationError {
            key: $key,
            message: ($msg).to_string(),
        }
    };
}
