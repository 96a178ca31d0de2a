//! # 数据源配置构建器模块
//!
//! 提供数据源配置的构建器实现，支持链式调用和严格验证

use crate::error::DataSourceResult;
use crate::types::{ConnectionConfig, DataSourceConfig, DataSourceKey, DatabaseType, PoolConfig};
use rat_logger::info;

/// 数据源配置构建器
///
/// 严格要求所有配置项必须显式设置，严禁使用默认值
#[derive(Debug)]
pub struct DataSourceConfigBuilder {
    key: Option<DataSourceKey>,
    db_type: Option<DatabaseType>,
    connection: Option<ConnectionConfig>,
    pool: Option<PoolConfig>,
}

impl DataSourceConfig {
    /// 创建数据源配置构建器
    pub fn builder() -> DataSourceConfigBuilder {
        DataSourceConfigBuilder::new()
    }
}

impl DataSourceConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            key: None,
            db_type: None,
            connection: None,
            pool: None,
        }
    }

    /// 设置数据源键
    ///
    /// # 参数
    ///
    /// * `key` - 数据源键
    pub fn key(mut self, key: DataSourceKey) -> Self {
        self.key = Some(key);
        self
    }

    /// 设置数据库类型
    ///
    /// # 参数
    ///
    /// * `db_type` - 数据库类型
    pub fn db_type(mut self, db_type: DatabaseType) -> Self {
        self.db_type = Some(db_type);
        self
    }

    /// 设置连接配置
    ///
    /// # 参数
    ///
    /// * `connection` - 连接配置
    pub fn connection(mut self, connection: ConnectionConfig) -> Self {
        self.connection = Some(connection);
        self
    }

    /// 设置连接池配置
    ///
    /// # 参数
    ///
    /// * `pool` - 连接池配置
    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.pool = Some(pool);
        self
    }

    /// 构建数据源配置
    ///
    /// # 错误
    ///
    /// 如果任何必需的配置项未设置，或数据库类型与连接配置不一致，将返回错误
    pub fn build(self) -> DataSourceResult<DataSourceConfig> {
        let key = self
            .key
            .ok_or_else(|| crate::ds_error!(config, "数据源键必须设置"))?;

        let db_type = self
            .db_type
            .ok_or_else(|| crate::ds_error!(config, "数据库类型必须设置"))?;

        let connection = self
            .connection
            .ok_or_else(|| crate::ds_error!(config, "连接配置必须设置"))?;

        let pool = self
            .pool
            .ok_or_else(|| crate::ds_error!(config, "连接池配置必须设置"))?;

        if connection.db_type() != db_type {
            return Err(crate::ds_error!(
                config,
                format!("数据库类型 {:?} 与连接配置不匹配", db_type)
            ));
        }
        pool.validate()?;

        info!(
            "创建数据源配置: 键={}, 类型={:?}, 目标={}",
            key,
            db_type,
            connection.describe()
        );

        Ok(DataSourceConfig {
            key,
            db_type,
            connection,
            pool,
        })
    }
}

impl Default for DataSourceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_connection() -> ConnectionConfig {
        ConnectionConfig::SQLite {
            path: ":memory:".to_string(),
            create_if_missing: false,
        }
    }

    #[test]
    fn test_build_requires_every_field() {
        let result = DataSourceConfig::builder()
            .key(DataSourceKey::Slave)
            .db_type(DatabaseType::SQLite)
            .connection(memory_connection())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_rejects_type_mismatch() {
        let result = DataSourceConfig::builder()
            .key(DataSourceKey::Slave)
            .db_type(DatabaseType::PostgreSQL)
            .connection(memory_connection())
            .pool(PoolConfig::default())
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_success() {
        let config = DataSourceConfig::builder()
            .key(DataSourceKey::Replica(1))
            .db_type(DatabaseType::SQLite)
            .connection(memory_connection())
            .pool(PoolConfig::default())
            .build()
            .unwrap();
        assert_eq!(config.key, DataSourceKey::Replica(1));
        assert_eq!(config.connection.to_url(), "sqlite::memory:");
    }
}
