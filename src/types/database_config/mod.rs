use serde::{Deserialize, Serialize};

use crate::types::datasource_key::DataSourceKey;
use crate::types::pool_config::PoolConfig;

/// 支持的数据库类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatabaseType {
    /// SQLite 数据库
    SQLite,
    /// PostgreSQL 数据库
    PostgreSQL,
    /// MySQL 数据库
    MySQL,
}

impl DatabaseType {
    /// 获取数据库类型的字符串表示
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::SQLite => "sqlite",
            DatabaseType::PostgreSQL => "postgresql",
            DatabaseType::MySQL => "mysql",
        }
    }

    /// 从字符串解析数据库类型
    pub fn from_str(s: &str) -> Result<Self, crate::error::DataSourceError> {
        match s.to_lowercase().as_str() {
            "sqlite" => Ok(DatabaseType::SQLite),
            "postgresql" | "postgres" | "pg" => Ok(DatabaseType::PostgreSQL),
            "mysql" => Ok(DatabaseType::MySQL),
            _ => Err(crate::ds_error!(config, format!("不支持的数据库类型: {}", s))),
        }
    }
}

/// 连接配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionConfig {
    /// SQLite 文件路径
    SQLite {
        /// 数据库文件路径，`:memory:` 表示内存数据库
        path: String,
        /// 是否创建数据库文件（如果不存在）
        create_if_missing: bool,
    },
    /// PostgreSQL 连接配置
    PostgreSQL {
        host: String,
        port: u16,
        database: String,
        username: String,
        password: String,
        /// SSL 模式 (disable, allow, prefer, require, verify-ca, verify-full)
        ssl_mode: Option<String>,
    },
    /// MySQL 连接配置
    MySQL {
        host: String,
        port: u16,
        database: String,
        username: String,
        password: String,
    },
}

impl ConnectionConfig {
    /// 对应的数据库类型
    pub fn db_type(&self) -> DatabaseType {
        match self {
            ConnectionConfig::SQLite { .. } => DatabaseType::SQLite,
            ConnectionConfig::PostgreSQL { .. } => DatabaseType::PostgreSQL,
            ConnectionConfig::MySQL { .. } => DatabaseType::MySQL,
        }
    }

    /// 生成连接串
    pub fn to_url(&self) -> String {
        match self {
            ConnectionConfig::SQLite { path, .. } if path == ":memory:" => {
                "sqlite::memory:".to_string()
            }
            ConnectionConfig::SQLite {
                path,
                create_if_missing,
            } => {
                if *create_if_missing {
                    format!("sqlite://{}?mode=rwc", path)
                } else {
                    format!("sqlite://{}", path)
                }
            }
            ConnectionConfig::PostgreSQL {
                host,
                port,
                database,
                username,
                password,
                ssl_mode,
            } => {
                // 对用户名和密码进行 URL 编码以处理特殊字符
                let mut url = format!(
                    "postgresql://{}:{}@{}:{}/{}",
                    urlencoding::encode(username),
                    urlencoding::encode(password),
                    host,
                    port,
                    database
                );
                if let Some(mode) = ssl_mode {
                    url.push_str("?sslmode=");
                    url.push_str(mode);
                }
                url
            }
            ConnectionConfig::MySQL {
                host,
                port,
                database,
                username,
                password,
            } => {
                format!(
                    "mysql://{}:{}@{}:{}/{}",
                    urlencoding::encode(username),
                    urlencoding::encode(password),
                    host,
                    port,
                    database
                )
            }
        }
    }

    /// 用于日志的连接描述，不包含密码
    pub fn describe(&self) -> String {
        match self {
            ConnectionConfig::SQLite { path, .. } => format!("sqlite:{}", path),
            ConnectionConfig::PostgreSQL {
                host,
                port,
                database,
                ..
            } => format!("postgresql://{}:{}/{}", host, port, database),
            ConnectionConfig::MySQL {
                host,
                port,
                database,
                ..
            } => format!("mysql://{}:{}/{}", host, port, database),
        }
    }
}

/// 单个数据源配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSourceConfig {
    /// 数据源键
    pub key: DataSourceKey,
    /// 数据库类型
    pub db_type: DatabaseType,
    /// 连接配置
    pub connection: ConnectionConfig,
    /// 连接池配置
    pub pool: PoolConfig,
}
