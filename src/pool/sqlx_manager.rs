//! 基于 sqlx 的连接管理器
//!
//! 每个物理连接是一条独立的 sqlx 连接，由本库的连接池负责池化，
//! 不再叠加 sqlx 自带的连接池

use async_trait::async_trait;
use rat_logger::debug;
use sqlx::{Connection, Database, Executor};
use std::marker::PhantomData;

use super::manager::ConnectionManager;
use crate::error::DataSourceResult;
use crate::types::{DataSourceConfig, DataSourceKey, DatabaseType};

/// sqlx 连接管理器
pub struct SqlxConnectionManager<C> {
    key: DataSourceKey,
    url: String,
    _marker: PhantomData<fn() -> C>,
}

#[cfg(feature = "sqlite-support")]
pub type SqliteConnectionManager = SqlxConnectionManager<sqlx::SqliteConnection>;
#[cfg(feature = "postgres-support")]
pub type PostgresConnectionManager = SqlxConnectionManager<sqlx::PgConnection>;
#[cfg(feature = "mysql-support")]
pub type MySqlConnectionManager = SqlxConnectionManager<sqlx::MySqlConnection>;

fn driver_name(db_type: DatabaseType) -> &'static str {
    match db_type {
        DatabaseType::SQLite => "SQLite",
        DatabaseType::PostgreSQL => "PostgreSQL",
        DatabaseType::MySQL => "MySQL",
    }
}

impl<C: Connection> SqlxConnectionManager<C> {
    /// 根据数据源配置创建管理器，配置的数据库类型必须与驱动一致
    pub fn new(config: &DataSourceConfig) -> DataSourceResult<Self> {
        let expected = <C::Database as Database>::NAME;
        if driver_name(config.db_type) != expected || config.connection.db_type() != config.db_type {
            return Err(crate::ds_error!(
                config,
                crate::i18n::tf(
                    "error.driver_mismatch",
                    &[("key", &config.key.to_string()), ("driver", expected)],
                )
            ));
        }

        debug!(
            "创建sqlx连接管理器: 数据源={}, 目标={}",
            config.key,
            config.connection.describe()
        );

        Ok(Self {
            key: config.key,
            url: config.connection.to_url(),
            _marker: PhantomData,
        })
    }
}

impl<C> std::fmt::Debug for SqlxConnectionManager<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlxConnectionManager")
            .field("key", &self.key)
            .field("url", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl<C> ConnectionManager for SqlxConnectionManager<C>
where
    C: Connection + 'static,
    for<'c> &'c mut C: Executor<'c, Database = C::Database>,
{
    type Connection = C;

    async fn connect(&self) -> DataSourceResult<C> {
        C::connect(&self.url).await.map_err(|e| {
            crate::ds_error!(connection, format!("数据源 {} 建立连接失败: {}", self.key, e))
        })
    }

    async fn validate(&self, conn: &mut C, query: &str) -> DataSourceResult<()> {
        if query.trim().is_empty() {
            return conn
                .ping()
                .await
                .map_err(|e| crate::ds_error!(validation, self.key, e));
        }

        sqlx::raw_sql(query)
            .execute(&mut *conn)
            .await
            .map(|_| ())
            .map_err(|e| crate::ds_error!(validation, self.key, e))
    }

    async fn close(&self, conn: C) -> DataSourceResult<()> {
        conn.close().await.map_err(|e| {
            crate::ds_error!(connection, format!("数据源 {} 关闭连接失败: {}", self.key, e))
        })
    }
}
