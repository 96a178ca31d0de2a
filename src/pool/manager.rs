//! 连接管理器接口
//!
//! 连接池本身不关心驱动细节，建立、校验和关闭物理连接都委托给 [`ConnectionManager`]

use async_trait::async_trait;

use crate::error::DataSourceResult;
use crate::types::DataSourceConfig;

/// 物理连接管理器
#[async_trait]
pub trait ConnectionManager: Send + Sync + 'static {
    /// 驱动的原生连接类型
    type Connection: Send + 'static;

    /// 建立一个新连接
    async fn connect(&self) -> DataSourceResult<Self::Connection>;

    /// 校验连接是否可用
    ///
    /// `query` 为配置的校验语句，为空时实现方可以使用驱动自带的 ping
    async fn validate(&self, conn: &mut Self::Connection, query: &str) -> DataSourceResult<()>;

    /// 关闭连接
    async fn close(&self, conn: Self::Connection) -> DataSourceResult<()> {
        drop(conn);
        Ok(())
    }
}

/// 根据数据源配置创建连接管理器
///
/// 启动阶段由注册表对每个数据源调用一次
pub trait ConnectionManagerFactory<M: ConnectionManager> {
    fn create(&self, config: &DataSourceConfig) -> DataSourceResult<M>;
}

impl<M, F> ConnectionManagerFactory<M> for F
where
    M: ConnectionManager,
    F: Fn(&DataSourceConfig) -> DataSourceResult<M>,
{
    fn create(&self, config: &DataSourceConfig) -> DataSourceResult<M> {
        self(config)
    }
}
