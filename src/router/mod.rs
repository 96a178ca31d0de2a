//! 路由数据源
//!
//! 每次获取连接时读取当前上下文中的数据源键，从注册表解析出连接池并借出连接。
//! 未设置键时使用默认数据源。路由层本身只产生"未知数据源"这一种错误，
//! 连接池的错误原样向上传递。

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

use crate::config::RouterConfig;
use crate::context::{current_data_source, with_data_source};
use crate::error::DataSourceResult;
use crate::pool::{ConnectionManager, ConnectionManagerFactory, ConnectionPool, PooledConnection};
use crate::registry::PoolRegistry;
use crate::types::DataSourceKey;

/// 连接来源
///
/// 路由数据源和单个连接池都实现了该接口，调用方可以在二者之间透明切换
#[async_trait]
pub trait ConnectionSource: Send + Sync {
    type Manager: ConnectionManager;

    /// 获取一个连接
    async fn get_connection(&self) -> DataSourceResult<PooledConnection<Self::Manager>>;
}

#[async_trait]
impl<M: ConnectionManager> ConnectionSource for ConnectionPool<M> {
    type Manager = M;

    async fn get_connection(&self) -> DataSourceResult<PooledConnection<M>> {
        self.checkout().await
    }
}

/// 读写分离路由数据源
///
/// 克隆开销很小，所有克隆共享同一个注册表
pub struct RoutingDataSource<M: ConnectionManager> {
    registry: Arc<PoolRegistry<M>>,
}

impl<M: ConnectionManager> Clone for RoutingDataSource<M> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
        }
    }
}

impl<M: ConnectionManager> std::fmt::Debug for RoutingDataSource<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingDataSource")
            .field("registry", &self.registry)
            .finish()
    }
}

impl<M: ConnectionManager> RoutingDataSource<M> {
    pub fn new(registry: PoolRegistry<M>) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    pub fn from_shared(registry: Arc<PoolRegistry<M>>) -> Self {
        Self { registry }
    }

    /// 按路由配置建立所有连接池并创建路由数据源
    pub async fn build<F>(config: &RouterConfig, factory: &F) -> DataSourceResult<Self>
    where
        F: ConnectionManagerFactory<M>,
    {
        Ok(Self::new(PoolRegistry::build(config, factory).await?))
    }

    /// 当前上下文中的数据源键，`None` 表示默认数据源
    pub fn determine_current_lookup_key(&self) -> Option<DataSourceKey> {
        current_data_source()
    }

    /// 获取连接
    ///
    /// 数据源键在第一次轮询时读取，之后的等待不会受上下文变化影响
    pub async fn get_connection(&self) -> DataSourceResult<PooledConnection<M>> {
        let key = self.determine_current_lookup_key();
        let pool = self.registry.resolve(key)?;
        crate::debug_log!(
            "路由连接: 请求键={:?}, 实际数据源={}",
            key,
            pool.key()
        );
        pool.checkout().await
    }

    /// 从指定数据源获取连接，不读取上下文
    pub async fn get_connection_from(
        &self,
        key: DataSourceKey,
    ) -> DataSourceResult<PooledConnection<M>> {
        self.registry.resolve(Some(key))?.checkout().await
    }

    /// 在从库上执行只读操作
    pub async fn read_only<F>(&self, future: F) -> F::Output
    where
        F: Future,
    {
        with_data_source(DataSourceKey::Slave, future).await
    }

    /// 在主库上执行读写操作
    pub async fn read_write<F>(&self, future: F) -> F::Output
    where
        F: Future,
    {
        with_data_source(DataSourceKey::Master, future).await
    }

    pub fn registry(&self) -> &Arc<PoolRegistry<M>> {
        &self.registry
    }

    /// 关闭所有连接池
    pub async fn shutdown(&self) -> DataSourceResult<()> {
        self.registry.shutdown().await
    }
}

#[async_trait]
impl<M: ConnectionManager> ConnectionSource for RoutingDataSource<M> {
    type Manager = M;

    async fn get_connection(&self) -> DataSourceResult<PooledConnection<M>> {
        RoutingDataSource::get_connection(self).await
    }
}
