//! 连接池注册表
//!
//! 启动时根据路由配置一次性建立所有连接池，之后只读。
//! 按数据源键解析连接池，未指定键时返回默认连接池。

use chrono::Utc;
use futures::future::join_all;
use rat_logger::{debug, error, info, warn};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::RouterConfig;
use crate::error::{DataSourceError, DataSourceResult};
use crate::pool::{ConnectionManager, ConnectionManagerFactory, ConnectionPool};
use crate::types::DataSourceKey;

/// 连接池注册表
pub struct PoolRegistry<M: ConnectionManager> {
    default_key: DataSourceKey,
    pools: HashMap<DataSourceKey, Arc<ConnectionPool<M>>>,
    shut_down: AtomicBool,
}

impl<M: ConnectionManager> std::fmt::Debug for PoolRegistry<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("default_key", &self.default_key)
            .field("keys", &self.keys())
            .field("shut_down", &self.shut_down.load(Ordering::SeqCst))
            .finish()
    }
}

impl<M: ConnectionManager> PoolRegistry<M> {
    /// 用已经打开的连接池构建注册表
    ///
    /// 默认数据源必须在其中
    pub fn new(
        default_key: DataSourceKey,
        pools: HashMap<DataSourceKey, ConnectionPool<M>>,
    ) -> DataSourceResult<Self> {
        if !pools.contains_key(&default_key) {
            return Err(crate::ds_error!(
                config,
                format!("默认数据源 {} 未配置", default_key)
            ));
        }
        for (key, pool) in &pools {
            if pool.key() != *key {
                return Err(crate::ds_error!(
                    config,
                    format!("连接池 {} 注册在错误的键 {} 下", pool.key(), key)
                ));
            }
        }

        Ok(Self {
            default_key,
            pools: pools
                .into_iter()
                .map(|(key, pool)| (key, Arc::new(pool)))
                .collect(),
            shut_down: AtomicBool::new(false),
        })
    }

    /// 按路由配置建立所有连接池
    ///
    /// 每个连接池都会立即建立初始连接，任何一个失败时关闭已建立的连接池并返回该错误
    pub async fn build<F>(config: &RouterConfig, factory: &F) -> DataSourceResult<Self>
    where
        F: ConnectionManagerFactory<M>,
    {
        config.validate()?;

        let mut pools: HashMap<DataSourceKey, ConnectionPool<M>> = HashMap::new();
        for datasource in &config.datasources {
            let opened = match factory.create(datasource) {
                Ok(manager) => {
                    ConnectionPool::open(datasource.key, datasource.pool.clone(), manager).await
                }
                Err(e) => Err(e),
            };

            match opened {
                Ok(pool) => {
                    debug!("数据源 {} 连接池已建立", datasource.key);
                    pools.insert(datasource.key, pool);
                }
                Err(e) => {
                    error!("数据源 {} 连接池建立失败: {}", datasource.key, e);
                    for (key, pool) in &pools {
                        if let Err(close_err) = pool.close().await {
                            warn!("回滚时关闭数据源 {} 失败: {}", key, close_err);
                        }
                    }
                    return Err(e);
                }
            }
        }

        let registry = Self::new(config.default_datasource, pools)?;
        info!(
            "连接池注册表已建立: 默认数据源={}, 数据源={:?}",
            registry.default_key,
            registry.keys()
        );
        Ok(registry)
    }

    /// 解析连接池
    ///
    /// - 指定且已配置的键返回对应连接池，多次调用返回同一个 `Arc`
    /// - 指定但未配置的键返回 [`DataSourceError::UnknownDataSource`]
    /// - 未指定键时返回默认连接池
    pub fn resolve(&self, key: Option<DataSourceKey>) -> DataSourceResult<Arc<ConnectionPool<M>>> {
        let key = key.unwrap_or(self.default_key);
        self.pools
            .get(&key)
            .cloned()
            .ok_or_else(|| crate::ds_error!(unknown, key))
    }

    /// 默认数据源键
    pub fn default_key(&self) -> DataSourceKey {
        self.default_key
    }

    /// 默认连接池
    pub fn default_pool(&self) -> Arc<ConnectionPool<M>> {
        // 构造时已保证默认数据源存在
        match self.pools.get(&self.default_key) {
            Some(pool) => pool.clone(),
            None => unreachable!("默认数据源 {} 不在注册表中", self.default_key),
        }
    }

    /// 所有已注册的数据源键（有序）
    pub fn keys(&self) -> Vec<DataSourceKey> {
        let mut keys: Vec<DataSourceKey> = self.pools.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn contains(&self, key: DataSourceKey) -> bool {
        self.pools.contains_key(&key)
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// 关闭所有连接池
    ///
    /// 每个连接池只关闭一次，单个失败不影响其余连接池，失败信息汇总为
    /// [`DataSourceError::ShutdownError`]。重复调用直接返回成功。
    pub async fn shutdown(&self) -> DataSourceResult<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        info!("开始关闭连接池注册表，连接池数量: {}", self.pools.len());

        let results = join_all(
            self.pools
                .iter()
                .map(|(key, pool)| async move { (*key, pool.close().await) }),
        )
        .await;

        let mut failures: Vec<(DataSourceKey, String)> = results
            .into_iter()
            .filter_map(|(key, result)| result.err().map(|e| (key, e.to_string())))
            .collect();
        failures.sort_by_key(|(key, _)| *key);

        if failures.is_empty() {
            info!("连接池注册表已关闭");
            Ok(())
        } else {
            error!("{} 个连接池关闭失败", failures.len());
            Err(DataSourceError::ShutdownError { failures })
        }
    }

    /// 检查连接池健康状态
    ///
    /// 能够借出连接即视为健康，借出的连接立即归还
    pub async fn health_check(&self) -> HashMap<DataSourceKey, bool> {
        let results = join_all(self.pools.iter().map(|(key, pool)| async move {
            let healthy = match pool.checkout().await {
                Ok(conn) => {
                    conn.release().await;
                    true
                }
                Err(e) => {
                    warn!("数据源 {} 健康检查失败: {}", key, e);
                    false
                }
            };
            (*key, healthy)
        }))
        .await;

        results.into_iter().collect()
    }

    /// 获取所有连接池的详细状态信息
    ///
    /// 返回包含每个连接池状态的详细信息，包括：
    /// - 是否为默认数据源
    /// - 健康状态
    /// - 连接池配置
    /// - 运行统计
    /// - 采集时间
    pub async fn status(&self) -> HashMap<DataSourceKey, serde_json::Value> {
        let health = self.health_check().await;
        let checked_at = Utc::now().to_rfc3339();
        let mut pools_status = HashMap::new();

        for (key, pool) in &self.pools {
            let config = pool.config();
            let pool_status = json!({
                "key": key.to_string(),
                "is_default": *key == self.default_key,
                "is_healthy": health.get(key).copied().unwrap_or(false),
                "pool_config": {
                    "initial_size": config.initial_size,
                    "min_idle": config.min_idle,
                    "max_active": config.max_active,
                    "max_wait_ms": config.max_wait_ms,
                    "connect_timeout_ms": config.connect_timeout_ms,
                    "socket_timeout_ms": config.socket_timeout_ms,
                    "time_between_eviction_runs_ms": config.time_between_eviction_runs_ms,
                    "test_while_idle": config.test_while_idle,
                    "test_on_borrow": config.test_on_borrow,
                    "test_on_return": config.test_on_return
                },
                "stats": pool.stats(),
                "checked_at": checked_at
            });
            pools_status.insert(*key, pool_status);
        }

        debug!("连接池状态收集完成，共 {} 个连接池", pools_status.len());
        pools_status
    }
}
