//! 空闲连接回收
//!
//! 每隔 time_between_eviction_runs_ms 执行一次：
//! - 空闲超过 max_evictable_idle_time_ms 的连接一律关闭
//! - 空闲超过 min_evictable_idle_time_ms 的连接在保留 min_idle 个的前提下关闭
//! - 开启 test_while_idle 时校验留下的连接
//! - 最后补足 min_idle

use rat_logger::{info, warn};

use super::connection::IdleConnection;
use super::manager::ConnectionManager;
use super::pool::PoolInner;
use super::stats::PoolCounters;

impl<M: ConnectionManager> PoolInner<M> {
    pub(super) async fn run_eviction(&self) {
        if self.is_closed() {
            return;
        }

        let min_idle = self.config.min_idle as usize;
        let min_evictable = self.config.min_evictable_idle();
        let max_evictable = self.config.max_evictable_idle();

        // 只处理本轮开始时已在队列中的连接，期间归还的连接留到下一轮
        let snapshot = self.idle.len();
        let mut keep: Vec<IdleConnection<M::Connection>> = Vec::with_capacity(snapshot);
        let mut evicted = 0u32;

        for examined in 0..snapshot {
            let Some(idle) = self.idle.pop() else {
                break;
            };
            let idle_for = idle.idle_for();
            let unexamined = snapshot - examined - 1;
            let others = keep.len() + unexamined;

            let evict = idle_for >= max_evictable || (idle_for >= min_evictable && others >= min_idle);
            if evict {
                evicted += 1;
                PoolCounters::incr(&self.counters.evicted);
                let _ = self.discard(idle.conn).await;
                continue;
            }

            if self.config.test_while_idle {
                let IdleConnection {
                    mut conn,
                    meta,
                    idle_since,
                } = idle;
                if let Err(e) = self.validate(&mut conn).await {
                    warn!("数据源 {} 空闲连接 {} 校验失败: {}", self.key, meta.id, e);
                    evicted += 1;
                    PoolCounters::incr(&self.counters.evicted);
                    let _ = self.discard(conn).await;
                    continue;
                }
                keep.push(IdleConnection {
                    conn,
                    meta,
                    idle_since,
                });
            } else {
                keep.push(idle);
            }
        }

        for idle in keep {
            self.idle.push(idle);
        }

        if evicted > 0 {
            info!(
                "数据源 {} 回收空闲连接 {} 个，剩余空闲 {} 个",
                self.key,
                evicted,
                self.idle.len()
            );
        }

        self.fill_min_idle().await;

        if self.is_closed() {
            // 回收期间连接池被关闭，放回的连接需要再次清理
            let _ = self.drain_idle().await;
        }
    }

    /// 补足最小空闲连接，总连接数不超过 max_active
    async fn fill_min_idle(&self) {
        let min_idle = self.config.min_idle as usize;
        let max_active = self.config.max_active as usize;

        while !self.is_closed() {
            let idle = self.idle.len();
            let total = idle + self.active_count() as usize;
            if idle >= min_idle || total >= max_active {
                break;
            }
            match self.connect().await {
                Ok((conn, meta)) => self.idle.push(IdleConnection::new(conn, meta)),
                Err(e) => {
                    warn!("数据源 {} 补充空闲连接失败: {}", self.key, e);
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::connection::{ConnectionMeta, IdleConnection};
    use crate::pool::{ConnectionManager, ConnectionPool, MemoryConnectionManager};
    use crate::types::{DataSourceKey, PoolConfig};
    use std::time::{Duration, Instant};

    fn eviction_config() -> PoolConfig {
        PoolConfig {
            initial_size: 4,
            min_idle: 1,
            max_active: 4,
            max_wait_ms: 100,
            connect_timeout_ms: 100,
            socket_timeout_ms: 100,
            // 间隔足够长，测试中只手动触发回收
            time_between_eviction_runs_ms: 60_000,
            min_evictable_idle_time_ms: 20,
            max_evictable_idle_time_ms: 10_000,
            validation_query: "SELECT 1".to_string(),
            test_while_idle: false,
            test_on_borrow: false,
            test_on_return: false,
        }
    }

    #[tokio::test]
    async fn test_eviction_keeps_min_idle() {
        let manager = MemoryConnectionManager::new("SLAVE");
        let pool = ConnectionPool::open(DataSourceKey::Slave, eviction_config(), manager.clone())
            .await
            .unwrap();
        assert_eq!(pool.stats().idle, 4);

        tokio::time::sleep(Duration::from_millis(40)).await;
        pool.evict_idle().await;

        let stats = pool.stats();
        assert_eq!(stats.idle, 1);
        assert_eq!(stats.total_evicted, 3);
        assert_eq!(manager.closed_count(), 3);
        pool.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_fresh_connections_are_not_evicted() {
        let manager = MemoryConnectionManager::new("SLAVE");
        let mut config = eviction_config();
        config.min_evictable_idle_time_ms = 5_000;
        let pool = ConnectionPool::open(DataSourceKey::Slave, config, manager)
            .await
            .unwrap();

        pool.evict_idle().await;
        assert_eq!(pool.stats().idle, 4);
        assert_eq!(pool.stats().total_evicted, 0);
        pool.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_validation_removes_dead_connections_and_refills() {
        let manager = MemoryConnectionManager::new("MASTER");
        let mut config = eviction_config();
        config.initial_size = 2;
        config.min_idle = 2;
        config.min_evictable_idle_time_ms = 5_000;
        config.test_while_idle = true;
        let pool = ConnectionPool::open(DataSourceKey::Master, config, manager.clone())
            .await
            .unwrap();

        manager.set_fail_validate(true);
        pool.evict_idle().await;
        // 两个失效连接被移除后立即补充，新连接不会在本轮再次校验
        manager.set_fail_validate(false);

        let stats = pool.stats();
        assert_eq!(stats.total_evicted, 2);
        assert_eq!(stats.idle, 2);
        assert_eq!(manager.connect_count(), 4);
        pool.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_max_idle_time_evicts_below_min_idle() {
        let manager = MemoryConnectionManager::new("SLAVE");
        let mut config = eviction_config();
        config.initial_size = 2;
        config.min_idle = 2;
        config.min_evictable_idle_time_ms = 10;
        config.max_evictable_idle_time_ms = 20;
        let pool = ConnectionPool::open(DataSourceKey::Slave, config, manager.clone())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;
        pool.evict_idle().await;

        // 两个连接都超过最大空闲时间，即使低于 min_idle 也被关闭，随后补足
        let stats = pool.stats();
        assert_eq!(stats.total_evicted, 2);
        assert_eq!(stats.idle, 2);
        assert_eq!(manager.closed_count(), 2);
        assert_eq!(manager.connect_count(), 4);
        pool.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_long_idle_connection_is_validated_on_borrow() {
        let manager = MemoryConnectionManager::new("MASTER");
        let mut config = eviction_config();
        config.initial_size = 0;
        config.min_idle = 0;
        config.time_between_eviction_runs_ms = 1_000;
        config.test_while_idle = true;
        let pool = ConnectionPool::open(DataSourceKey::Master, config, manager.clone())
            .await
            .unwrap();

        // 刚归还的连接不校验
        let conn = pool.checkout().await.unwrap();
        drop(conn);
        let conn = pool.checkout().await.unwrap();
        assert_eq!(conn.id, 1);
        assert_eq!(manager.validation_count(), 0);
        drop(conn);

        // 空闲时间超过回收间隔的连接在借出时校验，失效则换新连接
        let stale = manager.connect().await.unwrap();
        let stale_id = stale.id;
        let Some(fresh) = pool.inner.idle.pop() else {
            panic!("空闲队列应当有一个连接");
        };
        pool.inner.idle.push(IdleConnection {
            conn: stale,
            meta: ConnectionMeta::new(),
            idle_since: Instant::now() - Duration::from_secs(5),
        });
        pool.inner.idle.push(fresh);
        manager.set_fail_validate(true);

        let conn = pool.checkout().await.unwrap();
        assert_eq!(manager.validation_count(), 1);
        assert_eq!(pool.stats().validation_failures, 1);
        assert_eq!(manager.closed_count(), 1);
        assert_ne!(conn.id, stale_id);
        assert_eq!(conn.id, 1);
        drop(conn);

        manager.set_fail_validate(false);
        pool.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_background_task_evicts_on_interval() {
        let manager = MemoryConnectionManager::new("SLAVE");
        let mut config = eviction_config();
        config.initial_size = 3;
        config.min_idle = 1;
        config.time_between_eviction_runs_ms = 20;
        config.min_evictable_idle_time_ms = 10;
        let pool = ConnectionPool::open(DataSourceKey::Slave, config, manager.clone())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        let stats = pool.stats();
        assert_eq!(stats.total_evicted, 2);
        assert_eq!(stats.idle, 1);
        assert_eq!(manager.closed_count(), 2);
        pool.close().await.unwrap();
    }
}
