//! 连接池核心模块

use crossbeam_queue::SegQueue;
use parking_lot::Mutex;
use rat_logger::{error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};

use super::connection::{ConnectionMeta, IdleConnection, PooledConnection};
use super::manager::ConnectionManager;
use super::stats::{PoolCounters, PoolStats};
use crate::error::{DataSourceError, DataSourceResult};
use crate::types::{DataSourceKey, PoolConfig};

/// 连接池
///
/// 信号量限制同时借出的连接数（max_active），空闲连接放在无锁队列中。
/// 借出连接是核心流程中唯一会挂起的地方，最多等待 max_wait_ms。
pub struct ConnectionPool<M: ConnectionManager> {
    pub(super) inner: Arc<PoolInner<M>>,
}

pub(crate) struct PoolInner<M: ConnectionManager> {
    pub(crate) key: DataSourceKey,
    pub(crate) config: PoolConfig,
    pub(super) manager: M,
    pub(super) semaphore: Arc<Semaphore>,
    pub(super) idle: SegQueue<IdleConnection<M::Connection>>,
    pub(super) closed: AtomicBool,
    pub(super) counters: PoolCounters,
    eviction_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<M: ConnectionManager> Clone for ConnectionPool<M> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<M: ConnectionManager> std::fmt::Debug for ConnectionPool<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("key", &self.inner.key)
            .field("config", &self.inner.config)
            .field("idle", &self.inner.idle.len())
            .field("closed", &self.inner.is_closed())
            .field("manager", &"<ConnectionManager>")
            .finish()
    }
}

impl<M: ConnectionManager> ConnectionPool<M> {
    /// 打开连接池
    ///
    /// 校验配置后立即建立 initial_size 个连接，任何一个失败都会关闭已建立的连接并返回错误，
    /// 保证启动阶段快速失败
    pub async fn open(key: DataSourceKey, config: PoolConfig, manager: M) -> DataSourceResult<Self> {
        config.validate()?;

        let inner = Arc::new(PoolInner {
            key,
            semaphore: Arc::new(Semaphore::new(config.max_active as usize)),
            config,
            manager,
            idle: SegQueue::new(),
            closed: AtomicBool::new(false),
            counters: PoolCounters::default(),
            eviction_handle: Mutex::new(None),
        });
        let pool = Self { inner };

        for _ in 0..pool.inner.config.initial_size {
            match pool.inner.connect().await {
                Ok((conn, meta)) => pool.inner.idle.push(IdleConnection::new(conn, meta)),
                Err(e) => {
                    error!("数据源 {} 初始化连接失败: {}", key, e);
                    if let Err(close_err) = pool.close().await {
                        warn!("数据源 {} 回滚初始化连接时出错: {}", key, close_err);
                    }
                    return Err(e);
                }
            }
        }

        pool.start_eviction_task();

        info!(
            "连接池已打开: 数据源={}, 初始连接={}, 最小空闲={}, 最大活动={}, 最大等待={}ms",
            key,
            pool.inner.config.initial_size,
            pool.inner.config.min_idle,
            pool.inner.config.max_active,
            pool.inner.config.max_wait_ms
        );
        Ok(pool)
    }

    /// 借出连接
    ///
    /// 没有空闲名额时最多等待 max_wait_ms，超时返回 [`DataSourceError::PoolExhausted`]。
    /// 丢弃返回的 future 会立即放弃等待。
    pub async fn checkout(&self) -> DataSourceResult<PooledConnection<M>> {
        let inner = &self.inner;
        if inner.is_closed() {
            return Err(crate::ds_error!(closed, inner.key));
        }

        let started = Instant::now();
        let permit = match timeout(
            inner.config.max_wait(),
            inner.semaphore.clone().acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => return Err(crate::ds_error!(closed, inner.key)),
            Err(_) => {
                let waited_ms = started.elapsed().as_millis() as u64;
                PoolCounters::incr(&inner.counters.checkout_timeouts);
                warn!(
                    "数据源 {} 获取连接超时: 等待={}ms, 活动连接={}/{}",
                    inner.key,
                    waited_ms,
                    inner.active_count(),
                    inner.config.max_active
                );
                return Err(crate::ds_error!(exhausted, inner.key, waited_ms));
            }
        };

        let (conn, meta) = inner.take_connection().await?;
        PoolCounters::incr(&inner.counters.checkouts);
        crate::debug_log!(
            "借出连接: 数据源={}, 连接ID={}, 等待={}ms",
            inner.key,
            meta.id,
            started.elapsed().as_millis()
        );
        Ok(PooledConnection::new(conn, meta, inner.clone(), permit))
    }

    /// 关闭连接池
    ///
    /// 只有第一次调用会真正关闭，之后的调用直接返回成功。所有空闲连接都会尝试关闭，
    /// 单个连接关闭失败不影响其余连接，失败信息汇总后返回。
    /// 仍被借出的连接会在归还时关闭。
    pub async fn close(&self) -> DataSourceResult<()> {
        let inner = &self.inner;
        if inner.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        inner.semaphore.close();
        let handle = inner.eviction_handle.lock().take();
        if let Some(handle) = handle {
            handle.abort();
        }

        let failures = inner.drain_idle().await;
        info!(
            "连接池已关闭: 数据源={}, 借出中的连接={}",
            inner.key,
            inner.active_count()
        );

        if failures.is_empty() {
            Ok(())
        } else {
            Err(crate::ds_error!(connection, failures.join("; ")))
        }
    }

    /// 手动触发一次空闲连接回收
    pub async fn evict_idle(&self) {
        self.inner.run_eviction().await;
    }

    /// 数据源键
    pub fn key(&self) -> DataSourceKey {
        self.inner.key
    }

    /// 连接池配置
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// 是否已关闭
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// 状态快照
    pub fn stats(&self) -> PoolStats {
        let inner = &self.inner;
        PoolStats {
            key: inner.key,
            active: inner.active_count(),
            idle: inner.idle.len() as u32,
            max_active: inner.config.max_active,
            total_created: PoolCounters::load(&inner.counters.created),
            total_closed: PoolCounters::load(&inner.counters.closed),
            total_evicted: PoolCounters::load(&inner.counters.evicted),
            total_checkouts: PoolCounters::load(&inner.counters.checkouts),
            checkout_timeouts: PoolCounters::load(&inner.counters.checkout_timeouts),
            validation_failures: PoolCounters::load(&inner.counters.validation_failures),
            closed: inner.is_closed(),
        }
    }

    /// 启动空闲回收任务
    ///
    /// 任务只持有弱引用，连接池被释放或关闭后自动退出
    fn start_eviction_task(&self) {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.eviction_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // 第一次 tick 立即完成
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if inner.is_closed() {
                    break;
                }
                inner.run_eviction().await;
            }
        });

        *self.inner.eviction_handle.lock() = Some(handle);
    }
}

impl<M: ConnectionManager> PoolInner<M> {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(super) fn active_count(&self) -> u32 {
        if self.is_closed() {
            return 0;
        }
        let available = self.semaphore.available_permits() as u32;
        self.config.max_active.saturating_sub(available)
    }

    /// 建立新连接，受 connect_timeout_ms 限制
    pub(super) async fn connect(&self) -> DataSourceResult<(M::Connection, ConnectionMeta)> {
        match timeout(self.config.connect_timeout(), self.manager.connect()).await {
            Ok(Ok(conn)) => {
                PoolCounters::incr(&self.counters.created);
                Ok((conn, ConnectionMeta::new()))
            }
            Ok(Err(e)) => {
                warn!("数据源 {} 建立连接失败: {}", self.key, e);
                Err(e)
            }
            Err(_) => {
                warn!(
                    "数据源 {} 建立连接超时: {}ms",
                    self.key, self.config.connect_timeout_ms
                );
                Err(DataSourceError::ConnectionError {
                    message: crate::i18n::tf(
                        "error.connect_timeout",
                        &[
                            ("key", &self.key.to_string()),
                            ("timeout_ms", &self.config.connect_timeout_ms.to_string()),
                        ],
                    ),
                })
            }
        }
    }

    /// 执行校验查询，单次往返受 socket_timeout_ms 限制
    pub(super) async fn validate(&self, conn: &mut M::Connection) -> DataSourceResult<()> {
        let result = match timeout(
            self.config.socket_timeout(),
            self.manager.validate(conn, &self.config.validation_query),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e @ DataSourceError::ValidationError { .. })) => Err(e),
            Ok(Err(e)) => Err(crate::ds_error!(validation, self.key, e)),
            Err(_) => Err(crate::ds_error!(
                validation,
                self.key,
                crate::i18n::tf(
                    "error.validation_timeout",
                    &[("timeout_ms", &self.config.socket_timeout_ms.to_string())],
                )
            )),
        };

        if result.is_err() {
            PoolCounters::incr(&self.counters.validation_failures);
        }
        result
    }

    /// 关闭一个物理连接
    pub(super) async fn discard(&self, conn: M::Connection) -> DataSourceResult<()> {
        PoolCounters::incr(&self.counters.closed);
        let result = self.manager.close(conn).await;
        if let Err(e) = &result {
            warn!("数据源 {} 关闭连接失败: {}", self.key, e);
        }
        result
    }

    /// 关闭所有空闲连接，返回失败信息
    pub(super) async fn drain_idle(&self) -> Vec<String> {
        let mut failures = Vec::new();
        while let Some(idle) = self.idle.pop() {
            if let Err(e) = self.discard(idle.conn).await {
                failures.push(format!("{}: {}", idle.meta.id, e));
            }
        }
        failures
    }

    /// 在已获得名额的前提下取得一个可用连接
    ///
    /// 优先复用空闲连接，按 test_on_borrow / test_while_idle 决定是否校验，
    /// 校验失败的连接被关闭后继续尝试下一个，空闲队列为空时新建连接
    async fn take_connection(&self) -> DataSourceResult<(M::Connection, ConnectionMeta)> {
        while let Some(idle) = self.idle.pop() {
            let needs_check = self.config.test_on_borrow
                || (self.config.test_while_idle
                    && idle.idle_for() >= self.config.eviction_interval());
            let IdleConnection { mut conn, meta, .. } = idle;

            if needs_check {
                if let Err(e) = self.validate(&mut conn).await {
                    warn!("数据源 {} 丢弃失效连接 {}: {}", self.key, meta.id, e);
                    let _ = self.discard(conn).await;
                    continue;
                }
            }
            return Ok((conn, meta));
        }

        self.connect().await
    }

    /// 尝试放回空闲队列，连接池已关闭或空闲连接已满时返回原连接
    fn try_push_idle(&self, conn: M::Connection, meta: ConnectionMeta) -> Result<(), M::Connection> {
        if self.is_closed() || self.idle.len() >= self.config.max_active as usize {
            return Err(conn);
        }
        self.idle.push(IdleConnection::new(conn, meta));
        Ok(())
    }

    /// 归还连接（异步路径）
    pub(crate) async fn recycle(
        self: Arc<Self>,
        mut conn: M::Connection,
        meta: ConnectionMeta,
        permit: OwnedSemaphorePermit,
    ) {
        if self.config.test_on_return && !self.is_closed() {
            if let Err(e) = self.validate(&mut conn).await {
                warn!("数据源 {} 归还的连接 {} 校验失败: {}", self.key, meta.id, e);
                let _ = self.discard(conn).await;
                drop(permit);
                return;
            }
        }

        if let Err(conn) = self.try_push_idle(conn, meta) {
            let _ = self.discard(conn).await;
        } else if self.is_closed() {
            // 关闭与归还并发时，close 可能已经清空过队列
            let _ = self.drain_idle().await;
        }
        drop(permit);
    }

    /// 归还连接（析构路径）
    ///
    /// 析构无法等待，需要校验或关闭时交给运行时后台完成
    pub(crate) fn recycle_detached(
        self: Arc<Self>,
        conn: M::Connection,
        meta: ConnectionMeta,
        permit: OwnedSemaphorePermit,
    ) {
        if !self.config.test_on_return {
            match self.try_push_idle(conn, meta) {
                Ok(()) => {
                    drop(permit);
                    if self.is_closed() {
                        // 关闭与归还并发时，close 可能已经清空过队列
                        self.drain_idle_detached();
                    }
                    return;
                }
                Err(conn) => {
                    drop(permit);
                    self.discard_detached(conn);
                    return;
                }
            }
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    self.recycle(conn, meta, permit).await;
                });
            }
            Err(_) => {
                // 没有可用的运行时，无法校验，直接丢弃连接
                PoolCounters::incr(&self.counters.closed);
                drop(conn);
                drop(permit);
            }
        }
    }

    fn discard_detached(self: Arc<Self>, conn: M::Connection) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _ = self.discard(conn).await;
                });
            }
            Err(_) => {
                PoolCounters::incr(&self.counters.closed);
                drop(conn);
            }
        }
    }

    /// 在后台关闭所有空闲连接
    pub(super) fn drain_idle_detached(self: Arc<Self>) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    let _ = self.drain_idle().await;
                });
            }
            Err(_) => {
                while let Some(idle) = self.idle.pop() {
                    PoolCounters::incr(&self.counters.closed);
                    drop(idle);
                }
            }
        }
    }

    pub(crate) fn note_detached(&self) {
        PoolCounters::incr(&self.counters.closed);
        crate::debug_log!("连接已从数据源 {} 分离", self.key);
    }
}
