//! 池化连接

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OwnedSemaphorePermit;
use uuid::Uuid;

use super::manager::ConnectionManager;
use super::pool::PoolInner;
use crate::types::DataSourceKey;

/// 物理连接的元信息
#[derive(Debug, Clone, Copy)]
pub(crate) struct ConnectionMeta {
    pub(crate) id: Uuid,
    pub(crate) created_at: Instant,
}

impl ConnectionMeta {
    pub(crate) fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Instant::now(),
        }
    }
}

/// 空闲队列中的连接
pub(crate) struct IdleConnection<C> {
    pub(crate) conn: C,
    pub(crate) meta: ConnectionMeta,
    pub(crate) idle_since: Instant,
}

impl<C> IdleConnection<C> {
    pub(crate) fn new(conn: C, meta: ConnectionMeta) -> Self {
        Self {
            conn,
            meta,
            idle_since: Instant::now(),
        }
    }

    pub(crate) fn idle_for(&self) -> Duration {
        self.idle_since.elapsed()
    }
}

/// 从连接池借出的连接
///
/// 通过 `Deref` 直接当作原生连接使用，析构时自动归还连接池。
/// 经路由数据源借出的连接与直接从连接池借出的连接完全相同。
pub struct PooledConnection<M: ConnectionManager> {
    conn: Option<M::Connection>,
    meta: ConnectionMeta,
    pool: Arc<PoolInner<M>>,
    permit: Option<OwnedSemaphorePermit>,
}

impl<M: ConnectionManager> PooledConnection<M> {
    pub(crate) fn new(
        conn: M::Connection,
        meta: ConnectionMeta,
        pool: Arc<PoolInner<M>>,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            conn: Some(conn),
            meta,
            pool,
            permit: Some(permit),
        }
    }

    /// 连接ID
    pub fn id(&self) -> Uuid {
        self.meta.id
    }

    /// 连接所属的数据源
    pub fn key(&self) -> DataSourceKey {
        self.pool.key
    }

    /// 物理连接已存活的时间
    pub fn age(&self) -> Duration {
        self.meta.created_at.elapsed()
    }

    /// 显式归还连接
    ///
    /// 与析构归还的区别在于归还时的校验（test_on_return）会在当前任务内完成
    pub async fn release(mut self) {
        if let (Some(conn), Some(permit)) = (self.conn.take(), self.permit.take()) {
            self.pool.clone().recycle(conn, self.meta, permit).await;
        }
    }

    /// 将连接从池中分离，调用方自行负责其生命周期，占用的名额随即释放
    pub fn detach(mut self) -> Option<M::Connection> {
        self.permit.take();
        let conn = self.conn.take();
        if conn.is_some() {
            self.pool.note_detached();
        }
        conn
    }
}

impl<M: ConnectionManager> std::fmt::Debug for PooledConnection<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("id", &self.meta.id)
            .field("key", &self.pool.key)
            .field("connection", &"<Connection>")
            .finish()
    }
}

impl<M: ConnectionManager> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        // 连接只会在 release/detach/drop 中被取走，这些方法都消耗了 self
        match self.conn.as_ref() {
            Some(conn) => conn,
            None => unreachable!("连接已被取走"),
        }
    }
}

impl<M: ConnectionManager> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self.conn.as_mut() {
            Some(conn) => conn,
            None => unreachable!("连接已被取走"),
        }
    }
}

impl<M: ConnectionManager> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        if let (Some(conn), Some(permit)) = (self.conn.take(), self.permit.take()) {
            self.pool.clone().recycle_detached(conn, self.meta, permit);
        }
    }
}
