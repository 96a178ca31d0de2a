//! 连接池统计

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::types::DataSourceKey;

/// 连接池计数器
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub(crate) created: AtomicU64,
    pub(crate) closed: AtomicU64,
    pub(crate) evicted: AtomicU64,
    pub(crate) checkouts: AtomicU64,
    pub(crate) checkout_timeouts: AtomicU64,
    pub(crate) validation_failures: AtomicU64,
}

impl PoolCounters {
    pub(crate) fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn load(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// 连接池状态快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// 数据源键
    pub key: DataSourceKey,
    /// 已借出的连接数
    pub active: u32,
    /// 空闲连接数
    pub idle: u32,
    /// 最大活动连接数
    pub max_active: u32,
    /// 累计创建的连接数
    pub total_created: u64,
    /// 累计关闭的连接数
    pub total_closed: u64,
    /// 累计被空闲回收的连接数
    pub total_evicted: u64,
    /// 累计成功借出次数
    pub total_checkouts: u64,
    /// 等待超时次数
    pub checkout_timeouts: u64,
    /// 校验失败次数
    pub validation_failures: u64,
    /// 是否已关闭
    pub closed: bool,
}
