//! 内存连接管理器
//!
//! 不访问任何真实数据库，用于测试、演示以及在没有驱动的环境中验证路由配置。
//! 可以注入建连失败、校验失败、关闭失败和建连延迟。

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::manager::ConnectionManager;
use crate::error::DataSourceResult;
use crate::types::DataSourceConfig;

/// 内存连接
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConnection {
    /// 管理器内递增的连接编号
    pub id: u64,
    /// 连接来源标签，通常是数据源键
    pub source: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    source: String,
    next_id: AtomicU64,
    connects: AtomicU64,
    closes: AtomicU64,
    validations: AtomicU64,
    connect_delay_ms: AtomicU64,
    fail_connect: AtomicBool,
    fail_validate: AtomicBool,
    fail_close: AtomicBool,
}

/// 内存连接管理器，克隆后共享同一份状态
#[derive(Debug, Clone)]
pub struct MemoryConnectionManager {
    state: Arc<MemoryState>,
}

impl MemoryConnectionManager {
    pub fn new<S: Into<String>>(source: S) -> Self {
        Self {
            state: Arc::new(MemoryState {
                source: source.into(),
                ..Default::default()
            }),
        }
    }

    /// 以数据源键作为来源标签
    pub fn for_config(config: &DataSourceConfig) -> DataSourceResult<Self> {
        Ok(Self::new(config.key.to_string()))
    }

    pub fn source(&self) -> &str {
        &self.state.source
    }

    pub fn set_fail_connect(&self, fail: bool) {
        self.state.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_validate(&self, fail: bool) {
        self.state.fail_validate.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_close(&self, fail: bool) {
        self.state.fail_close.store(fail, Ordering::SeqCst);
    }

    pub fn set_connect_delay(&self, delay: Duration) {
        self.state
            .connect_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// 成功建立的连接数
    pub fn connect_count(&self) -> u64 {
        self.state.connects.load(Ordering::SeqCst)
    }

    /// 调用 close 的次数（包括失败的）
    pub fn closed_count(&self) -> u64 {
        self.state.closes.load(Ordering::SeqCst)
    }

    /// 执行校验的次数
    pub fn validation_count(&self) -> u64 {
        self.state.validations.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionManager for MemoryConnectionManager {
    type Connection = MemoryConnection;

    async fn connect(&self) -> DataSourceResult<MemoryConnection> {
        let delay = self.state.connect_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(crate::ds_error!(
                connection,
                format!("{} 不可达", self.state.source)
            ));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryConnection {
            id: self.state.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            source: self.state.source.clone(),
        })
    }

    async fn validate(&self, _conn: &mut MemoryConnection, query: &str) -> DataSourceResult<()> {
        self.state.validations.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_validate.load(Ordering::SeqCst) {
            return Err(crate::ds_error!(
                connection,
                format!("校验语句执行失败: {}", query)
            ));
        }
        Ok(())
    }

    async fn close(&self, conn: MemoryConnection) -> DataSourceResult<()> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_close.load(Ordering::SeqCst) {
            return Err(crate::ds_error!(
                connection,
                format!("关闭连接 {} 失败", conn.id)
            ));
        }
        Ok(())
    }
}
