//! 数据源键的 RAII 守卫

use std::marker::PhantomData;

use super::holder::{replace_slot, warn_unscoped};
use crate::types::DataSourceKey;

/// 数据源键守卫
///
/// 创建时保存旧键并写入新键，析构时恢复旧键。正常返回、`?` 提前返回和 panic
/// 展开都会经过析构，嵌套使用时外层的键会被正确还原。
///
/// 守卫为 `!Send`，持有守卫的 future 不能交给 `tokio::spawn`。
/// 在 tokio 运行时中只能在 [`super::ContextScope`] 内使用，作用域之外的守卫不生效；
/// 切换数据源的异步操作请使用 [`super::with_data_source`]。
#[must_use = "守卫被丢弃时会立即恢复旧的数据源键"]
pub struct DataSourceGuard {
    /// `None` 表示没有可用的存储槽，析构时无需恢复
    restore: Option<Option<DataSourceKey>>,
    _not_send: PhantomData<*const ()>,
}

impl DataSourceGuard {
    pub fn new(key: DataSourceKey) -> Self {
        let restore = replace_slot(Some(key));
        if restore.is_none() {
            warn_unscoped(key);
        }
        Self {
            restore,
            _not_send: PhantomData,
        }
    }

    /// 守卫生效前的键
    pub fn previous(&self) -> Option<DataSourceKey> {
        self.restore.flatten()
    }

    /// 守卫是否写入了数据源键
    pub fn is_applied(&self) -> bool {
        self.restore.is_some()
    }
}

impl Drop for DataSourceGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.restore {
            let _ = replace_slot(previous);
        }
    }
}
