//! 上下文存储槽

use rat_logger::warn;
use std::cell::Cell;
use std::future::Future;

use crate::types::DataSourceKey;

tokio::task_local! {
    static TASK_DATA_SOURCE: Cell<Option<DataSourceKey>>;
}

thread_local! {
    static THREAD_DATA_SOURCE: Cell<Option<DataSourceKey>> = const { Cell::new(None) };
}

/// 当前可用的存储槽
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Slot {
    /// 任务本地作用域
    Task,
    /// 运行时之外的同步代码
    Thread,
    /// 处于 tokio 运行时中但没有任务作用域，工作线程被多个任务共享，不能保存键
    Unscoped,
}

pub(crate) fn active_slot() -> Slot {
    if TASK_DATA_SOURCE.try_with(|_| ()).is_ok() {
        Slot::Task
    } else if tokio::runtime::Handle::try_current().is_ok() {
        Slot::Unscoped
    } else {
        Slot::Thread
    }
}

/// 替换当前上下文中的键，返回旧值
///
/// 没有可用的存储槽时不写入，返回 `None`
pub(crate) fn replace_slot(value: Option<DataSourceKey>) -> Option<Option<DataSourceKey>> {
    match active_slot() {
        Slot::Task => TASK_DATA_SOURCE.try_with(|slot| slot.replace(value)).ok(),
        Slot::Thread => Some(THREAD_DATA_SOURCE.with(|slot| slot.replace(value))),
        Slot::Unscoped => None,
    }
}

fn read_slot() -> Option<DataSourceKey> {
    match active_slot() {
        Slot::Task => TASK_DATA_SOURCE.try_with(Cell::get).ok().flatten(),
        Slot::Thread => THREAD_DATA_SOURCE.with(Cell::get),
        Slot::Unscoped => None,
    }
}

pub(crate) fn warn_unscoped(key: DataSourceKey) {
    warn!(
        "在 tokio 运行时中设置数据源键 {} 但没有任务作用域，已忽略。请使用 with_data_source 或 ContextScope::run",
        key
    );
}

/// 设置当前上下文的数据源键（后写覆盖先写）
///
/// 在 tokio 运行时中必须位于 [`with_data_source`] 或 [`ContextScope`] 之内，
/// 否则键不会被记录，路由仍然使用默认数据源
pub fn set_data_source(key: DataSourceKey) {
    match replace_slot(Some(key)) {
        Some(Some(previous)) if previous != key => {
            crate::debug_log!("数据源键被覆盖: {} -> {}", previous, key);
        }
        Some(_) => {}
        None => warn_unscoped(key),
    }
}

/// 获取当前上下文的数据源键，`None` 表示使用默认数据源
pub fn current_data_source() -> Option<DataSourceKey> {
    read_slot()
}

/// 清除当前上下文的数据源键
pub fn clear_data_source() {
    let _ = replace_slot(None);
}

/// 在指定数据源下执行异步操作
///
/// 操作运行在全新的任务本地作用域中，作用域随 future 完成或被丢弃（取消）而消失，
/// 因此不会把键泄漏给复用同一工作线程的其他任务
pub async fn with_data_source<F>(key: DataSourceKey, future: F) -> F::Output
where
    F: Future,
{
    TASK_DATA_SOURCE.scope(Cell::new(Some(key)), future).await
}

/// 在指定数据源下执行同步操作，返回后恢复先前的键
///
/// 用于运行时之外的同步代码，或者已经处于任务作用域内的同步片段
pub fn with_data_source_sync<R>(key: DataSourceKey, f: impl FnOnce() -> R) -> R {
    let _guard = super::DataSourceGuard::new(key);
    f()
}

/// 任务本地作用域
///
/// 用于请求处理这类需要多次 set/clear 的场景，作用域内的键只对当前任务可见
pub struct ContextScope;

impl ContextScope {
    /// 以空键开启一个作用域并执行 future
    pub async fn run<F>(future: F) -> F::Output
    where
        F: Future,
    {
        TASK_DATA_SOURCE.scope(Cell::new(None), future).await
    }

    /// 当前是否处于任务本地作用域内
    pub fn is_active() -> bool {
        active_slot() == Slot::Task
    }
}
