//! 数据源上下文模块
//!
//! 保存当前逻辑操作选择的数据源键。异步代码通过 [`with_data_source`] 或
//! [`ContextScope`] 获得任务本地的存储槽，运行时之外的同步代码使用线程本地槽，
//! 配合 [`DataSourceGuard`] 保证任何退出路径都会恢复先前的键。
//!
//! tokio 工作线程由多个任务共享，因此在运行时中、任务作用域之外设置的键会被忽略
//! 并记录警告，读取时总是得到 `None`。

mod guard;
mod holder;

pub use guard::DataSourceGuard;
pub use holder::{
    clear_data_source, current_data_source, set_data_source, with_data_source,
    with_data_source_sync, ContextScope,
};
