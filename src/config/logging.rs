//! 日志系统初始化
//!
//! 库本身从不主动初始化日志，只有调用者显式调用 [`init_logging`] 时才会安装处理器

use rat_logger::LevelFilter;

use super::core::{LogLevel, LoggingConfig, RouterConfig};
use crate::error::DataSourceResult;

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// 按配置初始化 rat_logger
///
/// 关闭控制台输出时不安装任何处理器
pub fn init_logging(config: &LoggingConfig) -> DataSourceResult<()> {
    if !config.console {
        return Ok(());
    }

    rat_logger::LoggerBuilder::new()
        .with_level(LevelFilter::from(config.level))
        .add_terminal_with_config(rat_logger::handler::term::TermConfig::default())
        .init()
        .map_err(|e| crate::ds_error!(config, format!("初始化日志系统失败: {:?}", e)))
}

impl RouterConfig {
    /// 按配置中的日志段初始化日志系统
    ///
    /// 安装了处理器时返回 `true`，没有日志段或关闭了控制台输出时返回 `false`
    pub fn init_logging(&self) -> DataSourceResult<bool> {
        match &self.logging {
            Some(logging) if logging.console => init_logging(logging).map(|_| true),
            _ => Ok(false),
        }
    }
}
