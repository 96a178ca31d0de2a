//! # 连接池配置构建器模块
//!
//! 提供连接池配置的构建器实现，支持链式调用和严格验证

use crate::error::DataSourceResult;
use crate::types::PoolConfig;
use rat_logger::info;

/// 连接池配置构建器
///
/// 严格要求所有配置项必须显式设置，严禁使用默认值
#[derive(Debug)]
pub struct PoolConfigBuilder {
    initial_size: Option<u32>,
    min_idle: Option<u32>,
    max_active: Option<u32>,
    max_wait_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
    socket_timeout_ms: Option<u64>,
    time_between_eviction_runs_ms: Option<u64>,
    min_evictable_idle_time_ms: Option<u64>,
    max_evictable_idle_time_ms: Option<u64>,
    validation_query: Option<String>,
    test_while_idle: Option<bool>,
    test_on_borrow: Option<bool>,
    test_on_return: Option<bool>,
}

impl PoolConfig {
    /// 创建连接池配置构建器
    pub fn builder() -> PoolConfigBuilder {
        PoolConfigBuilder::new()
    }
}

impl PoolConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            initial_size: None,
            min_idle: None,
            max_active: None,
            max_wait_ms: None,
            connect_timeout_ms: None,
            socket_timeout_ms: None,
            time_between_eviction_runs_ms: None,
            min_evictable_idle_time_ms: None,
            max_evictable_idle_time_ms: None,
            validation_query: None,
            test_while_idle: None,
            test_on_borrow: None,
            test_on_return: None,
        }
    }

    /// 设置启动时建立的连接数
    ///
    /// # 参数
    ///
    /// * `size` - 初始连接数
    pub fn initial_size(mut self, size: u32) -> Self {
        self.initial_size = Some(size);
        self
    }

    /// 设置最小空闲连接数
    ///
    /// # 参数
    ///
    /// * `min_idle` - 最小空闲连接数
    pub fn min_idle(mut self, min_idle: u32) -> Self {
        self.min_idle = Some(min_idle);
        self
    }

    /// 设置最大活动连接数
    ///
    /// # 参数
    ///
    /// * `max_active` - 最大活动连接数
    pub fn max_active(mut self, max_active: u32) -> Self {
        self.max_active = Some(max_active);
        self
    }

    /// 设置获取连接的最大等待时间（毫秒）
    pub fn max_wait_ms(mut self, ms: u64) -> Self {
        self.max_wait_ms = Some(ms);
        self
    }

    /// 设置建立连接超时（毫秒）
    pub fn connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = Some(ms);
        self
    }

    /// 设置单次网络往返超时（毫秒）
    pub fn socket_timeout_ms(mut self, ms: u64) -> Self {
        self.socket_timeout_ms = Some(ms);
        self
    }

    /// 设置空闲连接检测间隔（毫秒）
    pub fn time_between_eviction_runs_ms(mut self, ms: u64) -> Self {
        self.time_between_eviction_runs_ms = Some(ms);
        self
    }

    /// 设置连接最小可回收空闲时间（毫秒）
    pub fn min_evictable_idle_time_ms(mut self, ms: u64) -> Self {
        self.min_evictable_idle_time_ms = Some(ms);
        self
    }

    /// 设置连接最大空闲时间（毫秒）
    pub fn max_evictable_idle_time_ms(mut self, ms: u64) -> Self {
        self.max_evictable_idle_time_ms = Some(ms);
        self
    }

    /// 设置校验查询语句
    ///
    /// # 参数
    ///
    /// * `query` - 校验语句，空字符串表示使用驱动自带的 ping
    pub fn validation_query<S: Into<String>>(mut self, query: S) -> Self {
        self.validation_query = Some(query.into());
        self
    }

    pub fn test_while_idle(mut self, enabled: bool) -> Self {
        self.test_while_idle = Some(enabled);
        self
    }

    pub fn test_on_borrow(mut self, enabled: bool) -> Self {
        self.test_on_borrow = Some(enabled);
        self
    }

    pub fn test_on_return(mut self, enabled: bool) -> Self {
        self.test_on_return = Some(enabled);
        self
    }

    /// 构建连接池配置
    ///
    /// # 错误
    ///
    /// 如果任何必需的配置项未设置或取值不合理，将返回错误
    pub fn build(self) -> DataSourceResult<PoolConfig> {
        let initial_size = self
            .initial_size
            .ok_or_else(|| crate::ds_error!(config, "初始连接数必须设置"))?;

        let min_idle = self
            .min_idle
            .ok_or_else(|| crate::ds_error!(config, "最小空闲连接数必须设置"))?;

        let max_active = self
            .max_active
            .ok_or_else(|| crate::ds_error!(config, "最大活动连接数必须设置"))?;

        let max_wait_ms = self
            .max_wait_ms
            .ok_or_else(|| crate::ds_error!(config, "最大等待时间必须设置"))?;

        let connect_timeout_ms = self
            .connect_timeout_ms
            .ok_or_else(|| crate::ds_error!(config, "建立连接超时必须设置"))?;

        let socket_timeout_ms = self
            .socket_timeout_ms
            .ok_or_else(|| crate::ds_error!(config, "Socket超时必须设置"))?;

        let time_between_eviction_runs_ms = self
            .time_between_eviction_runs_ms
            .ok_or_else(|| crate::ds_error!(config, "空闲检测间隔必须设置"))?;

        let min_evictable_idle_time_ms = self
            .min_evictable_idle_time_ms
            .ok_or_else(|| crate::ds_error!(config, "最小可回收空闲时间必须设置"))?;

        let max_evictable_idle_time_ms = self
            .max_evictable_idle_time_ms
            .ok_or_else(|| crate::ds_error!(config, "最大空闲时间必须设置"))?;

        let validation_query = self
            .validation_query
            .ok_or_else(|| crate::ds_error!(config, "校验查询语句必须设置"))?;

        let test_while_idle = self
            .test_while_idle
            .ok_or_else(|| crate::ds_error!(config, "空闲检测选项必须设置"))?;

        let test_on_borrow = self
            .test_on_borrow
            .ok_or_else(|| crate::ds_error!(config, "借出检测选项必须设置"))?;

        let test_on_return = self
            .test_on_return
            .ok_or_else(|| crate::ds_error!(config, "归还检测选项必须设置"))?;

        let config = PoolConfig {
            initial_size,
            min_idle,
            max_active,
            max_wait_ms,
            connect_timeout_ms,
            socket_timeout_ms,
            time_between_eviction_runs_ms,
            min_evictable_idle_time_ms,
            max_evictable_idle_time_ms,
            validation_query,
            test_while_idle,
            test_on_borrow,
            test_on_return,
        };

        // 验证配置的合理性
        config.validate()?;

        info!(
            "创建连接池配置: 初始连接={}, 最小空闲={}, 最大活动={}, 最大等待={}ms",
            initial_size, min_idle, max_active, max_wait_ms
        );

        Ok(config)
    }
}

impl Default for PoolConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_builder() -> PoolConfigBuilder {
        PoolConfig::builder()
            .initial_size(5)
            .min_idle(10)
            .max_active(20)
            .max_wait_ms(60_000)
            .connect_timeout_ms(30_000)
            .socket_timeout_ms(60_000)
            .time_between_eviction_runs_ms(60_000)
            .min_evictable_idle_time_ms(300_000)
            .max_evictable_idle_time_ms(900_000)
            .validation_query("SELECT 1")
            .test_while_idle(true)
            .test_on_borrow(false)
            .test_on_return(false)
    }

    #[test]
    fn test_complete_builder_matches_reference_values() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config, PoolConfig::default());
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let result = PoolConfig::builder()
            .initial_size(1)
            .min_idle(1)
            .max_active(2)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_unreasonable_values_are_rejected() {
        assert!(complete_builder().max_active(0).build().is_err());
        assert!(complete_builder().max_wait_ms(0).build().is_err());
        assert!(complete_builder().initial_size(21).build().is_err());
    }
}
