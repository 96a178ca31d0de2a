//! 连接池配置
//!
//! 每个数据源各自持有一份独立配置，所有时间单位均为毫秒

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::DataSourceError;

/// 连接池配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// 启动时建立的连接数
    pub initial_size: u32,
    /// 最小空闲连接数
    pub min_idle: u32,
    /// 最大活动连接数
    pub max_active: u32,
    /// 获取连接的最大等待时间（毫秒）
    pub max_wait_ms: u64,
    /// 建立连接超时（毫秒）
    pub connect_timeout_ms: u64,
    /// 单次网络往返超时（毫秒），用于限制校验查询
    pub socket_timeout_ms: u64,
    /// 空闲连接检测间隔（毫秒）
    pub time_between_eviction_runs_ms: u64,
    /// 连接在池中最小空闲时间（毫秒），超过后可被回收
    pub min_evictable_idle_time_ms: u64,
    /// 连接在池中最大空闲时间（毫秒），超过后必定回收
    pub max_evictable_idle_time_ms: u64,
    /// 校验查询语句，为空时使用驱动自带的 ping
    pub validation_query: String,
    /// 空闲时检测连接有效性
    pub test_while_idle: bool,
    /// 借出时检测连接有效性
    pub test_on_borrow: bool,
    /// 归还时检测连接有效性
    pub test_on_return: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_size: 5,
            min_idle: 10,
            max_active: 20,
            max_wait_ms: 60_000,
            connect_timeout_ms: 30_000,
            socket_timeout_ms: 60_000,
            time_between_eviction_runs_ms: 60_000,
            min_evictable_idle_time_ms: 300_000,
            max_evictable_idle_time_ms: 900_000,
            validation_query: "SELECT 1".to_string(),
            test_while_idle: true,
            test_on_borrow: false,
            test_on_return: false,
        }
    }
}

impl PoolConfig {
    /// 校验参数的合理性
    pub fn validate(&self) -> Result<(), DataSourceError> {
        if self.max_active == 0 {
            return Err(crate::ds_error!(config, "最大活动连接数不能为零"));
        }
        if self.min_idle > self.max_active {
            return Err(crate::ds_error!(config, "最小空闲连接数不能大于最大活动连接数"));
        }
        if self.initial_size > self.max_active {
            return Err(crate::ds_error!(config, "初始连接数不能大于最大活动连接数"));
        }
        if self.max_wait_ms == 0 {
            return Err(crate::ds_error!(config, "最大等待时间不能为零"));
        }
        if self.connect_timeout_ms == 0 {
            return Err(crate::ds_error!(config, "建立连接超时不能为零"));
        }
        if self.socket_timeout_ms == 0 {
            return Err(crate::ds_error!(config, "Socket超时不能为零"));
        }
        if self.time_between_eviction_runs_ms == 0 {
            return Err(crate::ds_error!(config, "空闲检测间隔不能为零"));
        }
        if self.min_evictable_idle_time_ms > self.max_evictable_idle_time_ms {
            return Err(crate::ds_error!(
                config,
                "最小可回收空闲时间不能大于最大可回收空闲时间"
            ));
        }
        Ok(())
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn socket_timeout(&self) -> Duration {
        Duration::from_millis(self.socket_timeout_ms)
    }

    pub fn eviction_interval(&self) -> Duration {
        Duration::from_millis(self.time_between_eviction_runs_ms)
    }

    pub fn min_evictable_idle(&self) -> Duration {
        Duration::from_millis(self.min_evictable_idle_time_ms)
    }

    pub fn max_evictable_idle(&self) -> Duration {
        Duration::from_millis(self.max_evictable_idle_time_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let mut config = PoolConfig::default();
        config.min_idle = config.max_active + 1;
        assert!(config.validate().is_err());

        let mut config = PoolConfig::default();
        config.max_wait_ms = 0;
        assert!(config.validate().is_err());

        let mut config = PoolConfig::default();
        config.min_evictable_idle_time_ms = config.max_evictable_idle_time_ms + 1;
        assert!(config.validate().is_err());
    }
}
