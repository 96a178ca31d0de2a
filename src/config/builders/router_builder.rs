//! # 路由配置构建器模块
//!
//! 汇总多个数据源配置并指定默认数据源

use crate::config::core::{LoggingConfig, RouterConfig};
use crate::error::DataSourceResult;
use crate::types::{DataSourceConfig, DataSourceKey};
use rat_logger::info;

/// 路由配置构建器
///
/// 默认数据源必须显式指定，不会自动选用第一个数据源
#[derive(Debug)]
pub struct RouterConfigBuilder {
    default_datasource: Option<DataSourceKey>,
    datasources: Vec<DataSourceConfig>,
    logging: Option<LoggingConfig>,
}

impl RouterConfigBuilder {
    /// 创建新的构建器
    pub fn new() -> Self {
        Self {
            default_datasource: None,
            datasources: Vec::new(),
            logging: None,
        }
    }

    /// 设置默认数据源
    ///
    /// # 参数
    ///
    /// * `key` - 未设置数据源键时使用的数据源
    pub fn default_datasource(mut self, key: DataSourceKey) -> Self {
        self.default_datasource = Some(key);
        self
    }

    /// 添加数据源配置
    ///
    /// # 参数
    ///
    /// * `datasource` - 数据源配置
    pub fn add_datasource(mut self, datasource: DataSourceConfig) -> Self {
        self.datasources.push(datasource);
        self
    }

    /// 设置日志配置
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// 构建路由配置
    ///
    /// # 错误
    ///
    /// 未指定默认数据源、默认数据源未配置、数据源键重复时返回错误
    pub fn build(self) -> DataSourceResult<RouterConfig> {
        let default_datasource = self
            .default_datasource
            .ok_or_else(|| crate::ds_error!(config, "默认数据源必须设置"))?;

        let config = RouterConfig {
            default_datasource,
            logging: self.logging,
            datasources: self.datasources,
        };
        config.validate()?;

        info!(
            "创建路由配置: 默认数据源={}, 数据源数量={}",
            config.default_datasource,
            config.datasources.len()
        );
        Ok(config)
    }
}

impl Default for RouterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
