//! # 配置管理模块 - 核心配置类型
//!
//! 路由配置由默认数据源键和一组数据源配置组成，支持 TOML 与 JSON 两种文件格式

use rat_logger::info;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::{DataSourceError, DataSourceResult};
use crate::types::{DataSourceConfig, DataSourceKey};

/// 路由配置
///
/// 启动时构建一次，之后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// 未设置数据源键时使用的默认数据源
    pub default_datasource: DataSourceKey,
    /// 日志配置，未设置时由调用者自行初始化日志系统
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
    /// 所有数据源配置
    pub datasources: Vec<DataSourceConfig>,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,
    /// 是否输出到控制台
    pub console: bool,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 错误级别
    Error,
    /// 警告级别
    Warn,
    /// 信息级别
    Info,
    /// 调试级别
    Debug,
    /// 跟踪级别
    Trace,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Toml,
    Json,
}

fn file_format(path: &Path) -> FileFormat {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("toml") => FileFormat::Toml,
        _ => FileFormat::Json,
    }
}

impl RouterConfig {
    /// 创建路由配置构建器
    pub fn builder() -> super::builders::RouterConfigBuilder {
        super::builders::RouterConfigBuilder::new()
    }

    /// 从配置文件加载配置
    ///
    /// 扩展名为 `.toml` 时按 TOML 解析，其余按 JSON 解析。加载后立即校验。
    ///
    /// # 参数
    ///
    /// * `config_path` - 配置文件路径
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> DataSourceResult<Self> {
        let path = config_path.as_ref();
        let content = std::fs::read_to_string(path).map_err(DataSourceError::IoError)?;

        let config: RouterConfig = match file_format(path) {
            FileFormat::Toml => toml::from_str(&content)
                .map_err(|e| crate::ds_error!(config, format!("解析TOML配置文件失败: {}", e)))?,
            FileFormat::Json => serde_json::from_str(&content)
                .map_err(|e| crate::ds_error!(config, format!("解析JSON配置文件失败: {}", e)))?,
        };
        config.validate()?;

        info!("从文件加载路由配置: {:?}", path);
        Ok(config)
    }

    /// 保存配置到文件
    ///
    /// # 参数
    ///
    /// * `config_path` - 配置文件路径
    pub fn save_to_file<P: AsRef<Path>>(&self, config_path: P) -> DataSourceResult<()> {
        let path = config_path.as_ref();
        let content = match file_format(path) {
            FileFormat::Toml => toml::to_string_pretty(self)
                .map_err(|e| crate::ds_error!(config, format!("序列化TOML配置失败: {}", e)))?,
            FileFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| crate::ds_error!(config, format!("序列化JSON配置失败: {}", e)))?,
        };

        std::fs::write(path, content).map_err(DataSourceError::IoError)?;

        info!("保存路由配置到文件: {:?}", path);
        Ok(())
    }

    /// 校验配置
    ///
    /// 数据源键不能重复，默认数据源必须存在，每个数据源的连接池参数必须合法
    pub fn validate(&self) -> DataSourceResult<()> {
        if self.datasources.is_empty() {
            return Err(crate::ds_error!(config, "至少需要配置一个数据源"));
        }

        let mut seen = HashSet::new();
        for datasource in &self.datasources {
            if !seen.insert(datasource.key) {
                return Err(crate::ds_error!(
                    config,
                    format!("数据源 {} 重复配置", datasource.key)
                ));
            }
            if datasource.connection.db_type() != datasource.db_type {
                return Err(crate::ds_error!(
                    config,
                    format!(
                        "数据源 {} 的数据库类型 {} 与连接配置不一致",
                        datasource.key,
                        datasource.db_type.as_str()
                    )
                ));
            }
            datasource.pool.validate().map_err(|e| {
                crate::ds_error!(config, format!("数据源 {} 的连接池配置无效: {}", datasource.key, e))
            })?;
        }

        if !seen.contains(&self.default_datasource) {
            return Err(crate::ds_error!(
                config,
                format!("默认数据源 {} 未配置", self.default_datasource)
            ));
        }
        Ok(())
    }

    /// 获取指定数据源的配置
    pub fn get_datasource(&self, key: DataSourceKey) -> Option<&DataSourceConfig> {
        self.datasources.iter().find(|ds| ds.key == key)
    }

    /// 获取默认数据源配置
    pub fn get_default_datasource(&self) -> DataSourceResult<&DataSourceConfig> {
        self.get_datasource(self.default_datasource).ok_or_else(|| {
            crate::ds_error!(
                config,
                format!("找不到默认数据源配置: {}", self.default_datasource)
            )
        })
    }

    /// 所有已配置的数据源键
    pub fn keys(&self) -> Vec<DataSourceKey> {
        self.datasources.iter().map(|ds| ds.key).collect()
    }
}

impl LoggingConfig {
    /// 创建日志配置构建器
    pub fn builder() -> super::builders::LoggingConfigBuilder {
        super::builders::LoggingConfigBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::convenience::{postgres_datasource, sqlite_datasource};
    use crate::types::{DatabaseType, PoolConfig};

    fn sample_config() -> RouterConfig {
        RouterConfig {
            default_datasource: DataSourceKey::Master,
            logging: Some(LoggingConfig {
                level: LogLevel::Info,
                console: true,
            }),
            datasources: vec![
                postgres_datasource(
                    DataSourceKey::Master,
                    "10.0.0.1",
                    5432,
                    "mysys",
                    "admin",
                    "secret",
                    PoolConfig::default(),
                )
                .unwrap(),
                sqlite_datasource(DataSourceKey::Slave, "./data/replica.db", PoolConfig::default())
                    .unwrap(),
            ],
        }
    }

    #[test]
    fn test_toml_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.toml");
        let config = sample_config();

        config.save_to_file(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("default_datasource = \"MASTER\""));

        let loaded = RouterConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("router.json");
        let config = sample_config();

        config.save_to_file(&path).unwrap();
        let loaded = RouterConfig::from_file(&path).unwrap();
        assert_eq!(loaded.keys(), vec![DataSourceKey::Master, DataSourceKey::Slave]);
        assert_eq!(
            loaded.get_datasource(DataSourceKey::Slave).unwrap().db_type,
            DatabaseType::SQLite
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = RouterConfig::from_file(dir.path().join("absent.toml"));
        assert!(matches!(result, Err(DataSourceError::IoError(_))));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let result = RouterConfig::from_file(&path);
        assert!(matches!(result, Err(DataSourceError::ConfigError { .. })));
    }

    #[test]
    fn test_validate_missing_default() {
        let mut config = sample_config();
        config.default_datasource = DataSourceKey::Replica(2);
        assert!(config.validate().unwrap_err().is_fatal());
        assert!(config.get_default_datasource().is_err());
    }

    #[test]
    fn test_validate_duplicate_keys() {
        let mut config = sample_config();
        let duplicate = config.datasources[0].clone();
        config.datasources.push(duplicate);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_type_mismatch_and_bad_pool() {
        let mut config = sample_config();
        config.datasources[1].db_type = DatabaseType::MySQL;
        assert!(config.validate().is_err());

        let mut config = sample_config();
        config.datasources[1].pool.max_active = 0;
        assert!(config.validate().is_err());
    }
}
