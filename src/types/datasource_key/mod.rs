//! 数据源键
//!
//! 路由决策的唯一依据。主库负责读写，从库/副本只读

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::DataSourceError;

/// 数据源键
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataSourceKey {
    /// 主库
    Master,
    /// 从库
    Slave,
    /// 额外的只读副本，按编号区分
    Replica(u8),
}

impl DataSourceKey {
    /// 是否为只读数据源
    pub fn is_read_only(&self) -> bool {
        !matches!(self, DataSourceKey::Master)
    }
}

impl fmt::Display for DataSourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceKey::Master => write!(f, "MASTER"),
            DataSourceKey::Slave => write!(f, "SLAVE"),
            DataSourceKey::Replica(n) => write!(f, "REPLICA{}", n),
        }
    }
}

impl FromStr for DataSourceKey {
    type Err = DataSourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        match upper.as_str() {
            "MASTER" | "PRIMARY" => Ok(DataSourceKey::Master),
            "SLAVE" => Ok(DataSourceKey::Slave),
            other => other
                .strip_prefix("REPLICA")
                .and_then(|n| n.parse::<u8>().ok())
                .map(DataSourceKey::Replica)
                .ok_or_else(|| crate::ds_error!(config, format!("无法识别的数据源键: {}", s))),
        }
    }
}

impl Serialize for DataSourceKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DataSourceKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
