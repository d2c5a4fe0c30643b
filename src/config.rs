use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::core::types::L1Config;
use crate::maintenance::MaintenanceConfig;
use crate::net::{InterceptorConfig, QuotaConfig};
use crate::persistence::PersistenceConfig;

/// Top-level configuration, sectioned per component
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub l1: L1Config,
    pub persistence: PersistenceConfig,
    pub interceptor: InterceptorConfig,
    pub quota: QuotaConfig,
    pub maintenance: MaintenanceConfig,
}

impl CacheConfig {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: CacheConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}
