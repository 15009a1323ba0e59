use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{TenantContext, DEFAULT_TENANT_DOMAIN, DEFAULT_TENANT_ID};
use crate::error::ScanError;
use crate::storage::DEFAULT_CHECKPOINT_LOCATION;
use crate::tenant::StaticTenantDirectory;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantEntry {
    pub id: i32,
    pub domain: String,
    #[serde(default = "default_true")]
    pub eligible: bool,
    /// 见 `TenantDirectory::loaded_from_login`
    #[serde(default)]
    pub loaded_from_login: Option<bool>,
}

fn default_true() -> bool {
    true
}

impl TenantEntry {
    pub fn context(&self) -> TenantContext {
        TenantContext::new(self.id, self.domain.clone())
    }
}

/// 运行配置（TOML），所有字段都有默认值
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub interval_secs: u64,
    pub initial_delay_secs: u64,
    /// 关停时等待排空的时长
    pub shutdown_grace_secs: u64,
    pub data_dir: PathBuf,
    /// 资源根目录，缺省为 `<data_dir>/resources`
    pub resource_root: Option<PathBuf>,
    /// checkpoint 在 registry 中的位置（哨兵路径）
    pub checkpoint_location: String,
    pub default_tenant: TenantEntry,
    pub tenants: Vec<TenantEntry>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("audit-indexer");
        Self {
            interval_secs: 60,
            initial_delay_secs: 5,
            shutdown_grace_secs: 30,
            data_dir,
            resource_root: None,
            checkpoint_location: DEFAULT_CHECKPOINT_LOCATION.to_string(),
            default_tenant: TenantEntry {
                id: DEFAULT_TENANT_ID,
                domain: DEFAULT_TENANT_DOMAIN.to_string(),
                eligible: true,
                loaded_from_login: None,
            },
            tenants: Vec::new(),
        }
    }
}

impl IndexerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, ScanError> {
        let config: Self = toml::from_str(text).map_err(|e| ScanError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.interval_secs == 0 {
            return Err(ScanError::Config("interval_secs must be > 0".into()));
        }
        if self.checkpoint_location.is_empty() {
            return Err(ScanError::Config("checkpoint_location must not be empty".into()));
        }
        let mut ids = HashSet::new();
        for t in &self.tenants {
            if t.id == self.default_tenant.id {
                return Err(ScanError::Config(format!(
                    "tenant {} clashes with the default tenant id",
                    t.id
                )));
            }
            if !ids.insert(t.id) {
                return Err(ScanError::Config(format!("duplicate tenant id {}", t.id)));
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    pub fn audit_dir(&self) -> PathBuf {
        self.data_dir.join("audit")
    }

    pub fn checkpoint_file(&self) -> PathBuf {
        self.data_dir.join("checkpoints.bin")
    }

    pub fn resource_root(&self) -> PathBuf {
        self.resource_root
            .clone()
            .unwrap_or_else(|| self.data_dir.join("resources"))
    }

    pub fn root_tenant(&self) -> TenantContext {
        self.default_tenant.context()
    }

    /// 按配置填充静态租户目录（根租户只登记资格，不进入活跃列表）
    pub fn populate(&self, directory: &StaticTenantDirectory) {
        let root = &self.default_tenant;
        directory.insert(root.context(), root.eligible, root.loaded_from_login);
        for t in &self.tenants {
            directory.insert(t.context(), t.eligible, t.loaded_from_login);
        }
    }
}
