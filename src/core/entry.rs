use serde::{Deserialize, Serialize};
use std::time::SystemTime;

use crate::core::action::ActionKind;

/// 根租户（super tenant）
pub const DEFAULT_TENANT_ID: i32 = -1234;
pub const DEFAULT_TENANT_DOMAIN: &str = "carbon.super";

/// 审计日志条目（只读快照，由日志源拥有）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub resource_path: String,
    pub action: ActionKind,
    /// 第二个资源路径：move 的旧路径 / copy 的目标路径
    pub action_data: Option<String>,
    pub timestamp: SystemTime,
}

impl LogEntry {
    pub fn new(resource_path: impl Into<String>, action: ActionKind, timestamp: SystemTime) -> Self {
        Self {
            resource_path: resource_path.into(),
            action,
            action_data: None,
            timestamp,
        }
    }

    pub fn with_data(mut self, action_data: impl Into<String>) -> Self {
        self.action_data = Some(action_data.into());
        self
    }
}

/// 单次扫描的租户身份（显式传参，不落盘、不跨租户共享）
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: i32,
    pub tenant_domain: String,
}

impl TenantContext {
    pub fn new(tenant_id: i32, tenant_domain: impl Into<String>) -> Self {
        Self {
            tenant_id,
            tenant_domain: tenant_domain.into(),
        }
    }

    pub fn root() -> Self {
        Self::new(DEFAULT_TENANT_ID, DEFAULT_TENANT_DOMAIN)
    }

    pub fn is_root(&self) -> bool {
        self.tenant_id == DEFAULT_TENANT_ID
    }
}
