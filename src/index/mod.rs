pub mod dispatch;
pub mod fs_access;
pub mod memory;

use crate::core::TenantContext;
use crate::error::Result;

/// 索引后端（真正解析/存储文档的一侧）
///
/// 两个操作失败都返回 `ScanError::Indexing`。
pub trait IndexBackend: Send + Sync {
    fn submit_for_indexing(&self, ctx: &TenantContext, path: &str) -> Result<()>;
    fn remove_from_index(&self, path: &str, tenant_id: i32) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessAction {
    Read,
}

/// 资源访问检查：鉴权 + 存在性
pub trait ResourceAccess: Send + Sync {
    fn is_authorized(&self, ctx: &TenantContext, path: &str, action: AccessAction)
        -> Result<bool>;
    fn resource_exists(&self, ctx: &TenantContext, path: &str) -> Result<bool>;
}

pub use dispatch::{DispatchOutcome, Dispatcher, SkipReason};
pub use fs_access::FsResourceAccess;
pub use memory::{IndexOp, IndexedDoc, MemoryIndex};
