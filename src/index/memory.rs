use dashmap::DashMap;
use parking_lot::Mutex;
use std::time::SystemTime;

use crate::core::TenantContext;
use crate::error::Result;
use crate::index::IndexBackend;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedDoc {
    pub tenant_domain: String,
    pub submitted_at: SystemTime,
    /// 被提交的次数（重复提交 = 重新索引）
    pub submissions: u64,
}

/// 后端收到的操作（按调用顺序）
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexOp {
    Submit { tenant_id: i32, path: String },
    Remove { tenant_id: i32, path: String },
}

/// 内存索引后端（DashMap 实现）
///
/// 可选开启操作日志，用于观察分发顺序。
pub struct MemoryIndex {
    pub inner: DashMap<(i32, String), IndexedDoc>,
    journal: Mutex<Option<Vec<IndexOp>>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self {
            inner: DashMap::new(),
            journal: Mutex::new(None),
        }
    }

    pub fn with_journal() -> Self {
        Self {
            inner: DashMap::new(),
            journal: Mutex::new(Some(Vec::new())),
        }
    }

    pub fn contains(&self, tenant_id: i32, path: &str) -> bool {
        self.inner.contains_key(&(tenant_id, path.to_string()))
    }

    pub fn get(&self, tenant_id: i32, path: &str) -> Option<IndexedDoc> {
        self.inner
            .get(&(tenant_id, path.to_string()))
            .map(|d| d.value().clone())
    }

    pub fn doc_count(&self, tenant_id: i32) -> usize {
        self.inner.iter().filter(|e| e.key().0 == tenant_id).count()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// 取出并清空操作日志
    pub fn take_journal(&self) -> Vec<IndexOp> {
        self.journal
            .lock()
            .as_mut()
            .map(std::mem::take)
            .unwrap_or_default()
    }

    /// 卸载某租户的全部内存索引状态，返回释放的文档数
    pub fn evict_tenant(&self, tenant_id: i32) -> usize {
        let before = self.inner.len();
        self.inner.retain(|k, _| k.0 != tenant_id);
        before - self.inner.len()
    }

    fn record(&self, op: IndexOp) {
        if let Some(j) = self.journal.lock().as_mut() {
            j.push(op);
        }
    }
}

impl Default for MemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexBackend for MemoryIndex {
    fn submit_for_indexing(&self, ctx: &TenantContext, path: &str) -> Result<()> {
        self.record(IndexOp::Submit {
            tenant_id: ctx.tenant_id,
            path: path.to_string(),
        });
        let now = SystemTime::now();
        self.inner
            .entry((ctx.tenant_id, path.to_string()))
            .and_modify(|d| {
                d.submitted_at = now;
                d.submissions += 1;
            })
            .or_insert_with(|| IndexedDoc {
                tenant_domain: ctx.tenant_domain.clone(),
                submitted_at: now,
                submissions: 1,
            });
        Ok(())
    }

    fn remove_from_index(&self, path: &str, tenant_id: i32) -> Result<()> {
        self.record(IndexOp::Remove {
            tenant_id,
            path: path.to_string(),
        });
        self.inner.remove(&(tenant_id, path.to_string()));
        Ok(())
    }
}
