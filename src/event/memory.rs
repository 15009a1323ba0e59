use dashmap::DashMap;
use std::time::SystemTime;

use crate::core::LogEntry;
use crate::error::Result;
use crate::event::{window, LogSource};

/// 内存审计日志（按租户分桶）
#[derive(Default)]
pub struct MemoryLogSource {
    inner: DashMap<i32, Vec<LogEntry>>,
}

impl MemoryLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, tenant_id: i32, entry: LogEntry) {
        self.inner.entry(tenant_id).or_default().push(entry);
    }

    pub fn extend(&self, tenant_id: i32, entries: impl IntoIterator<Item = LogEntry>) {
        self.inner.entry(tenant_id).or_default().extend(entries);
    }

    pub fn len(&self, tenant_id: i32) -> usize {
        self.inner.get(&tenant_id).map(|v| v.len()).unwrap_or(0)
    }
}

impl LogSource for MemoryLogSource {
    fn fetch_entries(
        &self,
        tenant_id: i32,
        since: SystemTime,
        until: SystemTime,
    ) -> Result<Vec<LogEntry>> {
        Ok(self
            .inner
            .get(&tenant_id)
            .map(|v| window(v.iter(), since, until))
            .unwrap_or_default())
    }
}
