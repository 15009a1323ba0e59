pub mod memory;

use std::time::SystemTime;

use crate::core::LogEntry;
use crate::error::Result;

pub use memory::MemoryLogSource;

/// 审计日志源（只追加，按时间区间查询）
///
/// ## 契约
/// - 返回 `(since, until]` 内的条目，最老在前。
/// - 读取失败返回 `ScanError::Lookup`。
pub trait LogSource: Send + Sync {
    fn fetch_entries(
        &self,
        tenant_id: i32,
        since: SystemTime,
        until: SystemTime,
    ) -> Result<Vec<LogEntry>>;
}

/// 区间过滤 + 升序（稳定排序，同时间戳保持追加顺序）
pub(crate) fn window<'a>(
    entries: impl IntoIterator<Item = &'a LogEntry>,
    since: SystemTime,
    until: SystemTime,
) -> Vec<LogEntry> {
    let mut out: Vec<LogEntry> = entries
        .into_iter()
        .filter(|e| e.timestamp > since && e.timestamp <= until)
        .cloned()
        .collect();
    out.sort_by_key(|e| e.timestamp);
    out
}
