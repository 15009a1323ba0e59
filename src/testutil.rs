//! 测试用的假协作方
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::core::{LogEntry, TenantContext};
use crate::error::{Result, ScanError};
use crate::event::LogSource;
use crate::index::{AccessAction, IndexBackend, MemoryIndex, ResourceAccess};
use crate::storage::CheckpointStore;

/// 可编排的鉴权 / 存在性检查
#[derive(Default)]
pub struct ScriptedAccess {
    denied: HashSet<String>,
    missing: HashSet<String>,
    broken: HashSet<String>,
    pub checks: AtomicUsize,
}

impl ScriptedAccess {
    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn deny(mut self, path: &str) -> Self {
        self.denied.insert(path.to_string());
        self
    }

    pub fn missing(mut self, path: &str) -> Self {
        self.missing.insert(path.to_string());
        self
    }

    /// 检查本身报错
    pub fn broken(mut self, path: &str) -> Self {
        self.broken.insert(path.to_string());
        self
    }
}

impl ResourceAccess for ScriptedAccess {
    fn is_authorized(&self, _ctx: &TenantContext, path: &str, _: AccessAction) -> Result<bool> {
        self.checks.fetch_add(1, Ordering::Relaxed);
        if self.broken.contains(path) {
            return Err(ScanError::access(path, "realm unavailable"));
        }
        Ok(!self.denied.contains(path))
    }

    fn resource_exists(&self, _ctx: &TenantContext, path: &str) -> Result<bool> {
        self.checks.fetch_add(1, Ordering::Relaxed);
        Ok(!self.missing.contains(path))
    }
}

/// 对指定路径的提交失败，其余转给内存索引
pub struct FlakyIndex {
    pub inner: MemoryIndex,
    fail_paths: HashSet<String>,
}

impl FlakyIndex {
    pub fn failing_on<'a>(paths: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            inner: MemoryIndex::with_journal(),
            fail_paths: paths.into_iter().map(str::to_string).collect(),
        }
    }
}

impl IndexBackend for FlakyIndex {
    fn submit_for_indexing(&self, ctx: &TenantContext, path: &str) -> Result<()> {
        if self.fail_paths.contains(path) {
            return Err(ScanError::indexing(path, "indexer rejected document"));
        }
        self.inner.submit_for_indexing(ctx, path)
    }

    fn remove_from_index(&self, path: &str, tenant_id: i32) -> Result<()> {
        if self.fail_paths.contains(path) {
            return Err(ScanError::indexing(path, "indexer unavailable"));
        }
        self.inner.remove_from_index(path, tenant_id)
    }
}

/// 对指定路径直接 panic 的后端（模拟实现里的 bug）
pub struct PanickyIndex {
    pub inner: MemoryIndex,
    panic_path: String,
}

impl PanickyIndex {
    pub fn panicking_on(path: &str) -> Self {
        Self {
            inner: MemoryIndex::with_journal(),
            panic_path: path.to_string(),
        }
    }
}

impl IndexBackend for PanickyIndex {
    fn submit_for_indexing(&self, ctx: &TenantContext, path: &str) -> Result<()> {
        if path == self.panic_path {
            panic!("indexer crashed on {}", path);
        }
        self.inner.submit_for_indexing(ctx, path)
    }

    fn remove_from_index(&self, path: &str, tenant_id: i32) -> Result<()> {
        if path == self.panic_path {
            panic!("indexer crashed on {}", path);
        }
        self.inner.remove_from_index(path, tenant_id)
    }
}

/// 总是失败的日志源
pub struct FailingLog;

impl LogSource for FailingLog {
    fn fetch_entries(&self, tenant_id: i32, _: SystemTime, _: SystemTime) -> Result<Vec<LogEntry>> {
        Err(ScanError::lookup(tenant_id, "audit store unreachable"))
    }
}

/// 对指定租户失败，其余转发
pub struct PartialLog<L> {
    pub inner: L,
    failing: Mutex<HashSet<i32>>,
}

impl<L: LogSource> PartialLog<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail_tenant(&self, tenant_id: i32) {
        self.failing.lock().insert(tenant_id);
    }

    pub fn recover_tenant(&self, tenant_id: i32) {
        self.failing.lock().remove(&tenant_id);
    }
}

impl<L: LogSource> LogSource for PartialLog<L> {
    fn fetch_entries(
        &self,
        tenant_id: i32,
        since: SystemTime,
        until: SystemTime,
    ) -> Result<Vec<LogEntry>> {
        if self.failing.lock().contains(&tenant_id) {
            return Err(ScanError::lookup(tenant_id, "audit store unreachable"));
        }
        self.inner.fetch_entries(tenant_id, since, until)
    }
}

/// 统计写次数，可注入写失败
pub struct CountingCheckpoints<S> {
    inner: S,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl<S: CheckpointStore> CountingCheckpoints<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            writes: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl<S: CheckpointStore> CheckpointStore for CountingCheckpoints<S> {
    fn get(&self, tenant_id: i32) -> Result<SystemTime> {
        self.inner.get(tenant_id)
    }

    fn set(&self, tenant_id: i32, at: SystemTime) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ScanError::lookup(tenant_id, "checkpoint store read-only"));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(tenant_id, at)
    }

    fn location(&self) -> &str {
        self.inner.location()
    }
}

/// 日志写入共享缓冲区
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// 在 trace 级别运行 `f`，返回期间输出的日志文本
pub fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
    let buf = LogBuffer::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let out = tracing::subscriber::with_default(subscriber, f);
    let text = String::from_utf8_lossy(&buf.0.lock()).into_owned();
    (out, text)
}
