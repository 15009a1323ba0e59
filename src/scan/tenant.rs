use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::SystemTime;

use crate::core::{collapse, LogEntry, TenantContext};
use crate::error::ScanError;
use crate::event::LogSource;
use crate::index::{Dispatcher, IndexBackend, ResourceAccess};
use crate::scan::shutdown::ShutdownSignal;
use crate::stats::EntryStats;
use crate::storage::CheckpointStore;
use crate::tenant::TenantDirectory;

/// 单租户单轮扫描的阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanState {
    Idle,
    FetchingLog,
    Collapsing,
    Dispatching,
    Advancing,
}

/// 单租户单轮扫描的结果
///
/// 只有 `Completed` 可能写 checkpoint；其余三种 checkpoint 保持不变。
#[derive(Debug)]
pub enum ScanOutcome {
    Completed {
        previous: SystemTime,
        checkpoint: SystemTime,
        evicted: bool,
        stats: EntryStats,
    },
    /// 租户不可索引
    Skipped,
    /// 关停请求已到达
    Interrupted,
    Failed { stage: ScanState, error: ScanError },
}

impl ScanOutcome {
    pub fn advanced(&self) -> bool {
        matches!(self, Self::Completed { previous, checkpoint, .. } if checkpoint > previous)
    }
}

/// 一轮拉取的中间结果：折叠后的条目 + 水位候选（原始拉取中最新的时间戳）
pub struct ScanResult<'a> {
    pub collapsed: Vec<&'a LogEntry>,
    pub watermark: Option<SystemTime>,
}

impl<'a> ScanResult<'a> {
    pub fn from_fetch(entries: &'a [LogEntry]) -> Self {
        Self {
            watermark: entries.iter().map(|e| e.timestamp).max(),
            collapsed: collapse(entries),
        }
    }

    /// 新 checkpoint = max(旧值, 水位候选)
    pub fn next_checkpoint(&self, previous: SystemTime) -> SystemTime {
        match self.watermark {
            Some(w) if w > previous => w,
            _ => previous,
        }
    }
}

/// 单租户扫描：拉取 → 折叠 → 分发 → 前移 checkpoint
pub struct TenantScanner {
    log: Arc<dyn LogSource>,
    checkpoints: Arc<dyn CheckpointStore>,
    directory: Arc<dyn TenantDirectory>,
    dispatcher: Dispatcher,
}

impl TenantScanner {
    pub fn new(
        log: Arc<dyn LogSource>,
        checkpoints: Arc<dyn CheckpointStore>,
        directory: Arc<dyn TenantDirectory>,
        index: Arc<dyn IndexBackend>,
        access: Arc<dyn ResourceAccess>,
    ) -> Self {
        let dispatcher = Dispatcher::new(index, access, checkpoints.location());
        Self {
            log,
            checkpoints,
            directory,
            dispatcher,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn scan(&self, ctx: &TenantContext, shutdown: &ShutdownSignal) -> ScanOutcome {
        if shutdown.is_stop_requested() {
            tracing::debug!("Stop requested, not scanning tenant {}", ctx.tenant_id);
            return ScanOutcome::Interrupted;
        }
        if !self.directory.is_tenant_eligible_for_indexing(ctx.tenant_id) {
            tracing::debug!("Tenant {} is not eligible for indexing", ctx.tenant_id);
            return ScanOutcome::Skipped;
        }

        let mut state = ScanState::Idle;
        match self.scan_inner(ctx, &mut state) {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::warn!(
                    "Scan of tenant {} aborted while {:?}, checkpoint unchanged: {}",
                    ctx.tenant_id,
                    state,
                    error
                );
                ScanOutcome::Failed {
                    stage: state,
                    error,
                }
            }
        }
    }

    fn scan_inner(
        &self,
        ctx: &TenantContext,
        state: &mut ScanState,
    ) -> Result<ScanOutcome, ScanError> {
        let tenant_id = ctx.tenant_id;

        *state = ScanState::FetchingLog;
        let previous = self.checkpoints.get(tenant_id)?;
        let entries = self
            .log
            .fetch_entries(tenant_id, previous, SystemTime::now())?;

        let mut stats = EntryStats {
            fetched: entries.len(),
            ..Default::default()
        };

        if entries.is_empty() {
            tracing::trace!(
                "[tenant {}] last successfully indexed activity time is {:?}",
                tenant_id,
                previous
            );
            let evicted = self.maybe_evict(ctx);
            return Ok(ScanOutcome::Completed {
                previous,
                checkpoint: previous,
                evicted,
                stats,
            });
        }

        *state = ScanState::Collapsing;
        let result = ScanResult::from_fetch(&entries);
        stats.collapsed = result.collapsed.len();

        *state = ScanState::Dispatching;
        for entry in &result.collapsed {
            let dispatched =
                std::panic::catch_unwind(AssertUnwindSafe(|| self.dispatcher.dispatch(ctx, entry)));
            match dispatched {
                Ok(Ok(outcome)) => {
                    tracing::debug!("[tenant {}] {:?}", tenant_id, outcome);
                    stats.record(&outcome);
                }
                Ok(Err(e)) => {
                    stats.failed += 1;
                    tracing::warn!(
                        "An error occurred while submitting the resource for indexing, path: {}: {}",
                        entry.resource_path,
                        e
                    );
                }
                Err(_) => {
                    stats.failed += 1;
                    tracing::warn!(
                        "Indexing panicked for path {}, continuing with the next entry",
                        entry.resource_path
                    );
                }
            }
        }

        *state = ScanState::Advancing;
        let checkpoint = result.next_checkpoint(previous);
        if checkpoint != previous {
            self.checkpoints.set(tenant_id, checkpoint)?;
        }
        tracing::trace!(
            "[tenant {}] last successfully indexed activity time is {:?}",
            tenant_id,
            checkpoint
        );
        *state = ScanState::Idle;

        Ok(ScanOutcome::Completed {
            previous,
            checkpoint,
            evicted: false,
            stats,
        })
    }

    /// 空窗口：匿名访问隐式加载的租户索引卸载掉；根租户永不卸载
    fn maybe_evict(&self, ctx: &TenantContext) -> bool {
        if ctx.is_root() {
            return false;
        }
        if self.directory.loaded_from_login(ctx.tenant_id) == Some(false) {
            tracing::info!(
                "No activity for implicitly loaded tenant {}, unloading its index",
                ctx.tenant_id
            );
            self.directory.evict_tenant_index(ctx.tenant_id);
            return true;
        }
        false
    }
}
