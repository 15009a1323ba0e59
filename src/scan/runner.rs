use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use crate::core::TenantContext;
use crate::scan::shutdown::ShutdownSignal;
use crate::scan::tenant::{ScanOutcome, TenantScanner};
use crate::stats::TickReport;
use crate::tenant::TenantDirectory;

/// 周期调度入口：根租户优先，然后按目录顺序逐个扫描其余租户
///
/// 单 worker、租户串行；除持久化的 checkpoint 外无跨轮状态。
pub struct IndexingRunner {
    scanner: TenantScanner,
    directory: Arc<dyn TenantDirectory>,
    root: TenantContext,
    shutdown: ShutdownSignal,
}

impl IndexingRunner {
    pub fn new(
        scanner: TenantScanner,
        directory: Arc<dyn TenantDirectory>,
        root: TenantContext,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            scanner,
            directory,
            root,
            shutdown,
        }
    }

    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// 执行一轮
    pub fn run_once(&self) -> TickReport {
        let mut report = TickReport::default();

        if self.scan_one(&self.root, &mut report) {
            match self.directory.list_active_tenants() {
                Ok(tenants) => {
                    for ctx in tenants {
                        if ctx.tenant_id == self.root.tenant_id {
                            continue;
                        }
                        if !self.scan_one(&ctx, &mut report) {
                            break;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Unable to list tenants, only the root tenant was scanned: {}", e);
                    report.directory_unavailable = true;
                }
            }
        }

        // 本轮已无在途工作
        if self.shutdown.is_stop_requested() {
            self.shutdown.mark_drained();
        }
        report
    }

    /// 扫描一个租户（每个租户独立的上下文）；返回 false 表示应停止本轮
    fn scan_one(&self, ctx: &TenantContext, report: &mut TickReport) -> bool {
        let ctx = ctx.clone();
        let scanned = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.scanner.scan(&ctx, &self.shutdown)
        }));

        let outcome = match scanned {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::error!(
                    "Scan of tenant {} panicked, checkpoint unchanged",
                    ctx.tenant_id
                );
                report.tenants_failed += 1;
                return true;
            }
        };

        if outcome.advanced() {
            report.checkpoints_advanced += 1;
        }
        match outcome {
            ScanOutcome::Completed { evicted, stats, .. } => {
                report.tenants_completed += 1;
                if evicted {
                    report.tenants_evicted += 1;
                }
                report.entries.merge(&stats);
            }
            ScanOutcome::Skipped => report.tenants_skipped += 1,
            ScanOutcome::Failed { .. } => report.tenants_failed += 1,
            ScanOutcome::Interrupted => {
                report.tenants_interrupted += 1;
                self.shutdown.mark_drained();
                return false;
            }
        }
        true
    }

    /// 周期循环：先等 initial_delay，然后每 interval 跑一轮（在阻塞线程池上），
    /// 收到停止请求后退出并上报排空。
    pub async fn run_periodic(self: Arc<Self>, interval: Duration, initial_delay: Duration) {
        tokio::select! {
            _ = tokio::time::sleep(initial_delay) => {},
            _ = self.shutdown.cancelled() => {
                self.shutdown.mark_drained();
                return;
            }
        }

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {},
                _ = self.shutdown.cancelled() => break,
            }

            let runner = self.clone();
            match tokio::task::spawn_blocking(move || runner.run_once()).await {
                Ok(report) if report.is_idle() => {
                    tracing::debug!("Indexing tick idle: {:?}", report);
                }
                Ok(report) => tracing::info!("\n{}", report),
                Err(e) => tracing::error!("Indexing tick failed to complete: {}", e),
            }
        }

        self.shutdown.mark_drained();
    }
}
