use serde::Serialize;
use std::fmt;

use crate::index::DispatchOutcome;

/// 单租户单轮的条目计数
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct EntryStats {
    /// 原始拉取条数（折叠前）
    pub fetched: usize,
    /// 折叠后条数
    pub collapsed: usize,
    /// submit 调用次数（move / copy 各算一次）
    pub submitted: usize,
    /// remove 调用次数（move 带旧路径时算一次）
    pub removed: usize,
    /// 鉴权 / 存在性 / 哨兵等静默跳过
    pub skipped: usize,
    /// 单条失败（已隔离）
    pub failed: usize,
}

impl EntryStats {
    pub fn record(&mut self, outcome: &DispatchOutcome) {
        match outcome {
            DispatchOutcome::Submitted { .. } | DispatchOutcome::Copied { .. } => {
                self.submitted += 1
            }
            DispatchOutcome::Removed { .. } => self.removed += 1,
            DispatchOutcome::Moved { old_path, .. } => {
                self.submitted += 1;
                if old_path.is_some() {
                    self.removed += 1;
                }
            }
            DispatchOutcome::Skipped(_) => self.skipped += 1,
        }
    }

    pub fn merge(&mut self, other: &EntryStats) {
        self.fetched += other.fetched;
        self.collapsed += other.collapsed;
        self.submitted += other.submitted;
        self.removed += other.removed;
        self.skipped += other.skipped;
        self.failed += other.failed;
    }
}

/// 一次 run_once 的汇总
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub tenants_completed: usize,
    pub tenants_skipped: usize,
    pub tenants_interrupted: usize,
    pub tenants_failed: usize,
    /// checkpoint 前移的租户数
    pub checkpoints_advanced: usize,
    /// 驱逐内存索引的租户数
    pub tenants_evicted: usize,
    /// 租户目录不可用，本轮只扫了根租户
    pub directory_unavailable: bool,
    pub entries: EntryStats,
}

impl TickReport {
    pub fn is_idle(&self) -> bool {
        self.entries.fetched == 0
            && self.tenants_failed == 0
            && self.tenants_evicted == 0
            && !self.directory_unavailable
    }
}

impl fmt::Display for TickReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "╔══════════════════════════════════════════════════╗")?;
        writeln!(f, "║           audit-indexer Tick Report              ║")?;
        writeln!(f, "╠══════════════════════════════════════════════════╣")?;
        writeln!(f, "║ Tenants:                                         ║")?;
        writeln!(f, "║   completed:    {:>10}                       ║", self.tenants_completed)?;
        writeln!(f, "║   skipped:      {:>10}                       ║", self.tenants_skipped)?;
        writeln!(f, "║   interrupted:  {:>10}                       ║", self.tenants_interrupted)?;
        writeln!(f, "║   failed:       {:>10}                       ║", self.tenants_failed)?;
        writeln!(f, "║   advanced:     {:>10}                       ║", self.checkpoints_advanced)?;
        writeln!(f, "║   evicted:      {:>10}                       ║", self.tenants_evicted)?;
        writeln!(f, "╠──────────────────────────────────────────────────╣")?;
        writeln!(f, "║ Entries:                                         ║")?;
        writeln!(f, "║   fetched:      {:>10}                       ║", self.entries.fetched)?;
        writeln!(f, "║   collapsed:    {:>10}                       ║", self.entries.collapsed)?;
        writeln!(f, "║   submitted:    {:>10}                       ║", self.entries.submitted)?;
        writeln!(f, "║   removed:      {:>10}                       ║", self.entries.removed)?;
        writeln!(f, "║   skipped:      {:>10}                       ║", self.entries.skipped)?;
        writeln!(f, "║   failed:       {:>10}                       ║", self.entries.failed)?;
        if self.directory_unavailable {
            writeln!(f, "╠──────────────────────────────────────────────────╣")?;
            writeln!(f, "║ tenant directory unavailable: root tenant only   ║")?;
        }
        writeln!(f, "╚══════════════════════════════════════════════════╝")?;
        Ok(())
    }
}
