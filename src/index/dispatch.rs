use std::sync::Arc;

use crate::core::{ActionEffect, LogEntry, TenantContext};
use crate::error::Result;
use crate::index::{AccessAction, IndexBackend, ResourceAccess};

/// 单条记录的分发结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Submitted { path: String },
    Removed { path: String },
    Moved { path: String, old_path: Option<String> },
    Copied { path: String },
    Skipped(SkipReason),
}

/// 静默跳过的原因（不是错误）
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// checkpoint 自身的存储路径
    Sentinel,
    NotActionable,
    Unauthorized,
    Missing,
    /// copy 没有目标路径
    MissingActionData,
}

/// 折叠后的条目 → 索引后端调用
pub struct Dispatcher {
    index: Arc<dyn IndexBackend>,
    access: Arc<dyn ResourceAccess>,
    sentinel: String,
}

impl Dispatcher {
    pub fn new(
        index: Arc<dyn IndexBackend>,
        access: Arc<dyn ResourceAccess>,
        sentinel: impl Into<String>,
    ) -> Self {
        Self {
            index,
            access,
            sentinel: sentinel.into(),
        }
    }

    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// 分发一条记录。
    ///
    /// 鉴权 / 存在性不通过时返回 `Skipped`；任何后端或检查失败以 `Err` 返回，
    /// 由调用方按条隔离。
    pub fn dispatch(&self, ctx: &TenantContext, entry: &LogEntry) -> Result<DispatchOutcome> {
        let path = entry.resource_path.as_str();
        if path == self.sentinel {
            return Ok(DispatchOutcome::Skipped(SkipReason::Sentinel));
        }
        let Some(plan) = entry.action.plan() else {
            return Ok(DispatchOutcome::Skipped(SkipReason::NotActionable));
        };

        if plan.needs_auth_check && !self.access.is_authorized(ctx, path, AccessAction::Read)? {
            return Ok(DispatchOutcome::Skipped(SkipReason::Unauthorized));
        }
        if plan.needs_existence_check && !self.access.resource_exists(ctx, path)? {
            return Ok(DispatchOutcome::Skipped(SkipReason::Missing));
        }

        let outcome = match plan.effect {
            ActionEffect::Submit => {
                self.index.submit_for_indexing(ctx, path)?;
                DispatchOutcome::Submitted {
                    path: path.to_string(),
                }
            }
            ActionEffect::Remove => {
                self.index.remove_from_index(path, ctx.tenant_id)?;
                DispatchOutcome::Removed {
                    path: path.to_string(),
                }
            }
            ActionEffect::Move => {
                self.index.submit_for_indexing(ctx, path)?;
                if let Some(old) = entry.action_data.as_deref() {
                    self.index.remove_from_index(old, ctx.tenant_id)?;
                } else {
                    tracing::debug!("Move of {} carries no source path, nothing to remove", path);
                }
                DispatchOutcome::Moved {
                    path: path.to_string(),
                    old_path: entry.action_data.clone(),
                }
            }
            ActionEffect::Copy => {
                let Some(target) = entry.action_data.as_deref() else {
                    return Ok(DispatchOutcome::Skipped(SkipReason::MissingActionData));
                };
                self.index.submit_for_indexing(ctx, target)?;
                DispatchOutcome::Copied {
                    path: target.to_string(),
                }
            }
        };

        match &outcome {
            DispatchOutcome::Removed { path } => tracing::info!(
                "Resource {}: [tenant {}] {} will be deleted from the index",
                entry.action.describe(),
                ctx.tenant_id,
                path
            ),
            DispatchOutcome::Submitted { path }
            | DispatchOutcome::Moved { path, .. }
            | DispatchOutcome::Copied { path } => tracing::info!(
                "Resource {}: [tenant {}] {} has been submitted for indexing",
                entry.action.describe(),
                ctx.tenant_id,
                path
            ),
            DispatchOutcome::Skipped(_) => {}
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ActionKind;
    use crate::error::ScanError;
    use crate::index::{IndexOp, MemoryIndex};
    use crate::testutil::{FlakyIndex, ScriptedAccess};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    const SENTINEL: &str = "/_system/indexing/lastaccesstime";

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn setup(access: ScriptedAccess) -> (Arc<MemoryIndex>, Dispatcher) {
        let index = Arc::new(MemoryIndex::with_journal());
        let d = Dispatcher::new(index.clone(), Arc::new(access), SENTINEL);
        (index, d)
    }

    fn ctx() -> TenantContext {
        TenantContext::new(7, "t7.com")
    }

    fn submit(path: &str) -> IndexOp {
        IndexOp::Submit {
            tenant_id: 7,
            path: path.into(),
        }
    }

    fn remove(path: &str) -> IndexOp {
        IndexOp::Remove {
            tenant_id: 7,
            path: path.into(),
        }
    }

    #[test]
    fn update_submits_resource_path() {
        let (index, d) = setup(ScriptedAccess::allow_all());
        let out = d
            .dispatch(&ctx(), &LogEntry::new("/a", ActionKind::Update, at(1)))
            .unwrap();
        assert_eq!(out, DispatchOutcome::Submitted { path: "/a".into() });
        assert_eq!(index.take_journal(), vec![submit("/a")]);
    }

    #[test]
    fn delete_removes_without_checks() {
        // 资源已不存在且无权限：delete 仍然执行
        let (index, d) = setup(ScriptedAccess::allow_all().deny("/gone").missing("/gone"));
        let out = d
            .dispatch(&ctx(), &LogEntry::new("/gone", ActionKind::Delete, at(1)))
            .unwrap();
        assert_eq!(out, DispatchOutcome::Removed { path: "/gone".into() });
        assert_eq!(index.take_journal(), vec![remove("/gone")]);
    }

    #[test]
    fn delete_move_copy_never_consult_access() {
        let access = Arc::new(ScriptedAccess::allow_all());
        let index = Arc::new(MemoryIndex::new());
        let d = Dispatcher::new(index, access.clone(), SENTINEL);
        d.dispatch(&ctx(), &LogEntry::new("/a", ActionKind::Delete, at(1)))
            .unwrap();
        d.dispatch(&ctx(), &LogEntry::new("/b", ActionKind::Move, at(2)).with_data("/c"))
            .unwrap();
        d.dispatch(&ctx(), &LogEntry::new("/d", ActionKind::Copy, at(3)).with_data("/e"))
            .unwrap();
        assert_eq!(access.checks.load(std::sync::atomic::Ordering::Relaxed), 0);

        d.dispatch(&ctx(), &LogEntry::new("/f", ActionKind::Tag, at(4)))
            .unwrap();
        assert_eq!(access.checks.load(std::sync::atomic::Ordering::Relaxed), 2);
    }

    #[test]
    fn move_submits_new_and_removes_old() {
        let (index, d) = setup(ScriptedAccess::allow_all());
        let entry = LogEntry::new("/a", ActionKind::Move, at(1)).with_data("/old");
        let out = d.dispatch(&ctx(), &entry).unwrap();
        assert_eq!(
            out,
            DispatchOutcome::Moved {
                path: "/a".into(),
                old_path: Some("/old".into())
            }
        );
        assert_eq!(index.take_journal(), vec![submit("/a"), remove("/old")]);
    }

    #[test]
    fn move_without_source_only_submits() {
        let (index, d) = setup(ScriptedAccess::allow_all());
        d.dispatch(&ctx(), &LogEntry::new("/a", ActionKind::Move, at(1)))
            .unwrap();
        assert_eq!(index.take_journal(), vec![submit("/a")]);
    }

    #[test]
    fn copy_submits_target_only() {
        let (index, d) = setup(ScriptedAccess::allow_all());
        let entry = LogEntry::new("/a", ActionKind::Copy, at(1)).with_data("/x");
        let out = d.dispatch(&ctx(), &entry).unwrap();
        assert_eq!(out, DispatchOutcome::Copied { path: "/x".into() });
        assert_eq!(index.take_journal(), vec![submit("/x")]);
        assert!(!index.contains(7, "/a"));

        let bare = LogEntry::new("/a", ActionKind::Copy, at(2));
        assert_eq!(
            d.dispatch(&ctx(), &bare).unwrap(),
            DispatchOutcome::Skipped(SkipReason::MissingActionData)
        );
        assert!(index.take_journal().is_empty());
    }

    #[test]
    fn unauthorized_or_missing_update_is_silently_dropped() {
        let (index, d) = setup(ScriptedAccess::allow_all().deny("/secret").missing("/gone"));
        assert_eq!(
            d.dispatch(&ctx(), &LogEntry::new("/secret", ActionKind::Update, at(1)))
                .unwrap(),
            DispatchOutcome::Skipped(SkipReason::Unauthorized)
        );
        assert_eq!(
            d.dispatch(&ctx(), &LogEntry::new("/gone", ActionKind::Update, at(2)))
                .unwrap(),
            DispatchOutcome::Skipped(SkipReason::Missing)
        );
        assert!(index.take_journal().is_empty());
    }

    #[test]
    fn sentinel_is_never_dispatched() {
        let (index, d) = setup(ScriptedAccess::allow_all());
        for kind in [ActionKind::Update, ActionKind::Delete, ActionKind::Move] {
            let entry = LogEntry::new(SENTINEL, kind, at(1)).with_data("/elsewhere");
            assert_eq!(
                d.dispatch(&ctx(), &entry).unwrap(),
                DispatchOutcome::Skipped(SkipReason::Sentinel)
            );
        }
        assert!(index.take_journal().is_empty());
    }

    #[test]
    fn non_actionable_kind_is_skipped() {
        let (index, d) = setup(ScriptedAccess::allow_all());
        assert_eq!(
            d.dispatch(&ctx(), &LogEntry::new("/a", ActionKind::Rating, at(1)))
                .unwrap(),
            DispatchOutcome::Skipped(SkipReason::NotActionable)
        );
        assert!(index.take_journal().is_empty());
    }

    #[test]
    fn backend_and_check_failures_surface_as_errors() {
        let index = Arc::new(FlakyIndex::failing_on(["/bad"]));
        let d = Dispatcher::new(
            index.clone(),
            Arc::new(ScriptedAccess::allow_all().broken("/broken")),
            SENTINEL,
        );
        let err = d
            .dispatch(&ctx(), &LogEntry::new("/bad", ActionKind::Add, at(1)))
            .unwrap_err();
        assert!(matches!(err, ScanError::Indexing { .. }));

        let err = d
            .dispatch(&ctx(), &LogEntry::new("/broken", ActionKind::Add, at(1)))
            .unwrap_err();
        assert!(matches!(err, ScanError::Access { .. }));
        assert!(err.is_entry_scoped());
    }
}
