use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 审计日志动作类型
///
/// 前 13 种是可索引动作（会产生索引副作用），其余一律被引擎忽略。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Add,
    Update,
    Delete,
    DeleteComment,
    RemoveAssociation,
    RemoveTag,
    Tag,
    Comment,
    AddAssociation,
    Move,
    Copy,
    Rename,
    Restore,
    // 以下不可索引
    Rating,
    CreateSymbolicLink,
    RemoveSymbolicLink,
    CreateRemoteLink,
    RemoveRemoteLink,
    Other(u16),
}

/// 一条记录最终落到索引后端的效果
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionEffect {
    /// submit(resource_path)
    Submit,
    /// remove(resource_path)
    Remove,
    /// submit(resource_path) + remove(action_data)
    Move,
    /// submit(action_data)，resource_path 不动
    Copy,
}

/// 动作 → 分发规则
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActionPlan {
    pub needs_auth_check: bool,
    pub needs_existence_check: bool,
    pub effect: ActionEffect,
}

impl ActionPlan {
    const fn gated(effect: ActionEffect) -> Self {
        Self {
            needs_auth_check: true,
            needs_existence_check: true,
            effect,
        }
    }

    const fn ungated(effect: ActionEffect) -> Self {
        Self {
            needs_auth_check: false,
            needs_existence_check: false,
            effect,
        }
    }
}

impl ActionKind {
    /// 分发表；`None` 表示不可索引
    pub fn plan(self) -> Option<ActionPlan> {
        use ActionKind::*;
        match self {
            // 资源已经不存在：不做鉴权 / 存在性检查
            Delete => Some(ActionPlan::ungated(ActionEffect::Remove)),
            Move => Some(ActionPlan::ungated(ActionEffect::Move)),
            Copy => Some(ActionPlan::ungated(ActionEffect::Copy)),
            Add | Update | DeleteComment | RemoveAssociation | RemoveTag | Tag | Comment
            | AddAssociation | Rename | Restore => Some(ActionPlan::gated(ActionEffect::Submit)),
            Rating | CreateSymbolicLink | RemoveSymbolicLink | CreateRemoteLink
            | RemoveRemoteLink | Other(_) => None,
        }
    }

    pub fn is_actionable(self) -> bool {
        self.plan().is_some()
    }

    /// 日志用的动词
    pub fn describe(self) -> &'static str {
        use ActionKind::*;
        match self {
            Add => "inserted",
            Update => "updated",
            Delete => "deleted",
            DeleteComment => "comment deleted",
            RemoveAssociation => "association removed",
            RemoveTag => "tag removed",
            Tag => "tag added",
            Comment => "comment added",
            AddAssociation => "association added",
            Move => "moved",
            Copy => "copied",
            Rename => "renamed",
            Restore => "restored",
            _ => "ignored",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ActionKind::*;
        let s = match self {
            Add => "add",
            Update => "update",
            Delete => "delete",
            DeleteComment => "delete-comment",
            RemoveAssociation => "remove-association",
            RemoveTag => "remove-tag",
            Tag => "tag",
            Comment => "comment",
            AddAssociation => "add-association",
            Move => "move",
            Copy => "copy",
            Rename => "rename",
            Restore => "restore",
            Rating => "rating",
            CreateSymbolicLink => "create-symlink",
            RemoveSymbolicLink => "remove-symlink",
            CreateRemoteLink => "create-remote-link",
            RemoveRemoteLink => "remove-remote-link",
            Other(code) => return write!(f, "other-{}", code),
        };
        f.write_str(s)
    }
}

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use ActionKind::*;
        let kind = match s.to_ascii_lowercase().as_str() {
            "add" => Add,
            "update" => Update,
            "delete" => Delete,
            "delete-comment" => DeleteComment,
            "remove-association" => RemoveAssociation,
            "remove-tag" => RemoveTag,
            "tag" => Tag,
            "comment" => Comment,
            "add-association" => AddAssociation,
            "move" => Move,
            "copy" => Copy,
            "rename" => Rename,
            "restore" => Restore,
            "rating" => Rating,
            "create-symlink" => CreateSymbolicLink,
            "remove-symlink" => RemoveSymbolicLink,
            "create-remote-link" => CreateRemoteLink,
            "remove-remote-link" => RemoveRemoteLink,
            other => match other.strip_prefix("other-").map(str::parse::<u16>) {
                Some(Ok(code)) => Other(code),
                _ => return Err(format!("unknown action kind: {}", s)),
            },
        };
        Ok(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_move_copy_skip_checks() {
        for kind in [ActionKind::Delete, ActionKind::Move, ActionKind::Copy] {
            let plan = kind.plan().unwrap();
            assert!(!plan.needs_auth_check);
            assert!(!plan.needs_existence_check);
        }
        assert_eq!(ActionKind::Move.plan().unwrap().effect, ActionEffect::Move);
        assert_eq!(ActionKind::Copy.plan().unwrap().effect, ActionEffect::Copy);
        assert_eq!(ActionKind::Delete.plan().unwrap().effect, ActionEffect::Remove);
    }

    #[test]
    fn submit_kinds_are_gated() {
        let kinds = [
            ActionKind::Add,
            ActionKind::Update,
            ActionKind::DeleteComment,
            ActionKind::RemoveAssociation,
            ActionKind::RemoveTag,
            ActionKind::Tag,
            ActionKind::Comment,
            ActionKind::AddAssociation,
            ActionKind::Rename,
            ActionKind::Restore,
        ];
        for kind in kinds {
            let plan = kind.plan().unwrap();
            assert_eq!(plan.effect, ActionEffect::Submit, "{kind}");
            assert!(plan.needs_auth_check && plan.needs_existence_check, "{kind}");
        }
    }

    #[test]
    fn non_actionable_kinds_have_no_plan() {
        assert!(!ActionKind::Rating.is_actionable());
        assert!(!ActionKind::CreateRemoteLink.is_actionable());
        assert!(!ActionKind::Other(99).is_actionable());
    }

    #[test]
    fn parse_display_agree() {
        for s in ["add", "remove-association", "copy", "other-7"] {
            let kind: ActionKind = s.parse().unwrap();
            assert_eq!(kind.to_string(), s);
        }
        assert!("bogus".parse::<ActionKind>().is_err());
    }
}
