use std::collections::HashSet;

use crate::core::action::ActionKind;
use crate::core::entry::LogEntry;

/// 按路径折叠日志条目（先到先得）
///
/// 输入按时间升序（最老在前）。每个路径只保留第一次出现的可索引条目，
/// 不可索引动作直接丢弃；输出保持输入顺序，不重排。
///
/// Copy 例外：copy 不把源路径标记为已见，同一源路径的多次 copy
/// 会各自保留（目标路径不同，都需要索引）。
///
/// 注意：升序输入 + 先到先得 → 保留的是每个路径“最老”的可索引事件。
pub fn collapse(entries: &[LogEntry]) -> Vec<&LogEntry> {
    let mut seen: HashSet<&str> = HashSet::with_capacity(entries.len());
    let mut out = Vec::new();

    for entry in entries {
        if seen.contains(entry.resource_path.as_str()) {
            continue;
        }
        if !entry.action.is_actionable() {
            continue;
        }
        if entry.action != ActionKind::Copy {
            seen.insert(entry.resource_path.as_str());
        }
        out.push(entry);
    }

    out
}
