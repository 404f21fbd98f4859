// ==========================================
// 工艺路线编排系统 - 撤销/重做历史
// ==========================================
// 职责: 以整序列快照维护 past/future 双栈
// 规则:
// - 每次提交的变更将"变更前"快照压入 past，并清空 future
// - undo: past 弹出 → 当前序列压入 future → 恢复弹出快照
// - redo: 对称使用 future
// - 超出上限时丢弃最旧快照
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::step::TimelineStep;
use crate::domain::types::HistoryAction;

/// 历史快照（不可变，深拷贝）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub action: HistoryAction,
    pub recorded_at: DateTime<Utc>,
    pub steps: Vec<TimelineStep>,
}

impl HistoryEntry {
    pub fn new(action: HistoryAction, steps: Vec<TimelineStep>) -> Self {
        Self {
            action,
            recorded_at: Utc::now(),
            steps,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TimelineHistory {
    past: Vec<HistoryEntry>,
    future: Vec<HistoryEntry>,
    /// 0 表示不限
    limit: usize,
}

impl TimelineHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            past: Vec::new(),
            future: Vec::new(),
            limit,
        }
    }

    /// 记录一次已提交变更（传入变更前快照）
    pub fn record(&mut self, entry: HistoryEntry) {
        self.past.push(entry);
        self.future.clear();
        if self.limit > 0 && self.past.len() > self.limit {
            let overflow = self.past.len() - self.limit;
            self.past.drain(0..overflow);
        }
    }

    /// 撤销: 返回要恢复的快照，并将当前序列压入 future
    ///
    /// past 为空时返回 None（空操作）
    pub fn undo(&mut self, current: Vec<TimelineStep>) -> Option<HistoryEntry> {
        let entry = self.past.pop()?;
        self.future.push(HistoryEntry::new(entry.action, current));
        Some(entry)
    }

    /// 重做: 返回要恢复的快照，并将当前序列压入 past
    pub fn redo(&mut self, current: Vec<TimelineStep>) -> Option<HistoryEntry> {
        let entry = self.future.pop()?;
        self.past.push(HistoryEntry::new(entry.action, current));
        Some(entry)
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    /// 下一次撤销将回退的动作
    pub fn peek_undo(&self) -> Option<HistoryAction> {
        self.past.last().map(|e| e.action)
    }

    pub fn peek_redo(&self) -> Option<HistoryAction> {
        self.future.last().map(|e| e.action)
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}
