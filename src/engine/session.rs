// ==========================================
// 工艺路线编排系统 - 编排会话（排序器 + 历史）
// ==========================================
// 职责: 以撤销/重做语义包装时间轴排序器
// 红线: 只有实际发生变化的变更才写入历史
//       （未找到的步骤、同位置移动、空补丁均不产生历史）
// ==========================================

use tracing::{debug, info};

use crate::domain::operation::DragPayload;
use crate::domain::step::{RoutingCodesPatch, StepTimesPatch, TimelineMetrics, TimelineStep};
use crate::domain::types::HistoryAction;
use crate::engine::history::{HistoryEntry, TimelineHistory};
use crate::engine::sequencer::{StepIdGenerator, TimelineSequencer, UuidStepIdGenerator};

/// 单个物料上下文的编排会话
///
/// 每个活动物料恰好拥有一个会话实例，不与其他物料共享
#[derive(Debug)]
pub struct RoutingSession {
    sequencer: TimelineSequencer,
    history: TimelineHistory,
}

impl RoutingSession {
    pub fn new(
        item_code: impl Into<String>,
        id_gen: Box<dyn StepIdGenerator>,
        history_limit: usize,
    ) -> Self {
        Self {
            sequencer: TimelineSequencer::new(item_code, id_gen),
            history: TimelineHistory::new(history_limit),
        }
    }

    pub fn with_defaults(item_code: impl Into<String>, history_limit: usize) -> Self {
        Self::new(item_code, Box::new(UuidStepIdGenerator), history_limit)
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn item_code(&self) -> &str {
        self.sequencer.item_code()
    }

    pub fn steps(&self) -> &[TimelineStep] {
        self.sequencer.steps()
    }

    pub fn sequencer(&self) -> &TimelineSequencer {
        &self.sequencer
    }

    pub fn history(&self) -> &TimelineHistory {
        &self.history
    }

    pub fn metrics(&self) -> TimelineMetrics {
        self.sequencer.metrics()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ==========================================
    // 提交变更
    // ==========================================

    fn commit<T>(
        &mut self,
        action: HistoryAction,
        op: impl FnOnce(&mut TimelineSequencer) -> Option<T>,
    ) -> Option<T> {
        let before = self.sequencer.snapshot();
        let result = op(&mut self.sequencer);
        if result.is_some() {
            self.history.record(HistoryEntry::new(action, before));
            info!(
                item_code = %self.sequencer.item_code(),
                action = %action,
                len = self.sequencer.len(),
                undo_depth = self.history.undo_depth(),
                "时间轴变更已提交"
            );
        } else {
            debug!(action = %action, "时间轴无变化，不写入历史");
        }
        result
    }

    pub fn insert(&mut self, payload: &DragPayload, index: Option<i64>) -> Option<String> {
        self.commit(HistoryAction::Insert, |seq| seq.insert(payload, index))
    }

    pub fn move_step(&mut self, step_id: &str, to_index: i64) -> bool {
        self.commit(HistoryAction::Move, |seq| {
            seq.move_step(step_id, to_index).then_some(())
        })
        .is_some()
    }

    pub fn remove(&mut self, step_id: &str) -> Option<TimelineStep> {
        self.commit(HistoryAction::Remove, |seq| seq.remove(step_id))
    }

    pub fn update_step_times(&mut self, step_id: &str, patch: &StepTimesPatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        self.commit(HistoryAction::UpdateTimes, |seq| {
            seq.update_step_times(step_id, patch).then_some(())
        })
        .is_some()
    }

    pub fn update_step_routing(&mut self, step_id: &str, patch: &RoutingCodesPatch) -> bool {
        if patch.is_empty() {
            return false;
        }
        self.commit(HistoryAction::UpdateRouting, |seq| {
            seq.update_step_routing(step_id, patch).then_some(())
        })
        .is_some()
    }

    pub fn replace_steps(&mut self, steps: Vec<TimelineStep>) {
        self.commit(HistoryAction::Replace, |seq| {
            seq.replace_steps(steps);
            Some(())
        });
    }

    pub fn clear(&mut self) -> bool {
        self.commit(HistoryAction::Clear, |seq| seq.clear().then_some(()))
            .is_some()
    }

    /// 画布位置属于显示状态，不进入历史
    pub fn set_position_x(&mut self, step_id: &str, x: f64) -> bool {
        self.sequencer.set_position_x(step_id, x)
    }

    // ==========================================
    // 撤销 / 重做
    // ==========================================

    /// 撤销，返回是否执行
    pub fn undo(&mut self) -> bool {
        if !self.history.can_undo() {
            return false;
        }
        let current = self.sequencer.snapshot();
        match self.history.undo(current) {
            Some(entry) => {
                info!(action = %entry.action, "撤销");
                self.sequencer.restore(entry.steps);
                true
            }
            None => false,
        }
    }

    /// 重做，返回是否执行
    pub fn redo(&mut self) -> bool {
        if !self.history.can_redo() {
            return false;
        }
        let current = self.sequencer.snapshot();
        match self.history.redo(current) {
            Some(entry) => {
                info!(action = %entry.action, "重做");
                self.sequencer.restore(entry.steps);
                true
            }
            None => false,
        }
    }
}
