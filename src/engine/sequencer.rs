// ==========================================
// 工艺路线编排系统 - 时间轴排序器
// ==========================================
// 职责: 维护当前物料的有序步骤序列（插入/移动/删除/字段补丁）
// 红线: 每次插入/移动/删除后 seq 重编号为 1..N
// 红线: 步骤 id 由生成器分配，移动前后保持不变
// 红线: 同一时间轴内步骤 id 唯一（加载的序列与生成器撞号时重新取号）
// 说明: 历史记录由 RoutingSession 包装，本模块不感知撤销/重做
// ==========================================

use std::collections::HashSet;
use std::fmt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::operation::DragPayload;
use crate::domain::step::{RoutingCodesPatch, StepTimesPatch, TimelineMetrics, TimelineStep};

// ==========================================
// 步骤 ID 生成器
// ==========================================

/// 步骤 ID 生成器 Trait
///
/// 默认实现为 UUID v4；测试中使用顺序生成器以获得确定结果
pub trait StepIdGenerator: Send + Sync + fmt::Debug {
    fn next_id(&mut self) -> String;
}

#[derive(Debug, Clone, Default)]
pub struct UuidStepIdGenerator;

impl StepIdGenerator for UuidStepIdGenerator {
    fn next_id(&mut self) -> String {
        format!("step-{}", Uuid::new_v4())
    }
}

/// 顺序生成器: {prefix}-1, {prefix}-2, ...
#[derive(Debug, Clone)]
pub struct SequentialStepIdGenerator {
    prefix: String,
    next: u64,
}

impl SequentialStepIdGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl StepIdGenerator for SequentialStepIdGenerator {
    fn next_id(&mut self) -> String {
        let id = format!("{}-{}", self.prefix, self.next);
        self.next += 1;
        id
    }
}

// ==========================================
// 落点计算
// ==========================================

/// 根据像素偏移计算插入位置
///
/// # 参数
/// - offset_px: 落点相对时间轴左侧的像素偏移
/// - origin_px: 首个步骤起点
/// - pitch_px: 每个步骤的固定间距
/// - len: 当前步骤数
///
/// # 返回
/// 截断到 [0, len] 的插入下标
pub fn drop_index_for_offset(offset_px: f64, origin_px: f64, pitch_px: f64, len: usize) -> usize {
    if !offset_px.is_finite() || !pitch_px.is_finite() || pitch_px <= 0.0 {
        return len;
    }
    let raw = ((offset_px - origin_px) / pitch_px).floor();
    if raw <= 0.0 {
        0
    } else {
        (raw as usize).min(len)
    }
}

/// 生成器连续撞号的重试上限，超过后追加 UUID 后缀
const MAX_ID_ATTEMPTS: usize = 1024;

fn clamp_index(index: i64, upper: usize) -> usize {
    if index <= 0 {
        0
    } else {
        (index as u64).min(upper as u64) as usize
    }
}

// ==========================================
// TimelineSequencer - 时间轴排序器
// ==========================================
#[derive(Debug)]
pub struct TimelineSequencer {
    item_code: String,
    steps: Vec<TimelineStep>,
    id_gen: Box<dyn StepIdGenerator>,
}

impl TimelineSequencer {
    pub fn new(item_code: impl Into<String>, id_gen: Box<dyn StepIdGenerator>) -> Self {
        Self {
            item_code: item_code.into(),
            steps: Vec::new(),
            id_gen,
        }
    }

    pub fn with_uuid_ids(item_code: impl Into<String>) -> Self {
        Self::new(item_code, Box::new(UuidStepIdGenerator))
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn item_code(&self) -> &str {
        &self.item_code
    }

    pub fn steps(&self) -> &[TimelineStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn index_of(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    pub fn get(&self, step_id: &str) -> Option<&TimelineStep> {
        self.steps.iter().find(|s| s.id == step_id)
    }

    /// 汇总指标（缺失时间按 0 计）
    pub fn metrics(&self) -> TimelineMetrics {
        TimelineMetrics::from_steps(&self.steps)
    }

    pub fn total_run_time(&self) -> f64 {
        self.metrics().total_run_time
    }

    // ==========================================
    // 变更操作
    // ==========================================

    /// 插入工序
    ///
    /// # 参数
    /// - payload: 拖拽载荷
    /// - index: 插入位置（截断到 [0, len]；None 表示末尾）
    ///
    /// # 返回
    /// - Some(step_id): 新步骤 ID
    /// - None: 载荷缺少 operation，状态不变
    pub fn insert(&mut self, payload: &DragPayload, index: Option<i64>) -> Option<String> {
        let Some(operation) = payload.operation.as_ref() else {
            warn!(item_code = %payload.item_code, "拖拽载荷缺少 operation，忽略插入");
            return None;
        };

        let steps = &self.steps;
        let id = next_unused_id(self.id_gen.as_mut(), |id| steps.iter().any(|s| s.id == id));
        let step = TimelineStep::from_operation(
            id.clone(),
            &payload.item_code,
            payload.candidate_id.as_deref(),
            operation,
        );

        let at = match index {
            Some(i) => clamp_index(i, self.steps.len()),
            None => self.steps.len(),
        };
        self.steps.insert(at, step);
        self.renumber();

        debug!(
            step_id = %id,
            process_code = %operation.process_code,
            index = at,
            len = self.steps.len(),
            "插入步骤"
        );
        Some(id)
    }

    /// 移动步骤
    ///
    /// # 返回
    /// - true: 已移动
    /// - false: 步骤不存在，或目标位置与当前位置相同
    pub fn move_step(&mut self, step_id: &str, to_index: i64) -> bool {
        let Some(from) = self.index_of(step_id) else {
            debug!(step_id, "步骤不存在，忽略移动");
            return false;
        };

        let to = clamp_index(to_index, self.steps.len().saturating_sub(1));
        if to == from {
            return false;
        }

        let step = self.steps.remove(from);
        self.steps.insert(to, step);
        self.renumber();
        debug!(step_id, from, to, "移动步骤");
        true
    }

    /// 删除步骤，不存在时返回 None
    pub fn remove(&mut self, step_id: &str) -> Option<TimelineStep> {
        let Some(pos) = self.index_of(step_id) else {
            debug!(step_id, "步骤不存在，忽略删除");
            return None;
        };
        let removed = self.steps.remove(pos);
        self.renumber();
        debug!(step_id, len = self.steps.len(), "删除步骤");
        Some(removed)
    }

    /// 字段级时间补丁（未提供的字段保持不变）
    ///
    /// # 返回
    /// 是否有字段实际变化
    pub fn update_step_times(&mut self, step_id: &str, patch: &StepTimesPatch) -> bool {
        match self.steps.iter_mut().find(|s| s.id == step_id) {
            Some(step) => step.apply_times(patch),
            None => {
                debug!(step_id, "步骤不存在，忽略时间更新");
                false
            }
        }
    }

    /// 字段级路线代码补丁
    pub fn update_step_routing(&mut self, step_id: &str, patch: &RoutingCodesPatch) -> bool {
        match self.steps.iter_mut().find(|s| s.id == step_id) {
            Some(step) => step.apply_routing(patch),
            None => {
                debug!(step_id, "步骤不存在，忽略路线代码更新");
                false
            }
        }
    }

    /// 记录画布横坐标（仅显示状态，不进入历史）
    pub fn set_position_x(&mut self, step_id: &str, x: f64) -> bool {
        match self.steps.iter_mut().find(|s| s.id == step_id) {
            Some(step) => {
                step.position_x = Some(x);
                true
            }
            None => false,
        }
    }

    /// 整体替换步骤（加载已保存的路线组）
    ///
    /// 空 id 或重复 id（保留首次出现者）会重新取号
    ///
    /// # 返回
    /// 被重新取号的步骤数
    pub fn replace_steps(&mut self, steps: Vec<TimelineStep>) -> usize {
        let mut taken: HashSet<String> = steps.iter().map(|s| s.id.clone()).collect();
        let mut seen: HashSet<String> = HashSet::with_capacity(steps.len());
        let mut reassigned = 0;
        let mut installed = Vec::with_capacity(steps.len());

        for mut step in steps {
            if step.id.trim().is_empty() || seen.contains(&step.id) {
                let fresh = next_unused_id(self.id_gen.as_mut(), |id| taken.contains(id));
                warn!(old_id = %step.id, new_id = %fresh, "加载的步骤 id 重复，重新取号");
                taken.insert(fresh.clone());
                step.id = fresh;
                reassigned += 1;
            }
            seen.insert(step.id.clone());
            installed.push(step);
        }

        self.steps = installed;
        self.renumber();
        reassigned
    }

    /// 清空时间轴，返回是否原本非空
    pub fn clear(&mut self) -> bool {
        if self.steps.is_empty() {
            return false;
        }
        self.steps.clear();
        true
    }

    // ==========================================
    // 快照
    // ==========================================

    /// 深拷贝当前序列（与实时状态无共享可变对象）
    pub fn snapshot(&self) -> Vec<TimelineStep> {
        self.steps.clone()
    }

    /// 用快照覆盖当前序列（撤销/重做使用）
    pub fn restore(&mut self, snapshot: Vec<TimelineStep>) -> Vec<TimelineStep> {
        std::mem::replace(&mut self.steps, snapshot)
    }

    fn renumber(&mut self) {
        for (idx, step) in self.steps.iter_mut().enumerate() {
            step.seq = (idx + 1) as u32;
        }
    }
}

/// 从生成器取一个未被占用的 id
fn next_unused_id(id_gen: &mut dyn StepIdGenerator, is_taken: impl Fn(&str) -> bool) -> String {
    for _ in 0..MAX_ID_ATTEMPTS {
        let id = id_gen.next_id();
        if !is_taken(&id) {
            return id;
        }
        debug!(step_id = %id, "步骤 id 已被占用，重新取号");
    }
    format!("{}-{}", id_gen.next_id(), Uuid::new_v4())
}
