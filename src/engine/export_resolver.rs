// ==========================================
// 工艺路线编排系统 - 导出列解析引擎
// ==========================================
// 职责: 将时间轴步骤解析为列可寻址的导出数据集
// 输入: 步骤 + 映射行 + 别名表 + 工序组 + 兜底列 + 矩阵过滤
// 输出: 列清单 + 行集（每列每行均有值，缺值为 null）+ 必填缺值记录
// ==========================================
// 红线: 缺值不丢行; 登记顺序为显式常量（先写者胜）
// ==========================================

mod core;
mod sources;

#[cfg(test)]
mod tests;

pub use core::{ExportResolver, ResolutionConfig};
pub use sources::{
    coerce_value, source_keys, RegistrationTier, SourceRegistry, DEFAULT_REGISTRATION_ORDER,
};
