// ==========================================
// 工艺路线编排系统 - 导出层
// ==========================================
// 职责: 已解析数据集的文本编码（序列化协作方适配器）
// 红线: 只消费解析结果，不参与取值
// ==========================================

pub mod error;
pub mod serializer;

pub use error::{ExportError, ExportResult};
pub use serializer::{
    serializer_for, CsvDatasetSerializer, DatasetSerializer, JsonDatasetSerializer,
};
