// ==========================================
// 工艺路线编排系统 - 导入层
// ==========================================
// 职责: 外部宽松输入 → 领域类型
// 支持: 候选推荐 JSON, 拖拽载荷 JSON, 映射配置表 (Excel / CSV)
// ==========================================

// 模块声明
pub mod candidate_mapper;
pub mod error;
pub mod file_parser;
pub mod mapping_profile;

// 重导出核心类型
pub use candidate_mapper::{CandidateMapper, RoutingDraft};
pub use error::{ImportError, ImportResult};
pub use file_parser::{CsvParser, ExcelParser, FileParser, RawRecord, UniversalFileParser};
pub use mapping_profile::MappingProfileImporter;
