// ==========================================
// 工艺路线编排系统 - 导出序列化器
// ==========================================
// 职责: ExportDataset → 文本载荷（纯函数，无状态）
// 支持: CSV / JSON
// 说明: XML / Excel 编码由宿主提供，这里返回 UnsupportedFormat
// ==========================================

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::domain::mapping::ExportDataset;
use crate::domain::types::ExportFormat;
use crate::export::error::{ExportError, ExportResult};

/// 序列化协作方接口
pub trait DatasetSerializer: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn serialize(&self, dataset: &ExportDataset) -> ExportResult<Vec<u8>>;

    /// 建议的文件扩展名
    fn file_extension(&self) -> &'static str;
}

/// 按格式选择序列化器
pub fn serializer_for(format: ExportFormat) -> ExportResult<Box<dyn DatasetSerializer>> {
    match format {
        ExportFormat::Csv => Ok(Box::new(CsvDatasetSerializer::default())),
        ExportFormat::Json => Ok(Box::new(JsonDatasetSerializer::default())),
        other => Err(ExportError::UnsupportedFormat(other)),
    }
}

fn check_shape(dataset: &ExportDataset) -> ExportResult<()> {
    let expected = dataset.columns.len();
    match dataset
        .rows
        .iter()
        .position(|row| row.cells.len() != expected)
    {
        Some(idx) => Err(ExportError::ShapeMismatch {
            row: idx,
            expected,
            actual: dataset.rows[idx].cells.len(),
        }),
        None => Ok(()),
    }
}

// ==========================================
// CSV
// ==========================================

/// 单元格文本: null → 空串，字符串原样，其他按 JSON 文本
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct CsvDatasetSerializer {
    /// 表头使用工序组标签（否则使用列键）
    pub use_labels: bool,
    pub delimiter: u8,
}

impl Default for CsvDatasetSerializer {
    fn default() -> Self {
        Self {
            use_labels: true,
            delimiter: b',',
        }
    }
}

impl DatasetSerializer for CsvDatasetSerializer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn serialize(&self, dataset: &ExportDataset) -> ExportResult<Vec<u8>> {
        check_shape(dataset)?;

        let mut writer = csv::WriterBuilder::new()
            .delimiter(self.delimiter)
            .from_writer(Vec::new());

        let header: Vec<&str> = dataset
            .columns
            .iter()
            .map(|c| {
                if self.use_labels {
                    dataset.header_label(c)
                } else {
                    c.as_str()
                }
            })
            .collect();
        writer.write_record(&header)?;

        for row in &dataset.rows {
            writer.write_record(row.cells.iter().map(cell_text))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::CsvWriteError(e.to_string()))?;
        debug!(rows = dataset.rows.len(), bytes = bytes.len(), "CSV 序列化完成");
        Ok(bytes)
    }

    fn file_extension(&self) -> &'static str {
        "csv"
    }
}

// ==========================================
// JSON
// ==========================================

/// 按列顺序输出的行对象
struct OrderedRow<'a> {
    columns: &'a [String],
    cells: &'a [Value],
}

impl Serialize for OrderedRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.columns.len()))?;
        for (column, cell) in self.columns.iter().zip(self.cells.iter()) {
            map.serialize_entry(column, cell)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Default)]
pub struct JsonDatasetSerializer {
    pub pretty: bool,
}

impl DatasetSerializer for JsonDatasetSerializer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn serialize(&self, dataset: &ExportDataset) -> ExportResult<Vec<u8>> {
        check_shape(dataset)?;

        let rows: Vec<OrderedRow<'_>> = dataset
            .rows
            .iter()
            .map(|row| OrderedRow {
                columns: &dataset.columns,
                cells: &row.cells,
            })
            .collect();

        let bytes = if self.pretty {
            serde_json::to_vec_pretty(&rows)?
        } else {
            serde_json::to_vec(&rows)?
        };
        debug!(rows = dataset.rows.len(), bytes = bytes.len(), "JSON 序列化完成");
        Ok(bytes)
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }
}
