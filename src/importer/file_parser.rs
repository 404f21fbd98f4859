// ==========================================
// 工艺路线编排系统 - 表格文件解析器
// ==========================================
// 职责: 将映射配置表读取为 "表头 → 单元格文本" 记录
// 支持: Excel (.xlsx/.xls) / CSV (.csv)
// ==========================================

use calamine::{open_workbook, Reader, Xlsx};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::importer::error::{ImportError, ImportResult};

/// 表格记录: 表头（已修剪）→ 单元格文本（已修剪）
pub type RawRecord = HashMap<String, String>;

/// 表格文件解析接口
pub trait FileParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRecord>>;
}

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(ImportError::FileNotFound(path.display().to_string()))
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// 按表头组装一行; 完全空白的行返回 None
fn assemble_row(headers: &[String], cells: impl Iterator<Item = String>) -> Option<RawRecord> {
    let row: RawRecord = cells
        .enumerate()
        .filter_map(|(idx, value)| {
            headers
                .get(idx)
                .filter(|h| !h.is_empty())
                .map(|h| (h.clone(), value.trim().to_string()))
        })
        .collect();
    if row.values().all(|v| v.is_empty()) {
        None
    } else {
        Some(row)
    }
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRecord>> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            if let Some(row) = assemble_row(&headers, record.iter().map(|v| v.to_string())) {
                records.push(row);
            }
        }

        Ok(records)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<RawRecord>> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook: Xlsx<_> = open_workbook(file_path)
            .map_err(|e: calamine::XlsxError| ImportError::ExcelParseError(e.to_string()))?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无数据行".to_string()))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        Ok(rows
            .filter_map(|data_row| assemble_row(&headers, data_row.iter().map(|c| c.to_string())))
            .collect())
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Vec<RawRecord>> {
        let path = file_path.as_ref();
        match extension_of(path).as_str() {
            "csv" => CsvParser.parse_to_raw_records(path),
            "xlsx" | "xls" => ExcelParser.parse_to_raw_records(path),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn csv_file(lines: &[&str]) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let file = csv_file(&["source,mapped,type", "RES_CD, RESOURCE ,string", "PROC_CD,OP,string"]);

        let records = CsvParser.parse_to_raw_records(file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("source"), Some(&"RES_CD".to_string()));
        assert_eq!(records[0].get("mapped"), Some(&"RESOURCE".to_string()));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_to_raw_records(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let file = csv_file(&["source,mapped", "A,B", ",", "C,D"]);
        let records = CsvParser.parse_to_raw_records(file.path()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_universal_parser_rejects_unknown_extension() {
        let file = Builder::new().suffix(".txt").tempfile().unwrap();
        let result = UniversalFileParser.parse(file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(ext)) if ext == "txt"));
    }
}
