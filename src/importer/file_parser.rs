// ==========================================
// 多租户 CRM - 导入文件解析器
// ==========================================
// 职责: 文件字节流 → RawRow 序列（表头映射、空行剔除）
// 支持: .csv / .xlsx / .xls / .xlsm
// 约束: 解析只整形不校验——校验问题全部留给 RowValidator 按行报告
// ==========================================

use crate::domain::RawRow;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::collections::HashMap;
use std::io::Cursor;
use tracing::debug;

/// 表头映射: 源文件表头 → 线索字段名
pub type HeaderMapping = HashMap<String, String>;

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser: Send + Sync {
    /// 解析文件字节流
    ///
    /// # 参数
    /// - header_mapping: 源表头 → 字段名；未映射的表头按小写原名透传
    ///
    /// # 返回
    /// - Ok(Vec<RawRow>): 数据行（已剔除全空行，顺序与源文件一致）
    /// - Err(ImportError::EmptySheet): 文件没有任何数据行
    fn parse(
        &self,
        bytes: &[u8],
        file_name: &str,
        header_mapping: &HeaderMapping,
    ) -> ImportResult<Vec<RawRow>>;
}

/// 表头 → 字段名（映射优先，否则小写透传）
fn map_header(header: &str, mapping: &HeaderMapping) -> String {
    let trimmed = header.trim();
    mapping
        .get(trimmed)
        .cloned()
        .unwrap_or_else(|| trimmed.to_lowercase())
}

fn build_row(headers: &[String], cells: impl Iterator<Item = String>) -> RawRow {
    let mut row = RawRow::new();
    for (header, cell) in headers.iter().zip(cells) {
        if !header.is_empty() {
            row.insert(header.clone(), cell);
        }
    }
    row
}

fn is_blank(row: &RawRow) -> bool {
    row.values().all(|v| v.trim().is_empty())
}

// ==========================================
// CsvParser
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse(
        &self,
        bytes: &[u8],
        file_name: &str,
        header_mapping: &HeaderMapping,
    ) -> ImportResult<Vec<RawRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| map_header(h, header_mapping))
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let row = build_row(&headers, record.iter().map(String::from));
            if !is_blank(&row) {
                rows.push(row);
            }
        }

        if rows.is_empty() {
            return Err(ImportError::EmptySheet(file_name.to_string()));
        }

        debug!(file = %file_name, rows = rows.len(), "CSV 解析完成");
        Ok(rows)
    }
}

// ==========================================
// ExcelParser
// ==========================================
pub struct ExcelParser;

/// 单元格 → 文本
///
/// 日期单元格转为 Excel 序列号文本，由日期解析器统一归位；
/// 整数值浮点去掉无意义的小数部分（电话列常被识别为数值）
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            if serial.fract() == 0.0 {
                format!("{}", serial as i64)
            } else {
                serial.to_string()
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => {
            debug!(error = ?e, "单元格包含错误值，按空值处理");
            String::new()
        }
    }
}

impl FileParser for ExcelParser {
    fn parse(
        &self,
        bytes: &[u8],
        file_name: &str,
        header_mapping: &HeaderMapping,
    ) -> ImportResult<Vec<RawRow>> {
        let cursor = Cursor::new(bytes.to_vec());
        let mut workbook = open_workbook_auto_from_rs(cursor)
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| ImportError::EmptySheet(file_name.to_string()))?
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        let mut iter = range.rows();
        let headers: Vec<String> = match iter.next() {
            Some(header_row) => header_row
                .iter()
                .map(|cell| map_header(&cell_to_string(cell), header_mapping))
                .collect(),
            None => return Err(ImportError::EmptySheet(file_name.to_string())),
        };

        let mut rows = Vec::new();
        for cells in iter {
            let row = build_row(&headers, cells.iter().map(cell_to_string));
            if !is_blank(&row) {
                rows.push(row);
            }
        }

        if rows.is_empty() {
            return Err(ImportError::EmptySheet(file_name.to_string()));
        }

        debug!(file = %file_name, rows = rows.len(), "Excel 解析完成");
        Ok(rows)
    }
}

// ==========================================
// UniversalFileParser - 按扩展名分发
// ==========================================
pub struct UniversalFileParser {
    csv: CsvParser,
    excel: ExcelParser,
}

impl UniversalFileParser {
    pub fn new() -> Self {
        Self {
            csv: CsvParser,
            excel: ExcelParser,
        }
    }
}

impl Default for UniversalFileParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FileParser for UniversalFileParser {
    fn parse(
        &self,
        bytes: &[u8],
        file_name: &str,
        header_mapping: &HeaderMapping,
    ) -> ImportResult<Vec<RawRow>> {
        let extension = file_name
            .rsplit('.')
            .next()
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => self.csv.parse(bytes, file_name, header_mapping),
            "xlsx" | "xls" | "xlsm" => self.excel.parse(bytes, file_name, header_mapping),
            _ => Err(ImportError::UnsupportedFormat(file_name.to_string())),
        }
    }
}
