// ==========================================
// 多租户 CRM - 线索导入领域实体
// ==========================================
// 职责: 导入管道的数据载体（原始行 / 归一化线索 / 行级结果 / 导入报告）
// 生命周期: RawRow/RowResult 仅在单次导入内存活，响应构建后即丢弃
// ==========================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// 原始行: 表头名 → 原始单元格值（按源文件顺序，行号从 1 开始）
pub type RawRow = HashMap<String, String>;

// ==========================================
// NormalizedLead - 归一化线索记录
// ==========================================
// 说明: 校验阶段总是尽力产出归一化记录（即使该行存在错误），
//       原始值保留在 RowResult.raw 中用于错误报告
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedLead {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// 小写归一化后的邮箱
    pub email: Option<String>,
    /// 通过格式校验时为剥离分隔符后的号码，否则为 TRIM 后的原始值
    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    /// 规范值或字段默认值（"import"）
    pub lead_source: Option<String>,
    /// 规范值或字段默认值（"new"）
    pub status: Option<String>,
    /// 规范值或字段默认值（"medium"）
    pub priority: Option<String>,
    pub deal_value: Option<f64>,
    /// 0-100，缺省为 0
    pub probability: i64,
    pub expected_close_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

// ==========================================
// RowResult - 单行校验结果
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct RowResult {
    pub row_number: usize,
    pub raw: RawRow,
    pub normalized: NormalizedLead,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// errors 为空时为 true；warnings 不阻断导入
    pub is_valid: bool,
}

/// 行级错误明细（响应 errors 数组元素）
#[derive(Debug, Clone, Serialize)]
pub struct RowErrorDetail {
    pub row: usize,
    pub data: RawRow,
    pub errors: Vec<String>,
}

/// 行级警告明细（响应 warnings 数组元素）
#[derive(Debug, Clone, Serialize)]
pub struct RowWarningDetail {
    pub row: usize,
    pub data: RawRow,
    pub warnings: Vec<String>,
}

/// 阶段耗时（毫秒），用于可观测性
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PhaseTimings {
    pub parse_ms: u64,
    pub validate_ms: u64,
    pub insert_ms: u64,
}

/// 单个插入批次的失败信息（批次间相互隔离）
#[derive(Debug, Clone, Serialize)]
pub struct BatchError {
    /// 批次序号（从 1 开始）
    pub batch: usize,
    /// 该批次包含的行数
    pub rows: usize,
    pub error: String,
}

// ==========================================
// ImportMode - 导入终态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// 仅校验，不落库（遥测仍记录）
    DryRun,
    /// 校验后批量插入
    Import,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportMode::DryRun => "dry_run",
            ImportMode::Import => "import",
        }
    }
}

// ==========================================
// ImportReport - 导入结果报告
// ==========================================
// 试运行与正式导入共用同一结构:
// - 试运行时 successful_imports/failed_imports 为 None（序列化时省略）
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub import_id: String,
    pub mode: ImportMode,
    pub total_records: usize,
    pub valid_count: usize,
    pub invalid_count: usize,
    pub errors: Vec<RowErrorDetail>,
    pub warnings: Vec<RowWarningDetail>,
    pub config_version: i64,
    pub timings: PhaseTimings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub successful_imports: Option<usize>,
    /// 校验失败行数 + 插入失败行数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_imports: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub batch_errors: Vec<BatchError>,
}

// ==========================================
// ImportHistoryRecord - 导入历史摘要
// ==========================================
// 红线: 历史写入失败不得影响导入结果（尽力而为）
#[derive(Debug, Clone, Serialize)]
pub struct ImportHistoryRecord {
    pub import_id: String,
    pub file_name: String,
    pub company_id: Option<String>,
    pub user_id: Option<String>,
    pub total_records: usize,
    pub successful_imports: usize,
    pub failed_imports: usize,
    /// 行级错误明细的 JSON 序列化
    pub errors_json: String,
    pub warning_count: usize,
    pub duplicate_policy: String,
    pub config_version: i64,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

// ==========================================
// TelemetryEvent - 导入遥测事件
// ==========================================
// 红线: 遥测写入失败必须吞掉，仅记录日志
#[derive(Debug, Clone, Serialize)]
pub struct TelemetryEvent {
    /// "dry_run" 或 "import"
    pub phase: String,
    pub company_id: Option<String>,
    pub user_id: Option<String>,
    pub file_name: Option<String>,
    /// {total, valid, invalid, ...}
    pub stats: serde_json::Value,
    pub warning_count: usize,
    pub error_count: usize,
    pub duplicate_policy: Option<String>,
    pub config_version: Option<i64>,
    pub duration_ms: Option<u64>,
    pub created_at: DateTime<Utc>,
}
