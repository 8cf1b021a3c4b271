// ==========================================
// 多租户 CRM - 领域模型层
// ==========================================
// 职责: 定义线索导入相关实体与类型
// 红线: 不含数据访问逻辑,不含校验逻辑
// ==========================================

pub mod lead;

// 重导出核心类型
pub use lead::{
    BatchError, ImportHistoryRecord, ImportMode, ImportReport, NormalizedLead, PhaseTimings,
    RawRow, RowErrorDetail, RowResult, RowWarningDetail, TelemetryEvent,
};
