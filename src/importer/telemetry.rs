// ==========================================
// 多租户 CRM - 导入遥测
// ==========================================
// 职责: 试运行 / 正式导入完成后记录一条遥测事件
// 红线: 遥测失败绝不影响导入结果——所有错误吞掉只记日志
// ==========================================

use crate::domain::{ImportMode, ImportReport, TelemetryEvent};
use crate::repository::{LeadImportRepository, RepoError};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, warn};

// ==========================================
// ImportTelemetryService
// ==========================================
pub struct ImportTelemetryService {
    repo: Arc<dyn LeadImportRepository>,
}

impl ImportTelemetryService {
    pub fn new(repo: Arc<dyn LeadImportRepository>) -> Self {
        Self { repo }
    }

    /// 记录一次导入（或试运行）的遥测事件
    pub async fn record(
        &self,
        report: &ImportReport,
        duplicate_policy: &str,
        company_id: Option<&str>,
        user_id: Option<&str>,
        file_name: &str,
        duration_ms: u64,
    ) {
        let mut stats = serde_json::json!({
            "total": report.total_records,
            "valid": report.valid_count,
            "invalid": report.invalid_count,
        });
        if report.mode == ImportMode::Import {
            stats["successful"] = serde_json::json!(report.successful_imports.unwrap_or(0));
            stats["failed"] = serde_json::json!(report.failed_imports.unwrap_or(0));
        }

        let event = TelemetryEvent {
            phase: report.mode.as_str().to_string(),
            company_id: company_id.map(String::from),
            user_id: user_id.map(String::from),
            file_name: Some(file_name.to_string()),
            stats,
            warning_count: report.warnings.len(),
            error_count: report.errors.len(),
            duplicate_policy: Some(duplicate_policy.to_string()),
            config_version: Some(report.config_version),
            duration_ms: Some(duration_ms),
            created_at: Utc::now(),
        };

        match self.repo.insert_telemetry(&event).await {
            Ok(()) => {
                debug!(phase = %event.phase, import_id = %report.import_id, "遥测事件已记录");
            }
            Err(RepoError::TableMissing(table)) => {
                warn!(table = %table, "遥测表未建，跳过遥测记录");
            }
            Err(err) => {
                warn!(error = %err, import_id = %report.import_id, "遥测写入失败，已忽略");
            }
        }
    }
}
