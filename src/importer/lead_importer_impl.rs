// ==========================================
// 多租户 CRM - 线索导入编排器
// ==========================================
// 职责: 解析 → 配置重载 → 查重上下文 → 行级校验 → （正式导入时）分批插入
// 红线:
//   1. 校验循环内零数据库查询（查重上下文提前构建）
//   2. 批次间相互隔离——单批失败不回滚其他批次
//   3. 历史与遥测写入失败不影响导入结果
// ==========================================

use crate::config::ImportConfigProvider;
use crate::domain::{
    BatchError, ImportHistoryRecord, ImportMode, ImportReport, PhaseTimings, RowErrorDetail,
    RowResult, RowWarningDetail,
};
use crate::importer::duplicate_context::DuplicateContextBuilder;
use crate::importer::enum_normalizer::EnumNormalizer;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{FileParser, UniversalFileParser};
use crate::importer::lead_importer_trait::{ImportRequest, LeadImporter};
use crate::importer::row_validator::RowValidator;
use crate::importer::schema_adapter::LeadSchemaAdapter;
use crate::importer::telemetry::ImportTelemetryService;
use crate::repository::{LeadImportRepository, LeadInsertRow};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// 单个插入批次的行数
const BATCH_SIZE: usize = 100;

// ==========================================
// LeadImporterImpl
// ==========================================
pub struct LeadImporterImpl {
    repo: Arc<dyn LeadImportRepository>,
    config_provider: Arc<dyn ImportConfigProvider>,
    parser: Box<dyn FileParser>,
    schema_adapter: LeadSchemaAdapter,
    telemetry: ImportTelemetryService,
}

impl LeadImporterImpl {
    pub fn new(
        repo: Arc<dyn LeadImportRepository>,
        config_provider: Arc<dyn ImportConfigProvider>,
    ) -> Self {
        Self {
            schema_adapter: LeadSchemaAdapter::new(Arc::clone(&repo)),
            telemetry: ImportTelemetryService::new(Arc::clone(&repo)),
            parser: Box::new(UniversalFileParser::new()),
            repo,
            config_provider,
        }
    }

    /// 替换文件解析器（测试注入用）
    pub fn with_parser(mut self, parser: Box<dyn FileParser>) -> Self {
        self.parser = parser;
        self
    }

    /// 试运行与正式导入的共享主流程
    async fn run(&self, request: ImportRequest, mode: ImportMode) -> ImportResult<ImportReport> {
        let import_id = uuid::Uuid::new_v4().to_string();
        let started = Instant::now();
        let company_id = request.company_id.as_deref();

        info!(
            import_id = %import_id,
            mode = mode.as_str(),
            file = %request.file_name,
            company_id = company_id.unwrap_or("-"),
            "开始导入流程"
        );

        // ===== 阶段 1: 解析 =====
        let parse_started = Instant::now();
        let rows = self
            .parser
            .parse(&request.bytes, &request.file_name, &request.header_mapping)?;
        let parse_ms = parse_started.elapsed().as_millis() as u64;
        debug!(import_id = %import_id, rows = rows.len(), parse_ms, "文件解析完成");

        // ===== 阶段 2: 配置重载（导入前强制失效缓存）=====
        self.config_provider.invalidate(company_id).await;
        let config = self
            .config_provider
            .get_config(company_id)
            .await
            .map_err(|e| ImportError::ConfigLoadError(e.to_string()))?;
        debug!(
            import_id = %import_id,
            config_version = config.version,
            duplicate_policy = %config.duplicate_policy,
            "校验配置已加载"
        );

        // ===== 阶段 3: 查重上下文 + 行级校验 =====
        let validate_started = Instant::now();
        let enums = EnumNormalizer::new(&config);
        let validator = RowValidator::new(&config, &enums);

        let mut context = DuplicateContextBuilder::new(Arc::clone(&self.repo))
            .build(&rows, company_id)
            .await?;

        let results: Vec<RowResult> = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| validator.validate_row(row, idx + 1, &mut context))
            .collect();
        let validate_ms = validate_started.elapsed().as_millis() as u64;

        let valid_count = results.iter().filter(|r| r.is_valid).count();
        let invalid_count = results.len() - valid_count;

        let errors: Vec<RowErrorDetail> = results
            .iter()
            .filter(|r| !r.errors.is_empty())
            .map(|r| RowErrorDetail {
                row: r.row_number,
                data: r.raw.clone(),
                errors: r.errors.clone(),
            })
            .collect();
        let warnings: Vec<RowWarningDetail> = results
            .iter()
            .filter(|r| !r.warnings.is_empty())
            .map(|r| RowWarningDetail {
                row: r.row_number,
                data: r.raw.clone(),
                warnings: r.warnings.clone(),
            })
            .collect();

        info!(
            import_id = %import_id,
            total = results.len(),
            valid = valid_count,
            invalid = invalid_count,
            validate_ms,
            "行级校验完成"
        );

        let mut report = ImportReport {
            import_id: import_id.clone(),
            mode,
            total_records: results.len(),
            valid_count,
            invalid_count,
            errors,
            warnings,
            config_version: config.version,
            timings: PhaseTimings {
                parse_ms,
                validate_ms,
                insert_ms: 0,
            },
            successful_imports: None,
            failed_imports: None,
            batch_errors: Vec::new(),
        };

        // ===== 阶段 4: 试运行到此为止 =====
        if mode == ImportMode::DryRun {
            let duration_ms = started.elapsed().as_millis() as u64;
            self.telemetry
                .record(
                    &report,
                    &config.duplicate_policy,
                    company_id,
                    request.user_id.as_deref(),
                    &request.file_name,
                    duration_ms,
                )
                .await;
            return Ok(report);
        }

        // ===== 阶段 5: 分批插入（批次间隔离）=====
        let insert_started = Instant::now();
        let mut successful = 0usize;
        let mut insert_failed = 0usize;
        let mut batch_errors = Vec::new();

        if valid_count > 0 {
            let mut insert_rows: Vec<LeadInsertRow> = Vec::with_capacity(valid_count);
            for result in results.iter().filter(|r| r.is_valid) {
                insert_rows.push(self.schema_adapter.adapt(&result.normalized, company_id).await);
            }

            for (batch_idx, batch) in insert_rows.chunks(BATCH_SIZE).enumerate() {
                match self.repo.insert_leads(batch).await {
                    Ok(inserted) => {
                        successful += inserted;
                        debug!(
                            import_id = %import_id,
                            batch = batch_idx + 1,
                            rows = inserted,
                            "批次插入成功"
                        );
                    }
                    Err(err) => {
                        insert_failed += batch.len();
                        warn!(
                            import_id = %import_id,
                            batch = batch_idx + 1,
                            rows = batch.len(),
                            error = %err,
                            "批次插入失败，继续后续批次"
                        );
                        batch_errors.push(BatchError {
                            batch: batch_idx + 1,
                            rows: batch.len(),
                            error: err.to_string(),
                        });
                    }
                }
            }
        }
        let insert_ms = insert_started.elapsed().as_millis() as u64;

        report.timings.insert_ms = insert_ms;
        report.successful_imports = Some(successful);
        report.failed_imports = Some(invalid_count + insert_failed);
        report.batch_errors = batch_errors;

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(
            import_id = %import_id,
            successful,
            failed = invalid_count + insert_failed,
            insert_ms,
            duration_ms,
            "导入完成"
        );

        // ===== 阶段 6: 历史与遥测（尽力而为）=====
        self.record_history(&report, &request, &config.duplicate_policy, duration_ms)
            .await;
        self.telemetry
            .record(
                &report,
                &config.duplicate_policy,
                company_id,
                request.user_id.as_deref(),
                &request.file_name,
                duration_ms,
            )
            .await;

        Ok(report)
    }

    async fn record_history(
        &self,
        report: &ImportReport,
        request: &ImportRequest,
        duplicate_policy: &str,
        duration_ms: u64,
    ) {
        let errors_json =
            serde_json::to_string(&report.errors).unwrap_or_else(|_| "[]".to_string());

        let record = ImportHistoryRecord {
            import_id: report.import_id.clone(),
            file_name: request.file_name.clone(),
            company_id: request.company_id.clone(),
            user_id: request.user_id.clone(),
            total_records: report.total_records,
            successful_imports: report.successful_imports.unwrap_or(0),
            failed_imports: report.failed_imports.unwrap_or(0),
            errors_json,
            warning_count: report.warnings.len(),
            duplicate_policy: duplicate_policy.to_string(),
            config_version: report.config_version,
            duration_ms,
            created_at: Utc::now(),
        };

        if let Err(err) = self.repo.insert_import_history(&record).await {
            warn!(
                import_id = %report.import_id,
                error = %err,
                "导入历史写入失败，已忽略"
            );
        }
    }
}

#[async_trait]
impl LeadImporter for LeadImporterImpl {
    async fn dry_run(&self, request: ImportRequest) -> ImportResult<ImportReport> {
        self.run(request, ImportMode::DryRun).await
    }

    async fn import(&self, request: ImportRequest) -> ImportResult<ImportReport> {
        self.run(request, ImportMode::Import).await
    }
}
