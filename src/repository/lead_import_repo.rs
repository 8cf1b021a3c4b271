// ==========================================
// 多租户 CRM - 线索导入 Repository Trait
// ==========================================
// 职责: 定义导入相关数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::{ImportHistoryRecord, TelemetryEvent};
use crate::repository::error::RepoResult;
use async_trait::async_trait;
use std::collections::BTreeMap;

/// 按目标列组织的单条插入行（列名 → 值）
///
/// 列集合由 Schema Adapter 保证一致且与目标表存在的列对齐
pub type LeadInsertRow = BTreeMap<String, serde_json::Value>;

// ==========================================
// LeadImportRepository Trait
// ==========================================
// 实现者: LeadImportRepositoryImpl（rusqlite）、测试 Mock
#[async_trait]
pub trait LeadImportRepository: Send + Sync {
    // ===== 查重（租户范围）=====

    /// 查询已存在的邮箱（单次调用对应一个查重分片）
    ///
    /// # 参数
    /// - company_id: 租户 ID
    /// - emails: 候选邮箱（调用方已归一化、去重、分片）
    ///
    /// # 返回
    /// - Ok(Vec<String>): 命中的存量邮箱
    /// - Err(RepoError::TableMissing): 目标表未建（调用方按空集处理）
    async fn find_existing_emails(
        &self,
        company_id: &str,
        emails: &[String],
    ) -> RepoResult<Vec<String>>;

    /// 查询已存在的电话（语义同 find_existing_emails）
    async fn find_existing_phones(
        &self,
        company_id: &str,
        phones: &[String],
    ) -> RepoResult<Vec<String>>;

    // ===== 目标表结构探测 =====

    /// 返回 leads 表当前存在的列名
    ///
    /// # 返回
    /// - Err(RepoError::TableMissing): leads 表未建
    async fn lead_table_columns(&self) -> RepoResult<Vec<String>>;

    // ===== 批量写入 =====

    /// 插入一个批次的线索（一次调用 = 一个批次，批内事务化）
    ///
    /// # 返回
    /// - Ok(usize): 成功插入的行数
    /// - Err: 整个批次失败（调用方负责批次间隔离）
    async fn insert_leads(&self, rows: &[LeadInsertRow]) -> RepoResult<usize>;

    // ===== 历史与遥测（尽力而为，由调用方吞错）=====

    /// 写入导入历史摘要
    async fn insert_import_history(&self, record: &ImportHistoryRecord) -> RepoResult<()>;

    /// 写入遥测事件
    async fn insert_telemetry(&self, event: &TelemetryEvent) -> RepoResult<()>;
}
