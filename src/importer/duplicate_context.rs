// ==========================================
// 多租户 CRM - 查重上下文构建器
// ==========================================
// 职责: 校验开始前一次性构建文件内 + 存量两类查重键集合
// 红线: 行级校验循环内严禁发起任何数据库查询
// 约束: 候选值按 CHUNK_SIZE 分片查询，避免超长 IN 列表
// ==========================================

use crate::domain::RawRow;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::normalize::{normalize_email, normalize_phone};
use crate::repository::{LeadImportRepository, RepoError};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// 单次存量查询的最大候选数
const CHUNK_SIZE: usize = 500;

/// 一类来源的查重键集合（成员均为归一化后的值）
#[derive(Debug, Default)]
pub struct KeySets {
    pub emails: HashSet<String>,
    pub phones: HashSet<String>,
}

// ==========================================
// DuplicateContext
// ==========================================
// in_file: 本文件内已出现过的键（校验循环中逐行累积）
// in_db:   存量库中命中的键（构建时一次性查出，循环中只读 + 晋升）
#[derive(Debug, Default)]
pub struct DuplicateContext {
    pub in_file: KeySets,
    pub in_db: KeySets,
}

impl DuplicateContext {
    pub fn empty() -> Self {
        Self::default()
    }
}

// ==========================================
// DuplicateContextBuilder
// ==========================================
pub struct DuplicateContextBuilder {
    repo: Arc<dyn LeadImportRepository>,
}

impl DuplicateContextBuilder {
    pub fn new(repo: Arc<dyn LeadImportRepository>) -> Self {
        Self { repo }
    }

    /// 构建查重上下文
    ///
    /// # 行为
    /// - 无租户 ID 或无候选值: 返回空上下文，零次查询
    /// - leads 表未建（TableMissing）: 对应类别按空集处理（新租户首导场景）
    /// - 其他查询失败: 返回 DuplicateLookupFailed，导入在任何插入前中止
    pub async fn build(
        &self,
        rows: &[RawRow],
        company_id: Option<&str>,
    ) -> ImportResult<DuplicateContext> {
        let company_id = match company_id {
            Some(id) if !id.trim().is_empty() => id,
            _ => return Ok(DuplicateContext::empty()),
        };

        let email_candidates = collect_candidates(rows, "email", |v| normalize_email(v));
        let phone_candidates = collect_candidates(rows, "phone", |v| normalize_phone(v));

        if email_candidates.is_empty() && phone_candidates.is_empty() {
            return Ok(DuplicateContext::empty());
        }

        debug!(
            company_id = %company_id,
            email_candidates = email_candidates.len(),
            phone_candidates = phone_candidates.len(),
            "开始构建存量查重集合"
        );

        let mut context = DuplicateContext::empty();

        let existing_emails = self
            .lookup_chunked(&email_candidates, |chunk| {
                let repo = Arc::clone(&self.repo);
                let company_id = company_id.to_string();
                async move { repo.find_existing_emails(&company_id, &chunk).await }
            })
            .await?;
        context.in_db.emails = existing_emails
            .into_iter()
            .filter_map(|v| normalize_email(&v))
            .collect();

        let existing_phones = self
            .lookup_chunked(&phone_candidates, |chunk| {
                let repo = Arc::clone(&self.repo);
                let company_id = company_id.to_string();
                async move { repo.find_existing_phones(&company_id, &chunk).await }
            })
            .await?;
        context.in_db.phones = existing_phones
            .into_iter()
            .filter_map(|v| normalize_phone(&v))
            .collect();

        debug!(
            existing_emails = context.in_db.emails.len(),
            existing_phones = context.in_db.phones.len(),
            "存量查重集合构建完成"
        );

        Ok(context)
    }

    /// 分片顺序查询；TableMissing 短路为空集
    async fn lookup_chunked<F, Fut>(
        &self,
        candidates: &[String],
        query: F,
    ) -> ImportResult<Vec<String>>
    where
        F: Fn(Vec<String>) -> Fut,
        Fut: std::future::Future<Output = Result<Vec<String>, RepoError>>,
    {
        let mut found = Vec::new();

        for chunk in candidates.chunks(CHUNK_SIZE) {
            match query(chunk.to_vec()).await {
                Ok(mut hits) => found.append(&mut hits),
                Err(RepoError::TableMissing(table)) => {
                    warn!(table = %table, "目标表未建，存量查重按空集处理");
                    return Ok(Vec::new());
                }
                Err(err) => {
                    return Err(ImportError::DuplicateLookupFailed(err.to_string()));
                }
            }
        }

        Ok(found)
    }
}

/// 收集某一列的归一化去重候选值（保持首次出现的顺序以便分片稳定）
fn collect_candidates<F>(rows: &[RawRow], column: &str, normalize: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for row in rows {
        if let Some(value) = row.get(column).and_then(|v| normalize(v)) {
            if seen.insert(value.clone()) {
                candidates.push(value);
            }
        }
    }

    candidates
}
