// ==========================================
// 多租户 CRM - 表结构适配器
// ==========================================
// 职责: 归一化线索 → 与目标表实际列集对齐的插入行
// 背景: 多租户部署存在新旧两代 leads 表（job_title/lead_source
//       对应旧表的 position/source），插入列集必须按实际表结构裁剪
// 缓存: 首次探测成功后缓存列集；探测失败回退基线列集且不缓存
// ==========================================

use crate::domain::NormalizedLead;
use crate::repository::{LeadImportRepository, LeadInsertRow};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// 无法探测表结构时的保守基线列集（两代表的公共列）
const BASELINE_LEAD_COLUMNS: [&str; 11] = [
    "company_id",
    "first_name",
    "last_name",
    "email",
    "phone",
    "company",
    "status",
    "priority",
    "notes",
    "created_at",
    "updated_at",
];

/// 允许写入的线索业务字段（白名单之外的归一化字段一律不落库）
const INSERTABLE_LEAD_FIELDS: [&str; 13] = [
    "first_name",
    "last_name",
    "email",
    "phone",
    "company",
    "job_title",
    "lead_source",
    "status",
    "priority",
    "deal_value",
    "probability",
    "expected_close_date",
    "notes",
];

/// 新字段名 → 旧表列名（仅当新列不存在且旧列存在时改写）
const LEGACY_COLUMN_RENAMES: [(&str, &str); 2] =
    [("job_title", "position"), ("lead_source", "source")];

// ==========================================
// LeadSchemaAdapter
// ==========================================
pub struct LeadSchemaAdapter {
    repo: Arc<dyn LeadImportRepository>,
    cached: Mutex<Option<HashSet<String>>>,
}

impl LeadSchemaAdapter {
    pub fn new(repo: Arc<dyn LeadImportRepository>) -> Self {
        Self {
            repo,
            cached: Mutex::new(None),
        }
    }

    /// 返回目标表当前可用的列集
    ///
    /// 探测失败（含表未建）时回退基线列集，且不写入缓存——
    /// 下次调用会重新探测，表建好后自动恢复
    pub async fn available_columns(&self) -> HashSet<String> {
        if let Ok(guard) = self.cached.lock() {
            if let Some(columns) = guard.as_ref() {
                return columns.clone();
            }
        }

        match self.repo.lead_table_columns().await {
            Ok(columns) if !columns.is_empty() => {
                let set: HashSet<String> = columns.into_iter().collect();
                debug!(columns = set.len(), "leads 表列集探测完成");
                if let Ok(mut guard) = self.cached.lock() {
                    *guard = Some(set.clone());
                }
                set
            }
            Ok(_) => {
                warn!("leads 表列集为空，回退基线列集");
                baseline_columns()
            }
            Err(err) => {
                warn!(error = %err, "leads 表列集探测失败，回退基线列集");
                baseline_columns()
            }
        }
    }

    /// 清除缓存的列集（迁移后调用）
    pub fn invalidate(&self) {
        if let Ok(mut guard) = self.cached.lock() {
            *guard = None;
        }
    }

    /// 归一化线索 → 插入行
    ///
    /// # 行为
    /// - 白名单字段与实际列集求交，缺失列整列丢弃
    /// - 缺失值以 NULL 写入——同一批次内所有行的列集必须一致，
    ///   批量插入按首行列集生成 SQL
    /// - 新列缺失而旧列存在时按旧列名写入（job_title→position 等）
    /// - company_id / created_at / updated_at 仅在对应列存在时附加
    pub async fn adapt(&self, lead: &NormalizedLead, company_id: Option<&str>) -> LeadInsertRow {
        let columns = self.available_columns().await;
        let mut row = LeadInsertRow::new();

        for field in INSERTABLE_LEAD_FIELDS {
            let value = field_value(lead, field);

            if columns.contains(field) {
                row.insert(field.to_string(), value);
                continue;
            }

            if let Some((_, legacy)) = LEGACY_COLUMN_RENAMES
                .iter()
                .find(|(modern, _)| *modern == field)
            {
                if columns.contains(*legacy) {
                    row.insert((*legacy).to_string(), value);
                }
            }
        }

        if columns.contains("company_id") {
            row.insert(
                "company_id".to_string(),
                company_id
                    .map(|id| serde_json::Value::String(id.to_string()))
                    .unwrap_or(serde_json::Value::Null),
            );
        }

        let now = Utc::now().to_rfc3339();
        for stamp in ["created_at", "updated_at"] {
            if columns.contains(stamp) {
                row.insert(stamp.to_string(), serde_json::Value::String(now.clone()));
            }
        }

        row
    }
}

fn baseline_columns() -> HashSet<String> {
    BASELINE_LEAD_COLUMNS.iter().map(|c| c.to_string()).collect()
}

fn field_value(lead: &NormalizedLead, field: &str) -> serde_json::Value {
    fn text(value: &Option<String>) -> serde_json::Value {
        value
            .as_ref()
            .map(|v| serde_json::Value::String(v.clone()))
            .unwrap_or(serde_json::Value::Null)
    }

    match field {
        "first_name" => text(&lead.first_name),
        "last_name" => text(&lead.last_name),
        "email" => text(&lead.email),
        "phone" => text(&lead.phone),
        "company" => text(&lead.company),
        "job_title" => text(&lead.job_title),
        "lead_source" => text(&lead.lead_source),
        "status" => text(&lead.status),
        "priority" => text(&lead.priority),
        "notes" => text(&lead.notes),
        "deal_value" => lead
            .deal_value
            .and_then(serde_json::Number::from_f64)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        "probability" => serde_json::Value::Number(lead.probability.into()),
        "expected_close_date" => lead
            .expected_close_date
            .map(|d| serde_json::Value::String(d.format("%Y-%m-%d").to_string()))
            .unwrap_or(serde_json::Value::Null),
        _ => serde_json::Value::Null,
    }
}
