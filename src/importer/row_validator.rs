// ==========================================
// 多租户 CRM - 行级校验器
// ==========================================
// 职责: 单行原始数据 → 归一化线索 + 错误/警告累积
// 契约: 累积全部问题后返回，绝不在首个错误处短路
// 红线: 校验循环内不做任何 I/O（查重只读内存集合）
// ==========================================

use crate::config::ValidationConfig;
use crate::domain::{NormalizedLead, RawRow, RowResult};
use crate::importer::date_resolver;
use crate::importer::duplicate_context::DuplicateContext;
use crate::importer::enum_normalizer::EnumNormalizer;
use crate::importer::normalize::{
    is_valid_email, is_valid_phone, normalize_email, normalize_phone, normalize_text,
};

/// 参与归一化映射的枚举字段（配置中其余枚举字段仅做校验）
const ENUM_FIELDS: [&str; 3] = ["status", "lead_source", "priority"];

// ==========================================
// RowValidator
// ==========================================
// 生命周期: 每次导入构建一次，借用该次导入的配置与枚举匹配器
pub struct RowValidator<'a> {
    config: &'a ValidationConfig,
    enums: &'a EnumNormalizer,
}

impl<'a> RowValidator<'a> {
    pub fn new(config: &'a ValidationConfig, enums: &'a EnumNormalizer) -> Self {
        Self { config, enums }
    }

    /// 校验单行并产出归一化结果
    ///
    /// # 参数
    /// - row_number: 数据行号（从 1 开始，不含表头）
    /// - context: 查重上下文（文件内集合在此调用中累积）
    pub fn validate_row(
        &self,
        row: &RawRow,
        row_number: usize,
        context: &mut DuplicateContext,
    ) -> RowResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // ===== 必填字段 =====
        for field in &self.config.required_fields {
            let present = row.get(field.as_str()).map_or(false, |v| !v.trim().is_empty());
            if !present {
                errors.push(format!("{} is required", field));
            }
        }

        // ===== 邮箱: 格式 → 文件内查重 → 存量查重 =====
        let email = row.get("email").and_then(|v| normalize_email(v));
        if let Some(ref email) = email {
            if !is_valid_email(email) {
                errors.push("Invalid email format".to_string());
            } else {
                if context.in_file.emails.contains(email) {
                    errors.push("Duplicate email found in import file".to_string());
                } else if context.in_db.emails.contains(email) {
                    errors.push("Email already exists".to_string());
                }
                // 存量命中也晋升进文件内集合，后续重复行统一按文件内重复报告
                context.in_file.emails.insert(email.clone());
            }
        }

        // ===== 电话: 格式 → 文件内查重 → 存量查重（存量命中仅警告）=====
        let phone_raw = row.get("phone").and_then(|v| normalize_text(v));
        let phone_normalized = row.get("phone").and_then(|v| normalize_phone(v));
        let mut phone_valid = false;
        if let Some(ref phone) = phone_normalized {
            if !is_valid_phone(phone) {
                errors.push("Invalid phone format".to_string());
            } else {
                phone_valid = true;
                if context.in_file.phones.contains(phone) {
                    errors.push("Duplicate phone found in import file".to_string());
                } else if context.in_db.phones.contains(phone) {
                    warnings.push("Phone already exists".to_string());
                }
                context.in_file.phones.insert(phone.clone());
            }
        }

        // ===== 枚举字段 =====
        let mut status = None;
        let mut lead_source = None;
        let mut priority = None;
        for (field, allowed) in &self.config.enums {
            let raw = row.get(field.as_str()).map(String::as_str).unwrap_or("");
            let normalized = self.enums.normalize(raw, field);

            if normalized.is_none() && !raw.trim().is_empty() {
                errors.push(format!(
                    "Invalid {}. Allowed values: {}",
                    field,
                    allowed.join(", ")
                ));
            }

            match field.as_str() {
                "status" => status = normalized,
                "lead_source" => lead_source = normalized,
                "priority" => priority = normalized,
                _ => {}
            }
        }
        // 配置缺失枚举字段时仍套用字段默认值
        for field in ENUM_FIELDS {
            if !self.config.enums.contains_key(field) {
                let raw = row.get(field).map(String::as_str).unwrap_or("");
                let fallback = if raw.trim().is_empty() {
                    EnumNormalizer::default_for_field(field).map(String::from)
                } else {
                    normalize_text(raw)
                };
                match field {
                    "status" => status = fallback,
                    "lead_source" => lead_source = fallback,
                    "priority" => priority = fallback,
                    _ => {}
                }
            }
        }

        // ===== 数值字段 =====
        let deal_range = self.config.numeric_range("deal_value");
        let mut deal_value = None;
        if let Some(raw) = row.get("deal_value").and_then(|v| normalize_text(v)) {
            match raw.parse::<f64>() {
                Ok(value) if value >= deal_range.min.unwrap_or(0.0) => {
                    deal_value = Some(value);
                }
                _ => errors.push("Deal value must be a positive number".to_string()),
            }
        }

        let prob_range = self.config.numeric_range("probability");
        let prob_min = prob_range.min.unwrap_or(0.0);
        let prob_max = prob_range.max.unwrap_or(100.0);
        let mut probability: i64 = 0;
        if let Some(raw) = row.get("probability").and_then(|v| normalize_text(v)) {
            // 概率按整数解释，小数一律拒绝
            match raw.parse::<f64>() {
                Ok(value) if value.fract() == 0.0 && value >= prob_min && value <= prob_max => {
                    probability = value as i64;
                }
                _ => errors.push(format!(
                    "Probability must be between {} and {}",
                    prob_min, prob_max
                )),
            }
        }

        // ===== 日期字段 =====
        let mut expected_close_date = None;
        if let Some(raw) = row.get("expected_close_date").and_then(|v| normalize_text(v)) {
            match date_resolver::resolve_str(&raw) {
                Some(date) => expected_close_date = Some(date),
                None => errors.push("Invalid expected close date".to_string()),
            }
        }

        // ===== 归一化记录（即使有错误也尽力产出）=====
        let normalized = NormalizedLead {
            first_name: row.get("first_name").and_then(|v| normalize_text(v)),
            last_name: row.get("last_name").and_then(|v| normalize_text(v)),
            email,
            // 格式不合法时保留 TRIM 后的原始值用于报告
            phone: if phone_valid { phone_normalized } else { phone_raw },
            company: row.get("company").and_then(|v| normalize_text(v)),
            job_title: row.get("job_title").and_then(|v| normalize_text(v)),
            lead_source,
            status,
            priority,
            deal_value,
            probability,
            expected_close_date,
            notes: row.get("notes").and_then(|v| normalize_text(v)),
        };

        let is_valid = errors.is_empty();
        RowResult {
            row_number,
            raw: row.clone(),
            normalized,
            errors,
            warnings,
            is_valid,
        }
    }
}
