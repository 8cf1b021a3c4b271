// ==========================================
// 多租户 CRM - 枚举归一化器
// ==========================================
// 职责: 自由文本分类值 → 规范值
// 策略: 精确匹配 → 子串包含 → 标签提示 → 编辑距离近邻
// 约束: 匹配结构按 ValidationConfig 实例构建一次，严禁逐行重建
// ==========================================

use crate::config::ValidationConfig;
use std::collections::BTreeMap;

/// 编辑距离相似度接受阈值
///
/// 0.6 的取值使单字符笔误可命中（如 "contcted" → "contacted"），
/// 而无关 token 达不到
const FUZZY_ACCEPT_THRESHOLD: f64 = 0.6;

/// 子串策略的最小输入长度（单字符输入会命中过多候选）
const MIN_SUBSTRING_LEN: usize = 2;

struct LabelHint {
    label_lower: String,
    value: String,
}

struct FieldMatcher {
    canonical: Vec<String>,
    lowered: Vec<String>,
    hints: Vec<LabelHint>,
}

// ==========================================
// EnumNormalizer
// ==========================================
pub struct EnumNormalizer {
    matchers: BTreeMap<String, FieldMatcher>,
}

impl EnumNormalizer {
    /// 按配置构建归一化器（每个枚举字段一个匹配结构）
    pub fn new(config: &ValidationConfig) -> Self {
        let mut matchers = BTreeMap::new();

        for (field, canonical) in &config.enums {
            if canonical.is_empty() {
                continue;
            }

            let lowered = canonical.iter().map(|v| v.to_lowercase()).collect();

            let hints = config
                .fuzzy_match_data
                .as_ref()
                .and_then(|data| data.get(field))
                .map(|hints| {
                    hints
                        .iter()
                        .map(|h| LabelHint {
                            label_lower: h.label.to_lowercase(),
                            value: h.value.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default();

            matchers.insert(
                field.clone(),
                FieldMatcher {
                    canonical: canonical.clone(),
                    lowered,
                    hints,
                },
            );
        }

        Self { matchers }
    }

    /// 空值时的字段默认值
    pub fn default_for_field(field: &str) -> Option<&'static str> {
        match field {
            "status" => Some("new"),
            "lead_source" => Some("import"),
            "priority" => Some("medium"),
            _ => None,
        }
    }

    /// 归一化分类值
    ///
    /// # 返回
    /// - Some(canonical): 命中规范值（或空值时的字段默认值）
    /// - None: 无法归一化——调用方按校验错误处理，绝不静默回退默认值
    pub fn normalize(&self, value: &str, field: &str) -> Option<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Self::default_for_field(field).map(String::from);
        }

        self.matchers.get(field).and_then(|m| m.resolve(trimmed))
    }
}

impl FieldMatcher {
    fn resolve(&self, input: &str) -> Option<String> {
        let lower = input.to_lowercase();

        // 策略 1: 精确匹配（大小写不敏感）
        if let Some(idx) = self.lowered.iter().position(|c| *c == lower) {
            return Some(self.canonical[idx].clone());
        }

        let long_enough = lower.chars().count() >= MIN_SUBSTRING_LEN;

        // 策略 2: 子串包含（双向）
        if long_enough {
            if let Some(idx) = self
                .lowered
                .iter()
                .position(|c| c.contains(&lower) || lower.contains(c.as_str()))
            {
                return Some(self.canonical[idx].clone());
            }
        }

        // 策略 3: 标签提示精确匹配（租户配置的展示文案 → 规范值）
        if let Some(hint) = self.hints.iter().find(|h| h.label_lower == lower) {
            return Some(hint.value.clone());
        }

        // 策略 4: 标签提示子串包含
        if long_enough {
            if let Some(hint) = self
                .hints
                .iter()
                .find(|h| h.label_lower.contains(&lower) || lower.contains(&h.label_lower))
            {
                return Some(hint.value.clone());
            }
        }

        // 策略 5: 编辑距离近邻——只接受唯一最优且过阈值的候选
        let mut best: Option<(f64, &str)> = None;

        for (idx, candidate) in self.lowered.iter().enumerate() {
            let similarity = strsim::normalized_levenshtein(&lower, candidate);
            if similarity >= FUZZY_ACCEPT_THRESHOLD
                && best.map_or(true, |(score, _)| similarity > score)
            {
                best = Some((similarity, &self.canonical[idx]));
            }
        }

        for hint in &self.hints {
            let similarity = strsim::normalized_levenshtein(&lower, &hint.label_lower);
            if similarity >= FUZZY_ACCEPT_THRESHOLD
                && best.map_or(true, |(score, _)| similarity > score)
            {
                best = Some((similarity, &hint.value));
            }
        }

        best.map(|(_, value)| value.to_string())
    }
}
