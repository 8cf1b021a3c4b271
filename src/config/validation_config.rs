// ==========================================
// 多租户 CRM - 校验配置定义
// ==========================================
// 职责: ValidationConfig 结构 + 默认配置 + schema_json 合并
// 存储: import_configs 表（schema_json 为 JSON 文本，camelCase 键）
// ==========================================

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_CONFIG_VERSION: i64 = 1;

/// 数值范围约束（min/max 任一可缺省）
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
}

/// 模糊匹配提示: 展示标签 ↔ 规范值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuzzyHint {
    pub value: String,
    pub label: String,
}

// ==========================================
// ValidationConfig - 租户级校验配置
// ==========================================
// 生命周期: 进程级缓存 + 显式失效；每次导入前强制重载
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub version: i64,
    pub required_fields: Vec<String>,
    pub optional_fields: Vec<String>,
    /// 字段 → 规范值列表（有序）
    pub enums: BTreeMap<String, Vec<String>>,
    pub numeric_ranges: BTreeMap<String, NumericRange>,
    /// 可选的标签提示（用于把用户侧展示文案映射回规范值）
    #[serde(default)]
    pub fuzzy_match_data: Option<BTreeMap<String, Vec<FuzzyHint>>>,
    /// 重复策略: "skip" / "update"
    pub duplicate_policy: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        let mut enums = BTreeMap::new();
        enums.insert(
            "status".to_string(),
            vec!["new", "contacted", "qualified", "converted", "lost"]
                .into_iter()
                .map(String::from)
                .collect(),
        );
        enums.insert(
            "lead_source".to_string(),
            vec![
                "website",
                "referral",
                "cold_call",
                "social_media",
                "advertisement",
                "other",
                "import",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        );
        enums.insert(
            "priority".to_string(),
            vec!["low", "medium", "high", "urgent"]
                .into_iter()
                .map(String::from)
                .collect(),
        );

        let mut numeric_ranges = BTreeMap::new();
        numeric_ranges.insert(
            "deal_value".to_string(),
            NumericRange {
                min: Some(0.0),
                max: None,
            },
        );
        numeric_ranges.insert(
            "probability".to_string(),
            NumericRange {
                min: Some(0.0),
                max: Some(100.0),
            },
        );

        Self {
            version: DEFAULT_CONFIG_VERSION,
            required_fields: vec!["first_name".to_string(), "last_name".to_string()],
            optional_fields: vec![
                "email",
                "phone",
                "company",
                "job_title",
                "lead_source",
                "status",
                "deal_value",
                "probability",
                "expected_close_date",
                "priority",
                "notes",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            enums,
            numeric_ranges,
            fuzzy_match_data: None,
            duplicate_policy: "skip".to_string(),
        }
    }
}

impl ValidationConfig {
    /// 读取指定字段的数值范围（未配置时返回空范围）
    pub fn numeric_range(&self, field: &str) -> NumericRange {
        self.numeric_ranges.get(field).copied().unwrap_or_default()
    }
}

// ==========================================
// SchemaJson - import_configs.schema_json 的部分结构
// ==========================================
// 说明: 存量数据使用 camelCase 键；缺失的部分用默认值补齐
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemaJson {
    pub required_fields: Option<Vec<String>>,
    pub optional_fields: Option<Vec<String>>,
    pub enums: Option<BTreeMap<String, Vec<String>>>,
    pub numeric_ranges: Option<BTreeMap<String, NumericRange>>,
    pub fuzzy_match_data: Option<BTreeMap<String, Vec<FuzzyHint>>>,
}

/// 将租户 schema_json 与默认配置合并
///
/// # 参数
/// - schema: 解析后的 schema_json
/// - duplicate_policy: import_configs.duplicate_policy_default
/// - version: import_configs.version
pub fn merge_with_defaults(
    schema: SchemaJson,
    duplicate_policy: Option<String>,
    version: Option<i64>,
) -> ValidationConfig {
    let defaults = ValidationConfig::default();

    // 枚举按字段逐个回退到默认值
    let enums = match schema.enums {
        Some(mut overrides) => {
            let mut merged = BTreeMap::new();
            for (field, default_list) in defaults.enums.iter() {
                let list = overrides.remove(field).unwrap_or_else(|| default_list.clone());
                merged.insert(field.clone(), list);
            }
            // 租户自定义的额外枚举字段原样保留
            for (field, list) in overrides {
                merged.insert(field, list);
            }
            merged
        }
        None => defaults.enums.clone(),
    };

    let numeric_ranges = match schema.numeric_ranges {
        Some(mut overrides) => {
            let mut merged = BTreeMap::new();
            for (field, default_range) in defaults.numeric_ranges.iter() {
                let range = overrides.remove(field).unwrap_or(*default_range);
                merged.insert(field.clone(), range);
            }
            for (field, range) in overrides {
                merged.insert(field, range);
            }
            merged
        }
        None => defaults.numeric_ranges.clone(),
    };

    ValidationConfig {
        version: version.unwrap_or(DEFAULT_CONFIG_VERSION),
        required_fields: schema.required_fields.unwrap_or(defaults.required_fields),
        optional_fields: schema.optional_fields.unwrap_or(defaults.optional_fields),
        enums,
        numeric_ranges,
        fuzzy_match_data: schema.fuzzy_match_data,
        duplicate_policy: duplicate_policy.unwrap_or(defaults.duplicate_policy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_enums() {
        let config = ValidationConfig::default();
        assert!(config.enums["status"].contains(&"new".to_string()));
        assert!(config.enums["lead_source"].contains(&"import".to_string()));
        assert_eq!(config.required_fields, vec!["first_name", "last_name"]);
    }

    #[test]
    fn test_merge_partial_schema() {
        let schema: SchemaJson = serde_json::from_str(
            r#"{
                "requiredFields": ["first_name"],
                "enums": { "status": ["new", "won"] }
            }"#,
        )
        .unwrap();

        let merged = merge_with_defaults(schema, Some("update".to_string()), Some(7));

        assert_eq!(merged.version, 7);
        assert_eq!(merged.required_fields, vec!["first_name"]);
        assert_eq!(merged.enums["status"], vec!["new", "won"]);
        // 未覆盖的枚举回退到默认
        assert!(merged.enums["priority"].contains(&"medium".to_string()));
        assert_eq!(merged.duplicate_policy, "update");
    }

    #[test]
    fn test_merge_empty_schema_equals_default() {
        let merged = merge_with_defaults(SchemaJson::default(), None, None);
        assert_eq!(merged, ValidationConfig::default());
    }
}
