// ==========================================
// 多租户 CRM - 配置层
// ==========================================
// 职责: 租户级导入校验配置（加载、合并、缓存、失效）
// ==========================================

pub mod config_manager;
pub mod import_config_trait;
pub mod validation_config;

pub use config_manager::ImportConfigManager;
pub use import_config_trait::ImportConfigProvider;
pub use validation_config::{
    merge_with_defaults, FuzzyHint, NumericRange, SchemaJson, ValidationConfig,
    DEFAULT_CONFIG_VERSION,
};
