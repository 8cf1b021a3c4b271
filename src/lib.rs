// ==========================================
// 多租户 CRM - 线索批量导入库
// ==========================================
// 分层:
// - domain:     领域实体（原始行 / 归一化线索 / 导入报告）
// - config:     租户级校验配置（加载 / 合并 / 缓存 / 失效）
// - repository: 数据访问（查重 / 批量写入 / 表结构探测 / 历史 / 遥测）
// - importer:   导入管道（解析 / 归一化 / 校验 / 查重 / 落库）
// ==========================================

pub mod config;
pub mod db;
pub mod domain;
pub mod importer;
pub mod logging;
pub mod repository;

pub use config::{ImportConfigManager, ImportConfigProvider, ValidationConfig};
pub use domain::{ImportMode, ImportReport, NormalizedLead, RawRow, RowResult};
pub use importer::{
    ImportError, ImportRequest, ImportResult, LeadImporter, LeadImporterImpl,
};
pub use repository::{LeadImportRepository, LeadImportRepositoryImpl};

/// 应用名称
pub const APP_NAME: &str = "crm-lead-import";

/// 应用版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
