// ==========================================
// 多租户 CRM - 数据仓储层
// ==========================================
// 职责: 线索导入相关数据访问（查重 / 批量写入 / 表结构探测 / 历史 / 遥测）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

pub mod error;
pub mod lead_import_repo;
pub mod lead_import_repo_impl;

pub use error::{RepoError, RepoResult};
pub use lead_import_repo::{LeadImportRepository, LeadInsertRow};
pub use lead_import_repo_impl::LeadImportRepositoryImpl;
