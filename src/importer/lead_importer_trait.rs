// ==========================================
// 多租户 CRM - 线索导入器 Trait
// ==========================================
// 职责: 定义导入编排接口（试运行 / 正式导入）
// 实现者: LeadImporterImpl、测试 Mock
// ==========================================

use crate::domain::ImportReport;
use crate::importer::error::ImportResult;
use crate::importer::file_parser::HeaderMapping;
use async_trait::async_trait;

/// 单次导入请求
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// 源表头 → 字段名；空映射时表头按小写原名透传
    pub header_mapping: HeaderMapping,
    pub company_id: Option<String>,
    pub user_id: Option<String>,
}

impl ImportRequest {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
            header_mapping: HeaderMapping::new(),
            company_id: None,
            user_id: None,
        }
    }

    pub fn with_company(mut self, company_id: impl Into<String>) -> Self {
        self.company_id = Some(company_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_header_mapping(mut self, mapping: HeaderMapping) -> Self {
        self.header_mapping = mapping;
        self
    }
}

// ==========================================
// LeadImporter Trait
// ==========================================
#[async_trait]
pub trait LeadImporter: Send + Sync {
    /// 试运行: 完整校验但不落库（遥测仍记录）
    async fn dry_run(&self, request: ImportRequest) -> ImportResult<ImportReport>;

    /// 正式导入: 校验 + 分批插入 + 历史 + 遥测
    async fn import(&self, request: ImportRequest) -> ImportResult<ImportReport>;
}
