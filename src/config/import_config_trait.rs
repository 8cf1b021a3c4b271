// ==========================================
// 多租户 CRM - 导入校验配置 Trait
// ==========================================
// 职责: 定义按租户读取校验配置的接口（不包含实现）
// 约束: 必须支持强制缓存失效——每次导入前由编排器调用，
//       保证两次导入之间的配置修改立即生效
// ==========================================

use crate::config::validation_config::ValidationConfig;
use async_trait::async_trait;
use std::error::Error;

// ==========================================
// ImportConfigProvider Trait
// ==========================================
// 实现者: ImportConfigManager（rusqlite）、测试 Mock
#[async_trait]
pub trait ImportConfigProvider: Send + Sync {
    /// 读取租户校验配置
    ///
    /// # 参数
    /// - company_id: 租户 ID；None 时返回默认配置
    ///
    /// # 返回
    /// - Ok(ValidationConfig): 租户配置与默认值合并后的结果
    async fn get_config(
        &self,
        company_id: Option<&str>,
    ) -> Result<ValidationConfig, Box<dyn Error>>;

    /// 使缓存失效
    ///
    /// # 参数
    /// - company_id: 指定租户；None 时清空全部缓存
    async fn invalidate(&self, company_id: Option<&str>);
}
