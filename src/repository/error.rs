// ==========================================
// 多租户 CRM - Repository 错误类型
// ==========================================
// 工具: thiserror 派生宏
// 要点: "表未建"与真实基础设施故障必须区分——
//       前者在查重/配置读取路径上按"无存量数据"容忍
// ==========================================

use thiserror::Error;

/// 数据访问层错误类型
#[derive(Error, Debug)]
pub enum RepoError {
    /// 目标表尚未建立（租户库未初始化），非致命
    #[error("目标表未建: {0}")]
    TableMissing(String),

    #[error("数据库查询失败: {0}")]
    Query(String),

    #[error("锁获取失败: {0}")]
    Lock(String),
}

impl From<rusqlite::Error> for RepoError {
    fn from(err: rusqlite::Error) -> Self {
        let msg = err.to_string();
        if msg.contains("no such table") {
            RepoError::TableMissing(msg)
        } else {
            RepoError::Query(msg)
        }
    }
}

/// Result 类型别名
pub type RepoResult<T> = Result<T, RepoError>;
