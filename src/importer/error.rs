// ==========================================
// 多租户 CRM - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分级: 行级校验错误不在此处——它们是预期结果，走 RowResult；
//       这里只表达会中止整次导入的失败
// ==========================================

use crate::repository::RepoError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误 =====
    #[error("文件格式不支持: {0}（仅支持 .xlsx/.xls/.csv）")]
    UnsupportedFormat(String),

    #[error("文件无数据行: {0}")]
    EmptySheet(String),

    #[error("文件读取失败: {0}")]
    FileReadError(String),

    #[error("Excel 解析失败: {0}")]
    ExcelParseError(String),

    #[error("CSV 解析失败: {0}")]
    CsvParseError(String),

    // ===== 配置错误 =====
    #[error("导入配置加载失败: {0}")]
    ConfigLoadError(String),

    // ===== 查重错误 =====
    // 基础设施故障，调用方可重试；在任何插入发生前中止导入
    #[error("存量查重失败（可重试）: {0}")]
    DuplicateLookupFailed(String),

    // ===== 通用错误 =====
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

impl From<RepoError> for ImportError {
    fn from(err: RepoError) -> Self {
        match err {
            // 表未建应在调用处按空集容忍，走到这里说明是真实故障
            RepoError::TableMissing(msg) => ImportError::InternalError(msg),
            RepoError::Query(msg) | RepoError::Lock(msg) => ImportError::InternalError(msg),
        }
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
