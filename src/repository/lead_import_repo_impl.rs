// ==========================================
// 多租户 CRM - 线索导入 Repository 实现
// ==========================================
// 职责: 实现导入相关数据访问（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::{ImportHistoryRecord, TelemetryEvent};
use crate::repository::error::{RepoError, RepoResult};
use crate::repository::lead_import_repo::{LeadImportRepository, LeadInsertRow};
use async_trait::async_trait;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, ToSql};
use std::sync::{Arc, Mutex};

// ==========================================
// LeadImportRepositoryImpl
// ==========================================
pub struct LeadImportRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl LeadImportRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepoResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 Repository
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 查询某一列在租户范围内的命中值
    ///
    /// 单值分片使用等值查询，多值分片使用 IN 集合查询
    fn find_existing_values(
        &self,
        column: &str,
        company_id: &str,
        values: &[String],
    ) -> RepoResult<Vec<String>> {
        if values.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self
            .conn
            .lock()
            .map_err(|e| RepoError::Lock(e.to_string()))?;

        let sql = if values.len() == 1 {
            format!(
                "SELECT {col} FROM leads WHERE company_id = ?1 AND {col} = ?2",
                col = column
            )
        } else {
            let placeholders = (0..values.len())
                .map(|i| format!("?{}", i + 2))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "SELECT {col} FROM leads WHERE company_id = ?1 AND {col} IN ({placeholders})",
                col = column,
                placeholders = placeholders
            )
        };

        let mut stmt = conn.prepare(&sql)?;

        let mut sql_params: Vec<&dyn ToSql> = Vec::with_capacity(values.len() + 1);
        sql_params.push(&company_id);
        for value in values {
            sql_params.push(value);
        }

        let rows = stmt.query_map(sql_params.as_slice(), |row| row.get::<_, String>(0))?;

        let mut found = Vec::new();
        for row in rows {
            found.push(row?);
        }
        Ok(found)
    }
}

/// JSON 值 → SQLite 值
fn json_to_sql(value: &serde_json::Value) -> SqlValue {
    match value {
        serde_json::Value::Null => SqlValue::Null,
        serde_json::Value::Bool(b) => SqlValue::Integer(*b as i64),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else {
                SqlValue::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => SqlValue::Text(s.clone()),
        // 结构化值以 JSON 文本落库
        other => SqlValue::Text(other.to_string()),
    }
}

#[async_trait]
impl LeadImportRepository for LeadImportRepositoryImpl {
    async fn find_existing_emails(
        &self,
        company_id: &str,
        emails: &[String],
    ) -> RepoResult<Vec<String>> {
        self.find_existing_values("email", company_id, emails)
    }

    async fn find_existing_phones(
        &self,
        company_id: &str,
        phones: &[String],
    ) -> RepoResult<Vec<String>> {
        self.find_existing_values("phone", company_id, phones)
    }

    async fn lead_table_columns(&self) -> RepoResult<Vec<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepoError::Lock(e.to_string()))?;

        let mut stmt = conn.prepare("PRAGMA table_info(leads)")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(1))?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }

        // PRAGMA 对不存在的表返回空集而非报错
        if columns.is_empty() {
            return Err(RepoError::TableMissing("leads".to_string()));
        }

        Ok(columns)
    }

    async fn insert_leads(&self, rows: &[LeadInsertRow]) -> RepoResult<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| RepoError::Lock(e.to_string()))?;

        // 批内事务: 任一行失败则整批回滚，由调用方隔离批次
        let tx = conn.transaction()?;
        let mut count = 0;
        {
            let columns: Vec<&String> = rows[0].keys().collect();
            let placeholders = (1..=columns.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "INSERT INTO leads ({}) VALUES ({})",
                columns
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                placeholders
            );

            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                let values: Vec<SqlValue> = columns
                    .iter()
                    .map(|col| row.get(*col).map(json_to_sql).unwrap_or(SqlValue::Null))
                    .collect();
                let sql_params: Vec<&dyn ToSql> =
                    values.iter().map(|v| v as &dyn ToSql).collect();
                stmt.execute(sql_params.as_slice())?;
                count += 1;
            }
        }
        tx.commit()?;

        Ok(count)
    }

    async fn insert_import_history(&self, record: &ImportHistoryRecord) -> RepoResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepoError::Lock(e.to_string()))?;

        conn.execute(
            "INSERT INTO import_history (
                import_id, file_name, company_id, user_id,
                total_records, successful_imports, failed_imports,
                errors, warning_count, duplicate_policy, config_version,
                duration_ms, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                record.import_id,
                record.file_name,
                record.company_id,
                record.user_id,
                record.total_records as i64,
                record.successful_imports as i64,
                record.failed_imports as i64,
                record.errors_json,
                record.warning_count as i64,
                record.duplicate_policy,
                record.config_version,
                record.duration_ms as i64,
                record.created_at,
            ],
        )?;

        Ok(())
    }

    async fn insert_telemetry(&self, event: &TelemetryEvent) -> RepoResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepoError::Lock(e.to_string()))?;

        conn.execute(
            "INSERT INTO import_telemetry (
                phase, company_id, user_id, file_name, stats,
                warning_count, error_count, duplicate_policy,
                config_version, duration_ms, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                event.phase,
                event.company_id,
                event.user_id,
                event.file_name,
                event.stats.to_string(),
                event.warning_count as i64,
                event.error_count as i64,
                event.duplicate_policy,
                event.config_version,
                event.duration_ms.map(|v| v as i64),
                event.created_at,
            ],
        )?;

        Ok(())
    }
}
