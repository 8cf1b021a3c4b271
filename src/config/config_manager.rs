// ==========================================
// 多租户 CRM - 导入配置管理器
// ==========================================
// 职责: 从 import_configs 表读取租户配置、合并默认值、进程级缓存
// 存储: import_configs (company_id, schema_json, duplicate_policy_default, version)
// 容错: 表未建 / 解析失败 → 回退默认配置
// ==========================================

use crate::config::import_config_trait::ImportConfigProvider;
use crate::config::validation_config::{merge_with_defaults, SchemaJson, ValidationConfig};
use crate::db::open_sqlite_connection;
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use tracing::warn;

// ==========================================
// ConfigManager - rusqlite 实现
// ==========================================
pub struct ImportConfigManager {
    conn: Arc<Mutex<Connection>>,
    cache: Mutex<HashMap<String, ValidationConfig>>,
}

impl ImportConfigManager {
    /// 创建新的 ImportConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// 从已有连接创建（连接行为由调用方保证已统一配置）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            conn,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// 读取单个租户的配置行
    fn query_config_row(
        &self,
        company_id: &str,
    ) -> Result<Option<(Option<String>, Option<String>, Option<i64>)>, Box<dyn Error>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?;

        let row = conn
            .query_row(
                "SELECT schema_json, duplicate_policy_default, version
                 FROM import_configs WHERE company_id = ?1",
                params![company_id],
                |row| {
                    Ok((
                        row.get::<_, Option<String>>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                    ))
                },
            )
            .optional()?;

        Ok(row)
    }
}

#[async_trait]
impl ImportConfigProvider for ImportConfigManager {
    async fn get_config(
        &self,
        company_id: Option<&str>,
    ) -> Result<ValidationConfig, Box<dyn Error>> {
        let company_id = match company_id {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => return Ok(ValidationConfig::default()),
        };

        if let Some(cached) = self
            .cache
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?
            .get(&company_id)
        {
            return Ok(cached.clone());
        }

        let config = match self.query_config_row(&company_id) {
            Ok(Some((schema_json, duplicate_policy, version))) => match schema_json {
                Some(raw) => match serde_json::from_str::<SchemaJson>(&raw) {
                    Ok(schema) => merge_with_defaults(schema, duplicate_policy, version),
                    Err(e) => {
                        warn!(company_id = %company_id, error = %e, "schema_json 解析失败，使用默认配置");
                        ValidationConfig::default()
                    }
                },
                None => ValidationConfig::default(),
            },
            Ok(None) => ValidationConfig::default(),
            Err(e) => {
                // 表未建（尚未初始化的租户库）按默认配置处理
                if e.to_string().contains("no such table") {
                    ValidationConfig::default()
                } else {
                    warn!(company_id = %company_id, error = %e, "读取导入配置失败，使用默认配置");
                    ValidationConfig::default()
                }
            }
        };

        self.cache
            .lock()
            .map_err(|e| format!("锁获取失败: {}", e))?
            .insert(company_id, config.clone());

        Ok(config)
    }

    async fn invalidate(&self, company_id: Option<&str>) {
        if let Ok(mut cache) = self.cache.lock() {
            match company_id {
                Some(id) => {
                    cache.remove(id);
                }
                None => cache.clear(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager_with_table() -> ImportConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE import_configs (
                company_id TEXT PRIMARY KEY,
                schema_json TEXT,
                duplicate_policy_default TEXT,
                version INTEGER
            );",
        )
        .unwrap();
        ImportConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_no_company_returns_default() {
        let manager = setup_manager_with_table();
        let config = manager.get_config(None).await.unwrap();
        assert_eq!(config, ValidationConfig::default());
    }

    #[tokio::test]
    async fn test_missing_table_returns_default() {
        let conn = Connection::open_in_memory().unwrap();
        let manager = ImportConfigManager::from_connection(Arc::new(Mutex::new(conn)));
        let config = manager.get_config(Some("acme")).await.unwrap();
        assert_eq!(config, ValidationConfig::default());
    }

    #[tokio::test]
    async fn test_tenant_override_and_invalidation() {
        let manager = setup_manager_with_table();

        {
            let conn = manager.conn.lock().unwrap();
            conn.execute(
                "INSERT INTO import_configs (company_id, schema_json, duplicate_policy_default, version)
                 VALUES ('acme', '{\"enums\":{\"status\":[\"new\",\"won\"]}}', 'update', 3)",
                [],
            )
            .unwrap();
        }

        let config = manager.get_config(Some("acme")).await.unwrap();
        assert_eq!(config.version, 3);
        assert_eq!(config.enums["status"], vec!["new", "won"]);

        // 修改配置后，未失效的缓存仍返回旧值
        {
            let conn = manager.conn.lock().unwrap();
            conn.execute(
                "UPDATE import_configs SET version = 4 WHERE company_id = 'acme'",
                [],
            )
            .unwrap();
        }
        let cached = manager.get_config(Some("acme")).await.unwrap();
        assert_eq!(cached.version, 3);

        // 强制失效后读取到新值
        manager.invalidate(Some("acme")).await;
        let reloaded = manager.get_config(Some("acme")).await.unwrap();
        assert_eq!(reloaded.version, 4);
    }
}
