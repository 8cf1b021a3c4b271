// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、测试数据生成等功能
// ==========================================

use rusqlite::Connection;
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化现代版 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("临时路径非 UTF-8")?.to_string();

    let conn = Connection::open(&db_path)?;
    init_modern_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 创建使用旧版 leads 表结构的测试数据库（position/source 列）
pub fn create_legacy_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("临时路径非 UTF-8")?.to_string();

    let conn = Connection::open(&db_path)?;
    init_legacy_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 初始化现代版 schema（job_title/lead_source 列）
fn init_modern_schema(conn: &Connection) -> Result<(), Box<dyn Error>> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id TEXT,
            first_name TEXT,
            last_name TEXT,
            email TEXT,
            phone TEXT,
            company TEXT,
            job_title TEXT,
            lead_source TEXT,
            status TEXT,
            priority TEXT,
            deal_value REAL,
            probability INTEGER,
            expected_close_date TEXT,
            notes TEXT,
            created_at TEXT,
            updated_at TEXT
        )
        "#,
        [],
    )?;

    init_aux_tables(conn)?;
    Ok(())
}

/// 初始化旧版 schema（position/source 列，无扩展业务列）
fn init_legacy_schema(conn: &Connection) -> Result<(), Box<dyn Error>> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS leads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            company_id TEXT,
            first_name TEXT,
            last_name TEXT,
            email TEXT,
            phone TEXT,
            company TEXT,
            position TEXT,
            source TEXT,
            status TEXT,
            notes TEXT,
            created_at TEXT,
            updated_at TEXT
        )
        "#,
        [],
    )?;

    init_aux_tables(conn)?;
    Ok(())
}

/// 配置 / 历史 / 遥测表（两版 schema 共用）
fn init_aux_tables(conn: &Connection) -> Result<(), Box<dyn Error>> {
    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS import_configs (
            company_id TEXT PRIMARY KEY,
            schema_json TEXT,
            duplicate_policy_default TEXT,
            version INTEGER NOT NULL DEFAULT 1,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS import_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            import_id TEXT NOT NULL,
            file_name TEXT NOT NULL,
            company_id TEXT,
            user_id TEXT,
            total_records INTEGER NOT NULL,
            successful_imports INTEGER NOT NULL,
            failed_imports INTEGER NOT NULL,
            errors TEXT,
            warning_count INTEGER NOT NULL DEFAULT 0,
            duplicate_policy TEXT,
            config_version INTEGER,
            duration_ms INTEGER,
            created_at TEXT NOT NULL
        )
        "#,
        [],
    )?;

    conn.execute(
        r#"
        CREATE TABLE IF NOT EXISTS import_telemetry (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            phase TEXT NOT NULL,
            company_id TEXT,
            user_id TEXT,
            file_name TEXT,
            stats TEXT,
            warning_count INTEGER NOT NULL DEFAULT 0,
            error_count INTEGER NOT NULL DEFAULT 0,
            duplicate_policy TEXT,
            config_version INTEGER,
            duration_ms INTEGER,
            created_at TEXT NOT NULL
        )
        "#,
        [],
    )?;

    Ok(())
}

/// 写入一条租户级导入配置
pub fn insert_import_config(
    db_path: &str,
    company_id: &str,
    schema_json: &str,
    duplicate_policy: &str,
    version: i64,
) -> Result<(), Box<dyn Error>> {
    let conn = Connection::open(db_path)?;
    conn.execute(
        "INSERT OR REPLACE INTO import_configs
            (company_id, schema_json, duplicate_policy_default, version)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![company_id, schema_json, duplicate_policy, version],
    )?;
    Ok(())
}

/// 插入一条存量线索（现代版 schema）
pub fn insert_existing_lead(
    db_path: &str,
    company_id: &str,
    email: Option<&str>,
    phone: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let conn = Connection::open(db_path)?;
    conn.execute(
        "INSERT INTO leads (company_id, first_name, last_name, email, phone)
         VALUES (?1, '存量', '线索', ?2, ?3)",
        rusqlite::params![company_id, email, phone],
    )?;
    Ok(())
}

/// 统计某表行数
pub fn count_rows(db_path: &str, table: &str) -> Result<i64, Box<dyn Error>> {
    let conn = Connection::open(db_path)?;
    let count =
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
    Ok(count)
}
