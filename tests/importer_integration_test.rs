// ==========================================
// LeadImporter 集成测试
// ==========================================
// 测试目标: 真实 SQLite 上的完整导入流程
// 覆盖: 试运行 / 正式导入 / 旧版表结构适配 / 租户配置重载 / 存量查重
// ==========================================

mod test_helpers;

use crm_lead_import::config::{ImportConfigManager, ImportConfigProvider};
use crm_lead_import::importer::{ImportRequest, LeadImporter, LeadImporterImpl};
use crm_lead_import::logging;
use crm_lead_import::repository::{LeadImportRepository, LeadImportRepositoryImpl};
use rusqlite::Connection;
use std::sync::Arc;
use test_helpers::{
    count_rows, create_legacy_test_db, create_test_db, insert_existing_lead,
    insert_import_config,
};

/// 创建测试用的 LeadImporter 实例
fn create_test_importer(db_path: &str) -> LeadImporterImpl {
    logging::init_test();

    let repo = Arc::new(
        LeadImportRepositoryImpl::new(db_path).expect("Failed to create LeadImportRepository"),
    );
    let config = Arc::new(
        ImportConfigManager::new(db_path).expect("Failed to create ImportConfigManager"),
    );

    LeadImporterImpl::new(
        repo as Arc<dyn LeadImportRepository>,
        config as Arc<dyn ImportConfigProvider>,
    )
}

fn csv_request(csv: &str) -> ImportRequest {
    ImportRequest::new("leads.csv", csv.as_bytes().to_vec())
        .with_company("company-1")
        .with_user("user-1")
}

#[tokio::test]
async fn test_import_mixed_valid_and_invalid_rows() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let importer = create_test_importer(&db_path);

    let csv = "first_name,last_name,email,status\n\
               张,三,zhang.san@example.com,Contacted\n\
               李,,li@example.com,new\n";
    let report = importer.import(csv_request(csv)).await.unwrap();

    assert_eq!(report.total_records, 2);
    assert_eq!(report.valid_count, 1);
    assert_eq!(report.invalid_count, 1);
    assert_eq!(report.successful_imports, Some(1));
    assert_eq!(report.failed_imports, Some(1));
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].row, 2);
    assert_eq!(report.errors[0].errors, vec!["last_name is required"]);

    // 仅有效行落库
    assert_eq!(count_rows(&db_path, "leads").unwrap(), 1);
    // 历史与遥测各记录一条
    assert_eq!(count_rows(&db_path, "import_history").unwrap(), 1);
    assert_eq!(count_rows(&db_path, "import_telemetry").unwrap(), 1);

    // 落库内容经过归一化
    let conn = Connection::open(&db_path).unwrap();
    let (email, status, company_id): (String, String, String) = conn
        .query_row(
            "SELECT email, status, company_id FROM leads",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(email, "zhang.san@example.com");
    assert_eq!(status, "contacted");
    assert_eq!(company_id, "company-1");
}

#[tokio::test]
async fn test_later_row_fields_survive_mixed_batch() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let importer = create_test_importer(&db_path);

    // 首行缺 email，次行携带——同批次内列集必须一致，
    // 否则次行的 email 会在插入时悄悄丢失
    let csv = "first_name,last_name,email\n\
               A,一,\n\
               B,二,keep@x.com\n";
    let report = importer.import(csv_request(csv)).await.unwrap();

    assert_eq!(report.successful_imports, Some(2));

    let conn = Connection::open(&db_path).unwrap();
    let email: Option<String> = conn
        .query_row(
            "SELECT email FROM leads WHERE first_name = 'B'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(email.as_deref(), Some("keep@x.com"));

    let first_email: Option<String> = conn
        .query_row(
            "SELECT email FROM leads WHERE first_name = 'A'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(first_email, None);
}

#[tokio::test]
async fn test_dry_run_leaves_leads_untouched() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let importer = create_test_importer(&db_path);

    let csv = "first_name,last_name\n张,三\n李,四\n";
    let report = importer.dry_run(csv_request(csv)).await.unwrap();

    assert_eq!(report.valid_count, 2);
    assert_eq!(report.successful_imports, None);
    assert_eq!(count_rows(&db_path, "leads").unwrap(), 0);
    assert_eq!(count_rows(&db_path, "import_history").unwrap(), 0);

    // 试运行仍记录遥测
    let conn = Connection::open(&db_path).unwrap();
    let phase: String = conn
        .query_row("SELECT phase FROM import_telemetry", [], |row| row.get(0))
        .unwrap();
    assert_eq!(phase, "dry_run");
}

#[tokio::test]
async fn test_legacy_schema_columns_renamed() {
    let (_tmp, db_path) = create_legacy_test_db().unwrap();
    let importer = create_test_importer(&db_path);

    let csv = "first_name,last_name,job_title,lead_source\n张,三,工程师,referral\n";
    let report = importer.import(csv_request(csv)).await.unwrap();

    assert_eq!(report.successful_imports, Some(1));

    let conn = Connection::open(&db_path).unwrap();
    let (position, source): (String, String) = conn
        .query_row("SELECT position, source FROM leads", [], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })
        .unwrap();
    assert_eq!(position, "工程师");
    assert_eq!(source, "referral");
}

#[tokio::test]
async fn test_store_duplicate_email_blocks_row() {
    let (_tmp, db_path) = create_test_db().unwrap();
    insert_existing_lead(&db_path, "company-1", Some("old@x.com"), None).unwrap();
    let importer = create_test_importer(&db_path);

    let csv = "first_name,last_name,email\n张,三,OLD@X.COM\n";
    let report = importer.import(csv_request(csv)).await.unwrap();

    assert_eq!(report.invalid_count, 1);
    assert_eq!(report.errors[0].errors, vec!["Email already exists"]);
    // 存量行之外不应新增
    assert_eq!(count_rows(&db_path, "leads").unwrap(), 1);
}

#[tokio::test]
async fn test_store_duplicate_scoped_to_tenant() {
    let (_tmp, db_path) = create_test_db().unwrap();
    // 同邮箱属于另一租户，不构成重复
    insert_existing_lead(&db_path, "company-other", Some("old@x.com"), None).unwrap();
    let importer = create_test_importer(&db_path);

    let csv = "first_name,last_name,email\n张,三,old@x.com\n";
    let report = importer.import(csv_request(csv)).await.unwrap();

    assert_eq!(report.valid_count, 1);
    assert_eq!(report.successful_imports, Some(1));
}

#[tokio::test]
async fn test_tenant_config_reloaded_between_imports() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let importer = create_test_importer(&db_path);

    let csv = "first_name,last_name\n张,三\n";

    // 默认配置: email 非必填，导入成功
    let report = importer.import(csv_request(csv)).await.unwrap();
    assert_eq!(report.valid_count, 1);
    assert_eq!(report.config_version, 1);

    // 两次导入之间修改租户配置: email 变为必填
    insert_import_config(
        &db_path,
        "company-1",
        r#"{"requiredFields": ["first_name", "last_name", "email"]}"#,
        "skip",
        2,
    )
    .unwrap();

    // 编排器每次导入前强制失效缓存，新配置立即生效
    let report = importer.import(csv_request(csv)).await.unwrap();
    assert_eq!(report.invalid_count, 1);
    assert_eq!(report.config_version, 2);
    assert_eq!(report.errors[0].errors, vec!["email is required"]);
}

#[tokio::test]
async fn test_tenant_enum_override_applied() {
    let (_tmp, db_path) = create_test_db().unwrap();
    insert_import_config(
        &db_path,
        "company-1",
        r#"{"enums": {"status": ["prospect", "won"]}}"#,
        "skip",
        3,
    )
    .unwrap();
    let importer = create_test_importer(&db_path);

    let csv = "first_name,last_name,status\n张,三,Won\n李,四,contacted\n";
    let report = importer.dry_run(csv_request(csv)).await.unwrap();

    assert_eq!(report.valid_count, 1);
    assert_eq!(report.invalid_count, 1);
    assert_eq!(
        report.errors[0].errors,
        vec!["Invalid status. Allowed values: prospect, won"]
    );
}

#[tokio::test]
async fn test_excel_style_date_and_numbers_normalized() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let importer = create_test_importer(&db_path);

    // 45000 是 Excel 序列号（2023-03-15）
    let csv = "first_name,last_name,deal_value,probability,expected_close_date\n\
               张,三,1500.5,60,45000\n";
    let report = importer.import(csv_request(csv)).await.unwrap();
    assert_eq!(report.successful_imports, Some(1));

    let conn = Connection::open(&db_path).unwrap();
    let (deal_value, probability, close_date): (f64, i64, String) = conn
        .query_row(
            "SELECT deal_value, probability, expected_close_date FROM leads",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(deal_value, 1500.5);
    assert_eq!(probability, 60);
    assert_eq!(close_date, "2023-03-15");
}
