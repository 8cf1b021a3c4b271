// ==========================================
// 多租户 CRM - 线索导入命令行入口
// ==========================================
// 用法: crm-lead-import <db> <file> [--dry-run] [--company <id>]
//       [--user <id>] [--map <源表头>=<字段名>]...
// 输出: 导入报告 JSON 到标准输出
// ==========================================

use anyhow::{bail, Context, Result};
use crm_lead_import::config::ImportConfigManager;
use crm_lead_import::importer::{HeaderMapping, ImportRequest, LeadImporter, LeadImporterImpl};
use crm_lead_import::repository::LeadImportRepositoryImpl;
use crm_lead_import::{logging, APP_NAME, VERSION};
use std::sync::Arc;
use tracing::info;

struct CliArgs {
    db_path: String,
    file_path: String,
    dry_run: bool,
    company_id: Option<String>,
    user_id: Option<String>,
    header_mapping: HeaderMapping,
}

fn usage() -> String {
    format!(
        "{} {}\n用法: {} <db> <file> [--dry-run] [--company <id>] [--user <id>] [--map <源表头>=<字段名>]...",
        APP_NAME, VERSION, APP_NAME
    )
}

fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut positional = Vec::new();
    let mut dry_run = false;
    let mut company_id = None;
    let mut user_id = None;
    let mut header_mapping = HeaderMapping::new();

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--dry-run" => dry_run = true,
            "--company" => {
                company_id = Some(
                    iter.next()
                        .context("--company 需要一个租户 ID 参数")?
                        .clone(),
                );
            }
            "--user" => {
                user_id = Some(iter.next().context("--user 需要一个用户 ID 参数")?.clone());
            }
            "--map" => {
                let pair = iter.next().context("--map 需要 <源表头>=<字段名> 参数")?;
                let (header, field) = pair
                    .split_once('=')
                    .context("--map 参数格式应为 <源表头>=<字段名>")?;
                header_mapping.insert(header.to_string(), field.to_string());
            }
            "--help" | "-h" => bail!("{}", usage()),
            other if other.starts_with("--") => bail!("未知参数: {}\n{}", other, usage()),
            _ => positional.push(arg.clone()),
        }
    }

    if positional.len() != 2 {
        bail!("{}", usage());
    }

    Ok(CliArgs {
        db_path: positional[0].clone(),
        file_path: positional[1].clone(),
        dry_run,
        company_id,
        user_id,
        header_mapping,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_args(&args)?;

    let repo = Arc::new(
        LeadImportRepositoryImpl::new(&cli.db_path)
            .with_context(|| format!("打开数据库失败: {}", cli.db_path))?,
    );
    let config_provider = Arc::new(
        ImportConfigManager::new(&cli.db_path)
            .map_err(|e| anyhow::anyhow!("初始化配置管理器失败: {}", e))?,
    );
    let importer = LeadImporterImpl::new(repo, config_provider);

    let bytes = std::fs::read(&cli.file_path)
        .with_context(|| format!("读取导入文件失败: {}", cli.file_path))?;
    let file_name = std::path::Path::new(&cli.file_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.file_path.clone());

    let mut request =
        ImportRequest::new(file_name, bytes).with_header_mapping(cli.header_mapping);
    if let Some(company_id) = cli.company_id {
        request = request.with_company(company_id);
    }
    if let Some(user_id) = cli.user_id {
        request = request.with_user(user_id);
    }

    info!(
        mode = if cli.dry_run { "dry_run" } else { "import" },
        file = %cli.file_path,
        "启动导入"
    );

    let report = if cli.dry_run {
        importer.dry_run(request).await?
    } else {
        importer.import(request).await?
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_basic_args() {
        let cli = parse_args(&args(&["crm.db", "leads.csv"])).unwrap();
        assert_eq!(cli.db_path, "crm.db");
        assert_eq!(cli.file_path, "leads.csv");
        assert!(!cli.dry_run);
        assert!(cli.company_id.is_none());
    }

    #[test]
    fn test_parse_flags() {
        let cli = parse_args(&args(&[
            "crm.db",
            "leads.xlsx",
            "--dry-run",
            "--company",
            "company-1",
            "--map",
            "First Name=first_name",
        ]))
        .unwrap();

        assert!(cli.dry_run);
        assert_eq!(cli.company_id.as_deref(), Some("company-1"));
        assert_eq!(
            cli.header_mapping.get("First Name").map(String::as_str),
            Some("first_name")
        );
    }

    #[test]
    fn test_missing_positional_args_rejected() {
        assert!(parse_args(&args(&["crm.db"])).is_err());
        assert!(parse_args(&args(&["crm.db", "a.csv", "--company"])).is_err());
    }
}
