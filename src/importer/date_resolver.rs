// ==========================================
// 多租户 CRM - 弹性日期解析器
// ==========================================
// 职责: 把电子表格中的异构日期表示解析为日历日期
// 契约: 纯函数、全函数（不 panic）、幂等、无 I/O
// 支持: Excel 序列号 / ISO / 月日年 / 日月年（首段 >12 时）/ 英文月名
// ==========================================

use chrono::{Datelike, Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// 合法结果年份下界（低于 1900 视为录入串位，直接判失败）
const MIN_YEAR: i32 = 1900;
/// 合法结果年份上界
const MAX_YEAR: i32 = 2100;

/// Excel 序列号上界（约对应 3542 年，远超合法年份区间即拒绝）
const MAX_EXCEL_SERIAL: i64 = 600_000;

/// 四位年在前的数字日期前缀，`-` 或 `/` 分隔（允许尾随时间部分）
static ISO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})[-/](\d{1,2})[-/](\d{1,2})").expect("ISO 日期正则非法"));

/// A/B/YYYY 或 A-B-YYYY（A、B 为 1-2 位数字）
static NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[/-](\d{1,2})[/-](\d{4})").expect("数字日期正则非法"));

/// 英文月名缩写（按月序）
const MONTH_TOKENS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// 日期解析输入
///
/// 上游（Excel 解析等）可能已经拿到日历日期对象，走 Date 分支直接透传
#[derive(Debug, Clone, Copy)]
pub enum DateInput<'a> {
    Text(&'a str),
    Date(NaiveDate),
}

/// 解析异构日期输入
///
/// # 返回
/// - Some(NaiveDate): 解析成功且日历合法（含闰年规则）
/// - None: 空值 / 无法解析 / 日历非法 / 年份越界
pub fn resolve(input: DateInput<'_>) -> Option<NaiveDate> {
    match input {
        // chrono 的 NaiveDate 构造即保证内部合法，仅做年份越界防御
        DateInput::Date(date) => in_year_bounds(date),
        DateInput::Text(text) => resolve_str(text),
    }
}

/// 解析文本形式的日期
pub fn resolve_str(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    // 规则 1: 纯数字串（≥5 位）按 Excel 序列号解释
    if trimmed.len() >= 5 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        return resolve_excel_serial(trimmed);
    }

    // 规则 2: 年份在前的 ISO 形态
    if let Some(caps) = ISO_RE.captures(trimmed) {
        let year: i32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let day: u32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day).and_then(in_year_bounds);
    }

    // 规则 3: 两段数字 + 四位年。默认月/日/年；首段 >12 时只能是日，改按日/月/年
    if let Some(caps) = NUMERIC_RE.captures(trimmed) {
        let first: u32 = caps[1].parse().ok()?;
        let second: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;

        let parsed = if first > 12 {
            NaiveDate::from_ymd_opt(year, second, first)
        } else {
            NaiveDate::from_ymd_opt(year, first, second)
        };
        return parsed.and_then(in_year_bounds);
    }

    // 规则 4: 含英文月名的写法（"Oct 17, 2025" / "17 Oct 2025" / "17-Oct-2025"）
    if let Some(date) = resolve_month_name(trimmed) {
        return in_year_bounds(date);
    }

    None
}

/// Excel 序列号 → 日历日期
///
/// 纪元取 1899-12-30：该纪元已吸收 Excel 虚构的 1900-02-29
/// （≥5 位的序列号远大于 60，不会落在虚构闰日之前）
fn resolve_excel_serial(digits: &str) -> Option<NaiveDate> {
    let serial: i64 = digits.parse().ok()?;
    if !(1..=MAX_EXCEL_SERIAL).contains(&serial) {
        return None;
    }

    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch
        .checked_add_signed(Duration::days(serial))
        .and_then(in_year_bounds)
}

/// 含月名的日期: 定位月份 token，剩余数字按 4 位年 + 1-31 日归位
fn resolve_month_name(value: &str) -> Option<NaiveDate> {
    let lower = value.to_lowercase();
    let month = MONTH_TOKENS
        .iter()
        .position(|token| lower.contains(token))
        .map(|idx| (idx + 1) as u32)?;

    let numbers: Vec<i64> = lower
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();

    let year = numbers.iter().copied().find(|&n| n >= 1000)? as i32;
    let day = numbers
        .iter()
        .copied()
        .find(|&n| n < 1000 && (1..=31).contains(&n))? as u32;

    NaiveDate::from_ymd_opt(year, month, day)
}

fn in_year_bounds(date: NaiveDate) -> Option<NaiveDate> {
    if (MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        Some(date)
    } else {
        None
    }
}
