// ==========================================
// 多租户 CRM - 字段归一化工具
// ==========================================
// 职责: TRIM / NULL 标准化 / 邮箱小写化 / 电话分隔符剥离 / 格式校验
// 要点: 查重集合与行级归一化必须使用同一套函数，保证成员比较精确
// ==========================================

use once_cell::sync::Lazy;
use regex::Regex;

/// local@domain.tld 形态（禁止空白与多余 @）
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("邮箱正则非法"));

/// 剥离分隔符后的宽松国际号码形态
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?\d{6,16}$").expect("电话正则非法"));

/// TRIM + 空串标准化为 None
pub fn normalize_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// 邮箱归一化: TRIM + 小写
pub fn normalize_email(value: &str) -> Option<String> {
    normalize_text(value).map(|v| v.to_lowercase())
}

/// 电话归一化: 保留前导 +，剥离所有非数字字符
///
/// 不间断空格（U+00A0）按普通空格处理——电子表格粘贴的常见噪声
pub fn normalize_phone(value: &str) -> Option<String> {
    let cleaned = value.replace('\u{00A0}', " ");
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (prefix, rest) = match trimmed.strip_prefix('+') {
        Some(rest) => ("+", rest),
        None => ("", trimmed),
    };

    let digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    Some(format!("{}{}", prefix, digits))
}

/// 校验归一化后的邮箱格式
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// 校验归一化后的电话格式
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}
