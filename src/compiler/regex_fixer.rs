//! 正则修复器
//! 把 Wappalyzer 指纹中 `regex` 库不支持的写法改写为可编译的等价（或更宽松）形式

use once_cell::sync::Lazy;
use regex::Regex;

// 环视：(?=…) (?!…) (?<=…) (?<!…)，内部允许一层嵌套括号，非精确解析
static LOOK_AROUND_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\(\?\s*(?:=|!|<=|<!)(?:[^()\\]|\\.|\((?:[^()\\]|\\.)*\))*\)").unwrap()
});

// `regex` 支持的字母/数字转义
const SUPPORTED_ALNUM_ESCAPES: &str = "dDwWsSbBAzntrfvaxuUpPkK";

/// 正则修复器
pub struct RegexFixer;

impl RegexFixer {
    /// 修复模式；无需改写时返回 None
    pub fn fix(pattern: &str) -> Option<String> {
        let mut fixed = Self::remove_pcre_delimiter(pattern).to_string();
        fixed = LOOK_AROUND_REGEX.replace_all(&fixed, "").into_owned();
        fixed = Self::clean_invalid_escapes(&fixed);
        fixed = Self::fix_charset_hyphen(&fixed);

        (fixed != pattern).then_some(fixed)
    }

    /// 移除PCRE分隔符（首尾的/）
    fn remove_pcre_delimiter(pattern: &str) -> &str {
        if pattern.len() >= 2 && pattern.starts_with('/') && pattern.ends_with('/') {
            &pattern[1..pattern.len() - 1]
        } else {
            pattern
        }
    }

    /// 丢弃不支持的字母/数字转义前的反斜杠（如 `\i`、`\1`）
    fn clean_invalid_escapes(pattern: &str) -> String {
        let mut cleaned = String::with_capacity(pattern.len());
        let mut chars = pattern.chars();

        while let Some(c) = chars.next() {
            if c != '\\' {
                cleaned.push(c);
                continue;
            }
            match chars.next() {
                Some(next) if next.is_ascii_alphanumeric() && !SUPPORTED_ALNUM_ESCAPES.contains(next) => {
                    cleaned.push(next);
                }
                Some(next) => {
                    cleaned.push('\\');
                    cleaned.push(next);
                }
                // 末尾孤立的反斜杠按字面量处理
                None => cleaned.push_str("\\\\"),
            }
        }

        cleaned
    }

    /// 字符集中与 `\w` 等类转义相邻的连字符无法构成范围，转义为 `\-`
    fn fix_charset_hyphen(pattern: &str) -> String {
        let chars: Vec<char> = pattern.chars().collect();
        let mut fixed = String::with_capacity(pattern.len());
        let mut in_charset = false;
        let mut i = 0;

        let is_class_escape = |at: usize| {
            at + 1 < chars.len() && chars[at] == '\\' && "dDwWsS".contains(chars[at + 1])
        };

        while i < chars.len() {
            let c = chars[i];
            match c {
                '\\' => {
                    fixed.push(c);
                    if let Some(next) = chars.get(i + 1) {
                        fixed.push(*next);
                    }
                    i += 2;
                    continue;
                }
                '[' if !in_charset => in_charset = true,
                ']' if in_charset => in_charset = false,
                '-' if in_charset => {
                    let after_class = i >= 2 && is_class_escape(i - 2);
                    let before_class = is_class_escape(i + 1);
                    if after_class || before_class {
                        fixed.push_str("\\-");
                        i += 1;
                        continue;
                    }
                }
                _ => {}
            }
            fixed.push(c);
            i += 1;
        }

        fixed
    }
}
