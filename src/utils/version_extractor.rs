//! 版本提取工具模块
//! 负责从正则捕获结果中，根据版本模板提取合法的技术版本号
//! 模板在加载期解析为 [`VersionTemplate`]，匹配期只做分组替换

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// 分组引用占位符：`\1`、`\2` …
static GROUP_REF_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\(\d+)").unwrap());

/// 三元模板：`\1?真值:假值`
static TERNARY_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\\(\d+)\?([^:]*):(.*)$").unwrap());

/// 解析后的版本模板
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionTemplate {
    /// 普通模板，如 `\1`、`\1.\2`、常量 `2`
    Always(String),
    /// 三元模板：分组 `group` 参与匹配时取 `present`，否则取 `absent`
    Conditional {
        group: usize,
        present: String,
        absent: String,
    },
}

impl VersionTemplate {
    /// 解析原始模板，空白模板返回 None
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Some(caps) = TERNARY_REGEX.captures(raw) {
            if let Ok(group) = caps[1].parse::<usize>() {
                return Some(VersionTemplate::Conditional {
                    group,
                    present: caps[2].to_string(),
                    absent: caps[3].to_string(),
                });
            }
        }

        Some(VersionTemplate::Always(raw.to_string()))
    }
}

/// 版本提取工具类
pub struct VersionExtractor;

impl VersionExtractor {
    /// 从正则捕获结果中提取有效版本号
    ///
    /// - 引用未参与匹配的分组时替换为空串，不报错
    /// - 替换后只剩空白或分隔符（如 `.`、`-`）的版本视为未提取到版本
    pub fn extract(template: &VersionTemplate, captures: &Captures) -> Option<String> {
        let expr = match template {
            VersionTemplate::Always(expr) => expr.as_str(),
            VersionTemplate::Conditional {
                group,
                present,
                absent,
            } => {
                let participated = captures
                    .get(*group)
                    .is_some_and(|m| !m.as_str().is_empty());
                if participated {
                    present.as_str()
                } else {
                    absent.as_str()
                }
            }
        };

        let version = GROUP_REF_REGEX.replace_all(expr, |group_ref: &Captures| {
            group_ref[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| captures.get(index))
                .map(|m| m.as_str().trim().to_string())
                .unwrap_or_default()
        });

        let version = version.trim();
        if version.chars().any(char::is_alphanumeric) {
            Some(version.to_string())
        } else {
            None
        }
    }
}
