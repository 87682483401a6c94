//! 编译后模式模型
//! 加载期把原始规则编译为强类型结构，匹配期不再解析任何字符串指令

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use serde::Serialize;

use super::compiler::RuleCompiler;
use crate::config::EngineConfig;
use crate::error::WappResult;
use crate::rule::RuleLoader;
use crate::utils::{VersionExtractor, VersionTemplate};

/// 规则作用的页面字段
///
/// 键值型字段的键在编译期统一转为小写，与 [`crate::page::PageView`] 的小写键对齐。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldSelector {
    Url,
    Html,
    Script,
    Header(String),
    Cookie(String),
    Meta(String),
    Dns(String),
    CertIssuer,
}

impl FieldSelector {
    /// 从 `url` / `header:<name>` 这类文本形式解析
    pub fn parse(raw: &str) -> Option<Self> {
        let (kind, key) = match raw.split_once(':') {
            Some((kind, key)) => (kind, Some(key.trim().to_lowercase())),
            None => (raw, None),
        };

        match (kind.trim(), key) {
            ("url", None) => Some(FieldSelector::Url),
            ("html", None) => Some(FieldSelector::Html),
            ("script", None) => Some(FieldSelector::Script),
            ("certIssuer", None) => Some(FieldSelector::CertIssuer),
            ("header", Some(key)) if !key.is_empty() => Some(FieldSelector::Header(key)),
            ("cookie", Some(key)) if !key.is_empty() => Some(FieldSelector::Cookie(key)),
            ("meta", Some(key)) if !key.is_empty() => Some(FieldSelector::Meta(key)),
            ("dns", Some(key)) if !key.is_empty() => Some(FieldSelector::Dns(key)),
            _ => None,
        }
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldSelector::Url => write!(f, "url"),
            FieldSelector::Html => write!(f, "html"),
            FieldSelector::Script => write!(f, "script"),
            FieldSelector::Header(key) => write!(f, "header:{key}"),
            FieldSelector::Cookie(key) => write!(f, "cookie:{key}"),
            FieldSelector::Meta(key) => write!(f, "meta:{key}"),
            FieldSelector::Dns(key) => write!(f, "dns:{key}"),
            FieldSelector::CertIssuer => write!(f, "certIssuer"),
        }
    }
}

/// 单条规则对单个候选值的匹配结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    NoMatch,
    Match {
        confidence: u8,
        version: Option<String>,
    },
}

impl RuleOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, RuleOutcome::Match { .. })
    }
}

/// 编译后的单条签名规则
#[derive(Debug, Clone)]
pub struct SignatureRule {
    pub selector: FieldSelector,
    pub regex: Regex,
    pub confidence: u8,
    pub version: Option<VersionTemplate>,
}

impl SignatureRule {
    /// 对单个候选字符串执行搜索匹配（大小写不敏感，编译期已设置）
    pub fn evaluate(&self, candidate: &str) -> RuleOutcome {
        let Some(captures) = self.regex.captures(candidate) else {
            return RuleOutcome::NoMatch;
        };

        RuleOutcome::Match {
            confidence: self.confidence,
            version: self
                .version
                .as_ref()
                .and_then(|template| VersionExtractor::extract(template, &captures)),
        }
    }

    /// 规则描述（日志用）
    pub fn describe(&self) -> &str {
        self.regex.as_str()
    }
}

/// implies 关联边
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpliedTech {
    pub name: String,
    // 边自带的 `\;confidence:N` 标签
    pub confidence: Option<u8>,
}

/// 编译后的技术定义
#[derive(Debug, Clone)]
pub struct TechnologyDefinition {
    pub name: String,
    pub rules: Vec<SignatureRule>,
    pub category_ids: Vec<u32>,
    pub implies: Vec<ImpliedTech>,
    pub excludes: Vec<String>,
    pub website: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub cpe: Option<String>,
}

/// 分类
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: u32,
    pub name: String,
    pub group_ids: Vec<u32>,
}

/// 规则编译告警：单条畸形规则被跳过，不影响其他规则
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleCompileWarning {
    pub technology: String,
    pub selector: String,
    pub pattern: String,
    pub message: String,
}

impl fmt::Display for RuleCompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} 规则 `{}` 已跳过：{}",
            self.technology, self.selector, self.pattern, self.message
        )
    }
}

/// 编译后的指纹库（不可变快照）
///
/// 构建完成后不再修改；多线程共享时包一层 `Arc`，刷新时整体替换。
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub(crate) technologies: BTreeMap<String, TechnologyDefinition>,
    pub(crate) categories: BTreeMap<u32, Category>,
    pub(crate) groups: BTreeMap<u32, String>,
    pub(crate) warnings: Vec<RuleCompileWarning>,
}

impl Catalog {
    /// 从路径加载并编译
    pub fn load(path: &Path, config: &EngineConfig) -> WappResult<Self> {
        let rule_lib = RuleLoader::load_path(path)?;
        Ok(RuleCompiler::compile(&rule_lib, config))
    }

    /// 从JSON文本加载并编译
    pub fn from_json_str(content: &str, config: &EngineConfig) -> WappResult<Self> {
        let rule_lib = RuleLoader::from_json_str(content)?;
        Ok(RuleCompiler::compile(&rule_lib, config))
    }

    /// 从JSON值加载并编译
    pub fn from_value(value: serde_json::Value, config: &EngineConfig) -> WappResult<Self> {
        let rule_lib = RuleLoader::from_value(value)?;
        Ok(RuleCompiler::compile(&rule_lib, config))
    }

    pub fn into_shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn get(&self, name: &str) -> Option<&TechnologyDefinition> {
        self.technologies.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.technologies.contains_key(name)
    }

    /// 按技术名升序遍历
    pub fn technologies(&self) -> impl Iterator<Item = &TechnologyDefinition> {
        self.technologies.values()
    }

    pub fn category(&self, id: u32) -> Option<&Category> {
        self.categories.get(&id)
    }

    pub fn group_name(&self, id: u32) -> Option<&str> {
        self.groups.get(&id).map(String::as_str)
    }

    pub fn warnings(&self) -> &[RuleCompileWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.technologies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.technologies.is_empty()
    }
}
