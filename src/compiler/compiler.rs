//! 规则编译器核心
//! 将原始规则编译为强类型签名规则：解析 `\;version:` / `\;confidence:` 指令、编译正则、收集告警

use std::collections::BTreeMap;
use std::time::Instant;

use regex::{Regex, RegexBuilder};
use serde_json::Value;
use tracing::{debug, warn};

use super::regex_fixer::RegexFixer;
use super::pattern::{
    Catalog, Category, FieldSelector, ImpliedTech, RuleCompileWarning, SignatureRule,
    TechnologyDefinition,
};
use crate::config::EngineConfig;
use crate::rule::{RuleLibrary, TechRule};
use crate::utils::VersionTemplate;

/// 规则指令分隔符（Wappalyzer 语法，JSON 中写作 `\\;`）
const DIRECTIVE_SEPARATOR: &str = "\\;";
const DEFAULT_CONFIDENCE: u8 = 100;

/// 规则编译器
pub struct RuleCompiler;

impl RuleCompiler {
    /// 编译规则库
    ///
    /// 编译本身不会失败：畸形规则记为 [`RuleCompileWarning`] 并跳过。
    pub fn compile(rule_lib: &RuleLibrary, config: &EngineConfig) -> Catalog {
        let start = Instant::now();
        let mut stats = CompileStats::default();
        let mut warnings = Vec::new();

        // 1. 构建分类/分组映射
        let categories = rule_lib
            .category_rules
            .iter()
            .map(|(id, rule)| {
                (
                    *id,
                    Category {
                        id: *id,
                        name: rule.name.clone(),
                        group_ids: rule.groups.clone(),
                    },
                )
            })
            .collect();
        let groups = rule_lib
            .group_rules
            .iter()
            .map(|(id, rule)| (*id, rule.name.clone()))
            .collect();

        // 2. 编译每个技术规则
        let mut technologies = BTreeMap::new();
        for (tech_name, tech_rule) in &rule_lib.tech_rules {
            let compiled = TechCompiler {
                tech_name,
                config,
                stats: &mut stats,
                warnings: &mut warnings,
                rules: Vec::new(),
            }
            .compile(tech_rule);
            technologies.insert(tech_name.clone(), compiled);
        }

        for warning in &warnings {
            warn!("规则编译失败：{}", warning);
        }

        // 3. 输出编译统计
        debug!("✅ 规则编译完成，总耗时{:?}", start.elapsed());
        debug!(
            "📊 编译统计：URL{}条、HTML{}条、Script{}条、Header{}条、Cookie{}条、Meta{}条、DNS{}条、证书{}条，跳过{}条",
            stats.url_count,
            stats.html_count,
            stats.script_count,
            stats.header_count,
            stats.cookie_count,
            stats.meta_count,
            stats.dns_count,
            stats.cert_count,
            stats.invalid_count
        );

        Catalog {
            technologies,
            categories,
            groups,
            warnings,
        }
    }
}

/// 单个技术的编译上下文
struct TechCompiler<'a> {
    tech_name: &'a str,
    config: &'a EngineConfig,
    stats: &'a mut CompileStats,
    warnings: &'a mut Vec<RuleCompileWarning>,
    rules: Vec<SignatureRule>,
}

impl TechCompiler<'_> {
    fn compile(mut self, tech_rule: &TechRule) -> TechnologyDefinition {
        // 列表型规则
        self.compile_list(FieldSelector::Url, tech_rule.url.as_ref());
        self.compile_list(FieldSelector::Html, tech_rule.html.as_ref());
        // script 与 scriptSrc 合并为脚本URL规则
        self.compile_list(FieldSelector::Script, tech_rule.script_src.as_ref());
        self.compile_list(FieldSelector::Script, tech_rule.scripts.as_ref());
        self.compile_list(FieldSelector::CertIssuer, tech_rule.cert_issuer.as_ref());

        // 键值型规则
        self.compile_keyed(FieldSelector::Header, tech_rule.headers.as_ref());
        self.compile_keyed(FieldSelector::Cookie, tech_rule.cookies.as_ref());
        self.compile_keyed(FieldSelector::Meta, tech_rule.meta.as_ref());
        self.compile_keyed(FieldSelector::Dns, tech_rule.dns.as_ref());

        let implies = tagged_names(tech_rule.implies.as_ref())
            .into_iter()
            .map(|(name, confidence)| ImpliedTech { name, confidence })
            .collect();
        let excludes = tagged_names(tech_rule.excludes.as_ref())
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        TechnologyDefinition {
            name: self.tech_name.to_string(),
            rules: self.rules,
            category_ids: tech_rule.category_ids.clone(),
            implies,
            excludes,
            website: tech_rule.website.clone(),
            description: tech_rule.description.clone(),
            icon: tech_rule.icon.clone(),
            cpe: tech_rule.cpe.clone(),
        }
    }

    /// 编译列表型模式（url/html/script/certIssuer）
    fn compile_list(&mut self, selector: FieldSelector, value: Option<&Value>) {
        let Some(value) = value else {
            return;
        };

        for raw in self.pattern_strings(&selector, value) {
            self.compile_single(selector.clone(), &raw);
        }
    }

    /// 编译键值型模式（header/cookie/meta/dns），键统一转小写
    fn compile_keyed(
        &mut self,
        make_selector: fn(String) -> FieldSelector,
        value: Option<&BTreeMap<String, Value>>,
    ) {
        let Some(value) = value else {
            return;
        };

        for (key, patterns) in value {
            let selector = make_selector(key.trim().to_lowercase());
            for raw in self.pattern_strings(&selector, patterns) {
                self.compile_single(selector.clone(), &raw);
            }
        }
    }

    /// 兼容单字符串/数组两种写法，其他类型记告警
    fn pattern_strings(&mut self, selector: &FieldSelector, value: &Value) -> Vec<String> {
        match value {
            Value::String(s) => vec![s.clone()],
            Value::Array(arr) => arr
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    other => {
                        self.warn(selector, &other.to_string(), "规则类型不支持，应为字符串");
                        None
                    }
                })
                .collect(),
            other => {
                self.warn(selector, &other.to_string(), "规则类型不支持，应为字符串或字符串数组");
                Vec::new()
            }
        }
    }

    /// 编译单条规则：拆分指令、解析版本模板与置信度、编译正则
    fn compile_single(&mut self, selector: FieldSelector, raw_pattern: &str) {
        let mut parts = raw_pattern.split(DIRECTIVE_SEPARATOR);
        let core = parts.next().unwrap_or("");

        let mut confidence = DEFAULT_CONFIDENCE;
        let mut version = None;
        for directive in parts {
            match directive.split_once(':') {
                Some(("version", template)) => version = VersionTemplate::parse(template),
                Some(("confidence", value)) => match value.trim().parse::<i64>() {
                    Ok(value) => confidence = value.clamp(0, 100) as u8,
                    Err(_) => self.warn(
                        &selector,
                        raw_pattern,
                        &format!("置信度 `{}` 不是整数，按{}处理", value, DEFAULT_CONFIDENCE),
                    ),
                },
                _ => debug!(
                    "忽略未知规则指令：技术={}，规则={}，指令={}",
                    self.tech_name, raw_pattern, directive
                ),
            }
        }

        // 原样编译失败时尝试修复（环视、PCRE分隔符、无效转义、字符集连字符）
        let regex = self.build_regex(core).or_else(|err| match RegexFixer::fix(core) {
            Some(fixed) => {
                let regex = self.build_regex(&fixed).map_err(|_| err)?;
                debug!(
                    "规则已修复：技术={}，原规则={}，修复后={}",
                    self.tech_name, core, fixed
                );
                Ok(regex)
            }
            None => Err(err),
        });

        match regex {
            Ok(regex) => {
                self.stats.record(&selector);
                self.rules.push(SignatureRule {
                    selector,
                    regex,
                    confidence,
                    version,
                });
            }
            Err(e) => {
                self.stats.invalid_count += 1;
                self.warn(&selector, raw_pattern, &e.to_string());
            }
        }
    }

    fn build_regex(&self, pattern: &str) -> Result<Regex, regex::Error> {
        RegexBuilder::new(pattern)
            .case_insensitive(true)
            .size_limit(self.config.regex_size_limit)
            .build()
    }

    fn warn(&mut self, selector: &FieldSelector, pattern: &str, message: &str) {
        self.warnings.push(RuleCompileWarning {
            technology: self.tech_name.to_string(),
            selector: selector.to_string(),
            pattern: pattern.to_string(),
            message: message.to_string(),
        });
    }
}

/// 解析 implies/excludes：兼容单字符串/数组，支持 `名称\;confidence:N` 标签
fn tagged_names(value: Option<&Value>) -> Vec<(String, Option<u8>)> {
    let raw_names: Vec<&str> = match value {
        Some(Value::String(s)) => vec![s.as_str()],
        Some(Value::Array(arr)) => arr.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    };

    raw_names
        .into_iter()
        .filter_map(|raw| {
            let mut parts = raw.split(DIRECTIVE_SEPARATOR);
            let name = parts.next().unwrap_or("").trim();
            if name.is_empty() {
                return None;
            }
            let confidence = parts
                .filter_map(|tag| tag.split_once(':'))
                .find(|(key, _)| *key == "confidence")
                .and_then(|(_, value)| value.trim().parse::<i64>().ok())
                .map(|value| value.clamp(0, 100) as u8);
            Some((name.to_string(), confidence))
        })
        .collect()
}

/// 编译统计信息
#[derive(Debug, Clone, Default)]
struct CompileStats {
    url_count: usize,
    html_count: usize,
    script_count: usize,
    header_count: usize,
    cookie_count: usize,
    meta_count: usize,
    dns_count: usize,
    cert_count: usize,
    invalid_count: usize,
}

impl CompileStats {
    fn record(&mut self, selector: &FieldSelector) {
        let counter = match selector {
            FieldSelector::Url => &mut self.url_count,
            FieldSelector::Html => &mut self.html_count,
            FieldSelector::Script => &mut self.script_count,
            FieldSelector::Header(_) => &mut self.header_count,
            FieldSelector::Cookie(_) => &mut self.cookie_count,
            FieldSelector::Meta(_) => &mut self.meta_count,
            FieldSelector::Dns(_) => &mut self.dns_count,
            FieldSelector::CertIssuer => &mut self.cert_count,
        };
        *counter += 1;
    }
}
