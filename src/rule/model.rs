//! 指纹库原始数据模型定义
//! 仅存储从 Wappalyzer / webappanalyzer JSON 反序列化出的原始规则，无任何业务逻辑

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 技术规则定义（从 Wappalyzer JSON 解析）
///
/// 模式字段保留为 `serde_json::Value`，兼容单字符串/数组两种写法，
/// 由 [`crate::compiler::RuleCompiler`] 在加载期统一编译。
/// 键值型字段使用 `BTreeMap`，保证规则遍历顺序稳定。
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TechRule {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(rename = "cats", default, alias = "categories")]
    pub category_ids: Vec<u32>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub cpe: Option<String>,

    // 检测规则
    #[serde(default)]
    pub url: Option<Value>,
    #[serde(default)]
    pub html: Option<Value>,
    #[serde(default)]
    pub scripts: Option<Value>,
    // 兼容：Wappalyzer 的 scriptSrc 字段，与 scripts 合并为脚本URL规则
    #[serde(rename = "scriptSrc", default)]
    pub script_src: Option<Value>,
    #[serde(default)]
    pub meta: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub headers: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub cookies: Option<BTreeMap<String, Value>>,
    #[serde(default)]
    pub dns: Option<BTreeMap<String, Value>>,
    #[serde(rename = "certIssuer", default)]
    pub cert_issuer: Option<Value>,

    // 关联规则
    #[serde(default)]
    pub implies: Option<Value>,
    #[serde(default)]
    pub excludes: Option<Value>,
}

/// 分类规则定义（categories.json 的单项，ID 为外层键）
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CategoryRule {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub priority: Option<u32>,
    #[serde(default)]
    pub groups: Vec<u32>,
}

/// 分组规则定义（groups.json 的单项，ID 为外层键）
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GroupRule {
    #[serde(default)]
    pub name: String,
}

/// 完整原始规则库
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RuleLibrary {
    #[serde(rename = "technologies", alias = "apps", default)]
    pub tech_rules: BTreeMap<String, TechRule>,
    #[serde(rename = "categories", default)]
    pub category_rules: BTreeMap<u32, CategoryRule>,
    #[serde(rename = "groups", default)]
    pub group_rules: BTreeMap<u32, GroupRule>,
}
