//! 指纹库加载器
//! 负责从本地文件 / 目录 / JSON 文本读取原始规则库（不负责下载与缓存刷新）

use std::collections::BTreeMap;
use std::fs;
use std::iter;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::model::{CategoryRule, GroupRule, RuleLibrary, TechRule};
use crate::error::{HarWappError, WappResult};

const TECHNOLOGIES_FILE: &str = "technologies.json";
const TECHNOLOGIES_DIR: &str = "technologies";
const CATEGORIES_FILE: &str = "categories.json";
const GROUPS_FILE: &str = "groups.json";

/// 指纹库加载器
pub struct RuleLoader;

impl RuleLoader {
    /// 按路径加载：目录走数据目录布局，文件走单文件布局
    pub fn load_path(path: &Path) -> WappResult<RuleLibrary> {
        if path.is_dir() {
            Self::load_dir(path)
        } else {
            Self::load_file(path)
        }
    }

    /// 加载数据目录
    ///
    /// 目录布局（与 webappanalyzer 数据仓库一致）：
    /// - `categories.json`、`groups.json`（缺失时仅告警）
    /// - `technologies.json`，或分片目录 `technologies/_.json`、`technologies/a.json` … `z.json`
    pub fn load_dir(dir: &Path) -> WappResult<RuleLibrary> {
        let category_rules: BTreeMap<u32, CategoryRule> =
            Self::read_optional(&dir.join(CATEGORIES_FILE))?.unwrap_or_default();
        let group_rules: BTreeMap<u32, GroupRule> =
            Self::read_optional(&dir.join(GROUPS_FILE))?.unwrap_or_default();

        let mut tech_rules = BTreeMap::new();
        let single_file = dir.join(TECHNOLOGIES_FILE);
        if single_file.is_file() {
            tech_rules = Self::read_json(&single_file)?;
        } else {
            let shard_dir = dir.join(TECHNOLOGIES_DIR);
            let shards = iter::once('_')
                .chain('a'..='z')
                .map(|c| shard_dir.join(format!("{c}.json")));
            for shard in shards {
                if let Some(part) = Self::read_optional::<BTreeMap<String, TechRule>>(&shard)? {
                    tech_rules.extend(part);
                }
            }
        }

        Self::ensure_not_empty(&tech_rules, &dir.display().to_string())?;

        debug!(
            "指纹库目录加载完成：{}，技术规则数：{}，分类数：{}，分组数：{}",
            dir.display(),
            tech_rules.len(),
            category_rules.len(),
            group_rules.len()
        );

        Ok(RuleLibrary {
            tech_rules,
            category_rules,
            group_rules,
        })
    }

    /// 加载单个JSON文件（合并文档或纯技术规则表）
    pub fn load_file(path: &Path) -> WappResult<RuleLibrary> {
        let content = fs::read_to_string(path).map_err(|e| {
            HarWappError::CatalogLoadError(format!("读取 {} 失败：{}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// 从JSON文本加载
    pub fn from_json_str(content: &str) -> WappResult<RuleLibrary> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| HarWappError::CatalogParseError(e.to_string()))?;
        Self::from_value(value)
    }

    /// 从JSON值加载
    ///
    /// 顶层含 `technologies`（或 `apps`）键时按合并文档解析，
    /// 否则整个对象视为 `技术名 -> 技术规则` 表。
    pub fn from_value(value: Value) -> WappResult<RuleLibrary> {
        let combined = match &value {
            Value::Object(map) => map.contains_key("technologies") || map.contains_key("apps"),
            _ => {
                return Err(HarWappError::CatalogParseError(
                    "指纹库顶层必须是JSON对象".to_string(),
                ))
            }
        };

        let lib = if combined {
            serde_json::from_value::<RuleLibrary>(value)
                .map_err(|e| HarWappError::CatalogParseError(e.to_string()))?
        } else {
            RuleLibrary {
                tech_rules: serde_json::from_value(value)
                    .map_err(|e| HarWappError::CatalogParseError(e.to_string()))?,
                ..Default::default()
            }
        };

        Self::ensure_not_empty(&lib.tech_rules, "JSON文档")?;
        if lib.category_rules.is_empty() {
            warn!("指纹库未包含分类数据，检测结果的 categories/groups 将为空");
        }
        Ok(lib)
    }

    /// 分别从技术/分类/分组三份JSON文本加载
    pub fn from_parts(
        technologies: &str,
        categories: Option<&str>,
        groups: Option<&str>,
    ) -> WappResult<RuleLibrary> {
        let parse_err = |what: &str, e: serde_json::Error| {
            HarWappError::CatalogParseError(format!("{what}：{e}"))
        };

        let tech_rules: BTreeMap<String, TechRule> =
            serde_json::from_str(technologies).map_err(|e| parse_err("technologies", e))?;
        Self::ensure_not_empty(&tech_rules, "technologies")?;

        Ok(RuleLibrary {
            tech_rules,
            category_rules: categories
                .map(serde_json::from_str)
                .transpose()
                .map_err(|e| parse_err("categories", e))?
                .unwrap_or_default(),
            group_rules: groups
                .map(serde_json::from_str)
                .transpose()
                .map_err(|e| parse_err("groups", e))?
                .unwrap_or_default(),
        })
    }

    /// 没有任何技术规则的指纹库视为加载失败（所有加载入口一致）
    fn ensure_not_empty(tech_rules: &BTreeMap<String, TechRule>, source: &str) -> WappResult<()> {
        if tech_rules.is_empty() {
            return Err(HarWappError::CatalogLoadError(format!(
                "{} 中未找到任何技术规则",
                source
            )));
        }
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> WappResult<T> {
        let bytes = fs::read(path).map_err(|e| {
            HarWappError::CatalogLoadError(format!("读取 {} 失败：{}", path.display(), e))
        })?;
        serde_json::from_slice(&bytes)
            .map_err(|e| HarWappError::CatalogParseError(format!("{}：{}", path.display(), e)))
    }

    fn read_optional<T: DeserializeOwned>(path: &Path) -> WappResult<Option<T>> {
        if !path.is_file() {
            debug!("可选指纹文件不存在，跳过：{}", path.display());
            return Ok(None);
        }
        Self::read_json(path).map(Some)
    }
}
