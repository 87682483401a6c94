//! 关联关系推导：implies 求不动点，excludes 在不动点之后一次性剔除
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::compiler::Catalog;
use crate::config::ImpliedConfidence;
use crate::utils::PartialDetection;

/// 推导后的单技术结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTech {
    pub name: String,
    pub confidence: u8,
    pub versions: Vec<String>,
    // 通过 implies 边加入该技术的来源（直接检测到的为空）
    pub implied_by: BTreeSet<String>,
    pub direct: bool,
}

impl From<PartialDetection> for ResolvedTech {
    fn from(detection: PartialDetection) -> Self {
        Self {
            name: detection.name,
            confidence: detection.confidence,
            versions: detection.versions,
            implied_by: BTreeSet::new(),
            direct: true,
        }
    }
}

/// 关联关系推导器
pub struct RelationshipResolver;

impl RelationshipResolver {
    /// 展开 implies 直到不动点，再统一应用 excludes
    ///
    /// 结果与技术的遍历顺序无关。
    pub fn resolve(
        catalog: &Catalog,
        detected: BTreeMap<String, PartialDetection>,
        policy: ImpliedConfidence,
    ) -> BTreeMap<String, ResolvedTech> {
        let mut resolved: BTreeMap<String, ResolvedTech> = detected
            .into_iter()
            .map(|(name, detection)| (name, ResolvedTech::from(detection)))
            .collect();

        // (来源, 目标) -> 该边上次应用时的来源置信度
        let mut applied: FxHashMap<(String, String), u8> = FxHashMap::default();
        let mut worklist: VecDeque<String> = resolved.keys().cloned().collect();

        while let Some(source) = worklist.pop_front() {
            let Some(source_confidence) = resolved.get(&source).map(|tech| tech.confidence) else {
                continue;
            };
            let Some(definition) = catalog.get(&source) else {
                continue;
            };

            for edge in &definition.implies {
                if edge.name == source {
                    continue;
                }
                if !catalog.contains(&edge.name) {
                    debug!("implies 目标不在指纹库中，已跳过：{} -> {}", source, edge.name);
                    continue;
                }

                let key = (source.clone(), edge.name.clone());
                if applied.get(&key).is_some_and(|last| *last >= source_confidence) {
                    continue;
                }
                applied.insert(key, source_confidence);

                let implied_confidence = edge
                    .confidence
                    .unwrap_or_else(|| policy.apply(source_confidence))
                    .min(100);

                let changed = match resolved.get_mut(&edge.name) {
                    // 直接检测到的技术不被推导结果覆盖
                    Some(target) if target.direct => {
                        target.implied_by.insert(source.clone());
                        false
                    }
                    Some(target) => {
                        target.implied_by.insert(source.clone());
                        if implied_confidence > target.confidence {
                            target.confidence = implied_confidence;
                            true
                        } else {
                            false
                        }
                    }
                    None => {
                        resolved.insert(
                            edge.name.clone(),
                            ResolvedTech {
                                name: edge.name.clone(),
                                confidence: implied_confidence,
                                versions: Vec::new(),
                                implied_by: BTreeSet::from([source.clone()]),
                                direct: false,
                            },
                        );
                        true
                    }
                };

                if changed {
                    debug!(
                        "implies 推导：{} -> {}（置信度{}）",
                        source, edge.name, implied_confidence
                    );
                    worklist.push_back(edge.name.clone());
                }
            }
        }

        // 基于完整展开集合一次性计算排除集
        let excluded: FxHashSet<&str> = resolved
            .keys()
            .filter_map(|name| catalog.get(name))
            .flat_map(|definition| definition.excludes.iter().map(String::as_str))
            .collect();

        if excluded.is_empty() {
            return resolved;
        }

        resolved
            .into_iter()
            .filter(|(name, _)| {
                let keep = !excluded.contains(name.as_str());
                if !keep {
                    debug!("excludes 剔除：{}", name);
                }
                keep
            })
            .collect()
    }
}
