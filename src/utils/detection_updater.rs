//! 检测结果更新工具
//! 负责累加命中证据：置信度求和封顶100，版本去重合并

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// 关系推导前的单技术检测结果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartialDetection {
    pub name: String,
    pub confidence: u8,
    // 首次出现顺序，已去重
    pub versions: Vec<String>,
}

impl PartialDetection {
    fn add_versions(&mut self, versions: impl IntoIterator<Item = String>) {
        for version in versions {
            if !version.is_empty() && !self.versions.contains(&version) {
                self.versions.push(version);
            }
        }
    }
}

/// 检测结果更新工具
pub struct DetectionUpdater;

impl DetectionUpdater {
    /// 记录一条命中规则
    ///
    /// 置信度默认100；与已有结果累加后封顶100。
    pub fn update(
        detected: &mut BTreeMap<String, PartialDetection>,
        tech_name: &str,
        confidence: Option<u8>,
        versions: impl IntoIterator<Item = String>,
    ) {
        let conf = confidence.unwrap_or(100).min(100);

        match detected.entry(tech_name.to_string()) {
            Entry::Occupied(mut entry) => {
                let existing = entry.get_mut();
                existing.confidence = existing.confidence.saturating_add(conf).min(100);
                existing.add_versions(versions);
            }
            Entry::Vacant(entry) => {
                let mut detection = PartialDetection {
                    name: tech_name.to_string(),
                    confidence: conf,
                    versions: Vec::new(),
                };
                detection.add_versions(versions);
                entry.insert(detection);
            }
        }
    }
}
