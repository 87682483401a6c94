//! 结果排序：补全分类/分组名称，按置信度降序、名称升序输出
use std::collections::BTreeMap;

use crate::compiler::Catalog;
use crate::rule::DetectionResult;

use super::resolver::ResolvedTech;

/// 结果排序器
pub struct ResultRanker;

impl ResultRanker {
    /// 生成最终结果列表（不截断）
    pub fn rank(catalog: &Catalog, resolved: BTreeMap<String, ResolvedTech>) -> Vec<DetectionResult> {
        let mut results: Vec<DetectionResult> = resolved
            .into_values()
            .map(|tech| Self::to_result(catalog, tech))
            .collect();

        results.sort_by(|a, b| {
            b.confidence
                .cmp(&a.confidence)
                .then_with(|| a.name.cmp(&b.name))
        });
        results
    }

    fn to_result(catalog: &Catalog, tech: ResolvedTech) -> DetectionResult {
        let definition = catalog.get(&tech.name);

        // 分类按技术声明顺序，未知ID跳过
        let categories: Vec<_> = definition
            .map(|def| def.category_ids.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|id| catalog.category(*id))
            .collect();

        let mut groups: Vec<String> = Vec::new();
        for group_name in categories
            .iter()
            .flat_map(|category| category.group_ids.iter())
            .filter_map(|id| catalog.group_name(*id))
        {
            if !groups.iter().any(|existing| existing == group_name) {
                groups.push(group_name.to_string());
            }
        }

        let implied_by = if tech.direct {
            Vec::new()
        } else {
            tech.implied_by.into_iter().collect()
        };

        DetectionResult {
            categories: categories.iter().map(|category| category.name.clone()).collect(),
            groups,
            implied_by,
            #[cfg(feature = "full-meta")]
            website: definition.and_then(|def| def.website.clone()),
            #[cfg(feature = "full-meta")]
            description: definition.and_then(|def| def.description.clone()),
            #[cfg(feature = "full-meta")]
            icon: definition.and_then(|def| def.icon.clone()),
            #[cfg(feature = "full-meta")]
            cpe: definition.and_then(|def| def.cpe.clone()),
            name: tech.name,
            confidence: tech.confidence,
            versions: tech.versions,
        }
    }
}
