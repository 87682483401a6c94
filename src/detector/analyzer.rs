//! 签名匹配器：对单个技术逐条执行规则，汇总命中证据
use std::collections::BTreeMap;

use tracing::debug;

use crate::compiler::{Catalog, RuleOutcome, TechnologyDefinition};
use crate::page::PageView;
use crate::utils::{DetectionUpdater, PartialDetection};

/// 签名匹配器
pub struct SignatureMatcher;

impl SignatureMatcher {
    /// 匹配单个技术
    ///
    /// 任一规则命中即视为检测到；同一规则命中多值字段的多个值时只计一次权重。
    pub fn match_technology(
        tech: &TechnologyDefinition,
        page: &PageView<'_>,
    ) -> Option<PartialDetection> {
        let mut detected = BTreeMap::new();

        for rule in &tech.rules {
            let mut hit = None;
            let mut versions = Vec::new();

            for value in page.values(&rule.selector) {
                if let RuleOutcome::Match { confidence, version } = rule.evaluate(value) {
                    hit = Some(confidence);
                    versions.extend(version);
                }
            }

            let Some(confidence) = hit else {
                continue;
            };

            debug!(
                "规则命中：技术={}，字段={}，版本={:?}，规则={}",
                tech.name,
                rule.selector,
                versions,
                rule.describe()
            );
            DetectionUpdater::update(&mut detected, &tech.name, Some(confidence), versions);
        }

        detected.remove(&tech.name)
    }

    /// 对整个指纹库执行匹配（按技术名升序，结果确定）
    pub fn analyze(catalog: &Catalog, page: &PageView<'_>) -> BTreeMap<String, PartialDetection> {
        catalog
            .technologies()
            .filter_map(|tech| Self::match_technology(tech, page))
            .map(|detection| (detection.name.clone(), detection))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::page::PageRecord;
    use serde_json::json;

    fn catalog() -> Catalog {
        Catalog::from_value(
            json!({
                "technologies": {
                    "Nginx": {
                        "headers": { "Server": "nginx(?:/([\\d.]+))?\\;version:\\1" }
                    },
                    "jQuery": {
                        "scriptSrc": [
                            "jquery[.-]([\\d.]+)(?:\\.min)?\\.js\\;version:\\1\\;confidence:40",
                            "/jquery/\\;confidence:30"
                        ]
                    },
                    "Cloudflare": {
                        "headers": { "cf-ray": "" },
                        "cookies": { "__cfduid": "" }
                    }
                }
            }),
            &EngineConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_header_match_with_version() {
        let catalog = catalog();
        let page = PageRecord::new("https://example.com/").with_header("Server", "nginx/1.25.3");
        let view = PageView::new(&page, &EngineConfig::default());

        let detection = SignatureMatcher::match_technology(catalog.get("Nginx").unwrap(), &view).unwrap();
        assert_eq!(detection.confidence, 100);
        assert_eq!(detection.versions, vec!["1.25.3"]);
    }

    #[test]
    fn test_rule_weight_counts_once_per_rule() {
        let catalog = catalog();
        let page = PageRecord::new("https://example.com/")
            .with_script("/static/jquery-3.6.0.min.js")
            .with_script("/cdn/jquery-1.12.4.js");
        let view = PageView::new(&page, &EngineConfig::default());

        let detection = SignatureMatcher::match_technology(catalog.get("jQuery").unwrap(), &view).unwrap();
        assert_eq!(detection.confidence, 40);
        assert_eq!(detection.versions, vec!["3.6.0", "1.12.4"]);
    }

    #[test]
    fn test_weights_of_different_rules_are_summed() {
        let catalog = catalog();
        let page = PageRecord::new("https://example.com/")
            .with_script("/lib/jquery/jquery-3.6.0.js");
        let view = PageView::new(&page, &EngineConfig::default());

        let detection = SignatureMatcher::match_technology(catalog.get("jQuery").unwrap(), &view).unwrap();
        assert_eq!(detection.confidence, 70);
    }

    #[test]
    fn test_absent_field_is_no_match() {
        let catalog = catalog();
        let page = PageRecord::new("https://example.com/").with_header("Server", "Apache");
        let view = PageView::new(&page, &EngineConfig::default());

        let detected = SignatureMatcher::analyze(&catalog, &view);
        assert!(detected.is_empty());
    }

    #[test]
    fn test_empty_pattern_matches_key_presence() {
        let catalog = catalog();
        let page = PageRecord::new("https://example.com/").with_header("CF-RAY", "7d1c2b3a4e5f-AMS");
        let view = PageView::new(&page, &EngineConfig::default());

        let detected = SignatureMatcher::analyze(&catalog, &view);
        assert_eq!(detected.keys().collect::<Vec<_>>(), vec!["Cloudflare"]);
        assert!(detected["Cloudflare"].versions.is_empty());
    }
}
