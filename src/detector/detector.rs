//! 检测器核心：整合签名匹配、关联推导与排序，输出检测结果
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use super::analyzer::SignatureMatcher;
use super::ranker::ResultRanker;
use super::resolver::RelationshipResolver;
use crate::compiler::{Catalog, RuleCompileWarning};
use crate::config::EngineConfig;
use crate::error::WappResult;
use crate::page::{PageRecord, PageView};
use crate::rule::DetectionResult;

/// 单次分析输出
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Analysis {
    pub technologies: Vec<DetectionResult>,
    // 指纹库编译期收集的非致命告警
    pub warnings: Vec<RuleCompileWarning>,
}

/// 技术检测器
///
/// 持有指纹库快照，分析过程无状态、不做任何I/O，可跨线程共享。
#[derive(Debug, Clone)]
pub struct TechDetector {
    catalog: Arc<Catalog>,
    config: EngineConfig,
}

impl TechDetector {
    /// 创建检测器
    pub fn new(catalog: Arc<Catalog>, config: EngineConfig) -> Self {
        Self { catalog, config }
    }

    /// 从指纹库路径（目录或单个JSON文件）加载并创建检测器
    pub fn from_path(path: &Path, config: EngineConfig) -> WappResult<Self> {
        let catalog = Catalog::load(path, &config)?;
        Ok(Self::new(catalog.into_shared(), config))
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// 核心检测接口
    pub fn analyze(&self, page: &PageRecord) -> Analysis {
        Analysis {
            technologies: self.detect(page),
            warnings: self.catalog.warnings().to_vec(),
        }
    }

    /// 仅返回检测结果列表
    pub fn detect(&self, page: &PageRecord) -> Vec<DetectionResult> {
        let start = Instant::now();

        // 1. 归一化页面数据
        let view = PageView::new(page, &self.config);

        // 2. 逐技术匹配签名
        let detected = SignatureMatcher::analyze(&self.catalog, &view);
        let direct_count = detected.len();

        // 3. 应用关联推导规则
        let resolved =
            RelationshipResolver::resolve(&self.catalog, detected, self.config.implied_confidence);

        // 4. 转换为最终结果
        let technologies = ResultRanker::rank(&self.catalog, resolved);

        if self.config.verbose {
            info!(
                "检测完成：{}，直接命中{}个，最终{}个，耗时{:?}",
                page.url,
                direct_count,
                technologies.len(),
                start.elapsed()
            );
        } else {
            debug!("检测完成：{}，最终{}个技术", page.url, technologies.len());
        }

        technologies
    }
}

/// 使用默认配置对单个页面执行检测
pub fn analyze(catalog: &Arc<Catalog>, page: &PageRecord) -> Analysis {
    TechDetector::new(Arc::clone(catalog), EngineConfig::default()).analyze(page)
}
