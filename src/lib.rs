//! harwappalyzer - 基于 HAR 页面记录的 Wappalyzer 指纹匹配引擎

// 导出全局错误类型
pub use self::error::{HarWappError, WappResult};

// 导出配置模块
pub use self::config::{CustomConfigBuilder, EngineConfig, ImpliedConfidence};

// 导出页面输入模型
pub use self::page::{PageRecord, PageView};

// 导出规则模块核心接口
pub use self::rule::{CategoryRule, DetectionResult, GroupRule, RuleLibrary, RuleLoader, TechRule};

// 导出提取模块核心接口
pub use self::extractor::HtmlExtractor;

// 导出工具模块核心接口
pub use self::utils::{DetectionUpdater, HeaderConverter, PartialDetection, VersionExtractor};

// 导出编译模块核心接口
pub use self::compiler::{
    Catalog, FieldSelector, RuleCompileWarning, RuleCompiler, RuleOutcome, SignatureRule,
    TechnologyDefinition,
};

// 导出检测模块核心接口
pub use self::detector::{analyze, Analysis, CatalogHandle, TechDetector};

// 声明所有子模块
pub mod compiler;
pub mod config;
pub mod detector;
pub mod error;
pub mod extractor;
pub mod page;
pub mod rule;
pub mod utils;
