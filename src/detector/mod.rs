//! 检测模块：技术检测核心逻辑
pub mod analyzer;
pub mod detector;
pub mod ranker;
pub mod resolver;
pub mod snapshot;

// 导出核心接口
pub use self::analyzer::SignatureMatcher;
pub use self::detector::{analyze, Analysis, TechDetector};
pub use self::ranker::ResultRanker;
pub use self::resolver::{RelationshipResolver, ResolvedTech};
pub use self::snapshot::CatalogHandle;
