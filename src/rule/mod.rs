//! 规则模块：负责指纹库的加载与数据模型定义
pub mod detect_result;
pub mod loader;
pub mod model;

// 导出核心接口
pub use self::detect_result::DetectionResult;
pub use self::loader::RuleLoader;
pub use self::model::{CategoryRule, GroupRule, RuleLibrary, TechRule};
