//! 技术检测结果结构

use std::fmt;

use serde::{Deserialize, Serialize};

/// 单个技术的检测结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub name: String,
    pub confidence: u8,
    pub versions: Vec<String>,
    pub categories: Vec<String>,
    pub groups: Vec<String>,
    // 推导来源技术列表（直接命中时为空，序列化自动跳过）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implied_by: Vec<String>,

    // 其他可选字段
    #[cfg(feature = "full-meta")]
    pub website: Option<String>,
    #[cfg(feature = "full-meta")]
    pub description: Option<String>,
    #[cfg(feature = "full-meta")]
    pub icon: Option<String>,
    #[cfg(feature = "full-meta")]
    pub cpe: Option<String>,
}

impl DetectionResult {
    /// 是否由 implies 推导得到
    pub fn is_implied(&self) -> bool {
        !self.implied_by.is_empty()
    }
}

// ======== 用于 CLI / Report 输出 ========
impl fmt::Display for DetectionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.versions.is_empty() {
            write!(f, " {}", self.versions.join(", "))?;
        }
        write!(f, " ({}%)", self.confidence)
    }
}
