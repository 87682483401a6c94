//! 提取模块：从HTML中静态提取标签
pub mod html_extractor;

pub use self::html_extractor::HtmlExtractor;
