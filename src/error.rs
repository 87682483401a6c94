//! 全局错误类型定义

use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarWappError {
    // 指纹库相关错误（致命：没有合法指纹库就不做任何检测）
    #[error("指纹库加载失败：{0}")]
    CatalogLoadError(String),
    #[error("指纹库解析失败：{0}")]
    CatalogParseError(String),

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("无效输入：{0}")]
    InvalidInput(String),
}

impl HarWappError {
    /// 是否属于指纹库错误族（加载/解析/读取）
    pub fn is_catalog_error(&self) -> bool {
        matches!(
            self,
            HarWappError::CatalogLoadError(_)
                | HarWappError::CatalogParseError(_)
                | HarWappError::JsonError(_)
                | HarWappError::IoError(_)
        )
    }
}

// 全局Result类型
pub type WappResult<T> = Result<T, HarWappError>;
