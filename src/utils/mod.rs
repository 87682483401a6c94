//! 工具模块：提供通用工具函数
pub mod detection_updater;
pub mod header_converter;
pub mod version_extractor;

pub use self::detection_updater::{DetectionUpdater, PartialDetection};
pub use self::header_converter::HeaderConverter;
pub use self::version_extractor::{VersionExtractor, VersionTemplate};
