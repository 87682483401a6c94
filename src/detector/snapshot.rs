//! 指纹库快照句柄：读多写少，刷新时整体替换
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::detector::TechDetector;
use crate::compiler::Catalog;
use crate::config::EngineConfig;

/// 共享的指纹库句柄
///
/// 已取出的快照不受后续 [`CatalogHandle::replace`] 影响。
#[derive(Debug, Default)]
pub struct CatalogHandle {
    current: RwLock<Arc<Catalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            current: RwLock::new(catalog),
        }
    }

    /// 当前快照
    pub fn snapshot(&self) -> Arc<Catalog> {
        // 锁内只做 Arc 克隆/替换，中毒时数据仍然完整
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// 发布新快照，返回旧快照
    pub fn replace(&self, catalog: Arc<Catalog>) -> Arc<Catalog> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        debug!("指纹库快照已替换：{} -> {} 个技术", guard.len(), catalog.len());
        std::mem::replace(&mut *guard, catalog)
    }

    /// 基于当前快照创建检测器
    pub fn detector(&self, config: EngineConfig) -> TechDetector {
        TechDetector::new(self.snapshot(), config)
    }
}
